use std::borrow::Cow;

use percent_encoding::percent_decode_str;

pub mod geonode_api;
pub mod geonode_client;
pub mod geoserver_catalog;
pub mod html;
pub mod wms;
mod web_server;

pub use geonode_api::GeoNodeApi;
pub use geonode_client::GeoNodeClient;
pub use geoserver_catalog::GeoServerCatalog;
pub use wms::{get_wms, WebMapService, WmsLayer};

const UPLOAD_BASE_PATH: &str = "/upload/";

///
/// Path of a step of the upload wizard, ex: upload_step(Some("srs")) => "/upload/srs"
/// Without a step, it's the path of the save step (the upload itself).
///
pub fn upload_step(step: Option<&str>) -> String {
    match step {
        None => UPLOAD_BASE_PATH.to_string(),
        Some(s) => format!("{}{}", UPLOAD_BASE_PATH, s),
    }
}

/// Percent-decode an url, ex: "/catalogue/geonode%3Aroads" => "/catalogue/geonode:roads"
pub fn unquote(url: &str) -> Cow<'_, str> {
    percent_decode_str(url).decode_utf8_lossy()
}
