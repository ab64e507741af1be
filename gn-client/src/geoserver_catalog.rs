use std::time::Duration;

use commons_error::*;
use log::*;
use reqwest::Method;

use gndto::geoserver_types::{GeofenceRules, LayerEnvelope, LayerInfo};
use gndto::WebResponse;

use crate::web_server::WebServer;

///
/// GeoServer REST catalog, basic auth, with retries on transport errors and 502/503/504.
///
pub struct GeoServerCatalog {
    server: WebServer,
    max_retries: u32,
    backoff_factor: f64,
}

impl GeoServerCatalog {
    /// rest_url, ex : http://localhost:8080/geoserver/rest
    pub fn new(rest_url: &str, user: &str, password: &str, max_retries: u32, backoff_factor: f64, timeout: Duration) -> WebResponse<Self> {
        let credentials = Some((user.to_owned(), password.to_owned()));
        Ok(Self { server: WebServer::new(rest_url, timeout, credentials)?, max_retries, backoff_factor })
    }

    /// The layer, or None when GeoServer does not know it
    pub fn get_layer(&self, name: &str) -> WebResponse<Option<LayerInfo>> {
        let url = self.server.build_url(&format!("/layers/{}.json", name));
        match self.call(Method::GET, &url) {
            Ok(reply) => {
                let envelope: LayerEnvelope = reply.parse()?;
                Ok(Some(envelope.layer))
            }
            Err(e) if e.http_error_code == 404 => {
                log_debug!("Unknown layer, name=[{}]", name);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    ///
    /// Remove the layer with its resource, then its default style.
    /// Anything already gone is ignored.
    ///
    pub fn cascading_delete(&self, dataset_name: &str) -> WebResponse<()> {
        let layer = match self.get_layer(dataset_name)? {
            None => {
                log_info!("Nothing to delete, layer=[{}]", dataset_name);
                return Ok(());
            }
            Some(layer) => layer,
        };

        let url = self.server.build_url_with_params(&format!("/layers/{}", dataset_name), &[("recurse", "true")])?;
        ignore_not_found(self.call(Method::DELETE, &url).map(|_| ()))?;
        log_info!("Layer deleted, name=[{}]", dataset_name);

        if let Some(style) = layer.default_style {
            let url = self.server.build_url_with_params(&style_path(&style.name), &[("purge", "true")])?;
            ignore_not_found(self.call(Method::DELETE, &url).map(|_| ()))?;
            log_info!("Style deleted, name=[{}]", &style.name);
        }
        Ok(())
    }

    /// Delete every GeoFence rule, return how many were deleted
    pub fn delete_all_geofence_rules(&self) -> WebResponse<usize> {
        let url = self.server.build_url("/geofence/rules.json");
        let rules: GeofenceRules = self.call(Method::GET, &url)?.parse()?;
        let mut count = 0;
        for rule in &rules.rules {
            let url = self.server.build_url(&format!("/geofence/rules/id/{}", rule.id));
            ignore_not_found(self.call(Method::DELETE, &url).map(|_| ()))?;
            count += 1;
        }
        log_info!("GeoFence rules deleted, count=[{}]", count);
        Ok(count)
    }

    fn call(&self, method: Method, url: &str) -> WebResponse<gndto::HttpReply> {
        self.server.send_retry(
            || self.server.request(method.clone(), url).header("Accept", "application/json"),
            self.max_retries,
            self.backoff_factor,
        )
    }
}

/// ex : "geonode:roads" => /workspaces/geonode/styles/roads, "roads" => /styles/roads
fn style_path(style_name: &str) -> String {
    match style_name.split_once(':') {
        Some((workspace, name)) => format!("/workspaces/{}/styles/{}", workspace, name),
        None => format!("/styles/{}", style_name),
    }
}

fn ignore_not_found(r: WebResponse<()>) -> WebResponse<()> {
    match r {
        Err(e) if e.http_error_code == 404 => Ok(()),
        other => other,
    }
}
