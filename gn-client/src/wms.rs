use std::time::Duration;

use commons_error::*;
use log::*;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Method;

use gndto::api_error::ApiError;
use gndto::error_codes::INVALID_CAPABILITIES;
use gndto::WebResponse;

use crate::web_server::WebServer;

static LAYER_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Layer[\s>]").expect("static regex"));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<Name>(.*?)</Name>").expect("static regex"));
static TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<Title>(.*?)</Title>").expect("static regex"));
static EXTENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<Extent\b([^>]*[^/])>(.*?)</Extent>").expect("static regex"));
static DIMENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Dimension\b([^>]*[^/])>(.*?)</Dimension>").expect("static regex"));
static VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<(?:WMT_MS_Capabilities|WMS_Capabilities)\b[^>]*\sversion="([^"]+)""#).expect("static regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct WmsLayer {
    pub name: String,
    pub title: Option<String>,
    pub time_positions: Vec<String>,
}

/// Named layers of a WMS capabilities document, in document order
#[derive(Debug, Clone)]
pub struct WebMapService {
    pub version: String,
    pub url: String,
    layers: Vec<WmsLayer>,
}

impl WebMapService {
    pub fn parse(url: &str, document: &str) -> WebResponse<Self> {
        if !document.contains("WMT_MS_Capabilities") && !document.contains("WMS_Capabilities") {
            return Err(ApiError::from_errorset_with(&INVALID_CAPABILITIES, url));
        }
        let version = VERSION
            .captures(document)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        let layers = LAYER_START.split(document).skip(1).filter_map(parse_layer).collect();
        Ok(Self { version, url: url.to_string(), layers })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&WmsLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn items(&self) -> &[WmsLayer] {
        &self.layers
    }
}

/// Part of the document between two <Layer> openings, the style section excluded
fn parse_layer(chunk: &str) -> Option<WmsLayer> {
    let head = chunk.split("<Style").next().unwrap_or(chunk);
    let name = first_text(&NAME, head)?;
    let title = first_text(&TITLE, head);

    let time_values = EXTENT
        .captures_iter(chunk)
        .chain(DIMENSION.captures_iter(chunk))
        .find(|c| c.get(1).map_or(false, |a| a.as_str().contains(r#"name="time""#)))
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string());

    let time_positions = match time_values {
        None => vec![],
        Some(values) => values.split(',').map(|v| unescape(v.trim())).filter(|v| !v.is_empty()).collect(),
    };
    Some(WmsLayer { name, title, time_positions })
}

fn first_text(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| unescape(m.as_str().trim()))
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

///
/// location, ex : http://localhost:8080/geoserver/
/// With a type name "geonode:roads" the capabilities are the ones of the layer:
/// http://localhost:8080/geoserver/geonode/roads/wms?request=getcapabilities
///
pub fn capabilities_url(location: &str, version: &str, type_name: Option<&str>) -> String {
    let base = match type_name {
        Some(t) => format!("{}{}/wms?request=getcapabilities", location, t.replace(':', "/")),
        None => format!("{}wms?request=getcapabilities", location),
    };
    format!("{}&service=WMS&version={}", base, version)
}

pub fn get_wms(
    location: &str,
    version: &str,
    type_name: Option<&str>,
    credentials: Option<(String, String)>,
    timeout: Duration,
) -> WebResponse<WebMapService> {
    let url = capabilities_url(location, version, type_name);
    let server = WebServer::new(location, timeout, credentials)?;
    log_debug!("Get the capabilities, url=[{}]", &url);
    let reply = WebServer::send(server.request(Method::GET, &url))?;
    WebMapService::parse(&url, &reply.text())
}
