use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api_error::ApiError;
use crate::error_codes::INVALID_JSON_REPLY;

pub mod api_error;
pub mod error_codes;
pub mod geonode_types;
pub mod geoserver_types;
pub mod upload_types;

pub use upload_types::{ImportState, ProgressReply, UploadStepReply};

///
/// Commons DTO
///

#[derive(Debug)]
pub struct ErrorSet {
    pub err_message: &'static str,
    pub http_error_code: u16,
}

/// Result of every client call
pub type WebResponse<T> = Result<T, ApiError<'static>>;

/// Body of a reply, either a json document or a plain text (html, error page, ...)
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Json(Value),
    Text(String),
}

impl ReplyBody {
    /// A json string is considered as text, like any body that does not parse
    pub fn from_text(raw: String) -> Self {
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::String(s)) => ReplyBody::Text(s),
            Ok(v) => ReplyBody::Json(v),
            Err(_) => ReplyBody::Text(raw),
        }
    }
}

/// Http reply as seen by the suites: status, final url, headers (lower case names) and body
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: ReplyBody,
}

impl HttpReply {
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_lowercase())
    }

    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ReplyBody::Json(v) => Some(v),
            ReplyBody::Text(_) => None,
        }
    }

    pub fn text(&self) -> String {
        match &self.body {
            ReplyBody::Json(v) => v.to_string(),
            ReplyBody::Text(t) => t.clone(),
        }
    }

    /// Deserialize the json body into the expected reply
    pub fn parse<T: DeserializeOwned>(&self) -> WebResponse<T> {
        let value = self.json().ok_or_else(|| {
            ApiError::from_errorset_with(&INVALID_JSON_REPLY, format!("text body from [{}]", self.url))
        })?;
        serde_json::from_value(value.clone()).map_err(|e| ApiError::from_errorset_with(&INVALID_JSON_REPLY, e))
    }

    pub fn step_reply(&self) -> WebResponse<UploadStepReply> {
        self.parse()
    }
}
