use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserializer;
use serde_derive::{Deserialize, Serialize};
use serde_json::{Map, Value};

static SESSION_ID_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r".*id=(\d+)").expect("static regex"));

///
/// Reply of the upload wizard steps (save, time, srs, csv, final)
///
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct UploadStepReply {
    pub success: bool,
    pub redirect_to: Option<String>,
    pub progress: Option<String>,
    pub url: Option<String>,
    pub id: Option<Value>,
    pub status: Option<String>,
    pub error_msg: Option<String>,
}

impl UploadStepReply {
    /// Importer session id found in the url, ex: "/upload/final?id=42" => 42
    pub fn session_id(&self) -> Option<u64> {
        let url = self.url.as_deref()?;
        SESSION_ID_REGEX.captures(url).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok())
    }
}

/// State of an importer session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum ImportState {
    Complete,
    Running,
    Pending,
    Error,
    Invalid,
    Other(String),
}

impl Default for ImportState {
    fn default() -> Self {
        ImportState::Other(String::new())
    }
}

impl From<String> for ImportState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "COMPLETE" => ImportState::Complete,
            "RUNNING" => ImportState::Running,
            "PENDING" => ImportState::Pending,
            "ERROR" => ImportState::Error,
            "INVALID" => ImportState::Invalid,
            _ => ImportState::Other(value),
        }
    }
}

impl From<ImportState> for String {
    fn from(state: ImportState) -> Self {
        match state {
            ImportState::Complete => "COMPLETE".to_string(),
            ImportState::Running => "RUNNING".to_string(),
            ImportState::Pending => "PENDING".to_string(),
            ImportState::Error => "ERROR".to_string(),
            ImportState::Invalid => "INVALID".to_string(),
            ImportState::Other(s) => s,
        }
    }
}

///
/// Reply of the progress end point of an importer session
///
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProgressReply {
    #[serde(default, deserialize_with = "de_state")]
    pub state: ImportState,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProgressReply {
    pub fn is_complete(&self) -> bool {
        self.state == ImportState::Complete
    }

    pub fn is_running(&self) -> bool {
        self.state == ImportState::Running
    }
}

/// The importer may send a null (or any json) state, it's just not a known one
fn de_state<'de, D>(deserializer: D) -> Result<ImportState, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = serde::Deserialize::deserialize(deserializer)?;
    Ok(match v {
        Value::String(s) => ImportState::from(s),
        Value::Null => ImportState::default(),
        other => ImportState::Other(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use crate::upload_types::{ImportState, ProgressReply, UploadStepReply};

    #[test]
    fn session_id_from_url() {
        let step = UploadStepReply { url: Some("/upload/final?id=42".to_string()), ..Default::default() };
        assert_eq!(Some(42), step.session_id());

        let step = UploadStepReply { url: Some("/catalogue/#/dataset/geonode:roads".to_string()), ..Default::default() };
        assert_eq!(None, step.session_id());
        assert_eq!(None, UploadStepReply::default().session_id());
    }

    #[test]
    fn missing_success_reads_as_false() {
        let step: UploadStepReply = serde_json::from_str(r#"{"errors": ["bad"]}"#).unwrap();
        assert!(!step.success);
        assert_eq!(None, step.redirect_to);
    }

    #[test]
    fn progress_states() {
        let p: ProgressReply = serde_json::from_str(r#"{"state": "RUNNING", "progress": 40.0}"#).unwrap();
        assert!(p.is_running());
        assert_eq!(Some(&serde_json::json!(40.0)), p.extra.get("progress"));

        let p: ProgressReply = serde_json::from_str(r#"{"state": "COMPLETE"}"#).unwrap();
        assert!(p.is_complete());

        let p: ProgressReply = serde_json::from_str(r#"{"state": "NO_CRS"}"#).unwrap();
        assert_eq!(ImportState::Other("NO_CRS".to_string()), p.state);

        let p: ProgressReply = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(ImportState::Other(String::new()), p.state);
    }

    #[test]
    fn state_that_is_not_a_string() {
        let p: ProgressReply = serde_json::from_str(r#"{"state": null, "progress": 10}"#).unwrap();
        assert_eq!(ImportState::Other(String::new()), p.state);
        assert!(!p.is_running() && !p.is_complete());

        let p: ProgressReply = serde_json::from_str(r#"{"state": 3}"#).unwrap();
        assert_eq!(ImportState::Other("3".to_string()), p.state);

        let p: ProgressReply = serde_json::from_str(r#"{"state": {"code": "RUNNING"}}"#).unwrap();
        assert!(!p.is_running());
    }
}
