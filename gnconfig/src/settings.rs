use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;

use crate::conf_reader::{read_config, read_env};
use crate::properties::{get_prop_values, set_prop_value, set_prop_values};
use crate::property_name::*;

pub const PROJECT_CODE: &str = "gn-upload-tests";
pub const ENV_VAR_NAME: &str = "GN_E2E_ENV";

/// One hour, the retry waits are backoff * 2^n
const MAX_BACKOFF_FACTOR: f64 = 3600.0;

/// Typed view of the suite properties
#[derive(Debug, Clone)]
pub struct E2eSettings {
    pub geonode_url: String,
    pub geonode_user: String,
    pub geonode_password: String,
    pub geoserver_location: String,
    pub geoserver_user: String,
    pub geoserver_password: String,
    pub geoserver_timeout: Duration,
    pub geoserver_max_retries: u32,
    pub geoserver_backoff_factor: f64,
    pub datastore_enabled: bool,
    pub geofence_enabled: bool,
    pub gisdata_path: PathBuf,
    pub fixtures_path: PathBuf,
    pub progress_max_attempts: u32,
    pub progress_interval: Duration,
    pub startup_attempts: u32,
    pub caps_attempts: u32,
}

impl E2eSettings {
    ///
    /// Publish the properties (--env / GN_E2E_ENV folder and GN_E2E_* variables) in the global store,
    /// then the overrides (ex: from the command line), and read the settings back from the store.
    ///
    pub fn load(overrides: &[(String, String)]) -> anyhow::Result<Self> {
        let env_folder = read_env(ENV_VAR_NAME);
        set_prop_values(read_config(PROJECT_CODE, &env_folder));
        for (key, value) in overrides {
            set_prop_value(key, value);
        }
        Self::from_store()
    }

    pub fn from_store() -> anyhow::Result<Self> {
        Self::from_props(&get_prop_values())
    }

    pub fn from_props(props: &HashMap<String, String>) -> anyhow::Result<Self> {
        let text = |key: &str, default: &str| -> String {
            props.get(key).map(|v| v.trim().to_string()).unwrap_or_else(|| default.to_string())
        };

        let mut geoserver_location = text(GEOSERVER_LOCATION_PROPERTY, "http://localhost:8080/geoserver/");
        if !geoserver_location.ends_with('/') {
            geoserver_location.push('/');
        }

        let geoserver_backoff_factor: f64 = parse_prop(props, GEOSERVER_BACKOFF_FACTOR_PROPERTY, 0.3f64)?;
        if !geoserver_backoff_factor.is_finite() || !(0.0..=MAX_BACKOFF_FACTOR).contains(&geoserver_backoff_factor) {
            return Err(anyhow!(
                "Invalid value for property [{}]: [{}], expected seconds in [0, {}]",
                GEOSERVER_BACKOFF_FACTOR_PROPERTY,
                geoserver_backoff_factor,
                MAX_BACKOFF_FACTOR
            ));
        }

        Ok(E2eSettings {
            geonode_url: text(GEONODE_URL_PROPERTY, "http://localhost:8000").trim_end_matches('/').to_string(),
            geonode_user: text(GEONODE_USER_PROPERTY, "admin"),
            geonode_password: text(GEONODE_PASSWORD_PROPERTY, "admin"),
            geoserver_location,
            geoserver_user: text(GEOSERVER_USER_PROPERTY, "admin"),
            geoserver_password: text(GEOSERVER_PASSWORD_PROPERTY, "geoserver"),
            geoserver_timeout: Duration::from_secs(parse_prop(props, GEOSERVER_TIMEOUT_PROPERTY, 60u64)?),
            geoserver_max_retries: parse_prop(props, GEOSERVER_MAX_RETRIES_PROPERTY, 3u32)?,
            geoserver_backoff_factor,
            datastore_enabled: parse_prop(props, GEOSERVER_DATASTORE_ENABLED_PROPERTY, false)?,
            geofence_enabled: parse_prop(props, GEOSERVER_GEOFENCE_ENABLED_PROPERTY, false)?,
            gisdata_path: PathBuf::from(text(GISDATA_PATH_PROPERTY, "./gisdata/data")),
            fixtures_path: PathBuf::from(text(FIXTURES_PATH_PROPERTY, "./gn-upload-tests/data")),
            progress_max_attempts: parse_prop(props, PROGRESS_MAX_ATTEMPTS_PROPERTY, 30u32)?,
            progress_interval: Duration::from_millis(parse_prop(props, PROGRESS_INTERVAL_MS_PROPERTY, 500u64)?),
            startup_attempts: parse_prop(props, STARTUP_ATTEMPTS_PROPERTY, 10u32)?,
            caps_attempts: parse_prop(props, CAPS_ATTEMPTS_PROPERTY, 10u32)?,
        })
    }

    pub fn geoserver_rest_url(&self) -> String {
        format!("{}rest", self.geoserver_location)
    }

    pub fn good_data(&self) -> PathBuf {
        self.gisdata_path.join("good")
    }

    pub fn bad_data(&self) -> PathBuf {
        self.gisdata_path.join("bad")
    }
}

fn parse_prop<T: FromStr>(props: &HashMap<String, String>, key: &str, default: T) -> anyhow::Result<T> {
    match props.get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| anyhow!("Invalid value for property [{}]: [{}]", key, raw)),
    }
}
