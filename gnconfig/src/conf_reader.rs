use std::collections::HashMap;
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use commons_error::*;
use java_properties::read;
use log::*;

/// Prefix of the environment variables overriding a property
/// ex : GN_E2E_GEONODE_URL overrides geonode.url
pub const ENV_OVERRIDE_PREFIX: &str = "GN_E2E_";

/// Read the env folder value
/// It's the folder where we can find the properties for the suite.
/// The "--env <folder>" argument wins over the environment variable.
pub fn read_env(var_name: &str) -> Option<String> {
    let args: Vec<String> = env::args().collect();
    find_env_arg(&args).or_else(|| match env::var(var_name) {
        Ok(env) => Some(env),
        Err(e) => {
            eprintln!("🚫 Cannot find the {} system variable: {}", var_name, e);
            None
        }
    })
}

fn find_env_arg(args: &[String]) -> Option<String> {
    let mut index = 1;
    while index < args.len() {
        match args[index].as_str() {
            "--env" => {
                return args.get(index + 1).cloned();
            }
            _ => {
                index += 1;
            }
        }
    }
    None
}

/// Location of the property file of a project in an env folder
pub fn property_file_path(env_folder: &str, project_code: &str) -> PathBuf {
    Path::new(env_folder).join(project_code).join("config/application.properties")
}

/// Read the configuration of the project
///  * If the env folder is defined, the property file is taken from it (it may be missing).
///  * The values are then overridden by the GN_E2E_* environment variables
///  * and eventually the ${key} placeholders are resolved.
pub fn read_config(project_code: &str, env_folder: &Option<String>) -> HashMap<String, String> {
    let props = match env_folder {
        Some(folder) => {
            let property_file = property_file_path(folder, project_code);
            read_config_from_path(&property_file).unwrap_or_else(|e| {
                eprintln!("💣 Cannot read the property file, let's continue with the defaults, e={}", e);
                HashMap::new()
            })
        }
        None => {
            println!("🔧 No env folder for [{}], using the defaults and the environment", project_code);
            HashMap::new()
        }
    };

    let overridden = apply_env_overrides(props, |name| env::var(name).ok());
    resolve_placeholders(overridden)
}

/// Read the properties from a direct path
pub fn read_config_from_path(property_file: &Path) -> anyhow::Result<HashMap<String, String>> {
    println!("Read the properties from the file : {}", property_file.display());

    let f = File::open(property_file)
        .map_err(|e| anyhow!("Cannot open the property file, file=[{}], e=[{}]", property_file.display(), e))?;
    let props = read(BufReader::new(f)).map_err(|e| anyhow!("Cannot parse the property file, e=[{}]", e))?;

    println!("Properties found: {:?}", props.keys());
    Ok(props)
}

/// Name of the environment variable overriding a property key
pub fn env_var_name(key: &str) -> String {
    format!("{}{}", ENV_OVERRIDE_PREFIX, key.to_uppercase().replace(['.', '-'], "_"))
}

/// Override the properties with the environment.
/// Known keys are looked up by their variable name, and any GN_E2E_* variable
/// not matching a key of the file is added as a new property.
pub fn apply_env_overrides<F>(props: HashMap<String, String>, lookup: F) -> HashMap<String, String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut combined = props;

    let keys: Vec<String> = combined.keys().cloned().chain(known_keys()).collect();
    for key in keys {
        if let Some(value) = lookup(&env_var_name(&key)) {
            combined.insert(key, value);
        }
    }
    combined
}

fn known_keys() -> impl Iterator<Item = String> {
    use crate::property_name::*;
    [
        LOG_CONFIG_FILE_PROPERTY,
        LOG_LEVEL_PROPERTY,
        GEONODE_URL_PROPERTY,
        GEONODE_USER_PROPERTY,
        GEONODE_PASSWORD_PROPERTY,
        GEOSERVER_LOCATION_PROPERTY,
        GEOSERVER_USER_PROPERTY,
        GEOSERVER_PASSWORD_PROPERTY,
        GEOSERVER_TIMEOUT_PROPERTY,
        GEOSERVER_MAX_RETRIES_PROPERTY,
        GEOSERVER_BACKOFF_FACTOR_PROPERTY,
        GEOSERVER_DATASTORE_ENABLED_PROPERTY,
        GEOSERVER_GEOFENCE_ENABLED_PROPERTY,
        GISDATA_PATH_PROPERTY,
        FIXTURES_PATH_PROPERTY,
        PROGRESS_MAX_ATTEMPTS_PROPERTY,
        PROGRESS_INTERVAL_MS_PROPERTY,
        UPLOAD_PERMISSIONS_PROPERTY,
        STARTUP_ATTEMPTS_PROPERTY,
        CAPS_ATTEMPTS_PROPERTY,
    ]
    .into_iter()
    .map(str::to_string)
}

/// Replace the ${key} placeholders with the value of the other properties.
/// Unknown placeholders are left untouched.
pub fn resolve_placeholders(props: HashMap<String, String>) -> HashMap<String, String> {
    props
        .iter()
        .map(|(key, value)| (key.clone(), replace_value_with_constants(value, &props)))
        .collect()
}

fn replace_value_with_constants(value: &str, constants: &HashMap<String, String>) -> String {
    let mut resolved_value = value.to_string();
    for (const_key, const_value) in constants {
        let placeholder = format!("${{{}}}", const_key);
        if resolved_value.contains(&placeholder) {
            log_debug!("Resolve placeholder, key=[{}]", const_key);
            resolved_value = resolved_value.replace(&placeholder, const_value);
        }
    }
    resolved_value
}
