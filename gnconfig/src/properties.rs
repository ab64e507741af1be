use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub static PROPS: Lazy<Arc<RwLock<HashMap<String, String>>>> = Lazy::new(|| Arc::new(RwLock::new(HashMap::new())));

// ex : "geonode.url"
pub fn get_prop_value(prop_name: &str) -> Result<String> {
    let props = PROPS.read().map_err(|_| anyhow!("Property store is poisoned"))?;
    let v = props.get(prop_name).ok_or_else(|| anyhow!("Prop not found: [{}]", prop_name))?.trim().to_owned();
    Ok(v)
}

/// Replace the whole shared map
pub fn set_prop_values(new_props: HashMap<String, String>) {
    match PROPS.write() {
        Ok(mut props) => *props = new_props,
        Err(_) => eprintln!("⚠️ Cannot acquire the write lock on PROPS"),
    }
}

pub fn set_prop_value(prop_name: &str, value: &str) {
    if let Ok(mut props) = PROPS.write() {
        props.insert(prop_name.to_string(), value.to_string());
    } else {
        eprintln!("⚠️ Cannot acquire the write lock on PROPS");
    }
}

/// Copy of the shared map, used to build the typed settings
pub fn get_prop_values() -> HashMap<String, String> {
    PROPS.read().map(|p| p.clone()).unwrap_or_default()
}
