use serde_derive::{Deserialize, Serialize};

///
/// GeoServer REST replies
///

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LayerEnvelope {
    pub layer: LayerInfo,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LayerInfo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub layer_type: Option<String>,
    #[serde(rename = "defaultStyle", default)]
    pub default_style: Option<NamedRef>,
    #[serde(default)]
    pub resource: Option<NamedRef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NamedRef {
    pub name: String,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct GeofenceRules {
    pub count: Option<u64>,
    pub rules: Vec<GeofenceRule>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GeofenceRule {
    pub id: i64,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub layer: Option<String>,
}
