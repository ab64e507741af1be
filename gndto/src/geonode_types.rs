use serde::Deserializer;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

///
/// GeoNode REST v2 replies
///

pub const ANONYMOUS_USER: &str = "AnonymousUser";
pub const ANONYMOUS_GROUP: &str = "anonymous";

/// One page of datasets, `links.next` is the url of the next page
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DatasetList {
    #[serde(default)]
    pub datasets: Vec<DatasetSummary>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub links: PageLinks,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PageLinks {
    pub next: Option<String>,
    pub previous: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatasetSummary {
    #[serde(deserialize_with = "de_pk")]
    pub pk: i64,
    pub name: String,
    #[serde(default)]
    pub alternate: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub owner: Option<OwnerInfo>,
    #[serde(default)]
    pub default_style: Option<StyleRef>,
    #[serde(default)]
    pub attribute_set: Vec<Value>,
    #[serde(default)]
    pub links: Vec<LinkInfo>,
}

impl DatasetSummary {
    pub fn links_of_type<'a>(&'a self, link_type: &'a str) -> impl Iterator<Item = &'a LinkInfo> + 'a {
        self.links.iter().filter(move |l| l.link_type.as_deref() == Some(link_type))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct OwnerInfo {
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StyleRef {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct LinkInfo {
    pub link_type: Option<String>,
    pub url: Option<String>,
    pub name: Option<String>,
    pub mime: Option<String>,
    pub extension: Option<String>,
}

/// ex : {"users": [{"username": "AnonymousUser", "permissions": "none"}], "groups": [...]}
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ResourcePermissions {
    pub users: Vec<PrincipalPermissions>,
    pub groups: Vec<PrincipalPermissions>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PrincipalPermissions {
    pub username: Option<String>,
    pub name: Option<String>,
    pub permissions: Option<String>,
}

impl ResourcePermissions {
    pub fn user_permissions(&self, username: &str) -> Option<&str> {
        self.users
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .and_then(|u| u.permissions.as_deref())
    }

    /// The user is not listed or only has the "none" level
    pub fn user_has_no_permission(&self, username: &str) -> bool {
        matches!(self.user_permissions(username), None | Some("none"))
    }

    pub fn group_permissions(&self, group_name: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|g| g.name.as_deref() == Some(group_name))
            .and_then(|g| g.permissions.as_deref())
    }

    /// Neither the AnonymousUser nor the "anonymous" group can see the resource.
    /// GeoNode always lists the anonymous group, its level must be "none".
    pub fn is_hidden_from_anonymous(&self) -> bool {
        self.user_has_no_permission(ANONYMOUS_USER) && self.group_permissions(ANONYMOUS_GROUP) == Some("none")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadSizeLimit {
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub max_size: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UploadSizeLimitEnvelope {
    #[serde(rename = "upload-size-limit")]
    pub upload_size_limit: UploadSizeLimit,
}

/// The pk is a number or a string depending on the GeoNode version
fn de_pk<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Value = serde::Deserialize::deserialize(deserializer)?;
    match &v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| serde::de::Error::custom(format!("invalid pk [{}]", v)))
}
