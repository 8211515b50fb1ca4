use serde::{Deserialize, Serialize};

/// The top-level service directory returned by the discovery endpoint.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryList {
    pub kind: String,

    #[serde(rename = "discoveryVersion")]
    pub discovery_version: String,

    pub items: Vec<DirectoryItem>,
}

/// One service entry in the directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryItem {
    pub kind: String,

    /// e.g. `sheets:v4`
    pub id: String,

    pub name: String,

    pub version: String,

    pub title: String,

    pub description: String,

    #[serde(rename = "discoveryRestUrl")]
    pub discovery_rest_url: String,

    #[serde(rename = "documentationLink", skip_serializing_if = "Option::is_none")]
    pub documentation_link: Option<String>,

    pub preferred: bool,
}
