use serde::Serialize;

use crate::parse::directory::DirectoryItem;

/// A service as listed in the discovery directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    pub version: String,
    pub title: String,
    pub description: String,
    pub discovery_url: String,
    pub preferred: bool,
}

impl From<&DirectoryItem> for ServiceDescriptor {
    fn from(item: &DirectoryItem) -> Self {
        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            version: item.version.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            discovery_url: item.discovery_rest_url.clone(),
            preferred: item.preferred,
        }
    }
}
