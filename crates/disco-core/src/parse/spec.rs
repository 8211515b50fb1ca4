use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::parameter::ParameterSpec;
use super::schema::SchemaNode;

/// A full per-service specification ("discovery document").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSpecification {
    pub kind: String,
    pub id: String,
    pub name: String,
    pub version: String,
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "documentationLink", skip_serializing_if = "Option::is_none")]
    pub documentation_link: Option<String>,

    #[serde(rename = "rootUrl")]
    pub root_url: String,

    #[serde(rename = "servicePath")]
    pub service_path: String,

    #[serde(rename = "baseUrl")]
    pub base_url: String,

    #[serde(rename = "basePath")]
    pub base_path: String,

    #[serde(rename = "batchPath", skip_serializing_if = "Option::is_none")]
    pub batch_path: Option<String>,

    /// Parameters accepted by every method of the service.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<Auth>,

    /// Named schema table addressed by `$ref`.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, SchemaNode>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Resource>,

    /// Methods attached directly to the service (rare).
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, Method>,
}

impl ApiSpecification {
    /// The URL every method path is relative to: `baseUrl` when present,
    /// otherwise `rootUrl` + `servicePath`.
    pub fn base_url(&self) -> String {
        if !self.base_url.is_empty() {
            return self.base_url.clone();
        }
        format!("{}{}", self.root_url, self.service_path)
    }

    pub fn schema(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }
}

/// OAuth scope declarations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuth2 {
    pub scopes: IndexMap<String, ScopeInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeInfo {
    pub description: String,
}

/// A named grouping of methods, possibly nesting further resources.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub methods: IndexMap<String, Method>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub resources: IndexMap<String, Resource>,
}

/// A method as it appears in the specification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Method {
    pub id: String,

    pub path: String,

    #[serde(rename = "flatPath", skip_serializing_if = "Option::is_none")]
    pub flat_path: Option<String>,

    #[serde(rename = "httpMethod")]
    pub http_method: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, ParameterSpec>,

    #[serde(rename = "parameterOrder", skip_serializing_if = "Vec::is_empty")]
    pub parameter_order: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<SchemaRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<SchemaRef>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    #[serde(rename = "supportsMediaDownload")]
    pub supports_media_download: bool,

    #[serde(rename = "supportsMediaUpload")]
    pub supports_media_upload: bool,
}

/// A request/response pointer into the schema table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaRef {
    #[serde(rename = "$ref")]
    pub ref_name: String,

    #[serde(rename = "parameterName", skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::parse::spec_from_json;

    #[test]
    fn test_base_url_prefers_explicit() {
        let spec = spec_from_json(
            r#"{"baseUrl": "https://a.example.com/v1/", "rootUrl": "https://b.example.com/", "servicePath": "x/"}"#,
        )
        .unwrap();
        assert_eq!(spec.base_url(), "https://a.example.com/v1/");
    }

    #[test]
    fn test_base_url_from_root_and_service_path() {
        let spec = spec_from_json(
            r#"{"rootUrl": "https://sheets.googleapis.com/", "servicePath": ""}"#,
        )
        .unwrap();
        assert_eq!(spec.base_url(), "https://sheets.googleapis.com/");
    }

    #[test]
    fn test_missing_root_url() {
        let err = spec_from_json(r#"{"name": "nothing"}"#).unwrap_err();
        assert!(matches!(err, ParseError::MissingField(ref f) if f == "rootUrl"));
    }

    #[test]
    fn test_nested_resources_and_refs() {
        let spec = spec_from_json(
            r#"{
                "rootUrl": "https://x.example.com/",
                "resources": {
                    "spreadsheets": {
                        "methods": {
                            "get": {
                                "id": "sheets.spreadsheets.get",
                                "path": "v4/spreadsheets/{spreadsheetId}",
                                "httpMethod": "GET",
                                "response": {"$ref": "Spreadsheet"}
                            }
                        },
                        "resources": {
                            "values": {"methods": {}}
                        }
                    }
                }
            }"#,
        )
        .unwrap();
        let spreadsheets = &spec.resources["spreadsheets"];
        let get = &spreadsheets.methods["get"];
        assert_eq!(get.http_method, "GET");
        assert_eq!(get.response.as_ref().unwrap().ref_name, "Spreadsheet");
        assert!(get.request.is_none());
        assert!(spreadsheets.resources.contains_key("values"));
    }
}
