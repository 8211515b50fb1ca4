use serde::{Deserialize, Serialize};

/// Where a parameter value travels in the outbound call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    #[default]
    Query,
    #[serde(other)]
    Other,
}

/// A method (or service-wide) parameter.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSpec {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub location: ParameterLocation,

    pub required: bool,

    /// The parameter may be given more than once.
    pub repeated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(rename = "enumDescriptions", skip_serializing_if = "Vec::is_empty")]
    pub enum_descriptions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSpec>>,
}
