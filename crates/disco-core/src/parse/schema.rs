use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A schema node in the discovery format.
///
/// Nodes may point into the specification's named schema table through
/// `$ref`, and those tables are routinely self-referential, so a tree of
/// `SchemaNode`s must be walked as a graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,

    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    pub required: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    #[serde(rename = "enumDescriptions", skip_serializing_if = "Vec::is_empty")]
    pub enum_descriptions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<String>,

    #[serde(rename = "readOnly")]
    pub read_only: bool,

    // Object properties
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<SchemaNode>>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

/// Documentation annotations attached to a property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    /// Ids of the methods for which this property is mandatory.
    pub required: Vec<String>,
}

/// Scalar type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Integer,
    Number,
    Boolean,
}

/// The structural variant a node represents, with its `type` tag decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaShape<'a> {
    /// Cross-reference into the named schema table.
    Ref(&'a str),
    Object {
        properties: &'a IndexMap<String, SchemaNode>,
        additional: Option<&'a SchemaNode>,
    },
    Array(Option<&'a SchemaNode>),
    Scalar(ScalarType),
    /// `any`, missing or unrecognized type.
    Any,
}

impl SchemaNode {
    /// Classify this node. A `$ref` takes precedence over any sibling keys,
    /// and an untyped node with properties counts as an object.
    pub fn shape(&self) -> SchemaShape<'_> {
        if let Some(ref name) = self.ref_name {
            return SchemaShape::Ref(name);
        }
        match self.schema_type.as_deref() {
            Some("object") => self.object_shape(),
            Some("array") => SchemaShape::Array(self.items.as_deref()),
            Some("string") => SchemaShape::Scalar(ScalarType::String),
            Some("integer") => SchemaShape::Scalar(ScalarType::Integer),
            Some("number") => SchemaShape::Scalar(ScalarType::Number),
            Some("boolean") => SchemaShape::Scalar(ScalarType::Boolean),
            None if !self.properties.is_empty() => self.object_shape(),
            _ => SchemaShape::Any,
        }
    }

    fn object_shape(&self) -> SchemaShape<'_> {
        SchemaShape::Object {
            properties: &self.properties,
            additional: self.additional_properties.as_deref(),
        }
    }

    /// Whether this property is mandatory for the given method id.
    pub fn is_required_for(&self, method_id: &str) -> bool {
        self.required
            || self
                .annotations
                .as_ref()
                .is_some_and(|a| a.required.iter().any(|id| id == method_id))
    }
}
