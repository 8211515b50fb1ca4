use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tags of the generic schema. An absent tag means the schema is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

/// A bounded, acyclic schema produced from a specification's schema graph.
///
/// Serializes in JSON-Schema form so it can be handed straight to a form
/// renderer or validator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenericSchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, GenericSchema>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<GenericSchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<GenericSchema>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    /// Human-readable labels, index-aligned with `enum_values`.
    #[serde(rename = "enumTitles", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_titles: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl GenericSchema {
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// An open schema accepting any value.
    pub fn any() -> Self {
        Self::default()
    }

    /// The "any object" placeholder used to cut cyclic or over-deep expansion.
    pub fn opaque_object() -> Self {
        Self::of_type(SchemaType::Object)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.schema_type.is_none()
    }

    /// True for an object schema that says nothing about its shape.
    pub fn is_opaque_object(&self) -> bool {
        self.schema_type == Some(SchemaType::Object)
            && self.properties.is_empty()
            && self.additional_properties.is_none()
    }

    /// Number of nested schema levels below and including this one.
    pub fn depth(&self) -> usize {
        let children = self
            .properties
            .values()
            .chain(self.additional_properties.as_deref())
            .chain(self.items.as_deref())
            .map(GenericSchema::depth)
            .max()
            .unwrap_or(0);
        children + 1
    }
}

/// A synthesized request or response schema together with sample values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodSchema {
    pub schema: GenericSchema,
    /// One entry per top-level property: its default, or `null`.
    pub sample: Map<String, Value>,
}

impl MethodSchema {
    /// An empty object schema with no sample data.
    pub fn empty() -> Self {
        Self {
            schema: GenericSchema::opaque_object(),
            sample: Map::new(),
        }
    }

    /// Property names in declaration order.
    pub fn property_names(&self) -> Vec<&str> {
        self.schema.properties.keys().map(String::as_str).collect()
    }
}

impl Default for MethodSchema {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_json_schema() {
        let mut schema = GenericSchema::of_type(SchemaType::Object);
        schema.properties.insert(
            "title".to_string(),
            GenericSchema::of_type(SchemaType::String).with_description("Sheet title"),
        );
        schema.required.push("title".to_string());
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Sheet title"}
                },
                "required": ["title"]
            })
        );
    }

    #[test]
    fn test_open_schema_has_no_type() {
        let value = serde_json::to_value(GenericSchema::any()).unwrap();
        assert_eq!(value, json!({}));
        assert!(GenericSchema::any().is_open());
    }

    #[test]
    fn test_opaque_object() {
        let placeholder = GenericSchema::opaque_object();
        assert!(placeholder.is_opaque_object());
        assert_eq!(placeholder.depth(), 1);

        let mut nested = GenericSchema::of_type(SchemaType::Array);
        nested.items = Some(Box::new(GenericSchema::opaque_object()));
        assert!(!nested.is_opaque_object());
        assert_eq!(nested.depth(), 2);
    }
}
