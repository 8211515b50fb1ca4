use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::ir::{GenericSchema, MethodDescriptor, MethodSchema, SchemaType};
use crate::parse::parameter::ParameterSpec;
use crate::parse::schema::{ScalarType, SchemaNode, SchemaShape};
use crate::parse::spec::ApiSpecification;

/// Nesting level past which every node collapses to an opaque object.
pub const MAX_DEPTH: usize = 10;

/// Converts a specification's schema graph into bounded, acyclic
/// [`GenericSchema`] trees.
///
/// A conversion pass keeps a set of every `$ref` it has expanded. A reference
/// seen a second time in the same pass becomes an opaque object instead of
/// being expanded again, so each named schema is expanded at most once per
/// pass and the output size is bounded by the schema table. Independently,
/// nodes nested deeper than `max_depth` collapse to the same placeholder.
pub struct SchemaConverter<'a> {
    spec: &'a ApiSpecification,
    max_depth: usize,
    visited: HashSet<String>,
}

impl<'a> SchemaConverter<'a> {
    pub fn new(spec: &'a ApiSpecification) -> Self {
        Self {
            spec,
            max_depth: MAX_DEPTH,
            visited: HashSet::new(),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Forget every reference expanded so far and start a new pass.
    pub fn reset(&mut self) {
        self.visited.clear();
    }

    /// Convert one node within the current pass.
    pub fn to_generic_schema(&mut self, node: &SchemaNode, depth: usize) -> GenericSchema {
        if depth > self.max_depth {
            return GenericSchema::opaque_object();
        }

        let spec = self.spec;
        let schema = match node.shape() {
            SchemaShape::Ref(name) => {
                if !self.visited.insert(name.to_string()) {
                    log::debug!("cycle or repeat at $ref {}, emitting placeholder", name);
                    return GenericSchema::opaque_object();
                }
                let Some(target) = spec.schema(name) else {
                    log::debug!("dangling $ref {}, emitting placeholder", name);
                    return GenericSchema::opaque_object();
                };
                let mut resolved = self.to_generic_schema(target, depth + 1);
                // A description next to the $ref is about this use site.
                if node.description.is_some() {
                    resolved.description = node.description.clone();
                }
                return resolved;
            }
            SchemaShape::Object {
                properties,
                additional,
            } => {
                let mut schema = GenericSchema::of_type(SchemaType::Object);
                for (name, prop) in properties {
                    if prop.required {
                        schema.required.push(name.clone());
                    }
                    let converted = self.to_generic_schema(prop, depth + 1);
                    schema.properties.insert(name.clone(), converted);
                }
                if let Some(additional) = additional {
                    let converted = self.to_generic_schema(additional, depth + 1);
                    schema.additional_properties = Some(Box::new(converted));
                }
                schema
            }
            SchemaShape::Array(items) => {
                let mut schema = GenericSchema::of_type(SchemaType::Array);
                if let Some(items) = items {
                    schema.items = Some(Box::new(self.to_generic_schema(items, depth + 1)));
                }
                schema
            }
            SchemaShape::Scalar(scalar) => GenericSchema::of_type(scalar_type(scalar)),
            SchemaShape::Any => GenericSchema::any(),
        };

        annotate(schema, node)
    }

    /// Convert a method parameter. Parameters are finite trees, so no pass
    /// state is involved; unknown or missing types become strings.
    pub fn parameter_schema(&self, param: &ParameterSpec) -> GenericSchema {
        let schema = parameter_to_schema(param);
        if param.repeated && schema.schema_type != Some(SchemaType::Array) {
            let mut wrapper = GenericSchema::of_type(SchemaType::Array);
            wrapper.description = schema.description.clone();
            wrapper.items = Some(Box::new(schema));
            return wrapper;
        }
        schema
    }

    /// Build the input schema of a method: every parameter plus the top-level
    /// properties of the request body, flattened into one object.
    ///
    /// When a body property has the same name as a parameter the parameter
    /// wins and the body property is dropped.
    pub fn request_schema(&mut self, method: &MethodDescriptor) -> MethodSchema {
        self.reset();

        let mut schema = GenericSchema::of_type(SchemaType::Object);
        let mut sample = Map::new();

        for (name, param) in &method.parameters {
            let prop = self.parameter_schema(param);
            sample.insert(name.clone(), sample_value(&prop));
            if param.required {
                schema.required.push(name.clone());
            }
            schema.properties.insert(name.clone(), prop);
        }

        if let Some(ref body_ref) = method.request_ref {
            let spec = self.spec;
            match spec.schema(body_ref) {
                Some(body) => {
                    self.visited.insert(body_ref.clone());
                    for (name, prop) in &body.properties {
                        if method.parameters.contains_key(name) {
                            log::debug!(
                                "{}: body property {} shadowed by parameter of the same name",
                                method.full_name,
                                name
                            );
                            continue;
                        }
                        let converted = self.to_generic_schema(prop, 1);
                        sample.insert(name.clone(), sample_value(&converted));
                        if prop.is_required_for(&method.id) {
                            schema.required.push(name.clone());
                        }
                        schema.properties.insert(name.clone(), converted);
                    }
                }
                None => log::warn!(
                    "{}: request schema {} not found in specification",
                    method.full_name,
                    body_ref
                ),
            }
        }

        MethodSchema { schema, sample }
    }

    /// Build the output schema of a method from the response schema's
    /// top-level properties. Methods without a usable response schema get an
    /// informational empty object rather than an error.
    pub fn response_schema(&mut self, method: &MethodDescriptor) -> MethodSchema {
        self.reset();

        let Some(ref response_ref) = method.response_ref else {
            return informational(
                "No response schema defined for this method",
                "_info",
                "No response schema defined".to_string(),
            );
        };

        let spec = self.spec;
        let Some(response) = spec.schema(response_ref) else {
            return informational(
                &format!("Response schema not found: {}", response_ref),
                "_error",
                format!("Schema not found: {}", response_ref),
            );
        };

        self.visited.insert(response_ref.clone());

        let mut schema = GenericSchema::of_type(SchemaType::Object);
        schema.description = response.description.clone();
        let mut sample = Map::new();

        for (name, prop) in &response.properties {
            let converted = self.to_generic_schema(prop, 1);
            sample.insert(name.clone(), sample_value(&converted));
            schema.properties.insert(name.clone(), converted);
        }

        MethodSchema { schema, sample }
    }
}

fn informational(description: &str, key: &str, message: String) -> MethodSchema {
    let mut sample = Map::new();
    sample.insert(key.to_string(), Value::String(message));
    MethodSchema {
        schema: GenericSchema::opaque_object().with_description(description),
        sample,
    }
}

fn scalar_type(scalar: ScalarType) -> SchemaType {
    match scalar {
        ScalarType::String => SchemaType::String,
        ScalarType::Integer => SchemaType::Integer,
        ScalarType::Number => SchemaType::Number,
        ScalarType::Boolean => SchemaType::Boolean,
    }
}

fn annotate(mut schema: GenericSchema, node: &SchemaNode) -> GenericSchema {
    schema.description = node.description.clone();
    schema.default = node.default.clone();
    schema.format = node.format.clone();
    schema.pattern = node.pattern.clone();
    if !node.enum_values.is_empty() {
        schema.enum_values = node.enum_values.clone();
        schema.enum_titles = node.enum_descriptions.clone();
    }
    schema
}

fn parameter_to_schema(param: &ParameterSpec) -> GenericSchema {
    let mut schema = match param.param_type.as_deref() {
        Some("integer") => GenericSchema::of_type(SchemaType::Integer),
        Some("number") => GenericSchema::of_type(SchemaType::Number),
        Some("boolean") => GenericSchema::of_type(SchemaType::Boolean),
        Some("array") => {
            let mut schema = GenericSchema::of_type(SchemaType::Array);
            if let Some(ref items) = param.items {
                schema.items = Some(Box::new(parameter_to_schema(items)));
            }
            schema
        }
        _ => GenericSchema::of_type(SchemaType::String),
    };

    schema.description = param.description.clone();
    schema.default = param
        .default
        .as_deref()
        .map(|d| typed_default(schema.schema_type, d));
    schema.format = param.format.clone();
    schema.pattern = param.pattern.clone();
    if !param.enum_values.is_empty() {
        schema.enum_values = param.enum_values.clone();
        schema.enum_titles = param.enum_descriptions.clone();
    }
    schema
}

/// Parameter defaults are always written as strings; give numeric and boolean
/// ones their JSON type when they parse.
fn typed_default(schema_type: Option<SchemaType>, raw: &str) -> Value {
    match schema_type {
        Some(SchemaType::Integer | SchemaType::Number | SchemaType::Boolean) => {
            serde_json::from_str::<Value>(raw)
                .ok()
                .filter(|v| v.is_number() || v.is_boolean())
                .unwrap_or_else(|| Value::String(raw.to_string()))
        }
        _ => Value::String(raw.to_string()),
    }
}

fn sample_value(schema: &GenericSchema) -> Value {
    schema.default.clone().unwrap_or(Value::Null)
}
