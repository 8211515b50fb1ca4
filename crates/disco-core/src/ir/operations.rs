use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::parse::parameter::ParameterSpec;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Case-insensitive parse of a verb as written in a specification.
    pub fn parse(verb: &str) -> Option<Self> {
        match verb.to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "PATCH" => Some(HttpMethod::Patch),
            "OPTIONS" => Some(HttpMethod::Options),
            "HEAD" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Verbs that carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method flattened out of the specification's resource tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescriptor {
    /// Specification-assigned id, e.g. `sheets.spreadsheets.values.get`.
    pub id: String,
    /// Dot-joined resource path plus method name, e.g. `spreadsheets.values.get`.
    pub full_name: String,
    /// Dot-joined resource path; empty for top-level methods.
    pub resource: String,
    pub http_method: HttpMethod,
    pub path: String,
    pub flat_path: Option<String>,
    pub description: Option<String>,
    pub parameters: IndexMap<String, ParameterSpec>,
    pub parameter_order: Vec<String>,
    /// Service-wide parameters (`fields`, `key`, ...) accepted by every method.
    #[serde(skip)]
    pub service_parameters: IndexMap<String, ParameterSpec>,
    pub request_ref: Option<String>,
    pub response_ref: Option<String>,
    pub scopes: Vec<String>,
}

impl MethodDescriptor {
    /// The path template used for substitution: `path`, or `flatPath` when
    /// `path` is empty.
    pub fn template(&self) -> &str {
        match self.flat_path.as_deref() {
            Some(flat) if self.path.is_empty() => flat,
            _ => &self.path,
        }
    }

    /// Look up a parameter, falling back to service-wide parameters.
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters
            .get(name)
            .or_else(|| self.service_parameters.get(name))
    }

    /// Option label: `full_name - description`, with the description cut to
    /// at most `width` characters.
    pub fn label(&self, width: usize) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(desc) if !desc.is_empty() => {
                format!("{} - {}", self.full_name, truncate(desc, width))
            }
            _ => self.full_name.clone(),
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
