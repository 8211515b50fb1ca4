pub mod template;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::AssembleError;
use crate::ir::{HttpMethod, MethodDescriptor};
use crate::parse::parameter::ParameterLocation;

/// A fully assembled outbound call, ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledRequest {
    pub method: HttpMethod,
    pub url: String,
    /// JSON body; `None` means no body is sent at all.
    pub body: Option<Value>,
}

/// Route caller-supplied values into path, query and body and build the URL.
///
/// - keys declared with location `path` fill the path template;
/// - keys declared with location `query` go to the query string;
/// - every other key is a body field. Verbs without a body (GET, DELETE, ...)
///   send those fields as query parameters instead.
///
/// `null` values count as unset and are dropped.
pub fn assemble(
    base_url: &str,
    method: &MethodDescriptor,
    values: &Map<String, Value>,
) -> Result<AssembledRequest, AssembleError> {
    let mut path_values: IndexMap<&str, String> = IndexMap::new();
    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut body = Map::new();

    for (name, value) in values {
        if value.is_null() {
            continue;
        }
        match method.parameter(name).map(|p| &p.location) {
            Some(ParameterLocation::Path) => {
                path_values.insert(name, render(value));
            }
            Some(ParameterLocation::Query) => push_query(&mut query, name, value),
            _ => {
                body.insert(name.clone(), value.clone());
            }
        }
    }

    if !method.http_method.has_body() {
        for (name, value) in std::mem::take(&mut body) {
            push_query(&mut query, &name, &value);
        }
    }

    let path = template::expand(method.template(), &path_values)?;
    let mut url = join_url(base_url, &path);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&encode_query(&query));
    }

    let body = (!body.is_empty()).then_some(Value::Object(body));

    log::debug!("{} {} {}", method.full_name, method.http_method, url);

    Ok(AssembledRequest {
        method: method.http_method,
        url,
        body,
    })
}

/// Join a base URL and a relative path with exactly one `/` at the seam.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

fn push_query(query: &mut BTreeMap<String, Vec<String>>, name: &str, value: &Value) {
    let entry = query.entry(name.to_string()).or_default();
    match value {
        Value::Array(items) => entry.extend(items.iter().filter(|v| !v.is_null()).map(render)),
        other => entry.push(render(other)),
    }
}

fn encode_query(query: &BTreeMap<String, Vec<String>>) -> String {
    query
        .iter()
        .flat_map(|(name, values)| {
            values.iter().map(move |value| {
                format!("{}={}", urlencoding::encode(name), urlencoding::encode(value))
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Render a JSON value as it appears inside a URL.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
