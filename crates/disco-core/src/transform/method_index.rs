use crate::ir::{HttpMethod, MethodDescriptor};
use crate::parse::spec::{ApiSpecification, Method, Resource};

/// Flatten every method of a specification, top-level and nested, into
/// descriptors sorted by `full_name`.
pub fn flatten_methods(spec: &ApiSpecification) -> Vec<MethodDescriptor> {
    let mut out = Vec::new();

    for (name, method) in &spec.methods {
        push_method(spec, "", name, method, &mut out);
    }
    for (name, resource) in &spec.resources {
        collect_resource(spec, name, resource, &mut out);
    }

    out.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    out
}

/// Find a single method by its dot-joined full name.
pub fn find_method(spec: &ApiSpecification, full_name: &str) -> Option<MethodDescriptor> {
    let (resource_path, method_name) = match full_name.rsplit_once('.') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, full_name),
    };

    let method = match resource_path {
        None => spec.methods.get(method_name)?,
        Some(prefix) => {
            let mut segments = prefix.split('.');
            let first = segments.next()?;
            let mut resource = spec.resources.get(first)?;
            for segment in segments {
                resource = resource.resources.get(segment)?;
            }
            resource.methods.get(method_name)?
        }
    };

    descriptor(spec, resource_path.unwrap_or(""), method_name, method)
}

fn collect_resource(
    spec: &ApiSpecification,
    prefix: &str,
    resource: &Resource,
    out: &mut Vec<MethodDescriptor>,
) {
    for (name, method) in &resource.methods {
        push_method(spec, prefix, name, method, out);
    }
    for (name, child) in &resource.resources {
        collect_resource(spec, &format!("{}.{}", prefix, name), child, out);
    }
}

fn push_method(
    spec: &ApiSpecification,
    resource: &str,
    name: &str,
    method: &Method,
    out: &mut Vec<MethodDescriptor>,
) {
    if let Some(d) = descriptor(spec, resource, name, method) {
        out.push(d);
    }
}

fn descriptor(
    spec: &ApiSpecification,
    resource: &str,
    name: &str,
    method: &Method,
) -> Option<MethodDescriptor> {
    let full_name = if resource.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", resource, name)
    };

    let Some(http_method) = HttpMethod::parse(&method.http_method) else {
        log::warn!(
            "skipping method {}: unsupported HTTP method {:?}",
            full_name,
            method.http_method
        );
        return None;
    };

    Some(MethodDescriptor {
        id: method.id.clone(),
        full_name,
        resource: resource.to_string(),
        http_method,
        path: method.path.clone(),
        flat_path: method.flat_path.clone(),
        description: method.description.clone(),
        parameters: method.parameters.clone(),
        parameter_order: method.parameter_order.clone(),
        service_parameters: spec.parameters.clone(),
        request_ref: method.request.as_ref().map(|r| r.ref_name.clone()),
        response_ref: method.response.as_ref().map(|r| r.ref_name.clone()),
        scopes: method.scopes.clone(),
    })
}
