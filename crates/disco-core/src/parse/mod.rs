pub mod directory;
pub mod parameter;
pub mod schema;
pub mod spec;

use crate::error::ParseError;
use directory::DirectoryList;
use spec::ApiSpecification;

/// Parse a service directory listing from JSON.
pub fn directory_from_json(input: &str) -> Result<DirectoryList, ParseError> {
    Ok(serde_json::from_str(input)?)
}

/// Parse a per-service specification from JSON.
pub fn spec_from_json(input: &str) -> Result<ApiSpecification, ParseError> {
    let spec: ApiSpecification = serde_json::from_str(input)?;
    validate_spec(&spec)?;
    Ok(spec)
}

fn validate_spec(spec: &ApiSpecification) -> Result<(), ParseError> {
    if spec.base_url().is_empty() {
        return Err(ParseError::MissingField("rootUrl".to_string()));
    }
    Ok(())
}
