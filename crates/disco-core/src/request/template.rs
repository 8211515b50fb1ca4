use indexmap::IndexMap;

use crate::error::AssembleError;

/// Expand a URI template containing `{name}` and `{+name}` placeholders.
///
/// `{name}` substitutes the percent-encoded value, keeping only RFC 3986
/// unreserved characters literal. `{+name}` substitutes the value verbatim
/// (reserved expansion), so `/` in resource names survives.
pub fn expand(template: &str, values: &IndexMap<&str, String>) -> Result<String, AssembleError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            // Unterminated brace: keep the remainder as literal text.
            out.push_str(&rest[open..]);
            return Ok(out);
        };

        let expr = &after[..close];
        let (reserved, name) = match expr.strip_prefix('+') {
            Some(name) => (true, name),
            None => (false, expr),
        };
        let value = values
            .get(name)
            .ok_or_else(|| AssembleError::MissingPathParameter(name.to_string()))?;

        if reserved {
            out.push_str(value);
        } else {
            out.push_str(&urlencoding::encode(value));
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
