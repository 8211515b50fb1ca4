use disco_core::error::{AssembleError, ParseError};
use serde_json::Value;
use thiserror::Error;

/// Failure to obtain a discovery document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid document: {0}")]
    Decode(#[from] ParseError),

    #[error("unknown service: {0}")]
    UnknownService(String),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to fetch service directory: {0}")]
    CatalogFetch(#[source] FetchError),

    #[error("failed to fetch specification for {service_id}: {source}")]
    SpecFetch {
        service_id: String,
        #[source]
        source: FetchError,
    },

    #[error("method {method} not found in {service_id}")]
    MethodNotFound { service_id: String, method: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    ApiStatus { status: u16, body: Value },

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] AssembleError),

    #[error("service and method must be selected in settings")]
    SelectionIncomplete,
}

impl ClientError {
    /// HTTP status associated with this error, when there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::ApiStatus { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::CatalogFetch(FetchError::Status { status, .. })
            | ClientError::SpecFetch {
                source: FetchError::Status { status, .. },
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_code() {
        let err = ClientError::ApiStatus {
            status: 404,
            body: json!({"error": "not found"}),
        };
        assert_eq!(err.status_code(), Some(404));

        let err = ClientError::SpecFetch {
            service_id: "sheets:v4".to_string(),
            source: FetchError::Status {
                status: 503,
                body: String::new(),
            },
        };
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(ClientError::Cancelled.status_code(), None);
    }

    #[test]
    fn test_selection_message() {
        assert_eq!(
            ClientError::SelectionIncomplete.to_string(),
            "service and method must be selected in settings"
        );
    }
}
