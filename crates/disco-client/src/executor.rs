use std::future::Future;
use std::time::Duration;

use disco_core::config::DiscoConfig;
use disco_core::ir::{HttpMethod, MethodDescriptor};
use disco_core::request::assemble;
use indexmap::IndexMap;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::discovery::build_http_client;
use crate::error::ClientError;

/// Per-call bounds on top of the client-wide timeout.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub deadline: Option<tokio::time::Instant>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    /// Run `fut` unless the token fires first.
    pub async fn cancellable<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        match self.cancel {
            Some(ref cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ClientError::Cancelled),
                result = fut => result,
            },
            None => fut.await,
        }
    }

    /// Run `fut` under both the token and the deadline.
    pub async fn bound<T, F>(&self, fut: F) -> Result<T, ClientError>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let timed = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .unwrap_or(Err(ClientError::DeadlineExceeded)),
                None => fut.await,
            }
        };
        self.cancellable(timed).await
    }
}

/// A successful (2xx) API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub status_code: u16,
    /// Single-valued headers map to a string, repeated ones to an array.
    pub headers: IndexMap<String, Value>,
    pub body: Value,
}

/// Sends assembled method calls.
pub struct Executor {
    http: reqwest::Client,
    timeout: Duration,
}

impl Executor {
    pub fn new(config: &DiscoConfig) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(config)?,
            timeout: config.request_timeout(),
        })
    }

    pub fn with_client(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }

    /// Assemble and send one call, returning the decoded response.
    ///
    /// Non-2xx statuses become [`ClientError::ApiStatus`] carrying the
    /// decoded error body. Nothing is retried.
    pub async fn execute(
        &self,
        method: &MethodDescriptor,
        base_url: &str,
        token: &str,
        params: &Map<String, Value>,
        options: &CallOptions,
    ) -> Result<ApiResponse, ClientError> {
        let assembled = assemble(base_url, method, params)?;

        let mut builder = self
            .http
            .request(to_reqwest(assembled.method), assembled.url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(self.remaining(options.deadline));
        if !token.is_empty() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(ref body) = assembled.body {
            builder = builder.json(body);
        }

        let call = async {
            let response = builder.send().await?;
            read_response(response).await
        };

        // The deadline already rides on the reqwest timeout.
        let result = options.cancellable(call).await;
        if matches!(result, Err(ClientError::Cancelled)) {
            log::debug!("{} cancelled", method.full_name);
        }
        result
    }

    fn remaining(&self, deadline: Option<tokio::time::Instant>) -> Duration {
        match deadline {
            Some(deadline) => deadline
                .saturating_duration_since(tokio::time::Instant::now())
                .min(self.timeout),
            None => self.timeout,
        }
    }
}

async fn read_response(response: reqwest::Response) -> Result<ApiResponse, ClientError> {
    let status = response.status();
    let headers = collect_headers(response.headers());
    let text = response.text().await?;
    let body = decode_body(&text);

    if !status.is_success() {
        log::debug!("API returned {}", status);
        return Err(ClientError::ApiStatus {
            status: status.as_u16(),
            body,
        });
    }

    Ok(ApiResponse {
        status_code: status.as_u16(),
        headers,
        body,
    })
}

/// JSON when it parses, the raw text otherwise, `null` when empty.
fn decode_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn collect_headers(headers: &HeaderMap) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    for name in headers.keys() {
        let mut values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let value = if values.len() == 1 {
            values.swap_remove(0)
        } else {
            Value::Array(values)
        };
        out.insert(name.as_str().to_string(), value);
    }
    out
}

fn to_reqwest(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Options => reqwest::Method::OPTIONS,
        HttpMethod::Head => reqwest::Method::HEAD,
    }
}
