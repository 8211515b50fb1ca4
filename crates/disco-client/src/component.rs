use std::sync::Arc;

use disco_core::config::DiscoConfig;
use disco_core::ir::{GenericSchema, MethodSchema};
use disco_core::transform::find_method;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::discovery::DiscoveryClient;
use crate::error::ClientError;
use crate::executor::{ApiResponse, CallOptions, Executor};
use crate::selection::{SelectionState, Settings, null_as_default};

/// OAuth2 bearer credentials supplied with each request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Token {
    #[serde(deserialize_with = "null_as_default")]
    pub access_token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub refresh_token: String,
    /// RFC 3339 timestamp, passed through untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

/// Inbound request message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// Opaque caller data echoed on the output.
    pub context: Value,
    #[serde(deserialize_with = "null_as_default")]
    pub token: Token,
    #[serde(deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
}

/// Successful output message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
    pub status_code: u16,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    /// Always a JSON object; other bodies are wrapped as `{"data": ...}`.
    pub body: Value,
}

/// Error output message, emitted only when the error port is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMessage {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    Response(Response),
    Error(ErrorMessage),
}

/// A dynamic API client driven by settings and request messages.
pub struct DynamicClient {
    discovery: Arc<DiscoveryClient>,
    executor: Executor,
    selection: SelectionState,
}

impl DynamicClient {
    pub fn new(discovery: Arc<DiscoveryClient>, executor: Executor) -> Self {
        Self {
            discovery,
            executor,
            selection: SelectionState::new(),
        }
    }

    pub fn from_config(config: &DiscoConfig) -> Result<Self, ClientError> {
        Ok(Self::new(
            Arc::new(DiscoveryClient::new(config)?),
            Executor::new(config)?,
        ))
    }

    pub fn settings(&self) -> &Settings {
        self.selection.settings()
    }

    pub async fn handle_settings(&mut self, settings: Settings) -> &Settings {
        self.selection
            .on_selection_changed(&self.discovery, settings)
            .await
    }

    /// Run the selected method with the request's parameters.
    ///
    /// With the error port enabled every failure becomes
    /// [`Output::Error`]; otherwise it is returned as `Err`.
    pub async fn handle_request(
        &self,
        request: Request,
        options: &CallOptions,
    ) -> Result<Output, ClientError> {
        match self.call(&request, options).await {
            Ok(response) => Ok(Output::Response(Response {
                context: request.context,
                status_code: response.status_code,
                headers: response.headers,
                body: wrap_body(response.body),
            })),
            Err(e) if self.settings().enable_error_port => {
                log::debug!("routing failure to error port: {}", e);
                Ok(Output::Error(ErrorMessage {
                    context: request.context,
                    error: e.to_string(),
                    code: e.status_code(),
                }))
            }
            Err(e) => Err(e),
        }
    }

    /// Parameter schema of the selected method.
    pub fn request_schema(&self) -> &MethodSchema {
        self.selection.request_schema()
    }

    pub fn response_schema(&self) -> &MethodSchema {
        self.selection.response_schema()
    }

    pub fn settings_schema(&self) -> GenericSchema {
        self.settings().json_schema()
    }

    async fn call(
        &self,
        request: &Request,
        options: &CallOptions,
    ) -> Result<ApiResponse, ClientError> {
        let settings = self.settings();
        if settings.service.is_empty() || settings.method.is_empty() {
            return Err(ClientError::SelectionIncomplete);
        }
        let service = settings.service.value.as_str();
        let method_name = settings.method.value.as_str();

        // The executor bounds the API call itself.
        let spec = options
            .bound(self.discovery.specification(service))
            .await?;
        let method =
            find_method(&spec, method_name).ok_or_else(|| ClientError::MethodNotFound {
                service_id: service.to_string(),
                method: method_name.to_string(),
            })?;

        self.executor
            .execute(
                &method,
                &spec.base_url(),
                &request.token.access_token,
                &request.parameters,
                options,
            )
            .await
    }
}

fn wrap_body(body: Value) -> Value {
    match body {
        Value::Object(_) => body,
        other => {
            let mut wrapped = Map::new();
            wrapped.insert("data".to_string(), other);
            Value::Object(wrapped)
        }
    }
}
