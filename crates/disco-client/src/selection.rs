use disco_core::ir::{GenericSchema, MethodDescriptor, MethodSchema, SchemaType};
use disco_core::transform::SchemaConverter;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::discovery::DiscoveryClient;
use crate::error::ClientError;

/// Width of the description part of a method label.
pub const LABEL_WIDTH: usize = 80;

/// A selected value plus the options it may take.
///
/// Only the value travels over the wire; options and labels are derived
/// state and show up in the JSON schema as `enum` and `enumTitles`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Choice {
    pub value: String,
    pub options: Vec<String>,
    pub labels: Vec<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn json_schema(&self) -> GenericSchema {
        let mut schema = GenericSchema::of_type(SchemaType::String);
        schema.enum_values = self.options.clone();
        schema.enum_titles = self.labels.clone();
        if !self.value.is_empty() {
            schema.default = Some(Value::String(self.value.clone()));
        }
        schema
    }
}

impl Serialize for Choice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de> Deserialize<'de> for Choice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(|v| Choice::new(v.unwrap_or_default()))
    }
}

/// Deserialize `null` as the type's default.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub service: Choice,
    pub method: Choice,
    #[serde(deserialize_with = "null_as_default")]
    pub enable_error_port: bool,
}

impl Settings {
    pub fn new(service: &str, method: &str) -> Self {
        Self {
            service: Choice::new(service),
            method: Choice::new(method),
            enable_error_port: false,
        }
    }

    /// JSON schema of the settings form, options included.
    pub fn json_schema(&self) -> GenericSchema {
        let mut schema = GenericSchema::of_type(SchemaType::Object);
        schema.properties.insert(
            "service".to_string(),
            self.service.json_schema().with_description("Service"),
        );
        schema.properties.insert(
            "method".to_string(),
            self.method.json_schema().with_description("Method"),
        );
        schema.properties.insert(
            "enableErrorPort".to_string(),
            GenericSchema::of_type(SchemaType::Boolean).with_description("Enable error port"),
        );
        schema
    }
}

/// The service/method selection and everything derived from it.
#[derive(Debug, Default)]
pub struct SelectionState {
    settings: Settings,
    request: MethodSchema,
    response: MethodSchema,
    method: Option<MethodDescriptor>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn request_schema(&self) -> &MethodSchema {
        &self.request
    }

    pub fn response_schema(&self) -> &MethodSchema {
        &self.response
    }

    pub fn current_method(&self) -> Option<&MethodDescriptor> {
        self.method.as_ref()
    }

    /// Apply new settings and refresh option lists and schemas.
    ///
    /// Lookup failures are logged and leave the affected option lists as
    /// they were; the transition itself always completes. The method
    /// descriptor and schemas are dropped as soon as they no longer match
    /// the selected method, so a failed lookup leaves them empty.
    pub async fn on_selection_changed(
        &mut self,
        client: &DiscoveryClient,
        incoming: Settings,
    ) -> &Settings {
        if self.settings.service.options.is_empty() {
            self.load_services(client).await;
        }

        let previous = std::mem::take(&mut self.settings.service.value);
        let service_changed = previous != incoming.service.value;
        log::info!(
            "selection changed: service {:?} -> {:?}, method {:?}",
            previous,
            incoming.service.value,
            incoming.method.value
        );

        self.settings.service.value = incoming.service.value;
        self.settings.enable_error_port = incoming.enable_error_port;

        if self.settings.service.is_empty() {
            self.settings.method = Choice::default();
            self.clear_derived();
            return &self.settings;
        }

        if service_changed && !previous.is_empty() {
            self.settings.method = Choice::default();
            self.clear_derived();
        } else {
            self.settings.method.value = incoming.method.value;
        }

        if self
            .method
            .as_ref()
            .is_some_and(|m| m.full_name != self.settings.method.value)
        {
            self.clear_derived();
        }

        if service_changed || self.settings.method.options.is_empty() {
            self.load_methods(client).await;
        }

        if !self.settings.method.is_empty() {
            if let Err(e) = self.rebuild_schemas(client).await {
                log::warn!("failed to build schemas: {}", e);
            }
        }

        &self.settings
    }

    async fn load_services(&mut self, client: &DiscoveryClient) {
        match client.list_preferred_services().await {
            Ok(services) => {
                let (options, labels): (Vec<String>, Vec<String>) =
                    services.into_iter().map(|s| (s.id, s.title)).unzip();
                self.settings.service.options = options;
                self.settings.service.labels = labels;
            }
            Err(e) => log::warn!("failed to discover services: {}", e),
        }
    }

    async fn load_methods(&mut self, client: &DiscoveryClient) {
        self.settings.method.options.clear();
        self.settings.method.labels.clear();

        let service = &self.settings.service.value;
        match client.methods(service).await {
            Ok(methods) => {
                log::info!("{} methods discovered for {}", methods.len(), service);
                let (options, labels): (Vec<String>, Vec<String>) = methods
                    .iter()
                    .map(|m| (m.full_name.clone(), m.label(LABEL_WIDTH)))
                    .unzip();
                self.settings.method.options = options;
                self.settings.method.labels = labels;
            }
            Err(e) => log::warn!("failed to discover methods for {}: {}", service, e),
        }
    }

    async fn rebuild_schemas(&mut self, client: &DiscoveryClient) -> Result<(), ClientError> {
        let service = &self.settings.service.value;
        let spec = client.specification(service).await?;
        let method = client.method(service, &self.settings.method.value).await?;

        let mut converter = SchemaConverter::new(&spec);
        self.request = converter.request_schema(&method);
        self.response = converter.response_schema(&method);
        log::info!(
            "schemas built for {}: request {:?}, response {:?}",
            method.full_name,
            self.request.property_names(),
            self.response.property_names()
        );
        self.method = Some(method);
        Ok(())
    }

    fn clear_derived(&mut self) {
        self.request = MethodSchema::empty();
        self.response = MethodSchema::empty();
        self.method = None;
    }
}
