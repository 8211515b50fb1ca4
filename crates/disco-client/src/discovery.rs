use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use disco_core::config::DiscoConfig;
use disco_core::ir::{MethodDescriptor, ServiceDescriptor};
use disco_core::parse::directory::DirectoryList;
use disco_core::parse::spec::ApiSpecification;
use disco_core::parse::{directory_from_json, spec_from_json};
use disco_core::transform::{find_method, flatten_methods};
use tokio::sync::RwLock;

use crate::error::{ClientError, FetchError};

struct CachedDirectory {
    list: Arc<DirectoryList>,
    fetched_at: Instant,
}

impl CachedDirectory {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Cached access to the service directory and per-service specifications.
///
/// The directory snapshot is reused for `ttl` and then refetched; a failed
/// refresh is reported and never papered over with the stale snapshot.
/// Specifications are cached per service id until [`clear_cache`] is called.
///
/// [`clear_cache`]: DiscoveryClient::clear_cache
pub struct DiscoveryClient {
    http: reqwest::Client,
    directory_url: String,
    ttl: Duration,
    directory: RwLock<Option<CachedDirectory>>,
    specs: RwLock<HashMap<String, Arc<ApiSpecification>>>,
}

impl DiscoveryClient {
    pub fn new(config: &DiscoConfig) -> Result<Self, ClientError> {
        Ok(Self::with_client(build_http_client(config)?, config))
    }

    /// Use an existing HTTP client; only the URL and TTL are taken from `config`.
    pub fn with_client(http: reqwest::Client, config: &DiscoConfig) -> Self {
        Self {
            http,
            directory_url: config.directory_url.clone(),
            ttl: config.cache_ttl(),
            directory: RwLock::new(None),
            specs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Every listed service, sorted by title then id.
    pub async fn list_services(&self) -> Result<Vec<ServiceDescriptor>, ClientError> {
        let directory = self.directory().await?;
        Ok(sorted_services(&directory, |_| true))
    }

    /// Only the preferred version of each service, in the same order.
    pub async fn list_preferred_services(&self) -> Result<Vec<ServiceDescriptor>, ClientError> {
        let directory = self.directory().await?;
        Ok(sorted_services(&directory, |s| s.preferred))
    }

    /// The specification URL of a listed service.
    pub async fn discovery_url(&self, service_id: &str) -> Result<String, ClientError> {
        let directory = self.directory().await?;
        directory
            .items
            .iter()
            .find(|item| item.id == service_id)
            .map(|item| item.discovery_rest_url.clone())
            .ok_or_else(|| ClientError::SpecFetch {
                service_id: service_id.to_string(),
                source: FetchError::UnknownService(service_id.to_string()),
            })
    }

    /// The parsed specification of a service, fetched once and then shared.
    pub async fn specification(
        &self,
        service_id: &str,
    ) -> Result<Arc<ApiSpecification>, ClientError> {
        if let Some(spec) = self.specs.read().await.get(service_id) {
            log::debug!("specification cache hit for {}", service_id);
            return Ok(Arc::clone(spec));
        }

        let url = self.discovery_url(service_id).await?;
        let spec = self
            .fetch_spec(&url)
            .await
            .map_err(|source| ClientError::SpecFetch {
                service_id: service_id.to_string(),
                source,
            })?;

        let mut specs = self.specs.write().await;
        // A concurrent fetch may have landed first; keep that one.
        let cached = specs
            .entry(service_id.to_string())
            .or_insert_with(|| Arc::new(spec));
        log::info!("cached specification for {}", service_id);
        Ok(Arc::clone(cached))
    }

    /// All methods of a service, sorted by full name.
    pub async fn methods(&self, service_id: &str) -> Result<Vec<MethodDescriptor>, ClientError> {
        let spec = self.specification(service_id).await?;
        Ok(flatten_methods(&spec))
    }

    pub async fn method(
        &self,
        service_id: &str,
        full_name: &str,
    ) -> Result<MethodDescriptor, ClientError> {
        let spec = self.specification(service_id).await?;
        find_method(&spec, full_name).ok_or_else(|| ClientError::MethodNotFound {
            service_id: service_id.to_string(),
            method: full_name.to_string(),
        })
    }

    /// Drop the directory snapshot and every cached specification.
    pub async fn clear_cache(&self) {
        *self.directory.write().await = None;
        self.specs.write().await.clear();
        log::info!("discovery caches cleared");
    }

    async fn directory(&self) -> Result<Arc<DirectoryList>, ClientError> {
        let ttl = self.ttl;
        if let Some(cached) = self.directory.read().await.as_ref().filter(|c| c.is_fresh(ttl)) {
            log::debug!("service directory cache hit");
            return Ok(Arc::clone(&cached.list));
        }

        let mut guard = self.directory.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = guard.as_ref().filter(|c| c.is_fresh(ttl)) {
            return Ok(Arc::clone(&cached.list));
        }

        let mut list = self
            .fetch_directory()
            .await
            .map_err(ClientError::CatalogFetch)?;
        dedupe_by_id(&mut list);
        log::info!(
            "fetched service directory from {} ({} services)",
            self.directory_url,
            list.items.len()
        );
        let list = Arc::new(list);
        *guard = Some(CachedDirectory {
            list: Arc::clone(&list),
            fetched_at: Instant::now(),
        });
        Ok(list)
    }

    async fn fetch_directory(&self) -> Result<DirectoryList, FetchError> {
        let body = self.get_text(&self.directory_url).await?;
        Ok(directory_from_json(&body)?)
    }

    async fn fetch_spec(&self, url: &str) -> Result<ApiSpecification, FetchError> {
        log::debug!("fetching specification from {}", url);
        let body = self.get_text(url).await?;
        Ok(spec_from_json(&body)?)
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Build the shared HTTP client: timeout and user agent come from config.
pub(crate) fn build_http_client(config: &DiscoConfig) -> Result<reqwest::Client, ClientError> {
    let mut builder = reqwest::Client::builder().timeout(config.request_timeout());
    if let Some(ref agent) = config.user_agent {
        builder = builder.user_agent(agent.as_str());
    }
    Ok(builder.build()?)
}

/// Keep the first directory entry for each service id.
fn dedupe_by_id(list: &mut DirectoryList) {
    let mut seen = HashSet::new();
    list.items.retain(|item| {
        let first = seen.insert(item.id.clone());
        if !first {
            log::warn!("ignoring duplicate directory entry for {}", item.id);
        }
        first
    });
}

fn sorted_services(
    directory: &DirectoryList,
    keep: impl Fn(&ServiceDescriptor) -> bool,
) -> Vec<ServiceDescriptor> {
    let mut services: Vec<ServiceDescriptor> = directory
        .items
        .iter()
        .map(ServiceDescriptor::from)
        .filter(|s| keep(s))
        .collect();
    services.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
    services
}
