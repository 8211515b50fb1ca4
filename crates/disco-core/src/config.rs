use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::DEFAULT_DIRECTORY_URL;

/// Process-level configuration loaded from `.disco.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscoConfig {
    /// Endpoint returning the service directory.
    pub directory_url: String,
    /// How long a fetched directory snapshot stays fresh.
    pub cache_ttl_secs: u64,
    /// Upper bound for every outbound HTTP call.
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for DiscoConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            cache_ttl_secs: 3600,
            request_timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl DiscoConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".disco.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<DiscoConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: DiscoConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# disco configuration
directory_url: https://discovery.googleapis.com/discovery/v1/apis

# Seconds a fetched service directory is reused before refetching.
cache_ttl_secs: 3600

# Seconds before any outbound call is abandoned.
request_timeout_secs: 30

# user_agent: my-tool/1.0
"#
}
