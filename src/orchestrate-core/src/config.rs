use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "ORCHESTRATE_API_KEY";
pub const BASE_URL_ENV: &str = "ORCHESTRATE_BASE_URL";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub api_key: String,

    /// Service endpoint, without the API version segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout applied by the HTTP transport
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_base_url() -> String {
    "https://api.orchestrate.io".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            insecure_skip_verify: false,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: ClientConfig =
            serde_json::from_str(&contents).context("Failed to parse client config")?;
        Ok(config)
    }

    /// Read the API key (required) and endpoint (optional) from the environment
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .with_context(|| format!("{} is not set", API_KEY_ENV))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Endpoint without a trailing slash
    pub fn endpoint(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
