use serde::Deserialize;

use crate::catalog::MetricPolicyOverride;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub metric_policy: Vec<MetricPolicyOverride>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Metrics backend root, e.g. "http://127.0.0.1:8000".
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Max widget updates buffered for /ws/dashboard (slow clients may lag).
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            refresh_interval_ms: default_refresh_interval_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}

fn default_broadcast_capacity() -> usize {
    64
}

/// Cloud resources the widgets are scoped to.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourcesConfig {
    pub resource_group: String,
    pub storage_account: String,
    pub vm_name: String,
    /// EC2 instance for the AWS CPU widget; first listed instance when unset.
    pub aws_instance_id: Option<String>,
    /// Billing window (YYYY-MM-DD); last 30 days when unset.
    pub billing_start: Option<String>,
    pub billing_end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Env var holding the identity provider's bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

fn default_token_env() -> String {
    "CLOUDBOARD_ID_TOKEN".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.backend.base_url.trim().is_empty(),
            "backend.base_url must be non-empty"
        );
        anyhow::ensure!(
            self.backend.base_url.starts_with("http://")
                || self.backend.base_url.starts_with("https://"),
            "backend.base_url must start with http:// or https://, got {}",
            self.backend.base_url
        );
        anyhow::ensure!(
            self.backend.request_timeout_ms > 0,
            "backend.request_timeout_ms must be > 0, got {}",
            self.backend.request_timeout_ms
        );
        anyhow::ensure!(
            self.polling.refresh_interval_ms > 0,
            "polling.refresh_interval_ms must be > 0, got {}",
            self.polling.refresh_interval_ms
        );
        anyhow::ensure!(
            self.polling.broadcast_capacity > 0,
            "polling.broadcast_capacity must be > 0, got {}",
            self.polling.broadcast_capacity
        );
        anyhow::ensure!(
            !self.resources.resource_group.is_empty(),
            "resources.resource_group must be non-empty"
        );
        anyhow::ensure!(
            !self.resources.storage_account.is_empty(),
            "resources.storage_account must be non-empty"
        );
        anyhow::ensure!(
            !self.resources.vm_name.is_empty(),
            "resources.vm_name must be non-empty"
        );
        anyhow::ensure!(
            !self.auth.token_env.is_empty(),
            "auth.token_env must be non-empty"
        );
        for o in &self.metric_policy {
            anyhow::ensure!(
                !o.widget.is_empty(),
                "metric_policy.widget must be non-empty"
            );
            if let Some(t) = o.uptime_threshold {
                anyhow::ensure!(
                    t.is_finite(),
                    "metric_policy.uptime_threshold for {} must be finite",
                    o.widget
                );
            }
        }
        Ok(())
    }
}
