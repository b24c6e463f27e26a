//! Configuration management for glpidesk

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Environment variable overriding `api_url`
pub const ENV_API_URL: &str = "GLPI_API_URL";

/// Environment variable overriding `app_token`
pub const ENV_APP_TOKEN: &str = "GLPI_APP_TOKEN";

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GLPI REST endpoint, e.g. `https://glpi.example.edu/apirest.php`
    #[serde(default)]
    pub api_url: String,

    /// Static application token sent as `App-Token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_token: Option<String>,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub request: RequestSettings,
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Assumed lifetime of a GLPI session token. GLPI does not report one.
    #[serde(default = "default_lifetime_secs")]
    pub lifetime_secs: u64,

    /// How long before expiry the proactive refresh fires
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,

    /// Grace period before a renewed-away token is closed upstream, so
    /// requests already sent with it can complete (0 closes it at once)
    #[serde(default = "default_retire_delay_secs")]
    pub retire_delay_secs: u64,

    /// Restrict email-shaped identifiers to this domain (e.g. `pucgo.edu.br`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_email_domain: Option<String>,
}

fn default_lifetime_secs() -> u64 {
    3600
}

fn default_refresh_margin_secs() -> u64 {
    60
}

fn default_retire_delay_secs() -> u64 {
    30
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            lifetime_secs: default_lifetime_secs(),
            refresh_margin_secs: default_refresh_margin_secs(),
            retire_delay_secs: default_retire_delay_secs(),
            allowed_email_domain: None,
        }
    }
}

impl SessionSettings {
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.lifetime_secs)
    }

    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }

    pub fn retire_delay(&self) -> Duration {
        Duration::from_secs(self.retire_delay_secs)
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Interval of the background expiry sweep (0 disables it)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    #[serde(default)]
    pub persistence: Persistence,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            persistence: Persistence::default(),
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Where cached responses survive restarts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Persistence {
    /// In-memory only
    #[default]
    None,
    /// Single JSON blob file
    Json { path: PathBuf },
    /// SQLite database file
    Sqlite { path: PathBuf },
}

/// Outbound request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for idempotent reads that failed with a network or timeout error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_requests_per_second() -> u32 {
    10
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

impl RequestSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Config {
    /// Create a configuration for the given endpoint with defaults elsewhere
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ConfigError::Invalid(
            "Could not determine config directory".to_string(),
        ))?;

        Ok(base.join("glpidesk").join("config.yaml"))
    }

    /// Load configuration from the default path, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::default_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // App token is a secret
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Override fields from the environment.
    ///
    /// Takes the lookup as a function so tests don't touch process state.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(token) = lookup(ENV_APP_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.app_token = Some(token);
        }
    }

    /// Validate that the configuration can drive a client
    pub fn validate(&self) -> Result<()> {
        let url = self.api_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingApiUrl.into());
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!("api_url must be http(s): {}", url)).into());
        }
        if self.session.refresh_margin_secs >= self.session.lifetime_secs {
            return Err(ConfigError::Invalid(
                "session.refresh_margin_secs must be shorter than session.lifetime_secs"
                    .to_string(),
            )
            .into());
        }
        if self.request.timeout_secs == 0 {
            return Err(ConfigError::Invalid("request.timeout_secs must be > 0".to_string()).into());
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }
}
