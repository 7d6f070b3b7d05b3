//! Client configuration

use crate::error::{CoreError, CoreResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable overriding the credential/state directory
pub const STATE_DIR_ENV: &str = "HRDESK_STATE_DIR";

/// Top-level client settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend API configuration
    pub api: ApiConfig,

    /// Where persisted client state lives
    pub storage: StorageConfig,

    /// Route guard configuration
    pub guard: GuardConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST backend
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Persisted state configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the credential file and logs
    pub state_dir: PathBuf,
}

/// Route guard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Path prefixes that require a stored access credential
    pub protected_prefixes: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: concat!("hrdesk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/admin".to_string(), "/employee".to_string()],
        }
    }
}

impl ApiConfig {
    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and `HRDESK__*`
    /// environment variables (e.g. `HRDESK__API__BASE_URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// resulting settings are invalid
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", defaults.api.timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default(
                "storage.state_dir",
                defaults.storage.state_dir.to_string_lossy().into_owned(),
            )?
            .set_default("guard.protected_prefixes", defaults.guard.protected_prefixes)?;

        if let Some(path) = path {
            debug!(path = %path.display(), "loading settings file");
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix("HRDESK")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("guard.protected_prefixes")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings are usable
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed or non-HTTP base URL, or a protected
    /// prefix that is not an absolute path
    pub fn validate(&self) -> CoreResult<()> {
        let url = url::Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::invalid_config(format!(
                "api.base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if let Some(prefix) = self
            .guard
            .protected_prefixes
            .iter()
            .find(|prefix| !prefix.starts_with('/'))
        {
            return Err(CoreError::invalid_config(format!(
                "protected prefix must start with '/': {prefix}"
            )));
        }

        Ok(())
    }

    /// Path of the persisted credential file
    pub fn credentials_path(&self) -> PathBuf {
        self.storage.state_dir.join("credentials.json")
    }
}

/// Default state directory: `HRDESK_STATE_DIR`, then the platform data dir
pub fn default_state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        return PathBuf::from(dir);
    }

    ProjectDirs::from("com", "hrdesk", "hrdesk")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".hrdesk"))
}
