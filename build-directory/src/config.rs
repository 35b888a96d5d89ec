use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

fn default_refresh_interval_secs() -> u64 {
    30
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("namespace cannot be empty")]
    EmptyNamespace,
    #[error("refresh interval cannot be 0")]
    InvalidRefreshInterval,
    #[error("exactly one of service_token and service_token_file must be set")]
    AmbiguousServiceToken,
    #[error("service token is empty")]
    EmptyServiceToken,
    #[error("could not read service token file: {0}")]
    ServiceTokenFile(#[from] std::io::Error),
}

/// Connection to the orchestration platform that owns the builds.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    /// Base URL of the orchestration platform API
    pub url: Url,
    /// Namespace the builds live in
    pub namespace: String,
    /// Optional label selector restricting which builds are watched
    pub label_selector: Option<String>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    pub service_token: Option<String>,
    pub service_token_file: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        if self.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }
        if self.service_token.is_some() == self.service_token_file.is_some() {
            return Err(ConfigError::AmbiguousServiceToken);
        }
        Ok(())
    }

    /// The credential the gateway presents to the orchestration platform and the
    /// artifact store. Token files are read once, surrounding whitespace is dropped.
    pub fn service_token(&self) -> Result<String, ConfigError> {
        let token = match (&self.service_token, &self.service_token_file) {
            (Some(token), None) => token.trim().to_string(),
            (None, Some(path)) => std::fs::read_to_string(path)?.trim().to_string(),
            _ => return Err(ConfigError::AmbiguousServiceToken),
        };

        if token.is_empty() {
            return Err(ConfigError::EmptyServiceToken);
        }
        Ok(token)
    }
}
