use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Public hostname cannot be empty")]
    EmptyPublicHostname,

    #[error("Invalid public hostname: {0}")]
    InvalidPublicHostname(#[from] url::ParseError),

    #[error("Connect timeout cannot be 0")]
    InvalidConnectTimeout,
}

fn default_listener() -> Listener {
    Listener {
        host: "0.0.0.0".into(),
        port: 8080,
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8081,
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Download service configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for download requests
    #[serde(default = "default_listener")]
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    /// Host (and optional port) the gateway is reachable at from devices.
    /// Used to build the iOS installer URLs.
    pub public_hostname: String,
    #[serde(default)]
    pub artifact_store: ArtifactStoreConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.public_hostname.is_empty() {
            return Err(ValidationError::EmptyPublicHostname);
        }
        crate::manifest_url::ManifestUrlBuilder::new(&self.public_hostname)?;

        self.artifact_store.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Connection settings for the artifact store
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ArtifactStoreConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ArtifactStoreConfig {
    fn default() -> Self {
        ArtifactStoreConfig {
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ArtifactStoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.connect_timeout_secs == 0 {
            return Err(ValidationError::InvalidConnectTimeout);
        }
        Ok(())
    }
}
