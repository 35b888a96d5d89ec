use build_directory::config::Config as DirectoryConfig;
use download_router::config::Config as DownloadConfig;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// Replaces `listener.port`.
pub const SERVICE_PORT_ENV: &str = "GATEWAY_SERVICE_PORT";
/// Replaces `public_hostname`.
pub const PUBLIC_HOSTNAME_ENV: &str = "GATEWAY_PUBLIC_HOSTNAME";

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Deserialize, Debug)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(flatten)]
    pub download: DownloadConfig,
    pub build_directory: DirectoryConfig,
}

impl Config {
    /// Loads the YAML file at `path`, applies environment overrides and validates.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut config: Config = serde_yaml::from_reader(file)?;

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(SERVICE_PORT_ENV) {
            self.download.listener.port =
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnvironmentOverride {
                        name: SERVICE_PORT_ENV,
                        value,
                    })?;
        }
        if let Some(value) = lookup(PUBLIC_HOSTNAME_ENV) {
            self.download.public_hostname = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.download.validate()?;
        self.build_directory.validate()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("invalid value {value:?} for {name}")]
    InvalidEnvironmentOverride { name: &'static str, value: String },
    #[error("invalid config: {0}")]
    Download(#[from] download_router::config::ValidationError),
    #[error("invalid build directory config: {0}")]
    BuildDirectory(#[from] build_directory::config::ConfigError),
}
