use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Annotation holding the access token a download request must present.
pub const TOKEN_KEY: &str = "artifact-gateway/download-token";

/// Annotation holding the artifact store URL of the build's binary.
pub const DOWNLOAD_KEY: &str = "artifact-gateway/download-url";

/// Label (or annotation) naming the mobile platform a build targets.
pub const PLATFORM_KEY: &str = "mobile-client-build-platform";

/// A completed build as seen by the orchestration platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub name: String,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl BuildRecord {
    pub fn new<N: Into<String>>(name: N) -> Self {
        BuildRecord {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_annotation<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.annotations.insert(key.into(), value.into());
        self
    }

    pub fn with_label<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlatformType {
    Android,
    Ios,
    /// A platform key was present but its value is not supported.
    Unknown(String),
}

impl PlatformType {
    /// Reads the platform from the build's labels, falling back to its annotations.
    /// Returns `None` when neither carries the platform key.
    pub fn classify(build: &BuildRecord) -> Option<PlatformType> {
        build
            .labels
            .get(PLATFORM_KEY)
            .or_else(|| build.annotations.get(PLATFORM_KEY))
            .map(|value| PlatformType::from_value(value))
    }

    fn from_value(value: &str) -> PlatformType {
        match value {
            "android" => PlatformType::Android,
            "ios" => PlatformType::Ios,
            other => PlatformType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlatformType::Android => "android",
            PlatformType::Ios => "ios",
            PlatformType::Unknown(value) => value,
        }
    }
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
