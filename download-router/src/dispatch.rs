use crate::errors::DownloadError;
use crate::request::RequestIntent;
use build_directory::PlatformType;

/// The response strategy for an authorized request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Stream the binary with the given file extension
    Artifact { extension: &'static str },
    /// Render the installer manifest
    Manifest,
    /// Render the landing page
    LandingPage,
}

impl Delivery {
    pub fn as_str(self) -> &'static str {
        match self {
            Delivery::Artifact { .. } => "artifact",
            Delivery::Manifest => "manifest",
            Delivery::LandingPage => "landing_page",
        }
    }
}

/// Picks the delivery for a platform and intent. Android has no installer flow
/// so every intent yields the `.apk`.
pub fn plan(
    build_id: &str,
    platform: &PlatformType,
    intent: RequestIntent,
) -> Result<Delivery, DownloadError> {
    match (platform, intent) {
        (PlatformType::Android, _) => Ok(Delivery::Artifact { extension: "apk" }),
        (PlatformType::Ios, RequestIntent::Artifact) => Ok(Delivery::Artifact { extension: "ipa" }),
        (PlatformType::Ios, RequestIntent::Manifest) => Ok(Delivery::Manifest),
        (PlatformType::Ios, RequestIntent::LandingPage) => Ok(Delivery::LandingPage),
        (PlatformType::Unknown(_), _) => {
            Err(DownloadError::UnsupportedBuildType(build_id.to_string()))
        }
    }
}
