//! Serves mobile application builds to devices.
//!
//! A request names a build and carries its download token. The router checks
//! the token against the build record from the [`BuildDirectory`] and then
//! either relays the binary from the artifact store or, for iOS, renders the
//! documents driving over-the-air installation.

pub mod authorize;
pub mod body;
pub mod config;
pub mod dispatch;
pub mod documents;
pub mod errors;
pub mod fetcher;
pub mod manifest_url;
pub mod metrics_defs;
pub mod request;
pub mod router;
pub mod service;
#[cfg(test)]
mod testutils;

use build_directory::BuildDirectory;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::body::Bytes;
use shared::admin_service::AdminService;
use shared::http::run_http_service;
use std::sync::Arc;

pub use errors::{DownloadError, GatewayError};
pub use fetcher::{ArtifactFetcher, HttpArtifactFetcher};
pub use manifest_url::ManifestUrlBuilder;
pub use router::DownloadRouter;

/// Body of every response on the download listener.
pub type GatewayBody = UnsyncBoxBody<Bytes, GatewayError>;

/// Serves downloads and the admin endpoints until either listener fails.
pub async fn run(
    config: config::Config,
    directory: Arc<dyn BuildDirectory>,
    fetcher: Arc<dyn ArtifactFetcher>,
    credential: String,
) -> Result<(), GatewayError> {
    let urls = ManifestUrlBuilder::new(&config.public_hostname)?;
    let router = DownloadRouter::new(directory.clone(), fetcher, credential, urls);
    let download_service = service::DownloadService::new(router);

    let admin_service =
        AdminService::<_, GatewayError>::new(move || directory.is_ready());

    let download_task = run_http_service(
        &config.listener.host,
        config.listener.port,
        download_service,
    );
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        admin_service,
    );

    tokio::try_join!(download_task, admin_task)?;
    Ok(())
}
