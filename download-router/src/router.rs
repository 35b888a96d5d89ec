use crate::GatewayBody;
use crate::authorize::{AuthorizedBuild, authorize};
use crate::body::ArtifactBody;
use crate::dispatch::{Delivery, plan};
use crate::documents::{render_landing_page, render_manifest};
use crate::errors::{DownloadError, ErrorKind};
use crate::fetcher::ArtifactFetcher;
use crate::manifest_url::ManifestUrlBuilder;
use crate::metrics_defs::{DOWNLOADS, REQUEST_DURATION};
use crate::request::DownloadRequest;
use build_directory::BuildDirectory;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderValue};
use http::{Method, Response, Uri};
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Turns a download request into a response: validates it, authorizes the
/// caller against the build directory and then streams the binary or renders
/// one of the iOS installation documents.
pub struct DownloadRouter {
    directory: Arc<dyn BuildDirectory>,
    fetcher: Arc<dyn ArtifactFetcher>,
    // Presented to the artifact store; never the caller's token.
    credential: String,
    urls: ManifestUrlBuilder,
}

impl DownloadRouter {
    pub fn new(
        directory: Arc<dyn BuildDirectory>,
        fetcher: Arc<dyn ArtifactFetcher>,
        credential: impl Into<String>,
        urls: ManifestUrlBuilder,
    ) -> Self {
        DownloadRouter {
            directory,
            fetcher,
            credential: credential.into(),
            urls,
        }
    }

    /// Handles a request. Failures become plain-text responses carrying the
    /// status of their error kind.
    pub async fn handle(&self, method: &Method, uri: &Uri) -> Response<GatewayBody> {
        let start = Instant::now();

        let response = match self.try_handle(method, uri).await {
            Ok(response) => response,
            Err(e) => {
                log_failure(&e);
                e.into_response()
            }
        };

        histogram!(REQUEST_DURATION, "status" => response.status().as_str().to_owned())
            .record(start.elapsed().as_secs_f64());
        response
    }

    pub async fn try_handle(
        &self,
        method: &Method,
        uri: &Uri,
    ) -> Result<Response<GatewayBody>, DownloadError> {
        // Nothing is looked up for a malformed request.
        let request = DownloadRequest::parse(uri)?;

        let authorized =
            authorize(self.directory.as_ref(), &request.build_id, &request.token).await?;
        let delivery = plan(&request.build_id, &authorized.platform, request.intent)?;

        tracing::info!(
            build = %authorized.build.name,
            platform = %authorized.platform,
            delivery = delivery.as_str(),
            "serving download"
        );
        counter!(
            DOWNLOADS,
            "platform" => authorized.platform.as_str().to_owned(),
            "delivery" => delivery.as_str()
        )
        .increment(1);

        match delivery {
            Delivery::Artifact { extension } => {
                self.stream_artifact(&authorized, extension, *method == Method::HEAD)
                    .await
            }
            Delivery::Manifest => {
                let artifact_url = self.urls.artifact_url(uri);
                Ok(document_response(
                    "application/xml",
                    render_manifest(&artifact_url, &authorized.build.name),
                ))
            }
            Delivery::LandingPage => {
                let manifest_url = self.urls.manifest_url(uri);
                Ok(document_response(
                    "text/html",
                    render_landing_page(&manifest_url),
                ))
            }
        }
    }

    async fn stream_artifact(
        &self,
        authorized: &AuthorizedBuild,
        extension: &str,
        headers_only: bool,
    ) -> Result<Response<GatewayBody>, DownloadError> {
        let name = &authorized.build.name;
        let disposition = HeaderValue::from_str(&format!(
            "attachment; filename=\"{name}.{extension}\""
        ))
        .map_err(http::Error::from)?;

        // A HEAD response has no body, so the store is not contacted.
        let body = if headers_only {
            Empty::new().map_err(|e| match e {}).boxed_unsync()
        } else {
            let stream = self
                .fetcher
                .stream(&authorized.artifact_url, &self.credential)
                .await
                .map_err(|source| DownloadError::Fetch {
                    build: name.clone(),
                    source,
                })?;
            ArtifactBody::new(stream, name.as_str()).boxed_unsync()
        };

        let mut response = Response::new(body);
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("octet/stream"));
        headers.insert(CONTENT_DISPOSITION, disposition);
        Ok(response)
    }
}

fn document_response(content_type: &'static str, document: String) -> Response<GatewayBody> {
    let body = Full::new(Bytes::from(document))
        .map_err(|e| match e {})
        .boxed_unsync();
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn log_failure(error: &DownloadError) {
    match error {
        DownloadError::Directory { build, source } => {
            tracing::error!(build = %build, error = %source, "error fetching build");
        }
        DownloadError::MissingAnnotation { build, annotation } => {
            tracing::error!(build = %build, annotation, "build is missing a required annotation");
        }
        DownloadError::Fetch { build, source } => {
            tracing::error!(build = %build, error = %source, "error when streaming artifact");
        }
        other if other.kind() == ErrorKind::UpstreamFailure => {
            tracing::error!(error = %other, "request failed");
        }
        other => {
            tracing::info!(error = %other, status = other.status_code().as_u16(), "request rejected");
        }
    }
}
