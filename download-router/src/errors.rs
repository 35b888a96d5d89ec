use crate::fetcher::FetchError;
use build_directory::DirectoryError;
use http::StatusCode;
use http_body_util::BodyExt;
use hyper::Response;
use shared::http::make_text_response;
use thiserror::Error;

use crate::GatewayBody;

/// Errors of the download service itself, as opposed to per-request outcomes.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid public hostname: {0}")]
    InvalidHostname(#[from] url::ParseError),

    /// The artifact store failed after the response headers were sent.
    #[error("artifact stream failed: {0}")]
    ArtifactStream(#[from] FetchError),
}

/// How a failed request is reported to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedRequest,
    Unauthorized,
    NotFound,
    UpstreamFailure,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::MalformedRequest => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::UpstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Terminal outcome of a download request that did not succeed. The display
/// string is the plain-text body sent to the caller.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("bad request. route should be called with /<build-id>/download?token=eg-token")]
    InvalidPath,

    #[error("invalid request, missing token")]
    InvalidToken,

    #[error("no resources found for build {0}")]
    BuildNotFound(String),

    #[error("error fetching build {build}")]
    Directory {
        build: String,
        #[source]
        source: DirectoryError,
    },

    #[error("invalid token provided for build {0}")]
    Forbidden(String),

    #[error("missing annotation on build object")]
    MissingAnnotation { build: String, annotation: &'static str },

    #[error("no build type found for build {0}")]
    NoBuildType(String),

    #[error("invalid build type found for build {0}")]
    UnsupportedBuildType(String),

    // Never includes the artifact location.
    #[error("error when streaming artifact")]
    Fetch {
        build: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to build response: {0}")]
    Response(#[from] http::Error),
}

impl DownloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::InvalidPath
            | DownloadError::InvalidToken
            | DownloadError::NoBuildType(_)
            | DownloadError::UnsupportedBuildType(_) => ErrorKind::MalformedRequest,
            DownloadError::Forbidden(_) => ErrorKind::Unauthorized,
            DownloadError::BuildNotFound(_) => ErrorKind::NotFound,
            DownloadError::Directory { .. }
            | DownloadError::MissingAnnotation { .. }
            | DownloadError::Fetch { .. }
            | DownloadError::Response(_) => ErrorKind::UpstreamFailure,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }

    pub fn into_response(self) -> Response<GatewayBody> {
        make_text_response(self.status_code(), format!("{self}\n"))
            .map(|body| body.map_err(|e| match e {}).boxed_unsync())
    }
}
