use crate::errors::DownloadError;
use build_directory::{
    BuildDirectory, BuildRecord, DOWNLOAD_KEY, DirectoryError, PlatformType, TOKEN_KEY,
};
use subtle::ConstantTimeEq;

/// A build the caller has proven access to.
#[derive(Debug)]
pub struct AuthorizedBuild {
    pub build: BuildRecord,
    pub artifact_url: String,
    pub platform: PlatformType,
}

/// Resolves `build_id` and checks `token` against the build's token annotation.
pub async fn authorize(
    directory: &dyn BuildDirectory,
    build_id: &str,
    token: &str,
) -> Result<AuthorizedBuild, DownloadError> {
    let build = directory
        .resolve_build(build_id)
        .await
        .map_err(|e| match e {
            DirectoryError::NotFound(_) => DownloadError::BuildNotFound(build_id.to_string()),
            source => DownloadError::Directory {
                build: build_id.to_string(),
                source,
            },
        })?;

    let authorized = build
        .annotation(TOKEN_KEY)
        .is_some_and(|expected| tokens_match(expected, token));
    if !authorized {
        return Err(DownloadError::Forbidden(build_id.to_string()));
    }

    let artifact_url = match build.annotation(DOWNLOAD_KEY) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => {
            return Err(DownloadError::MissingAnnotation {
                build: build_id.to_string(),
                annotation: DOWNLOAD_KEY,
            });
        }
    };

    let platform = directory
        .classify_build_type(&build)
        .map_err(|_| DownloadError::NoBuildType(build_id.to_string()))?;

    Ok(AuthorizedBuild {
        build,
        artifact_url,
        platform,
    })
}

// Constant time for tokens of equal length.
fn tokens_match(expected: &str, supplied: &str) -> bool {
    !supplied.is_empty() && bool::from(expected.as_bytes().ct_eq(supplied.as_bytes()))
}
