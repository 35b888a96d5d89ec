use crate::errors::DownloadError;
use http::Uri;
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use url::form_urlencoded;

/// What the caller asked for, from the `artifact` and `plist` query flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestIntent {
    /// `artifact=true`: the binary itself
    Artifact,
    /// `plist=true`: the installer manifest
    Manifest,
    /// Neither flag: the landing page (or the binary where there is no installer flow)
    LandingPage,
}

impl RequestIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestIntent::Artifact => "artifact",
            RequestIntent::Manifest => "manifest",
            RequestIntent::LandingPage => "landing_page",
        }
    }
}

/// A well-formed `/<build-id>/download?token=<token>` request.
#[derive(Debug, PartialEq, Eq)]
pub struct DownloadRequest<'a> {
    pub build_id: Cow<'a, str>,
    pub token: String,
    pub intent: RequestIntent,
}

impl<'a> DownloadRequest<'a> {
    /// Validates the path shape and token before anything is looked up.
    pub fn parse(uri: &'a Uri) -> Result<Self, DownloadError> {
        let build_id = parse_build_id(uri.path()).ok_or(DownloadError::InvalidPath)?;

        let query = uri.query().unwrap_or_default();
        let mut tokens = query_values(query, "token");
        let token = match (tokens.next(), tokens.next()) {
            (Some(token), None) if !token.is_empty() => token,
            _ => return Err(DownloadError::InvalidToken),
        };

        let intent = if first_value_is_true(query, "artifact") {
            RequestIntent::Artifact
        } else if first_value_is_true(query, "plist") {
            RequestIntent::Manifest
        } else {
            RequestIntent::LandingPage
        };

        Ok(DownloadRequest {
            build_id,
            token,
            intent,
        })
    }
}

/// `/<id>/download` with a non-empty `<id>` and nothing else. The id is
/// percent-decoded and may not be a dot segment.
fn parse_build_id(path: &str) -> Option<Cow<'_, str>> {
    let (raw, rest) = path.strip_prefix('/')?.split_once('/')?;
    if rest != "download" {
        return None;
    }

    let build_id = percent_decode_str(raw).decode_utf8().ok()?;
    match build_id.as_ref() {
        "" | "." | ".." => None,
        _ => Some(build_id),
    }
}

fn query_values<'q>(query: &'q str, key: &'q str) -> impl Iterator<Item = String> + 'q {
    form_urlencoded::parse(query.as_bytes())
        .filter(move |(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn first_value_is_true(query: &str, key: &str) -> bool {
    query_values(query, key).next().as_deref() == Some("true")
}
