use async_trait::async_trait;
use futures_util::{Stream, TryStreamExt};
use hyper::body::Bytes;
use reqwest::StatusCode;
use std::pin::Pin;
use std::time::Duration;

pub type ArtifactStream = Pin<Box<dyn Stream<Item = Result<Bytes, FetchError>> + Send>>;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("artifact not found")]
    NotFound,
    #[error("artifact store responded with {0}")]
    UnexpectedStatus(StatusCode),
    #[error("artifact request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("artifact stream interrupted: {0}")]
    Interrupted(String),
}

/// Streams artifacts out of the artifact store.
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    /// Opens the artifact at `url`, authenticating with `credential`. The stream
    /// is released when dropped.
    async fn stream(&self, url: &str, credential: &str) -> Result<ArtifactStream, FetchError>;
}

/// Fetches artifacts over HTTP with bearer authentication.
pub struct HttpArtifactFetcher {
    client: reqwest::Client,
}

impl HttpArtifactFetcher {
    pub fn new(connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(HttpArtifactFetcher { client })
    }
}

#[async_trait]
impl ArtifactFetcher for HttpArtifactFetcher {
    async fn stream(&self, url: &str, credential: &str) -> Result<ArtifactStream, FetchError> {
        // Artifact URLs may embed credentials, keep them out of errors.
        let response = self
            .client
            .get(url)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| e.without_url())?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound),
            status if !status.is_success() => Err(FetchError::UnexpectedStatus(status)),
            _ => Ok(Box::pin(
                response
                    .bytes_stream()
                    .map_err(|e| FetchError::from(e.without_url())),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use http_body_util::Full;
    use hyper::body::Incoming;
    use hyper::service::service_fn;
    use hyper::{Request, Response};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    // Serves `/app.apk` to callers presenting the `svc` bearer token.
    async fn artifact_store(
        req: Request<Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        let authorized = req
            .headers()
            .get("authorization")
            .is_some_and(|v| v == "Bearer svc");

        let mut response = Response::new(Full::new(Bytes::new()));
        match (authorized, req.uri().path()) {
            (false, _) => *response.status_mut() = StatusCode::UNAUTHORIZED,
            (true, "/app.apk") => *response.body_mut() = Full::new(Bytes::from_static(b"APK")),
            (true, _) => *response.status_mut() = StatusCode::NOT_FOUND,
        }
        Ok(response)
    }

    async fn start_artifact_store() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service_fn(artifact_store))
                        .await;
                });
            }
        });

        port
    }

    async fn collect(stream: ArtifactStream) -> Vec<u8> {
        stream
            .map(|chunk| chunk.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    #[tokio::test]
    async fn test_stream_artifact() {
        let port = start_artifact_store().await;
        let fetcher = HttpArtifactFetcher::new(Duration::from_secs(5)).unwrap();

        let stream = fetcher
            .stream(&format!("http://127.0.0.1:{port}/app.apk"), "svc")
            .await
            .unwrap();
        assert_eq!(collect(stream).await, b"APK");
    }

    #[tokio::test]
    async fn test_not_found_and_unauthorized() {
        let port = start_artifact_store().await;
        let fetcher = HttpArtifactFetcher::new(Duration::from_secs(5)).unwrap();

        let missing = fetcher
            .stream(&format!("http://127.0.0.1:{port}/other.apk"), "svc")
            .await;
        assert!(matches!(missing, Err(FetchError::NotFound)));

        let unauthorized = fetcher
            .stream(&format!("http://127.0.0.1:{port}/app.apk"), "caller-token")
            .await;
        assert!(matches!(
            unauthorized,
            Err(FetchError::UnexpectedStatus(StatusCode::UNAUTHORIZED))
        ));
    }

    #[tokio::test]
    async fn test_errors_do_not_contain_url() {
        let fetcher = HttpArtifactFetcher::new(Duration::from_secs(1)).unwrap();
        let Err(err) = fetcher
            .stream("http://127.0.0.1:1/secret-path?sig=s3cr3t", "svc")
            .await
        else {
            panic!("connection should fail");
        };
        assert!(!err.to_string().contains("s3cr3t"));
    }
}
