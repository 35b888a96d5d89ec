use crate::GatewayBody;
use crate::errors::GatewayError;
use crate::metrics_defs::REQUESTS_INFLIGHT;
use crate::router::DownloadRouter;
use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use shared::gauge;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// The public download listener.
pub struct DownloadService {
    router: Arc<DownloadRouter>,
}

impl DownloadService {
    pub fn new(router: DownloadRouter) -> Self {
        DownloadService {
            router: Arc::new(router),
        }
    }
}

impl Service<Request<Incoming>> for DownloadService {
    type Response = Response<GatewayBody>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let router = self.router.clone();
        Box::pin(async move {
            let _inflight = InflightGuard::new();
            Ok(router.handle(req.method(), req.uri()).await)
        })
    }
}

struct InflightGuard;

impl InflightGuard {
    fn new() -> Self {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        InflightGuard
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest_url::ManifestUrlBuilder;
    use crate::testutils::{FakeDirectory, FakeFetcher};
    use build_directory::{BuildRecord, DOWNLOAD_KEY, PLATFORM_KEY, TOKEN_KEY};
    use http_body_util::{BodyExt, Empty};
    use hyper::StatusCode;
    use hyper::body::Bytes;
    use hyper_util::client::legacy::Client;
    use hyper_util::client::legacy::connect::HttpConnector;
    use hyper_util::rt::TokioExecutor;
    use shared::http::serve;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_download_over_http() {
        let directory = Arc::new(FakeDirectory::new(vec![
            BuildRecord::new("build42")
                .with_label(PLATFORM_KEY, "android")
                .with_annotation(TOKEN_KEY, "right")
                .with_annotation(DOWNLOAD_KEY, "http://store/build42.apk"),
        ]));
        let fetcher =
            Arc::new(FakeFetcher::new().with_artifact("http://store/build42.apk", &["APK"]));
        let router = DownloadRouter::new(
            directory,
            fetcher,
            "svc",
            ManifestUrlBuilder::new("gateway.example.com").unwrap(),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(serve(listener, DownloadService::new(router)));

        let client: Client<HttpConnector, Empty<Bytes>> =
            Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let ok = client
            .get(format!("http://127.0.0.1:{port}/build42/download?token=right").parse().unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let body = ok.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"APK");

        let forbidden = client
            .get(format!("http://127.0.0.1:{port}/build42/download?token=nope").parse().unwrap())
            .await
            .unwrap();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }
}
