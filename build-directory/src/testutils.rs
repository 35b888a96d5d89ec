use crate::types::BuildRecord;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use parking_lot::Mutex;
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use url::Url;

const BUILDS_PATH: &str = "/apis/build.openshift.io/v1/namespaces/mobile/builds";

#[derive(Default)]
pub struct MockState {
    builds: Mutex<Vec<BuildRecord>>,
    failing_lists: AtomicUsize,
    authorization: Mutex<Option<String>>,
    pub list_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl MockState {
    pub fn set_builds(&self, builds: Vec<BuildRecord>) {
        *self.builds.lock() = builds;
    }

    /// The next `n` list requests answer with 503.
    pub fn fail_next_lists(&self, n: usize) {
        self.failing_lists.store(n, Ordering::Relaxed);
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.authorization.lock().clone()
    }

    fn respond(&self, req: &Request<Incoming>) -> Response<Full<Bytes>> {
        if let Some(auth) = req.headers().get("authorization") {
            *self.authorization.lock() = auth.to_str().ok().map(String::from);
        }

        let path = req.uri().path();
        if path == BUILDS_PATH {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            let failing = self.failing_lists.load(Ordering::Relaxed);
            if failing > 0 {
                self.failing_lists.store(failing - 1, Ordering::Relaxed);
                return status(StatusCode::SERVICE_UNAVAILABLE);
            }
            let items: Vec<_> = self
                .builds
                .lock()
                .iter()
                .map(|b| serde_json::json!({ "metadata": b }))
                .collect();
            return json(serde_json::json!({ "kind": "BuildList", "items": items }));
        }

        if let Some(name) = path
            .strip_prefix(BUILDS_PATH)
            .and_then(|p| p.strip_prefix('/'))
        {
            self.get_calls.fetch_add(1, Ordering::Relaxed);
            return match self.builds.lock().iter().find(|b| b.name == name) {
                Some(build) => json(serde_json::json!({ "kind": "Build", "metadata": build })),
                None => status(StatusCode::NOT_FOUND),
            };
        }

        status(StatusCode::NOT_FOUND)
    }
}

fn json(value: serde_json::Value) -> Response<Full<Bytes>> {
    Response::new(Full::new(Bytes::from(value.to_string())))
}

fn status(code: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = code;
    response
}

/// In-process stand-in for the orchestration platform's builds API, serving
/// the `mobile` namespace.
pub struct MockOrchestrator {
    pub url: Url,
    pub state: Arc<MockState>,
}

impl MockOrchestrator {
    pub async fn spawn(builds: Vec<BuildRecord>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(MockState::default());
        state.set_builds(builds);

        let server_state = state.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);
                let state = server_state.clone();

                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let response = state.respond(&req);
                        async move { Ok::<_, Infallible>(response) }
                    });
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, svc)
                        .await;
                });
            }
        });

        MockOrchestrator {
            url: Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
            state,
        }
    }
}
