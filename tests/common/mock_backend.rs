//! Canned backend served by axum on a local port. Answers from a route table and
//! records every request it sees.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Canned {
    method: String,
    path: String,
    status: StatusCode,
    body: String,
}

#[derive(Default)]
struct Shared {
    routes: Mutex<Vec<Canned>>,
    requests: Mutex<Vec<Recorded>>,
}

/// The server lives as long as this value; dropping it shuts the runtime down.
pub struct MockBackend {
    port: u16,
    shared: Arc<Shared>,
    _runtime: Runtime,
}

impl MockBackend {
    pub fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let shared = Arc::new(Shared::default());
        let app = Router::new().fallback(answer).with_state(shared.clone());

        let listener = runtime.block_on(TcpListener::bind("127.0.0.1:0")).unwrap();
        let port = listener.local_addr().unwrap().port();
        runtime.spawn(async move { axum::serve(listener, app).await });

        MockBackend {
            port,
            shared,
            _runtime: runtime,
        }
    }

    /// API root to hand to the client, e.g. `http://127.0.0.1:40123/api`.
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/api", self.port)
    }

    /// Answer `method path` (path below `/api`) with `status` and `body`. Later calls win.
    pub fn respond(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        self.shared.routes.lock().unwrap().push(Canned {
            method: method.to_string(),
            path: format!("/api{}", path),
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        });
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: &str, path: &str) -> Vec<Recorded> {
        let full = format!("/api{}", path);
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == full)
            .collect()
    }
}

async fn answer(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let method = method.to_string();
    let path = uri.path().to_string();

    let canned = shared
        .routes
        .lock()
        .unwrap()
        .iter()
        .rev()
        .find(|c| c.method == method && c.path == path)
        .cloned();
    shared.requests.lock().unwrap().push(Recorded {
        method,
        path,
        headers: headers
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let (status, body) = match canned {
        Some(c) => (c.status, c.body),
        None => (StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    };
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
