//! Mock Extensions API server
//!
//! Serves the four Extensions API routes from scripted state so the client
//! and the event loop can be exercised over real HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use lambdaext_core::api::{
    base_path, EXIT_ERROR_PATH, EXTENSION_IDENTIFIER_HEADER, INIT_ERROR_PATH, NEXT_EVENT_PATH,
    REGISTER_PATH,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

/// SHUTDOWN body the builder's [`MockServerBuilder::shutdown`] scripts
pub const SHUTDOWN_EVENT: &str =
    r#"{"eventType":"SHUTDOWN","shutdownReason":"spindown","deadlineMs":0}"#;

/// How `POST /register` answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterBehaviour {
    /// 200 with `lambda-extension-identifier: id`
    Accept { id: String },
    /// 200 without the identifier header
    NoIdentifier,
    /// Error status, no identifier
    Reject { status: u16 },
}

/// A request as the mock saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RecordedRequest {
    /// Look up a header, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
struct ScriptedEvent {
    status: StatusCode,
    body: Bytes,
}

struct MockState {
    register: RegisterBehaviour,
    error_status: StatusCode,
    /// Scripted next-event responses, consumed in order
    events_rx: Mutex<mpsc::UnboundedReceiver<ScriptedEvent>>,
    requests: RwLock<Vec<RecordedRequest>>,
}

impl MockState {
    async fn record(&self, method: &Method, uri: &Uri, headers: &HeaderMap, body: Bytes) {
        let headers = headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();

        debug!(method = %method, path = %uri.path(), "Mock Extensions API request");

        self.requests.write().await.push(RecordedRequest {
            method: method.to_string(),
            path: uri.path().to_string(),
            headers,
            body,
        });
    }
}

/// Builder for [`MockServer`]
pub struct MockServerBuilder {
    register: RegisterBehaviour,
    error_status: u16,
    events: Vec<ScriptedEvent>,
}

impl Default for MockServerBuilder {
    fn default() -> Self {
        Self {
            register: RegisterBehaviour::Accept {
                id: uuid::Uuid::new_v4().to_string(),
            },
            error_status: 200,
            events: Vec::new(),
        }
    }
}

impl MockServerBuilder {
    /// Issue `id` on registration
    pub fn extension_id(mut self, id: impl Into<String>) -> Self {
        self.register = RegisterBehaviour::Accept { id: id.into() };
        self
    }

    /// Answer registration without an identifier header
    pub fn without_identifier(mut self) -> Self {
        self.register = RegisterBehaviour::NoIdentifier;
        self
    }

    pub fn reject_registration(mut self, status: u16) -> Self {
        self.register = RegisterBehaviour::Reject { status };
        self
    }

    /// Status for `/init/error` and `/exit/error`
    pub fn error_status(mut self, status: u16) -> Self {
        self.error_status = status;
        self
    }

    /// Queue a 200 next-event response with `body`
    pub fn event(self, body: impl Into<Bytes>) -> Self {
        self.response(200, body)
    }

    /// Queue a next-event response with an arbitrary status
    pub fn response(mut self, status: u16, body: impl Into<Bytes>) -> Self {
        self.events.push(ScriptedEvent {
            status: status_code(status),
            body: body.into(),
        });
        self
    }

    /// Queue a SHUTDOWN event
    pub fn shutdown(self) -> Self {
        self.event(SHUTDOWN_EVENT)
    }

    /// Bind to an ephemeral localhost port and start serving
    pub async fn start(self) -> std::io::Result<MockServer> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        for event in self.events {
            // receiver is alive, send cannot fail
            let _ = events_tx.send(event);
        }

        let state = Arc::new(MockState {
            register: self.register,
            error_status: status_code(self.error_status),
            events_rx: Mutex::new(events_rx),
            requests: RwLock::new(Vec::new()),
        });

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let router = mock_router(state.clone());
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        debug!(%addr, "Mock Extensions API listening");

        Ok(MockServer {
            addr,
            state,
            events_tx,
            handle,
        })
    }
}

/// A running mock Extensions API
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    events_tx: mpsc::UnboundedSender<ScriptedEvent>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::default()
    }

    /// host:port, the value `AWS_LAMBDA_RUNTIME_API` would hold
    pub fn runtime_api(&self) -> String {
        self.addr.to_string()
    }

    /// Identifier handed out on registration, if any
    pub fn extension_id(&self) -> Option<&str> {
        match &self.state.register {
            RegisterBehaviour::Accept { id } => Some(id.as_str()),
            _ => None,
        }
    }

    /// Queue another next-event response while the server is running
    pub fn push_response(&self, status: u16, body: impl Into<Bytes>) {
        let _ = self.events_tx.send(ScriptedEvent {
            status: status_code(status),
            body: body.into(),
        });
    }

    pub fn push_shutdown(&self) {
        self.push_response(200, SHUTDOWN_EVENT);
    }

    /// Every request received so far, in arrival order
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().await.clone()
    }

    /// Requests whose path ends with `route`, e.g. `"/event/next"`
    pub async fn requests_to(&self, route: &str) -> Vec<RecordedRequest> {
        self.state
            .requests
            .read()
            .await
            .iter()
            .filter(|r| r.path.ends_with(route))
            .cloned()
            .collect()
    }

    pub async fn next_event_calls(&self) -> usize {
        self.requests_to(NEXT_EVENT_PATH).await.len()
    }

    /// Wait until `route` has been hit at least `count` times
    ///
    /// Returns false if that does not happen within five seconds.
    pub async fn wait_for(&self, route: &str, count: usize) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            if self.requests_to(route).await.len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn mock_router(state: Arc<MockState>) -> Router {
    let base = base_path();
    Router::new()
        .route(&format!("{}{}", base, REGISTER_PATH), post(register))
        .route(&format!("{}{}", base, NEXT_EVENT_PATH), get(next_event))
        .route(&format!("{}{}", base, INIT_ERROR_PATH), post(report_error))
        .route(&format!("{}{}", base, EXIT_ERROR_PATH), post(report_error))
        .with_state(state)
}

/// POST /register
async fn register(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(&method, &uri, &headers, body).await;

    let details = Json(json!({
        "functionName": "mock-function",
        "functionVersion": "$LATEST",
        "handler": "index.handler",
    }));

    match &state.register {
        RegisterBehaviour::Accept { id } => (
            StatusCode::OK,
            [(EXTENSION_IDENTIFIER_HEADER, id.clone())],
            details,
        )
            .into_response(),
        RegisterBehaviour::NoIdentifier => (StatusCode::OK, details).into_response(),
        RegisterBehaviour::Reject { status } => (
            status_code(*status),
            Json(json!({
                "errorMessage": "registration rejected",
                "errorType": "Extension.RegistrationRejected",
            })),
        )
            .into_response(),
    }
}

/// GET /event/next
///
/// Blocks until a scripted response is available.
async fn next_event(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    state.record(&method, &uri, &headers, Bytes::new()).await;

    let scripted = {
        let mut rx = state.events_rx.lock().await;
        rx.recv().await
    };

    match scripted {
        Some(event) => (
            event.status,
            [(header::CONTENT_TYPE, "application/json")],
            event.body,
        )
            .into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "Event channel closed").into_response(),
    }
}

/// POST /init/error and POST /exit/error
async fn report_error(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(&method, &uri, &headers, body).await;

    if state.error_status == StatusCode::OK {
        (StatusCode::OK, Json(json!({"status": "OK"}))).into_response()
    } else {
        (state.error_status, "error report rejected").into_response()
    }
}
