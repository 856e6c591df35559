//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum router
//! over an in-memory message store, plus webhook signing and polling utilities.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] to stand up a fake channel send endpoint, or
//! when a test needs real sockets instead of `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use mp_common::{Channel, Message, NewMessage};
use mp_server::api::{create_router, AppState};
use mp_server::config::Config;
use mp_server::messages::{InMemoryMessageStore, MessageStore};
use mp_server::messenger::signing::{signature_header, SIGNATURE_HEADER};
use mp_server::messenger::{ChannelClient, DispatchConfig, Dispatcher};
use tokio::task::JoinHandle;
use tower::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_URI: &str = "/api/messaging/receive/fbmessenger";
pub const SEND_URI: &str = "/api/messaging/send/fbmessenger";

// ============================================================================
// Test App
// ============================================================================

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryMessageStore>,
    pub dispatcher: Dispatcher,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a new test app with the default test config.
    pub fn new() -> Self {
        Self::with_config(Config::default_for_test())
    }

    /// Create a test app with a custom config (e.g. a fake send endpoint).
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryMessageStore::new());
        let (dispatcher, _worker) = Dispatcher::spawn(
            store.clone() as Arc<dyn MessageStore>,
            DispatchConfig::from_config(&config),
        );
        let channel =
            ChannelClient::from_config(&config).expect("Failed to build channel client");

        let state = AppState::new(store.clone(), config.clone(), dispatcher.clone(), channel);
        let router = create_router(state);

        Self {
            router,
            store,
            dispatcher,
            config: Arc::new(config),
        }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }

    /// POST a webhook body signed with the app secret.
    pub async fn post_signed_webhook(&self, payload: &serde_json::Value) -> Response<Body> {
        let body = serde_json::to_vec(payload).unwrap();
        let req = Self::request(Method::POST, WEBHOOK_URI)
            .header("Content-Type", "application/json")
            .header(SIGNATURE_HEADER, signature_header(&self.config.app_secret, &body))
            .body(Body::from(body))
            .unwrap();
        self.oneshot(req).await
    }

    /// Store a survey message for `recipient_id` and return its ID.
    pub async fn seed_message(&self, recipient_id: &str) -> Uuid {
        self.store
            .create(NewMessage {
                id: Uuid::now_v7(),
                channel: Channel::FbMessenger,
                recipient_id: recipient_id.into(),
                template_type: "customer_feedback".into(),
                body: serde_json::json!({}),
            })
            .await
            .expect("Failed to seed message")
    }

    /// Wait until the dispatcher has finished `expected` sub-events.
    pub async fn wait_for_dispatch(&self, expected: u64) {
        let finished = wait_for(|| self.dispatcher.stats().completed() >= expected).await;
        assert!(
            finished,
            "dispatch did not complete: {:?}",
            self.dispatcher.stats()
        );
    }

    pub fn message(&self, id: Uuid) -> Message {
        self.store.get(id).expect("message not found")
    }
}

/// Poll `condition` every 10ms for up to 5 seconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// Webhook payloads
// ============================================================================

/// Envelope with one entry carrying `messaging`.
pub fn envelope(messaging: Vec<serde_json::Value>) -> serde_json::Value {
    serde_json::json!({
        "object": "page",
        "entry": [{"id": "page-1", "time": 1_700_000_000_000_i64, "messaging": messaging}]
    })
}

pub fn read_event(sender_id: &str, watermark_ms: i64) -> serde_json::Value {
    serde_json::json!({
        "sender": {"id": sender_id},
        "recipient": {"id": "page-1"},
        "timestamp": watermark_ms,
        "read": {"watermark": watermark_ms}
    })
}

pub fn feedback_event(sender_id: &str, question_id: &str, score: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "sender": {"id": sender_id},
        "recipient": {"id": "page-1"},
        "timestamp": 1_700_000_000_000_i64,
        "messaging_feedback": {"feedback_screens": [{
            "screen_id": 0,
            "questions": {
                question_id: {
                    "type": "csat",
                    "payload": score,
                    "follow_up": {"type": "free_form", "payload": text}
                }
            }
        }]}
    })
}

pub fn text_event(sender_id: &str, text: &str) -> serde_json::Value {
    serde_json::json!({
        "sender": {"id": sender_id},
        "recipient": {"id": "page-1"},
        "timestamp": 1_700_000_000_000_i64,
        "message": {"mid": "m-1", "seq": 1, "text": text}
    })
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

/// Parse the response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

/// Collect the response body as text.
pub async fn body_to_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("Response body is not UTF-8")
}
