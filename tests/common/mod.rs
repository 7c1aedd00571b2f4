#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Ishy client integration tests.
//!
//! Provides a scripted [`MockTransport`] that answers by route and records
//! every request, plus helpers for building controllers and responses.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use ishy_client::transport::{HttpRequest, HttpResponse, Method};
use ishy_client::{
    ApiError, IdentityStorage, IshyConfig, IshyController, SessionEvent, Transport,
};
use serde_json::Value;
use tokio::sync::mpsc;

pub type Reply = Result<HttpResponse, ApiError>;

#[derive(Default)]
struct Script {
    /// One-shot replies, consumed in order per route.
    queued: HashMap<String, VecDeque<Reply>>,
    /// Replies used once the queue for a route is empty.
    fallback: HashMap<String, Reply>,
    requests: Vec<HttpRequest>,
}

// ── MockTransport ───────────────────────────────────────────────────

/// A scripted transport for integration testing.
///
/// Routes are keyed as `"METHOD /path"`. Unscripted routes answer
/// `404 {"detail":"Not Found"}`.
#[derive(Clone)]
pub struct MockTransport {
    script: Arc<StdMutex<Script>>,
    latency: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            script: Arc::new(StdMutex::new(Script::default())),
            latency: Duration::ZERO,
        }
    }

    /// Delay every reply, so that overlapping calls can be observed.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a one-shot reply for `route`.
    pub fn push(&self, route: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Set the reply used whenever `route` has nothing queued.
    pub fn always(&self, route: &str, reply: Reply) -> &Self {
        self.script
            .lock()
            .unwrap()
            .fallback
            .insert(route.to_string(), reply);
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().requests.clone()
    }

    /// Routes of every request received so far, in order.
    pub fn routes(&self) -> Vec<String> {
        self.requests().iter().map(route_of).collect()
    }

    /// Number of requests to `route`.
    pub fn count(&self, route: &str) -> usize {
        self.routes().iter().filter(|r| r.as_str() == route).count()
    }

    /// Forget recorded requests (scripts are kept).
    pub fn clear_requests(&self) {
        self.script.lock().unwrap().requests.clear();
    }

    /// Parsed JSON body of the last request to `route`.
    pub fn last_body(&self, route: &str) -> Value {
        let request = self
            .requests()
            .into_iter()
            .rev()
            .find(|r| route_of(r) == route)
            .unwrap_or_else(|| panic!("no request to {route}"));
        serde_json::from_str(request.body.as_deref().expect("request body")).unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let route = route_of(&request);
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request);
            match script.queued.get_mut(&route).and_then(VecDeque::pop_front) {
                Some(reply) => reply,
                None => script
                    .fallback
                    .get(&route)
                    .cloned()
                    .unwrap_or_else(|| Ok(HttpResponse::new(404, r#"{"detail":"Not Found"}"#))),
            }
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        reply
    }
}

pub fn route_of(request: &HttpRequest) -> String {
    format!("{} {}", request.method.as_str(), request.path)
}

// ── Reply helpers ───────────────────────────────────────────────────

/// `200` with a JSON body.
pub fn ok(body: Value) -> Reply {
    Ok(HttpResponse::new(200, body.to_string()))
}

/// A non-success status with a JSON body.
pub fn status(code: u16, body: Value) -> Reply {
    Ok(HttpResponse::new(code, body.to_string()))
}

/// A transport-level failure.
pub fn offline() -> Reply {
    Err(ApiError::transport("connection refused"))
}

pub const QUEUE: &str = "POST /queue";
pub const LEAVE: &str = "POST /leave";
pub const REVEAL: &str = "POST /reveal";
pub const BLOCK: &str = "POST /block";
pub const UNBLOCK: &str = "POST /unblock";
pub const NICK: &str = "POST /nick";
pub const ME: &str = "GET /me";
pub const STATUS: &str = "GET /status";

/// A transport that answers `/me` and `/status` with idle defaults.
pub fn idle_backend() -> MockTransport {
    let transport = MockTransport::new();
    transport
        .always(
            ME,
            ok(serde_json::json!({
                "in_queue": false,
                "in_chat": false,
                "partner_id": null,
                "nickname": null,
            })),
        )
        .always(
            STATUS,
            ok(serde_json::json!({ "queue": 0, "active_chats": 0, "blocks": 0 })),
        );
    transport
}

// ── Controller helpers ──────────────────────────────────────────────

pub fn test_config() -> IshyConfig {
    IshyConfig::new("http://ishy.test", "test-key")
}

/// Start a controller over `transport` and `storage`.
pub fn start_controller(
    transport: &MockTransport,
    storage: impl IdentityStorage,
) -> (IshyController, mpsc::Receiver<SessionEvent>) {
    IshyController::start(transport.clone(), storage, test_config())
}

/// Drain all currently queued events.
pub fn drain(events: &mut mpsc::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Assert that `request` is a `GET /me` for `user_id`.
pub fn assert_me_request(request: &HttpRequest, user_id: &str) {
    assert_eq!(request.method, Method::Get);
    assert_eq!(request.path, "/me");
    assert_eq!(
        request.query,
        vec![("user_id".to_string(), user_id.to_string())]
    );
}
