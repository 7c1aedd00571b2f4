//! # Custom Transport Example
//!
//! Shows how to implement the [`Transport`] trait with an in-process fake
//! matchmaker instead of a real HTTP server. This is useful for:
//!
//! - **Testing**: exercise UI logic without a running backend
//! - **Custom stacks**: adapt any HTTP client (hyper, surf, a proxy) by
//!   translating [`HttpRequest`] / [`HttpResponse`]
//!
//! Two controllers share one fake backend. The first user queues, the second
//! is matched with them, and both see `Chatting` after reconciling.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example custom_transport --no-default-features
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use ishy_client::transport::{HttpRequest, HttpResponse, Method};
use ishy_client::{ApiError, IshyConfig, IshyController, MemoryStorage, Transport};
use serde_json::{json, Value};

// ─────────────────────────────────────────────────────────────────────
// Step 1: A tiny matchmaker that speaks the Ishy wire format
// ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Matchmaker {
    queue: Vec<String>,
    /// user -> partner, stored in both directions.
    chats: HashMap<String, String>,
    nicknames: HashMap<String, String>,
    blocks: u64,
}

impl Matchmaker {
    fn handle(&mut self, method: Method, path: &str, user_id: &str, body: &Value) -> (u16, Value) {
        match (method, path) {
            (Method::Post, "/queue") => {
                if self.chats.contains_key(user_id) {
                    return (200, json!({ "status": "already_chatting" }));
                }
                if self.queue.iter().any(|u| u == user_id) {
                    return (200, json!({ "status": "already_queued" }));
                }
                if let Some(nickname) = body.get("nickname").and_then(Value::as_str) {
                    self.nicknames
                        .insert(user_id.to_string(), nickname.to_string());
                }
                if self.queue.is_empty() {
                    self.queue.push(user_id.to_string());
                    (200, json!({ "status": "queued" }))
                } else {
                    let partner = self.queue.remove(0);
                    self.chats.insert(user_id.to_string(), partner.clone());
                    self.chats.insert(partner.clone(), user_id.to_string());
                    (200, json!({ "status": "matched", "partner_id": partner }))
                }
            }
            (Method::Post, "/leave") => {
                if let Some(partner) = self.chats.remove(user_id) {
                    self.chats.remove(&partner);
                    (200, json!({ "status": "ended_chat" }))
                } else if let Some(pos) = self.queue.iter().position(|u| u == user_id) {
                    self.queue.remove(pos);
                    (200, json!({ "status": "left_queue" }))
                } else {
                    (200, json!({ "status": "not_in_queue" }))
                }
            }
            (Method::Post, "/block") => match self.chats.remove(user_id) {
                Some(partner) => {
                    self.chats.remove(&partner);
                    self.blocks += 1;
                    (200, json!({ "status": "blocked" }))
                }
                None => (400, json!({ "detail": "Not in a chat" })),
            },
            (Method::Post, "/nick") => {
                let nickname = body
                    .get("nickname")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                self.nicknames
                    .insert(user_id.to_string(), nickname.to_string());
                (200, json!({ "status": "ok", "nickname": nickname }))
            }
            (Method::Get, "/me") => (
                200,
                json!({
                    "in_queue": self.queue.iter().any(|u| u == user_id),
                    "in_chat": self.chats.contains_key(user_id),
                    "partner_id": self.chats.get(user_id),
                    "nickname": self.nicknames.get(user_id),
                }),
            ),
            (Method::Get, "/status") => (
                200,
                json!({
                    "queue": self.queue.len(),
                    "active_chats": self.chats.len() / 2,
                    "blocks": self.blocks,
                }),
            ),
            _ => (404, json!({ "detail": "Not Found" })),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Implement the Transport trait
// ─────────────────────────────────────────────────────────────────────

/// A cloneable handle to the shared fake backend.
#[derive(Clone, Default)]
struct InProcessTransport {
    backend: Arc<Mutex<Matchmaker>>,
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let body: Value = match request.body.as_deref() {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| ApiError::transport(format!("bad request body: {e}")))?,
            None => Value::Null,
        };
        let user_id = body
            .get("user_id")
            .and_then(Value::as_str)
            .or_else(|| {
                request
                    .query
                    .iter()
                    .find(|(k, _)| k == "user_id")
                    .map(|(_, v)| v.as_str())
            })
            .unwrap_or_default()
            .to_string();

        let (status, reply) = self
            .backend
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(request.method, &request.path, &user_id, &body);
        tracing::debug!(path = %request.path, status, "fake backend replied");
        Ok(HttpResponse::new(status, reply.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: Drive two controllers against the same backend
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let transport = InProcessTransport::default();
    let config = IshyConfig::new("inproc://ishy", "demo-key");

    let (alice, _alice_events) =
        IshyController::start(transport.clone(), MemoryStorage::new(), config.clone());
    let (bob, _bob_events) = IshyController::start(transport, MemoryStorage::new(), config);

    alice.capture_identity("1001").await?;
    alice.set_nickname("Alice").await?;
    bob.capture_identity("2002").await?;
    bob.close_nickname_modal().await;

    alice.join_queue().await?;
    tracing::info!("alice: {:?}", alice.snapshot().await.notices.success);

    bob.join_queue().await?;
    tracing::info!("bob: {:?}", bob.snapshot().await.notices.success);

    alice.refresh().await;
    for (name, controller) in [("alice", &alice), ("bob", &bob)] {
        let snapshot = controller.snapshot().await;
        tracing::info!(
            "{name}: {} (partner {:?}), stats {:?}",
            snapshot.presence.label(),
            snapshot.status.and_then(|s| s.partner_id),
            snapshot.stats
        );
    }

    bob.leave().await?;
    alice.refresh().await;
    tracing::info!(
        "after bob leaves, alice is: {}",
        alice.snapshot().await.presence.label()
    );

    alice.dispose().await;
    bob.dispose().await;
    tracing::info!("Done. Custom transport works!");
    Ok(())
}
