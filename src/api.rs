//! Typed access to the Ishy API endpoints.
//!
//! [`ApiGateway`] turns one capability of the service into exactly one
//! [`HttpRequest`], attaches the bearer credential and JSON content type,
//! and normalizes every failure into an [`ApiError`]. It never retries.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::protocol::{
    AggregateStats, CommandResponse, ErrorBody, NicknameRequest, QueueRequest, UnblockRequest,
    UserRequest, UserStatus,
};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};

/// Endpoint-level client for the Ishy API.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Clone)]
pub struct ApiGateway {
    transport: Arc<dyn Transport>,
    api_key: String,
}

impl ApiGateway {
    /// Create a gateway that authenticates with `api_key`.
    pub fn new(transport: impl Transport, api_key: impl Into<String>) -> Self {
        Self::from_shared(Arc::new(transport), api_key)
    }

    /// Create a gateway over an already-shared transport.
    pub fn from_shared(transport: Arc<dyn Transport>, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.into(),
        }
    }

    /// `POST /queue`: enter the matchmaking queue.
    pub async fn join_queue(
        &self,
        user_id: &str,
        nickname: Option<&str>,
    ) -> Result<CommandResponse, ApiError> {
        let body = QueueRequest {
            user_id: user_id.to_string(),
            nickname: nickname.map(str::to_string),
        };
        self.post("/queue", &body).await
    }

    /// `POST /leave`: leave the queue or end the current chat.
    pub async fn leave(&self, user_id: &str) -> Result<CommandResponse, ApiError> {
        self.post("/leave", &user_body(user_id)).await
    }

    /// `POST /reveal`: reveal identity to the current partner.
    pub async fn reveal(&self, user_id: &str) -> Result<CommandResponse, ApiError> {
        self.post("/reveal", &user_body(user_id)).await
    }

    /// `POST /block`: block the current partner.
    pub async fn block(&self, user_id: &str) -> Result<CommandResponse, ApiError> {
        self.post("/block", &user_body(user_id)).await
    }

    /// `POST /unblock`: lift a block on `target_id`.
    pub async fn unblock(
        &self,
        user_id: &str,
        target_id: &str,
    ) -> Result<CommandResponse, ApiError> {
        let body = UnblockRequest {
            user_id: user_id.to_string(),
            target_id: target_id.to_string(),
        };
        self.post("/unblock", &body).await
    }

    /// `POST /nick`: set the display nickname.
    pub async fn set_nickname(
        &self,
        user_id: &str,
        nickname: &str,
    ) -> Result<CommandResponse, ApiError> {
        let body = NicknameRequest {
            user_id: user_id.to_string(),
            nickname: nickname.to_string(),
        };
        self.post("/nick", &body).await
    }

    /// `GET /me?user_id=...`: the user's own status.
    pub async fn fetch_self(&self, user_id: &str) -> Result<UserStatus, ApiError> {
        let request = HttpRequest::new(Method::Get, "/me").with_query("user_id", user_id);
        self.execute(request).await
    }

    /// `GET /status`: service-wide counters.
    pub async fn fetch_aggregate(&self) -> Result<AggregateStats, ApiError> {
        self.execute(HttpRequest::new(Method::Get, "/status")).await
    }

    // ── Internal helpers ────────────────────────────────────────────

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let json = serde_json::to_string(body)
            .map_err(|e| ApiError::transport(format!("failed to encode request: {e}")))?;
        self.execute(HttpRequest::new(Method::Post, path).with_body(json))
            .await
    }

    async fn execute<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let path = request.path.clone();
        let request = request
            .with_header("Authorization", format!("Bearer {}", self.api_key))
            .with_header("Content-Type", "application/json");

        let result = match self.transport.send(request).await {
            Ok(response) => decode(response),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            warn!(endpoint = %path, status = ?err.status_code, "API error: {err}");
        }
        result
    }
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway").finish_non_exhaustive()
    }
}

fn user_body(user_id: &str) -> UserRequest {
    UserRequest {
        user_id: user_id.to_string(),
    }
}

/// Map a raw response to the typed body or an [`ApiError`].
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    if !response.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&response.body)
            .ok()
            .and_then(ErrorBody::into_message);
        return Err(ApiError::status(response.status, detail));
    }
    serde_json::from_str(&response.body).map_err(|e| ApiError {
        message: format!("invalid response body: {e}"),
        status_code: Some(response.status),
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Replies with a fixed response and records what it was sent.
    struct FixedTransport {
        reply: Result<HttpResponse, ApiError>,
        seen: Arc<StdMutex<Vec<HttpRequest>>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn gateway(
        reply: Result<HttpResponse, ApiError>,
    ) -> (ApiGateway, Arc<StdMutex<Vec<HttpRequest>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let transport = FixedTransport {
            reply,
            seen: Arc::clone(&seen),
        };
        (ApiGateway::new(transport, "test-key"), seen)
    }

    #[tokio::test]
    async fn attaches_bearer_and_content_type() {
        let (api, seen) = gateway(Ok(HttpResponse::new(200, r#"{"queue":1}"#)));
        api.fetch_aggregate().await.unwrap();

        let seen = seen.lock().unwrap();
        let req = &seen[0];
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/status");
        assert_eq!(req.header("authorization"), Some("Bearer test-key"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[tokio::test]
    async fn fetch_self_passes_user_id_as_query() {
        let (api, seen) = gateway(Ok(HttpResponse::new(200, r#"{"in_queue":true}"#)));
        let status = api.fetch_self("12345").await.unwrap();
        assert!(status.in_queue);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].path, "/me");
        assert_eq!(seen[0].query, vec![("user_id".to_string(), "12345".to_string())]);
    }

    #[tokio::test]
    async fn unblock_sends_both_ids() {
        let (api, seen) = gateway(Ok(HttpResponse::new(200, r#"{"status":"ok"}"#)));
        api.unblock("1", "2").await.unwrap();

        let seen = seen.lock().unwrap();
        let body: serde_json::Value =
            serde_json::from_str(seen[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({ "user_id": "1", "target_id": "2" }));
    }

    #[tokio::test]
    async fn non_success_uses_detail() {
        let (api, _) = gateway(Ok(HttpResponse::new(403, r#"{"detail":"You are blocked"}"#)));
        let err = api.leave("1").await.unwrap_err();
        assert_eq!(err.message, "You are blocked");
        assert_eq!(err.status_code, Some(403));
    }

    #[tokio::test]
    async fn non_success_without_json_body_is_generic() {
        let (api, _) = gateway(Ok(HttpResponse::new(502, "<html>bad gateway</html>")));
        let err = api.leave("1").await.unwrap_err();
        assert_eq!(err.message, "API error: 502");
    }

    #[tokio::test]
    async fn unparseable_success_body_is_an_error() {
        let (api, _) = gateway(Ok(HttpResponse::new(200, "not json")));
        let err = api.fetch_aggregate().await.unwrap_err();
        assert_eq!(err.status_code, Some(200));
        assert!(err.message.starts_with("invalid response body"));
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let (api, _) = gateway(Err(ApiError::transport("connection refused")));
        let err = api.reveal("1").await.unwrap_err();
        assert_eq!(err, ApiError::transport("connection refused"));
    }
}
