//! Wire types for the Ishy HTTP API.
//!
//! Request bodies serialize exactly as the server expects them. Responses are
//! read permissively: missing counters read as `0`, missing or `null` flags
//! read as `false`, and unknown fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};

// ── Request bodies ──────────────────────────────────────────────────

/// Body of `POST /queue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRequest {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

/// Body of `POST /leave`, `POST /reveal`, and `POST /block`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    pub user_id: String,
}

/// Body of `POST /unblock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnblockRequest {
    pub user_id: String,
    pub target_id: String,
}

/// Body of `POST /nick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NicknameRequest {
    pub user_id: String,
    pub nickname: String,
}

// ── Responses ───────────────────────────────────────────────────────

/// Response to any mutating command.
///
/// `status` carries the server's outcome code (`"matched"`, `"queued"`,
/// `"left_queue"`, `"ok"`, ...). The remaining recognized fields are only
/// present for some outcomes; everything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CommandResponse {
    /// The outcome code, or `""` if the server sent none.
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// The signed-in user's status as reported by `GET /me`.
///
/// Never locally authoritative: every refresh replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatus {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub in_queue: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub in_chat: bool,
    #[serde(default, deserialize_with = "lenient_id")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

impl UserStatus {
    /// Derive the presence state. Chat takes precedence over queue.
    pub fn presence(&self) -> PresenceState {
        if self.in_chat {
            PresenceState::Chatting
        } else if self.in_queue {
            PresenceState::Queued
        } else {
            PresenceState::Idle
        }
    }
}

/// Service-wide counters reported by `GET /status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Users currently waiting for a match. Sent as `queue` by the server.
    #[serde(
        rename = "queue",
        alias = "queue_count",
        default,
        deserialize_with = "lenient_count"
    )]
    pub queue_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub active_chats: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub blocks: u64,
}

/// Where the user currently stands with the matchmaker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceState {
    #[default]
    Idle,
    Queued,
    Chatting,
}

impl PresenceState {
    /// Short label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "Ready to find friends",
            Self::Queued => "Searching for a match...",
            Self::Chatting => "In active chat",
        }
    }
}

/// Error body returned with non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The detail as display text. Structured details are rendered as JSON.
    pub(crate) fn into_message(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }
}

// ── Lenient field readers ───────────────────────────────────────────

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept an identifier sent either as a JSON string or a JSON number.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn queue_request_omits_absent_nickname() {
        let body = serde_json::to_value(QueueRequest {
            user_id: "42".into(),
            nickname: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "user_id": "42" }));
    }

    #[test]
    fn stats_read_queue_field_and_default_missing_counts() {
        let stats: AggregateStats =
            serde_json::from_value(json!({ "queue": 4, "blocks": null })).unwrap();
        assert_eq!(
            stats,
            AggregateStats {
                queue_count: 4,
                active_chats: 0,
                blocks: 0,
            }
        );
    }

    #[test]
    fn stats_accept_queue_count_alias() {
        let stats: AggregateStats =
            serde_json::from_value(json!({ "queue_count": 2, "active_chats": 1 })).unwrap();
        assert_eq!(stats.queue_count, 2);
        assert_eq!(stats.active_chats, 1);
    }

    #[test]
    fn user_status_tolerates_nulls_and_numeric_partner() {
        let status: UserStatus = serde_json::from_value(json!({
            "in_queue": null,
            "in_chat": true,
            "partner_id": 9001,
        }))
        .unwrap();
        assert!(!status.in_queue);
        assert!(status.in_chat);
        assert_eq!(status.partner_id.as_deref(), Some("9001"));
        assert!(status.nickname.is_none());
    }

    #[test]
    fn presence_derivation_order() {
        let mut status = UserStatus::default();
        assert_eq!(status.presence(), PresenceState::Idle);
        status.in_queue = true;
        assert_eq!(status.presence(), PresenceState::Queued);
        status.in_chat = true;
        assert_eq!(status.presence(), PresenceState::Chatting);
        status.in_queue = false;
        assert_eq!(status.presence(), PresenceState::Chatting);
    }

    #[test]
    fn command_response_keeps_unknown_fields() {
        let resp: CommandResponse = serde_json::from_value(json!({
            "status": "matched",
            "partner_id": "77",
            "room": "abc",
        }))
        .unwrap();
        assert_eq!(resp.status(), "matched");
        assert_eq!(resp.partner_id.as_deref(), Some("77"));
        assert_eq!(resp.extra.get("room"), Some(&json!("abc")));
    }

    #[test]
    fn error_body_detail_forms() {
        let body: ErrorBody = serde_json::from_value(json!({ "detail": "nope" })).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("nope"));

        let body: ErrorBody = serde_json::from_value(json!({ "detail": null })).unwrap();
        assert!(body.into_message().is_none());

        let body: ErrorBody = serde_json::from_value(json!({})).unwrap();
        assert!(body.into_message().is_none());
    }
}
