//! One-at-a-time execution of user commands.
//!
//! [`ActionSequencer`] is a two-state machine. While idle it accepts a
//! [`Command`], becomes busy, clears the error notice, and issues exactly one
//! API call. The server's `status` code selects the success or error notice.
//! Whatever the result, it then reconciles (`refresh_self`, then
//! `refresh_aggregate`) before becoming idle again. API failures never
//! escape: they become the error notice and an [`ActionOutcome::Failed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ApiGateway;
use crate::error::{ApiError, IshyError, Result};
use crate::identity::Identity;
use crate::protocol::CommandResponse;
use crate::reconciler::StatusReconciler;
use crate::session::Session;

/// A user-initiated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enter the matchmaking queue, optionally announcing a nickname.
    JoinQueue { nickname: Option<String> },
    /// Leave the queue or the current chat.
    Leave,
    /// Reveal identity to the current partner.
    Reveal,
    /// Block the current partner.
    Block,
    /// Lift a block on another user.
    Unblock { target_id: String },
    /// Set the display nickname. Must already be validated.
    SetNickname { nickname: String },
}

impl Command {
    /// Endpoint name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinQueue { .. } => "queue",
            Self::Leave => "leave",
            Self::Reveal => "reveal",
            Self::Block => "block",
            Self::Unblock { .. } => "unblock",
            Self::SetNickname { .. } => "nick",
        }
    }

    /// Error notice used when a failure carries no message.
    fn failure_text(&self) -> &'static str {
        match self {
            Self::JoinQueue { .. } => "Failed to find friend",
            Self::Leave => "Failed to leave",
            Self::Reveal => "Failed to reveal identity",
            Self::Block => "Failed to block user",
            Self::Unblock { .. } => "Failed to unblock user",
            Self::SetNickname { .. } => "Failed to set nickname",
        }
    }
}

/// A notice selected by a command's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Select the notice for a server response.
///
/// Unrecognized status codes are treated as success without a message.
pub fn notice_for(command: &Command, response: &CommandResponse) -> Option<Notice> {
    match (command, response.status()) {
        (Command::JoinQueue { .. }, "matched") => Some(Notice::Success(
            match response.partner_id.as_deref() {
                Some(partner) => format!("Matched with partner! ID: {partner}"),
                None => "Matched with partner!".to_string(),
            },
        )),
        (Command::JoinQueue { .. }, "queued") => Some(Notice::Success(
            "Added to queue! Searching for a friend...".to_string(),
        )),
        (Command::JoinQueue { .. }, "already_chatting") => {
            Some(Notice::Error("You're already in a chat".to_string()))
        }
        (Command::JoinQueue { .. }, "already_queued") => {
            Some(Notice::Error("You're already in the queue".to_string()))
        }
        (Command::Leave, "ended_chat") => Some(Notice::Success("Left the chat".to_string())),
        (Command::Leave, "left_queue") => Some(Notice::Success("Left the queue".to_string())),
        (Command::SetNickname { nickname }, "ok") => {
            let confirmed = response.nickname.as_deref().unwrap_or(nickname);
            Some(Notice::Success(format!("Nickname set to \"{confirmed}\"")))
        }
        _ => None,
    }
}

/// How a command settled.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The server answered; `notice` is what was shown, if anything.
    Completed {
        response: CommandResponse,
        notice: Option<Notice>,
    },
    /// The call failed; its message is now the error notice.
    Failed(ApiError),
}

impl ActionOutcome {
    /// The server's status code, if the call completed.
    pub fn status(&self) -> Option<&str> {
        match self {
            Self::Completed { response, .. } => response.status.as_deref(),
            Self::Failed(_) => None,
        }
    }
}

/// Runs commands one at a time against the session.
#[derive(Debug, Clone)]
pub struct ActionSequencer {
    api: ApiGateway,
    session: Arc<Session>,
    reconciler: StatusReconciler,
    busy: Arc<AtomicBool>,
}

impl ActionSequencer {
    pub fn new(api: ApiGateway, session: Arc<Session>, reconciler: StatusReconciler) -> Self {
        Self {
            api,
            session,
            reconciler,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a command is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run `command` for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`IshyError::Busy`] without issuing a request if another
    /// command is in flight. API failures are not errors: they are reported
    /// as [`ActionOutcome::Failed`] and as the error notice.
    pub async fn run(&self, identity: &Identity, command: Command) -> Result<ActionOutcome> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(command = command.name(), "rejected: action already in flight");
            return Err(IshyError::Busy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));
        self.session.emit_busy(true);

        let outcome = self.execute(identity, command).await;
        self.reconciler.reconcile(identity).await;

        drop(guard);
        self.session.emit_busy(false);
        Ok(outcome)
    }

    async fn execute(&self, identity: &Identity, command: Command) -> ActionOutcome {
        self.session.clear_error().await;
        debug!(command = command.name(), user_id = %identity, "dispatching command");

        let user_id = identity.as_str();
        let result = match &command {
            Command::JoinQueue { nickname } => {
                self.api.join_queue(user_id, nickname.as_deref()).await
            }
            Command::Leave => self.api.leave(user_id).await,
            Command::Reveal => self.api.reveal(user_id).await,
            Command::Block => self.api.block(user_id).await,
            Command::Unblock { target_id } => self.api.unblock(user_id, target_id).await,
            Command::SetNickname { nickname } => self.api.set_nickname(user_id, nickname).await,
        };

        match result {
            Ok(response) => {
                let notice = notice_for(&command, &response);
                match &notice {
                    Some(Notice::Success(text)) => self.session.set_success(text.clone()).await,
                    Some(Notice::Error(text)) => self.session.set_error(text.clone()).await,
                    None => {}
                }
                // Any answer settles the modal, whatever its status.
                if matches!(command, Command::SetNickname { .. }) {
                    self.session.close_nickname_modal().await;
                }
                ActionOutcome::Completed { response, notice }
            }
            Err(err) => {
                warn!(command = command.name(), "command failed: {err}");
                let text = if err.message.is_empty() {
                    command.failure_text().to_string()
                } else {
                    err.message.clone()
                };
                self.session.set_error(text).await;
                ActionOutcome::Failed(err)
            }
        }
    }
}

/// Clears the busy flag when the command settles, including on cancellation.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
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

    fn response(status: &str) -> CommandResponse {
        CommandResponse {
            status: Some(status.to_string()),
            ..CommandResponse::default()
        }
    }

    fn join() -> Command {
        Command::JoinQueue { nickname: None }
    }

    #[test]
    fn join_queue_notices() {
        let mut matched = response("matched");
        matched.partner_id = Some("555".into());
        assert_eq!(
            notice_for(&join(), &matched),
            Some(Notice::Success("Matched with partner! ID: 555".into()))
        );
        assert_eq!(
            notice_for(&join(), &response("queued")),
            Some(Notice::Success(
                "Added to queue! Searching for a friend...".into()
            ))
        );
        assert_eq!(
            notice_for(&join(), &response("already_chatting")),
            Some(Notice::Error("You're already in a chat".into()))
        );
        assert_eq!(
            notice_for(&join(), &response("already_queued")),
            Some(Notice::Error("You're already in the queue".into()))
        );
        assert_eq!(notice_for(&join(), &response("something_new")), None);
        assert_eq!(notice_for(&join(), &CommandResponse::default()), None);
    }

    #[test]
    fn leave_notices() {
        assert_eq!(
            notice_for(&Command::Leave, &response("ended_chat")),
            Some(Notice::Success("Left the chat".into()))
        );
        assert_eq!(
            notice_for(&Command::Leave, &response("left_queue")),
            Some(Notice::Success("Left the queue".into()))
        );
        assert_eq!(notice_for(&Command::Leave, &response("not_in_queue")), None);
    }

    #[test]
    fn status_codes_are_command_specific() {
        assert_eq!(notice_for(&Command::Leave, &response("matched")), None);
        assert_eq!(notice_for(&join(), &response("ok")), None);
        assert_eq!(notice_for(&Command::Reveal, &response("ok")), None);
    }

    #[test]
    fn nickname_notice_prefers_server_confirmation() {
        let cmd = Command::SetNickname {
            nickname: "Sam".into(),
        };
        let mut resp = response("ok");
        assert_eq!(
            notice_for(&cmd, &resp),
            Some(Notice::Success("Nickname set to \"Sam\"".into()))
        );
        resp.nickname = Some("Sammy".into());
        assert_eq!(
            notice_for(&cmd, &resp),
            Some(Notice::Success("Nickname set to \"Sammy\"".into()))
        );
    }
}
