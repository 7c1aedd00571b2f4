//! The shared session context.
//!
//! [`Session`] holds everything the presentation layer renders: the current
//! identity, the last reconciled [`UserStatus`] and [`AggregateStats`], the
//! single-slot success/error [`Notices`], and the nickname modal. Each
//! component updates it through a narrow set of methods, and every update is
//! announced as a [`SessionEvent`].
//!
//! # Generations
//!
//! Each identity change (and disposal) advances the session generation.
//! Refreshes record the generation before their request and apply their
//! result only if it is still current, so responses that settle after a
//! teardown are dropped instead of resurrecting stale state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::event::SessionEvent;
use crate::identity::Identity;
use crate::nickname::NicknameModal;
use crate::protocol::{AggregateStats, PresenceState, UserStatus};

/// The outcome messages of the most recent action.
///
/// Each slot holds at most one message and is only replaced by a later
/// action or cleared explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notices {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// A point-in-time copy of the session, for rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    /// `None` until the first successful `refreshSelf`.
    pub status: Option<UserStatus>,
    /// Derived from `status`; `Idle` when no status is known.
    pub presence: PresenceState,
    /// `None` until the first successful `refreshAggregate`.
    pub stats: Option<AggregateStats>,
    pub notices: Notices,
    pub nickname_modal: NicknameModal,
    /// An action is in flight; triggers should be disabled.
    pub busy: bool,
    /// The aggregate poll is armed.
    pub polling: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    identity: Option<Identity>,
    status: Option<UserStatus>,
    stats: Option<AggregateStats>,
    notices: Notices,
    nickname_modal: NicknameModal,
}

/// Session context shared by the reconciler, the sequencer, and the controller.
#[derive(Debug)]
pub struct Session {
    state: Mutex<SessionState>,
    generation: AtomicU64,
    disposed: AtomicBool,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl Session {
    #[cfg(test)]
    pub(crate) fn new(event_tx: mpsc::Sender<SessionEvent>) -> Self {
        Self::with_identity(event_tx, None)
    }

    /// A session that starts with an identity restored from storage.
    pub(crate) fn with_identity(
        event_tx: mpsc::Sender<SessionEvent>,
        identity: Option<Identity>,
    ) -> Self {
        let session = Self {
            state: Mutex::new(SessionState {
                identity: identity.clone(),
                ..SessionState::default()
            }),
            generation: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
            event_tx,
        };
        if identity.is_some() {
            session.emit(SessionEvent::IdentityChanged { identity });
        }
        session
    }

    /// The current generation. Changes whenever the identity changes.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ── Reads ───────────────────────────────────────────────────────

    pub async fn identity(&self) -> Option<Identity> {
        self.state.lock().await.identity.clone()
    }

    pub async fn status(&self) -> Option<UserStatus> {
        self.state.lock().await.status.clone()
    }

    pub async fn stats(&self) -> Option<AggregateStats> {
        self.state.lock().await.stats
    }

    pub async fn notices(&self) -> Notices {
        self.state.lock().await.notices.clone()
    }

    pub async fn nickname_modal(&self) -> NicknameModal {
        self.state.lock().await.nickname_modal.clone()
    }

    /// Copy the session for rendering. `busy` and `polling` are owned
    /// elsewhere and supplied by the caller.
    pub(crate) async fn snapshot(&self, busy: bool, polling: bool) -> SessionSnapshot {
        let state = self.state.lock().await;
        let presence = state
            .status
            .as_ref()
            .map(UserStatus::presence)
            .unwrap_or_default();
        SessionSnapshot {
            identity: state.identity.clone(),
            status: state.status.clone(),
            presence,
            stats: state.stats,
            notices: state.notices.clone(),
            nickname_modal: state.nickname_modal.clone(),
            busy,
            polling,
        }
    }

    // ── Identity ────────────────────────────────────────────────────

    /// Install a new identity (or none) and advance the generation.
    ///
    /// Switching to a different user drops the previous user's status;
    /// clearing the identity also drops the counters. Returns the new generation.
    pub(crate) async fn set_identity(&self, identity: Option<Identity>) -> u64 {
        let mut state = self.state.lock().await;
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if state.identity != identity {
            state.status = None;
        }
        if identity.is_none() {
            state.stats = None;
        }
        state.identity = identity.clone();
        debug!(generation, has_identity = identity.is_some(), "session identity set");
        self.emit(SessionEvent::IdentityChanged { identity });
        generation
    }

    /// Mark the session disposed. Later refresh results are discarded.
    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    // ── Reconciled state ────────────────────────────────────────────

    /// Replace the user status wholesale, if `generation` is still current.
    pub(crate) async fn replace_status(&self, generation: u64, status: UserStatus) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            debug!(generation, "discarding stale user status");
            return false;
        }
        let presence = status.presence();
        state.status = Some(status.clone());
        self.emit(SessionEvent::StatusUpdated { status, presence });
        true
    }

    /// Replace the counters wholesale, if `generation` is still current.
    pub(crate) async fn replace_stats(&self, generation: u64, stats: AggregateStats) -> bool {
        let mut state = self.state.lock().await;
        if !self.is_current(generation) {
            debug!(generation, "discarding stale aggregate stats");
            return false;
        }
        state.stats = Some(stats);
        self.emit(SessionEvent::StatsUpdated { stats });
        true
    }

    // ── Notices ─────────────────────────────────────────────────────

    pub(crate) async fn clear_error(&self) {
        let mut state = self.state.lock().await;
        if state.notices.error.take().is_some() {
            self.emit(SessionEvent::NoticesChanged {
                notices: state.notices.clone(),
            });
        }
    }

    pub(crate) async fn set_error(&self, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.notices.error = Some(message.into());
        self.emit(SessionEvent::NoticesChanged {
            notices: state.notices.clone(),
        });
    }

    pub(crate) async fn set_success(&self, message: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.notices.success = Some(message.into());
        self.emit(SessionEvent::NoticesChanged {
            notices: state.notices.clone(),
        });
    }

    /// Dismiss both notices.
    pub async fn clear_notices(&self) {
        let mut state = self.state.lock().await;
        if state.notices != Notices::default() {
            state.notices = Notices::default();
            self.emit(SessionEvent::NoticesChanged {
                notices: Notices::default(),
            });
        }
    }

    // ── Nickname modal ──────────────────────────────────────────────

    pub(crate) async fn open_nickname_modal(&self) {
        let mut state = self.state.lock().await;
        if !state.nickname_modal.is_open() {
            state.nickname_modal.open();
            self.emit(SessionEvent::NicknameModalChanged { open: true });
        }
    }

    pub(crate) async fn close_nickname_modal(&self) {
        let mut state = self.state.lock().await;
        if state.nickname_modal.close() {
            self.emit(SessionEvent::NicknameModalChanged { open: false });
        }
    }

    pub(crate) async fn set_nickname_draft(&self, text: String) {
        self.state.lock().await.nickname_modal.set_draft(text);
    }

    pub(crate) async fn nickname_submission(&self) -> crate::error::Result<String> {
        self.state.lock().await.nickname_modal.submission()
    }

    // ── Events ──────────────────────────────────────────────────────

    pub(crate) fn emit_busy(&self, busy: bool) {
        self.emit(SessionEvent::BusyChanged { busy });
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.is_disposed() && self.generation() == generation
    }

    /// Send an event without blocking. If the channel is full the event is
    /// dropped with a warning.
    fn emit(&self, event: SessionEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(
                    "event channel full, dropping event: {:?}",
                    std::mem::discriminant(&dropped)
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("event channel closed, receiver dropped");
            }
        }
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

    fn session() -> (Session, mpsc::Receiver<SessionEvent>) {
        let (tx, rx) = mpsc::channel(64);
        (Session::new(tx), rx)
    }

    fn id(raw: &str) -> Identity {
        Identity::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn stale_generation_is_discarded() {
        let (session, _rx) = session();
        let before = session.set_identity(Some(id("1"))).await;
        session.set_identity(Some(id("2"))).await;

        let applied = session
            .replace_status(before, UserStatus::default())
            .await;
        assert!(!applied);
        assert!(session.status().await.is_none());
    }

    #[tokio::test]
    async fn dispose_discards_in_flight_results() {
        let (session, _rx) = session();
        let generation = session.set_identity(Some(id("1"))).await;
        session.dispose();

        assert!(!session.replace_stats(generation, AggregateStats::default()).await);
        assert!(session.stats().await.is_none());
    }

    #[tokio::test]
    async fn snapshot_derives_presence_from_status() {
        let (session, _rx) = session();
        let generation = session.set_identity(Some(id("1"))).await;
        let status = UserStatus {
            in_queue: true,
            in_chat: true,
            ..UserStatus::default()
        };
        assert!(session.replace_status(generation, status).await);

        let snap = session.snapshot(false, true).await;
        assert_eq!(snap.presence, PresenceState::Chatting);
        assert!(snap.polling);
    }

    #[tokio::test]
    async fn switching_user_drops_previous_status() {
        let (session, _rx) = session();
        let generation = session.set_identity(Some(id("1"))).await;
        session
            .replace_status(generation, UserStatus::default())
            .await;

        session.set_identity(Some(id("1"))).await;
        assert!(session.status().await.is_some(), "same user keeps status");

        session.set_identity(Some(id("2"))).await;
        assert!(session.status().await.is_none());
    }

    #[tokio::test]
    async fn notices_are_single_slot() {
        let (session, mut rx) = session();
        session.set_success("first").await;
        session.set_success("second").await;
        session.set_error("boom").await;
        assert_eq!(
            session.notices().await,
            Notices {
                error: Some("boom".into()),
                success: Some("second".into()),
            }
        );

        session.clear_error().await;
        assert_eq!(session.notices().await.error, None);
        assert_eq!(session.notices().await.success.as_deref(), Some("second"));

        let mut changes = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, SessionEvent::NoticesChanged { .. }) {
                changes += 1;
            }
        }
        assert_eq!(changes, 4);
    }

    #[tokio::test]
    async fn full_event_channel_does_not_block_updates() {
        let (tx, _rx) = mpsc::channel(1);
        let session = Session::new(tx);
        for i in 0..10 {
            session.set_success(format!("n{i}")).await;
        }
        assert_eq!(session.notices().await.success.as_deref(), Some("n9"));
    }
}
