//! The session and status synchronization controller.
//!
//! [`IshyController`] ties the pieces together: it opens the
//! [`IdentityStore`], keeps the aggregate [`Poller`] armed exactly while an
//! identity is present, routes user commands through the
//! [`ActionSequencer`], and drives the nickname modal.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = IshyConfig::from_env();
//! let transport = HttpTransport::new(&config.base_url)?;
//! let storage = FileStorage::new("ishy.json");
//! let (controller, mut events) = IshyController::start(transport, storage, config);
//!
//! controller.capture_identity("12345").await?;
//! controller.join_queue().await?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::StatusUpdated { presence, .. } => { /* … */ }
//!         SessionEvent::NoticesChanged { notices } => { /* … */ }
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::api::ApiGateway;
use crate::config::{IshyConfig, MIN_POLL_INTERVAL};
use crate::error::{IshyError, Result};
use crate::event::SessionEvent;
use crate::identity::{Identity, IdentityStorage, IdentityStore};
use crate::nickname::{validate_nickname, NicknameModal};
use crate::reconciler::{Poller, RefreshOutcome, StatusReconciler};
use crate::sequencer::{ActionOutcome, ActionSequencer, Command};
use crate::session::{Session, SessionSnapshot};
use crate::transport::Transport;

/// Client-side controller for one Ishy session.
///
/// All methods take `&self`; wrap the controller in an [`Arc`] to drive it
/// from several tasks. Only one command runs at a time: a command issued
/// while another is in flight fails with [`IshyError::Busy`] before any
/// request is made.
pub struct IshyController {
    session: Arc<Session>,
    identity: Mutex<IdentityStore>,
    reconciler: StatusReconciler,
    sequencer: ActionSequencer,
    poller: Mutex<Poller>,
    polling: AtomicBool,
    poll_interval: Duration,
    shutdown_timeout: Duration,
}

impl IshyController {
    /// Open the identity store and return the controller plus its event receiver.
    ///
    /// If an identity was persisted by an earlier run, the aggregate poll is
    /// armed and one reconciliation pass is started in the background.
    /// Must be called from within a tokio runtime.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        storage: impl IdentityStorage,
        config: IshyConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let capacity = config.event_channel_capacity.max(1);
        let poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let store = IdentityStore::open(storage, config.identity_key);
        let restored = store.current().cloned();

        let session = Arc::new(Session::with_identity(event_tx, restored.clone()));
        let api = ApiGateway::new(transport, config.api_key);
        let reconciler = StatusReconciler::new(api.clone(), Arc::clone(&session));
        let sequencer = ActionSequencer::new(api, Arc::clone(&session), reconciler.clone());

        let mut poller = Poller::new();
        if let Some(id) = &restored {
            debug!(user_id = %id, "restored identity from storage");
            poller.arm(reconciler.clone(), poll_interval);
            let initial = reconciler.clone();
            let id = id.clone();
            tokio::spawn(async move {
                initial.reconcile(&id).await;
            });
        }

        let controller = Self {
            session,
            identity: Mutex::new(store),
            reconciler,
            sequencer,
            poller: Mutex::new(poller),
            polling: AtomicBool::new(restored.is_some()),
            poll_interval,
            shutdown_timeout: config.shutdown_timeout,
        };

        (controller, event_rx)
    }

    // ── Identity ────────────────────────────────────────────────────

    /// Validate and persist a user ID, then open the nickname modal, arm the
    /// poll, and reconcile.
    ///
    /// # Errors
    ///
    /// Returns a validation error for input that is not all digits (also
    /// shown as the error notice; storage is unchanged), a storage error if
    /// the ID could not be persisted, or [`IshyError::Disposed`].
    pub async fn capture_identity(&self, raw_input: &str) -> Result<Identity> {
        self.ensure_live()?;
        let captured = self.identity.lock().await.capture(raw_input);
        let id = match captured {
            Ok(id) => id,
            Err(IshyError::Validation(err)) => {
                self.session.set_error(err.to_string()).await;
                return Err(err.into());
            }
            Err(err) => {
                error!("failed to persist identity: {err}");
                return Err(err);
            }
        };

        self.session.set_identity(Some(id.clone())).await;
        self.session.open_nickname_modal().await;
        self.arm_poll().await;
        self.reconciler.reconcile(&id).await;
        Ok(id)
    }

    /// Forget the persisted user ID and stop polling.
    ///
    /// Requests already in flight are allowed to finish; their results are
    /// discarded.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the entry could not be removed, in which
    /// case the identity is kept.
    pub async fn forget_identity(&self) -> Result<()> {
        self.identity.lock().await.clear()?;
        self.session.set_identity(None).await;
        self.session.close_nickname_modal().await;
        self.disarm_poll().await;
        Ok(())
    }

    /// The current identity.
    pub async fn identity(&self) -> Option<Identity> {
        self.identity.lock().await.current().cloned()
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Enter the matchmaking queue, announcing the last known nickname.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn join_queue(&self) -> Result<ActionOutcome> {
        let nickname = self
            .session
            .status()
            .await
            .and_then(|s| s.nickname)
            .filter(|n| !n.is_empty());
        self.run(Command::JoinQueue { nickname }).await
    }

    /// Leave the queue or end the current chat.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn leave(&self) -> Result<ActionOutcome> {
        self.run(Command::Leave).await
    }

    /// Reveal identity to the current partner.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn reveal(&self) -> Result<ActionOutcome> {
        self.run(Command::Reveal).await
    }

    /// Block the current partner.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn block(&self) -> Result<ActionOutcome> {
        self.run(Command::Block).await
    }

    /// Lift a block on `target_id`.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub async fn unblock(&self, target_id: impl Into<String>) -> Result<ActionOutcome> {
        self.run(Command::Unblock {
            target_id: target_id.into(),
        })
        .await
    }

    /// Validate and set a nickname directly, bypassing the modal draft.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without any request, if the trimmed
    /// nickname is not 2-32 characters. Otherwise see [`run`](Self::run).
    pub async fn set_nickname(&self, raw: &str) -> Result<ActionOutcome> {
        let nickname = validate_nickname(raw)?;
        self.run(Command::SetNickname { nickname }).await
    }

    /// Run a command through the sequencer.
    ///
    /// # Errors
    ///
    /// - [`IshyError::Disposed`] after [`dispose`](Self::dispose)
    /// - [`IshyError::NoIdentity`] before an identity is captured
    /// - [`IshyError::Busy`] while another command is in flight
    ///
    /// API failures are reported as [`ActionOutcome::Failed`], not as errors.
    pub async fn run(&self, command: Command) -> Result<ActionOutcome> {
        self.ensure_live()?;
        let id = self.identity().await.ok_or(IshyError::NoIdentity)?;
        self.sequencer.run(&id, command).await
    }

    // ── Nickname modal ──────────────────────────────────────────────

    pub async fn open_nickname_modal(&self) {
        self.session.open_nickname_modal().await;
    }

    /// Close the modal, discarding the draft.
    pub async fn close_nickname_modal(&self) {
        self.session.close_nickname_modal().await;
    }

    /// Replace the modal's draft text.
    pub async fn set_nickname_draft(&self, text: impl Into<String>) {
        self.session.set_nickname_draft(text.into()).await;
    }

    /// Whether the submit affordance should be enabled.
    pub async fn can_submit_nickname(&self) -> bool {
        !self.sequencer.is_busy() && self.session.nickname_modal().await.can_submit()
    }

    /// Submit the modal's draft as the new nickname.
    ///
    /// The modal closes, discarding the draft, once the server answers. If
    /// the submission is refused or the call fails, the draft is kept.
    ///
    /// # Errors
    ///
    /// - [`IshyError::NicknameModalClosed`] if the modal is not open
    /// - a validation error if the trimmed draft is not 2-32 characters
    /// - otherwise see [`run`](Self::run)
    ///
    /// No request is made in any of these cases.
    pub async fn submit_nickname(&self) -> Result<ActionOutcome> {
        self.ensure_live()?;
        let id = self.identity().await.ok_or(IshyError::NoIdentity)?;
        let nickname = self.session.nickname_submission().await?;
        self.sequencer
            .run(&id, Command::SetNickname { nickname })
            .await
    }

    pub async fn nickname_modal(&self) -> NicknameModal {
        self.session.nickname_modal().await
    }

    // ── Reconciliation ──────────────────────────────────────────────

    /// Reconcile on demand: `refresh_self` then `refresh_aggregate`.
    ///
    /// Does nothing without an identity.
    pub async fn refresh(&self) -> Option<(RefreshOutcome, RefreshOutcome)> {
        if self.session.is_disposed() {
            return None;
        }
        let id = self.identity().await?;
        Some(self.reconciler.reconcile(&id).await)
    }

    // ── State ───────────────────────────────────────────────────────

    /// Copy the current session state for rendering.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session
            .snapshot(self.sequencer.is_busy(), self.is_polling())
            .await
    }

    /// Dismiss both notices.
    pub async fn clear_notices(&self) {
        self.session.clear_notices().await;
    }

    pub fn is_busy(&self) -> bool {
        self.sequencer.is_busy()
    }

    /// Whether the aggregate poll is armed.
    pub fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Stop polling and refuse further commands.
    ///
    /// Waits up to the configured shutdown timeout for the poll task, then
    /// aborts it. In-flight results are discarded.
    pub async fn dispose(&self) {
        debug!("IshyController: dispose requested");
        self.session.dispose();
        self.polling.store(false, Ordering::Release);
        self.poller
            .lock()
            .await
            .shutdown(self.shutdown_timeout)
            .await;
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn ensure_live(&self) -> Result<()> {
        if self.session.is_disposed() {
            return Err(IshyError::Disposed);
        }
        Ok(())
    }

    async fn arm_poll(&self) {
        self.poller
            .lock()
            .await
            .arm(self.reconciler.clone(), self.poll_interval);
        self.polling.store(true, Ordering::Release);
    }

    async fn disarm_poll(&self) {
        self.poller.lock().await.disarm();
        self.polling.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for IshyController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IshyController")
            .field("busy", &self.is_busy())
            .field("polling", &self.is_polling())
            .field("disposed", &self.session.is_disposed())
            .finish()
    }
}
