//! Status reconciliation.
//!
//! [`StatusReconciler`] re-fetches the user's status and the service counters
//! and replaces the session's copies wholesale. A failed refresh is logged
//! and otherwise ignored: the previous value stays in place and nothing is
//! shown to the user.
//!
//! [`Poller`] runs `refresh_aggregate` on a fixed cadence in a background
//! task. At most one poll task is armed at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::api::ApiGateway;
use crate::config::MIN_POLL_INTERVAL;
use crate::identity::Identity;
use crate::session::Session;

/// What happened to a single refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The fetched value replaced the session's copy.
    Applied,
    /// The request failed; the previous value was kept.
    Failed,
    /// The request succeeded but the session moved on (identity changed or
    /// controller disposed) before it settled.
    Discarded,
}

/// Fetches server state into the [`Session`].
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    api: ApiGateway,
    session: Arc<Session>,
}

impl StatusReconciler {
    pub fn new(api: ApiGateway, session: Arc<Session>) -> Self {
        Self { api, session }
    }

    /// Fetch `/me` for `identity` and replace the user status.
    pub async fn refresh_self(&self, identity: &Identity) -> RefreshOutcome {
        let generation = self.session.generation();
        match self.api.fetch_self(identity.as_str()).await {
            Ok(status) => {
                if self.session.replace_status(generation, status).await {
                    RefreshOutcome::Applied
                } else {
                    RefreshOutcome::Discarded
                }
            }
            Err(e) => {
                warn!(user_id = %identity, "failed to refresh user status: {e}");
                RefreshOutcome::Failed
            }
        }
    }

    /// Fetch `/status` and replace the service counters.
    pub async fn refresh_aggregate(&self) -> RefreshOutcome {
        let generation = self.session.generation();
        match self.api.fetch_aggregate().await {
            Ok(stats) => {
                if self.session.replace_stats(generation, stats).await {
                    RefreshOutcome::Applied
                } else {
                    RefreshOutcome::Discarded
                }
            }
            Err(e) => {
                warn!("failed to refresh stats: {e}");
                RefreshOutcome::Failed
            }
        }
    }

    /// `refresh_self` followed by `refresh_aggregate`, in that order.
    pub async fn reconcile(&self, identity: &Identity) -> (RefreshOutcome, RefreshOutcome) {
        let own = self.refresh_self(identity).await;
        let aggregate = self.refresh_aggregate().await;
        (own, aggregate)
    }
}

// ── Poller ──────────────────────────────────────────────────────────

/// Owner of the background aggregate poll.
///
/// Disarming stops the timer but lets a refresh that is already in flight
/// settle; the session generation check discards its result.
#[derive(Debug, Default)]
pub struct Poller {
    task: Option<JoinHandle<()>>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl Poller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling every `period`, replacing any running poll.
    ///
    /// The first refresh happens one `period` after arming. A zero period is
    /// raised to the smallest accepted interval.
    pub fn arm(&mut self, reconciler: StatusReconciler, period: Duration) {
        self.disarm();
        let period = period.max(MIN_POLL_INTERVAL);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.task = Some(tokio::spawn(poll_loop(reconciler, period, stop_rx)));
        self.stop_tx = Some(stop_tx);
        debug!(?period, "aggregate poll armed");
    }

    /// Stop polling. Has no effect if the poll is not armed.
    pub fn disarm(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
            debug!("aggregate poll disarmed");
        }
        // The task exits on its own once any in-flight refresh settles.
        self.task = None;
    }

    pub fn is_armed(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Stop polling and wait up to `timeout` for the task to finish,
    /// aborting it if it does not.
    pub async fn shutdown(&mut self, timeout: Duration) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("poll task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("poll task did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("poll task aborted: {join_err}");
                    }
                }
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_loop(
    reconciler: StatusReconciler,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut stop_rx => break,

            _ = ticker.tick() => {
                reconciler.refresh_aggregate().await;
            }
        }
    }

    debug!("aggregate poll exited");
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
    use crate::error::ApiError;
    use crate::event::SessionEvent;
    use crate::protocol::AggregateStats;
    use crate::transport::{HttpRequest, HttpResponse, Transport};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;

    /// Answers `/status` with an incrementing queue count, or fails on demand.
    struct CountingTransport {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail {
                return Err(ApiError::transport("offline"));
            }
            Ok(HttpResponse::new(200, format!(r#"{{"queue":{n}}}"#)))
        }
    }

    fn reconciler(fail: bool) -> (StatusReconciler, Arc<AtomicUsize>, mpsc::Receiver<SessionEvent>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = CountingTransport {
            calls: Arc::clone(&calls),
            fail,
        };
        let (tx, rx) = mpsc::channel(64);
        let session = Arc::new(Session::new(tx));
        (
            StatusReconciler::new(ApiGateway::new(transport, "k"), session),
            calls,
            rx,
        )
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_stats() {
        let (ok, _, _rx) = reconciler(false);
        let generation = ok.session.generation();
        ok.session
            .replace_stats(
                generation,
                AggregateStats {
                    queue_count: 5,
                    active_chats: 2,
                    blocks: 1,
                },
            )
            .await;

        let failing = StatusReconciler::new(
            ApiGateway::new(
                CountingTransport {
                    calls: Arc::new(AtomicUsize::new(0)),
                    fail: true,
                },
                "k",
            ),
            Arc::clone(&ok.session),
        );
        assert_eq!(failing.refresh_aggregate().await, RefreshOutcome::Failed);
        assert_eq!(ok.session.stats().await.unwrap().queue_count, 5);
        assert_eq!(ok.session.notices().await, Default::default());
    }

    #[tokio::test(start_paused = true)]
    async fn poll_runs_on_cadence_and_stops_when_disarmed() {
        let (reconciler, calls, _rx) = reconciler(false);
        let mut poller = Poller::new();
        poller.arm(reconciler, Duration::from_secs(3));
        assert!(poller.is_armed());

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0, "first tick is one period out");

        tokio::time::sleep(Duration::from_millis(6_200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        poller.disarm();
        assert!(!poller.is_armed());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_raised_instead_of_killing_the_task() {
        let (reconciler, calls, _rx) = reconciler(false);
        let mut poller = Poller::new();
        poller.arm(reconciler, Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1);
        assert!(!poller.task.as_ref().unwrap().is_finished());

        poller.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_never_stacks_timers() {
        let (reconciler, calls, _rx) = reconciler(false);
        let mut poller = Poller::new();
        poller.arm(reconciler.clone(), Duration::from_secs(3));
        poller.arm(reconciler.clone(), Duration::from_secs(3));
        poller.arm(reconciler, Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(9_100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        poller.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failing_polls_keep_running() {
        let (reconciler, calls, _rx) = reconciler(true);
        let mut poller = Poller::new();
        poller.arm(reconciler, Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(9_100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        poller.shutdown(Duration::from_secs(1)).await;
    }
}
