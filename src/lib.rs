//! # Ishy Client
//!
//! Session and status synchronization client for the Ishy anonymous
//! friend-matching service.
//!
//! The crate owns the client side of a session: the locally persisted user
//! ID, the user's status and the service counters reconciled from the
//! server, one-at-a-time user commands (join the queue, leave, set a
//! nickname, ...), and the success/error notices those commands produce.
//! Matchmaking itself happens on the server, reached over HTTP.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement the [`Transport`] trait for any HTTP stack
//! - **HTTP built-in**: the default `transport-http` feature provides `HttpTransport`
//! - **Event-driven**: receive typed [`SessionEvent`]s via a channel, or take a
//!   [`SessionSnapshot`] at any time
//! - **Resilient polling**: background refreshes log failures and keep the
//!   last known values
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "transport-http")]
//! # async fn example() -> Result<(), ishy_client::IshyError> {
//! use ishy_client::{FileStorage, HttpTransport, IshyConfig, IshyController};
//!
//! let config = IshyConfig::from_env();
//! let transport = HttpTransport::new(config.base_url.clone())?;
//! let (controller, _events) =
//!     IshyController::start(transport, FileStorage::new("ishy.json"), config);
//!
//! controller.capture_identity("12345").await?;
//! controller.set_nickname("Sam").await?;
//! controller.join_queue().await?;
//!
//! let snapshot = controller.snapshot().await;
//! println!("{:?}: {:?}", snapshot.presence, snapshot.notices);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod identity;
pub mod nickname;
pub mod protocol;
pub mod reconciler;
pub mod sequencer;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::ApiGateway;
pub use config::IshyConfig;
pub use controller::IshyController;
pub use error::{ApiError, IshyError, ValidationError};
pub use event::SessionEvent;
pub use identity::{FileStorage, Identity, IdentityStorage, IdentityStore, MemoryStorage};
pub use protocol::{AggregateStats, CommandResponse, PresenceState, UserStatus};
pub use reconciler::RefreshOutcome;
pub use sequencer::{ActionOutcome, Command, Notice};
pub use session::{Notices, SessionSnapshot};
pub use transport::Transport;

#[cfg(feature = "transport-http")]
pub use transports::HttpTransport;
