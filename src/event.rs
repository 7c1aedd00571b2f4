//! Events emitted to the presentation layer.
//!
//! Every change to the session context is announced on the channel returned
//! by [`IshyController::start`](crate::controller::IshyController::start).
//! Events are hints to re-render; the authoritative view is always
//! [`snapshot()`](crate::controller::IshyController::snapshot).

use crate::identity::Identity;
use crate::protocol::{AggregateStats, PresenceState, UserStatus};
use crate::session::Notices;

/// A change to the session context.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// An identity was captured, or the identity was cleared.
    IdentityChanged { identity: Option<Identity> },

    /// A `refreshSelf` pass replaced the user status.
    StatusUpdated {
        status: UserStatus,
        /// Derived from `status` at the time of the update.
        presence: PresenceState,
    },

    /// A `refreshAggregate` pass replaced the service counters.
    StatsUpdated { stats: AggregateStats },

    /// The success or error notice changed.
    NoticesChanged { notices: Notices },

    /// An action started (`true`) or settled (`false`).
    BusyChanged { busy: bool },

    /// The nickname modal was opened or closed.
    NicknameModalChanged { open: bool },
}
