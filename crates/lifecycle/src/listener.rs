//! Status change listeners

use crate::{Service, Status};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Notified synchronously on every settled transition of a watched service
///
/// Callbacks run on the thread that caused the transition, before that
/// thread's `start`/`stop` call returns, while the watched service's
/// lifecycle lock is held. A callback that starts or stops other services
/// directly can block on their locks; `ServiceBase` queues its own
/// reactions instead.
///
/// ## Ordering
///
/// Listeners are called in subscription order. A dependent `ServiceBase`
/// only queues its `stop_on_stop`/`start_on_restart` reaction when called;
/// the reaction runs after the outermost `start`/`stop` on the thread has
/// released its locks. Every listener on the dependency, including those
/// subscribed after the dependent, therefore sees the dependency's event
/// before the dependent's own transition. The dependent's transition is
/// delivered to its own listeners once the reaction runs, still before the
/// triggering call returns.
pub trait ServiceChangeListener: Send + Sync {
    fn service_status_change(&self, service: &dyn Service, from: Status, to: Status);
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

static NEXT_SUBSCRIPTION: AtomicU64 = AtomicU64::new(1);

impl SubscriptionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_SUBSCRIPTION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
