//! Service status definitions
//!
//! Every managed service is in exactly one of these states. `Initial` is the
//! only construction-time value.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a service
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Constructed, never started
    #[default]
    Initial,
    /// Own start logic or required dependencies are being started
    Starting,
    Started,
    /// Own stop logic is running
    Stopping,
    Stopped,
    /// Own start logic failed
    FailedToStart,
    /// Own stop logic failed
    FailedToStop,
    /// A required dependency did not reach `Started`
    DependencyFailed,
}

impl Status {
    /// Stable states never change without an explicit call or a listener reaction
    pub fn is_stable(self) -> bool {
        !self.is_transient()
    }

    /// `Starting` and `Stopping` only exist while a start/stop call is in progress
    pub fn is_transient(self) -> bool {
        matches!(self, Status::Starting | Status::Stopping)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Status::FailedToStart | Status::FailedToStop | Status::DependencyFailed
        )
    }

    /// Failure states that block an owner's start when reached by a required dependency
    pub fn is_start_failure(self) -> bool {
        matches!(self, Status::FailedToStart | Status::DependencyFailed)
    }
}
