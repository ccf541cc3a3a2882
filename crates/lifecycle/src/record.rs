//! Per-service status records kept by the monitor

use crate::{ServiceId, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a service's most recent transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceStatusRecord {
    pub current_status: Status,
    /// Status before the most recent settled transition
    pub previous_status: Status,
    pub last_start_time: Option<DateTime<Utc>>,
    pub last_stop_time: Option<DateTime<Utc>>,
    /// Time of the most recent settled transition
    pub status_change_time: Option<DateTime<Utc>>,
}

impl ServiceStatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Starting`/`Stopping`: only the current status moves
    pub(crate) fn apply_transient(&mut self, status: Status) {
        self.current_status = status;
    }

    /// Settled transition. `Started` stamps the start time, `Stopped` the
    /// stop time; failures only stamp the change time.
    pub(crate) fn apply_transition(&mut self, from: Status, to: Status, at: DateTime<Utc>) {
        self.previous_status = from;
        self.current_status = to;
        self.status_change_time = Some(at);
        match to {
            Status::Started => self.last_start_time = Some(at),
            Status::Stopped => self.last_stop_time = Some(at),
            _ => {}
        }
    }
}

/// One settled transition, as kept in the monitor's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub service_id: ServiceId,
    pub service_name: String,
    pub from: Status,
    pub to: Status,
    pub at: DateTime<Utc>,
}

/// Diagnostics view of a registered service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatusReport {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    #[serde(flatten)]
    pub record: ServiceStatusRecord,
    pub listeners: usize,
}
