//! Service capability
//!
//! `Service` is what the monitor and dependents see; `ServiceLogic` is the
//! service's own start/stop work, wrapped by [`ServiceBase`](crate::ServiceBase).

use crate::{ServiceError, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a service instance
///
/// Assigned once at construction. Two services sharing a name are still
/// different services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(Uuid);

impl ServiceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity plus name, used in errors and reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub id: ServiceId,
    pub name: String,
}

impl ServiceRef {
    pub fn of(service: &dyn Service) -> Self {
        Self {
            id: service.id(),
            name: service.name().to_string(),
        }
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A managed component with an explicit start/stop lifecycle
pub trait Service: Send + Sync {
    fn id(&self) -> ServiceId;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn status(&self) -> Status;

    fn is_started(&self) -> bool {
        self.status() == Status::Started
    }

    /// Start this service, starting required dependencies first
    ///
    /// Idempotent: a started service returns `Ok(())` without any transition.
    fn start(&self) -> Result<(), ServiceError>;

    /// Stop this service; dependencies are left alone
    fn stop(&self) -> Result<(), ServiceError>;
}

impl fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

/// The service's own start/stop work
///
/// Implementations only do their own work; dependency ordering, status
/// bookkeeping and notification are handled by `ServiceBase`.
pub trait ServiceLogic: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        self.name()
    }

    fn do_start(&self) -> anyhow::Result<()>;

    fn do_stop(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_ids_are_unique() {
        let a = ServiceId::new();
        let b = ServiceId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.as_uuid().to_string());
    }
}
