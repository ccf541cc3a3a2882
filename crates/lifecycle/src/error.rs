//! Lifecycle error types
//!
//! `ServiceError` is the single failure surfaced by `start`/`stop`;
//! `RegistryError` covers construction and subscription; `GraphError`
//! covers dependency graph validation.

use crate::{ServiceId, ServiceRef};
use std::fmt;
use thiserror::Error;

/// Which lifecycle call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    Stop,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Start => write!(f, "start"),
            Phase::Stop => write!(f, "stop"),
        }
    }
}

/// Failure of a `start` or `stop` call
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A required-at-start dependency did not reach `Started`
    #[error("Service '{service}' failed to start: required dependency '{dependency}' did not start")]
    RequiredDependencyStartFailure {
        service: ServiceRef,
        dependency: ServiceRef,
        #[source]
        cause: Option<Box<ServiceError>>,
    },

    /// The service's own start logic failed
    #[error("Service '{service}' failed to start: {cause}")]
    OwnStartFailure {
        service: ServiceRef,
        #[source]
        cause: anyhow::Error,
    },

    /// The service's own stop logic failed
    #[error("Service '{service}' failed to stop: {cause}")]
    OwnStopFailure {
        service: ServiceRef,
        #[source]
        cause: anyhow::Error,
    },
}

impl ServiceError {
    /// The service whose call failed
    pub fn service(&self) -> &ServiceRef {
        match self {
            ServiceError::RequiredDependencyStartFailure { service, .. }
            | ServiceError::OwnStartFailure { service, .. }
            | ServiceError::OwnStopFailure { service, .. } => service,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ServiceError::RequiredDependencyStartFailure { .. }
            | ServiceError::OwnStartFailure { .. } => Phase::Start,
            ServiceError::OwnStopFailure { .. } => Phase::Stop,
        }
    }

    /// Walk the dependency chain down to the service whose own logic failed
    pub fn root_service(&self) -> &ServiceRef {
        match self {
            ServiceError::RequiredDependencyStartFailure {
                cause: Some(cause), ..
            } => cause.root_service(),
            ServiceError::RequiredDependencyStartFailure { dependency, .. } => dependency,
            other => other.service(),
        }
    }
}

/// Registration and subscription failures
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Service '{name}' ({id}) is already registered")]
    AlreadyRegistered { id: ServiceId, name: String },

    #[error("Service {id} is not registered with this monitor")]
    NotRegistered { id: ServiceId },

    #[error("Service '{owner}' declares dependency '{target}' more than once")]
    DuplicateDependency { owner: String, target: String },
}

/// Dependency graph validation failures
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Service '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("Service '{owner}' depends on unknown service '{target}'")]
    UnknownTarget { owner: String, target: String },

    #[error("Service '{0}' depends on itself")]
    SelfDependency(String),

    #[error("Dependency cycle detected: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("Failed to construct service graph: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_ref(name: &str) -> ServiceRef {
        ServiceRef {
            id: ServiceId::new(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_phase_and_service() {
        let err = ServiceError::OwnStopFailure {
            service: service_ref("a"),
            cause: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.phase(), Phase::Stop);
        assert_eq!(err.service().name, "a");
        assert_eq!(err.to_string(), "Service 'a' failed to stop: boom");
    }

    #[test]
    fn test_root_service_follows_chain() {
        let inner = ServiceError::OwnStartFailure {
            service: service_ref("a1"),
            cause: anyhow::anyhow!("mock exception on start"),
        };
        let outer = ServiceError::RequiredDependencyStartFailure {
            service: service_ref("d"),
            dependency: service_ref("a1"),
            cause: Some(Box::new(inner)),
        };
        assert_eq!(outer.phase(), Phase::Start);
        assert_eq!(outer.service().name, "d");
        assert_eq!(outer.root_service().name, "a1");
        assert!(std::error::Error::source(&outer).is_some());
    }

    #[test]
    fn test_cycle_display() {
        let err = GraphError::Cycle {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Dependency cycle detected: a -> b -> a");
    }
}
