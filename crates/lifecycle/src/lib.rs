//! # lifecycle
//!
//! Service lifecycle orchestration.
//!
//! ## Core concepts
//!
//! - `Service`: a named component with a start/stop lifecycle and observable `Status`
//! - `ServiceBase`: start/stop state machine that starts required dependencies
//!   first and reacts to its dependencies' transitions
//! - `Dependency` / `DependencyFlags`: owner → dependency edge with
//!   `required_at_start`, `stop_on_stop` and `start_on_restart`
//! - `ServicesMonitor`: registry of every service, its `ServiceStatusRecord`,
//!   and the `ServiceChangeListener` subscriptions
//! - `ServiceGraph`: name-based declarations, validated as a DAG

mod base;
mod cascade;
mod dependency;
mod error;
mod graph;
mod listener;
mod monitor;
mod record;
mod service;
mod status;

pub use base::ServiceBase;
pub use dependency::{Dependency, DependencyFlags, Reaction};
pub use error::{GraphError, Phase, RegistryError, ServiceError};
pub use graph::{ServiceDeclaration, ServiceGraph};
pub use listener::{ServiceChangeListener, SubscriptionId};
pub use monitor::{MonitorOptions, ServicesMonitor};
pub use record::{ServiceStatusRecord, ServiceStatusReport, TransitionEvent};
pub use service::{Service, ServiceId, ServiceLogic, ServiceRef};
pub use status::Status;
