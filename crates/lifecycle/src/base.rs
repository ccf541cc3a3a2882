//! Service state machine
//!
//! `ServiceBase` wraps a [`ServiceLogic`] with the start/stop state machine,
//! the required-dependency cascade, and the listener reactions to its
//! dependencies' transitions.
//!
//! ## Locking
//!
//! Each service owns a re-entrant lifecycle lock held for the whole of a
//! `start`/`stop` call, including listener dispatch. Blocking acquisition
//! only happens owner → required dependency, which the DAG keeps acyclic.
//! Reactions to a dependency's transition are queued on the notifying
//! thread and run after its outermost call has released every lock.

use crate::cascade::{self, CallScope};
use crate::{
    Dependency, Reaction, RegistryError, Service, ServiceChangeListener, ServiceError, ServiceId,
    ServiceLogic, ServiceRef, ServicesMonitor, Status,
};
use parking_lot::{ReentrantMutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

/// Start/stop state machine around a service's own logic
pub struct ServiceBase<L: ServiceLogic> {
    id: ServiceId,
    logic: L,
    /// Declaration order
    dependencies: Vec<Dependency>,
    status: RwLock<Status>,
    lifecycle: ReentrantMutex<()>,
    monitor: Weak<ServicesMonitor>,
    this: Weak<Self>,
}

impl<L: ServiceLogic> ServiceBase<L> {
    /// Construct, register with `monitor`, and watch every dependency
    ///
    /// Every dependency must already be registered with the same monitor
    /// and appear at most once.
    pub fn new(
        monitor: &Arc<ServicesMonitor>,
        logic: L,
        dependencies: Vec<Dependency>,
    ) -> Result<Arc<Self>, RegistryError> {
        let mut seen = HashSet::new();
        for dependency in &dependencies {
            let target = dependency.target_id();
            if !seen.insert(target) {
                return Err(RegistryError::DuplicateDependency {
                    owner: logic.name().to_string(),
                    target: dependency.target().name().to_string(),
                });
            }
            if !monitor.contains(target) {
                return Err(RegistryError::NotRegistered { id: target });
            }
        }

        let service = Arc::new_cyclic(|this| Self {
            id: ServiceId::new(),
            logic,
            dependencies,
            status: RwLock::new(Status::Initial),
            lifecycle: ReentrantMutex::new(()),
            monitor: Arc::downgrade(monitor),
            this: this.clone(),
        });

        monitor.register(service.clone())?;
        for dependency in &service.dependencies {
            monitor.subscribe(dependency.target_id(), service.clone())?;
        }

        debug!(
            service = service.name(),
            dependencies = service.dependencies.len(),
            "Service constructed"
        );
        Ok(service)
    }

    pub fn logic(&self) -> &L {
        &self.logic
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    pub fn dependency(&self, target: ServiceId) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.target_id() == target)
    }

    fn service_ref(&self) -> ServiceRef {
        ServiceRef {
            id: self.id,
            name: self.logic.name().to_string(),
        }
    }

    /// `Starting`/`Stopping`: status and record move together, no dispatch
    fn set_transient(&self, status: Status) {
        let mut current = self.status.write();
        *current = status;
        if let Some(monitor) = self.monitor.upgrade() {
            monitor.apply_transient(self.id, status);
        }
    }

    /// Settled transition: status and record under the status lock, then
    /// synchronous listener dispatch
    fn settle(&self, from: Status, to: Status) {
        let monitor = self.monitor.upgrade();
        {
            let mut current = self.status.write();
            *current = to;
            match &monitor {
                Some(monitor) => monitor.apply_transition(self.id, self.name(), from, to),
                None => warn!(
                    service = self.name(),
                    %to,
                    "Services monitor dropped, transition not recorded"
                ),
            }
        }
        if let Some(monitor) = monitor {
            monitor.notify_listeners(self, from, to);
        }
    }

    fn start_locked(&self) -> Result<(), ServiceError> {
        let _guard = self.lifecycle.lock();
        let from = self.status();
        if from == Status::Started {
            debug!(service = self.name(), "Already started");
            return Ok(());
        }
        if from.is_transient() {
            // Re-entered from a listener while this service is mid-call
            trace!(service = self.name(), status = %from, "Start ignored, call in progress");
            return Ok(());
        }

        self.set_transient(Status::Starting);

        for dependency in self.dependencies.iter().filter(|d| d.flags().required_at_start) {
            let target = dependency.target();
            trace!(
                service = self.name(),
                dependency = target.name(),
                "Starting required dependency"
            );
            let result = target.start();
            if result.is_err() || target.status().is_start_failure() {
                warn!(
                    service = self.name(),
                    dependency = target.name(),
                    dependency_status = %target.status(),
                    "Required dependency failed to start"
                );
                self.settle(from, Status::DependencyFailed);
                return Err(ServiceError::RequiredDependencyStartFailure {
                    service: self.service_ref(),
                    dependency: ServiceRef::of(target.as_ref()),
                    cause: result.err().map(Box::new),
                });
            }
        }

        match self.logic.do_start() {
            Ok(()) => {
                info!(service = self.name(), "Service started");
                self.settle(from, Status::Started);
                Ok(())
            }
            Err(cause) => {
                warn!(service = self.name(), error = %cause, "Service failed to start");
                self.settle(from, Status::FailedToStart);
                Err(ServiceError::OwnStartFailure {
                    service: self.service_ref(),
                    cause,
                })
            }
        }
    }

    fn stop_locked(&self) -> Result<(), ServiceError> {
        let _guard = self.lifecycle.lock();
        let from = self.status();
        // Own start logic never completed: nothing to stop
        if matches!(from, Status::Initial | Status::Stopped) || from.is_start_failure() {
            debug!(service = self.name(), status = %from, "Nothing to stop");
            return Ok(());
        }
        if from.is_transient() {
            trace!(service = self.name(), status = %from, "Stop ignored, call in progress");
            return Ok(());
        }

        self.set_transient(Status::Stopping);

        match self.logic.do_stop() {
            Ok(()) => {
                info!(service = self.name(), "Service stopped");
                self.settle(from, Status::Stopped);
                Ok(())
            }
            Err(cause) => {
                warn!(service = self.name(), error = %cause, "Service failed to stop");
                self.settle(from, Status::FailedToStop);
                Err(ServiceError::OwnStopFailure {
                    service: self.service_ref(),
                    cause,
                })
            }
        }
    }

    /// Apply the edge policy for a dependency that reached `to`
    ///
    /// Runs with no other lifecycle lock held on this thread, so waiting for
    /// a call in progress on another thread is safe. The policy is checked
    /// against the status that call settles on.
    fn react(&self, target: ServiceId, to: Status) {
        let Some(dependency) = self.dependency(target) else {
            return;
        };
        let _guard = self.lifecycle.lock();
        let result = match dependency.flags().reaction(to, self.status() == Status::Started) {
            Reaction::None => return,
            Reaction::StopOwner => {
                debug!(
                    service = self.name(),
                    dependency = dependency.target().name(),
                    "Dependency stopped, stopping dependent"
                );
                self.stop()
            }
            Reaction::StartOwner => {
                debug!(
                    service = self.name(),
                    dependency = dependency.target().name(),
                    "Dependency started, starting dependent"
                );
                self.start()
            }
        };
        if let Err(e) = result {
            warn!(
                service = self.name(),
                dependency = dependency.target().name(),
                error = %e,
                "Reaction to dependency change failed"
            );
        }
    }

    /// Whether a dependency reaching `to` needs a queued reaction
    fn needs_reaction(&self, dependency: &Dependency, to: Status) -> bool {
        match self.lifecycle.try_lock() {
            Some(_guard) => {
                let status = self.status();
                // Still transient while we hold the lock: this thread's own
                // call is in progress and decides the outcome
                !status.is_transient()
                    && dependency.flags().reaction(to, status == Status::Started) != Reaction::None
            }
            // Another thread is mid-call; decided once it settles
            None => dependency.flags().watches(to),
        }
    }
}

impl<L: ServiceLogic> Service for ServiceBase<L> {
    fn id(&self) -> ServiceId {
        self.id
    }

    fn name(&self) -> &str {
        self.logic.name()
    }

    fn description(&self) -> &str {
        self.logic.description()
    }

    fn status(&self) -> Status {
        *self.status.read()
    }

    fn start(&self) -> Result<(), ServiceError> {
        let _scope = CallScope::enter();
        self.start_locked()
    }

    fn stop(&self) -> Result<(), ServiceError> {
        let _scope = CallScope::enter();
        self.stop_locked()
    }
}

impl<L: ServiceLogic> ServiceChangeListener for ServiceBase<L> {
    fn service_status_change(&self, service: &dyn Service, _from: Status, to: Status) {
        let Some(dependency) = self.dependency(service.id()) else {
            return;
        };
        if !self.needs_reaction(dependency, to) {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let target = service.id();
        trace!(
            service = self.name(),
            dependency = service.name(),
            %to,
            "Queued reaction to dependency change"
        );
        // Re-evaluated when it runs; the owner may have moved on
        cascade::defer(move || this.react(target, to));
    }
}

impl<L: ServiceLogic> fmt::Debug for ServiceBase<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBase")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("status", &self.status())
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
