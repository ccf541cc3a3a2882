//! Services monitor
//!
//! Registry of every service constructed in an application scope. Keeps one
//! [`ServiceStatusRecord`] per service, a bounded transition history, and
//! the listener subscriptions keyed by the watched service.
//!
//! Records and listener lists are sharded per service id, so transitions
//! of unrelated services do not contend.

use crate::{
    RegistryError, Service, ServiceChangeListener, ServiceId, ServiceStatusRecord,
    ServiceStatusReport, Status, SubscriptionId, TransitionEvent,
};
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const DEFAULT_HISTORY_CAPACITY: usize = 32;

/// Monitor tuning
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Settled transitions kept per service; 0 disables history
    pub history_capacity: usize,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Default)]
struct ServiceEntry {
    record: ServiceStatusRecord,
    history: VecDeque<TransitionEvent>,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    listener: Arc<dyn ServiceChangeListener>,
}

/// Registry and notification hub for all services of an application scope
pub struct ServicesMonitor {
    options: MonitorOptions,
    /// Registration order
    services: RwLock<Vec<Arc<dyn Service>>>,
    entries: DashMap<ServiceId, ServiceEntry>,
    subscriptions: DashMap<ServiceId, Vec<Subscription>>,
}

impl ServicesMonitor {
    pub fn new() -> Arc<Self> {
        Self::with_options(MonitorOptions::default())
    }

    pub fn with_options(options: MonitorOptions) -> Arc<Self> {
        Arc::new(Self {
            options,
            services: RwLock::new(Vec::new()),
            entries: DashMap::new(),
            subscriptions: DashMap::new(),
        })
    }

    /// Register a service; the same identity cannot register twice
    pub fn register(&self, service: Arc<dyn Service>) -> Result<(), RegistryError> {
        let id = service.id();
        let status = service.status();

        let mut services = self.services.write();
        match self.entries.entry(id) {
            Entry::Occupied(_) => {
                return Err(RegistryError::AlreadyRegistered {
                    id,
                    name: service.name().to_string(),
                });
            }
            Entry::Vacant(vacant) => {
                let mut entry = ServiceEntry::default();
                entry.record.current_status = status;
                vacant.insert(entry);
            }
        }
        self.subscriptions.entry(id).or_default();
        debug!(service = service.name(), %id, "Registered service");
        services.push(service);
        Ok(())
    }

    /// Record a settled transition and notify the service's listeners
    ///
    /// Listeners run synchronously, in subscription order, before this
    /// returns. `ServiceBase` calls the two halves separately so the record
    /// update happens under its status lock.
    pub fn record_transition(&self, service: &dyn Service, from: Status, to: Status) {
        self.apply_transition(service.id(), service.name(), from, to);
        self.notify_listeners(service, from, to);
    }

    pub(crate) fn apply_transient(&self, id: ServiceId, status: Status) {
        if let Some(mut entry) = self.entries.get_mut(&id) {
            entry.record.apply_transient(status);
        }
    }

    pub(crate) fn apply_transition(&self, id: ServiceId, name: &str, from: Status, to: Status) {
        let Some(mut entry) = self.entries.get_mut(&id) else {
            warn!(service = name, %id, "Transition for unregistered service ignored");
            return;
        };
        let at = Utc::now();
        entry.record.apply_transition(from, to, at);

        let capacity = self.options.history_capacity;
        if capacity > 0 {
            if entry.history.len() >= capacity {
                entry.history.pop_front();
            }
            entry.history.push_back(TransitionEvent {
                service_id: id,
                service_name: name.to_string(),
                from,
                to,
                at,
            });
        }
        trace!(service = name, %from, %to, "Recorded transition");
    }

    pub(crate) fn notify_listeners(&self, service: &dyn Service, from: Status, to: Status) {
        // Snapshot first: listeners may subscribe, unsubscribe or trigger
        // nested transitions while we iterate.
        let listeners: Vec<Arc<dyn ServiceChangeListener>> = self
            .subscriptions
            .get(&service.id())
            .map(|subs| subs.iter().map(|s| s.listener.clone()).collect())
            .unwrap_or_default();

        debug!(
            service = service.name(),
            %from,
            %to,
            listeners = listeners.len(),
            "Dispatching status change"
        );
        for listener in listeners {
            listener.service_status_change(service, from, to);
        }
    }

    /// Watch `target`'s transitions
    pub fn subscribe(
        &self,
        target: ServiceId,
        listener: Arc<dyn ServiceChangeListener>,
    ) -> Result<SubscriptionId, RegistryError> {
        if !self.entries.contains_key(&target) {
            return Err(RegistryError::NotRegistered { id: target });
        }
        let id = SubscriptionId::next();
        self.subscriptions
            .entry(target)
            .or_default()
            .push(Subscription { id, listener });
        Ok(id)
    }

    /// Returns false if the subscription was not found
    pub fn unsubscribe(&self, target: ServiceId, subscription: SubscriptionId) -> bool {
        let Some(mut subs) = self.subscriptions.get_mut(&target) else {
            return false;
        };
        let before = subs.len();
        subs.retain(|s| s.id != subscription);
        subs.len() != before
    }

    pub fn listener_count(&self, target: ServiceId) -> usize {
        self.subscriptions
            .get(&target)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Snapshot of the most recent completed transition
    pub fn service_status(&self, id: ServiceId) -> Option<ServiceStatusRecord> {
        self.entries.get(&id).map(|entry| entry.record.clone())
    }

    /// Settled transitions, oldest first
    pub fn history(&self, id: ServiceId) -> Vec<TransitionEvent> {
        self.entries
            .get(&id)
            .map(|entry| entry.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// All services registered in this scope, in registration order
    pub fn registered_services(&self) -> Vec<Arc<dyn Service>> {
        self.services.read().clone()
    }

    pub fn service(&self, id: ServiceId) -> Option<Arc<dyn Service>> {
        self.services.read().iter().find(|s| s.id() == id).cloned()
    }

    pub fn contains(&self, id: ServiceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Diagnostics snapshot of every service, in registration order
    pub fn status_report(&self) -> Vec<ServiceStatusReport> {
        self.registered_services()
            .iter()
            .map(|service| {
                let id = service.id();
                ServiceStatusReport {
                    id,
                    name: service.name().to_string(),
                    description: service.description().to_string(),
                    record: self.service_status(id).unwrap_or_default(),
                    listeners: self.listener_count(id),
                }
            })
            .collect()
    }
}

impl fmt::Debug for ServicesMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServicesMonitor")
            .field("options", &self.options)
            .field("services", &self.len())
            .finish()
    }
}
