//! Dependency relation between an owning service and one of its dependencies
//!
//! The three flags are independent. `required_at_start` only affects the
//! owner's own start call path; `stop_on_stop` and `start_on_restart` only
//! affect listener-driven reactions to the dependency's transitions.

use crate::{Service, ServiceId, Status};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Control flags for one owner → dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFlags {
    /// Start the dependency before the owner; its failure fails the owner
    pub required_at_start: bool,
    /// Stop the owner when the dependency reaches `Stopped`
    pub stop_on_stop: bool,
    /// Start the owner when the dependency reaches `Started`
    pub start_on_restart: bool,
}

impl Default for DependencyFlags {
    /// A plain edge is fully coupled
    fn default() -> Self {
        Self {
            required_at_start: true,
            stop_on_stop: true,
            start_on_restart: true,
        }
    }
}

impl DependencyFlags {
    /// Fully coupled edge, same as `Default`
    pub fn required() -> Self {
        Self::default()
    }

    /// Observed only: never started by the owner, never reacted to
    pub fn optional() -> Self {
        Self {
            required_at_start: false,
            stop_on_stop: false,
            start_on_restart: false,
        }
    }

    pub fn with_required_at_start(mut self, value: bool) -> Self {
        self.required_at_start = value;
        self
    }

    pub fn with_stop_on_stop(mut self, value: bool) -> Self {
        self.stop_on_stop = value;
        self
    }

    pub fn with_start_on_restart(mut self, value: bool) -> Self {
        self.start_on_restart = value;
        self
    }
}

/// What the owner should do in response to a dependency transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    None,
    StopOwner,
    StartOwner,
}

impl DependencyFlags {
    /// Whether a transition into `to` can trigger a reaction at all
    pub fn watches(&self, to: Status) -> bool {
        match to {
            Status::Stopped => self.stop_on_stop,
            Status::Started => self.start_on_restart,
            _ => false,
        }
    }

    /// Evaluate the listener policy for a dependency transition into `to`
    pub fn reaction(&self, to: Status, owner_started: bool) -> Reaction {
        match to {
            Status::Stopped if self.stop_on_stop && owner_started => Reaction::StopOwner,
            Status::Started if self.start_on_restart && !owner_started => Reaction::StartOwner,
            _ => Reaction::None,
        }
    }
}

/// An owner → dependency edge
#[derive(Clone)]
pub struct Dependency {
    target: Arc<dyn Service>,
    flags: DependencyFlags,
}

impl Dependency {
    pub fn new(target: Arc<dyn Service>, flags: DependencyFlags) -> Self {
        Self { target, flags }
    }

    /// Edge with default (fully coupled) flags
    pub fn required(target: Arc<dyn Service>) -> Self {
        Self::new(target, DependencyFlags::required())
    }

    pub fn optional(target: Arc<dyn Service>) -> Self {
        Self::new(target, DependencyFlags::optional())
    }

    pub fn target(&self) -> &Arc<dyn Service> {
        &self.target
    }

    pub fn target_id(&self) -> ServiceId {
        self.target.id()
    }

    pub fn flags(&self) -> DependencyFlags {
        self.flags
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("target", &self.target.name())
            .field("flags", &self.flags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_flags_fully_coupled() {
        let flags = DependencyFlags::default();
        assert!(flags.required_at_start);
        assert!(flags.stop_on_stop);
        assert!(flags.start_on_restart);
        assert_eq!(flags, DependencyFlags::required());
    }

    #[test]
    fn test_builder_methods() {
        let flags = DependencyFlags::required().with_stop_on_stop(false);
        assert!(flags.required_at_start);
        assert!(!flags.stop_on_stop);
        assert!(flags.start_on_restart);

        let flags = DependencyFlags::optional().with_start_on_restart(true);
        assert!(!flags.required_at_start);
        assert!(flags.start_on_restart);
    }

    #[test]
    fn test_reaction_stop_on_stop() {
        let flags = DependencyFlags::required();
        assert_eq!(flags.reaction(Status::Stopped, true), Reaction::StopOwner);
        assert_eq!(flags.reaction(Status::Stopped, false), Reaction::None);

        let flags = flags.with_stop_on_stop(false);
        assert_eq!(flags.reaction(Status::Stopped, true), Reaction::None);
    }

    #[test]
    fn test_reaction_start_on_restart() {
        let flags = DependencyFlags::required();
        assert_eq!(flags.reaction(Status::Started, false), Reaction::StartOwner);
        assert_eq!(flags.reaction(Status::Started, true), Reaction::None);

        let flags = flags.with_start_on_restart(false);
        assert_eq!(flags.reaction(Status::Started, false), Reaction::None);
    }

    #[test]
    fn test_reaction_ignores_other_transitions() {
        let flags = DependencyFlags::required();
        for to in [
            Status::Starting,
            Status::Stopping,
            Status::FailedToStart,
            Status::FailedToStop,
            Status::DependencyFailed,
        ] {
            assert_eq!(flags.reaction(to, true), Reaction::None);
            assert_eq!(flags.reaction(to, false), Reaction::None);
            assert!(!flags.watches(to));
        }
    }

    #[test]
    fn test_watches_follows_flags() {
        let flags = DependencyFlags::required();
        assert!(flags.watches(Status::Stopped));
        assert!(flags.watches(Status::Started));

        let flags = DependencyFlags::optional();
        assert!(!flags.watches(Status::Stopped));
        assert!(!flags.watches(Status::Started));
    }

    #[test]
    fn test_required_at_start_does_not_imply_reactions() {
        let flags = DependencyFlags::optional().with_required_at_start(true);
        assert_eq!(flags.reaction(Status::Stopped, true), Reaction::None);
        assert_eq!(flags.reaction(Status::Started, false), Reaction::None);
    }
}
