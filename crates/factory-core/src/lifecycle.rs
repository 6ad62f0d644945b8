//! Instance lifecycle tracking
//!
//! Instances do not carry their own extensibility flags. The tracker keeps a
//! side table of tracked instance IDs and a parallel table of their states;
//! both are always edited at the same index.

use crate::context::InstanceId;
use crate::instance::Instance;
use crate::{FactoryError, FactoryResult};
use std::cell::RefCell;
use std::rc::Rc;

/// Mutable flags of a tracked instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleState {
    /// New properties, containers and events may be defined
    pub extensible: bool,
    /// Sealed (implies not extensible)
    pub sealed: bool,
    /// Frozen (implies sealed; property writes are rejected)
    pub frozen: bool,
}

impl Default for LifecycleState {
    fn default() -> Self {
        Self {
            extensible: true,
            sealed: false,
            frozen: false,
        }
    }
}

/// Handle returned when an instance is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedHandle {
    id: InstanceId,
}

impl TrackedHandle {
    /// ID of the tracked instance
    pub fn id(&self) -> InstanceId {
        self.id
    }
}

/// Side table of instance lifecycle flags
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    instances: RefCell<Vec<InstanceId>>,
    states: RefCell<Vec<LifecycleState>>,
}

impl LifecycleTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an instance (idempotent)
    pub fn track(&self, instance: &Instance) -> TrackedHandle {
        self.track_id(instance.id())
    }

    /// Stop tracking an instance; returns false if it was not tracked
    pub fn untrack(&self, instance: &Instance) -> bool {
        self.untrack_id(instance.id())
    }

    /// Check if an instance is tracked
    pub fn is_tracked(&self, instance: &Instance) -> bool {
        self.index_of(instance.id()).is_some()
    }

    /// Current flags of an instance, if tracked
    pub fn state(&self, instance: &Instance) -> Option<LifecycleState> {
        self.state_of(instance.id())
    }

    /// Check if new members may be defined (untracked instances are extensible)
    pub fn is_extensible(&self, instance: &Instance) -> bool {
        self.state_of(instance.id())
            .map_or(true, |state| state.extensible)
    }

    /// Check if an instance is sealed
    pub fn is_sealed(&self, instance: &Instance) -> bool {
        self.state_of(instance.id()).map_or(false, |state| state.sealed)
    }

    /// Check if an instance is frozen
    pub fn is_frozen(&self, instance: &Instance) -> bool {
        self.state_of(instance.id()).map_or(false, |state| state.frozen)
    }

    /// Forbid defining new members on an instance
    pub fn prevent_extensions(&self, instance: &Instance) -> TrackedHandle {
        self.modify(instance.id(), |state| state.extensible = false)
    }

    /// Seal an instance
    pub fn seal(&self, instance: &Instance) -> TrackedHandle {
        self.modify(instance.id(), |state| {
            state.extensible = false;
            state.sealed = true;
        })
    }

    /// Freeze an instance
    pub fn freeze(&self, instance: &Instance) -> TrackedHandle {
        self.modify(instance.id(), |state| {
            state.extensible = false;
            state.sealed = true;
            state.frozen = true;
        })
    }

    /// Number of tracked instances
    pub fn len(&self) -> usize {
        self.instances.borrow().len()
    }

    /// Check if nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.instances.borrow().is_empty()
    }

    fn index_of(&self, id: InstanceId) -> Option<usize> {
        self.instances.borrow().iter().position(|tracked| *tracked == id)
    }

    fn state_of(&self, id: InstanceId) -> Option<LifecycleState> {
        let index = self.index_of(id)?;
        self.states.borrow().get(index).copied()
    }

    pub(crate) fn track_id(&self, id: InstanceId) -> TrackedHandle {
        if self.index_of(id).is_none() {
            self.instances.borrow_mut().push(id);
            self.states.borrow_mut().push(LifecycleState::default());
            tracing::debug!(instance = id.as_u64(), "tracking instance");
        }
        TrackedHandle { id }
    }

    pub(crate) fn untrack_id(&self, id: InstanceId) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };

        let mut instances = self.instances.borrow_mut();
        let mut states = self.states.borrow_mut();
        instances.remove(index);
        states.remove(index);
        tracing::debug!(instance = id.as_u64(), "untracked instance");
        true
    }

    fn modify<F>(&self, id: InstanceId, f: F) -> TrackedHandle
    where
        F: FnOnce(&mut LifecycleState),
    {
        let handle = self.track_id(id);
        if let Some(index) = self.index_of(id) {
            if let Some(state) = self.states.borrow_mut().get_mut(index) {
                f(state);
                tracing::debug!(instance = id.as_u64(), ?state, "lifecycle flags changed");
            }
        }
        handle
    }

    fn extensible_id(&self, id: InstanceId) -> bool {
        self.state_of(id).map_or(true, |state| state.extensible)
    }

    fn frozen_id(&self, id: InstanceId) -> bool {
        self.state_of(id).map_or(false, |state| state.frozen)
    }
}

/// Lifecycle checks carried by an instance's containers and properties
#[derive(Debug, Clone)]
pub(crate) struct ExtensionGuard {
    id: InstanceId,
    tracker: Rc<LifecycleTracker>,
}

impl ExtensionGuard {
    pub(crate) fn new(id: InstanceId, tracker: Rc<LifecycleTracker>) -> Self {
        Self { id, tracker }
    }

    pub(crate) fn check_extensible(&self, name: &str) -> FactoryResult<()> {
        if self.tracker.extensible_id(self.id) {
            Ok(())
        } else {
            Err(FactoryError::InvalidOperation(format!(
                "Cannot define '{}' on a non-extensible instance.",
                name
            )))
        }
    }

    pub(crate) fn check_writable(&self, name: &str) -> FactoryResult<()> {
        if self.tracker.frozen_id(self.id) {
            Err(FactoryError::InvalidOperation(format!(
                "Cannot assign '{}' on a frozen instance.",
                name
            )))
        } else {
            Ok(())
        }
    }
}
