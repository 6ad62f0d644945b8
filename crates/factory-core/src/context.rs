//! Instance Context
//!
//! Each instantiation owns one InstanceContext holding:
//! - The protected state, visible only to code running inside composition
//! - A back-reference to the public instance
//! - The initializer forwarder and the original construction arguments
//!
//! Every level of the hierarchy runs its declaration against the same
//! context during one construction, so base-level protected writes are
//! visible to derived levels of that instance and to no other instance.

use crate::class::ClassDescriptor;
use crate::container::{Container, Slot};
use crate::event::EventTable;
use crate::instance::{Instance, InstanceInner};
use crate::kind::ValueKind;
use crate::property::PropertyAccessor;
use crate::value::Value;
use crate::FactoryResult;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Weak;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Create a new unique instance ID
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        InstanceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Protected key/value store of one instance
#[derive(Debug, Default)]
pub struct ProtectedState {
    values: RefCell<FxHashMap<String, Value>>,
}

impl ProtectedState {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    /// Set a value, returning the previous one
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.borrow_mut().insert(key.into(), value)
    }

    /// Check if a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.borrow().contains_key(key)
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.borrow_mut().remove(key)
    }

    /// Replace a value with `f(current)` and return the new value
    pub fn update<F>(&self, key: &str, f: F) -> Value
    where
        F: FnOnce(Option<Value>) -> Value,
    {
        let current = self.get(key);
        let next = f(current);
        self.set(key, next.clone());
        next
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

/// Per-instance private record
#[derive(Debug)]
pub struct InstanceContext {
    /// Protected state
    protected: ProtectedState,

    /// Back-reference to the public instance
    instance: Weak<InstanceInner>,

    /// Original construction arguments
    args: Vec<Value>,

    /// Whether the initializer has already run
    initialized: Cell<bool>,
}

impl InstanceContext {
    pub(crate) fn new(instance: Weak<InstanceInner>, args: Vec<Value>) -> Self {
        Self {
            protected: ProtectedState::new(),
            instance,
            args,
            initialized: Cell::new(false),
        }
    }

    /// Protected state
    pub fn protected(&self) -> &ProtectedState {
        &self.protected
    }

    /// The public instance, while it is alive
    pub fn instance(&self) -> Option<Instance> {
        self.instance.upgrade().map(Instance::from_inner)
    }

    /// Original construction arguments
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Check if the initializer has run
    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Invoke the composed `init` member with the construction arguments
    ///
    /// Runs at most once per instance; later calls return null.
    pub(crate) fn initialize(&self) -> FactoryResult<Value> {
        if self.initialized.replace(true) {
            return Ok(Value::Null);
        }
        let Some(instance) = self.instance() else {
            return Ok(Value::Null);
        };

        match instance.root().slot("init") {
            Some(Slot::Method(init)) => init.invoke(&instance, &self.args),
            _ => Ok(Value::Null),
        }
    }
}

/// Environment handed to a declaration body
///
/// Exposes the instance under construction together with its protected
/// state, so a level can define properties and events before returning its
/// member map.
pub struct DeclarationScope<'a> {
    instance: &'a Instance,
    level: &'a ClassDescriptor,
}

impl<'a> DeclarationScope<'a> {
    pub(crate) fn new(instance: &'a Instance, level: &'a ClassDescriptor) -> Self {
        Self { instance, level }
    }

    /// Instance under construction
    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Class level whose declaration is running
    pub fn level(&self) -> &ClassDescriptor {
        self.level
    }

    /// Protected state of the instance
    pub fn protected(&self) -> &ProtectedState {
        self.instance.context().protected()
    }

    /// Root slot table of the instance
    pub fn root(&self) -> &Container {
        self.instance.root()
    }

    /// Event table of the instance
    pub fn events(&self) -> &EventTable {
        self.instance.root().events()
    }

    /// Define event channels on the instance
    pub fn define_events(&self, names: &[&str]) -> FactoryResult<&Self> {
        self.instance.root().define_events(names)?;
        Ok(self)
    }

    /// Define a typed property on the instance
    pub fn define_property(
        &self,
        name: &str,
        kind: ValueKind,
        initial: Option<Value>,
    ) -> FactoryResult<PropertyAccessor> {
        self.instance.root().define_property(name, kind, initial)
    }

    /// Define a nested container on the instance
    pub fn define_container(&self, name: &str) -> FactoryResult<Container> {
        self.instance.root().define_container(name)
    }
}
