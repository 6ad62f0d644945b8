//! Typed property accessors
//!
//! A property holds one value of a declared [`ValueKind`]. Writes of any
//! other kind fail without mutating or notifying. A successful write stores
//! the value first and then notifies the `<name>Changed` channel with
//! `(old, new)`. Subscriber errors are logged and do not fail the write, so
//! an `Err` from `set` always means nothing was stored.

use crate::event::EventChannel;
use crate::kind::ValueKind;
use crate::lifecycle::ExtensionGuard;
use crate::value::Value;
use crate::{FactoryError, FactoryResult};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct PropertyInner {
    name: String,
    kind: ValueKind,
    value: RefCell<Value>,
    initial: Value,
    changed: EventChannel,
    guard: Option<ExtensionGuard>,
}

/// Getter/setter pair bound to a declared kind
#[derive(Clone)]
pub struct PropertyAccessor(Rc<PropertyInner>);

impl PropertyAccessor {
    /// Create a detached property
    ///
    /// A `None` or null initial value reads as null.
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        initial: Option<Value>,
    ) -> FactoryResult<Self> {
        let name = name.into();
        let changed = EventChannel::new(changed_event_name(&name));
        Self::with_channel(name, kind, initial, changed, None)
    }

    pub(crate) fn with_channel(
        name: String,
        kind: ValueKind,
        initial: Option<Value>,
        changed: EventChannel,
        guard: Option<ExtensionGuard>,
    ) -> FactoryResult<Self> {
        let initial = initial.unwrap_or_default();
        if !initial.is_null() && !kind.matches(&initial) {
            return Err(FactoryError::type_mismatch(kind, initial.type_name()));
        }

        Ok(PropertyAccessor(Rc::new(PropertyInner {
            name,
            kind,
            value: RefCell::new(initial.clone()),
            initial,
            changed,
            guard,
        })))
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Declared kind
    pub fn kind(&self) -> ValueKind {
        self.0.kind
    }

    /// Read the current value
    pub fn get(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// Initial value
    pub fn initial(&self) -> &Value {
        &self.0.initial
    }

    /// Write a value of the declared kind, then notify `(old, new)`
    pub fn set(&self, value: Value) -> FactoryResult<Value> {
        if !self.0.kind.matches(&value) {
            return Err(FactoryError::type_mismatch(self.0.kind, value.type_name()));
        }
        if let Some(guard) = &self.0.guard {
            guard.check_writable(&self.0.name)?;
        }

        let old = self.0.value.replace(value.clone());
        if let Err(err) = self.0.changed.notify(&[old, value.clone()]) {
            tracing::warn!(property = %self.0.name, error = %err, "change handler failed");
        }
        Ok(value)
    }

    /// Reset to the initial value without notifying
    pub fn revert(&self) -> FactoryResult<Value> {
        if let Some(guard) = &self.0.guard {
            guard.check_writable(&self.0.name)?;
        }

        let initial = self.0.initial.clone();
        *self.0.value.borrow_mut() = initial.clone();
        Ok(initial)
    }

    /// The `<name>Changed` channel
    pub fn changed(&self) -> &EventChannel {
        &self.0.changed
    }

    /// Subscribe to changes; the handler receives `(old, new)`
    pub fn on_changed<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Value, &Value) -> FactoryResult<()> + 'static,
    {
        self.0.changed.subscribe(move |args| match args {
            [old, new] => handler(old, new),
            _ => Ok(()),
        });
        self
    }

    /// Check whether both handles refer to the same property
    pub fn ptr_eq(&self, other: &PropertyAccessor) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .field("value", &self.0.value.borrow())
            .finish()
    }
}

/// Name of the change channel of a property
pub fn changed_event_name(property: &str) -> String {
    format!("{}Changed", property)
}
