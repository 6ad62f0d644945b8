//! Slot tables
//!
//! A container maps names to slots: composed methods, typed properties and
//! nested containers. Every instance has a root container; the model binder
//! creates nested ones. Each container owns its own `events` table.

use crate::event::{EventChannel, EventTable};
use crate::kind::ValueKind;
use crate::lifecycle::ExtensionGuard;
use crate::member::ComposedMember;
use crate::property::{changed_event_name, PropertyAccessor};
use crate::value::{Record, Value};
use crate::{FactoryError, FactoryResult};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One named entry of a container
#[derive(Clone)]
pub enum Slot {
    /// Composed method
    Method(Rc<ComposedMember>),
    /// Typed property
    Property(PropertyAccessor),
    /// Nested container
    Container(Container),
}

impl Slot {
    /// Slot kind name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Slot::Method(_) => "method",
            Slot::Property(_) => "property",
            Slot::Container(_) => "container",
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Method(m) => write!(f, "Method({}::{})", m.level(), m.name()),
            Slot::Property(p) => fmt::Debug::fmt(p, f),
            Slot::Container(c) => fmt::Debug::fmt(c, f),
        }
    }
}

struct ContainerInner {
    path: String,
    slots: RefCell<IndexMap<String, Slot>>,
    events: EventTable,
    guard: Option<ExtensionGuard>,
}

/// Named slot table with its own events
#[derive(Clone)]
pub struct Container(Rc<ContainerInner>);

impl Container {
    /// Create a detached container
    pub fn new() -> Self {
        Self::with_guard(String::new(), None)
    }

    pub(crate) fn with_guard(path: String, guard: Option<ExtensionGuard>) -> Self {
        Container(Rc::new(ContainerInner {
            path,
            slots: RefCell::new(IndexMap::new()),
            events: EventTable::new(),
            guard,
        }))
    }

    /// Dotted path from the instance root (empty for the root)
    pub fn path(&self) -> &str {
        &self.0.path
    }

    /// Event table of this container
    pub fn events(&self) -> &EventTable {
        &self.0.events
    }

    /// Define event channels
    pub fn define_events(&self, names: &[&str]) -> FactoryResult<&Self> {
        if let Some(guard) = &self.0.guard {
            for name in names.iter().filter(|name| !self.0.events.contains(name)) {
                guard.check_extensible(name)?;
            }
        }
        self.0.events.define(names);
        Ok(self)
    }

    /// Define a typed property and its `<name>Changed` channel
    pub fn define_property(
        &self,
        name: &str,
        kind: ValueKind,
        initial: Option<Value>,
    ) -> FactoryResult<PropertyAccessor> {
        self.check_definable(name)?;

        let event = changed_event_name(name);
        let changed = self
            .0
            .events
            .channel(&event)
            .unwrap_or_else(|| EventChannel::new(event));
        let property = PropertyAccessor::with_channel(
            name.to_string(),
            kind,
            initial,
            changed,
            self.0.guard.clone(),
        )?;
        self.0.events.adopt(property.changed().clone());
        self.0
            .slots
            .borrow_mut()
            .insert(name.to_string(), Slot::Property(property.clone()));

        tracing::trace!(container = %self.0.path, property = name, %kind, "defined property");
        Ok(property)
    }

    /// Define a nested container
    pub fn define_container(&self, name: &str) -> FactoryResult<Container> {
        self.check_definable(name)?;

        let path = if self.0.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.0.path, name)
        };
        let container = Container::with_guard(path, self.0.guard.clone());
        self.0
            .slots
            .borrow_mut()
            .insert(name.to_string(), Slot::Container(container.clone()));
        Ok(container)
    }

    /// Install a composed method, returning the slot it replaced
    pub(crate) fn install_method(&self, member: Rc<ComposedMember>) -> Option<Slot> {
        self.0
            .slots
            .borrow_mut()
            .insert(member.name().to_string(), Slot::Method(member))
    }

    fn check_definable(&self, name: &str) -> FactoryResult<()> {
        if name.is_empty() {
            return Err(FactoryError::InvalidArgument(
                "member names must not be empty".to_string(),
            ));
        }
        if self.has(name) {
            return Err(FactoryError::PropertyExists(name.to_string()));
        }
        if let Some(guard) = &self.0.guard {
            guard.check_extensible(name)?;
        }
        Ok(())
    }

    /// Get a slot by name
    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.0.slots.borrow().get(name).cloned()
    }

    /// Get a property by name
    pub fn property(&self, name: &str) -> Option<PropertyAccessor> {
        match self.slot(name)? {
            Slot::Property(p) => Some(p),
            _ => None,
        }
    }

    /// Get a nested container by name
    pub fn container(&self, name: &str) -> Option<Container> {
        match self.slot(name)? {
            Slot::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Resolve a property through nested containers (`"address.street"`)
    pub fn property_at(&self, path: &str) -> Option<PropertyAccessor> {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut current = self.clone();
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                current = current.container(segment)?;
            }
        }
        current.property(leaf)
    }

    /// Check if a slot exists
    pub fn has(&self, name: &str) -> bool {
        self.0.slots.borrow().contains_key(name)
    }

    /// Slot names in definition order
    pub fn names(&self) -> Vec<String> {
        self.0.slots.borrow().keys().cloned().collect()
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }

    /// Check if the container has no slots
    pub fn is_empty(&self) -> bool {
        self.0.slots.borrow().is_empty()
    }

    /// Current property values as a record, nested containers included
    pub fn snapshot(&self) -> Record {
        let record = Record::new();
        for (name, slot) in self.0.slots.borrow().iter() {
            match slot {
                Slot::Property(p) => {
                    record.insert(name.clone(), p.get());
                }
                Slot::Container(c) => {
                    record.insert(name.clone(), Value::Record(c.snapshot()));
                }
                Slot::Method(_) => {}
            }
        }
        record
    }

    /// Check whether both handles refer to the same container
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("path", &self.0.path)
            .field("slots", &self.names())
            .field("events", &self.0.events)
            .finish()
    }
}
