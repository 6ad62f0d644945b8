//! Composed instances
//!
//! An instance is the object produced by constructing a class. It owns a root
//! slot table (methods, properties and nested containers), its private
//! [`InstanceContext`] and a reference to the class it was built from.

use crate::class::ClassDescriptor;
use crate::container::{Container, Slot};
use crate::context::{InstanceContext, InstanceId};
use crate::event::EventTable;
use crate::kind::ValueKind;
use crate::lifecycle::{ExtensionGuard, LifecycleTracker};
use crate::member::{ComposedMember, Member};
use crate::property::PropertyAccessor;
use crate::value::{Record, Value};
use crate::{FactoryError, FactoryResult};
use std::fmt;
use std::rc::Rc;

pub(crate) struct InstanceInner {
    id: InstanceId,
    class: ClassDescriptor,
    root: Container,
    context: InstanceContext,
    tracker: Rc<LifecycleTracker>,
}

impl fmt::Debug for InstanceInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceInner")
            .field("id", &self.id)
            .field("class", &self.class.type_info().qualified_name())
            .finish()
    }
}

impl Drop for InstanceInner {
    fn drop(&mut self) {
        self.tracker.untrack_id(self.id);
    }
}

/// Handle to a composed instance
///
/// Cloning the handle shares the instance. Equality is identity.
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

impl Instance {
    /// Allocate an empty instance with a fresh context
    pub(crate) fn allocate(
        class: ClassDescriptor,
        args: Vec<Value>,
        tracker: Rc<LifecycleTracker>,
    ) -> Self {
        let id = InstanceId::new();
        let guard = ExtensionGuard::new(id, tracker.clone());
        Instance(Rc::new_cyclic(|weak| InstanceInner {
            id,
            class,
            root: Container::with_guard(String::new(), Some(guard)),
            context: InstanceContext::new(weak.clone(), args),
            tracker,
        }))
    }

    pub(crate) fn from_inner(inner: Rc<InstanceInner>) -> Self {
        Instance(inner)
    }

    /// Install one level's member, linking it to the member it overrides
    pub(crate) fn install(&self, level: &str, name: String, body: Member) {
        let base = match self.0.root.slot(&name) {
            Some(Slot::Method(previous)) => Some(previous),
            Some(other) => {
                tracing::trace!(
                    member = %name,
                    level,
                    replaced = other.kind_name(),
                    "member replaces a non-method slot"
                );
                None
            }
            None => None,
        };

        tracing::trace!(member = %name, level, overrides = base.is_some(), "installing member");
        let member = ComposedMember::new(name, level.to_string(), body, base);
        self.0.root.install_method(Rc::new(member));
    }

    /// Unique instance ID
    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    /// Class this instance was constructed from
    pub fn class(&self) -> &ClassDescriptor {
        &self.0.class
    }

    /// Check the instance against a class and all of its subclasses
    pub fn is_a(&self, class: &ClassDescriptor) -> bool {
        self.0.class == *class || self.0.class.is_subclass_of(class)
    }

    /// Root slot table
    pub fn root(&self) -> &Container {
        &self.0.root
    }

    pub(crate) fn context(&self) -> &InstanceContext {
        &self.0.context
    }

    /// Event table of the instance
    pub fn events(&self) -> &EventTable {
        self.0.root.events()
    }

    /// Invoke a member by name
    ///
    /// Methods receive `args`. Properties are read with no arguments and
    /// written with exactly one.
    pub fn call(&self, name: &str, args: &[Value]) -> FactoryResult<Value> {
        let slot = self
            .0
            .root
            .slot(name)
            .ok_or_else(|| FactoryError::UnknownMember(name.to_string()))?;

        match slot {
            Slot::Method(member) => member.invoke(self, args),
            Slot::Property(property) => match args {
                [] => Ok(property.get()),
                [value] => property.set(value.clone()),
                _ => Err(FactoryError::InvalidArgument(format!(
                    "property '{}' takes zero or one argument, got {}",
                    name,
                    args.len()
                ))),
            },
            Slot::Container(_) => Err(FactoryError::InvalidOperation(format!(
                "'{}' is a container and cannot be called.",
                name
            ))),
        }
    }

    /// Check if a member, property or container exists
    pub fn has_member(&self, name: &str) -> bool {
        self.0.root.has(name)
    }

    /// Names of all root slots in installation order
    pub fn member_names(&self) -> Vec<String> {
        self.0.root.names()
    }

    /// Composed method by name
    pub fn method(&self, name: &str) -> Option<Rc<ComposedMember>> {
        match self.0.root.slot(name)? {
            Slot::Method(member) => Some(member),
            _ => None,
        }
    }

    /// Property by name
    pub fn property(&self, name: &str) -> Option<PropertyAccessor> {
        self.0.root.property(name)
    }

    /// Property through nested containers (`"address.street"`)
    pub fn property_at(&self, path: &str) -> Option<PropertyAccessor> {
        self.0.root.property_at(path)
    }

    /// Nested container by name
    pub fn container(&self, name: &str) -> Option<Container> {
        self.0.root.container(name)
    }

    /// Define a typed property
    pub fn define_property(
        &self,
        name: &str,
        kind: ValueKind,
        initial: Option<Value>,
    ) -> FactoryResult<PropertyAccessor> {
        self.0.root.define_property(name, kind, initial)
    }

    /// Define event channels
    pub fn define_events(&self, names: &[&str]) -> FactoryResult<&Self> {
        self.0.root.define_events(names)?;
        Ok(self)
    }

    /// Current property values
    pub fn snapshot(&self) -> Record {
        self.0.root.snapshot()
    }

    /// Invoke the `dispose` member, if any
    pub fn dispose(&self) -> FactoryResult<()> {
        if let Some(member) = self.method("dispose") {
            member.invoke(self, &[])?;
        }
        Ok(())
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Instance {}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.0.id.as_u64())
            .field("class", &self.0.class.type_info().qualified_name())
            .field("members", &self.member_names())
            .finish()
    }
}
