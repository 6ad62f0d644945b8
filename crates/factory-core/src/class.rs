//! Class declaration and composition
//!
//! A class is a chain of declarations. Composing a class validates its
//! declaration and records its type metadata; constructing an instance runs
//! every declaration of the chain, root first, against one fresh instance
//! and one shared [`InstanceContext`](crate::context::InstanceContext):
//!
//! ```text
//! instantiate(Dog, args)
//!   allocate instance + context
//!   BaseObject body -> { init, dispose }      installed, no base
//!   Animal body     -> { speak }              installed, no base
//!   Dog body        -> { speak }              installed, base = Animal::speak
//!   init(args)                                at most once
//! ```
//!
//! Any error raised by a declaration body or by `init` aborts the
//! construction; no partially composed instance escapes.

use crate::context::DeclarationScope;
use crate::instance::Instance;
use crate::member::MemberMap;
use crate::namespace::{split_path, NamespaceNode, NamespaceRegistry};
use crate::runtime::Shared;
use crate::value::Value;
use crate::{FactoryError, FactoryResult};
use std::fmt;
use std::rc::{Rc, Weak};

/// Body of one declaration level
pub type DeclarationBody =
    Rc<dyn Fn(&DeclarationScope<'_>, &[Value]) -> FactoryResult<MemberMap>>;

/// A named declaration function contributing one level of a class
#[derive(Clone, Default)]
pub struct Declaration {
    name: Option<String>,
    body: Option<DeclarationBody>,
}

impl Declaration {
    /// Create a named declaration
    pub fn new<F>(name: &str, body: F) -> Self
    where
        F: Fn(&DeclarationScope<'_>, &[Value]) -> FactoryResult<MemberMap> + 'static,
    {
        Self::named(name).body(body)
    }

    /// Create a named declaration without a body yet
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            body: None,
        }
    }

    /// Create a declaration without a name
    pub fn anonymous<F>(body: F) -> Self
    where
        F: Fn(&DeclarationScope<'_>, &[Value]) -> FactoryResult<MemberMap> + 'static,
    {
        Self::default().body(body)
    }

    /// Set the body
    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&DeclarationScope<'_>, &[Value]) -> FactoryResult<MemberMap> + 'static,
    {
        self.body = Some(Rc::new(body));
        self
    }

    /// Declared name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Check if a body was supplied
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Validate the declaration and return its name and body
    fn validate(self) -> FactoryResult<(String, DeclarationBody)> {
        let body = self.body.ok_or(FactoryError::MissingConstructor)?;
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => return Err(FactoryError::MissingConstructorName),
        };
        if name.contains('.') {
            return Err(FactoryError::InvalidArgument(format!(
                "class name '{}' must not contain '.'",
                name
            )));
        }
        Ok((name, body))
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("name", &self.name)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Type metadata of a class
#[derive(Clone)]
pub struct TypeInfo {
    name: String,
    namespace: String,
    base: Option<ClassDescriptor>,
    registry: NamespaceRegistry,
}

impl TypeInfo {
    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the base class (None for a root class)
    pub fn base_name(&self) -> Option<&str> {
        self.base.as_ref().map(|base| base.type_info().name())
    }

    /// Dotted namespace the class lives in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Base class (None for a root class)
    pub fn base(&self) -> Option<&ClassDescriptor> {
        self.base.as_ref()
    }

    /// `namespace.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Node of the class namespace, created on demand
    pub fn namespace_object(&self) -> FactoryResult<NamespaceNode> {
        self.registry.resolve(&self.namespace)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("base_name", &self.base_name())
            .field("namespace", &self.namespace)
            .finish()
    }
}

struct ClassInner {
    info: TypeInfo,
    body: DeclarationBody,
    shared: Rc<Shared>,
}

/// Handle to a declared class
///
/// Cloning shares the class. Equality is identity.
#[derive(Clone)]
pub struct ClassDescriptor(Rc<ClassInner>);

/// Non-owning class handle
#[derive(Clone)]
pub struct WeakClass(Weak<ClassInner>);

impl WeakClass {
    /// Get the class back if it is still alive
    pub fn upgrade(&self) -> Option<ClassDescriptor> {
        self.0.upgrade().map(ClassDescriptor)
    }
}

impl ClassDescriptor {
    /// Derive a class that inherits this class's namespace
    pub fn extend(&self, declaration: Declaration) -> FactoryResult<ClassDescriptor> {
        compose(&self.0.shared, Some(self), declaration, None)
    }

    /// Derive a class in an explicit namespace
    ///
    /// An empty namespace inherits the base namespace.
    pub fn extend_in(
        &self,
        declaration: Declaration,
        namespace: &str,
    ) -> FactoryResult<ClassDescriptor> {
        compose(&self.0.shared, Some(self), declaration, Some(namespace))
    }

    /// Construct a composed instance
    pub fn instantiate(&self, args: &[Value]) -> FactoryResult<Instance> {
        let instance = Instance::allocate(self.clone(), args.to_vec(), self.0.shared.tracker());

        for level in self.lineage() {
            let scope = DeclarationScope::new(&instance, &level);
            let members = (level.0.body)(&scope, args)?;
            for (name, member) in members {
                instance.install(level.type_info().name(), name, member);
            }
        }

        instance.context().initialize()?;

        tracing::debug!(
            class = %self.0.info.qualified_name(),
            instance = instance.id().as_u64(),
            members = instance.member_names().len(),
            "composed instance"
        );
        Ok(instance)
    }

    /// Type metadata
    pub fn type_info(&self) -> &TypeInfo {
        &self.0.info
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.0.info.name
    }

    /// Base class (None for a root class)
    pub fn base(&self) -> Option<&ClassDescriptor> {
        self.0.info.base.as_ref()
    }

    /// All classes of the chain, root first, ending with this one
    pub fn lineage(&self) -> Vec<ClassDescriptor> {
        let mut chain = vec![self.clone()];
        let mut current = self.base();
        while let Some(class) = current {
            chain.push(class.clone());
            current = class.base();
        }
        chain.reverse();
        chain
    }

    /// Check if `other` is a proper ancestor of this class
    pub fn is_subclass_of(&self, other: &ClassDescriptor) -> bool {
        let mut current = self.base();
        while let Some(class) = current {
            if class == other {
                return true;
            }
            current = class.base();
        }
        false
    }

    /// Non-owning handle
    pub fn downgrade(&self) -> WeakClass {
        WeakClass(Rc::downgrade(&self.0))
    }
}

impl PartialEq for ClassDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassDescriptor {}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassDescriptor")
            .field(&self.0.info.qualified_name())
            .finish()
    }
}

/// Compose a new class from a base and a declaration
pub(crate) fn compose(
    shared: &Rc<Shared>,
    base: Option<&ClassDescriptor>,
    declaration: Declaration,
    namespace: Option<&str>,
) -> FactoryResult<ClassDescriptor> {
    let (name, body) = declaration.validate()?;

    let namespace = match namespace.filter(|ns| !ns.is_empty()) {
        Some(ns) => {
            split_path(ns)?;
            ns.to_string()
        }
        None => match base {
            Some(base) => base.type_info().namespace().to_string(),
            None => shared.config().root_namespace.clone(),
        },
    };

    let class = ClassDescriptor(Rc::new(ClassInner {
        info: TypeInfo {
            name,
            namespace,
            base: base.cloned(),
            registry: shared.registry().clone(),
        },
        body,
        shared: shared.clone(),
    }));

    let qualified = class.type_info().qualified_name();
    if shared.config().register_classes {
        shared.registry().define(&qualified, &class)?;
    }

    tracing::debug!(
        class = %qualified,
        base = class.type_info().base_name().unwrap_or("<root>"),
        "declared class"
    );
    Ok(class)
}
