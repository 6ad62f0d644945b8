//! Runtime
//!
//! A runtime owns everything classes share: the namespace registry, the
//! lifecycle tracker and the configuration. Runtimes are independent of each
//! other, so tests can build a fresh one per case.

use crate::builtins;
use crate::class::{compose, ClassDescriptor, Declaration};
use crate::config::RuntimeConfig;
use crate::lifecycle::LifecycleTracker;
use crate::namespace::{NamespaceNode, NamespaceRegistry};
use crate::{FactoryError, FactoryResult};
use std::fmt;
use std::rc::Rc;

/// State shared by every class of one runtime
pub(crate) struct Shared {
    registry: NamespaceRegistry,
    tracker: Rc<LifecycleTracker>,
    config: RuntimeConfig,
}

impl Shared {
    pub(crate) fn registry(&self) -> &NamespaceRegistry {
        &self.registry
    }

    pub(crate) fn tracker(&self) -> Rc<LifecycleTracker> {
        self.tracker.clone()
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

/// Class-composition runtime
pub struct Runtime {
    shared: Rc<Shared>,
    base_object: ClassDescriptor,
    observable: ClassDescriptor,
    data_binder: ClassDescriptor,
}

impl Runtime {
    /// Create a runtime with the default configuration
    pub fn new() -> FactoryResult<Self> {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with its own registry
    pub fn with_config(config: RuntimeConfig) -> FactoryResult<Self> {
        Self::with_registry(NamespaceRegistry::new(), config)
    }

    /// Create a runtime declaring its classes into an existing registry
    pub fn with_registry(registry: NamespaceRegistry, config: RuntimeConfig) -> FactoryResult<Self> {
        config
            .validate()
            .map_err(|e| FactoryError::InvalidArgument(e.to_string()))?;

        let shared = Rc::new(Shared {
            registry,
            tracker: Rc::new(LifecycleTracker::new()),
            config,
        });

        let base_object = builtins::declare_base_object(&shared)?;
        let observable = builtins::declare_observable(&base_object, shared.config().binding)?;
        let data_binder = builtins::declare_data_binder(&base_object, &observable)?;

        tracing::debug!(
            root_namespace = %shared.config().root_namespace,
            binding = ?shared.config().binding,
            "runtime ready"
        );

        Ok(Self {
            shared,
            base_object,
            observable,
            data_binder,
        })
    }

    /// Declare a class without a base
    pub fn define_root_class(&self, declaration: Declaration) -> FactoryResult<ClassDescriptor> {
        compose(&self.shared, None, declaration, None)
    }

    /// Resolve a namespace path, creating missing nodes
    pub fn namespace(&self, path: &str) -> FactoryResult<NamespaceNode> {
        self.shared.registry.resolve(path)
    }

    /// Namespace registry
    pub fn registry(&self) -> &NamespaceRegistry {
        &self.shared.registry
    }

    /// Lifecycle tracker
    pub fn tracker(&self) -> &LifecycleTracker {
        &self.shared.tracker
    }

    /// Configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    /// Built-in root class with no-op `init` and `dispose`
    pub fn base_object(&self) -> &ClassDescriptor {
        &self.base_object
    }

    /// Built-in class projecting a model as observable properties
    pub fn observable(&self) -> &ClassDescriptor {
        &self.observable
    }

    /// Built-in class managing named observable models
    pub fn data_binder(&self) -> &ClassDescriptor {
        &self.data_binder
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.shared.config)
            .field("tracked", &self.shared.tracker.len())
            .finish()
    }
}
