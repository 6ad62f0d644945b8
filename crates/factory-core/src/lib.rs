//! Factory Core Runtime
//!
//! This crate provides a dynamic class-composition runtime including:
//! - Class declaration at run time with single inheritance
//! - Method override with explicit base-method delegation
//! - Per-instance protected state shared only across hierarchy levels
//! - Typed property accessors with change notification
//! - Publish/subscribe event channels
//! - A hierarchical namespace registry for qualified class names
//! - Model binding and instance lifecycle flags
//!
//! # Example
//!
//! ```rust,ignore
//! use factory_core::{Declaration, MemberMap, Runtime, Value};
//!
//! let runtime = Runtime::new()?;
//! let animal = runtime.base_object().extend(Declaration::new("Animal", |_, _| {
//!     Ok(MemberMap::new().method("speak", |_, _| Ok(Value::from("base"))))
//! }))?;
//! let dog = animal.extend(Declaration::new("Dog", |_, _| {
//!     Ok(MemberMap::new().method("speak", |call, _| {
//!         let base = call.base()?;
//!         Ok(Value::from(format!("{}-dog", base.as_text().unwrap_or_default())))
//!     }))
//! }))?;
//!
//! assert_eq!(dog.instantiate(&[])?.call("speak", &[])?, Value::from("base-dog"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod binder;
pub mod builtins;
pub mod class;
pub mod config;
pub mod container;
pub mod context;
pub mod event;
pub mod instance;
pub mod kind;
pub mod lifecycle;
pub mod member;
pub mod namespace;
pub mod property;
pub mod runtime;
pub mod value;

pub use binder::{BindingMode, BindingOptions, ObservableBinder};
pub use class::{ClassDescriptor, Declaration, DeclarationBody, TypeInfo, WeakClass};
pub use config::{ConfigError, RuntimeConfig};
pub use container::{Container, Slot};
pub use context::{DeclarationScope, InstanceId, ProtectedState};
pub use event::{EventChannel, EventTable};
pub use instance::Instance;
pub use kind::{KindDetector, ValueKind};
pub use lifecycle::{LifecycleState, LifecycleTracker, TrackedHandle};
pub use member::{Call, ComposedMember, Member, MemberMap};
pub use namespace::{NamespaceNode, NamespaceRegistry};
pub use property::{changed_event_name, PropertyAccessor};
pub use runtime::Runtime;
pub use value::{NativeFunction, Record, Sequence, Value};

/// Runtime errors
///
/// Every condition is raised synchronously at the call site that detects it
/// and is never recovered internally.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FactoryError {
    /// A value did not have the expected semantic kind
    #[error("Expected: {expected}, but got: {actual}.")]
    InvalidArgumentType {
        /// Expected kind name
        expected: String,
        /// Actual kind name
        actual: String,
    },

    /// An argument was malformed (empty namespace path, wrong arity, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A declaration was supplied without a body
    #[error("You must provide a named constructor function.")]
    MissingConstructor,

    /// A declaration was supplied without a name
    #[error("Cannot use anonymous functions. You must provide a named function.")]
    MissingConstructorName,

    /// `base` was invoked on a member that overrides nothing
    #[error("No additional base methods to call for '{member}'. Do not call base in this case.")]
    NoBaseMethodToCall {
        /// Name of the member whose base was requested
        member: String,
    },

    /// A property (or any other slot) of that name already exists
    #[error("Property already exists: {0}.")]
    PropertyExists(String),

    /// No member, property or container of that name exists
    #[error("Unknown member: {0}")]
    UnknownMember(String),

    /// Index out of bounds
    #[error("Index was out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// The operation is not allowed in the current state
    #[error("An invalid operation was performed. {0}")]
    InvalidOperation(String),
}

impl FactoryError {
    /// Build an `InvalidArgumentType` from anything displayable
    pub fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        FactoryError::InvalidArgumentType {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Runtime result
pub type FactoryResult<T> = Result<T, FactoryError>;
