//! Built-in classes
//!
//! Every runtime declares these in its root namespace:
//!
//! - `BaseObject`: root class with no-op `init` and `dispose`
//! - `Observable(model, name)`: binds `model` onto the instance and exposes
//!   `model()`, `name()` and `dispose()`
//! - `DataBinder`: keeps named `Observable` models in protected state

use crate::binder::{BindingMode, BindingOptions, ObservableBinder};
use crate::class::{compose, ClassDescriptor, Declaration};
use crate::kind::ValueKind;
use crate::member::{Call, MemberMap};
use crate::runtime::Shared;
use crate::value::{Record, Value};
use crate::{FactoryError, FactoryResult};
use std::rc::Rc;

/// Name of the built-in root class
pub const BASE_OBJECT: &str = "BaseObject";

/// Name of the built-in observable model class
pub const OBSERVABLE: &str = "Observable";

/// Name of the built-in model manager class
pub const DATA_BINDER: &str = "DataBinder";

/// Protected key holding a data binder's models
const MODELS: &str = "models";

pub(crate) fn declare_base_object(shared: &Rc<Shared>) -> FactoryResult<ClassDescriptor> {
    let declaration = Declaration::new(BASE_OBJECT, |_, _| {
        Ok(MemberMap::new()
            .method("init", |_, _| Ok(Value::Null))
            .method("dispose", |_, _| Ok(Value::Null)))
    });
    compose(shared, None, declaration, None)
}

pub(crate) fn declare_observable(
    base: &ClassDescriptor,
    mode: BindingMode,
) -> FactoryResult<ClassDescriptor> {
    let binder = ObservableBinder::new(BindingOptions::with_mode(mode));

    base.extend(Declaration::new(OBSERVABLE, move |scope, args| {
        let model = args.first().cloned().unwrap_or_default();
        let name = args.get(1).cloned().unwrap_or_default();

        binder.bind(&model, scope.root())?;

        Ok(MemberMap::new()
            .method("dispose", |call, _| call.base())
            .method("model", move |_, _| Ok(model.clone()))
            .method("name", move |_, _| Ok(name.clone())))
    }))
}

pub(crate) fn declare_data_binder(
    base: &ClassDescriptor,
    observable: &ClassDescriptor,
) -> FactoryResult<ClassDescriptor> {
    let observable = observable.clone();

    base.extend(Declaration::new(DATA_BINDER, move |scope, _| {
        scope.protected().set(MODELS, Value::Record(Record::new()));
        let observable = observable.clone();

        Ok(MemberMap::new()
            // Subclasses override this to attach their models.
            .method("bind", |_, _| Ok(Value::Null))
            .method("add_model", move |call, args| {
                let name = model_name(args)?;
                remove_model(call, &name)?;

                let model = args.get(1).cloned().unwrap_or_default();
                let instance = observable.instantiate(&[model, Value::from(name.as_str())])?;
                models(call)?.insert(name, Value::Instance(instance.clone()));
                Ok(Value::Instance(instance))
            })
            .method("remove_model", |call, args| {
                let name = model_name(args)?;
                remove_model(call, &name)
            })
            .method("model", |call, args| {
                let name = model_name(args)?;
                Ok(models(call)?.get(&name).unwrap_or_default())
            }))
    }))
}

fn models(call: &Call<'_>) -> FactoryResult<Record> {
    call.protected()
        .get(MODELS)
        .and_then(|value| value.as_record().cloned())
        .ok_or_else(|| {
            FactoryError::InvalidOperation("data binder models are not initialized.".to_string())
        })
}

fn model_name(args: &[Value]) -> FactoryResult<String> {
    match args.first() {
        Some(Value::Text(name)) => Ok(name.clone()),
        Some(other) => Err(FactoryError::type_mismatch(ValueKind::Text, other.type_name())),
        None => Err(FactoryError::type_mismatch(ValueKind::Text, "null")),
    }
}

/// Remove and dispose a model, returning it (or null)
fn remove_model(call: &Call<'_>, name: &str) -> FactoryResult<Value> {
    match models(call)?.remove(name) {
        Some(Value::Instance(previous)) => {
            previous.dispose()?;
            tracing::debug!(model = name, "removed model");
            Ok(Value::Instance(previous))
        }
        Some(other) => Ok(other),
        None => Ok(Value::Null),
    }
}
