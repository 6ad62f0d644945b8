//! Integration tests for model binding
//!
//! Tests cover:
//! - Binding a model onto an instance under construction
//! - Nested containers and their own change channels
//! - Value isolation mode
//! - The built-in Observable and DataBinder classes

use factory_core::{
    BindingMode, BindingOptions, Declaration, FactoryError, MemberMap, ObservableBinder, Record,
    Runtime, RuntimeConfig, Sequence, Value, ValueKind,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

fn order_model() -> Value {
    Value::from(json!({
        "id": 42,
        "paid": false,
        "items": ["tea", "scones"],
        "customer": {
            "name": "Ada",
            "address": { "city": "London" }
        }
    }))
}

#[test]
fn test_bind_inside_declaration() {
    let runtime = Runtime::new().unwrap();
    let order = runtime
        .base_object()
        .extend(Declaration::new("Order", |scope, args| {
            let model = args.first().cloned().unwrap_or_default();
            ObservableBinder::default().bind(&model, scope.root())?;
            Ok(MemberMap::new())
        }))
        .unwrap()
        .instantiate(&[order_model()])
        .unwrap();

    assert_eq!(order.call("id", &[]).unwrap(), Value::from(42));
    assert_eq!(order.property("paid").unwrap().kind(), ValueKind::Boolean);
    assert_eq!(
        order.property_at("customer.address.city").unwrap().get(),
        Value::from("London")
    );
    assert_eq!(
        order.container("customer").unwrap().container("address").unwrap().path(),
        "customer.address"
    );
}

#[test]
fn test_nested_change_channel() {
    let runtime = Runtime::new().unwrap();
    let instance = runtime.base_object().instantiate(&[]).unwrap();
    ObservableBinder::default()
        .bind(&order_model(), instance.root())
        .unwrap();

    let customer = instance.container("customer").unwrap();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let seen = changes.clone();
    customer
        .events()
        .channel("nameChanged")
        .unwrap()
        .subscribe(move |args| {
            seen.borrow_mut().push(args.to_vec());
            Ok(())
        });

    customer.property("name").unwrap().set(Value::from("Grace")).unwrap();
    assert_eq!(
        *changes.borrow(),
        vec![vec![Value::from("Ada"), Value::from("Grace")]]
    );
    assert!(instance.events().channel("nameChanged").is_none());
}

#[test]
fn test_kind_enforced_on_bound_property() {
    let runtime = Runtime::new().unwrap();
    let instance = runtime.base_object().instantiate(&[]).unwrap();
    ObservableBinder::default()
        .bind(&order_model(), instance.root())
        .unwrap();

    assert!(matches!(
        instance.call("id", &[Value::from("forty-two")]),
        Err(FactoryError::InvalidArgumentType { .. })
    ));
    assert_eq!(instance.call("id", &[]).unwrap(), Value::from(42));
}

#[test]
fn test_by_value_mode_leaves_model_untouched() {
    let model = order_model();
    let runtime = Runtime::new().unwrap();
    let instance = runtime.base_object().instantiate(&[]).unwrap();
    ObservableBinder::new(BindingOptions::with_mode(BindingMode::ByValue))
        .bind(&model, instance.root())
        .unwrap();

    let items = instance.call("items", &[]).unwrap();
    items.as_sequence().unwrap().push(Value::from("jam"));

    let original = model.as_record().unwrap().get("items").unwrap();
    assert_eq!(original.as_sequence().unwrap().len(), 2);
}

#[test]
fn test_observable_uses_configured_mode() {
    let model = order_model();
    let runtime = Runtime::with_config(RuntimeConfig {
        binding: BindingMode::ByValue,
        ..RuntimeConfig::default()
    })
    .unwrap();

    let observable = runtime
        .observable()
        .instantiate(&[model.clone(), Value::from("order")])
        .unwrap();
    observable
        .call("items", &[])
        .unwrap()
        .as_sequence()
        .unwrap()
        .push(Value::from("jam"));

    let original = model.as_record().unwrap().get("items").unwrap();
    assert_eq!(original.as_sequence().unwrap().len(), 2);
    assert_eq!(observable.call("model", &[]).unwrap(), model);
}

#[test]
fn test_observable_skips_existing_members() {
    let runtime = Runtime::new().unwrap();
    let model = Value::from(json!({ "dispose": 1, "title": "Draft" }));
    let observable = runtime
        .observable()
        .instantiate(&[model, Value::from("doc")])
        .unwrap();

    assert!(observable.method("dispose").is_some());
    assert_eq!(observable.call("title", &[]).unwrap(), Value::from("Draft"));
}

#[test]
fn test_observable_subclass() {
    let runtime = Runtime::new().unwrap();
    let person = runtime
        .observable()
        .extend(Declaration::new("Person", |_, _| {
            Ok(MemberMap::new().method("describe", |call, _| {
                let name = call.this().call("first", &[])?;
                Ok(Value::from(format!(
                    "{} ({})",
                    name.as_text().unwrap_or_default(),
                    call.this().call("name", &[])?.as_text().unwrap_or_default()
                )))
            }))
        }))
        .unwrap();

    let ada = person
        .instantiate(&[Value::from(json!({ "first": "Ada" })), Value::from("person")])
        .unwrap();
    assert_eq!(ada.call("describe", &[]).unwrap(), Value::from("Ada (person)"));
    assert!(ada.is_a(runtime.observable()));
}

#[test]
fn test_data_binder_models() {
    let runtime = Runtime::new().unwrap();
    let binder = runtime.data_binder().instantiate(&[]).unwrap();

    assert!(binder.call("bind", &[]).unwrap().is_null());
    assert!(binder.call("model", &[Value::from("user")]).unwrap().is_null());

    let added = binder
        .call(
            "add_model",
            &[Value::from("user"), Value::from(json!({ "email": "ada@example.com" }))],
        )
        .unwrap();
    let user = added.as_instance().unwrap().clone();
    assert!(user.is_a(runtime.observable()));
    assert_eq!(user.call("name", &[]).unwrap(), Value::from("user"));
    assert_eq!(
        user.call("email", &[]).unwrap(),
        Value::from("ada@example.com")
    );
    assert_eq!(binder.call("model", &[Value::from("user")]).unwrap(), added);

    let removed = binder.call("remove_model", &[Value::from("user")]).unwrap();
    assert_eq!(removed, added);
    assert!(binder.call("model", &[Value::from("user")]).unwrap().is_null());
    assert!(binder.call("remove_model", &[Value::from("user")]).unwrap().is_null());
}

#[test]
fn test_data_binder_replaces_model() {
    let runtime = Runtime::new().unwrap();
    let replaced = Rc::new(RefCell::new(Vec::new()));

    let tracked = replaced.clone();
    let tracking_binder = runtime
        .data_binder()
        .extend(Declaration::new("TrackingBinder", move |_, _| {
            let tracked = tracked.clone();
            Ok(MemberMap::new().method("add_model", move |call, args| {
                if let Some(previous) = call
                    .this()
                    .call("model", &args[..1])?
                    .as_instance()
                {
                    tracked
                        .borrow_mut()
                        .push(previous.call("name", &[])?);
                }
                call.base()
            }))
        }))
        .unwrap()
        .instantiate(&[])
        .unwrap();

    let first = tracking_binder
        .call("add_model", &[Value::from("cart"), Value::from(json!({ "total": 1 }))])
        .unwrap();
    let second = tracking_binder
        .call("add_model", &[Value::from("cart"), Value::from(json!({ "total": 2 }))])
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(*replaced.borrow(), vec![Value::from("cart")]);
    assert_eq!(
        tracking_binder.call("model", &[Value::from("cart")]).unwrap(),
        second
    );
}

#[test]
fn test_data_binder_state_is_per_instance() {
    let runtime = Runtime::new().unwrap();
    let a = runtime.data_binder().instantiate(&[]).unwrap();
    let b = runtime.data_binder().instantiate(&[]).unwrap();

    a.call("add_model", &[Value::from("m"), Value::Record(Record::new())])
        .unwrap();
    assert!(!a.call("model", &[Value::from("m")]).unwrap().is_null());
    assert!(b.call("model", &[Value::from("m")]).unwrap().is_null());
}

#[test]
fn test_data_binder_requires_text_name() {
    let runtime = Runtime::new().unwrap();
    let binder = runtime.data_binder().instantiate(&[]).unwrap();

    assert!(matches!(
        binder.call("add_model", &[Value::from(1)]),
        Err(FactoryError::InvalidArgumentType { .. })
    ));
    assert!(matches!(
        binder.call("model", &[]),
        Err(FactoryError::InvalidArgumentType { .. })
    ));
}

#[test]
fn test_by_value_mode_copies_cyclic_sequences() {
    let tags = Sequence::new(vec![Value::from("draft")]);
    tags.push(Value::Sequence(tags.clone()));
    let model = Record::new();
    model.insert("tags", Value::Sequence(tags.clone()));
    let owner_items = Sequence::new(Vec::new());
    owner_items.push(Value::Record(model.clone()));
    model.insert(
        "owner",
        Value::from(Record::from_entries([("items", Value::Sequence(owner_items))])),
    );

    let runtime = Runtime::new().unwrap();
    let instance = runtime.base_object().instantiate(&[]).unwrap();
    let count = ObservableBinder::new(BindingOptions::with_mode(BindingMode::ByValue))
        .bind(&Value::Record(model.clone()), instance.root())
        .unwrap();
    assert_eq!(count, 2);

    let bound = instance.call("tags", &[]).unwrap();
    let copied = bound.as_sequence().unwrap();
    assert!(!copied.ptr_eq(&tags));
    assert!(copied.get(1).unwrap().as_sequence().unwrap().ptr_eq(copied));

    let items = instance.property_at("owner.items").unwrap().get();
    let enclosing = items.as_sequence().unwrap().get(0).unwrap();
    assert!(!enclosing.as_record().unwrap().ptr_eq(&model));
    assert_eq!(
        enclosing.as_record().unwrap().keys(),
        vec!["tags".to_string(), "owner".to_string()]
    );
}
