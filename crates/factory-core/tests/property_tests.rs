//! Integration tests for typed properties on composed instances
//!
//! Tests cover:
//! - Read/write through `Instance::call`
//! - Kind enforcement without partial mutation
//! - Change notification ordering
//! - Revert and duplicate definitions

use factory_core::{Declaration, FactoryError, Instance, MemberMap, Runtime, Value, ValueKind};
use std::cell::RefCell;
use std::rc::Rc;

fn pet(runtime: &Runtime) -> Instance {
    runtime
        .base_object()
        .extend(Declaration::new("Pet", |scope, _| {
            scope.define_property("age", ValueKind::Number, Some(Value::from(5)))?;
            scope.define_property("nickname", ValueKind::Text, None)?;
            Ok(MemberMap::new())
        }))
        .unwrap()
        .instantiate(&[])
        .unwrap()
}

#[test]
fn test_initial_value() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    assert_eq!(pet.call("age", &[]).unwrap(), Value::from(5));
    assert!(pet.call("nickname", &[]).unwrap().is_null());
}

#[test]
fn test_age_old_stays_five() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    let err = pet.call("age", &[Value::from("old")]).unwrap_err();
    assert!(matches!(err, FactoryError::InvalidArgumentType { .. }));
    assert_eq!(err.to_string(), "Expected: number, but got: text.");
    assert_eq!(pet.call("age", &[]).unwrap(), Value::from(5));
}

#[test]
fn test_write_returns_new_value() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    assert_eq!(pet.call("age", &[Value::from(6)]).unwrap(), Value::from(6));
    assert_eq!(pet.call("age", &[]).unwrap(), Value::from(6));
}

#[test]
fn test_too_many_arguments() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    let result = pet.call("age", &[Value::from(1), Value::from(2)]);
    assert!(matches!(result, Err(FactoryError::InvalidArgument(_))));
    assert_eq!(pet.call("age", &[]).unwrap(), Value::from(5));
}

#[test]
fn test_change_notification_sees_new_value() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    let log = Rc::new(RefCell::new(Vec::new()));

    let age = pet.property("age").unwrap();
    let reader = pet.clone();
    let seen = log.clone();
    age.on_changed(move |old, new| {
        let current = reader.call("age", &[])?;
        seen.borrow_mut().push((old.clone(), new.clone(), current));
        Ok(())
    });

    pet.call("age", &[Value::from(7)]).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![(Value::from(5), Value::from(7), Value::from(7))]
    );
}

#[test]
fn test_rejected_write_does_not_notify() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    let notified = Rc::new(RefCell::new(0));

    let counter = notified.clone();
    pet.events()
        .channel("ageChanged")
        .unwrap()
        .subscribe(move |_| {
            *counter.borrow_mut() += 1;
            Ok(())
        });

    assert!(pet.call("age", &[Value::from(true)]).is_err());
    assert_eq!(*notified.borrow(), 0);
}

#[test]
fn test_revert_restores_without_notifying() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    let notified = Rc::new(RefCell::new(0));

    let age = pet.property("age").unwrap();
    age.set(Value::from(9)).unwrap();

    let counter = notified.clone();
    age.on_changed(move |_, _| {
        *counter.borrow_mut() += 1;
        Ok(())
    });

    assert_eq!(age.revert().unwrap(), Value::from(5));
    assert_eq!(pet.call("age", &[]).unwrap(), Value::from(5));
    assert_eq!(*notified.borrow(), 0);
}

#[test]
fn test_duplicate_property_on_instance() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    assert_eq!(
        pet.define_property("age", ValueKind::Number, None).unwrap_err(),
        FactoryError::PropertyExists("age".to_string())
    );
    assert_eq!(
        pet.define_property("dispose", ValueKind::Callable, None).unwrap_err(),
        FactoryError::PropertyExists("dispose".to_string())
    );
}

#[test]
fn test_duplicate_property_across_levels_aborts_construction() {
    let runtime = Runtime::new().unwrap();
    let base = runtime
        .base_object()
        .extend(Declaration::new("Base", |scope, _| {
            scope.define_property("size", ValueKind::Number, Some(Value::from(1)))?;
            Ok(MemberMap::new())
        }))
        .unwrap();
    let derived = base
        .extend(Declaration::new("Derived", |scope, _| {
            scope.define_property("size", ValueKind::Number, Some(Value::from(2)))?;
            Ok(MemberMap::new())
        }))
        .unwrap();

    assert_eq!(
        derived.instantiate(&[]).unwrap_err(),
        FactoryError::PropertyExists("size".to_string())
    );
}

#[test]
fn test_initial_kind_mismatch_on_instance() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);

    let result = pet.define_property("born", ValueKind::Date, Some(Value::from("yesterday")));
    assert!(matches!(result, Err(FactoryError::InvalidArgumentType { .. })));
    assert!(!pet.has_member("born"));
}

#[test]
fn test_snapshot() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    pet.call("nickname", &[Value::from("Rex")]).unwrap();

    let snapshot = Value::Record(pet.snapshot());
    assert_eq!(
        snapshot.to_json(),
        serde_json::json!({ "age": 5.0, "nickname": "Rex" })
    );
}

#[test]
fn test_calling_a_container_fails() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    pet.root().define_container("owner").unwrap();

    assert!(matches!(
        pet.call("owner", &[]),
        Err(FactoryError::InvalidOperation(_))
    ));
}

#[test]
fn test_failing_change_handler_does_not_fail_the_write() {
    let runtime = Runtime::new().unwrap();
    let pet = pet(&runtime);
    let age = pet.property("age").unwrap();
    let later = Rc::new(RefCell::new(Vec::new()));

    age.on_changed(|_, _| Err(FactoryError::InvalidOperation("veto".to_string())));
    let seen = later.clone();
    age.on_changed(move |old, new| {
        seen.borrow_mut().push((old.clone(), new.clone()));
        Ok(())
    });

    assert_eq!(pet.call("age", &[Value::from(6)]).unwrap(), Value::from(6));
    assert_eq!(age.get(), Value::from(6));
    assert_eq!(*later.borrow(), vec![(Value::from(5), Value::from(6))]);
}
