//! Model binding
//!
//! Projects a plain data record onto a container: every leaf field becomes a
//! typed property whose kind is detected from the field value, and every
//! nested record becomes a nested container bound recursively.

use crate::container::Container;
use crate::kind::{KindDetector, ValueKind};
use crate::value::{Record, Value};
use crate::{FactoryError, FactoryResult};
use serde::{Deserialize, Serialize};

/// How bound properties relate to the source model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingMode {
    /// Properties alias the model's sequences and records
    #[default]
    ByReference,
    /// Properties hold deep copies; mutating them never reaches the model
    ByValue,
}

/// Binder options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    /// Copy or alias nested values
    pub mode: BindingMode,
    /// Skip fields whose name is already taken on the target (with a
    /// warning) instead of failing with `PropertyExists`
    pub skip_existing: bool,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            mode: BindingMode::ByReference,
            skip_existing: true,
        }
    }
}

impl BindingOptions {
    /// Options with the given mode and default skipping
    pub fn with_mode(mode: BindingMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Binds data records as typed properties
#[derive(Clone)]
pub struct ObservableBinder {
    options: BindingOptions,
    detector: KindDetector,
}

impl ObservableBinder {
    /// Create a binder using the built-in kind classification
    pub fn new(options: BindingOptions) -> Self {
        Self {
            options,
            detector: ValueKind::detector(),
        }
    }

    /// Replace the kind classification
    pub fn with_detector(mut self, detector: KindDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Binder options
    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    /// Bind every field of `model` onto `target`
    ///
    /// Returns the number of properties defined, nested ones included. A null
    /// model binds nothing; any other non-record model is rejected.
    pub fn bind(&self, model: &Value, target: &Container) -> FactoryResult<usize> {
        let record = match model {
            Value::Null => return Ok(0),
            Value::Record(record) => record,
            other => {
                return Err(FactoryError::type_mismatch(
                    ValueKind::Object,
                    other.type_name(),
                ))
            }
        };

        let mut ancestors = vec![record.clone()];
        let count = self.bind_record(record, target, &mut ancestors)?;
        tracing::debug!(
            container = %target.path(),
            properties = count,
            mode = ?self.options.mode,
            "bound model"
        );
        Ok(count)
    }

    fn bind_record(
        &self,
        source: &Record,
        target: &Container,
        ancestors: &mut Vec<Record>,
    ) -> FactoryResult<usize> {
        let mut count = 0;

        for (name, value) in source.entries() {
            if target.has(&name) && self.options.skip_existing {
                tracing::warn!(container = %target.path(), field = %name, "field already exists, skipped");
                continue;
            }

            if let Value::Record(nested) = &value {
                if ancestors.iter().any(|seen| seen.ptr_eq(nested)) {
                    return Err(FactoryError::InvalidArgument(format!(
                        "model field '{}' refers back to an enclosing record",
                        name
                    )));
                }
                let container = target.define_container(&name)?;
                ancestors.push(nested.clone());
                count += self.bind_record(nested, &container, ancestors)?;
                ancestors.pop();
                continue;
            }

            let kind = (self.detector)(&value).unwrap_or(ValueKind::Object);
            let value = match self.options.mode {
                BindingMode::ByReference => value,
                BindingMode::ByValue => value.deep_copy(),
            };
            target.define_property(&name, kind, Some(value))?;
            count += 1;
        }

        Ok(count)
    }
}

impl Default for ObservableBinder {
    fn default() -> Self {
        Self::new(BindingOptions::default())
    }
}

impl std::fmt::Debug for ObservableBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservableBinder")
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;
    use std::rc::Rc;

    fn person() -> Value {
        Value::from(serde_json::json!({
            "name": "Ada",
            "age": 36,
            "active": true,
            "tags": ["math", "engines"],
            "address": { "city": "London", "zip": null }
        }))
    }

    #[test]
    fn test_binds_detected_kinds() {
        let target = Container::new();
        let count = ObservableBinder::default().bind(&person(), &target).unwrap();

        assert_eq!(count, 6);
        assert_eq!(target.property("name").unwrap().kind(), ValueKind::Text);
        assert_eq!(target.property("age").unwrap().kind(), ValueKind::Number);
        assert_eq!(target.property("active").unwrap().kind(), ValueKind::Boolean);
        assert_eq!(target.property("tags").unwrap().kind(), ValueKind::Sequence);
        assert_eq!(
            target.property_at("address.city").unwrap().get(),
            Value::from("London")
        );
        assert_eq!(
            target.property_at("address.zip").unwrap().kind(),
            ValueKind::Object
        );
    }

    #[test]
    fn test_date_field() {
        let model = Record::new();
        let when = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        model.insert("born", Value::from(when));

        let target = Container::new();
        ObservableBinder::default()
            .bind(&Value::Record(model), &target)
            .unwrap();
        assert_eq!(target.property("born").unwrap().kind(), ValueKind::Date);
    }

    #[test]
    fn test_by_reference_aliases() {
        let model = person();
        let target = Container::new();
        ObservableBinder::default().bind(&model, &target).unwrap();

        let tags = target.property("tags").unwrap().get();
        tags.as_sequence().unwrap().push(Value::from("poetry"));

        let original = model.as_record().unwrap().get("tags").unwrap();
        assert_eq!(original.as_sequence().unwrap().len(), 3);
    }

    #[test]
    fn test_by_value_isolates() {
        let model = person();
        let target = Container::new();
        ObservableBinder::new(BindingOptions::with_mode(BindingMode::ByValue))
            .bind(&model, &target)
            .unwrap();

        let tags = target.property("tags").unwrap().get();
        tags.as_sequence().unwrap().push(Value::from("poetry"));

        let original = model.as_record().unwrap().get("tags").unwrap();
        assert_eq!(original.as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_existing_names() {
        let target = Container::new();
        target
            .define_property("name", ValueKind::Text, Some(Value::from("kept")))
            .unwrap();

        let count = ObservableBinder::default().bind(&person(), &target).unwrap();
        assert_eq!(count, 5);
        assert_eq!(target.property("name").unwrap().get(), Value::from("kept"));

        let strict = ObservableBinder::new(BindingOptions {
            skip_existing: false,
            ..BindingOptions::default()
        });
        let model = Value::from(serde_json::json!({ "name": "Ada" }));
        assert_eq!(
            strict.bind(&model, &target).unwrap_err(),
            FactoryError::PropertyExists("name".to_string())
        );
    }

    #[test]
    fn test_custom_detector() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let detector: KindDetector = Rc::new(move |value: &Value| {
            counter.set(counter.get() + 1);
            ValueKind::of(value)
        });

        let target = Container::new();
        ObservableBinder::default()
            .with_detector(detector)
            .bind(&Value::from(serde_json::json!({ "n": 1, "s": "x" })), &target)
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(target.property("n").unwrap().kind(), ValueKind::Number);
    }

    #[test]
    fn test_rejects_non_record_model() {
        let target = Container::new();
        assert!(matches!(
            ObservableBinder::default().bind(&Value::from(3), &target),
            Err(FactoryError::InvalidArgumentType { .. })
        ));
        assert_eq!(ObservableBinder::default().bind(&Value::Null, &target), Ok(0));
    }

    #[test]
    fn test_cyclic_model() {
        let model = Record::new();
        model.insert("me", Value::Record(model.clone()));

        let result = ObservableBinder::default().bind(&Value::Record(model.clone()), &Container::new());
        assert!(matches!(result, Err(FactoryError::InvalidArgument(_))));

        // break the cycle so the record is freed
        model.remove("me");
    }
}
