//! Dynamic value representation
//!
//! Values flowing through members, properties and events are dynamically
//! typed. Scalars are stored inline; sequences and records are shared,
//! interior-mutable containers, so cloning a [`Value`] aliases them the way
//! objects are aliased in a dynamic language. Use [`Value::deep_copy`] to
//! obtain a structurally independent value.
//!
//! # Variants
//!
//! ```text
//! Null       absent value (no semantic kind)
//! Bool       boolean
//! Number     IEEE 754 double
//! Text       UTF-8 string
//! Date       UTC timestamp
//! Sequence   shared ordered list
//! Record     shared ordered key/value map
//! Function   native callable
//! Instance   composed class instance
//! ```

use crate::instance::Instance;
use crate::{FactoryError, FactoryResult};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Dynamic value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number (always f64)
    Number(f64),
    /// Text
    Text(String),
    /// Date
    Date(DateTime<Utc>),
    /// Shared sequence
    Sequence(Sequence),
    /// Shared record (plain structured object)
    Record(Record),
    /// Native callable
    Function(NativeFunction),
    /// Composed instance
    Instance(Instance),
}

impl Value {
    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this is a plain record
    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Get the boolean value if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the number if this is a Number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the text if this is Text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the date if this is a Date
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get the sequence if this is a Sequence
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get the record if this is a Record
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Get the function if this is a Function
    pub fn as_function(&self) -> Option<&NativeFunction> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get the instance if this is an Instance
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    /// Get the type name (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Date(_) => "date",
            Value::Sequence(_) => "sequence",
            Value::Record(_) => "object",
            Value::Function(_) => "callable",
            Value::Instance(_) => "instance",
        }
    }

    /// Copy only the top-level container
    ///
    /// Nested sequences and records remain shared with the original.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Sequence(s) => Value::Sequence(Sequence::new(s.to_vec())),
            Value::Record(r) => Value::Record(Record::from_entries(r.entries())),
            other => other.clone(),
        }
    }

    /// Copy sequences and records recursively
    ///
    /// Functions and instances are shared, everything else is copied. Shared
    /// and cyclic structure is reproduced in the copy: every source sequence
    /// or record is copied once.
    pub fn deep_copy(&self) -> Value {
        self.deep_copy_with(&mut FxHashMap::default())
    }

    fn deep_copy_with(&self, copies: &mut FxHashMap<usize, Value>) -> Value {
        match self {
            Value::Sequence(s) => {
                if let Some(copy) = copies.get(&s.addr()) {
                    return copy.clone();
                }
                let copy = Sequence::new(Vec::with_capacity(s.len()));
                copies.insert(s.addr(), Value::Sequence(copy.clone()));
                for element in s.to_vec() {
                    copy.push(element.deep_copy_with(copies));
                }
                Value::Sequence(copy)
            }
            Value::Record(r) => {
                if let Some(copy) = copies.get(&r.addr()) {
                    return copy.clone();
                }
                let copy = Record::new();
                copies.insert(r.addr(), Value::Record(copy.clone()));
                for (key, value) in r.entries() {
                    copy.insert(key, value.deep_copy_with(copies));
                }
                Value::Record(copy)
            }
            other => other.clone(),
        }
    }

    /// Convert to a JSON value
    ///
    /// Dates become RFC 3339 text; functions and instances become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null | Value::Function(_) | Value::Instance(_) => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.to_rfc3339()),
            Value::Sequence(s) => {
                serde_json::Value::Array(s.to_vec().iter().map(Value::to_json).collect())
            }
            Value::Record(r) => serde_json::Value::Object(
                r.entries()
                    .into_iter()
                    .map(|(k, v)| (k, v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl PartialEq for Value {
    /// Scalars, sequences and records compare by content;
    /// functions and instances compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a.ptr_eq(b) || a.to_vec() == b.to_vec(),
            (Value::Record(a), Value::Record(b)) => a.ptr_eq(b) || a.entries() == b.entries(),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Date(d) => write!(f, "{}", d.to_rfc3339()),
            Value::Sequence(s) => write!(f, "[sequence; {}]", s.len()),
            Value::Record(r) => write!(f, "[object; {}]", r.len()),
            Value::Function(func) => write!(f, "[function {}]", func.name().unwrap_or("<anonymous>")),
            Value::Instance(i) => write!(f, "[instance {}]", i.class().type_info().qualified_name()),
        }
    }
}

/// Shared, ordered list of values
#[derive(Debug, Clone, Default)]
pub struct Sequence(Rc<RefCell<Vec<Value>>>);

impl Sequence {
    /// Create a sequence from elements
    pub fn new(elements: Vec<Value>) -> Self {
        Sequence(Rc::new(RefCell::new(elements)))
    }

    /// Get sequence length
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Check if sequence is empty
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Get element at index
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Set element at index
    pub fn set(&self, index: usize, value: Value) -> FactoryResult<()> {
        let mut elements = self.0.borrow_mut();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(FactoryError::IndexOutOfBounds(index)),
        }
    }

    /// Append an element
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Copy the elements out
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Check whether both handles refer to the same sequence
    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Shared, insertion-ordered key/value map
#[derive(Debug, Clone, Default)]
pub struct Record(Rc<RefCell<IndexMap<String, Value>>>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from entries, keeping their order
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Record(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Insert a field, returning the previous value
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    /// Get a field
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    /// Remove a field, keeping the order of the rest
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    /// Check if a field exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Field names in insertion order
    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Check if the record has no fields
    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Check whether both handles refer to the same record
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Native function body
pub type NativeFn = dyn Fn(&[Value]) -> FactoryResult<Value>;

/// Callable value with an optional name
#[derive(Clone)]
pub struct NativeFunction {
    name: Option<Rc<str>>,
    body: Rc<NativeFn>,
}

impl NativeFunction {
    /// Create an anonymous function
    pub fn new<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> FactoryResult<Value> + 'static,
    {
        Self {
            name: None,
            body: Rc::new(body),
        }
    }

    /// Create a named function
    pub fn named<F>(name: &str, body: F) -> Self
    where
        F: Fn(&[Value]) -> FactoryResult<Value> + 'static,
    {
        Self {
            name: Some(Rc::from(name)),
            body: Rc::new(body),
        }
    }

    /// Function name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> FactoryResult<Value> {
        (self.body)(args)
    }

    /// Check whether both handles refer to the same function
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::Sequence(Sequence::new(elements))
    }
}

impl From<Sequence> for Value {
    fn from(s: Sequence) -> Self {
        Value::Sequence(s)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(f)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(Sequence::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Record(Record::from_entries(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}
