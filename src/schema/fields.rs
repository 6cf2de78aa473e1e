//! Object field reader
//!
//! [`Fields`] is the structural step of the pipeline: it checks that a value
//! is an object, rejects keys outside the node's key list, and hands each
//! present value to a primitive or child parser. Presence rules (required,
//! optional, nullable) live here so every node applies them the same way.

use super::context::ValidationContext;
use super::primitives::describe;
use crate::domain::{FieldPath, ViolationCode};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A value that may be explicitly cleared with JSON `null`
#[derive(Debug, Clone, PartialEq)]
pub enum Nullable<T> {
    /// Replace with this value
    Value(T),
    /// Remove the current value
    Null,
}

impl<T> Nullable<T> {
    /// The carried value, `None` for an explicit null
    pub fn into_option(self) -> Option<T> {
        match self {
            Nullable::Value(value) => Some(value),
            Nullable::Null => None,
        }
    }
}

impl<T: Serialize> Serialize for Nullable<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Nullable::Value(value) => value.serialize(serializer),
            Nullable::Null => serializer.serialize_none(),
        }
    }
}

/// Read access to one JSON object node
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: FieldPath,
}

impl<'a> Fields<'a> {
    /// Opens `value` as an object whose keys must all appear in `allowed`
    ///
    /// Unknown keys are reported but do not stop the read, so the caller
    /// still sees violations in the known fields.
    pub fn open(
        value: &'a Value,
        path: &FieldPath,
        allowed: &[&str],
        cx: &mut ValidationContext,
    ) -> Option<Self> {
        let Some(map) = value.as_object() else {
            cx.report(
                path,
                ViolationCode::ExpectedObject,
                format!("expected an object, found {}", describe(value)),
            );
            return None;
        };

        for key in map.keys() {
            if !allowed.contains(&key.as_str()) {
                cx.report(
                    &path.key(key),
                    ViolationCode::UnknownKey,
                    format!("unknown field '{key}'"),
                );
            }
        }

        Some(Self {
            map,
            path: path.clone(),
        })
    }

    /// Path of this object
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// True if `key` is present (including as `null`)
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// True if `key` is present with a `null` value
    pub fn is_null(&self, key: &str) -> bool {
        matches!(self.map.get(key), Some(Value::Null))
    }

    /// The raw value under `key`
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    /// Parses a key that must be present and non-null
    pub fn required<T>(
        &self,
        cx: &mut ValidationContext,
        key: &str,
        parse: impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
    ) -> Option<T> {
        let path = self.path.key(key);
        match self.map.get(key) {
            None => {
                cx.report(&path, ViolationCode::MissingField, format!("'{key}' is required"));
                None
            }
            Some(Value::Null) => {
                cx.report(&path, ViolationCode::NullNotAllowed, format!("'{key}' cannot be null"));
                None
            }
            Some(value) => parse(value, &path, cx),
        }
    }

    /// Parses a key that may be absent but not null
    pub fn optional<T>(
        &self,
        cx: &mut ValidationContext,
        key: &str,
        parse: impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
    ) -> Option<T> {
        let path = self.path.key(key);
        match self.map.get(key) {
            None => None,
            Some(Value::Null) => {
                cx.report(&path, ViolationCode::NullNotAllowed, format!("'{key}' cannot be null"));
                None
            }
            Some(value) => parse(value, &path, cx),
        }
    }

    /// Parses a key that may be absent, null (clear), or a value
    pub fn nullable<T>(
        &self,
        cx: &mut ValidationContext,
        key: &str,
        parse: impl FnOnce(&Value, &FieldPath, &mut ValidationContext) -> Option<T>,
    ) -> Option<Nullable<T>> {
        match self.map.get(key) {
            None => None,
            Some(Value::Null) => Some(Nullable::Null),
            Some(value) => parse(value, &self.path.key(key), cx).map(Nullable::Value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::context::ValidationOptions;
    use crate::schema::primitives::{text, Text};
    use chrono::Utc;
    use serde_json::json;

    fn cx() -> ValidationContext {
        ValidationContext::new(ValidationOptions::default(), Utc::now())
    }

    #[test]
    fn test_open_rejects_non_object() {
        let mut cx = cx();
        let value = json!([1, 2]);
        assert!(Fields::open(&value, &FieldPath::root(), &[], &mut cx).is_none());
        let errors = cx.into_errors();
        assert!(errors.has_code(ViolationCode::ExpectedObject));
    }

    #[test]
    fn test_open_reports_every_unknown_key() {
        let mut cx = cx();
        let value = json!({"a": 1, "b": 2, "c": 3});
        let fields = Fields::open(&value, &FieldPath::root(), &["a"], &mut cx);
        assert!(fields.is_some());
        let errors = cx.into_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.at("b").count(), 1);
        assert_eq!(errors.at("c").count(), 1);
    }

    #[test]
    fn test_required_missing_and_null() {
        let mut cx = cx();
        let value = json!({"b": null});
        let fields = Fields::open(&value, &FieldPath::root(), &["a", "b"], &mut cx).unwrap();
        assert!(fields.required(&mut cx, "a", text(Text::new(1, 10))).is_none());
        assert!(fields.required(&mut cx, "b", text(Text::new(1, 10))).is_none());
        let errors = cx.into_errors();
        assert_eq!(errors.at("a").next().unwrap().code, ViolationCode::MissingField);
        assert_eq!(errors.at("b").next().unwrap().code, ViolationCode::NullNotAllowed);
    }

    #[test]
    fn test_nullable_distinguishes_null_from_absent() {
        let mut cx = cx();
        let value = json!({"provider": null});
        let fields =
            Fields::open(&value, &FieldPath::root(), &["provider", "other"], &mut cx).unwrap();
        assert_eq!(
            fields.nullable(&mut cx, "provider", text(Text::new(1, 10))),
            Some(Nullable::Null)
        );
        assert_eq!(fields.nullable(&mut cx, "other", text(Text::new(1, 10))), None);
        assert!(cx.into_errors().is_empty());
    }

    #[test]
    fn test_nullable_serializes_null() {
        let cleared: Nullable<String> = Nullable::Null;
        assert_eq!(serde_json::to_value(&cleared).unwrap(), Value::Null);
        let set = Nullable::Value("x".to_string());
        assert_eq!(serde_json::to_value(&set).unwrap(), json!("x"));
    }
}
