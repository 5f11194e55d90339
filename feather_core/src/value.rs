//! Typed values crossing the native engine boundary.
//!
//! [`Value`] owns its payload; [`ValueRef`] borrows it for binding
//! without copies. The [`ToValue`]/[`FromValue`] traits convert between
//! Rust primitives and engine values when binding parameters and decoding
//! columns.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An owned SQL value in one of SQLite's five storage classes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Integer(i) => ValueRef::Integer(*i),
            Value::Real(r) => ValueRef::Real(*r),
            Value::Text(t) => ValueRef::Text(t),
            Value::Blob(b) => ValueRef::Blob(b),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The storage class name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(t) => write!(f, "'{t}'"),
            Value::Blob(b) => write!(f, "<{} byte blob>", b.len()),
        }
    }
}

/// A borrowed SQL value, used on the bind path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ValueRef<'a> {
    Null,
    Integer(i64),
    Real(f64),
    Text(&'a str),
    Blob(&'a [u8]),
}

impl ValueRef<'_> {
    pub fn to_owned_value(self) -> Value {
        match self {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(t.to_string()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// Conversion of a Rust value into a SQL value for binding.
pub trait ToValue {
    fn to_value_ref(&self) -> ValueRef<'_>;

    fn to_value(&self) -> Value {
        self.to_value_ref().to_owned_value()
    }
}

impl ToValue for Value {
    fn to_value_ref(&self) -> ValueRef<'_> {
        self.as_ref()
    }
}

impl ToValue for bool {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(*self as i64)
    }
}

impl ToValue for i32 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(i64::from(*self))
    }
}

impl ToValue for i64 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Integer(*self)
    }
}

impl ToValue for f64 {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Real(*self)
    }
}

impl ToValue for str {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Text(self)
    }
}

impl ToValue for &str {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Text(self)
    }
}

impl ToValue for String {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Text(self)
    }
}

impl ToValue for Vec<u8> {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Blob(self)
    }
}

impl ToValue for &[u8] {
    fn to_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Blob(self)
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value_ref(&self) -> ValueRef<'_> {
        match self {
            Some(value) => value.to_value_ref(),
            None => ValueRef::Null,
        }
    }
}

/// Conversion of a decoded SQL value into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T> {
    Err(Error::DecodeMismatch {
        expected: expected.to_string(),
        found: value.type_name().to_string(),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i != 0),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i.try_into().map_err(|_| Error::DecodeMismatch {
                expected: "INTEGER within i32 range".to_string(),
                found: format!("INTEGER {i}"),
            }),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Real(r) => Ok(r),
            Value::Integer(i) => Ok(i as f64),
            other => mismatch("REAL", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(t) => Ok(t),
            other => mismatch("TEXT", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(b) => Ok(b),
            other => mismatch("BLOB", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_round_trip() {
        let some: Option<i64> = Some(7);
        assert_eq!(some.to_value(), Value::Integer(7));
        let none: Option<i64> = None;
        assert_eq!(none.to_value(), Value::Null);
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<i64>::from_value(Value::Integer(7)).unwrap(),
            Some(7)
        );
    }

    #[test]
    fn mismatches_name_both_sides() {
        let err = String::from_value(Value::Integer(1)).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("TEXT"), "{text}");
        assert!(text.contains("INTEGER"), "{text}");
    }

    #[test]
    fn integer_narrowing_is_checked() {
        assert!(i32::from_value(Value::Integer(i64::MAX)).is_err());
        assert_eq!(i32::from_value(Value::Integer(41)).unwrap(), 41);
    }
}
