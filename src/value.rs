//! Scalar type tags and the tagged value stored in each entry.

use crate::error::StoreError;
use core::fmt;

/// The five scalar kinds an entry can hold.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ValueType {
    Int32,
    Int64,
    Float,
    Double,
    String,
}

impl ValueType {
    pub const ALL: [ValueType; 5] = [
        ValueType::Int32,
        ValueType::Int64,
        ValueType::Float,
        ValueType::Double,
        ValueType::String,
    ];

    /// Stable numeric tag, `0..=4` in declaration order.
    pub fn code(self) -> i32 {
        match self {
            ValueType::Int32 => 0,
            ValueType::Int64 => 1,
            ValueType::Float => 2,
            ValueType::Double => 3,
            ValueType::String => 4,
        }
    }

    /// Initial value of a freshly added entry of this type. Strings start
    /// unset; numbers start at zero.
    pub(crate) fn initial_value(self) -> Value {
        match self {
            ValueType::Int32 => Value::Int32(0),
            ValueType::Int64 => Value::Int64(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::Double => Value::Double(0.0),
            ValueType::String => Value::String(None),
        }
    }
}

impl TryFrom<i32> for ValueType {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        ValueType::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(code)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::String => "string",
        })
    }
}

/// A stored value. The variant is the entry's type; it is fixed when the
/// entry is added and setters refuse to change it.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    /// `None` until the first `set_string`.
    String(Option<String>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
        }
    }

    /// Copy of this value whose string payload (if any) is freshly
    /// allocated, reporting allocation failure instead of aborting.
    pub(crate) fn try_clone(&self) -> Result<Value, StoreError> {
        Ok(match self {
            Value::String(Some(s)) => Value::String(Some(try_copy_str(s)?)),
            Value::String(None) => Value::String(None),
            Value::Int32(v) => Value::Int32(*v),
            Value::Int64(v) => Value::Int64(*v),
            Value::Float(v) => Value::Float(*v),
            Value::Double(v) => Value::Double(*v),
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(Some(s)) => f.write_str(s),
            Value::String(None) => f.write_str("<unset>"),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(Some(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Some(v))
    }
}

/// Owned copy of `s` using a fallible reservation.
pub(crate) fn try_copy_str(s: &str) -> Result<String, StoreError> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| StoreError::OutOfMemory)?;
    out.push_str(s);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_and_reject_unknown() {
        for t in ValueType::ALL {
            assert_eq!(ValueType::try_from(t.code()), Ok(t));
        }
        assert_eq!(ValueType::try_from(5), Err(5));
        assert_eq!(ValueType::try_from(-1), Err(-1));
    }

    #[test]
    fn initial_value_matches_type() {
        for t in ValueType::ALL {
            assert_eq!(t.initial_value().value_type(), t);
        }
        assert_eq!(ValueType::String.initial_value(), Value::String(None));
    }

    #[test]
    fn try_clone_copies_string_payload() {
        let v = Value::from("Hello, World!");
        let c = v.try_clone().unwrap();
        assert_eq!(v, c);
        match (&v, &c) {
            (Value::String(Some(a)), Value::String(Some(b))) => {
                assert_ne!(a.as_ptr(), b.as_ptr(), "payload must not be shared")
            }
            other => panic!("unexpected values: {:?}", other),
        }
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Int32(42).to_string(), "42");
        assert_eq!(Value::String(None).to_string(), "<unset>");
        assert_eq!(ValueType::Double.to_string(), "double");
    }
}
