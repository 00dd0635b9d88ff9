//! Error and status types shared by every store operation.

use crate::value::ValueType;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, StoreError>;

/// Every way a store operation can decline a request.
///
/// `KeyNotPresent` is informational (a warning): the request was
/// well-formed but named nothing. All other variants are errors.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StoreError {
    #[error("key not present")]
    KeyNotPresent,

    #[error("internal invariant violated: no empty slot after growth")]
    Fatal,

    #[error("allocation failed")]
    OutOfMemory,

    #[error("key already exists: {0:?}")]
    KeyExists(String),

    #[error("index out of bounds: {index} >= {capacity}")]
    OutOfBounds { index: i64, capacity: usize },

    #[error("invalid type: entry holds {found}, requested {expected}")]
    InvalidType { expected: ValueType, found: ValueType },
}

/// Severity class of a non-success outcome.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl StoreError {
    pub fn severity(&self) -> Severity {
        match self {
            StoreError::KeyNotPresent => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity() == Severity::Warning
    }

    pub fn is_error(&self) -> bool {
        self.severity() == Severity::Error
    }

    /// Status this error corresponds to.
    pub fn status(&self) -> Status {
        match self {
            StoreError::KeyNotPresent => Status::KeyNotPresent,
            StoreError::Fatal => Status::Fatal,
            StoreError::OutOfMemory => Status::OutOfMemory,
            StoreError::KeyExists(_) => Status::KeyExists,
            StoreError::OutOfBounds { .. } => Status::OutOfBounds,
            StoreError::InvalidType { .. } => Status::InvalidType,
        }
    }
}

/// Flat status code for callers that classify outcomes rather than match
/// on them. Obtain one from any operation result with `Status::of`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    Success,
    KeyNotPresent,
    Fatal,
    OutOfMemory,
    KeyExists,
    OutOfBounds,
    InvalidType,
}

impl Status {
    pub fn of<T>(res: &Result<T>) -> Status {
        match res {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }

    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    pub fn is_warning(self) -> bool {
        self == Status::KeyNotPresent
    }

    pub fn is_error(self) -> bool {
        !self.is_success() && !self.is_warning()
    }

    /// Numeric code: zero for success, positive for warnings, negative
    /// for errors.
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::KeyNotPresent => 2,
            Status::Fatal => -1,
            Status::OutOfMemory => -2,
            Status::KeyExists => -3,
            Status::OutOfBounds => -4,
            Status::InvalidType => -5,
        }
    }
}

impl<T> From<&Result<T>> for Status {
    fn from(res: &Result<T>) -> Self {
        Status::of(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_exclusive() {
        let all = [
            Status::Success,
            Status::KeyNotPresent,
            Status::Fatal,
            Status::OutOfMemory,
            Status::KeyExists,
            Status::OutOfBounds,
            Status::InvalidType,
        ];
        for s in all {
            let n = [s.is_success(), s.is_warning(), s.is_error()]
                .iter()
                .filter(|b| **b)
                .count();
            assert_eq!(n, 1, "{:?} must fall in exactly one class", s);
            assert_eq!(s.code() == 0, s.is_success());
            assert_eq!(s.code() > 0, s.is_warning());
            assert_eq!(s.code() < 0, s.is_error());
        }
    }

    #[test]
    fn status_of_result() {
        let ok: Result<u8> = Ok(1);
        assert!(Status::of(&ok).is_success());

        let warn: Result<u8> = Err(StoreError::KeyNotPresent);
        assert!(Status::from(&warn).is_warning());
        assert!(warn.unwrap_err().is_warning());

        let err: Result<u8> = Err(StoreError::OutOfBounds {
            index: -1,
            capacity: 10,
        });
        assert_eq!(Status::of(&err), Status::OutOfBounds);
        assert!(err.unwrap_err().is_error());
    }

    #[test]
    fn messages_carry_context() {
        let e = StoreError::InvalidType {
            expected: ValueType::Int64,
            found: ValueType::Int32,
        };
        assert_eq!(e.to_string(), "invalid type: entry holds int32, requested int64");
        let e = StoreError::OutOfBounds {
            index: 12,
            capacity: 10,
        };
        assert_eq!(e.to_string(), "index out of bounds: 12 >= 10");
    }
}
