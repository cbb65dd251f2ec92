use std::fmt;

use crate::{TypeId, Value};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeMismatch,
    HandleExpired,
    Range,
    EmbeddedNul,
    StackUnderflow,
    HeapExhausted,
    UnknownPrimitive,
}

/// Everything the object layer can fail with. Every variant aborts the
/// operation that raised it; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    TypeMismatch { expected: TypeId, got: Value },
    HandleExpired { handle: Value },
    RangeError { index: i64, length: usize },
    EmbeddedNul { string: Value, position: usize },
    StackUnderflow { needed: usize, depth: usize },
    HeapExhausted { requested: usize },
    UnknownPrimitive { name: String },
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            RuntimeError::HandleExpired { .. } => ErrorKind::HandleExpired,
            RuntimeError::RangeError { .. } => ErrorKind::Range,
            RuntimeError::EmbeddedNul { .. } => ErrorKind::EmbeddedNul,
            RuntimeError::StackUnderflow { .. } => ErrorKind::StackUnderflow,
            RuntimeError::HeapExhausted { .. } => ErrorKind::HeapExhausted,
            RuntimeError::UnknownPrimitive { .. } => {
                ErrorKind::UnknownPrimitive
            }
        }
    }

    /// The offending value, if the error carries one.
    pub fn value(&self) -> Option<Value> {
        match *self {
            RuntimeError::TypeMismatch { got, .. } => Some(got),
            RuntimeError::HandleExpired { handle } => Some(handle),
            RuntimeError::EmbeddedNul { string, .. } => Some(string),
            _ => None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected:?}, got {got:?}")
            }
            RuntimeError::HandleExpired { handle } => {
                write!(f, "handle expired: {handle:?}")
            }
            RuntimeError::RangeError { index, length } => {
                write!(f, "index {index} out of range for length {length}")
            }
            RuntimeError::EmbeddedNul { string, position } => write!(
                f,
                "string {string:?} has an embedded NUL at position {position}"
            ),
            RuntimeError::StackUnderflow { needed, depth } => write!(
                f,
                "stack underflow: needed {needed} values, have {depth}"
            ),
            RuntimeError::HeapExhausted { requested } => {
                write!(f, "heap exhausted allocating {requested} bytes")
            }
            RuntimeError::UnknownPrimitive { name } => {
                write!(f, "unknown primitive: {name}")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_value_follow_variant() {
        let handle = Value::from_i64(3);
        let err = RuntimeError::HandleExpired { handle };
        assert_eq!(err.kind(), ErrorKind::HandleExpired);
        assert_eq!(err.value(), Some(handle));

        let err = RuntimeError::HeapExhausted { requested: 64 };
        assert_eq!(err.kind(), ErrorKind::HeapExhausted);
        assert_eq!(err.value(), None);
        assert_eq!(err.to_string(), "heap exhausted allocating 64 bytes");
    }

    #[test]
    fn type_mismatch_display_names_both_sides() {
        let err = RuntimeError::TypeMismatch {
            expected: TypeId::String,
            got: Value::from_i64(5),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: expected String, got Fixnum(5)"
        );
    }
}
