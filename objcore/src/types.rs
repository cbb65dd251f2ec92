//! Type checking for tagged values.
//!
//! [`untag_as`] is the only way outside the allocator to turn a [`Value`] into
//! a typed pointer. Everything that dereferences an object goes through it.
use crate::{HeapObject, ObjectType, RuntimeError, Tagged, Value, ValueKind};

/// Dynamic type of a value as the language sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TypeId {
    Fixnum,
    Boolean,
    String,
    Handle,
    /// The expired-handle sentinel, or a corrupt header.
    Empty,
}

impl From<ObjectType> for TypeId {
    fn from(value: ObjectType) -> Self {
        match value {
            ObjectType::Boolean => TypeId::Boolean,
            ObjectType::String => TypeId::String,
            ObjectType::Handle => TypeId::Handle,
        }
    }
}

/// Dynamic type from the tag and, for references, the object header.
///
/// References are trusted to point at live objects: values only come out of
/// the heap, the stack or other objects.
pub fn type_of(value: Value) -> TypeId {
    match value.decode() {
        ValueKind::Fixnum(_) => TypeId::Fixnum,
        ValueKind::Object(ptr) => {
            // SAFETY: references always point at a header
            let object = unsafe { ptr.as_ref() };
            object.object_type().map_or(TypeId::Empty, TypeId::from)
        }
        ValueKind::Empty => TypeId::Empty,
    }
}

#[inline]
pub fn is_type(expected: TypeId, value: Value) -> bool {
    type_of(value) == expected
}

#[inline]
pub fn type_check(expected: TypeId, value: Value) -> Result<(), RuntimeError> {
    if is_type(expected, value) {
        Ok(())
    } else {
        Err(RuntimeError::TypeMismatch {
            expected,
            got: value,
        })
    }
}

/// [`type_check`] against `T::TYPE`, then untag.
#[inline]
pub fn untag_as<T: HeapObject>(
    value: Value,
) -> Result<Tagged<T>, RuntimeError> {
    type_check(T::TYPE.into(), value)?;
    // SAFETY: checked above
    Ok(unsafe { Tagged::from_ptr(crate::untag(value).cast()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Allocator, BooleanObject, HandleObject, Heap, HeapCreateInfo,
        StringObject,
    };

    const ALL: [TypeId; 5] = [
        TypeId::Fixnum,
        TypeId::Boolean,
        TypeId::String,
        TypeId::Handle,
        TypeId::Empty,
    ];

    fn sample_values(heap: &mut Heap) -> Vec<(TypeId, Value)> {
        let s = heap.make_string(3, 'x' as u16).expect("string");
        let h = heap.make_handle(s.as_value()).expect("handle");
        let b = heap.allocate_boolean(true).expect("boolean");
        vec![
            (TypeId::Fixnum, Value::from_i64(-12)),
            (TypeId::String, s.as_value()),
            (TypeId::Handle, h.as_value()),
            (TypeId::Boolean, b.as_value()),
            (TypeId::Empty, Value::EMPTY),
        ]
    }

    #[test]
    fn type_check_accepts_only_the_allocated_type() {
        let mut heap = Heap::new(HeapCreateInfo::default());
        for (ty, value) in sample_values(&mut heap) {
            assert!(type_check(ty, value).is_ok(), "{ty:?} on {value:?}");
            for other in ALL.into_iter().filter(|t| *t != ty) {
                let err = type_check(other, value).unwrap_err();
                assert_eq!(
                    err,
                    RuntimeError::TypeMismatch {
                        expected: other,
                        got: value
                    }
                );
                assert!(!is_type(other, value));
            }
        }
    }

    #[test]
    fn untag_as_returns_the_allocated_pointer() {
        let mut heap = Heap::new(HeapCreateInfo::default());
        let s = heap.make_string(2, 'a' as u16).expect("string");

        let again = untag_as::<StringObject>(s.as_value()).expect("string");
        assert_eq!(again.as_ptr(), s.as_ptr());

        assert!(untag_as::<HandleObject>(s.as_value()).is_err());
        assert!(untag_as::<BooleanObject>(Value::from_i64(1)).is_err());
        assert!(untag_as::<StringObject>(Value::EMPTY).is_err());
    }
}
