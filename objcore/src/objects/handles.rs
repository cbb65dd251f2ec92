use crate::{
    Header, HeapObject, ObjectType, RuntimeError, TypeId, Value, is_type,
    untag_as,
};

/// Indirection to another value that can be expired in bulk.
///
/// Once `object` is [`Value::EMPTY`] the handle stays expired forever.
/// The handle does not keep its target alive.
#[repr(C)]
#[derive(Debug)]
pub struct HandleObject {
    pub header: Header,
    object: Value,
}

impl HandleObject {
    pub fn init(&mut self, object: Value) {
        self.header = Header::new(ObjectType::Handle);
        self.object = object;
    }

    /// Raw field, [`Value::EMPTY`] once expired.
    #[inline]
    pub fn object(&self) -> Value {
        self.object
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.object.is_empty()
    }

    #[inline]
    pub fn expire(&mut self) {
        self.object = Value::EMPTY;
    }
}

impl HeapObject for HandleObject {
    const TYPE: ObjectType = ObjectType::Handle;
}

/// The value a handle names, or `HandleExpired` if it was swept.
pub fn dereference(handle: Value) -> Result<Value, RuntimeError> {
    let tagged = untag_as::<HandleObject>(handle)?;
    // SAFETY: type checked, nothing allocates here
    let object = unsafe { tagged.as_ref() }.object();
    if object.is_empty() {
        return Err(RuntimeError::HandleExpired { handle });
    }
    Ok(object)
}

#[inline]
pub fn is_handle(value: Value) -> bool {
    is_type(TypeId::Handle, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Allocator, ErrorKind, Heap, HeapCreateInfo};

    #[test]
    fn dereference_returns_wrapped_value_until_expired() {
        let mut heap = Heap::new(HeapCreateInfo::default());
        let s = heap.allocate_str("resource").expect("string");
        let h = heap.make_handle(s.as_value()).expect("handle");

        assert!(is_handle(h.as_value()));
        assert!(!is_handle(s.as_value()));
        assert_eq!(dereference(h.as_value()), Ok(s.as_value()));

        // SAFETY: nothing allocates while the reference lives
        unsafe { h.as_mut() }.expire();

        for _ in 0..3 {
            let err = dereference(h.as_value()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::HandleExpired);
            assert_eq!(err.value(), Some(h.as_value()));
        }
    }

    #[test]
    fn handles_to_fixnums_and_zero_are_live() {
        let mut heap = Heap::new(HeapCreateInfo::default());
        for n in [0, 1, -1] {
            let h = heap.make_handle(Value::from_i64(n)).expect("handle");
            assert_eq!(dereference(h.as_value()), Ok(Value::from_i64(n)));
        }
    }

    #[test]
    fn dereference_type_checks_first() {
        let err = dereference(Value::from_i64(9)).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TypeMismatch {
                expected: TypeId::Handle,
                got: Value::from_i64(9)
            }
        );
    }
}
