use std::{ffi::CStr, ptr::NonNull};

use crate::{
    BooleanObject, Char, HandleObject, HeapObject, ObjectType, RuntimeError,
    StringObject, Tagged, Value, untag_as,
};

/// Typed constructors on top of a raw object allocator.
///
/// Any call may move or reclaim objects once a collector is behind
/// `allot_object`: pointers must be re-derived from values afterwards.
pub trait Allocator: Sized {
    /// Zeroed, 8-byte aligned storage of at least `size` bytes with a
    /// header of type `ty` already written.
    fn allot_object(
        &mut self,
        ty: ObjectType,
        size: usize,
    ) -> Result<NonNull<u8>, RuntimeError>;

    /// Allocate a new object and return it as a typed value
    /// # Safety
    /// the caller must initialize the object before anything reads it
    unsafe fn allot_tagged<T: HeapObject>(
        &mut self,
        size: usize,
    ) -> Result<Tagged<T>, RuntimeError> {
        let raw = self.allot_object(T::TYPE, size)?;
        // SAFETY: header written, the rest is initialized by the caller
        Ok(unsafe { Tagged::from_ptr(raw.cast().as_ptr()) })
    }

    /// String with uninitialized (zeroed) characters.
    fn allocate_string(
        &mut self,
        capacity: usize,
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let size = StringObject::required_size(capacity).ok_or(
            RuntimeError::HeapExhausted {
                requested: usize::MAX,
            },
        )?;
        // SAFETY: initialized right below
        let string = unsafe { self.allot_tagged::<StringObject>(size)? };
        // SAFETY: allocated with `required_size(capacity)`
        unsafe { string.as_mut().init(capacity) };
        Ok(string)
    }

    fn make_string(
        &mut self,
        capacity: usize,
        fill: Char,
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let string = self.allocate_string(capacity)?;
        // SAFETY: no allocation while the reference lives
        unsafe { string.as_mut() }.fill(fill);
        Ok(string)
    }

    fn allocate_chars(
        &mut self,
        chars: &[Char],
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let string = self.allocate_string(chars.len())?;
        // SAFETY: no allocation while the reference lives
        unsafe { string.as_mut() }.as_chars_mut().copy_from_slice(chars);
        Ok(string)
    }

    fn allocate_str(
        &mut self,
        s: &str,
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let chars: Vec<Char> = s.encode_utf16().collect();
        self.allocate_chars(&chars)
    }

    /// Decode bytes from the OS. Invalid UTF-8 becomes U+FFFD.
    fn allocate_c_string(
        &mut self,
        c_string: &CStr,
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let s = c_string.to_string_lossy();
        self.allocate_str(&s)
    }

    /// Copy `string` into a new object of `capacity` characters and fill the
    /// rest with `fill`. The original is untouched and the hash is not
    /// carried over.
    fn grow_string(
        &mut self,
        string: Value,
        capacity: usize,
        fill: Char,
    ) -> Result<Tagged<StringObject>, RuntimeError> {
        let old_capacity = {
            // SAFETY: no allocation in this scope
            unsafe { untag_as::<StringObject>(string)?.as_ref() }.capacity()
        };
        if capacity < old_capacity {
            return Err(RuntimeError::RangeError {
                index: capacity as i64,
                length: old_capacity,
            });
        }

        let grown = self.allocate_string(capacity)?;

        // the allocation may have moved `string`, look it up again
        let old = untag_as::<StringObject>(string)?;
        // SAFETY: no allocation while the references live, distinct objects
        let (old, new) = unsafe { (old.as_ref(), grown.as_mut()) };
        let chars = new.as_chars_mut();
        chars[..old_capacity].copy_from_slice(old.as_chars());
        chars[old_capacity..].fill(fill);
        Ok(grown)
    }

    fn make_handle(
        &mut self,
        object: Value,
    ) -> Result<Tagged<HandleObject>, RuntimeError> {
        // SAFETY: initialized right below
        let handle = unsafe {
            self.allot_tagged::<HandleObject>(size_of::<HandleObject>())?
        };
        // SAFETY: no allocation while the reference lives
        unsafe { handle.as_mut() }.init(object);
        Ok(handle)
    }

    fn allocate_boolean(
        &mut self,
        value: bool,
    ) -> Result<Tagged<BooleanObject>, RuntimeError> {
        // SAFETY: initialized right below
        let boolean = unsafe {
            self.allot_tagged::<BooleanObject>(size_of::<BooleanObject>())?
        };
        // SAFETY: no allocation while the reference lives
        unsafe { boolean.as_mut() }.init(value);
        Ok(boolean)
    }
}
