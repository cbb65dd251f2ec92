//! Value: any raw word, fixnum/reference/header
//!
//! Tagged<T>: same bits as Value but typed. Only handed out by the allocator
//! and by [`crate::untag_as`], so the tag is known to match the header.
use std::{fmt, marker::PhantomData, ptr::NonNull};

use crate::{HeapObject, HeapValue};

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueTag {
    Fixnum = 0b0,
    Reference = 0b01,
    Header = 0b11,
}

const FIXNUM_MASK: u64 = 0b1;
pub const OBJECT_TAG_MASK: u64 = 0b11;

pub const FIXNUM_MIN: i64 = -(1 << 62);
pub const FIXNUM_MAX: i64 = (1 << 62) - 1;

/// A tagged 64-bit value.
///
/// Encoding:
/// - **Fixnum**:    `...XXXXX0`: 63-bit signed integer.
/// - **Reference**: `...XXXX01`: heap pointer, 8-byte aligned.
/// - **Header**:    `...XXXX11`: only valid as the first word of a heap
///   object, except for [`Value::EMPTY`].
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Value(u64);

/// A decoded [`Value`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Fixnum(i64),
    Object(NonNull<HeapValue>),
    Empty,
}

impl Value {
    /// The expired-handle sentinel. A bare header tag, so no fixnum and no
    /// object reference can ever compare equal to it.
    pub const EMPTY: Value = Value(ValueTag::Header as u64);

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn from_i64(n: i64) -> Self {
        debug_assert!(
            (FIXNUM_MIN..=FIXNUM_MAX).contains(&n),
            "fixnum overflow: {n}"
        );
        Self(n.cast_unsigned() << 1)
    }

    #[inline]
    pub fn from_usize(n: usize) -> Self {
        Self::from_i64(n as i64)
    }

    #[inline]
    pub const fn is_fixnum(self) -> bool {
        self.0 & FIXNUM_MASK == ValueTag::Fixnum as u64
    }

    #[inline]
    pub const fn is_object(self) -> bool {
        self.0 & OBJECT_TAG_MASK == ValueTag::Reference as u64
    }

    #[inline]
    pub const fn is_header(self) -> bool {
        self.0 & OBJECT_TAG_MASK == ValueTag::Header as u64
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    /// Fixnum payload, `None` for anything else.
    #[inline]
    pub fn as_fixnum(self) -> Option<i64> {
        self.is_fixnum().then(|| self.0.cast_signed() >> 1)
    }

    pub fn decode(self) -> ValueKind {
        if let Some(n) = self.as_fixnum() {
            return ValueKind::Fixnum(n);
        }
        if self.is_object() {
            if let Some(ptr) = NonNull::new(untag(self).cast::<HeapValue>()) {
                return ValueKind::Object(ptr);
            }
        }
        ValueKind::Empty
    }
}

/// Combine an object address with the reference tag.
#[inline]
pub fn tag_object<T>(ptr: *mut T) -> Value {
    let addr = ptr as u64;
    debug_assert_eq!(
        addr & OBJECT_TAG_MASK,
        0,
        "pointer must be aligned so low 2 bits are free"
    );
    Value(addr | ValueTag::Reference as u64)
}

/// Strip the tag. Performs no validation at all.
#[inline]
pub fn untag(value: Value) -> *mut u8 {
    (value.0 & !OBJECT_TAG_MASK) as *mut u8
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            ValueKind::Fixnum(n) => write!(f, "Fixnum({n})"),
            ValueKind::Object(ptr) => write!(f, "Ref({:p})", ptr.as_ptr()),
            ValueKind::Empty if self.is_empty() => write!(f, "Empty"),
            ValueKind::Empty => write!(f, "Header(0x{:016x})", self.0),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from_i64(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::from_usize(value)
    }
}

/// A value known to reference a live `T`.
pub struct Tagged<T: HeapObject> {
    value: Value,
    _marker: PhantomData<*mut T>,
}

// we need custom clone implementation as default considers "owning" T
// but this represents a pointer to a T, not T itself
impl<T: HeapObject> Clone for Tagged<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: HeapObject> Copy for Tagged<T> {}

impl<T: HeapObject> PartialEq for Tagged<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: HeapObject> fmt::Debug for Tagged<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tagged<{:?}>({:?})", T::TYPE, self.value)
    }
}

impl<T: HeapObject> Tagged<T> {
    /// # Safety
    /// `ptr` must point to an initialized `T` inside a heap
    #[inline]
    pub unsafe fn from_ptr(ptr: *mut T) -> Self {
        Self {
            value: tag_object(ptr),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_value(self) -> Value {
        self.value
    }

    #[inline]
    pub fn as_ptr(self) -> *mut T {
        untag(self.value).cast()
    }

    /// Get a reference to a T
    /// # Safety
    /// no allocation may happen while the reference is alive, an allocation
    /// can reclaim or move the object
    #[inline]
    pub unsafe fn as_ref<'a>(self) -> &'a T {
        // SAFETY: tag matched the header when this was created
        unsafe { &*self.as_ptr() }
    }

    /// Get a mutable reference to a T
    /// # Safety
    /// same as [`Tagged::as_ref`], and no other reference may exist
    #[inline]
    pub unsafe fn as_mut<'a>(self) -> &'a mut T {
        // SAFETY: tag matched the header when this was created
        unsafe { &mut *self.as_ptr() }
    }
}

impl<T: HeapObject> From<Tagged<T>> for Value {
    fn from(value: Tagged<T>) -> Self {
        value.as_value()
    }
}
