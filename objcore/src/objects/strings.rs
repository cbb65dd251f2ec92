use std::{cmp::Ordering, ffi::CString, mem, slice};

use crate::{Header, HeapObject, ObjectType, RuntimeError, Value, tag_object};

/// One UTF-16 code unit.
pub type Char = u16;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CachedHash {
    Uncomputed,
    Computed(i64),
}

/// Fixed-capacity string with inline character storage.
///
/// The characters follow the struct directly; the heap sizes the allocation
/// from `capacity`. Capacity never changes, growing makes a new object.
#[repr(C)]
#[derive(Debug)]
pub struct StringObject {
    pub header: Header,
    capacity: usize,
    hashcode: CachedHash,
    data: [Char; 0],
}

impl StringObject {
    /// Bytes needed for a string of `capacity` characters, before rounding.
    /// `None` if that does not fit a `usize`.
    #[inline]
    pub fn required_size(capacity: usize) -> Option<usize> {
        capacity
            .checked_mul(mem::size_of::<Char>())?
            .checked_add(mem::size_of::<Self>())
    }

    /// Set metadata. Characters are left as they are.
    /// # Safety
    /// the allocation must be at least `required_size(capacity)` bytes
    pub unsafe fn init(&mut self, capacity: usize) {
        self.header = Header::new(ObjectType::String);
        self.capacity = capacity;
        self.hashcode = CachedHash::Uncomputed;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn as_chars(&self) -> &[Char] {
        // SAFETY: allocated with room for `capacity` chars
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.capacity) }
    }

    /// Mutable access to the characters. Drops the cached hash.
    #[inline]
    pub fn as_chars_mut(&mut self) -> &mut [Char] {
        self.hashcode = CachedHash::Uncomputed;
        let len = self.capacity;
        // SAFETY: allocated with room for `capacity` chars
        unsafe { slice::from_raw_parts_mut(self.data.as_mut_ptr(), len) }
    }

    #[inline]
    pub fn char_at(&self, index: usize) -> Option<Char> {
        self.as_chars().get(index).copied()
    }

    /// # Safety
    /// `index < capacity`, the caller does the bounds check
    #[inline]
    pub unsafe fn char_at_unchecked(&self, index: usize) -> Char {
        debug_assert!(index < self.capacity);
        // SAFETY: by contract
        unsafe { *self.data.as_ptr().add(index) }
    }

    /// # Safety
    /// `index < capacity`, the caller does the bounds check
    #[inline]
    pub unsafe fn set_char_at_unchecked(&mut self, index: usize, ch: Char) {
        debug_assert!(index < self.capacity);
        self.hashcode = CachedHash::Uncomputed;
        // SAFETY: by contract
        unsafe { *self.data.as_mut_ptr().add(index) = ch };
    }

    pub fn fill(&mut self, ch: Char) {
        self.as_chars_mut().fill(ch);
    }

    #[inline]
    pub fn hashcode(&self) -> CachedHash {
        self.hashcode
    }

    /// Hash of the contents, computed on first use and cached.
    pub fn compute_hash(&mut self) -> i64 {
        if let CachedHash::Computed(hash) = self.hashcode {
            return hash;
        }
        let hash = hash_chars(self.as_chars());
        self.hashcode = CachedHash::Computed(hash);
        hash
    }

    /// Lexicographic by code unit, a proper prefix sorts first.
    #[inline]
    pub fn compare(&self, other: &StringObject) -> Ordering {
        self.as_chars().cmp(other.as_chars())
    }

    /// First position at or after `start` where `needle` occurs.
    pub fn index_of(&self, needle: &[Char], start: usize) -> Option<usize> {
        let haystack = self.as_chars().get(start..)?;
        if needle.is_empty() {
            return Some(start);
        }
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|pos| pos + start)
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(self.as_chars())
    }

    /// UTF-8 encode for the OS boundary. An embedded NUL is an error, it
    /// would silently cut the string short on the other side.
    pub fn to_c_string(&self) -> Result<CString, RuntimeError> {
        if let Some(position) = self.as_chars().iter().position(|&c| c == 0) {
            return Err(RuntimeError::EmbeddedNul {
                string: self.as_value(),
                position,
            });
        }
        let utf8 = self.to_string_lossy();
        // no NUL in the UTF-16 input means none in the UTF-8 output
        CString::new(utf8).map_err(|err| RuntimeError::EmbeddedNul {
            string: self.as_value(),
            position: err.nul_position(),
        })
    }

    #[inline]
    fn as_value(&self) -> Value {
        tag_object(self as *const Self as *mut Self)
    }
}

/// `h = capacity; h = h * 31 + c` per character, folded into fixnum range.
pub fn hash_chars(chars: &[Char]) -> i64 {
    let mut hash = chars.len() as u64;
    for &ch in chars {
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(ch));
    }
    (hash.cast_signed() << 1) >> 1
}

impl HeapObject for StringObject {
    const TYPE: ObjectType = ObjectType::String;

    fn heap_size(&self) -> Option<usize> {
        Self::required_size(self.capacity)
    }
}
