use std::mem;

pub mod booleans;
pub mod handles;
pub mod strings;

use crate::{BooleanObject, HandleObject, StringObject, ValueTag};

#[rustfmt::skip]
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Boolean = 0b000001,
    String  = 0b000010,
    Handle  = 0b000011,
}

impl ObjectType {
    pub const ALL: [ObjectType; 3] =
        [ObjectType::Boolean, ObjectType::String, ObjectType::Handle];

    #[inline]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b000001 => Some(ObjectType::Boolean),
            0b000010 => Some(ObjectType::String),
            0b000011 => Some(ObjectType::Handle),
            _ => None,
        }
    }
}

/// The 8-byte header at the start of every heap object.
///
/// ```text
/// byte 0:    [tag:2 = 0b11] [object_type:6]
/// bytes 1‥3: reserved (zero)
/// bytes 4‥7: data payload
/// ```
#[repr(C)]
#[derive(Debug)]
pub struct Header {
    ty: u8,
    _reserved: [u8; 3],
    pub data: u32,
}

const _: () = assert!(mem::size_of::<Header>() == 8);

impl Header {
    pub const TAG_MASK: u8 = 0b11;
    pub const TYPE_SHIFT: u8 = 2;

    #[inline]
    pub fn new(ty: ObjectType) -> Self {
        Self::with_data(ty, 0)
    }

    #[inline]
    pub fn with_data(ty: ObjectType, data: u32) -> Self {
        Header {
            ty: ((ty as u8) << Self::TYPE_SHIFT) | ValueTag::Header as u8,
            _reserved: [0; 3],
            data,
        }
    }

    #[inline]
    pub fn is_header(&self) -> bool {
        self.ty & Self::TAG_MASK == ValueTag::Header as u8
    }

    /// `None` if this word is not a valid header.
    #[inline]
    pub fn object_type(&self) -> Option<ObjectType> {
        if !self.is_header() {
            return None;
        }
        ObjectType::from_bits(self.ty >> Self::TYPE_SHIFT)
    }
}

pub trait HeapObject: Sized {
    const TYPE: ObjectType;

    fn header(&self) -> &Header {
        // SAFETY: every heap object is repr(C) and starts with a header
        unsafe { mem::transmute::<&Self, &Header>(self) }
    }

    /// Bytes this object occupies in the heap, before rounding. `None` if
    /// the size overflows.
    fn heap_size(&self) -> Option<usize> {
        Some(mem::size_of::<Self>())
    }
}

/// Any heap object, seen through its header only.
#[repr(C)]
#[derive(Debug)]
pub struct HeapValue {
    pub header: Header,
}

/// A [`HeapValue`] resolved to its concrete layout.
#[derive(Debug)]
pub enum ObjectView<'a> {
    Boolean(&'a BooleanObject),
    String(&'a StringObject),
    Handle(&'a HandleObject),
}

#[derive(Debug)]
pub enum ObjectViewMut<'a> {
    Boolean(&'a mut BooleanObject),
    String(&'a mut StringObject),
    Handle(&'a mut HandleObject),
}

impl HeapValue {
    #[inline]
    pub fn object_type(&self) -> Option<ObjectType> {
        self.header.object_type()
    }

    /// `None` if the header is corrupt.
    pub fn view(&self) -> Option<ObjectView<'_>> {
        let this = self as *const HeapValue;
        // SAFETY: the header type decides the layout, objects are never
        // retagged
        let view = unsafe {
            match self.object_type()? {
                ObjectType::Boolean => ObjectView::Boolean(&*this.cast()),
                ObjectType::String => ObjectView::String(&*this.cast()),
                ObjectType::Handle => ObjectView::Handle(&*this.cast()),
            }
        };
        Some(view)
    }

    pub fn view_mut(&mut self) -> Option<ObjectViewMut<'_>> {
        let this = self as *mut HeapValue;
        // SAFETY: same as `view`
        let view = unsafe {
            match self.object_type()? {
                ObjectType::Boolean => {
                    ObjectViewMut::Boolean(&mut *this.cast())
                }
                ObjectType::String => {
                    ObjectViewMut::String(&mut *this.cast())
                }
                ObjectType::Handle => {
                    ObjectViewMut::Handle(&mut *this.cast())
                }
            }
        };
        Some(view)
    }

    /// Size of the fixed fields, known from the header alone.
    pub fn fixed_size(&self) -> Option<usize> {
        Some(match self.object_type()? {
            ObjectType::Boolean => mem::size_of::<BooleanObject>(),
            ObjectType::String => mem::size_of::<StringObject>(),
            ObjectType::Handle => mem::size_of::<HandleObject>(),
        })
    }

    /// `None` for a corrupt header or a size that overflows.
    /// Reads the fixed fields, see [`HeapValue::fixed_size`].
    pub fn heap_size(&self) -> Option<usize> {
        match self.view()? {
            ObjectView::Boolean(b) => b.heap_size(),
            ObjectView::String(s) => s.heap_size(),
            ObjectView::Handle(h) => h.heap_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_object_type_round_trip() {
        for ty in ObjectType::ALL {
            let h = Header::new(ty);
            assert!(h.is_header());
            assert_eq!(h.object_type(), Some(ty));
        }
    }

    #[test]
    fn header_reads_as_header_tagged_value() {
        let hdr = Header::with_data(ObjectType::String, 7);
        // SAFETY: Header is 8 bytes, repr(C)
        let raw = unsafe {
            ((&hdr) as *const Header).cast::<u64>().read_unaligned()
        };
        let v = crate::Value::from_raw(raw);
        assert!(v.is_header());
        assert!(!v.is_fixnum());
        assert!(!v.is_object());
        assert_eq!(hdr.data, 7);
    }

    #[test]
    fn zeroed_word_is_not_a_header() {
        // SAFETY: all-zero is a valid bit pattern for every field
        let hdr: Header = unsafe { mem::zeroed() };
        assert!(!hdr.is_header());
        assert_eq!(hdr.object_type(), None);
    }
}
