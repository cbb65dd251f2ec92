use crate::{Header, HeapObject, ObjectType};

/// The canonical `t` and `f` objects. The truth value lives in the header
/// payload.
#[repr(C)]
#[derive(Debug)]
pub struct BooleanObject {
    pub header: Header,
}

impl BooleanObject {
    pub fn init(&mut self, value: bool) {
        self.header = Header::with_data(ObjectType::Boolean, u32::from(value));
    }

    #[inline]
    pub fn value(&self) -> bool {
        self.header.data != 0
    }
}

impl HeapObject for BooleanObject {
    const TYPE: ObjectType = ObjectType::Boolean;
}
