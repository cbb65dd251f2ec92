use crate::{Allocator, RuntimeError, Value};

/// Objects every VM allocates up front.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SpecialObjects {
    pub t: Value,
    pub f: Value,
}

impl SpecialObjects {
    pub fn bootstrap(heap: &mut impl Allocator) -> Result<Self, RuntimeError> {
        let t = heap.allocate_boolean(true)?.as_value();
        let f = heap.allocate_boolean(false)?.as_value();
        Ok(Self { t, f })
    }

    #[inline]
    pub fn bool_value(&self, value: bool) -> Value {
        if value { self.t } else { self.f }
    }
}
