use crate::{
    Char, ExecutionState, Heap, HeapObject, RuntimeError, SpecialObjects,
    Tagged, TypeId, Value, type_check, untag_as,
};

mod environment;
mod handles;
mod strings;

pub type PrimitiveResult = Result<(), RuntimeError>;

pub type PrimitiveFunction = fn(&mut PrimitiveContext) -> PrimitiveResult;

#[derive(Debug, Copy, Clone)]
pub struct PrimitiveMessage<'a> {
    pub name: &'a str,
    pub inputs: usize,
    pub outputs: usize,
    pub ptr: PrimitiveFunction,
}

impl<'a> PrimitiveMessage<'a> {
    pub const fn new(
        name: &'a str,
        inputs: usize,
        outputs: usize,
        ptr: PrimitiveFunction,
    ) -> Self {
        Self {
            name,
            inputs,
            outputs,
            ptr,
        }
    }
}

pub struct PrimitiveContext<'ex> {
    pub state: &'ex mut ExecutionState,
    pub heap: &'ex mut Heap,
    pub specials: &'ex SpecialObjects,
}

impl PrimitiveContext<'_> {
    #[inline]
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.state.pop()
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.state.push(value);
    }

    #[inline]
    pub fn push_bool(&mut self, value: bool) {
        let value = self.specials.bool_value(value);
        self.state.push(value);
    }

    pub fn pop_fixnum(&mut self) -> Result<i64, RuntimeError> {
        let value = self.pop()?;
        type_check(TypeId::Fixnum, value)?;
        Ok(value.as_fixnum().unwrap_or_default())
    }

    /// Pops a fixnum that must lie in `0..=limit`.
    pub fn pop_index(&mut self, limit: usize) -> Result<usize, RuntimeError> {
        let index = self.pop_fixnum()?;
        usize::try_from(index)
            .ok()
            .filter(|&i| i <= limit)
            .ok_or(RuntimeError::RangeError {
                index,
                length: limit,
            })
    }

    pub fn pop_as<T: HeapObject>(&mut self) -> Result<Tagged<T>, RuntimeError> {
        let value = self.pop()?;
        untag_as::<T>(value)
    }
}

/// A fixnum as a character code.
pub fn fixnum_to_char(n: i64) -> Result<Char, RuntimeError> {
    Char::try_from(n).map_err(|_| RuntimeError::RangeError {
        index: n,
        length: usize::from(Char::MAX) + 1,
    })
}

pub const PRIMITIVES: &[PrimitiveMessage] = &[
    PrimitiveMessage::new("handle?", 1, 1, handles::is_handle),
    PrimitiveMessage::new(">handle", 1, 1, handles::to_handle),
    PrimitiveMessage::new("handle>", 1, 1, handles::from_handle),
    PrimitiveMessage::new("string?", 1, 1, strings::is_string),
    PrimitiveMessage::new("string-length", 1, 1, strings::string_length),
    PrimitiveMessage::new("string-nth", 2, 1, strings::string_nth),
    PrimitiveMessage::new("string-compare", 2, 1, strings::string_compare),
    PrimitiveMessage::new("string=", 2, 1, strings::string_eq),
    PrimitiveMessage::new("string-hashcode", 1, 1, strings::string_hashcode),
    PrimitiveMessage::new("index-of", 3, 1, strings::index_of),
    PrimitiveMessage::new("substring", 3, 1, strings::substring),
    PrimitiveMessage::new("getenv", 1, 1, environment::getenv),
];

pub fn primitive_index(name: &str) -> Option<usize> {
    PRIMITIVES.iter().position(|p| p.name == name)
}

pub fn get_primitive(id: usize) -> PrimitiveMessage<'static> {
    debug_assert!(id < PRIMITIVES.len());
    PRIMITIVES[id]
}
