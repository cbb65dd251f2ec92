use log::{debug, trace};

use crate::{
    ExecutionState, ExecutionStateInfo, Heap, HeapCreateInfo, PrimitiveContext,
    RuntimeError, SpecialObjects, Value, get_primitive, primitive_index,
};

#[derive(Debug, Clone, Default)]
pub struct VMCreateInfo {
    pub heap: HeapCreateInfo,
    pub state: ExecutionStateInfo,
}

/// One heap, its special objects and a data stack.
///
/// Nothing here is synchronized: a VM belongs to one thread at a time.
#[derive(Debug)]
pub struct VM {
    pub heap: Heap,
    pub specials: SpecialObjects,
    pub state: ExecutionState,
}

impl VM {
    pub fn new(info: VMCreateInfo) -> Self {
        let mut heap = Heap::new(info.heap);
        let specials = SpecialObjects::bootstrap(&mut heap)
            .expect("fresh heap holds the special objects");
        Self::from_parts(heap, specials, &info.state)
    }

    pub fn from_parts(
        heap: Heap,
        specials: SpecialObjects,
        state: &ExecutionStateInfo,
    ) -> Self {
        Self {
            heap,
            specials,
            state: ExecutionState::new(state),
        }
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.state.push(value);
    }

    #[inline]
    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.state.pop()
    }

    /// Run the primitive called `name` on the data stack. On failure the
    /// inputs are put back as they were.
    pub fn call(&mut self, name: &str) -> Result<(), RuntimeError> {
        let id = primitive_index(name).ok_or_else(|| {
            RuntimeError::UnknownPrimitive {
                name: name.to_string(),
            }
        })?;
        let primitive = get_primitive(id);
        self.state.ensure_depth(primitive.inputs)?;

        let base = self.state.depth() - primitive.inputs;
        let inputs = self.state.stack()[base..].to_vec();
        trace!("call {} with {inputs:?}", primitive.name);

        let mut ctx = PrimitiveContext {
            state: &mut self.state,
            heap: &mut self.heap,
            specials: &self.specials,
        };
        let result = (primitive.ptr)(&mut ctx);
        match &result {
            Ok(()) => {
                debug_assert_eq!(
                    self.state.depth(),
                    base + primitive.outputs,
                    "{} left the stack unbalanced",
                    primitive.name
                );
            }
            Err(err) => {
                debug!("{} failed: {err}", primitive.name);
                self.state.restore(base, &inputs);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Allocator, HandleObject, TypeId, is_type};

    #[test]
    fn bootstrap_allocates_distinct_booleans() {
        let vm = VM::new(VMCreateInfo::default());
        assert_ne!(vm.specials.t, vm.specials.f);
        assert!(is_type(TypeId::Boolean, vm.specials.t));
        assert!(is_type(TypeId::Boolean, vm.specials.f));
        assert_eq!(vm.specials.bool_value(true), vm.specials.t);
        assert_eq!(vm.heap.objects().count(), 2);
    }

    #[test]
    fn unknown_primitive_and_underflow() {
        let mut vm = VM::new(VMCreateInfo::default());
        assert_eq!(
            vm.call("frobnicate"),
            Err(RuntimeError::UnknownPrimitive {
                name: "frobnicate".to_string()
            })
        );
        assert_eq!(
            vm.call("string-nth"),
            Err(RuntimeError::StackUnderflow { needed: 2, depth: 0 })
        );
    }

    #[test]
    fn heap_exhaustion_surfaces_from_primitives() {
        let mut vm = VM::new(VMCreateInfo {
            heap: HeapCreateInfo { size: 1 },
            ..Default::default()
        });
        let s = vm.heap.allocate_str("ab").expect("fits").as_value();
        while vm.heap.free() >= size_of::<HandleObject>() {
            vm.heap.make_handle(s).expect("fits");
        }
        vm.push(s);
        let err = vm.call(">handle").unwrap_err();
        assert!(matches!(err, RuntimeError::HeapExhausted { .. }));
        assert_eq!(vm.state.stack(), &[s]);
    }
}
