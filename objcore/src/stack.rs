use crate::{RuntimeError, Value};

#[derive(Debug, Clone, Default)]
pub struct ExecutionStateInfo {
    pub stack_size: usize,
}

/// The data stack primitives read their inputs from and push results to.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    stack: Vec<Value>,
}

impl ExecutionState {
    #[must_use]
    pub fn new(info: &ExecutionStateInfo) -> Self {
        Self {
            stack: Vec::with_capacity(info.stack_size),
        }
    }

    /// Returns the active portion of the stack, top last
    #[must_use]
    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow {
            needed: 1,
            depth: 0,
        })
    }

    pub fn ensure_depth(&self, needed: usize) -> Result<(), RuntimeError> {
        if self.stack.len() < needed {
            return Err(RuntimeError::StackUnderflow {
                needed,
                depth: self.stack.len(),
            });
        }
        Ok(())
    }

    /// Drop everything above `depth` and push `values` back.
    pub fn restore(&mut self, depth: usize, values: &[Value]) {
        self.stack.truncate(depth);
        self.stack.extend_from_slice(values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop() {
        let mut state =
            ExecutionState::new(&ExecutionStateInfo { stack_size: 4 });
        state.push(Value::from_i64(1));
        state.push(Value::from_i64(2));
        assert_eq!(state.depth(), 2);
        assert_eq!(state.pop(), Ok(Value::from_i64(2)));
        assert_eq!(state.stack(), &[Value::from_i64(1)]);
    }

    #[test]
    fn underflow_is_reported() {
        let mut state = ExecutionState::new(&ExecutionStateInfo::default());
        assert_eq!(
            state.pop(),
            Err(RuntimeError::StackUnderflow { needed: 1, depth: 0 })
        );
        state.push(Value::from_i64(0));
        assert!(state.ensure_depth(1).is_ok());
        assert_eq!(
            state.ensure_depth(3),
            Err(RuntimeError::StackUnderflow { needed: 3, depth: 1 })
        );
    }

    #[test]
    fn restore_puts_inputs_back() {
        let mut state = ExecutionState::new(&ExecutionStateInfo::default());
        let inputs = [Value::from_i64(7), Value::from_i64(8)];
        state.push(Value::from_i64(6));
        state.push(Value::from_i64(99));
        state.restore(1, &inputs);
        assert_eq!(
            state.stack(),
            &[Value::from_i64(6), Value::from_i64(7), Value::from_i64(8)]
        );
    }
}
