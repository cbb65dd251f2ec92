use crate::{
    Allocator, PrimitiveContext, PrimitiveResult, dereference,
    is_handle as is_handle_value,
};

/// `( obj -- ? )`
pub fn is_handle(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let value = ctx.pop()?;
    ctx.push_bool(is_handle_value(value));
    Ok(())
}

/// `( obj -- handle )`
pub fn to_handle(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let value = ctx.pop()?;
    let handle = ctx.heap.make_handle(value)?;
    ctx.push(handle.as_value());
    Ok(())
}

/// `( handle -- obj )`
pub fn from_handle(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let handle = ctx.pop()?;
    let value = dereference(handle)?;
    ctx.push(value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Allocator, ErrorKind, RuntimeError, VM, VMCreateInfo, Value};

    #[test]
    fn wrap_unwrap_and_expire() {
        let mut vm = VM::new(VMCreateInfo::default());
        let s = vm.heap.allocate_str("socket").expect("alloc").as_value();

        vm.push(s);
        vm.call(">handle").expect("wrap");
        let handle = vm.pop().expect("handle");

        vm.push(handle);
        vm.call("handle?").expect("predicate");
        assert_eq!(vm.pop(), Ok(vm.specials.t));

        vm.push(s);
        vm.call("handle?").expect("predicate");
        assert_eq!(vm.pop(), Ok(vm.specials.f));

        vm.push(handle);
        vm.call("handle>").expect("unwrap");
        assert_eq!(vm.pop(), Ok(s));

        assert_eq!(vm.heap.expire_handles(), 1);

        for _ in 0..2 {
            vm.push(handle);
            let err = vm.call("handle>").unwrap_err();
            assert_eq!(err, RuntimeError::HandleExpired { handle });
            assert_eq!(vm.pop(), Ok(handle));
        }
    }

    #[test]
    fn unwrap_non_handle_is_type_mismatch() {
        let mut vm = VM::new(VMCreateInfo::default());
        vm.push(Value::from_i64(3));
        let err = vm.call("handle>").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
