use std::ffi::CStr;

use crate::{Allocator, PrimitiveContext, PrimitiveResult, StringObject};

/// `( name -- value/f )`
pub fn getenv(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let name = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let name = unsafe { name.as_ref() }.to_c_string()?;

    // SAFETY: valid C string; the result is copied before anything can
    // call setenv
    let raw = unsafe { libc::getenv(name.as_ptr()) };
    if raw.is_null() {
        ctx.push_bool(false);
        return Ok(());
    }
    // SAFETY: getenv returns a NUL terminated string
    let value = unsafe { CStr::from_ptr(raw) }.to_owned();
    let string = ctx.heap.allocate_c_string(&value)?;
    ctx.push(string.as_value());
    Ok(())
}
