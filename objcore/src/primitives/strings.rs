use std::cmp::Ordering;

use crate::{
    Allocator, Char, PrimitiveContext, PrimitiveResult, RuntimeError,
    StringObject, TypeId, Value, fixnum_to_char, is_type, type_of, untag_as,
};

/// `( obj -- ? )`
pub fn is_string(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let value = ctx.pop()?;
    ctx.push_bool(is_type(TypeId::String, value));
    Ok(())
}

/// `( str -- n )`
pub fn string_length(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let string = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let len = unsafe { string.as_ref() }.capacity();
    ctx.push(Value::from_usize(len));
    Ok(())
}

/// `( n str -- ch )`
pub fn string_nth(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let string = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let string = unsafe { string.as_ref() };
    let index = ctx.pop_fixnum()?;
    let len = string.capacity();
    let Some(i) = usize::try_from(index).ok().filter(|&i| i < len) else {
        return Err(RuntimeError::RangeError { index, length: len });
    };
    // SAFETY: bounds checked above
    let ch = unsafe { string.char_at_unchecked(i) };
    ctx.push(Value::from_i64(i64::from(ch)));
    Ok(())
}

/// `( s1 s2 -- n )`, -1, 0 or 1
pub fn string_compare(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let s2 = ctx.pop_as::<StringObject>()?;
    let s1 = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let ordering = unsafe { s1.as_ref().compare(s2.as_ref()) };
    let n = match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    };
    ctx.push(Value::from_i64(n));
    Ok(())
}

/// `( s1 s2 -- ? )`, false when either side is not a string
pub fn string_eq(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let s2 = ctx.pop()?;
    let s1 = ctx.pop()?;
    let strings = (untag_as::<StringObject>(s1), untag_as::<StringObject>(s2));
    let equal = match strings {
        // SAFETY: type checked, no allocation
        (Ok(a), Ok(b)) => unsafe { a.as_ref().compare(b.as_ref()) }.is_eq(),
        _ => false,
    };
    ctx.push_bool(equal);
    Ok(())
}

/// `( str -- n )`
pub fn string_hashcode(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let string = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let hash = unsafe { string.as_mut() }.compute_hash();
    ctx.push(Value::from_i64(hash));
    Ok(())
}

/// `( start str sub -- n )`, `sub` is a character or a string, -1 if absent
pub fn index_of(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let sub = ctx.pop()?;
    let string = ctx.pop_as::<StringObject>()?;
    // SAFETY: type checked, no allocation
    let string = unsafe { string.as_ref() };
    let start = ctx.pop_index(string.capacity())?;

    let found = match type_of(sub) {
        TypeId::Fixnum => {
            let ch = fixnum_to_char(sub.as_fixnum().unwrap_or_default())?;
            string.index_of(&[ch], start)
        }
        TypeId::String => {
            let needle = untag_as::<StringObject>(sub)?;
            // SAFETY: type checked, no allocation
            string.index_of(unsafe { needle.as_ref() }.as_chars(), start)
        }
        _ => {
            return Err(RuntimeError::TypeMismatch {
                expected: TypeId::String,
                got: sub,
            });
        }
    };
    let n = found.map_or(-1, |i| i as i64);
    ctx.push(Value::from_i64(n));
    Ok(())
}

/// `( start end str -- str' )`
pub fn substring(ctx: &mut PrimitiveContext) -> PrimitiveResult {
    let string = ctx.pop()?;
    let len = {
        // SAFETY: type checked, no allocation in this scope
        unsafe { untag_as::<StringObject>(string)?.as_ref() }.capacity()
    };
    let end = ctx.pop_index(len)?;
    let start = ctx.pop_index(end)?;

    let sub = ctx.heap.allocate_string(end - start)?;

    // allocating may move the source, look it up again
    let source = untag_as::<StringObject>(string)?;
    // SAFETY: distinct objects, no allocation while the references live
    let (source, target) = unsafe { (source.as_ref(), sub.as_mut()) };
    let chars: &[Char] = &source.as_chars()[start..end];
    target.as_chars_mut().copy_from_slice(chars);

    ctx.push(sub.as_value());
    Ok(())
}
