//! The `matte_*` C ABI consumed by emitted programs.
//!
//! Every function takes and returns opaque pointers: `MatteZone *` maps
//! to [`Zone`] and `MatteObject *` to [`Value`]. Failure never unwinds
//! across the boundary; fallible operations return an exception *value*
//! and leave the process-wide slot populated for the emitted
//! exception-check sites.
//!
//! A null zone pointer selects the general-heap path: allocation boxes,
//! freeing unboxes. Emitted `matte_main` runs with a null caller zone.

use std::ffi::{CStr, c_char, c_int, c_long, c_ulong};

use matte_core::except::{self, ids};
use matte_core::list::ObjectList;
use matte_core::value::Value;
use matte_core::zone::Zone;
use matte_core::{Exception, error};
use num_complex::Complex64;

use crate::dispatch::{self, BinaryOp, TernaryOp, UnaryOp, VariadicOp};
use crate::{display, iter};

/// Allocate `v` in `zone`, or on the general heap when `zone` is null.
pub(crate) unsafe fn alloc_in(zone: *mut Zone, v: Value) -> *mut Value {
    if zone.is_null() {
        Box::into_raw(Box::new(v))
    } else {
        unsafe { (*zone).alloc(v) }
    }
}

/// Release `p` to `zone`, or free it individually when `zone` is null.
pub(crate) unsafe fn free_in(zone: *mut Zone, p: *mut Value) {
    if p.is_null() {
        return;
    }
    if zone.is_null() {
        drop(unsafe { Box::from_raw(p) });
    } else {
        unsafe { (*zone).free(p) };
    }
}

/// Exception value for the pending failure, allocated in `zone`.
unsafe fn pending_in(zone: *mut Zone) -> *mut Value {
    let e = except::get().unwrap_or_else(|| {
        Exception::new(ids::COMPILER, "operation failed without a report")
    });
    unsafe { alloc_in(zone, Value::Exception(e)) }
}

unsafe fn cstr<'a>(s: *const c_char) -> &'a str {
    if s.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(s) }.to_str().unwrap_or("")
}

// === zones ===

#[unsafe(no_mangle)]
pub extern "C" fn matte_zone_create(n: c_ulong) -> *mut Zone {
    Box::into_raw(Box::new(Zone::with_capacity(n as usize)))
}

/// # Safety
/// `zone` must be null or a pointer previously returned by
/// [`matte_zone_create`]; it is invalid after this call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_zone_destroy(zone: *mut Zone) {
    if !zone.is_null() {
        drop(unsafe { Box::from_raw(zone) });
    }
}

// === constructors ===

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_int_new(zone: *mut Zone, v: c_long) -> *mut Value {
    unsafe { alloc_in(zone, Value::Int(v as i64)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_float_new(zone: *mut Zone, v: f64) -> *mut Value {
    unsafe { alloc_in(zone, Value::Float(v)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_complex_new(zone: *mut Zone, re: f64, im: f64) -> *mut Value {
    unsafe { alloc_in(zone, Value::Complex(Complex64::new(re, im))) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_string_new(zone: *mut Zone, s: *const c_char) -> *mut Value {
    let s = unsafe { cstr(s) };
    unsafe { alloc_in(zone, Value::Str(s.to_owned())) }
}

// === object lifecycle ===

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_copy(zone: *mut Zone, obj: *mut Value) -> *mut Value {
    if obj.is_null() {
        return std::ptr::null_mut();
    }
    let copy = unsafe { (*obj).clone() };
    unsafe { alloc_in(zone, copy) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_free(zone: *mut Zone, obj: *mut Value) {
    unsafe { free_in(zone, obj) }
}

// === display / truth / exception predicates ===

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_disp(_zone: *mut Zone, obj: *mut Value) -> c_int {
    if obj.is_null() {
        return 0;
    }
    println!("{}", display::render(unsafe { &*obj }));
    1
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_display(
    _zone: *mut Zone,
    obj: *mut Value,
    name: *const c_char,
) -> c_int {
    if obj.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return 0;
    }
    let v = unsafe { &*obj };
    match display::display(v, unsafe { cstr(name) }) {
        Some(text) => {
            println!("{text}");
            1
        }
        None => {
            error!(ids::UNDEFINED_FUNCTION, "method disp({}) is unimplemented", v.type_name());
            0
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_true(obj: *mut Value) -> c_int {
    if obj.is_null() {
        return 0;
    }
    let v = unsafe { &*obj };
    match display::truth(v) {
        Some(b) => b as c_int,
        None => {
            eprintln!("warning: object of type '{}' used as condition", v.type_name());
            0
        }
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_is_exception(obj: *mut Value) -> c_int {
    (!obj.is_null() && unsafe { (*obj).is_exception() }) as c_int
}

// === exception channel ===

#[unsafe(no_mangle)]
pub extern "C" fn matte_exceptions_check() -> c_int {
    except::check() as c_int
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_exceptions_get(zone: *mut Zone) -> *mut Value {
    match except::get() {
        Some(e) => unsafe { alloc_in(zone, Value::Exception(e)) },
        None => std::ptr::null_mut(),
    }
}

/// Copy an exception value into `zone`, appending a call-stack frame for
/// the propagating site.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_except_propagate(
    zone: *mut Zone,
    obj: *mut Value,
    file: *const c_char,
    func: *const c_char,
    line: c_long,
) -> *mut Value {
    if obj.is_null() {
        return unsafe { pending_in(zone) };
    }
    match unsafe { &*obj } {
        Value::Exception(e) => {
            let mut copy = e.clone();
            copy.add_call(unsafe { cstr(file) }, unsafe { cstr(func) }, line as u64);
            unsafe { alloc_in(zone, Value::Exception(copy)) }
        }
        _ => obj,
    }
}

// === operator dispatch ===

macro_rules! ffi_binary {
    ($name:ident, $op:expr) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            zone: *mut Zone,
            a: *mut Value,
            b: *mut Value,
        ) -> *mut Value {
            if a.is_null() || b.is_null() {
                error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
                return unsafe { pending_in(zone) };
            }
            match dispatch::binary($op, unsafe { &*a }, unsafe { &*b }) {
                Ok(v) => unsafe { alloc_in(zone, v) },
                Err(e) => unsafe { alloc_in(zone, Value::Exception(e)) },
            }
        }
    };
}

macro_rules! ffi_unary {
    ($name:ident, $op:expr) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(zone: *mut Zone, a: *mut Value) -> *mut Value {
            if a.is_null() {
                error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
                return unsafe { pending_in(zone) };
            }
            match dispatch::unary($op, unsafe { &*a }) {
                Ok(v) => unsafe { alloc_in(zone, v) },
                Err(e) => unsafe { alloc_in(zone, Value::Exception(e)) },
            }
        }
    };
}

ffi_binary!(matte_object_plus, BinaryOp::Plus);
ffi_binary!(matte_object_minus, BinaryOp::Minus);
ffi_binary!(matte_object_times, BinaryOp::Times);
ffi_binary!(matte_object_mtimes, BinaryOp::Mtimes);
ffi_binary!(matte_object_rdivide, BinaryOp::Rdivide);
ffi_binary!(matte_object_ldivide, BinaryOp::Ldivide);
ffi_binary!(matte_object_mrdivide, BinaryOp::Mrdivide);
ffi_binary!(matte_object_mldivide, BinaryOp::Mldivide);
ffi_binary!(matte_object_power, BinaryOp::Power);
ffi_binary!(matte_object_mpower, BinaryOp::Mpower);
ffi_binary!(matte_object_lt, BinaryOp::Lt);
ffi_binary!(matte_object_gt, BinaryOp::Gt);
ffi_binary!(matte_object_le, BinaryOp::Le);
ffi_binary!(matte_object_ge, BinaryOp::Ge);
ffi_binary!(matte_object_ne, BinaryOp::Ne);
ffi_binary!(matte_object_eq, BinaryOp::Eq);
ffi_binary!(matte_object_and, BinaryOp::And);
ffi_binary!(matte_object_or, BinaryOp::Or);
ffi_binary!(matte_object_mand, BinaryOp::Mand);
ffi_binary!(matte_object_mor, BinaryOp::Mor);
ffi_binary!(matte_object_subsref, BinaryOp::Subsref);

ffi_unary!(matte_object_uminus, UnaryOp::Uminus);
ffi_unary!(matte_object_not, UnaryOp::Not);
ffi_unary!(matte_object_ctranspose, UnaryOp::Ctranspose);
ffi_unary!(matte_object_transpose, UnaryOp::Transpose);

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_object_colon(
    zone: *mut Zone,
    a: *mut Value,
    b: *mut Value,
    c: *mut Value,
) -> *mut Value {
    if a.is_null() || b.is_null() || c.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return unsafe { pending_in(zone) };
    }
    match dispatch::ternary(TernaryOp::Colon, unsafe { &*a }, unsafe { &*b }, unsafe { &*c }) {
        Ok(v) => unsafe { alloc_in(zone, v) },
        Err(e) => unsafe { alloc_in(zone, Value::Exception(e)) },
    }
}

unsafe fn gather<'a>(n: c_int, items: *const *mut Value) -> Option<Vec<&'a Value>> {
    if n < 0 || (n > 0 && items.is_null()) {
        return None;
    }
    let ptrs = unsafe { std::slice::from_raw_parts(items, n as usize) };
    let mut out = Vec::with_capacity(ptrs.len());
    for p in ptrs {
        if p.is_null() {
            return None;
        }
        out.push(unsafe { &**p });
    }
    Some(out)
}

macro_rules! ffi_variadic {
    ($name:ident, $op:expr) => {
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(
            zone: *mut Zone,
            n: c_int,
            items: *const *mut Value,
        ) -> *mut Value {
            let Some(args) = (unsafe { gather(n, items) }) else {
                error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
                return unsafe { pending_in(zone) };
            };
            match dispatch::variadic($op, &args) {
                Ok(v) => unsafe { alloc_in(zone, v) },
                Err(e) => unsafe { alloc_in(zone, Value::Exception(e)) },
            }
        }
    };
}

ffi_variadic!(matte_object_horzcat, VariadicOp::Horzcat);
ffi_variadic!(matte_object_vertcat, VariadicOp::Vertcat);

// === argument packets ===

/// Input packet: the pointers are shared, not copied; they stay owned by
/// the caller's zone.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_list_argin(
    zone: *mut Zone,
    n: c_int,
    items: *const *mut Value,
) -> *mut Value {
    let mut lst = ObjectList::new();
    if n > 0 && !items.is_null() {
        for p in unsafe { std::slice::from_raw_parts(items, n as usize) } {
            lst.push(*p);
        }
    }
    unsafe { alloc_in(zone, Value::List(lst)) }
}

/// Output packet: values are copied into `zone` (the caller's zone), so
/// they survive the callee's zone teardown.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_list_argout(
    zone: *mut Zone,
    n: c_int,
    items: *const *mut Value,
) -> *mut Value {
    let mut lst = ObjectList::new();
    if n > 0 && !items.is_null() {
        for p in unsafe { std::slice::from_raw_parts(items, n as usize) } {
            if p.is_null() {
                lst.push(std::ptr::null_mut());
            } else {
                let copy = unsafe { (**p).clone() };
                lst.push(unsafe { alloc_in(zone, copy) });
            }
        }
    }
    unsafe { alloc_in(zone, Value::List(lst)) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_list_get(lst: *mut Value, index: c_int) -> *mut Value {
    if lst.is_null() || index < 0 {
        return std::ptr::null_mut();
    }
    match unsafe { &*lst } {
        Value::List(lst) => lst.get(index as usize),
        _ => std::ptr::null_mut(),
    }
}

// === iterators ===

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_iter_new(zone: *mut Zone, obj: *mut Value) -> *mut Value {
    if obj.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return unsafe { pending_in(zone) };
    }
    match unsafe { iter::new(obj) } {
        Some(v) => unsafe { alloc_in(zone, v) },
        None => unsafe { pending_in(zone) },
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_iter_next(zone: *mut Zone, it: *mut Value) -> c_int {
    if it.is_null() {
        return 0;
    }
    match unsafe { &mut *it } {
        Value::Iterator(st) => unsafe { iter::next(zone, st) as c_int },
        _ => 0,
    }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_iter_value(it: *mut Value) -> *mut Value {
    if it.is_null() {
        return std::ptr::null_mut();
    }
    match unsafe { &*it } {
        Value::Iterator(st) => st.val,
        _ => std::ptr::null_mut(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn scenario_for_range_accumulates_six() {
        // s = 0; for i = 1:3, s = s + i; end  =>  s = 6
        except::clear();
        unsafe {
            let z = matte_zone_create(16);
            let mut s = matte_int_new(z, 0);
            let one = matte_int_new(z, 1);
            let three = matte_int_new(z, 3);
            let r = matte_object_colon(z, one, one, three);
            assert_eq!(matte_is_exception(r), 0);

            let it = matte_iter_new(z, r);
            assert_eq!(matte_is_exception(it), 0);
            while matte_iter_next(z, it) != 0 {
                let i = matte_iter_value(it);
                let next = matte_object_plus(z, s, i);
                assert_eq!(matte_is_exception(next), 0);
                s = next;
            }
            assert!(matches!(*s, Value::Int(6)));
            matte_zone_destroy(z);
        }
    }

    #[test]
    #[serial]
    fn dispatch_failure_returns_an_exception_value() {
        except::clear();
        unsafe {
            let z = matte_zone_create(8);
            let a = matte_string_new(z, c"a".as_ptr());
            let b = matte_string_new(z, c"b".as_ptr());
            let r = matte_object_mtimes(z, a, b);
            assert_eq!(matte_is_exception(r), 1);
            assert_eq!(matte_exceptions_check(), 1);
            let copy = matte_except_propagate(z, r, c"t.m".as_ptr(), c"main".as_ptr(), 4);
            match &*copy {
                Value::Exception(e) => {
                    assert_eq!(e.id, ids::UNDEFINED_FUNCTION);
                    assert_eq!(e.stack.last().unwrap().file, "t.m");
                }
                other => panic!("expected exception, got {other:?}"),
            }
            matte_zone_destroy(z);
        }
        except::clear();
    }

    #[test]
    #[serial]
    fn argout_copies_survive_the_callee_zone() {
        except::clear();
        unsafe {
            let caller = matte_zone_create(8);
            let callee = matte_zone_create(8);
            let v = matte_int_new(callee, 42);
            let out = matte_list_argout(caller, 1, [v].as_ptr());
            matte_zone_destroy(callee);
            let got = matte_list_get(out, 0);
            assert!(matches!(*got, Value::Int(42)));
            matte_zone_destroy(caller);
        }
    }

    #[test]
    #[serial]
    fn null_zone_falls_back_to_the_heap() {
        unsafe {
            let p = matte_int_new(std::ptr::null_mut(), 5);
            assert!(matches!(*p, Value::Int(5)));
            matte_object_free(std::ptr::null_mut(), p);
        }
    }
}
