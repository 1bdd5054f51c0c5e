//! Builtin functions.
//!
//! Builtins use the same calling convention as compiled user functions:
//! `matte_<name>(zone, argin) -> argout`, where both packets are object
//! lists and the zone is the caller's. The compiler pre-registers
//! [`BUILTIN_FUNCTIONS`] in the global symbol table so call sites resolve
//! before emission.

use std::ffi::c_int;

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::Value;
use matte_core::zone::Zone;

use crate::display;
use crate::ffi::alloc_in;

/// Function names the compiler registers as global builtins.
pub const BUILTIN_FUNCTIONS: &[&str] = &["disp", "sum"];

unsafe fn arg(argin: *mut Value, index: usize) -> *mut Value {
    if argin.is_null() {
        return std::ptr::null_mut();
    }
    match unsafe { &*argin } {
        Value::List(lst) => lst.get(index),
        _ => std::ptr::null_mut(),
    }
}

unsafe fn argout1(zone: *mut Zone, v: Value) -> *mut Value {
    let out = unsafe { alloc_in(zone, v) };
    unsafe { crate::ffi::matte_list_argout(zone, 1, [out].as_ptr()) }
}

unsafe fn failed(zone: *mut Zone) -> *mut Value {
    let e = matte_core::except::get().unwrap_or_default();
    unsafe { alloc_in(zone, Value::Exception(e)) }
}

/// `disp(x)`: print the bare rendering of a value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_disp(zone: *mut Zone, argin: *mut Value) -> *mut Value {
    let x = unsafe { arg(argin, 0) };
    if x.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return unsafe { failed(zone) };
    }
    println!("{}", display::render(unsafe { &*x }));
    unsafe { crate::ffi::matte_list_argout(zone, 0, std::ptr::null()) }
}

/// `sum(x)`: total of a numeric value's elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_sum(zone: *mut Zone, argin: *mut Value) -> *mut Value {
    let x = unsafe { arg(argin, 0) };
    if x.is_null() {
        error!(ids::INVALID_INPUT_ARG, "one or more invalid arguments");
        return unsafe { failed(zone) };
    }

    let total = match unsafe { &*x } {
        Value::Int(v) => Value::Int(*v),
        Value::Float(v) => Value::Float(*v),
        Value::Complex(v) => Value::Complex(*v),
        Value::Range(r) => Value::Int(r.iter().sum()),
        Value::Vector(data) => Value::Float(data.iter().sum()),
        Value::Matrix(m) => Value::Float(m.data.iter().sum()),
        Value::ComplexVector(data) => Value::Complex(data.iter().sum()),
        Value::ComplexMatrix(m) => Value::Complex(m.data.iter().sum()),
        other => {
            error!(ids::INVALID_INPUT_ARG, "sum of '{}' is not supported", other.type_name());
            return unsafe { failed(zone) };
        }
    };

    unsafe { argout1(zone, total) }
}

/// Exit-status helper shared by generated `main` wrappers.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matte_report_result(result: *mut Value) -> c_int {
    if !result.is_null() && unsafe { (*result).is_exception() } {
        eprintln!("{}", display::render(unsafe { &*result }));
        return 1;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{matte_int_new, matte_list_argin, matte_list_get, matte_zone_create, matte_zone_destroy};
    use matte_core::value::Range;
    use serial_test::serial;

    #[test]
    #[serial]
    fn sum_of_a_range() {
        matte_core::except::clear();
        unsafe {
            let z = matte_zone_create(16);
            let r = alloc_in(z, Value::Range(Range::new(1, 1, 4)));
            let argin = matte_list_argin(z, 1, [r].as_ptr());
            let argout = matte_sum(z, argin);
            let got = matte_list_get(argout, 0);
            assert!(matches!(*got, Value::Int(10)));
            matte_zone_destroy(z);
        }
    }

    #[test]
    #[serial]
    fn sum_of_a_vector_is_a_float() {
        matte_core::except::clear();
        unsafe {
            let z = matte_zone_create(16);
            let v = alloc_in(z, Value::Vector(vec![1.5, 2.5]));
            let argin = matte_list_argin(z, 1, [v].as_ptr());
            let argout = matte_sum(z, argin);
            let got = matte_list_get(argout, 0);
            assert!(matches!(*got, Value::Float(t) if t == 4.0));
            matte_zone_destroy(z);
        }
    }

    #[test]
    #[serial]
    fn sum_of_an_unsupported_kind_fails() {
        matte_core::except::clear();
        unsafe {
            let z = matte_zone_create(16);
            let s = alloc_in(z, Value::Str("abc".into()));
            let argin = matte_list_argin(z, 1, [s].as_ptr());
            let argout = matte_sum(z, argin);
            assert!((*argout).is_exception());
            matte_zone_destroy(z);
        }
        matte_core::except::clear();
    }

    #[test]
    #[serial]
    fn missing_argument_fails() {
        matte_core::except::clear();
        unsafe {
            let z = matte_zone_create(16);
            let _ = matte_int_new(z, 1);
            let argin = matte_list_argin(z, 0, std::ptr::null());
            let argout = matte_sum(z, argin);
            assert!((*argout).is_exception());
            matte_zone_destroy(z);
        }
        matte_core::except::clear();
    }
}
