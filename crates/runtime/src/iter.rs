//! Iteration for `for` loops.
//!
//! An iterator value wraps the evaluated loop expression and a cell that
//! holds the loop variable's current value. Scalars — including complex
//! scalars — produce exactly one iteration; ranges walk begin/step/end
//! inclusively; vectors and matrices walk their elements (matrices in
//! column order).

use matte_core::error;
use matte_core::except::ids;
use matte_core::value::{IterState, Value, ValueKind};
use matte_core::zone::Zone;

use crate::ffi::alloc_in;

/// Build an iterator over `obj`, or report `matte:iterator` for an
/// unsupported kind.
///
/// # Safety
/// `obj` must point at a live value that outlives the iterator.
pub unsafe fn new(obj: *mut Value) -> Option<Value> {
    let kind = unsafe { (*obj).kind() };
    match kind {
        ValueKind::Int
        | ValueKind::Float
        | ValueKind::Complex
        | ValueKind::Range
        | ValueKind::Vector
        | ValueKind::Matrix
        | ValueKind::ComplexVector
        | ValueKind::ComplexMatrix => Some(Value::Iterator(Box::new(IterState {
            obj,
            val: std::ptr::null_mut(),
            index: 0,
            limit: 0,
        }))),
        other => {
            error!(ids::ITERATOR, "iteration on '{}' is not supported", other.name());
            None
        }
    }
}

/// Advance the iterator, binding its value cell. Returns `false` when the
/// iteration is exhausted. The value cell is allocated in `zone` on the
/// first advance and updated in place afterwards.
///
/// # Safety
/// `st.obj` must point at a live value; `zone` is either null (heap
/// fallback) or a live zone owning the value cell.
pub unsafe fn next(zone: *mut Zone, st: &mut IterState) -> bool {
    unsafe {
        match &*st.obj {
            Value::Int(_) | Value::Float(_) | Value::Complex(_) => {
                if st.val.is_null() {
                    st.val = alloc_in(zone, (*st.obj).clone());
                    true
                } else {
                    false
                }
            }
            Value::Range(r) => {
                if st.val.is_null() {
                    st.index = r.begin;
                    st.limit = r.end;
                    st.val = alloc_in(zone, Value::Int(st.index));
                } else {
                    st.index += r.step;
                    *st.val = Value::Int(st.index);
                }
                if r.step == 0 {
                    return false;
                }
                if r.step > 0 { st.index <= st.limit } else { st.index >= st.limit }
            }
            Value::Vector(data) => next_real(zone, st, data),
            Value::Matrix(m) => next_real(zone, st, &m.data),
            Value::ComplexVector(data) => next_complex(zone, st, data),
            Value::ComplexMatrix(m) => next_complex(zone, st, &m.data),
            _ => false,
        }
    }
}

unsafe fn next_real(zone: *mut Zone, st: &mut IterState, data: &[f64]) -> bool {
    if data.is_empty() {
        return false;
    }
    unsafe {
        if st.val.is_null() {
            st.index = 0;
            st.limit = data.len() as i64;
            st.val = alloc_in(zone, Value::Float(data[0]));
        } else {
            st.index += 1;
            if st.index >= st.limit {
                return false;
            }
            *st.val = Value::Float(data[st.index as usize]);
        }
    }
    true
}

unsafe fn next_complex(
    zone: *mut Zone,
    st: &mut IterState,
    data: &[num_complex::Complex64],
) -> bool {
    if data.is_empty() {
        return false;
    }
    unsafe {
        if st.val.is_null() {
            st.index = 0;
            st.limit = data.len() as i64;
            st.val = alloc_in(zone, Value::Complex(data[0]));
        } else {
            st.index += 1;
            if st.index >= st.limit {
                return false;
            }
            *st.val = Value::Complex(data[st.index as usize]);
        }
    }
    true
}
