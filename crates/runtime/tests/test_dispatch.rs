//! Runtime-level scenarios exercised through the public rlib API.

use matte_core::except;
use matte_core::value::{Range, Value};
use matte_core::zone::Zone;
use matte_runtime::dispatch::{self, BinaryOp, TernaryOp};
use matte_runtime::{display, iter};
use serial_test::serial;

#[test]
#[serial]
fn for_over_a_range_accumulates_and_displays() {
    // s = 0; for i = 1:3, s = s + i; end; display(s) => "s = 6"
    except::clear();
    let mut zone = Zone::with_capacity(16);
    let z = &mut zone as *mut Zone;

    let mut s = Value::Int(0);
    let range = dispatch::ternary(
        TernaryOp::Colon,
        &Value::Int(1),
        &Value::Int(1),
        &Value::Int(3),
    )
    .unwrap();
    assert!(matches!(range, Value::Range(Range { begin: 1, step: 1, end: 3 })));

    let obj = zone.alloc(range);
    let mut st = match unsafe { iter::new(obj) } {
        Some(Value::Iterator(st)) => *st,
        other => panic!("expected an iterator, got {other:?}"),
    };

    unsafe {
        while iter::next(z, &mut st) {
            s = dispatch::binary(BinaryOp::Plus, &s, &*st.val).unwrap();
        }
    }

    assert_eq!(display::display(&s, "s").unwrap(), "s = 6");
}

#[test]
#[serial]
fn caught_exceptions_carry_identifier_and_frames() {
    // try, x = plus('a', 'b'); catch e ... end: the slot feeds the catch
    // binding, and propagation accretes frames outward.
    except::clear();
    let err = dispatch::binary(
        BinaryOp::Mtimes,
        &Value::Str("a".into()),
        &Value::Str("b".into()),
    )
    .unwrap_err();
    assert_eq!(err.id, "matte:undefined-function");
    assert!(err.msg.contains("String"));

    let mut caught = err.clone();
    caught.add_call("prog.m", "main", 7);
    assert_eq!(caught.stack.last().unwrap().func, "main");

    // addCause chains a secondary failure onto the bound value
    let secondary = matte_core::Exception::new("matte:size-mismatch", "operand sizes do not match");
    caught.add_cause(&secondary);
    assert_eq!(caught.causes.len(), 1);
    except::clear();
}

#[test]
#[serial]
fn truth_drives_control_flow_for_arrays() {
    // while/if conditions require every element true
    except::clear();
    let all = Value::Vector(vec![1.0, 2.0, 3.0]);
    let some = Value::Vector(vec![1.0, 0.0, 3.0]);
    assert_eq!(display::truth(&all), Some(true));
    assert_eq!(display::truth(&some), Some(false));

    // the truth of an equality chain: x == x is elementwise ones
    let eq = dispatch::binary(BinaryOp::Eq, &all, &all).unwrap();
    assert_eq!(display::truth(&eq), Some(true));
}

#[test]
#[serial]
fn zone_reclaims_loop_scratch_values() {
    except::clear();
    let mut zone = Zone::with_capacity(4);

    let mut held = Vec::new();
    for i in 0..16 {
        held.push(zone.alloc(Value::Int(i)));
    }
    assert_eq!(zone.live(), 16);

    for p in held {
        zone.free(p);
    }
    assert_eq!(zone.live(), 0);

    // freed cells are zeroed and reused before any new block grows
    let before = zone.capacity();
    let _ = zone.alloc(Value::Float(1.0));
    assert_eq!(zone.capacity(), before);
}
