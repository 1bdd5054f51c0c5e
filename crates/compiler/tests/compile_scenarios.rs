//! End-to-end pipeline scenarios: source text in, emitted C out.

use mattec::{CompileMode, Compiler, CompilerConfig};

fn emit(src: &str) -> String {
    matte_core::except::clear();
    let mut c = Compiler::new(CompilerConfig::new());
    assert!(c.add_string(src), "parse failed for {src:?}");
    let out = c.emit().expect("emission failed");
    assert!(
        !matte_core::except::check(),
        "emission reported: {:?}",
        matte_core::except::take()
    );
    out
}

fn emit_failure(src: &str) -> matte_core::Exception {
    matte_core::except::clear();
    let mut c = Compiler::new(CompilerConfig::new());
    assert!(c.add_string(src), "parse failed for {src:?}");
    let _ = c.execute();
    matte_core::except::take().expect("expected a diagnostic")
}

#[test]
fn literal_deduplication_constructs_shared_literals_once() {
    // x = 1; y = 1; z = 1.0;  =>  one Int literal, one Float literal
    let out = emit("x = 1; y = 1; z = 1.0;\n");
    assert_eq!(out.matches("matte_int_new(_z1, 1L)").count(), 1);
    assert_eq!(out.matches("matte_float_new(_z1,").count(), 1);
}

#[test]
fn compound_assignment_is_equivalent_to_its_expansion() {
    // x += 2 and x = x + 2 produce byte-identical programs
    let sugar = emit("x = 1; x += 2;\n");
    let plain = emit("x = 1; x = x + 2;\n");
    assert_eq!(sugar, plain);
}

#[test]
fn colon_normalization_shares_the_synthesized_step() {
    // a = 1:10 gains step 1, which interns with the literal 1
    let out = emit("a = 1:10;\n");
    assert_eq!(out.matches("matte_int_new(_z1, 1L)").count(), 1);

    // the colon call names the same symbol for begin and step
    let call_at = out.find("matte_object_colon(_z1, ").expect("no colon call");
    let args: Vec<&str> = out[call_at..]
        .split_once('(')
        .unwrap()
        .1
        .split_once(')')
        .unwrap()
        .0
        .split(", ")
        .collect();
    assert_eq!(args.len(), 4, "zone + three operands, got {args:?}");
    assert_eq!(args[1], args[2], "begin and step should share one literal symbol");
}

#[test]
fn for_over_a_range_drives_the_iterator_protocol() {
    let out = emit("s = 0; for i = 1:3, s = s + i; end\n");
    let colon_at = out.find("matte_object_colon").unwrap();
    let iter_at = out.find("matte_iter_new").unwrap();
    let next_at = out.find("matte_iter_next").unwrap();
    let free_at = out.find("matte_object_free(_z1, _it)").unwrap();
    assert!(colon_at < iter_at && iter_at < next_at && next_at < free_at);

    // the loop body accumulates through dispatched addition
    assert!(out.contains("matte_object_plus(_z1, s, i)"));
    // s is a global at top level, so the binding copies into the
    // global zone
    assert!(out.contains("s = matte_object_copy(_zg,"));
}

#[test]
fn try_catch_binds_the_dispatched_exception() {
    let out = emit("try, x = 1 / 0; catch e, y = e; end\n");
    // inside the try body the division's check branches to the catch
    // label with the catch variable
    assert!(out.contains("matte_object_mrdivide(_z1,"));
    assert!(out.contains("MATTE_CATCH("));
    assert!(out.contains(", e, lbl0,"));
    // the catch body aliases the bound exception
    assert!(out.contains("y = matte_object_copy(_zg, e);"));
}

#[test]
fn outside_loop_break_fails_compilation() {
    let e = emit_failure("function f(), break, end\n");
    assert_eq!(e.id, "matte:compiler");
    assert!(e.msg.contains("'break' outside of a loop"), "msg: {}", e.msg);
    // the frame names the enclosing function
    assert_eq!(e.stack[0].func, "f");
}

#[test]
fn merged_files_share_the_global_scope() {
    matte_core::except::clear();
    let mut c = Compiler::new(CompilerConfig::new());
    assert!(c.add_string("function y = twice(a)\ny = a + a;\nend\n"));
    assert!(c.add_string("x = twice(21);\n"));
    let out = c.emit().expect("emission failed");
    assert!(out.contains("MatteObject *matte_twice (MatteZone *_z0, MatteObject *argin)"));
    assert!(out.contains("_ao = matte_twice(_z1, _ai);"));
}

#[test]
fn undefined_symbols_stop_the_pipeline() {
    matte_core::except::clear();
    let mut c = Compiler::new(CompilerConfig::new());
    assert!(c.add_string("x = undefined_thing;\n"));
    assert!(c.execute().is_err());
    let e = matte_core::except::take().unwrap();
    assert_eq!(e.id, "matte:undefined-symbol");
}

#[test]
fn classdef_registers_but_emits_nothing() {
    let out = emit("classdef Point\nproperties\nx\ny\nend\nend\nq = 1;\n");
    assert!(!out.contains("Point"));
    assert!(out.contains("matte_main"));
}

#[test]
fn to_c_mode_respects_an_explicit_output_name() {
    matte_core::except::clear();
    let dir = std::env::temp_dir();
    let out_path = dir.join("matte_scenario_out.c");

    let mut c = Compiler::new(CompilerConfig::new());
    c.set_mode(CompileMode::ToC);
    c.set_outfile(&out_path);
    assert!(c.add_string("x = 2 + 3;\n"));
    c.execute().expect("to_c failed");

    let text = std::fs::read_to_string(&out_path).expect("missing output");
    assert!(text.contains("matte_object_plus"));
    std::fs::remove_file(&out_path).ok();
}

#[test]
fn matrix_program_emits_both_concatenations() {
    let out = emit("m = [1, 2; 3, 4];\nv = [5, 6];\n");
    assert!(out.contains("matte_object_horzcat"));
    assert!(out.contains("matte_object_vertcat"));
}

#[test]
fn complex_literals_flow_through_to_constructors() {
    let out = emit("z = 2i;\nw = 1 + 2i;\n");
    assert!(out.contains("matte_complex_new(_z1, 0e0, 2e0)"));
    // the two uses of 2i intern to a single construction
    assert_eq!(out.matches("matte_complex_new(_z1,").count(), 1);
}
