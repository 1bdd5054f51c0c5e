//! C code generation.
//!
//! The emitter walks the resolved tree and produces one self-contained C
//! translation unit: a preamble declaring the runtime ABI, the global
//! declarations and their initializer, one C function per user function,
//! the `matte_main` body for top-level statements, and (except in
//! in-memory mode) a `main` entry point.
//!
//! # Module structure
//!
//! - `state.rs`: the `CodeGen` state and shared helpers
//! - `program.rs`: globals, function bodies, `matte_main`
//! - `statements.rs`: statement dispatch and expression emission
//! - `control_flow.rs`: try/if/switch/for/while/until
//! - `runtime.rs`: the emitted preamble (runtime declarations, macros)
//! - `error.rs`: error type

mod control_flow;
mod error;
mod program;
mod runtime;
mod state;
mod statements;

pub use error::CodeGenError;
pub use runtime::PREAMBLE;
pub use state::CodeGen;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver;

    fn emit(src: &str) -> String {
        matte_core::except::clear();
        let mut p = Parser::new();
        assert!(p.parse_string(src), "parse failed for {src:?}");
        let tree = p.tree().unwrap();
        resolver::simplify_concats(&mut p.ast, Some(tree));
        assert!(resolver::init_symbols(&mut p.ast, Some(tree)));
        assert!(resolver::resolve_symbols(&mut p.ast, Some(tree)));
        let out = CodeGen::new(&p.ast, true).emit(tree).expect("emission failed");
        assert!(
            !matte_core::except::check(),
            "emission reported: {:?}",
            matte_core::except::take()
        );
        out
    }

    fn emit_err(src: &str) -> matte_core::Exception {
        matte_core::except::clear();
        let mut p = Parser::new();
        assert!(p.parse_string(src), "parse failed for {src:?}");
        let tree = p.tree().unwrap();
        resolver::simplify_concats(&mut p.ast, Some(tree));
        assert!(resolver::init_symbols(&mut p.ast, Some(tree)));
        assert!(resolver::resolve_symbols(&mut p.ast, Some(tree)));
        let _ = CodeGen::new(&p.ast, true).emit(tree);
        matte_core::except::take().expect("expected an emission diagnostic")
    }

    #[test]
    fn arithmetic_dispatches_through_the_runtime() {
        let out = emit("x = 1 + 2;\n");
        assert!(out.contains("matte_object_plus(_z1,"));
        assert!(out.contains("matte_int_new(_z1, 1L)"));
        assert!(out.contains("matte_int_new(_z1, 2L)"));
        assert!(out.contains("MATTE_HANDLE("));
    }

    #[test]
    fn literal_dedup_constructs_each_literal_once() {
        let out = emit("x = 1; y = 1; z = 1.0;\n");
        assert_eq!(out.matches("matte_int_new(_z1, 1L)").count(), 1);
        assert_eq!(out.matches("matte_float_new(_z1,").count(), 1);
    }

    #[test]
    fn main_wrapper_reports_exceptions() {
        let out = emit("x = 1;\n");
        assert!(out.contains("MatteObject *matte_main (MatteZone *_z0, MatteObject *argin)"));
        assert!(out.contains("int main (int argc, char **argv)"));
        assert!(out.contains("matte_report_result(_ao)"));
    }

    #[test]
    fn in_memory_mode_omits_the_entry_point() {
        matte_core::except::clear();
        let mut p = Parser::new();
        assert!(p.parse_string("x = 1;\n"));
        let tree = p.tree().unwrap();
        resolver::simplify_concats(&mut p.ast, Some(tree));
        assert!(resolver::init_symbols(&mut p.ast, Some(tree)));
        assert!(resolver::resolve_symbols(&mut p.ast, Some(tree)));
        let out = CodeGen::new(&p.ast, false).emit(tree).unwrap();
        assert!(!out.contains("int main"));
        assert!(out.contains("matte_main"));
    }

    #[test]
    fn display_follows_the_statement_terminator() {
        let out = emit("x = 1\ny = 2;\n");
        assert!(out.contains("matte_object_display(_z1, x, \"x\")"));
        assert!(!out.contains("matte_object_display(_z1, y"));
    }

    #[test]
    fn temporaries_display_as_ans() {
        let out = emit("1 + 2\n");
        assert!(out.contains("\"ans\""));
    }

    #[test]
    fn for_loops_drive_an_iterator() {
        let out = emit("s = 0; for i = 1:3, s = s + i; end\n");
        assert!(out.contains("matte_object_colon(_z1,"));
        assert!(out.contains("_it = matte_iter_new(_z1,"));
        assert!(out.contains("while (matte_iter_next(_z1, _it))"));
        assert!(out.contains("i = matte_iter_value(_it);"));
        assert!(out.contains("matte_object_free(_z1, _it);"));
    }

    #[test]
    fn while_loops_break_on_falsehood() {
        let out = emit("while x < 3, x = x + 1; end\n");
        assert!(out.contains("while (1) {"));
        assert!(out.contains("matte_object_lt(_z1, x,"));
        assert!(out.contains("if (!matte_object_true("));
    }

    #[test]
    fn do_until_breaks_on_truth() {
        let out = emit("do, x = x + 1; until x\n");
        assert!(out.contains("while (1) {"));
        assert!(out.contains("if (matte_object_true(x)) break;"));
    }

    #[test]
    fn switch_compares_with_eq() {
        let out = emit("x = 1;\nswitch x\ncase 1, y = 1;\notherwise, y = 2;\nend\n");
        assert!(out.contains("_sw = matte_object_eq(_z1, x,"));
        assert!(out.contains("if (matte_object_true(_sw))"));
    }

    #[test]
    fn try_catch_branches_to_a_label() {
        let out = emit("try, x = 1 + 2; catch e, y = 1; end\n");
        assert!(out.contains("MATTE_CATCH("));
        assert!(out.contains("goto lbl"));
        assert!(out.contains("lbl0: ;"));
    }

    #[test]
    fn nested_try_is_rejected() {
        let e = emit_err("try, try, x = 1; catch a, y = 1; end\ncatch b, z = 1; end\n");
        assert_eq!(e.id, matte_core::except::ids::COMPILER);
    }

    #[test]
    fn break_outside_a_loop_is_rejected() {
        let e = emit_err("function f()\nbreak\nend\n");
        assert_eq!(e.id, matte_core::except::ids::COMPILER);
        assert!(e.msg.contains("break"), "message was: {}", e.msg);
        assert!(e.msg.contains("outside of a loop"));
    }

    #[test]
    fn break_inside_a_loop_is_accepted() {
        let out = emit("x = 1;\nwhile x, break, end\n");
        assert!(out.contains("break;"));
    }

    #[test]
    fn functions_get_prologue_and_epilogue() {
        let out = emit("function y = f(a, b)\ny = a + b;\nend\nz = 1;\n");
        assert!(out.contains("MatteObject *matte_f (MatteZone *_z0, MatteObject *argin)"));
        assert!(out.contains("MatteObject *a = matte_list_get(argin, 0);"));
        assert!(out.contains("MatteObject *b = matte_list_get(argin, 1);"));
        assert!(out.contains("MatteObject *y = NULL;"));
        assert!(out.contains("wrap:"));
        assert!(out.contains("argout = matte_list_argout(_z0, 1, (MatteObject *[]){ y });"));
        assert!(out.contains("matte_zone_destroy(_z1);"));
    }

    #[test]
    fn calls_pack_and_unpack_argument_lists() {
        let out = emit("function y = f(a)\ny = a;\nend\nx = f(41);\n");
        assert!(out.contains("_ai = matte_list_argin(_z1, 1, (MatteObject *[]){"));
        assert!(out.contains("_ao = matte_f(_z1, _ai);"));
        assert!(out.contains("x = matte_object_copy(_zg, matte_list_get(_ao, 0));"));
        assert!(out.contains("matte_object_free(_z1, _ai);"));
        assert!(out.contains("matte_object_free(_z1, _ao);"));
    }

    #[test]
    fn builtin_calls_resolve_to_runtime_functions() {
        let out = emit("disp(42);\n");
        assert!(out.contains("_ao = matte_disp(_z1, _ai);"));
    }

    #[test]
    fn globals_are_copied_into_the_global_zone() {
        let out = emit("x = 1;\n");
        assert!(out.contains("MatteObject *x = NULL;"));
        assert!(out.contains("x = matte_object_copy(_zg,"));
        assert!(out.contains("void initialize (void)"));
        assert!(out.contains("end = matte_int_new(_zg, -1L);"));
    }

    #[test]
    fn concatenation_emits_variadic_calls() {
        let out = emit("v = [1, 2, 3];\nm = [1, 2; 3, 4];\n");
        assert!(out.contains("matte_object_horzcat(_z1, 3, (MatteObject *[]){"));
        assert!(out.contains("matte_object_vertcat(_z1, 2, (MatteObject *[]){"));
    }

    #[test]
    fn compound_assignment_emits_the_binary_operation() {
        let out = emit("x = 1; x += 2;\n");
        assert!(out.contains("matte_object_plus(_z1, x,"));
    }

    #[test]
    fn string_literals_are_escaped() {
        let out = emit("s = 'a\"b';\n");
        assert!(out.contains("matte_string_new(_z1, \"a\\\"b\")"));
    }

    #[test]
    fn multi_return_unpacks_by_position() {
        let out = emit("function [u, v] = f()\nu = 1; v = 2;\nend\n[a, b] = f();\n");
        assert!(out.contains("matte_list_get(_ao, 0)"));
        assert!(out.contains("matte_list_get(_ao, 1)"));
        assert!(out.contains(
            "argout = matte_list_argout(_z0, 2, (MatteObject *[]){ u, v });"
        ));
    }
}
