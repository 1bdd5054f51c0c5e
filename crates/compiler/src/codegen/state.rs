//! Emitter state and shared helpers.

use std::fmt::Write;

use matte_core::except::ids;

use crate::ast::{Ast, NodeId};
use crate::symbols::SymbolType;

use super::CodeGenError;

pub struct CodeGen<'a> {
    pub(super) ast: &'a Ast,
    pub(super) out: String,
    /// Append the C `main` wrapper (false for the in-memory mode).
    pub(super) entry_point: bool,
    /// Inside a try body, exception checks branch instead of returning.
    pub(super) catching: bool,
    pub(super) catch_var: Option<String>,
    pub(super) catch_label: String,
    pub(super) label_idx: usize,
}

impl<'a> CodeGen<'a> {
    pub fn new(ast: &'a Ast, entry_point: bool) -> CodeGen<'a> {
        let mut cg = CodeGen {
            ast,
            out: String::new(),
            entry_point,
            catching: false,
            catch_var: None,
            catch_label: String::new(),
            label_idx: 0,
        };
        cg.new_label();
        cg
    }

    /// Emit the whole translation unit.
    pub fn emit(mut self, tree: NodeId) -> Result<String, CodeGenError> {
        self.out.push_str(super::runtime::PREAMBLE);
        self.write_globals(tree)?;
        self.write_functions(tree)?;
        self.write_main(tree)?;
        Ok(self.out)
    }

    pub(super) fn new_label(&mut self) {
        self.catch_label = format!("lbl{}", self.label_idx);
        self.label_idx += 1;
    }

    /// Name of the symbol bound to `node`.
    pub(super) fn sym(&self, node: NodeId) -> &str {
        self.ast.symbol_name(node).unwrap_or("_unbound")
    }

    /// Whether `node`'s result displays under `ans`.
    pub(super) fn is_temp(&self, node: NodeId) -> bool {
        self.ast
            .symbol_type(node)
            .is_some_and(|ty| ty.has(SymbolType::TEMP))
    }

    /// Record an emission diagnostic at `node`'s source coordinates.
    pub(super) fn asterr(&self, node: NodeId, msg: String) {
        matte_core::except::add(
            self.ast.file_name(node),
            self.ast.get_func(node),
            self.ast.node(node).line as u64,
            ids::COMPILER,
            msg,
        );
    }

    /// Exception-check site for `var`, tagged with `node`'s coordinates.
    pub(super) fn write_handler(&mut self, var: &str, node: NodeId) -> Result<(), CodeGenError> {
        let file = self.ast.file_name(node).to_owned();
        let func = self.ast.get_func(node).to_owned();
        let line = self.ast.node(node).line;
        if self.catching {
            let cvar = self.catch_var.clone().unwrap_or_default();
            writeln!(
                self.out,
                "  MATTE_CATCH({var}, {cvar}, {lbl}, \"{file}\", \"{func}\", {line});",
                lbl = self.catch_label
            )?;
        } else {
            writeln!(self.out, "  MATTE_HANDLE({var}, \"{file}\", \"{func}\", {line});")?;
        }
        Ok(())
    }

    /// Escape a string for inclusion in a C string literal.
    pub(super) fn c_escape(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\t' => out.push_str("\\t"),
                '\r' => out.push_str("\\r"),
                c if (c as u32) < 0x20 => {
                    out.push_str(&format!("\\x{:02x}", c as u32));
                }
                c => out.push(c),
            }
        }
        out
    }

    /// A `(MatteObject *[]){ ... }` compound literal, or `NULL` when the
    /// element list is empty.
    pub(super) fn ptr_array(names: &[String]) -> String {
        if names.is_empty() {
            "NULL".to_owned()
        } else {
            format!("(MatteObject *[]){{ {} }}", names.join(", "))
        }
    }
}
