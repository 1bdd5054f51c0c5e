//! Compound-statement emission: try/catch, if, switch, for, while and
//! do/until.

use std::fmt::Write;

use crate::ast::NodeId;
use crate::token::Tok;

use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    /// try/catch: the try body's exception checks branch to a catch
    /// label, binding the exception value to the catch variable. Nesting
    /// a try inside a try body is rejected.
    pub(super) fn write_try(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::Try) {
            return Ok(false);
        }

        // reject try within an enclosing try body
        let mut up = self.ast.node(node).up;
        while let Some(at) = up {
            if self.ast.kind(at).is_tok(Tok::Try) {
                if let Some(body) = self.ast.get_down(at, 0) {
                    if self.ast.contains(body, node) {
                        self.asterr(node, "nested 'try' blocks are not supported".to_owned());
                        return Ok(false);
                    }
                }
            }
            up = self.ast.node(at).up;
        }

        let var = self.ast.get_down(node, 1).ok_or_else(|| {
            CodeGenError::Logic("try block without a catch variable".to_owned())
        })?;
        self.catch_var = Some(self.sym(var).to_owned());

        self.catching = true;
        self.write_statements(self.ast.get_down(node, 0))?;
        self.catching = false;

        // normal flow jumps over the catch block
        let catch_entry = self.catch_label.clone();
        self.new_label();
        let over = self.catch_label.clone();
        writeln!(self.out, "  goto {over};\n{catch_entry}: ;")?;

        let catch_exit = self.catch_label.clone();
        self.new_label();

        self.write_statements(self.ast.get_down(node, 2))?;
        writeln!(self.out, "{catch_exit}: ;")?;

        self.catch_var = None;
        Ok(true)
    }

    /// if/elseif/else as a cascade of nested conditionals over the
    /// `(cond, body)*` child pairs; a null condition marks the else.
    pub(super) fn write_if(&mut self, node: NodeId, at: usize) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::If) {
            return Ok(false);
        }
        if at >= self.ast.n_down(node) {
            return Ok(true);
        }

        let cond = self.ast.get_down(node, at as isize);
        let body = self.ast.get_down(node, at as isize + 1);

        match cond {
            Some(cond) => {
                self.write_statements(Some(cond))?;
                let cond_sym = self.sym(cond).to_owned();
                writeln!(self.out, "  if (matte_object_true({cond_sym})) {{")?;
                self.write_statements(body)?;
                writeln!(self.out, "  }}")?;

                if self.ast.n_down(node) == at + 2 {
                    return Ok(true);
                }

                writeln!(self.out, "  else {{")?;
                self.write_if(node, at + 2)?;
                writeln!(self.out, "  }}")?;
            }
            None => {
                self.write_statements(body)?;
            }
        }
        Ok(true)
    }

    /// switch: evaluate the scrutinee once, then compare each case value
    /// with `==` and branch on its truth; `otherwise` is the final else.
    pub(super) fn write_switch(&mut self, node: NodeId, at: usize) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::Switch) {
            return Ok(false);
        }
        if at >= self.ast.n_down(node) {
            return Ok(true);
        }

        let expr = self.ast.get_down(node, 0);
        if at == 0 {
            self.write_statements(expr)?;
            self.write_switch(node, 1)?;
            return Ok(true);
        }

        let expr = expr.ok_or_else(|| {
            CodeGenError::Logic("switch without a scrutinee".to_owned())
        })?;
        let value = self.ast.get_down(node, at as isize);
        let body = self.ast.get_down(node, at as isize + 1);

        match value {
            Some(value) => {
                self.write_statements(Some(value))?;
                let expr_sym = self.sym(expr).to_owned();
                let value_sym = self.sym(value).to_owned();
                writeln!(self.out, "  _sw = matte_object_eq(_z1, {expr_sym}, {value_sym});")?;
                self.write_handler("_sw", value)?;
                writeln!(
                    self.out,
                    "  if (matte_object_true(_sw)) {{\n  matte_object_free(_z1, _sw);"
                )?;
                self.write_statements(body)?;
                writeln!(self.out, "  }}")?;

                writeln!(self.out, "  else {{\n  matte_object_free(_z1, _sw);")?;
                self.write_switch(node, at + 2)?;
                writeln!(self.out, "  }}")?;
            }
            None => {
                self.write_statements(body)?;
            }
        }
        Ok(true)
    }

    /// for: evaluate the iteration expression, build an iterator, then
    /// advance/bind/execute until exhaustion.
    pub(super) fn write_for(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::For) {
            return Ok(false);
        }

        let var = self.ast.get_down(node, 0).ok_or_else(|| {
            CodeGenError::Logic("for loop without a variable".to_owned())
        })?;
        let expr = self.ast.get_down(node, 1).ok_or_else(|| {
            CodeGenError::Logic("for loop without an iteration expression".to_owned())
        })?;

        // loop values for a global variable live in the global zone
        let itzone = if self.ast.has_global_symbol(var) { "_zg" } else { "_z1" };

        self.write_statements(Some(expr))?;

        let expr_sym = self.sym(expr).to_owned();
        writeln!(self.out, "  _it = matte_iter_new(_z1, {expr_sym});")?;
        self.write_handler("_it", var)?;

        let var_sym = self.sym(var).to_owned();
        writeln!(self.out, "  while (matte_iter_next({itzone}, _it)) {{")?;
        writeln!(self.out, "  {var_sym} = matte_iter_value(_it);")?;
        self.write_handler(&var_sym, var)?;

        self.write_statements(self.ast.get_down(node, 2))?;
        writeln!(self.out, "  }}")?;

        writeln!(self.out, "  matte_object_free(_z1, _it);")?;
        Ok(true)
    }

    /// while: infinite loop with an embedded condition evaluation and a
    /// break on falsehood.
    pub(super) fn write_while(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::While) {
            return Ok(false);
        }

        let cond = self.ast.get_down(node, 0).ok_or_else(|| {
            CodeGenError::Logic("while loop without a condition".to_owned())
        })?;

        writeln!(self.out, "  while (1) {{")?;
        self.write_statements(Some(cond))?;
        let cond_sym = self.sym(cond).to_owned();
        writeln!(self.out, "  if (!matte_object_true({cond_sym})) break;")?;
        self.write_statements(self.ast.get_down(node, 1))?;
        writeln!(self.out, "  }}")?;
        Ok(true)
    }

    /// do/until: body first, then the condition; break on truth.
    pub(super) fn write_until(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::Until) {
            return Ok(false);
        }

        let cond = self.ast.get_down(node, 1).ok_or_else(|| {
            CodeGenError::Logic("do/until loop without a condition".to_owned())
        })?;

        writeln!(self.out, "  while (1) {{")?;
        self.write_statements(self.ast.get_down(node, 0))?;
        self.write_statements(Some(cond))?;
        let cond_sym = self.sym(cond).to_owned();
        writeln!(self.out, "  if (matte_object_true({cond_sym})) break;")?;
        writeln!(self.out, "  }}")?;
        Ok(true)
    }
}
