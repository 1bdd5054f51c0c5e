//! Statement and expression emission.
//!
//! `write_statements` walks a statement list post-order: operand
//! expressions are emitted before the node that consumes them, each
//! fallible call is followed by an exception-check site, and statements
//! whose display flag is set are followed by a display call.

use std::fmt::Write;

use crate::ast::{NodeId, NodeKind};
use crate::token::Tok;

use super::{CodeGen, CodeGenError};

/// Overloadable operations: token kind, operand count, runtime function.
const OPERATORS: &[(Tok, usize, &str)] = &[
    (Tok::Plus, 2, "matte_object_plus"),
    (Tok::Minus, 2, "matte_object_minus"),
    (Tok::Minus, 1, "matte_object_uminus"),
    (Tok::ElemMul, 2, "matte_object_times"),
    (Tok::Mul, 2, "matte_object_mtimes"),
    (Tok::ElemDiv, 2, "matte_object_rdivide"),
    (Tok::ElemLdiv, 2, "matte_object_ldivide"),
    (Tok::Div, 2, "matte_object_mrdivide"),
    (Tok::Ldiv, 2, "matte_object_mldivide"),
    (Tok::ElemPow, 2, "matte_object_power"),
    (Tok::Pow, 2, "matte_object_mpower"),
    (Tok::Lt, 2, "matte_object_lt"),
    (Tok::Gt, 2, "matte_object_gt"),
    (Tok::Le, 2, "matte_object_le"),
    (Tok::Ge, 2, "matte_object_ge"),
    (Tok::Ne, 2, "matte_object_ne"),
    (Tok::Eq, 2, "matte_object_eq"),
    (Tok::ElemAnd, 2, "matte_object_and"),
    (Tok::ElemOr, 2, "matte_object_or"),
    (Tok::And, 2, "matte_object_mand"),
    (Tok::Or, 2, "matte_object_mor"),
    (Tok::Not, 1, "matte_object_not"),
    (Tok::Colon, 3, "matte_object_colon"),
    (Tok::Htr, 1, "matte_object_ctranspose"),
    (Tok::Tr, 1, "matte_object_transpose"),
];

impl CodeGen<'_> {
    /// Emit a statement or statement list.
    pub(super) fn write_statements(&mut self, node: Option<NodeId>) -> Result<(), CodeGenError> {
        let Some(node) = node else { return Ok(()) };

        match self.ast.kind(node) {
            NodeKind::Statements => {
                for i in 0..self.ast.n_down(node) {
                    self.write_statements(self.ast.get_down(node, i as isize))?;
                }
                return Ok(());
            }
            NodeKind::FnCall => {
                // evaluate the argument expressions first
                self.write_statements(self.ast.get_down(node, 1))?;
            }
            NodeKind::Function | NodeKind::Class => return Ok(()),
            _ => {
                if self.write_try(node)?
                    || self.write_if(node, 0)?
                    || self.write_switch(node, 0)?
                    || self.write_for(node)?
                    || self.write_while(node)?
                    || self.write_until(node)?
                {
                    return Ok(());
                }

                for i in 0..self.ast.n_down(node) {
                    self.write_statements(self.ast.get_down(node, i as isize))?;
                }
            }
        }

        if self.write_operation(node)?
            || self.write_concat(node)?
            || self.write_assign(node)?
            || self.write_call(node)?
            || self.write_flow(node)?
        {
            self.write_display(node)?;
        }
        Ok(())
    }

    /// A single dispatched operation, bound to the node's temporary.
    fn write_operation(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        let Some(tok) = self.ast.kind(node).tok() else {
            return Ok(false);
        };
        let n = self.ast.n_down(node);

        let Some((_, _, fname)) = OPERATORS
            .iter()
            .find(|(op, arity, _)| *op == tok && *arity == n)
        else {
            return Ok(false);
        };

        let operands: Vec<String> = (0..n)
            .map(|i| {
                self.ast
                    .get_down(node, i as isize)
                    .map_or("_unbound", |d| self.sym(d))
                    .to_owned()
            })
            .collect();
        let result = self.sym(node).to_owned();

        writeln!(
            self.out,
            "  MatteObject *{result} = {fname}(_z1, {});",
            operands.join(", ")
        )?;
        self.write_handler(&result, node)?;
        Ok(true)
    }

    /// Row and column concatenation through the variadic dispatchers.
    fn write_concat(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        let fname = match self.ast.kind(node) {
            NodeKind::Row => "matte_object_horzcat",
            NodeKind::Column => "matte_object_vertcat",
            _ => return Ok(false),
        };

        let n = self.ast.n_down(node);
        let elems: Vec<String> = (0..n)
            .map(|i| {
                self.ast
                    .get_down(node, i as isize)
                    .map_or("_unbound", |d| self.sym(d))
                    .to_owned()
            })
            .collect();
        let result = self.sym(node).to_owned();

        writeln!(
            self.out,
            "  MatteObject *{result} = {fname}(_z1, {n}, {});",
            Self::ptr_array(&elems)
        )?;
        self.write_handler(&result, node)?;
        Ok(true)
    }

    /// Assignment: globals copy into the global zone, locals just bind.
    fn write_assign(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if !self.ast.kind(node).is_tok(Tok::Assign) {
            return Ok(false);
        }

        let target = self.sym(node).to_owned();
        let rhs = self
            .ast
            .get_down(node, 1)
            .map_or("_unbound", |d| self.sym(d))
            .to_owned();

        if self.ast.has_global_symbol(node) {
            writeln!(self.out, "  {target} = matte_object_copy(_zg, {rhs});")?;
        } else {
            writeln!(self.out, "  {target} = {rhs};")?;
        }
        Ok(true)
    }

    /// Function call: pack the input packet, invoke, unpack outputs by
    /// position, release both packets.
    fn write_call(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        if self.ast.kind(node) != NodeKind::FnCall {
            return Ok(false);
        }

        // input packet from the callee's parenthesized arguments
        let callee = self.ast.get_down(node, 1).ok_or_else(|| {
            CodeGenError::Logic("call node without a callee".to_owned())
        })?;

        let paren = (self.ast.n_down(callee) == 1)
            .then(|| self.ast.first(callee))
            .flatten()
            .filter(|p| self.ast.kind(*p).is_tok(Tok::ParenOpen));

        match paren {
            Some(paren) => {
                let n = self.ast.n_down(paren);
                let args: Vec<String> = (0..n)
                    .map(|i| {
                        self.ast
                            .get_down(paren, i as isize)
                            .map_or("_unbound", |d| self.sym(d))
                            .to_owned()
                    })
                    .collect();
                writeln!(
                    self.out,
                    "  _ai = matte_list_argin(_z1, {n}, {});",
                    Self::ptr_array(&args)
                )?;
            }
            None => writeln!(self.out, "  _ai = matte_list_argin(_z1, 0, NULL);")?,
        }

        let fname = self
            .ast
            .get_string(callee)
            .ok_or_else(|| CodeGenError::Logic("call to an unnamed function".to_owned()))?
            .to_owned();
        writeln!(self.out, "  _ao = matte_{fname}(_z1, _ai);")?;
        self.write_handler("_ao", callee)?;

        // unpack outputs into the call's target(s)
        let target = self.ast.get_down(node, 0).ok_or_else(|| {
            CodeGenError::Logic("call node without a target".to_owned())
        })?;

        if self.ast.kind(target).is_tok(Tok::Ident) {
            let name = self.sym(target).to_owned();
            if self.ast.has_global_symbol(target) {
                writeln!(
                    self.out,
                    "  {name} = matte_object_copy(_zg, matte_list_get(_ao, 0));"
                )?;
            } else {
                let decl = if name.starts_with('_') { "MatteObject *" } else { "" };
                writeln!(self.out, "  {decl}{name} = matte_list_get(_ao, 0);")?;
            }
        } else if self.ast.kind(target) == NodeKind::Row {
            for i in 0..self.ast.n_down(target) {
                let Some(t) = self.ast.get_down(target, i as isize) else {
                    continue;
                };
                let name = self.sym(t).to_owned();
                if self.ast.has_global_symbol(t) {
                    writeln!(
                        self.out,
                        "  {name} = matte_object_copy(_zg, matte_list_get(_ao, {i}));"
                    )?;
                } else {
                    writeln!(self.out, "  {name} = matte_list_get(_ao, {i});")?;
                }
            }
        }

        writeln!(self.out, "  matte_object_free(_z1, _ai);")?;
        writeln!(self.out, "  matte_object_free(_z1, _ao);")?;
        Ok(true)
    }

    /// break/continue (loop-only) and return.
    pub(super) fn write_flow(&mut self, node: NodeId) -> Result<bool, CodeGenError> {
        let Some(tok) = self.ast.kind(node).tok() else {
            return Ok(false);
        };

        // find an enclosing loop for break/continue validation
        let mut loop_node = Some(node);
        while let Some(at) = loop_node {
            if matches!(
                self.ast.kind(at),
                NodeKind::Tok(Tok::For) | NodeKind::Tok(Tok::While) | NodeKind::Tok(Tok::Until)
            ) {
                break;
            }
            loop_node = self.ast.node(at).up;
        }

        match tok {
            Tok::Break => {
                if loop_node.is_none() {
                    self.asterr(node, "found 'break' outside of a loop".to_owned());
                    return Ok(false);
                }
                writeln!(self.out, "  break;")?;
            }
            Tok::Continue => {
                if loop_node.is_none() {
                    self.asterr(node, "found 'continue' outside of a loop".to_owned());
                    return Ok(false);
                }
                writeln!(self.out, "  continue;")?;
            }
            Tok::Return => {
                writeln!(self.out, "  goto wrap;")?;
            }
            _ => {}
        }
        Ok(false)
    }

    /// Display handler for statements with the display flag set.
    pub(super) fn write_display(&mut self, node: NodeId) -> Result<(), CodeGenError> {
        if !self.ast.node(node).disp {
            return Ok(());
        }

        let name = self.sym(node).to_owned();
        let label = if self.is_temp(node) { "ans" } else { &name };
        let file = self.ast.file_name(node).to_owned();
        let func = self.ast.get_func(node).to_owned();
        let line = self.ast.node(node).line;

        writeln!(
            self.out,
            "  if (!matte_object_display(_z1, {name}, \"{label}\")) {{\n\
             \x20   MatteObject *_e = matte_except_propagate(_z0, matte_exceptions_get(_z0), \
             \"{file}\", \"{func}\", {line});\n\
             \x20   matte_zone_destroy(_z1);\n\
             \x20   return _e;\n\
             \x20 }}"
        )?;
        Ok(())
    }
}
