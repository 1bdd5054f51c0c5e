//! Program-level emission: globals, user functions and `matte_main`.

use std::fmt::Write;

use crate::ast::{NodeId, NodeKind};
use crate::symbols::{SymbolData, SymbolType, SymbolTable};

use super::{CodeGen, CodeGenError};

impl CodeGen<'_> {
    /// Global declarations: prototypes for every function symbol, one
    /// pointer per global variable and global literal, and the
    /// `initialize` function that sets up the global zone.
    pub(super) fn write_globals(&mut self, tree: NodeId) -> Result<(), CodeGenError> {
        let Some(gid) = self.ast.node(tree).syms else {
            return Err(CodeGenError::Logic("tree has no global table".to_owned()));
        };
        let globals = &self.ast.tables[gid];

        let mut decls = String::new();
        for row in globals.rows() {
            if !row.ty.has(SymbolType::FUNC) {
                continue;
            }
            writeln!(
                decls,
                "MatteObject *matte_{} (MatteZone *z, MatteObject *argin);",
                row.name
            )?;
        }

        writeln!(decls, "\nMatteZone *_zg = NULL;\n")?;

        for row in globals.rows() {
            if row.ty.has(SymbolType::VAR)
                && row.ty.has(SymbolType::GLOBAL)
                && !row.ty.has(SymbolType::TEMP)
            {
                writeln!(decls, "MatteObject *{} = NULL;", row.name)?;
            }
        }
        for row in globals.rows() {
            if row.ty.has(SymbolType::LITERAL) && row.ty.has(SymbolType::GLOBAL) {
                writeln!(decls, "MatteObject *{} = NULL;", row.name)?;
            }
        }

        // global literals are constructed once, in the global zone
        writeln!(
            decls,
            "\nvoid initialize (void) {{\n  if (_zg) return;\n  _zg = matte_zone_create({});",
            globals.len()
        )?;
        for row in globals.rows() {
            if !row.ty.has(SymbolType::GLOBAL) {
                continue;
            }
            match &row.data {
                SymbolData::Int(v) => {
                    writeln!(decls, "  {} = matte_int_new(_zg, {v}L);", row.name)?;
                }
                SymbolData::Float(v) => {
                    writeln!(decls, "  {} = matte_float_new(_zg, {v:e});", row.name)?;
                }
                SymbolData::Complex(v) => {
                    writeln!(
                        decls,
                        "  {} = matte_complex_new(_zg, {:e}, {:e});",
                        row.name, v.re, v.im
                    )?;
                }
                SymbolData::Str(v) => {
                    writeln!(
                        decls,
                        "  {} = matte_string_new(_zg, \"{}\");",
                        row.name,
                        Self::c_escape(v)
                    )?;
                }
                SymbolData::None => {}
            }
        }
        writeln!(decls, "}}\n")?;

        self.out.push_str(&decls);
        Ok(())
    }

    /// Per-function bindings: input arguments extracted by position,
    /// local variables initialized to no-value, and literal
    /// constructions.
    fn write_symbols(&mut self, table: &SymbolTable) -> Result<(), CodeGenError> {
        let mut out = String::new();

        let mut argi = 0;
        for row in table.rows() {
            if !row.ty.has(SymbolType::ARGIN) {
                continue;
            }
            writeln!(out, "  MatteObject *{} = matte_list_get(argin, {argi});", row.name)?;
            argi += 1;
        }

        writeln!(out)?;
        for row in table.rows() {
            if !row.ty.has(SymbolType::VAR)
                || row.ty.has(SymbolType::GLOBAL)
                || row.ty.has(SymbolType::TEMP)
            {
                continue;
            }
            writeln!(out, "  MatteObject *{} = NULL;", row.name)?;
        }

        writeln!(out)?;
        for row in table.rows() {
            if row.ty.has(SymbolType::GLOBAL) {
                continue;
            }
            match &row.data {
                SymbolData::Int(v) => {
                    writeln!(out, "  MatteObject *{} = matte_int_new(_z1, {v}L);", row.name)?;
                }
                SymbolData::Float(v) => {
                    writeln!(out, "  MatteObject *{} = matte_float_new(_z1, {v:e});", row.name)?;
                }
                SymbolData::Complex(v) => {
                    writeln!(
                        out,
                        "  MatteObject *{} = matte_complex_new(_z1, {:e}, {:e});",
                        row.name, v.re, v.im
                    )?;
                }
                SymbolData::Str(v) => {
                    writeln!(
                        out,
                        "  MatteObject *{} = matte_string_new(_z1, \"{}\");",
                        row.name,
                        Self::c_escape(v)
                    )?;
                }
                SymbolData::None => {}
            }
        }

        self.out.push_str(&out);
        Ok(())
    }

    /// Emit every user-defined function under the root.
    pub(super) fn write_functions(&mut self, tree: NodeId) -> Result<(), CodeGenError> {
        for i in 0..self.ast.n_down(tree) {
            let Some(node) = self.ast.get_down(tree, i as isize) else {
                continue;
            };
            if self.ast.kind(node) != NodeKind::Function {
                continue;
            }

            let Some(tid) = self.ast.node(node).syms else {
                return Err(CodeGenError::Logic("function without a symbol table".to_owned()));
            };
            let name = self
                .ast
                .get_down(node, 1)
                .and_then(|n| self.ast.get_string(n))
                .ok_or_else(|| CodeGenError::Logic("unnamed function".to_owned()))?
                .to_owned();

            writeln!(
                self.out,
                "MatteObject *matte_{name} (MatteZone *_z0, MatteObject *argin) {{\n\
                 \x20 MatteZone *_z1 = matte_zone_create({});\n\
                 \x20 MatteObject *argout = NULL;\n",
                self.ast.tables[tid].len()
            )?;

            self.write_symbols(&self.ast.tables[tid])?;

            writeln!(self.out)?;
            self.write_statements(self.ast.get_down(node, 3))?;

            writeln!(self.out, "\nwrap:")?;

            match self.ast.get_down(node, 0) {
                None => {
                    writeln!(self.out, "  argout = matte_list_argout(_z0, 0, NULL);")?;
                }
                Some(argout) if self.ast.n_down(argout) > 0 => {
                    let names: Vec<String> = (0..self.ast.n_down(argout))
                        .filter_map(|j| self.ast.get_down(argout, j as isize))
                        .filter_map(|n| self.ast.get_string(n).map(str::to_owned))
                        .collect();
                    writeln!(
                        self.out,
                        "  argout = matte_list_argout(_z0, {}, {});",
                        names.len(),
                        Self::ptr_array(&names)
                    )?;
                }
                Some(argout) => {
                    let name = self.sym(argout).to_owned();
                    writeln!(
                        self.out,
                        "  argout = matte_list_argout(_z0, 1, (MatteObject *[]){{ {name} }});"
                    )?;
                }
            }

            writeln!(self.out, "  matte_zone_destroy(_z1);\n  return argout;\n}}\n")?;
        }
        Ok(())
    }

    /// `matte_main`: global statements in order, plus the C entry point
    /// unless the caller loads the module directly.
    pub(super) fn write_main(&mut self, tree: NodeId) -> Result<(), CodeGenError> {
        let Some(gid) = self.ast.node(tree).syms else {
            return Err(CodeGenError::Logic("tree has no global table".to_owned()));
        };

        writeln!(
            self.out,
            "MatteObject *matte_main (MatteZone *_z0, MatteObject *argin) {{\n\
             \x20 MatteZone *_z1 = matte_zone_create({});\n\
             \x20 initialize();\n",
            self.ast.tables[gid].len()
        )?;

        self.write_symbols(&self.ast.tables[gid])?;

        writeln!(self.out)?;
        for i in 0..self.ast.n_down(tree) {
            self.write_statements(self.ast.get_down(tree, i as isize))?;
        }

        writeln!(self.out, "wrap:\n  matte_zone_destroy(_z1);\n  return end;\n}}\n")?;

        if self.entry_point {
            self.out.push_str(super::runtime::ENTRY_POINT);
        }
        Ok(())
    }
}
