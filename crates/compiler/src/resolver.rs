//! Semantic passes over the merged tree.
//!
//! Three passes run in order: [`simplify_concats`] rewrites trivial
//! row/column wrappers away, [`init_symbols`] builds and populates the
//! symbol tables, and [`resolve_symbols`] binds identifier uses to
//! symbol rows and reshapes function-call sites.
//!
//! Diagnostics accumulate in the process-wide exception slot; a pass
//! returning `false` has recorded at least one failure there.

use matte_core::except::ids;
use matte_runtime::builtins::BUILTIN_FUNCTIONS;

use crate::ast::{Ast, NodeData, NodeId, NodeKind};
use crate::symbols::{SymbolData, SymbolType};
use crate::token::Tok;

/// Record a compile diagnostic at `node`'s source coordinates.
macro_rules! asterr {
    ($ast:expr, $node:expr, $id:expr, $($fmt:tt)+) => {{
        matte_core::except::add(
            $ast.file_name($node),
            $ast.get_func($node),
            $ast.node($node).line as u64,
            $id,
            format!($($fmt)+),
        );
        return false;
    }};
}

/// Collapse trivial concatenation wrappers, post-order:
/// a COLUMN of one ROW becomes the ROW, and a ROW of one non-colon
/// expression becomes the expression. A ROW around a single colon stays:
/// it carries range-as-element semantics into concatenation.
pub fn simplify_concats(ast: &mut Ast, node: Option<NodeId>) {
    let Some(node) = node else { return };

    match ast.kind(node) {
        NodeKind::Column => {
            if ast.n_down(node) == 1
                && ast.first(node).is_some_and(|d| ast.kind(d) == NodeKind::Row)
            {
                let replacement = ast.rip(node);
                simplify_concats(ast, replacement);
                return;
            }
        }
        NodeKind::Row => {
            if ast.n_down(node) == 1
                && ast.first(node).is_some_and(|d| !ast.kind(d).is_tok(Tok::Colon))
            {
                let replacement = ast.rip(node);
                simplify_concats(ast, replacement);
                return;
            }
        }
        _ => {}
    }

    for i in 0..ast.n_down(node) {
        simplify_concats(ast, ast.get_down(node, i as isize));
    }
}

/// Register the compiler's built-ins with the global table: the `end`
/// global integer and the runtime's builtin functions.
fn init_builtins(ast: &mut Ast, root: NodeId) -> bool {
    let Some(gid) = ast.node(root).syms else {
        return false;
    };
    ast.tables[gid].add(SymbolType::GLOBAL_INT, Some("end"), SymbolData::Int(-1));
    for name in BUILTIN_FUNCTIONS {
        ast.tables[gid].add(SymbolType::GLOBAL_FUNC, Some(name), SymbolData::None);
    }
    true
}

/// Declare every symbol the tree defines, allocating tables at scope
/// roots and interning literals along the way.
pub fn init_symbols(ast: &mut Ast, node: Option<NodeId>) -> bool {
    let Some(node) = node else { return true };

    let kind = ast.kind(node);

    // variables declared at root scope are globals
    let mut vartype = SymbolType::VAR;
    if ast.get_symbols(node).is_some() && ast.get_symbols(node) == ast.get_globals(node) {
        vartype = vartype | SymbolType::GLOBAL;
    }

    if matches!(kind, NodeKind::Root | NodeKind::Class | NodeKind::Function) {
        ast.new_table(node);
    }

    if kind == NodeKind::Root && !init_builtins(ast, node) {
        return false;
    }

    match kind {
        NodeKind::Class => {
            let Some(name) = ast.first(node) else {
                return false;
            };
            if !ast.add_symbol(name, name, SymbolType::GLOBAL_CLASS) {
                return false;
            }
            true
        }

        NodeKind::Function => {
            // input arguments
            if let Some(argin) = ast.get_down(node, 2) {
                for i in 0..ast.n_down(argin) {
                    let Some(arg) = ast.get_down(argin, i as isize) else {
                        continue;
                    };
                    if !ast.add_symbol(arg, arg, SymbolType::ARGIN) {
                        return false;
                    }
                }
            }

            // output arguments, single or multiple
            if let Some(argout) = ast.get_down(node, 0) {
                if ast.n_down(argout) > 0 {
                    for i in 0..ast.n_down(argout) {
                        let Some(arg) = ast.get_down(argout, i as isize) else {
                            continue;
                        };
                        if !ast.add_symbol(arg, arg, SymbolType::ARGOUT) {
                            return false;
                        }
                    }
                } else if !ast.add_symbol(argout, argout, SymbolType::ARGOUT) {
                    return false;
                }
            }

            // the function name itself is a global
            match ast.get_down(node, 1) {
                Some(name) => {
                    if !ast.add_symbol(name, name, SymbolType::GLOBAL_FUNC) {
                        return false;
                    }
                }
                None => return false,
            }

            init_symbols(ast, ast.get_down(node, 3))
        }

        NodeKind::Tok(Tok::For) => {
            let Some(var) = ast.first(node) else {
                return false;
            };
            if !ast.add_symbol(var, var, SymbolType::VAR) {
                return false;
            }

            // reserve the iterator temporary
            if let Some(tid) = ast.get_symbols(node) {
                ast.tables[tid].add(SymbolType::VAR, Some("_it"), SymbolData::None);
            }

            init_symbols(ast, ast.get_down(node, 1)) && init_symbols(ast, ast.get_down(node, 2))
        }

        NodeKind::Tok(Tok::Switch) => {
            // reserve the case-comparison temporary
            if let Some(tid) = ast.get_symbols(node) {
                ast.tables[tid].add(SymbolType::VAR, Some("_sw"), SymbolData::None);
            }

            for i in 0..ast.n_down(node) {
                if !init_symbols(ast, ast.get_down(node, i as isize)) {
                    return false;
                }
            }
            true
        }

        NodeKind::Tok(Tok::Try) => {
            let Some(var) = ast.get_down(node, 1) else {
                return false;
            };
            if !ast.add_symbol(var, var, SymbolType::VAR) {
                return false;
            }

            init_symbols(ast, ast.get_down(node, 0)) && init_symbols(ast, ast.get_down(node, 2))
        }

        NodeKind::Tok(Tok::Global) => {
            for i in 0..ast.n_down(node) {
                let Some(id) = ast.get_down(node, i as isize) else {
                    continue;
                };
                if !ast.add_symbol(node, id, SymbolType::GLOBAL_VAR) {
                    return false;
                }
            }
            true
        }

        NodeKind::Tok(Tok::Persistent) => {
            for i in 0..ast.n_down(node) {
                let Some(id) = ast.get_down(node, i as isize) else {
                    continue;
                };
                if !ast.add_symbol(node, id, SymbolType::STATIC_VAR) {
                    return false;
                }
            }
            true
        }

        NodeKind::Tok(Tok::Assign) => {
            let Some(lhs) = ast.get_down(node, 0) else {
                return false;
            };
            if ast.kind(lhs) == NodeKind::Row {
                for i in 0..ast.n_down(lhs) {
                    let Some(target) = ast.get_down(lhs, i as isize) else {
                        continue;
                    };
                    if !ast.add_symbol(node, target, vartype) {
                        return false;
                    }
                }
            } else if !ast.add_symbol(node, lhs, vartype) {
                return false;
            }

            init_symbols(ast, ast.get_down(node, 1))
        }

        NodeKind::Tok(tok @ (Tok::Int | Tok::Float | Tok::Complex | Tok::Str)) => {
            let stype = SymbolData::literal_type(tok).expect("literal token class");
            ast.add_symbol(node, node, stype)
        }

        NodeKind::Empty | NodeKind::Tok(Tok::End) => true,

        _ => {
            // intermediate expression results get temporaries
            let is_expr = matches!(kind, NodeKind::Row | NodeKind::Column)
                || kind.tok().is_some_and(Tok::is_expr_op);
            if is_expr && !ast.add_symbol(node, node, SymbolType::TEMP_VAR) {
                return false;
            }

            for i in 0..ast.n_down(node) {
                if !init_symbols(ast, ast.get_down(node, i as isize)) {
                    return false;
                }
            }
            true
        }
    }
}

/// Bind identifier uses to symbol rows, reshaping uses of function
/// symbols into explicit call nodes.
pub fn resolve_symbols(ast: &mut Ast, node: Option<NodeId>) -> bool {
    let Some(node) = node else { return true };

    let kind = ast.kind(node);

    if kind.is_tok(Tok::Ident) {
        let name = match ast.get_string(node) {
            Some(name) => name.to_owned(),
            None => String::new(),
        };

        // search upward through the enclosing tables
        let mut found = None;
        let mut at = Some(node);
        while let Some(up) = at {
            if let Some(tid) = ast.node(up).syms {
                if let Some(row) = ast.tables[tid].find(SymbolType::ANY, Some(&name), None) {
                    found = Some((tid, row));
                    break;
                }
            }
            at = ast.node(up).up;
        }

        if let Some((tid, row)) = found {
            ast.node_mut(node).sym = Some((tid, row));

            if ast.tables[tid].get(row).ty.has(SymbolType::FUNC) {
                // argument packets for the call site
                let Some(local) = ast.get_symbols(node) else {
                    return false;
                };
                ast.tables[local].add(SymbolType::VAR, Some("_ai"), SymbolData::None);
                ast.tables[local].add(SymbolType::VAR, Some("_ao"), SymbolData::None);

                let parent = ast.node(node).up;
                if parent.is_some_and(|up| ast.kind(up).is_tok(Tok::Assign)) {
                    // `x = f(...)` is already call-shaped
                    ast.node_mut(parent.unwrap()).kind = NodeKind::FnCall;
                } else {
                    // wrap the bare use in a call bound to a temporary
                    let target = ast.new_node(NodeKind::Tok(Tok::Ident));
                    let call = ast.new_node(NodeKind::FnCall);
                    ast.add_down(call, Some(target));
                    if ast.slip(node, call).is_none() {
                        return false;
                    }
                    if !ast.add_symbol(target, target, SymbolType::TEMP_VAR) {
                        return false;
                    }
                    ast.node_mut(call).sym = ast.node(target).sym;
                }
            }
        } else {
            asterr!(ast, node, ids::UNDEFINED_SYMBOL, "symbol '{name}' is undefined");
        }
    } else if kind == NodeKind::Function {
        return resolve_symbols(ast, ast.get_down(node, 3));
    } else if kind == NodeKind::Class {
        // class sections declare rather than use; nothing to bind until
        // classes gain emitted semantics
        return true;
    }

    for i in 0..ast.n_down(node) {
        if !resolve_symbols(ast, ast.get_down(node, i as isize)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use matte_core::except;

    fn prepare(src: &str) -> (Parser, NodeId) {
        except::clear();
        let mut p = Parser::new();
        assert!(p.parse_string(src), "parse failed for {src:?}");
        let tree = p.tree().unwrap();
        simplify_concats(&mut p.ast, Some(tree));
        assert!(init_symbols(&mut p.ast, Some(tree)));
        (p, tree)
    }

    fn resolve(src: &str) -> (Parser, NodeId) {
        let (mut p, tree) = prepare(src);
        assert!(resolve_symbols(&mut p.ast, Some(tree)), "resolution failed");
        (p, tree)
    }

    fn literal_rows(p: &Parser, tree: NodeId) -> Vec<SymbolType> {
        let gid = p.ast.node(tree).syms.unwrap();
        p.ast.tables[gid]
            .rows()
            .filter(|row| row.ty.has(SymbolType::LITERAL) && !row.ty.has(SymbolType::GLOBAL))
            .map(|row| row.ty)
            .collect()
    }

    #[test]
    fn literal_dedup_collapses_identical_literals() {
        // x = 1; y = 1; z = 1.0;  =>  one Int and one Float literal row
        let (p, tree) = resolve("x = 1; y = 1; z = 1.0;\n");
        assert_eq!(literal_rows(&p, tree).len(), 2);

        // both integer uses bind to the same row
        let root = tree;
        let x = p.ast.first(root).unwrap();
        let y = p.ast.get_down(root, 1).unwrap();
        let one_a = p.ast.get_down(x, 1).unwrap();
        let one_b = p.ast.get_down(y, 1).unwrap();
        assert_eq!(p.ast.node(one_a).sym, p.ast.node(one_b).sym);

        let z = p.ast.get_down(root, 2).unwrap();
        let one_float = p.ast.get_down(z, 1).unwrap();
        assert_ne!(p.ast.node(one_a).sym, p.ast.node(one_float).sym);
    }

    #[test]
    fn every_expression_node_gets_a_symbol() {
        let (p, tree) = prepare("c = [1, 2; 3, 4] + 5;\n");
        fn check(p: &Parser, node: NodeId) {
            let kind = p.ast.kind(node);
            let is_expr = matches!(kind, NodeKind::Row | NodeKind::Column)
                || kind.tok().is_some_and(Tok::is_expr_op)
                || kind.tok().is_some_and(|t| {
                    matches!(t, Tok::Int | Tok::Float | Tok::Complex | Tok::Str)
                });
            if is_expr {
                assert!(
                    p.ast.node(node).sym.is_some(),
                    "node {:?} has no symbol",
                    kind
                );
            }
            for i in 0..p.ast.n_down(node) {
                if let Some(d) = p.ast.get_down(node, i as isize) {
                    check(p, d);
                }
            }
        }
        check(&p, tree);
    }

    #[test]
    fn temporaries_are_fresh_per_expression() {
        let (p, tree) = prepare("a = 1 + 2; b = 3 + 4;\n");
        let root = tree;
        let first = p.ast.get_down(p.ast.first(root).unwrap(), 1).unwrap();
        let second = p.ast.get_down(p.ast.get_down(root, 1).unwrap(), 1).unwrap();
        assert_ne!(p.ast.node(first).sym, p.ast.node(second).sym);
        let name_a = p.ast.symbol_name(first).unwrap();
        let name_b = p.ast.symbol_name(second).unwrap();
        assert!(name_a.starts_with("_t"));
        assert!(name_b.starts_with("_t"));
    }

    #[test]
    fn root_assignments_are_global() {
        let (p, _) = resolve("x = 1;\n");
        let root = p.tree().unwrap();
        let assign = p.ast.first(root).unwrap();
        assert!(p.ast.has_global_symbol(assign));
    }

    #[test]
    fn function_locals_stay_local() {
        let (p, tree) = resolve("function y = f(a)\ny = a;\nend\n");
        let func = p.ast.first(tree).unwrap();
        let ltid = p.ast.node(func).syms.unwrap();
        let table = &p.ast.tables[ltid];
        assert!(table.find(SymbolType::ARGIN, Some("a"), None).is_some());
        assert!(table.find(SymbolType::ARGOUT, Some("y"), None).is_some());

        // the function name is global
        let gid = p.ast.node(tree).syms.unwrap();
        assert!(p.ast.tables[gid].find(SymbolType::FUNC, Some("f"), None).is_some());
    }

    #[test]
    fn for_and_switch_reserve_their_temporaries() {
        let (p, tree) = prepare("for i = 1:3, x = i; end\n");
        let gid = p.ast.node(tree).syms.unwrap();
        assert!(p.ast.tables[gid].find(SymbolType::VAR, Some("_it"), None).is_some());

        let (p, tree) = prepare("switch x\ncase 1, y = 1;\nend\n");
        let gid = p.ast.node(tree).syms.unwrap();
        assert!(p.ast.tables[gid].find(SymbolType::VAR, Some("_sw"), None).is_some());
    }

    #[test]
    fn function_calls_are_reshaped() {
        // sum is a builtin, so the assignment becomes a call node and the
        // packets are registered.
        let (p, tree) = resolve("x = sum(1);\n");
        let call = p.ast.first(tree).unwrap();
        assert_eq!(p.ast.kind(call), NodeKind::FnCall);

        let gid = p.ast.node(tree).syms.unwrap();
        assert!(p.ast.tables[gid].find(SymbolType::VAR, Some("_ai"), None).is_some());
        assert!(p.ast.tables[gid].find(SymbolType::VAR, Some("_ao"), None).is_some());
    }

    #[test]
    fn bare_function_uses_are_wrapped_in_calls() {
        // sum(2) used inside an expression gains a synthesized call node
        // whose target is a fresh temporary.
        let (p, tree) = resolve("x = 1 + sum(2);\n");

        fn find_call(p: &Parser, node: NodeId) -> Option<NodeId> {
            if p.ast.kind(node) == NodeKind::FnCall {
                return Some(node);
            }
            (0..p.ast.n_down(node))
                .filter_map(|i| p.ast.get_down(node, i as isize))
                .find_map(|d| find_call(p, d))
        }

        let call = find_call(&p, tree).expect("synthesized call node");
        let target = p.ast.first(call).unwrap();
        let tname = p.ast.symbol_name(target).unwrap();
        assert!(tname.starts_with("_t"));
        assert_eq!(p.ast.node(call).sym, p.ast.node(target).sym);

        // no identifier bound to a function symbol remains outside a call
        fn check_uses(p: &Parser, node: NodeId, in_call: bool) {
            let kind = p.ast.kind(node);
            if kind.is_tok(Tok::Ident) {
                if let Some(ty) = p.ast.symbol_type(node) {
                    if ty.has(SymbolType::FUNC) {
                        assert!(in_call, "function use outside a call node");
                    }
                }
            }
            let inner = in_call || kind == NodeKind::FnCall;
            for i in 0..p.ast.n_down(node) {
                if let Some(d) = p.ast.get_down(node, i as isize) {
                    check_uses(p, d, inner);
                }
            }
        }
        check_uses(&p, tree, false);
    }

    #[test]
    fn undefined_symbols_are_diagnosed() {
        except::clear();
        let mut p = Parser::new();
        assert!(p.parse_string("x = missing + 1;\n"));
        let tree = p.tree().unwrap();
        simplify_concats(&mut p.ast, Some(tree));
        assert!(init_symbols(&mut p.ast, Some(tree)));
        assert!(!resolve_symbols(&mut p.ast, Some(tree)));

        let e = except::take().unwrap();
        assert_eq!(e.id, ids::UNDEFINED_SYMBOL);
        assert!(e.msg.contains("missing"));
    }

    #[test]
    fn catch_variable_resolves_in_scope() {
        let (p, tree) = resolve("try, x = 1; catch e, y = e; end\n");
        let try_node = p.ast.first(tree).unwrap();
        let catch_body = p.ast.get_down(try_node, 2).unwrap();
        // y = e: the rhs identifier shares the catch variable's symbol
        let rhs = p.ast.get_down(catch_body, 1).unwrap();
        let var = p.ast.get_down(try_node, 1).unwrap();
        assert_eq!(p.ast.node(rhs).sym, p.ast.node(var).sym);
    }

    #[test]
    fn simplify_collapses_scalar_brackets() {
        // [5] collapses to the bare literal; [1:3] keeps its row because
        // the single element is a colon expression.
        let (p, _) = prepare("x = [5]; y = [1:3];\n");
        let root = p.tree().unwrap();
        let x = p.ast.first(root).unwrap();
        let rhs = p.ast.get_down(x, 1).unwrap();
        assert!(p.ast.kind(rhs).is_tok(Tok::Int));

        let y = p.ast.get_down(root, 1).unwrap();
        let rhs = p.ast.get_down(y, 1).unwrap();
        assert_eq!(p.ast.kind(rhs), NodeKind::Row);
        let colon = p.ast.first(rhs).unwrap();
        assert!(p.ast.kind(colon).is_tok(Tok::Colon));
    }

    #[test]
    fn global_statement_registers_global_variables() {
        let (p, tree) = resolve("function f()\nglobal g\ng = 1;\nend\ng = 2;\n");
        let gid = p.ast.node(tree).syms.unwrap();
        let row = p.ast.tables[gid].find(SymbolType::VAR, Some("g"), None).unwrap();
        assert!(p.ast.tables[gid].get(row).ty.has(SymbolType::GLOBAL));
    }
}
