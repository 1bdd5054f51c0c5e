//! The abstract syntax tree.
//!
//! Nodes live in one arena per parser; parent/child links are indices
//! into that arena, so merging the trees of several source files never
//! re-indexes anything. Child slots are `Option<NodeId>` and a `None`
//! slot is meaningful: it marks an absent grammar hole such as a missing
//! `else` branch.
//!
//! Symbol tables are arena-allocated alongside the nodes; a node owns at
//! most one table (root, class and function nodes), and every node may
//! carry one `(table, index)` symbol binding set during resolution.

use num_complex::Complex64;

use crate::symbols::{SymbolData, SymbolTable, SymbolType};
use crate::token::Tok;

pub type NodeId = usize;
pub type TableId = usize;

/// Node classification: structural kinds plus token-coded operator and
/// statement kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    None,
    Tok(Tok),
    Root,
    Row,
    Column,
    Statements,
    Ids,
    Empty,
    Class,
    Function,
    FnHandle,
    FnAnony,
    FnCall,
}

impl NodeKind {
    pub fn tok(self) -> Option<Tok> {
        match self {
            NodeKind::Tok(tok) => Some(tok),
            _ => None,
        }
    }

    pub fn is_tok(self, tok: Tok) -> bool {
        self == NodeKind::Tok(tok)
    }
}

/// Scalar or string payload of a node.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum NodeData {
    #[default]
    None,
    Int(i64),
    Float(f64),
    Complex(Complex64),
    Str(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub up: Option<NodeId>,
    pub down: Vec<Option<NodeId>>,
    pub kind: NodeKind,
    pub data: NodeData,
    /// Echo the result of this statement when true.
    pub disp: bool,
    /// Byte offset in the input.
    pub pos: usize,
    pub line: usize,
    pub file: Option<usize>,
    /// Symbol table owned by this node (root/class/function only).
    pub syms: Option<TableId>,
    /// Symbol binding `(table, row)`, set exactly once by resolution.
    pub sym: Option<(TableId, usize)>,
}

impl Node {
    fn new(kind: NodeKind) -> Node {
        Node {
            up: None,
            down: Vec::new(),
            kind,
            data: NodeData::None,
            disp: false,
            pos: 0,
            line: 0,
            file: None,
            syms: None,
            sym: None,
        }
    }
}

/// Node and symbol-table arena for one compilation.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    pub tables: Vec<SymbolTable>,
    pub files: Vec<String>,
    /// Root of the merged tree across all parses into this arena.
    pub tree: Option<NodeId>,
}

impl Ast {
    pub fn new() -> Ast {
        Ast::default()
    }

    pub fn new_node(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        self.nodes.len() - 1
    }

    pub fn new_node_with_down(&mut self, kind: NodeKind, down: Option<NodeId>) -> NodeId {
        let id = self.new_node(kind);
        self.add_down(id, down);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    pub fn n_down(&self, id: NodeId) -> usize {
        self.nodes[id].down.len()
    }

    /// Append a child slot; `None` children mark absent grammar holes.
    pub fn add_down(&mut self, id: NodeId, down: Option<NodeId>) {
        self.nodes[id].down.push(down);
        if let Some(down) = down {
            self.nodes[down].up = Some(id);
        }
    }

    /// Child by index; negative indices count from the end. `None` for
    /// out-of-bounds and for null slots.
    pub fn get_down(&self, id: NodeId, index: isize) -> Option<NodeId> {
        let down = &self.nodes[id].down;
        let index = if index >= 0 {
            index as usize
        } else {
            down.len().checked_sub(index.unsigned_abs())?
        };
        down.get(index).copied().flatten()
    }

    pub fn first(&self, id: NodeId) -> Option<NodeId> {
        self.get_down(id, 0)
    }

    pub fn last(&self, id: NodeId) -> Option<NodeId> {
        self.get_down(id, -1)
    }

    /// Drop the last child slot.
    pub fn shrink_down(&mut self, id: NodeId) {
        self.nodes[id].down.pop();
    }

    pub fn root(&self, id: NodeId) -> NodeId {
        let mut at = id;
        while let Some(up) = self.nodes[at].up {
            at = up;
        }
        at
    }

    /// Whether `inner` lies in the subtree rooted at `outer`.
    pub fn contains(&self, outer: NodeId, inner: NodeId) -> bool {
        let mut at = Some(inner);
        while let Some(id) = at {
            if id == outer {
                return true;
            }
            at = self.nodes[id].up;
        }
        false
    }

    /// Splice a single-child node out of the tree, replacing it in its
    /// parent with that child. Returns the replacement.
    pub fn rip(&mut self, id: NodeId) -> Option<NodeId> {
        if self.nodes[id].down.len() != 1 {
            return None;
        }
        let up = self.nodes[id].up?;
        let down = self.nodes[id].down[0]?;

        let slot = self.nodes[up].down.iter().position(|d| *d == Some(id))?;
        self.nodes[up].down[slot] = Some(down);
        self.nodes[down].up = Some(up);
        self.nodes[id].up = None;
        self.nodes[id].down.clear();
        Some(down)
    }

    /// Insert `slip` between `id` and its parent; `id` becomes a child of
    /// `slip`. Returns `slip`.
    pub fn slip(&mut self, id: NodeId, slip: NodeId) -> Option<NodeId> {
        let up = self.nodes[id].up?;
        let slot = self.nodes[up].down.iter().position(|d| *d == Some(id))?;
        self.add_down(slip, Some(id));
        self.nodes[up].down[slot] = Some(slip);
        self.nodes[slip].up = Some(up);
        Some(slip)
    }

    /// Deep copy of a subtree.
    pub fn copy(&mut self, id: NodeId) -> NodeId {
        let mut dup = Node::new(self.nodes[id].kind);
        dup.up = self.nodes[id].up;
        dup.data = self.nodes[id].data.clone();
        dup.disp = self.nodes[id].disp;
        dup.pos = self.nodes[id].pos;
        dup.line = self.nodes[id].line;
        dup.file = self.nodes[id].file;
        dup.syms = self.nodes[id].syms;
        dup.sym = self.nodes[id].sym;
        self.nodes.push(dup);
        let copy = self.nodes.len() - 1;

        for slot in 0..self.nodes[id].down.len() {
            match self.nodes[id].down[slot] {
                Some(down) => {
                    let down_copy = self.copy(down);
                    self.add_down(copy, Some(down_copy));
                }
                None => self.add_down(copy, None),
            }
        }
        copy
    }

    /// Combine two parses under a single root, flattening nested roots.
    pub fn merge(&mut self, a: Option<NodeId>, b: Option<NodeId>) -> NodeId {
        match (a, b) {
            (None, None) => self.new_node(NodeKind::Root),
            (None, Some(b)) | (Some(b), None) => {
                if self.nodes[b].kind == NodeKind::Root {
                    b
                } else {
                    self.new_node_with_down(NodeKind::Root, Some(b))
                }
            }
            (Some(a), Some(b)) => {
                let a = if self.nodes[a].kind == NodeKind::Root {
                    a
                } else {
                    self.new_node_with_down(NodeKind::Root, Some(a))
                };
                if self.nodes[b].kind == NodeKind::Root {
                    for slot in 0..self.nodes[b].down.len() {
                        let down = self.nodes[b].down[slot];
                        self.add_down(a, down);
                    }
                    self.nodes[b].down.clear();
                } else {
                    self.add_down(a, Some(b));
                }
                a
            }
        }
    }

    /// Allocate a fresh symbol table owned by `id`.
    pub fn new_table(&mut self, id: NodeId) -> TableId {
        self.tables.push(SymbolTable::new());
        let tid = self.tables.len() - 1;
        self.nodes[id].syms = Some(tid);
        tid
    }

    /// Nearest enclosing symbol table, walking upward from `id`.
    pub fn get_symbols(&self, id: NodeId) -> Option<TableId> {
        let mut at = Some(id);
        while let Some(up) = at {
            if let Some(tid) = self.nodes[up].syms {
                return Some(tid);
            }
            at = self.nodes[up].up;
        }
        None
    }

    /// The root's table.
    pub fn get_globals(&self, id: NodeId) -> Option<TableId> {
        self.nodes[self.root(id)].syms
    }

    /// Register a symbol described by `data_node` with `id`'s scope, and
    /// bind `id` to the resulting row. Global registrations land in the
    /// root's table.
    pub fn add_symbol(&mut self, id: NodeId, data_node: NodeId, stype: SymbolType) -> bool {
        let globals = if stype.has(SymbolType::GLOBAL) {
            self.get_globals(id)
        } else {
            None
        };
        let Some(locals) = self.get_symbols(id) else {
            return false;
        };

        let (name, payload) = if stype.has(SymbolType::LITERAL) {
            let payload = match &self.nodes[data_node].data {
                NodeData::Int(v) => SymbolData::Int(*v),
                NodeData::Float(v) => SymbolData::Float(*v),
                NodeData::Complex(v) => SymbolData::Complex(*v),
                NodeData::Str(v) => SymbolData::Str(v.clone()),
                NodeData::None => SymbolData::None,
            };
            (None, payload)
        } else {
            let name = match &self.nodes[data_node].data {
                NodeData::Str(v) => Some(v.clone()),
                _ => None,
            };
            (name, SymbolData::None)
        };

        // Global symbols register in both scopes so local lookups still
        // resolve them; at root scope the two tables are one and dedup
        // collapses the double registration.
        let row = self.tables[locals].add(stype, name.as_deref(), payload.clone());
        self.nodes[id].sym = Some((locals, row));
        if let Some(gid) = globals {
            let row = self.tables[gid].add(stype, name.as_deref(), payload);
            self.nodes[id].sym = Some((gid, row));
        }
        true
    }

    /// Name of the symbol bound to `id`.
    pub fn symbol_name(&self, id: NodeId) -> Option<&str> {
        let (tid, row) = self.nodes[id].sym?;
        Some(self.tables[tid].name(row))
    }

    /// Type bitset of the symbol bound to `id`.
    pub fn symbol_type(&self, id: NodeId) -> Option<SymbolType> {
        let (tid, row) = self.nodes[id].sym?;
        Some(self.tables[tid].get(row).ty)
    }

    /// Whether `id`'s symbol lives in global scope.
    pub fn has_global_symbol(&self, id: NodeId) -> bool {
        self.symbol_type(id).is_some_and(|ty| ty.has(SymbolType::GLOBAL))
    }

    /// Name of the function enclosing `id`, or `main` at top level.
    pub fn get_func(&self, id: NodeId) -> &str {
        let mut at = Some(id);
        while let Some(up) = at {
            if self.nodes[up].kind == NodeKind::Function {
                if let Some(name) = self.get_down(up, 1) {
                    if let NodeData::Str(name) = &self.nodes[name].data {
                        return name;
                    }
                }
            }
            at = self.nodes[up].up;
        }
        "main"
    }

    /// Source file name recorded for `id`.
    pub fn file_name(&self, id: NodeId) -> &str {
        self.nodes[id]
            .file
            .and_then(|f| self.files.get(f))
            .map_or("(string)", String::as_str)
    }

    pub fn get_string(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Str(s) => Some(s),
            _ => None,
        }
    }
}
