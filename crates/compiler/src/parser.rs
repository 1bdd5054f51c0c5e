//! Recursive-descent parser.
//!
//! LL(1) over the scanner's token stream, one rule per grammar
//! production. Rules return `None` both at a clean non-match and after a
//! reported error; the statement-list driver tells the two apart through
//! the error counters and resynchronizes at the next statement boundary.
//!
//! All parses of one parser share a single node arena, so combining
//! several source files is a link step, never a re-index.

use num_complex::Complex64;

use crate::ast::{Ast, NodeData, NodeId, NodeKind};
use crate::scanner::Scanner;
use crate::token::Tok;

pub struct Parser {
    pub scan: Scanner,
    pub ast: Ast,
    tok: Tok,
    /// Current input's index in the arena's file list.
    file: Option<usize>,
    /// Inside parenthesized subscripts, `end` and `:` are values.
    end_valid: bool,
    errs: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Parser {
        Parser {
            scan: Scanner::new(),
            ast: Ast::default(),
            tok: Tok::Err,
            file: None,
            end_valid: false,
            errs: 0,
        }
    }

    /// Root of the merged tree, if any parse has succeeded.
    pub fn tree(&self) -> Option<NodeId> {
        self.ast.tree
    }

    pub fn errors(&self) -> usize {
        self.errs
    }

    /// Parse a source file and merge it into the tree.
    pub fn parse_file(&mut self, fname: &str) -> bool {
        if let Err(msg) = self.scan.set_file(fname) {
            matte_core::error!(matte_core::except::ids::INVALID_FILE, "{msg}");
            self.errs += 1;
            return false;
        }
        self.ast.files.push(fname.to_owned());
        self.file = Some(self.ast.files.len() - 1);
        self.parse()
    }

    /// Parse an in-memory string and merge it into the tree.
    pub fn parse_string(&mut self, text: &str) -> bool {
        self.scan.set_string(text);
        self.file = None;
        self.parse()
    }

    fn parse(&mut self) -> bool {
        self.tok = Tok::Err;
        self.fetch();

        let subtree = self.parse_blocks();

        if self.errs + self.scan.errors() > 0 {
            self.errs += self.scan.errors();
            eprintln!("{}: there were errors. cannot continue.", self.scan.filename());
            return false;
        }

        let tree = self.ast.tree.take();
        let merged = self.ast.merge(tree, subtree);
        self.ast.tree = Some(merged);
        true
    }

    // === token plumbing ===

    /// Read the next token, transparently stepping over malformed ones
    /// (the scanner has already reported and counted them).
    fn fetch(&mut self) {
        loop {
            self.tok = self.scan.next();
            if self.tok != Tok::Err {
                break;
            }
        }
    }

    fn check(&self, tok: Tok) -> bool {
        self.tok == tok
    }

    fn accept(&mut self, tok: Tok) -> bool {
        if self.check(tok) {
            self.fetch();
            return true;
        }
        false
    }

    fn skip_newlines(&mut self) {
        while self.check(Tok::Eol) {
            self.fetch();
        }
    }

    // === diagnostics ===

    /// Report a syntax error; only the first of a run prints.
    fn error(&mut self, msg: &str) {
        self.end_valid = false;
        self.errs += 1;
        if self.errs > 1 {
            return;
        }
        eprintln!(
            "{}:{}: error: {}",
            self.scan.filename(),
            self.scan.lineno(),
            msg
        );
        eprint!("{}", self.scan.line_str());
    }

    fn err_missing(&mut self, what: &str, rule: &str) -> Option<NodeId> {
        self.error(&format!("missing {what} in {rule}"));
        None
    }

    fn err_missing_tok(&mut self, tok: Tok, rule: &str) -> Option<NodeId> {
        self.error(&format!(
            "expected {}, got {} in {rule}",
            tok.name(),
            self.tok.name()
        ));
        None
    }

    fn require(&mut self, tok: Tok, rule: &str) -> bool {
        if self.accept(tok) {
            return true;
        }
        self.err_missing_tok(tok, rule);
        false
    }

    /// Statement terminator: `;`, `,` or newline, then any blank lines.
    fn require_stmt_end(&mut self, rule: &str) -> bool {
        if !(self.accept(Tok::Semi) || self.accept(Tok::Comma) || self.accept(Tok::Eol)) {
            self.err_missing("end of statement", rule);
            return false;
        }
        self.skip_newlines();
        true
    }

    // === node construction ===

    fn set_context(&mut self, id: NodeId) {
        let line = self.scan.lineno();
        let pos = self.scan.pos();
        let node = self.ast.node_mut(id);
        node.file = self.file;
        node.line = line;
        node.pos = pos;
    }

    fn new_with_kind(&mut self, kind: NodeKind) -> NodeId {
        let id = self.ast.new_node(kind);
        self.set_context(id);
        id
    }

    /// Typed node with an always-present (possibly null) child slot.
    fn new_with_parms(&mut self, kind: NodeKind, disp: bool, down: Option<NodeId>) -> NodeId {
        let id = self.ast.new_node(kind);
        self.set_context(id);
        self.ast.node_mut(id).disp = disp;
        self.ast.add_down(id, down);
        id
    }

    /// Node built from the current token, consuming it; literal and
    /// identifier payloads are captured from the lexeme.
    fn new_with_data(&mut self, down: Option<NodeId>) -> NodeId {
        let id = self.new_with_kind(NodeKind::Tok(self.tok));
        if down.is_some() {
            self.ast.add_down(id, down);
        }

        let data = match self.tok {
            Tok::Ident => Some(NodeData::Str(self.scan.string_value())),
            Tok::Str => {
                let lexeme = self.scan.string_value();
                let inner = lexeme
                    .strip_prefix(['\'', '"'])
                    .and_then(|s| s.strip_suffix(['\'', '"']))
                    .unwrap_or(&lexeme);
                Some(NodeData::Str(inner.to_owned()))
            }
            Tok::Int => Some(NodeData::Int(self.scan.int_value())),
            Tok::Float => Some(NodeData::Float(self.scan.float_value())),
            Tok::Complex => {
                Some(NodeData::Complex(Complex64::new(0.0, self.scan.float_value())))
            }
            _ => None,
        };
        if let Some(data) = data {
            self.ast.node_mut(id).data = data;
        }

        self.fetch();
        id
    }

    // === l-values ===

    fn valid_lvalue(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::Tok(Tok::Ident) => {
                let n = self.ast.n_down(id);
                let mut parens = 0;
                for i in 0..n {
                    let Some(d) = self.ast.get_down(id, i as isize) else {
                        return false;
                    };
                    if !self.valid_lvalue(d) {
                        return false;
                    }
                    // a superclass qualifier must come last: @ID.X and
                    // @ID(...) are not bindable
                    if self.ast.kind(d).is_tok(Tok::As) && i + 1 < n {
                        return false;
                    }
                    // at most one subscript level on the left-hand side
                    if matches!(
                        self.ast.kind(d),
                        NodeKind::Tok(Tok::ParenOpen) | NodeKind::Tok(Tok::BraceOpen)
                    ) {
                        parens += 1;
                        if parens > 1 {
                            return false;
                        }
                    }
                }
                true
            }
            NodeKind::Tok(Tok::As) | NodeKind::Tok(Tok::Point) => self
                .ast
                .first(id)
                .is_some_and(|d| self.ast.kind(d).is_tok(Tok::Ident)),
            NodeKind::Column => {
                self.ast.n_down(id) == 1
                    && self.ast.first(id).is_some_and(|d| {
                        self.ast.kind(d) == NodeKind::Row && self.valid_lvalue(d)
                    })
            }
            NodeKind::Row => (0..self.ast.n_down(id)).all(|i| {
                self.ast.get_down(id, i as isize).is_some_and(|d| {
                    self.ast.kind(d).is_tok(Tok::Ident) && self.ast.n_down(d) == 0
                })
            }),
            NodeKind::Tok(Tok::ParenOpen) | NodeKind::Tok(Tok::BraceOpen) => {
                (0..self.ast.n_down(id)).all(|i| {
                    self.ast.get_down(id, i as isize).is_some_and(|d| {
                        match self.ast.kind(d) {
                            NodeKind::Tok(Tok::Ident) => self.ast.n_down(d) == 0,
                            NodeKind::Tok(Tok::Colon)
                            | NodeKind::Tok(Tok::Int)
                            | NodeKind::Tok(Tok::End) => true,
                            _ => false,
                        }
                    })
                })
            }
            _ => false,
        }
    }

    // === rows and columns ===

    fn parse_row(&mut self) -> Option<NodeId> {
        let expr = self.parse_expr()?;
        let node = self.new_with_parms(NodeKind::Row, false, Some(expr));

        while self.accept(Tok::Comma) {
            match self.parse_expr() {
                Some(next) => self.ast.add_down(node, Some(next)),
                None => return self.err_missing("expression", "row"),
            }
        }
        Some(node)
    }

    fn parse_column(&mut self) -> Option<NodeId> {
        let row = self.parse_row()?;
        let node = self.new_with_parms(NodeKind::Column, false, Some(row));

        while self.accept(Tok::Semi) {
            match self.parse_row() {
                Some(next) => self.ast.add_down(node, Some(next)),
                None => return self.err_missing("expression", "column"),
            }
        }
        Some(node)
    }

    // === names and values ===

    fn parse_qualifier(&mut self) -> Option<NodeId> {
        if self.accept(Tok::As) {
            if !self.check(Tok::Ident) {
                return self.err_missing_tok(Tok::Ident, "qualifier");
            }
            let name = self.new_with_data(None);
            return Some(self.new_with_parms(NodeKind::Tok(Tok::As), false, Some(name)));
        }

        if self.accept(Tok::Point) {
            if !self.check(Tok::Ident) {
                return self.err_missing_tok(Tok::Ident, "qualifier");
            }
            let name = self.new_with_data(None);
            return Some(self.new_with_parms(NodeKind::Tok(Tok::Point), false, Some(name)));
        }

        if self.accept(Tok::ParenOpen) {
            if self.accept(Tok::ParenClose) {
                return None;
            }
            self.end_valid = true;
            let Some(row) = self.parse_row() else {
                self.error("syntax error in qualifier");
                return None;
            };
            if !self.require(Tok::ParenClose, "qualifier") {
                return None;
            }
            self.end_valid = false;
            self.ast.node_mut(row).kind = NodeKind::Tok(Tok::ParenOpen);
            return Some(row);
        }

        if self.accept(Tok::BraceOpen) {
            let Some(row) = self.parse_row() else {
                self.error("syntax error in qualifier");
                return None;
            };
            if !self.require(Tok::BraceClose, "qualifier") {
                return None;
            }
            self.ast.node_mut(row).kind = NodeKind::Tok(Tok::BraceOpen);
            return Some(row);
        }

        None
    }

    fn parse_name(&mut self) -> Option<NodeId> {
        if !self.check(Tok::Ident) {
            return None;
        }
        let node = self.new_with_data(None);

        loop {
            let qual = self.parse_qualifier();
            self.ast.add_down(node, qual);
            if self.ast.last(node).is_none() {
                break;
            }
        }
        self.ast.shrink_down(node);
        Some(node)
    }

    fn parse_matrix(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::BrackOpen) {
            return None;
        }

        let node = match self.parse_column() {
            Some(column) => column,
            None => self.new_with_kind(NodeKind::Empty),
        };

        if !self.require(Tok::BrackClose, "matrix") {
            return None;
        }
        Some(node)
    }

    fn parse_asterisk(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::As) {
            return None;
        }

        if self.check(Tok::Ident) {
            let node = self.new_with_kind(NodeKind::FnHandle);
            self.ast.node_mut(node).data = NodeData::Str(self.scan.string_value());
            self.fetch();
            return Some(node);
        }

        if self.accept(Tok::ParenOpen) {
            let node = self.new_with_kind(NodeKind::FnAnony);
            let args = self.parse_args();
            self.ast.add_down(node, args);
            if !self.require(Tok::ParenClose, "anonymous function") {
                return None;
            }
            let body = self.parse_expr();
            self.ast.add_down(node, body);
            return Some(node);
        }

        None
    }

    fn parse_value(&mut self) -> Option<NodeId> {
        if self.check(Tok::Ident) {
            return self.parse_name();
        }
        if self.check(Tok::BrackOpen) {
            return self.parse_matrix();
        }
        if self.check(Tok::As) {
            let node = self.parse_asterisk();
            if node.is_none() {
                self.error("syntax error in value");
            }
            return node;
        }
        if self.check(Tok::Int)
            || self.check(Tok::Float)
            || self.check(Tok::Complex)
            || self.check(Tok::Str)
        {
            return Some(self.new_with_data(None));
        }
        if self.accept(Tok::ParenOpen) {
            let Some(node) = self.parse_expr() else {
                self.error("syntax error in value");
                return None;
            };
            if !self.require(Tok::ParenClose, "value") {
                return None;
            }
            return Some(node);
        }
        if self.end_valid && (self.check(Tok::End) || self.check(Tok::Colon)) {
            return Some(self.new_with_data(None));
        }

        None
    }

    // === expression precedence tower ===

    fn parse_prefix(&mut self) -> Option<NodeId> {
        if self.check(Tok::Inc) || self.check(Tok::Dec) {
            let node = self.new_with_data(None);
            match self.parse_name() {
                Some(name) => self.ast.add_down(node, Some(name)),
                None => return self.err_missing("name", "prefix"),
            }
            return Some(node);
        }
        self.parse_value()
    }

    fn parse_power(&mut self) -> Option<NodeId> {
        let mut node = self.parse_prefix()?;

        if self.check(Tok::Htr) || self.check(Tok::Tr) {
            node = self.new_with_data(Some(node));
        } else if self.check(Tok::Pow) || self.check(Tok::ElemPow) {
            node = self.new_with_data(Some(node));
            match self.parse_prefix() {
                Some(rhs) => self.ast.add_down(node, Some(rhs)),
                None => return self.err_missing("expression", "power"),
            }
        }
        Some(node)
    }

    fn parse_unary(&mut self) -> Option<NodeId> {
        if self.accept(Tok::Plus) {
            return self.parse_power();
        }
        if self.check(Tok::Minus) || self.check(Tok::Not) {
            let node = self.new_with_data(None);
            match self.parse_power() {
                Some(rhs) => self.ast.add_down(node, Some(rhs)),
                None => return self.err_missing("expression", "unary"),
            }
            return Some(node);
        }
        self.parse_power()
    }

    fn parse_postfix(&mut self) -> Option<NodeId> {
        let mut node = self.parse_unary()?;
        if self.check(Tok::Inc) || self.check(Tok::Dec) {
            node = self.new_with_data(Some(node));
        }
        Some(node)
    }

    fn parse_binary_chain(
        &mut self,
        ops: &[Tok],
        operand: fn(&mut Parser) -> Option<NodeId>,
        rule: &str,
    ) -> Option<NodeId> {
        let mut node = operand(self)?;
        while ops.contains(&self.tok) {
            node = self.new_with_data(Some(node));
            match operand(self) {
                Some(rhs) => self.ast.add_down(node, Some(rhs)),
                None => return self.err_missing("expression", rule),
            }
        }
        Some(node)
    }

    fn parse_mult(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(
            &[Tok::Mul, Tok::ElemMul, Tok::Div, Tok::ElemDiv, Tok::Ldiv, Tok::ElemLdiv],
            Parser::parse_postfix,
            "mult",
        )
    }

    fn parse_add(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(&[Tok::Plus, Tok::Minus], Parser::parse_mult, "add")
    }

    fn parse_range(&mut self) -> Option<NodeId> {
        let mut node = self.parse_add()?;

        while self.check(Tok::Colon) {
            if !self.ast.kind(node).is_tok(Tok::Colon) {
                node = self.new_with_parms(NodeKind::Tok(Tok::Colon), false, Some(node));
                self.set_context(node);
            }
            self.fetch();
            match self.parse_add() {
                Some(rhs) => self.ast.add_down(node, Some(rhs)),
                None => return self.err_missing("expression", "range"),
            }
        }

        if self.ast.kind(node).is_tok(Tok::Colon) {
            if self.ast.n_down(node) == 2 {
                // a:b normalizes to a:1:b by synthesizing the unit step.
                let end = self.ast.get_down(node, 1);
                self.ast.add_down(node, end);
                let step = self.ast.new_node(NodeKind::Tok(Tok::Int));
                self.ast.node_mut(step).data = NodeData::Int(1);
                self.ast.node_mut(step).up = Some(node);
                self.ast.node_mut(node).down[1] = Some(step);
            } else if self.ast.n_down(node) != 3 {
                self.error("invalid range expression");
                return None;
            }
        }

        Some(node)
    }

    fn parse_reln(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(
            &[Tok::Lt, Tok::Le, Tok::Gt, Tok::Ge, Tok::Eq, Tok::Ne],
            Parser::parse_range,
            "reln",
        )
    }

    fn parse_ewand(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(&[Tok::ElemAnd], Parser::parse_reln, "ewand")
    }

    fn parse_ewor(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(&[Tok::ElemOr], Parser::parse_ewand, "ewor")
    }

    fn parse_lgand(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(&[Tok::And], Parser::parse_ewor, "lgand")
    }

    fn parse_lgor(&mut self) -> Option<NodeId> {
        self.parse_binary_chain(&[Tok::Or], Parser::parse_lgand, "lgor")
    }

    /// expr : lgor (('=' | 'op=') expr)? — right-associative; compound
    /// assignment desugars to `lhs = lhs op rhs`.
    fn parse_expr(&mut self) -> Option<NodeId> {
        let mut node = self.parse_lgor()?;

        if self.check(Tok::Assign) {
            if !(self.ast.kind(node).is_tok(Tok::Ident)
                || self.ast.kind(node) == NodeKind::Column)
                || !self.valid_lvalue(node)
            {
                self.error("invalid left hand side in expr");
                return None;
            }

            node = self.new_with_data(Some(node));
            match self.parse_expr() {
                Some(rhs) => self.ast.add_down(node, Some(rhs)),
                None => return self.err_missing("expression", "expr"),
            }
            return Some(node);
        }

        let tbin = match self.tok {
            Tok::EqPlus => Some(Tok::Plus),
            Tok::EqMinus => Some(Tok::Minus),
            Tok::EqMul => Some(Tok::Mul),
            Tok::EqDiv => Some(Tok::Div),
            Tok::EqLdiv => Some(Tok::Ldiv),
            Tok::EqPow => Some(Tok::Pow),
            _ => None,
        };
        if let Some(tbin) = tbin {
            if !self.ast.kind(node).is_tok(Tok::Ident) || !self.valid_lvalue(node) {
                self.error("invalid left hand side in expr");
                return None;
            }

            let lhs_copy = self.ast.copy(node);
            let assign = self.new_with_parms(NodeKind::Tok(Tok::Assign), false, Some(lhs_copy));
            self.set_context(assign);

            let op = self.new_with_parms(NodeKind::Tok(tbin), false, Some(node));
            self.set_context(op);
            self.fetch();

            match self.parse_expr() {
                Some(rhs) => self.ast.add_down(op, Some(rhs)),
                None => return self.err_missing("expression", "expr"),
            }
            self.ast.add_down(assign, Some(op));
            return Some(assign);
        }

        Some(node)
    }

    // === simple statements ===

    fn parse_ids(&mut self, node: NodeId) -> usize {
        let mut n = 0;
        while self.check(Tok::Ident) {
            let id = self.new_with_data(None);
            self.ast.add_down(node, Some(id));
            n += 1;
        }
        n
    }

    fn parse_persist(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Persistent) {
            return None;
        }
        let node = self.new_with_kind(NodeKind::Tok(Tok::Persistent));
        if self.parse_ids(node) == 0 {
            return self.err_missing("identifier(s)", "persist");
        }
        Some(node)
    }

    fn parse_global(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Global) {
            return None;
        }
        let node = self.new_with_kind(NodeKind::Tok(Tok::Global));
        if self.parse_ids(node) == 0 {
            return self.err_missing("identifier(s)", "global");
        }
        Some(node)
    }

    // === compound statements ===

    /// try : 'try' stmt_end stmts 'catch' ID stmt_end stmts 'end'
    /// children: (try-stmts, catch-var, catch-stmts)
    fn parse_try(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Try) {
            return None;
        }
        if !self.require_stmt_end("try") {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::Try));
        let body = self.parse_stmts();
        self.ast.add_down(node, body);

        if !self.require(Tok::Catch, "try") {
            return None;
        }
        if !self.check(Tok::Ident) {
            return self.err_missing("catch variable", "try");
        }
        let var = self.new_with_data(None);
        self.ast.add_down(node, Some(var));

        if !self.require_stmt_end("try") {
            return None;
        }
        let catch_body = self.parse_stmts();
        self.ast.add_down(node, catch_body);

        if !self.require(Tok::End, "try") {
            return None;
        }
        Some(node)
    }

    /// if : 'if' expr stmt_end stmts (elseif expr stmt_end stmts)*
    ///      ('else' stmt_end stmts)? 'end'
    /// children: (cond, body)* with a final (null, else-body) pair.
    fn parse_if(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::If) {
            return None;
        }

        let Some(cond) = self.parse_expr() else {
            return self.err_missing("expression", "if");
        };
        if !self.require_stmt_end("if") {
            return None;
        }

        let node = self.new_with_parms(NodeKind::Tok(Tok::If), false, Some(cond));
        let body = self.parse_stmts();
        self.ast.add_down(node, body);

        while self.accept(Tok::ElseIf) {
            match self.parse_expr() {
                Some(cond) => self.ast.add_down(node, Some(cond)),
                None => return self.err_missing("expression", "if"),
            }
            if !self.require_stmt_end("if") {
                return None;
            }
            let body = self.parse_stmts();
            self.ast.add_down(node, body);
        }

        if self.accept(Tok::Else) {
            if !self.require_stmt_end("if") {
                return None;
            }
            self.ast.add_down(node, None);
            let body = self.parse_stmts();
            self.ast.add_down(node, body);
        }

        if !self.require(Tok::End, "if") {
            return None;
        }
        Some(node)
    }

    /// switch : 'switch' expr stmt_end (case value stmt_end stmts)*
    ///          ('otherwise' stmt_end stmts)? 'end'
    /// children: (scrutinee, (value, body)*, [null, otherwise-body])
    fn parse_switch(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Switch) {
            return None;
        }

        let Some(expr) = self.parse_expr() else {
            return self.err_missing("expression", "switch");
        };
        if !self.require_stmt_end("switch") {
            return None;
        }

        let node = self.new_with_parms(NodeKind::Tok(Tok::Switch), false, Some(expr));

        while self.accept(Tok::Case) {
            match self.parse_value() {
                Some(value) => self.ast.add_down(node, Some(value)),
                None => return self.err_missing("case value", "switch"),
            }
            if !self.require_stmt_end("switch") {
                return None;
            }
            let body = self.parse_stmts();
            self.ast.add_down(node, body);
        }

        if self.accept(Tok::Otherwise) {
            if !self.require_stmt_end("switch") {
                return None;
            }
            self.ast.add_down(node, None);
            let body = self.parse_stmts();
            self.ast.add_down(node, body);
        }

        if !self.require(Tok::End, "switch") {
            return None;
        }
        Some(node)
    }

    /// for : 'for' ID '=' lgor stmt_end stmts 'end'
    /// children: (loop-var, iteration-expr, body)
    fn parse_for(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::For) {
            return None;
        }
        if !self.check(Tok::Ident) {
            return self.err_missing_tok(Tok::Ident, "for");
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::For));
        let var = self.new_with_data(None);
        self.ast.add_down(node, Some(var));

        if !self.require(Tok::Assign, "for") {
            return None;
        }
        match self.parse_lgor() {
            Some(expr) => self.ast.add_down(node, Some(expr)),
            None => return self.err_missing("iterator expression", "for"),
        }

        if !self.require_stmt_end("for") {
            return None;
        }
        let body = self.parse_stmts();
        self.ast.add_down(node, body);

        if !self.require(Tok::End, "for") {
            return None;
        }
        Some(node)
    }

    fn parse_while(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::While) {
            return None;
        }

        let Some(cond) = self.parse_expr() else {
            return self.err_missing("expression", "while");
        };
        if !self.require_stmt_end("while") {
            return None;
        }

        let node = self.new_with_parms(NodeKind::Tok(Tok::While), false, Some(cond));
        let body = self.parse_stmts();
        self.ast.add_down(node, body);

        if !self.require(Tok::End, "while") {
            return None;
        }
        Some(node)
    }

    /// until : 'do' stmt_end stmts 'until' expr
    /// children: (body, cond)
    fn parse_until(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Do) {
            return None;
        }
        if !self.require_stmt_end("until") {
            return None;
        }

        let body = self.parse_stmts();
        let node = self.new_with_parms(NodeKind::Tok(Tok::Until), false, body);
        if !self.require(Tok::Until, "until") {
            return None;
        }

        match self.parse_expr() {
            Some(cond) => self.ast.add_down(node, Some(cond)),
            None => return self.err_missing("expression", "until"),
        }
        Some(node)
    }

    // === statements ===

    fn parse_stmt(&mut self) -> Option<NodeId> {
        self.skip_newlines();

        let node = if self.check(Tok::Break)
            || self.check(Tok::Continue)
            || self.check(Tok::Return)
        {
            Some(self.new_with_data(None))
        } else if self.check(Tok::Persistent) {
            self.parse_persist()
        } else if self.check(Tok::Global) {
            self.parse_global()
        } else if self.check(Tok::Try) {
            self.parse_try()
        } else if self.check(Tok::If) {
            self.parse_if()
        } else if self.check(Tok::Switch) {
            self.parse_switch()
        } else if self.check(Tok::For) {
            self.parse_for()
        } else if self.check(Tok::While) {
            self.parse_while()
        } else if self.check(Tok::Do) {
            self.parse_until()
        } else {
            self.parse_expr()
        };

        let node = node?;

        if self.accept(Tok::Semi) {
            self.ast.node_mut(node).disp = false;
        } else if self.accept(Tok::Comma) || self.accept(Tok::Eol) {
            self.ast.node_mut(node).disp = true;
        } else {
            return self.err_missing("end of statement", "stmt");
        }

        while self.check(Tok::Semi) || self.check(Tok::Comma) || self.check(Tok::Eol) {
            self.fetch();
        }

        Some(node)
    }

    /// Skip to the next statement boundary after an error. Returns false
    /// when the list cannot continue (end of input or a block closer).
    fn synchronize(&mut self) -> bool {
        loop {
            match self.tok {
                Tok::Eof => return false,
                Tok::Semi | Tok::Comma | Tok::Eol => {
                    self.fetch();
                    self.skip_newlines();
                    return true;
                }
                Tok::End
                | Tok::Catch
                | Tok::Case
                | Tok::Otherwise
                | Tok::Else
                | Tok::ElseIf
                | Tok::Until
                | Tok::Function
                | Tok::ClassDef => return false,
                _ => self.fetch(),
            }
        }
    }

    fn parse_stmt_recover(&mut self) -> Option<NodeId> {
        loop {
            let before = self.errs + self.scan.errors();
            if let Some(node) = self.parse_stmt() {
                return Some(node);
            }
            if self.errs + self.scan.errors() == before {
                return None;
            }
            if !self.synchronize() {
                return None;
            }
        }
    }

    fn parse_stmts(&mut self) -> Option<NodeId> {
        let mut node = self.parse_stmt_recover()?;

        while let Some(down) = self.parse_stmt_recover() {
            if self.ast.kind(node) != NodeKind::Statements {
                node = self.new_with_parms(NodeKind::Statements, false, Some(node));
            }
            self.ast.add_down(node, Some(down));
        }
        Some(node)
    }

    // === functions ===

    fn parse_args(&mut self) -> Option<NodeId> {
        if !self.check(Tok::Ident) {
            return None;
        }

        let first = self.new_with_data(None);
        let node = self.new_with_parms(NodeKind::Ids, false, Some(first));

        while self.accept(Tok::Comma) {
            if !self.check(Tok::Ident) {
                return self.err_missing_tok(Tok::Ident, "args");
            }
            let next = self.new_with_data(None);
            self.ast.add_down(node, Some(next));
        }
        Some(node)
    }

    /// function : 'function' (argout '=')? ID argin? stmt_end stmts 'end'
    /// children: (argout|null, name, argin|null, stmts)
    fn parse_function(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Function) {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Function);

        if self.check(Tok::Ident) {
            let first = self.new_with_data(None);
            if self.accept(Tok::Assign) {
                // single return: `function x = f(...)`
                self.ast.add_down(node, Some(first));
                if !self.check(Tok::Ident) {
                    return self.err_missing("function name", "function");
                }
                let name = self.new_with_data(None);
                self.ast.add_down(node, Some(name));
            } else {
                // no return: the identifier was the function name
                self.ast.add_down(node, None);
                self.ast.add_down(node, Some(first));
            }
        } else if self.accept(Tok::BrackOpen) {
            // multi-return: `function [x, y] = f(...)`
            let argout = self.parse_args();
            self.ast.add_down(node, argout);
            if !self.require(Tok::BrackClose, "function") {
                return None;
            }
            if !self.require(Tok::Assign, "function") {
                return None;
            }
            if !self.check(Tok::Ident) {
                return self.err_missing("function name", "function");
            }
            let name = self.new_with_data(None);
            self.ast.add_down(node, Some(name));
        } else {
            self.error("syntax error in function");
            return None;
        }

        if self.accept(Tok::ParenOpen) {
            let argin = self.parse_args();
            self.ast.add_down(node, argin);
            if !self.require(Tok::ParenClose, "function") {
                return None;
            }
        } else {
            self.ast.add_down(node, None);
        }

        if !self.require_stmt_end("function") {
            return None;
        }
        let body = self.parse_stmts();
        self.ast.add_down(node, body);

        if !self.require(Tok::End, "function") {
            return None;
        }
        Some(node)
    }

    // === classes ===

    fn parse_properties(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Properties) {
            return None;
        }
        if !self.require_stmt_end("properties") {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::Properties));
        while self.check(Tok::Ident) {
            let name = self.new_with_data(None);
            self.ast.add_down(node, Some(name));

            if self.accept(Tok::Assign) {
                match self.parse_value() {
                    Some(value) => self.ast.add_down(node, Some(value)),
                    None => return self.err_missing("property value", "properties"),
                }
            } else {
                self.ast.add_down(node, None);
            }

            if !self.require_stmt_end("properties") {
                return None;
            }
        }

        if !self.require(Tok::End, "properties") {
            return None;
        }
        Some(node)
    }

    fn parse_methods(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Methods) {
            return None;
        }
        if !self.require_stmt_end("methods") {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::Methods));
        loop {
            self.skip_newlines();
            let func = self.parse_function();
            self.ast.add_down(node, func);
            self.skip_newlines();
            if self.ast.last(node).is_none() {
                break;
            }
        }
        self.ast.shrink_down(node);

        if !self.require(Tok::End, "methods") {
            return None;
        }
        Some(node)
    }

    fn parse_events(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Events) {
            return None;
        }
        if !self.require_stmt_end("events") {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::Events));
        while self.check(Tok::Ident) {
            let name = self.new_with_data(None);
            self.ast.add_down(node, Some(name));
            if !self.require_stmt_end("events") {
                return None;
            }
        }

        if !self.require(Tok::End, "events") {
            return None;
        }
        Some(node)
    }

    fn parse_enums(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Enum) {
            return None;
        }
        if !self.require_stmt_end("enumeration") {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Tok(Tok::Enum));
        while self.check(Tok::Ident) {
            let name = self.new_with_data(None);
            self.ast.add_down(node, Some(name));

            if self.accept(Tok::ParenOpen) {
                let value = self.parse_value();
                self.ast.add_down(node, value);
                if !self.require(Tok::ParenClose, "enumeration") {
                    return None;
                }
            } else {
                self.ast.add_down(node, None);
            }

            if !self.require_stmt_end("enumeration") {
                return None;
            }
        }

        if !self.require(Tok::End, "enumeration") {
            return None;
        }
        Some(node)
    }

    /// inherits : '<' ID ('&' ID)*
    fn parse_inherits(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::Lt) {
            return None;
        }

        let node = self.new_with_kind(NodeKind::Ids);
        if !self.check(Tok::Ident) {
            return self.err_missing_tok(Tok::Ident, "inherits");
        }
        let first = self.new_with_data(None);
        self.ast.add_down(node, Some(first));

        while self.accept(Tok::ElemAnd) {
            if !self.check(Tok::Ident) {
                return self.err_missing_tok(Tok::Ident, "inherits");
            }
            let next = self.new_with_data(None);
            self.ast.add_down(node, Some(next));
        }
        Some(node)
    }

    /// class : 'classdef' ID inherits? sections 'end'
    /// At most one of each section kind.
    fn parse_class(&mut self) -> Option<NodeId> {
        if !self.accept(Tok::ClassDef) {
            return None;
        }
        if !self.check(Tok::Ident) {
            return self.err_missing_tok(Tok::Ident, "class");
        }

        let name = self.new_with_data(None);
        let node = self.new_with_parms(NodeKind::Class, false, Some(name));
        let inherits = self.parse_inherits();
        self.ast.add_down(node, inherits);

        if !self.require_stmt_end("class") {
            return None;
        }

        let mut have = [false; 4];
        loop {
            self.skip_newlines();

            let (slot, section) = if self.check(Tok::Properties) {
                (0, self.parse_properties())
            } else if self.check(Tok::Methods) {
                (1, self.parse_methods())
            } else if self.check(Tok::Events) {
                (2, self.parse_events())
            } else if self.check(Tok::Enum) {
                (3, self.parse_enums())
            } else {
                break;
            };

            if have[slot] {
                self.error("class sections may only be defined once");
                return None;
            }
            have[slot] = true;
            section?;
            self.ast.add_down(node, section);
        }

        if !self.require(Tok::End, "class") {
            return None;
        }
        Some(node)
    }

    // === top level ===

    fn parse_block(&mut self) -> Option<NodeId> {
        self.skip_newlines();

        if self.check(Tok::ClassDef) {
            self.parse_class()
        } else if self.check(Tok::Function) {
            self.parse_function()
        } else {
            self.parse_stmt_recover()
        }
    }

    fn parse_blocks(&mut self) -> Option<NodeId> {
        let mut node = self.parse_block()?;

        while let Some(down) = self.parse_block() {
            if self.ast.kind(node) != NodeKind::Root {
                node = self.new_with_parms(NodeKind::Root, false, Some(node));
            }
            self.ast.add_down(node, Some(down));
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Parser {
        let mut p = Parser::new();
        assert!(p.parse_string(src), "parse failed for {src:?}");
        p
    }

    fn parse_err(src: &str) -> Parser {
        let mut p = Parser::new();
        assert!(!p.parse_string(src), "parse unexpectedly succeeded for {src:?}");
        p
    }

    /// First statement under the root.
    fn first_stmt(p: &Parser) -> NodeId {
        let root = p.tree().unwrap();
        if p.ast.kind(root) == NodeKind::Root {
            p.ast.first(root).unwrap()
        } else {
            root
        }
    }

    #[test]
    fn colon_normalizes_to_three_children() {
        let p = parse("a = 1:10;\n");
        let assign = first_stmt(&p);
        assert!(p.ast.kind(assign).is_tok(Tok::Assign));
        let colon = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(colon).is_tok(Tok::Colon));
        assert_eq!(p.ast.n_down(colon), 3);

        let begin = p.ast.get_down(colon, 0).unwrap();
        let step = p.ast.get_down(colon, 1).unwrap();
        let end = p.ast.get_down(colon, 2).unwrap();
        assert_eq!(p.ast.node(begin).data, NodeData::Int(1));
        assert_eq!(p.ast.node(step).data, NodeData::Int(1));
        assert_eq!(p.ast.node(end).data, NodeData::Int(10));
    }

    #[test]
    fn explicit_step_ranges_keep_their_step() {
        let p = parse("a = 1:2:9;\n");
        let colon = p.ast.get_down(first_stmt(&p), 1).unwrap();
        assert_eq!(p.ast.n_down(colon), 3);
        let step = p.ast.get_down(colon, 1).unwrap();
        assert_eq!(p.ast.node(step).data, NodeData::Int(2));
    }

    #[test]
    fn compound_assignment_desugars() {
        // x += 2 becomes x = x + 2.
        let p = parse("x = 0; x += 2;\n");
        let root = p.tree().unwrap();
        let assign = p.ast.get_down(root, 1).unwrap();
        assert!(p.ast.kind(assign).is_tok(Tok::Assign));

        let lhs = p.ast.get_down(assign, 0).unwrap();
        assert!(p.ast.kind(lhs).is_tok(Tok::Ident));
        assert_eq!(p.ast.get_string(lhs), Some("x"));

        let plus = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(plus).is_tok(Tok::Plus));
        let a = p.ast.get_down(plus, 0).unwrap();
        let b = p.ast.get_down(plus, 1).unwrap();
        assert_eq!(p.ast.get_string(a), Some("x"));
        assert_eq!(p.ast.node(b).data, NodeData::Int(2));
    }

    #[test]
    fn if_children_pair_conditions_with_bodies() {
        let p = parse("if a, x = 1; elseif b, x = 2; else, x = 3; end\n");
        let node = first_stmt(&p);
        assert!(p.ast.kind(node).is_tok(Tok::If));
        assert_eq!(p.ast.n_down(node), 6);
        assert!(p.ast.get_down(node, 0).is_some());
        assert!(p.ast.get_down(node, 2).is_some());
        // the else pair starts with a null condition slot
        assert!(p.ast.get_down(node, 4).is_none());
        assert!(p.ast.get_down(node, 5).is_some());
    }

    #[test]
    fn if_without_else_has_no_null_pair() {
        let p = parse("if a, x = 1; end\n");
        let node = first_stmt(&p);
        assert_eq!(p.ast.n_down(node), 2);
    }

    #[test]
    fn statement_terminators_set_the_display_flag() {
        let p = parse("x = 1;\ny = 2,\nz = 3\n");
        let root = p.tree().unwrap();
        let x = p.ast.get_down(root, 0).unwrap();
        let y = p.ast.get_down(root, 1).unwrap();
        let z = p.ast.get_down(root, 2).unwrap();
        assert!(!p.ast.node(x).disp);
        assert!(p.ast.node(y).disp);
        assert!(p.ast.node(z).disp);
    }

    #[test]
    fn matrix_literals_parse_as_columns_of_rows() {
        let p = parse("m = [1, 2; 3, 4];\n");
        let assign = first_stmt(&p);
        let column = p.ast.get_down(assign, 1).unwrap();
        assert_eq!(p.ast.kind(column), NodeKind::Column);
        assert_eq!(p.ast.n_down(column), 2);
        let row = p.ast.first(column).unwrap();
        assert_eq!(p.ast.kind(row), NodeKind::Row);
        assert_eq!(p.ast.n_down(row), 2);
    }

    #[test]
    fn empty_matrix_is_an_empty_node() {
        let p = parse("m = [];\n");
        let assign = first_stmt(&p);
        let empty = p.ast.get_down(assign, 1).unwrap();
        assert_eq!(p.ast.kind(empty), NodeKind::Empty);
    }

    #[test]
    fn function_forms_lay_out_children() {
        // no return
        let p = parse("function f()\nx = 1;\nend\n");
        let f = first_stmt(&p);
        assert_eq!(p.ast.kind(f), NodeKind::Function);
        assert!(p.ast.get_down(f, 0).is_none());
        let name = p.ast.get_down(f, 1).unwrap();
        assert_eq!(p.ast.get_string(name), Some("f"));

        // single return
        let p = parse("function y = g(a, b)\ny = a;\nend\n");
        let g = first_stmt(&p);
        let argout = p.ast.get_down(g, 0).unwrap();
        assert!(p.ast.kind(argout).is_tok(Tok::Ident));
        let argin = p.ast.get_down(g, 2).unwrap();
        assert_eq!(p.ast.kind(argin), NodeKind::Ids);
        assert_eq!(p.ast.n_down(argin), 2);

        // multi-return
        let p = parse("function [u, v] = h()\nu = 1; v = 2;\nend\n");
        let h = first_stmt(&p);
        let argout = p.ast.get_down(h, 0).unwrap();
        assert_eq!(p.ast.kind(argout), NodeKind::Ids);
        assert_eq!(p.ast.n_down(argout), 2);
    }

    #[test]
    fn do_until_orders_body_before_condition() {
        let p = parse("do\nx = 1;\nuntil x\n");
        let node = first_stmt(&p);
        assert!(p.ast.kind(node).is_tok(Tok::Until));
        assert_eq!(p.ast.n_down(node), 2);
        let cond = p.ast.get_down(node, 1).unwrap();
        assert!(p.ast.kind(cond).is_tok(Tok::Ident));
    }

    #[test]
    fn try_catch_binds_the_catch_variable() {
        let p = parse("try, x = 1; catch e, y = 2; end\n");
        let node = first_stmt(&p);
        assert!(p.ast.kind(node).is_tok(Tok::Try));
        assert_eq!(p.ast.n_down(node), 3);
        let var = p.ast.get_down(node, 1).unwrap();
        assert_eq!(p.ast.get_string(var), Some("e"));
    }

    #[test]
    fn switch_layout_pairs_values_and_bodies() {
        let p = parse("switch x\ncase 1, a = 1;\ncase 2, a = 2;\notherwise, a = 3;\nend\n");
        let node = first_stmt(&p);
        assert!(p.ast.kind(node).is_tok(Tok::Switch));
        // scrutinee + 2*(value, body) + (null, otherwise)
        assert_eq!(p.ast.n_down(node), 7);
        assert!(p.ast.get_down(node, 5).is_none());
    }

    #[test]
    fn qualified_names_chain() {
        let p = parse("y = s.f(1, end);\n");
        let assign = first_stmt(&p);
        let name = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(name).is_tok(Tok::Ident));
        assert_eq!(p.ast.n_down(name), 2);
        let field = p.ast.get_down(name, 0).unwrap();
        assert!(p.ast.kind(field).is_tok(Tok::Point));
        let paren = p.ast.get_down(name, 1).unwrap();
        assert!(p.ast.kind(paren).is_tok(Tok::ParenOpen));
        let end = p.ast.get_down(paren, 1).unwrap();
        assert!(p.ast.kind(end).is_tok(Tok::End));
    }

    #[test]
    fn lvalue_rejects_expressions() {
        let p = parse_err("1 = x;\n");
        assert!(p.errors() > 0);

        let p = parse_err("x + y = 3;\n");
        assert!(p.errors() > 0);
    }

    #[test]
    fn lvalue_rejects_superclass_field_mix() {
        // @ID.X is not a bindable target.
        let p = parse_err("x@Base.f = 3;\n");
        assert!(p.errors() > 0);
    }

    #[test]
    fn lvalue_rejects_multi_level_parentheses() {
        let p = parse_err("x(1)(2) = 3;\n");
        assert!(p.errors() > 0);

        // a single subscript level is fine
        let p = parse("x(1) = 3;\n");
        assert!(p.ast.kind(first_stmt(&p)).is_tok(Tok::Assign));
    }

    #[test]
    fn compound_assignment_requires_a_plain_identifier() {
        let p = parse_err("[a, b] += 1;\n");
        assert!(p.errors() > 0);
    }

    #[test]
    fn multi_return_assignment_parses() {
        let p = parse("[a, b] = f(x);\n");
        let assign = first_stmt(&p);
        assert!(p.ast.kind(assign).is_tok(Tok::Assign));
        let lhs = p.ast.get_down(assign, 0).unwrap();
        assert_eq!(p.ast.kind(lhs), NodeKind::Column);
    }

    #[test]
    fn classdef_sections_may_not_repeat() {
        let p = parse_err(
            "classdef A\nproperties\nx\nend\nproperties\ny\nend\nend\n",
        );
        assert!(p.errors() > 0);
    }

    #[test]
    fn classdef_with_inheritance_parses() {
        let p = parse("classdef A < B & C\nproperties\nx\nend\nend\n");
        let class = first_stmt(&p);
        assert_eq!(p.ast.kind(class), NodeKind::Class);
        let inherits = p.ast.get_down(class, 1).unwrap();
        assert_eq!(p.ast.kind(inherits), NodeKind::Ids);
        assert_eq!(p.ast.n_down(inherits), 2);
    }

    #[test]
    fn only_the_first_error_is_printed_but_all_count() {
        let mut p = Parser::new();
        assert!(!p.parse_string("x = ;\ny = ;\nz = 1;\n"));
        assert!(p.errors() >= 2, "expected both statements to count, got {}", p.errors());
    }

    #[test]
    fn merging_two_parses_shares_one_root() {
        let mut p = Parser::new();
        assert!(p.parse_string("x = 1;\n"));
        assert!(p.parse_string("function f()\ny = 2;\nend\n"));
        let root = p.tree().unwrap();
        assert_eq!(p.ast.kind(root), NodeKind::Root);
        assert_eq!(p.ast.n_down(root), 2);
        assert_eq!(p.ast.kind(p.ast.get_down(root, 1).unwrap()), NodeKind::Function);
    }

    #[test]
    fn transpose_binds_tighter_than_multiplication() {
        let p = parse("y = A' * B;\n");
        let assign = first_stmt(&p);
        let mul = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(mul).is_tok(Tok::Mul));
        let lhs = p.ast.get_down(mul, 0).unwrap();
        assert!(p.ast.kind(lhs).is_tok(Tok::Htr));
    }

    #[test]
    fn unary_plus_vanishes_and_minus_stays() {
        let p = parse("y = +x;\n");
        let assign = first_stmt(&p);
        let rhs = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(rhs).is_tok(Tok::Ident));

        let p = parse("y = -x;\n");
        let assign = first_stmt(&p);
        let rhs = p.ast.get_down(assign, 1).unwrap();
        assert!(p.ast.kind(rhs).is_tok(Tok::Minus));
        assert_eq!(p.ast.n_down(rhs), 1);
    }
}
