//! Lexical scanner.
//!
//! Input is either a file, streamed through a fixed-size buffer with
//! margin-driven refills, or a whole string. The scanner tracks the
//! current token as a pair of byte indices into the buffer and hands the
//! parser one token at a time.
//!
//! The single context-sensitive decision of the lexer lives here: a `'`
//! is a transpose token when the previous byte could end a value (an
//! identifier character or a closing bracket/brace/paren) and a string
//! opener everywhere else.

use std::fs::File;
use std::io::Read;

use crate::token::{RESERVED, Tok};

const BUF_SIZE: usize = 4096;
const BUF_MARGIN: usize = 16;

pub struct Scanner {
    source: Option<File>,
    fname: Option<String>,
    buf: Vec<u8>,
    /// Start of the current token.
    tok: usize,
    /// One past the last byte accepted into the current token.
    tok_end: usize,
    /// Bytes shifted out of the buffer by refills.
    buf_pos: usize,
    lineno: usize,
    errs: usize,
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_ident(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Scanner {
        Scanner {
            source: None,
            fname: None,
            buf: Vec::new(),
            tok: 0,
            tok_end: 0,
            buf_pos: 0,
            lineno: 1,
            errs: 0,
        }
    }

    fn close(&mut self) {
        self.source = None;
        self.fname = None;
        self.buf.clear();
        self.tok = 0;
        self.tok_end = 0;
        self.buf_pos = 0;
        self.lineno = 1;
        self.errs = 0;
    }

    /// Begin scanning a file.
    pub fn set_file(&mut self, fname: &str) -> Result<(), String> {
        self.close();
        let file = File::open(fname)
            .map_err(|_| format!("unable to open '{fname}' for reading"))?;
        self.fname = Some(fname.to_owned());
        self.source = Some(file);
        self.buf = Vec::with_capacity(BUF_SIZE);
        self.refill();
        Ok(())
    }

    /// Begin scanning an in-memory string.
    pub fn set_string(&mut self, text: &str) {
        self.close();
        self.buf = text.as_bytes().to_vec();
    }

    /// Shift consumed bytes out of the buffer and top it up from the
    /// input file; the file is dropped once exhausted.
    fn refill(&mut self) {
        if self.source.is_none() {
            return;
        }
        self.buf_pos += self.tok;
        self.buf.drain(..self.tok);
        self.tok_end -= self.tok.min(self.tok_end);
        self.tok = 0;

        let want = BUF_SIZE.saturating_sub(self.buf.len());
        if want == 0 {
            return;
        }
        let mut chunk = vec![0u8; want];
        let mut got = 0;
        if let Some(file) = self.source.as_mut() {
            while got < want {
                match file.read(&mut chunk[got..]) {
                    Ok(0) => break,
                    Ok(n) => got += n,
                    Err(_) => break,
                }
            }
        }
        self.buf.extend_from_slice(&chunk[..got]);
        if got < want {
            self.source = None;
        }
    }

    fn maybe_refill(&mut self, need: usize) {
        if self.source.is_some()
            && self.buf.len().saturating_sub(self.tok_end) < need + BUF_MARGIN
        {
            self.refill();
        }
    }

    /// Byte `i` positions past the token end, without consuming.
    fn at(&self, i: usize) -> u8 {
        self.buf.get(self.tok_end + i).copied().unwrap_or(0)
    }

    /// Accept the next lookahead byte into the token and return it;
    /// returns 0 at end of stream (still advancing, so `pushback`
    /// remains symmetric).
    fn lookahead(&mut self) -> u8 {
        self.maybe_refill(1);
        let p = self.tok_end;
        self.tok_end = p + 1;
        self.buf.get(p).copied().unwrap_or(0)
    }

    /// Return `n` accepted bytes to the stream, never shrinking the
    /// token below one byte.
    fn pushback(&mut self, n: usize) {
        let p = self.tok_end.saturating_sub(n);
        self.tok_end = p.max(self.tok + 1);
    }

    /// Last byte accepted into the token.
    fn current(&self) -> u8 {
        if self.tok_end == 0 {
            return 0;
        }
        self.buf.get(self.tok_end - 1).copied().unwrap_or(0)
    }

    // === diagnostics ===

    /// Report a lexical error. Only the first error of a run prints; all
    /// of them count.
    fn error(&mut self, msg: &str) {
        if self.errs == 0 {
            eprintln!(
                "{}:{}: error: {}",
                self.filename(),
                self.lineno(),
                msg
            );
            eprint!("{}", self.line_str());
        }
        self.errs += 1;
    }

    /// The current line with a caret under the token start.
    pub fn line_str(&self) -> String {
        let at = self.tok.min(self.buf.len().saturating_sub(1));
        let mut start = at;
        while start > 0 && self.buf[start - 1] != b'\n' {
            start -= 1;
        }
        let mut end = at;
        while end < self.buf.len() && self.buf[end] != b'\n' {
            end += 1;
        }
        let line = String::from_utf8_lossy(&self.buf[start..end]);
        let caret_at = at - start;
        format!(" {line}\n {:caret$}^\n", "", caret = caret_at)
    }

    pub fn filename(&self) -> &str {
        self.fname.as_deref().unwrap_or("(string)")
    }

    pub fn lineno(&self) -> usize {
        if self.buf.get(self.tok) == Some(&b'\n') {
            self.lineno.saturating_sub(1)
        } else {
            self.lineno
        }
    }

    /// Byte offset of the current token in the whole input.
    pub fn pos(&self) -> usize {
        self.buf_pos + self.tok
    }

    pub fn errors(&self) -> usize {
        self.errs
    }

    // === lexeme access ===

    pub fn lexeme(&self) -> &str {
        let end = self.tok_end.min(self.buf.len());
        std::str::from_utf8(&self.buf[self.tok..end]).unwrap_or("")
    }

    pub fn string_value(&self) -> String {
        self.lexeme().to_owned()
    }

    pub fn int_value(&self) -> i64 {
        self.lexeme().parse().unwrap_or(0)
    }

    pub fn float_value(&self) -> f64 {
        self.lexeme()
            .trim_end_matches(['i', 'j', 'I', 'J'])
            .parse()
            .unwrap_or(0.0)
    }

    // === non-printing input ===

    fn consume_whitespace(&mut self) {
        loop {
            self.maybe_refill(1);
            if !matches!(self.at(0), b' ' | b'\t') {
                break;
            }
            self.tok_end += 1;
            self.tok = self.tok_end;
        }
    }

    fn consume_nonprinting(&mut self) {
        loop {
            self.maybe_refill(4);
            self.consume_whitespace();

            // Line continuation: swallow "...\n" without emitting an EOL.
            if self.at(0) == b'.'
                && self.at(1) == b'.'
                && self.at(2) == b'.'
                && self.at(3) == b'\n'
            {
                self.tok_end += 4;
                self.tok = self.tok_end;
                self.lineno += 1;
                continue;
            }

            if self.at(0) == b'%' && self.at(1) == b'{' {
                self.tok_end += 2;
                self.tok = self.tok_end;
                loop {
                    self.maybe_refill(2);
                    match self.at(0) {
                        0 => break,
                        b'%' if self.at(1) == b'}' => {
                            self.tok_end += 2;
                            self.tok = self.tok_end;
                            break;
                        }
                        b'\n' => {
                            self.lineno += 1;
                            self.tok_end += 1;
                            self.tok = self.tok_end;
                        }
                        _ => {
                            self.tok_end += 1;
                            self.tok = self.tok_end;
                        }
                    }
                }
                continue;
            }

            if self.at(0) == b'%' {
                while self.at(0) != b'\n' && self.at(0) != 0 {
                    self.maybe_refill(1);
                    self.tok_end += 1;
                    self.tok = self.tok_end;
                }
                continue;
            }

            break;
        }
    }

    // === token states ===

    fn state_str(&mut self, ter: u8) -> Tok {
        loop {
            let look = self.lookahead();
            if look == ter {
                return Tok::Str;
            }
            if look == b'\n' || look == 0 {
                self.pushback(1);
                self.error(&format!("malformed string {}", self.lexeme()));
                return Tok::Err;
            }
        }
    }

    fn state_float_end(&mut self) -> Tok {
        loop {
            let cur = self.current();
            match self.lookahead() {
                c if is_digit(c) => continue,
                b'i' | b'j' | b'I' | b'J' => return Tok::Complex,
                _ => {
                    self.pushback(1);
                    if cur == b'-' || cur == b'+' {
                        self.error(&format!("malformed float '{}'", self.lexeme()));
                        return Tok::Err;
                    }
                    return Tok::Float;
                }
            }
        }
    }

    fn state_float_exp(&mut self) -> Tok {
        let look = self.lookahead();
        if look == b'-' || look == b'+' || is_digit(look) {
            return self.state_float_end();
        }
        self.pushback(1);
        self.error(&format!("malformed float '{}'", self.lexeme()));
        Tok::Err
    }

    fn state_float(&mut self) -> Tok {
        loop {
            let cur = self.current();
            match self.lookahead() {
                b'e' | b'E' => {
                    // "1.e5" has no digits after the point.
                    if cur == b'.' {
                        self.error(&format!("malformed float '{}'", self.lexeme()));
                        return Tok::Err;
                    }
                    return self.state_float_exp();
                }
                b'i' | b'j' | b'I' | b'J' => return Tok::Complex,
                c if is_digit(c) => continue,
                _ => {
                    self.pushback(1);
                    return Tok::Float;
                }
            }
        }
    }

    fn state_int(&mut self) -> Tok {
        loop {
            match self.lookahead() {
                b'.' => return self.state_float(),
                b'e' | b'E' => return self.state_float_exp(),
                b'i' | b'j' | b'I' | b'J' => return Tok::Complex,
                c if is_digit(c) => continue,
                _ => {
                    self.pushback(1);
                    return Tok::Int;
                }
            }
        }
    }

    fn state_point(&mut self) -> Tok {
        let look = self.lookahead();
        match look {
            b'\'' => Tok::Tr,
            b'^' => Tok::ElemPow,
            b'+' => Tok::Plus,
            b'-' => Tok::Minus,
            b'*' => Tok::ElemMul,
            b'/' => Tok::ElemDiv,
            b'\\' => Tok::ElemLdiv,
            c if is_digit(c) => self.state_float(),
            _ => {
                self.pushback(1);
                Tok::Point
            }
        }
    }

    fn state_plus(&mut self) -> Tok {
        match self.lookahead() {
            b'+' => Tok::Inc,
            b'=' => Tok::EqPlus,
            _ => {
                self.pushback(1);
                Tok::Plus
            }
        }
    }

    fn state_minus(&mut self) -> Tok {
        match self.lookahead() {
            b'-' => Tok::Dec,
            b'=' => Tok::EqMinus,
            _ => {
                self.pushback(1);
                Tok::Minus
            }
        }
    }

    fn state_op(&mut self, without: Tok, with: Tok) -> Tok {
        if self.lookahead() == b'=' {
            with
        } else {
            self.pushback(1);
            without
        }
    }

    fn state_doub(&mut self, prev: u8, one: Tok, two: Tok) -> Tok {
        if self.lookahead() == prev {
            two
        } else {
            self.pushback(1);
            one
        }
    }

    fn state_id(&mut self) -> Tok {
        loop {
            if !is_ident(self.lookahead()) {
                break;
            }
        }
        self.pushback(1);

        let lexeme = self.lexeme();
        for (tok, lex) in RESERVED {
            if lexeme == *lex {
                return *tok;
            }
        }
        Tok::Ident
    }

    /// Produce the next token from the input stream.
    pub fn next(&mut self) -> Tok {
        self.consume_nonprinting();

        if self.tok < self.tok_end {
            self.tok = self.tok_end;
        }
        self.maybe_refill(1);
        if self.tok >= self.buf.len() {
            return Tok::Eof;
        }

        let prev = if self.tok > 0 { self.buf[self.tok - 1] } else { 0 };
        let look = self.buf[self.tok];
        self.tok_end = self.tok + 1;

        match look {
            b'\n' => {
                self.lineno += 1;
                Tok::Eol
            }

            b'[' => Tok::BrackOpen,
            b'{' => Tok::BraceOpen,
            b'(' => Tok::ParenOpen,
            b']' => Tok::BrackClose,
            b'}' => Tok::BraceClose,
            b')' => Tok::ParenClose,
            b'@' => Tok::As,
            b',' => Tok::Comma,
            b':' => Tok::Colon,
            b';' => Tok::Semi,

            b'"' => self.state_str(b'"'),

            // Single quotes only open strings when the previous byte
            // cannot end a value.
            b'\'' => {
                if is_ident(prev) || prev == b']' || prev == b'}' || prev == b')' {
                    Tok::Htr
                } else {
                    self.state_str(b'\'')
                }
            }

            b'.' => self.state_point(),
            b'+' => self.state_plus(),
            b'-' => self.state_minus(),
            b'^' => self.state_op(Tok::Pow, Tok::EqPow),
            b'!' | b'~' => self.state_op(Tok::Not, Tok::Ne),
            b'*' => self.state_op(Tok::Mul, Tok::EqMul),
            b'/' => self.state_op(Tok::Div, Tok::EqDiv),
            b'\\' => self.state_op(Tok::Ldiv, Tok::EqLdiv),
            b'<' => self.state_op(Tok::Lt, Tok::Le),
            b'>' => self.state_op(Tok::Gt, Tok::Ge),
            b'=' => self.state_op(Tok::Assign, Tok::Eq),
            b'&' => self.state_doub(look, Tok::ElemAnd, Tok::And),
            b'|' => self.state_doub(look, Tok::ElemOr, Tok::Or),

            c if c.is_ascii_alphabetic() => self.state_id(),
            c if is_digit(c) => self.state_int(),

            _ => {
                self.pushback(1);
                Tok::Err
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(src: &str) -> Vec<Tok> {
        let mut s = Scanner::new();
        s.set_string(src);
        let mut toks = Vec::new();
        loop {
            let t = s.next();
            if t == Tok::Eof {
                break;
            }
            toks.push(t);
        }
        toks
    }

    #[test]
    fn transpose_after_identifier_string_elsewhere() {
        assert_eq!(scan_all("A'\n"), vec![Tok::Ident, Tok::Htr, Tok::Eol]);
        assert_eq!(scan_all("'hello'\n"), vec![Tok::Str, Tok::Eol]);
        assert_eq!(scan_all("x)'\n"), vec![Tok::Ident, Tok::ParenClose, Tok::Htr, Tok::Eol]);
        assert_eq!(scan_all("x + 'str'\n"), vec![Tok::Ident, Tok::Plus, Tok::Str, Tok::Eol]);
    }

    #[test]
    fn numeric_literals_promote() {
        assert_eq!(scan_all("42"), vec![Tok::Int]);
        assert_eq!(scan_all("4.5"), vec![Tok::Float]);
        assert_eq!(scan_all("4e3"), vec![Tok::Float]);
        assert_eq!(scan_all("1.5e-3"), vec![Tok::Float]);
        assert_eq!(scan_all("2i"), vec![Tok::Complex]);
        assert_eq!(scan_all("2.5J"), vec![Tok::Complex]);
        assert_eq!(scan_all(".5"), vec![Tok::Float]);
    }

    #[test]
    fn lexeme_values_parse() {
        let mut s = Scanner::new();
        s.set_string("3.5j");
        assert_eq!(s.next(), Tok::Complex);
        assert_eq!(s.float_value(), 3.5);

        let mut s = Scanner::new();
        s.set_string("1234");
        assert_eq!(s.next(), Tok::Int);
        assert_eq!(s.int_value(), 1234);
    }

    #[test]
    fn compound_assignment_operators() {
        assert_eq!(
            scan_all("x += 2"),
            vec![Tok::Ident, Tok::EqPlus, Tok::Int]
        );
        assert_eq!(scan_all("x ^= 2"), vec![Tok::Ident, Tok::EqPow, Tok::Int]);
        assert_eq!(scan_all("x \\= y"), vec![Tok::Ident, Tok::EqLdiv, Tok::Ident]);
    }

    #[test]
    fn elementwise_and_logical_operators() {
        assert_eq!(
            scan_all("a .* b ./ c .\\ d .^ e"),
            vec![
                Tok::Ident,
                Tok::ElemMul,
                Tok::Ident,
                Tok::ElemDiv,
                Tok::Ident,
                Tok::ElemLdiv,
                Tok::Ident,
                Tok::ElemPow,
                Tok::Ident
            ]
        );
        assert_eq!(
            scan_all("a & b && c | d || e"),
            vec![
                Tok::Ident,
                Tok::ElemAnd,
                Tok::Ident,
                Tok::And,
                Tok::Ident,
                Tok::ElemOr,
                Tok::Ident,
                Tok::Or,
                Tok::Ident
            ]
        );
        assert_eq!(scan_all("~x ~= y"), vec![Tok::Not, Tok::Ident, Tok::Ne, Tok::Ident]);
    }

    #[test]
    fn increment_decrement_and_dotted_transpose() {
        assert_eq!(scan_all("i++"), vec![Tok::Ident, Tok::Inc]);
        assert_eq!(scan_all("i--"), vec![Tok::Ident, Tok::Dec]);
        assert_eq!(scan_all("A.'"), vec![Tok::Ident, Tok::Tr]);
    }

    #[test]
    fn comments_and_continuations_are_invisible() {
        assert_eq!(scan_all("x % trailing comment"), vec![Tok::Ident]);
        assert_eq!(scan_all("%{\n comment\n%}\nx"), vec![Tok::Eol, Tok::Ident]);
        assert_eq!(scan_all("1 + ...\n2"), vec![Tok::Int, Tok::Plus, Tok::Int]);
    }

    #[test]
    fn line_numbers_follow_newlines() {
        let mut s = Scanner::new();
        s.set_string("a\nb\nc");
        assert_eq!(s.next(), Tok::Ident);
        assert_eq!(s.lineno(), 1);
        assert_eq!(s.next(), Tok::Eol);
        assert_eq!(s.next(), Tok::Ident);
        assert_eq!(s.lineno(), 2);
        assert_eq!(s.next(), Tok::Eol);
        assert_eq!(s.next(), Tok::Ident);
        assert_eq!(s.lineno(), 3);
    }

    #[test]
    fn token_positions_advance_by_consumed_bytes() {
        let mut s = Scanner::new();
        s.set_string("ab + cd");
        assert_eq!(s.next(), Tok::Ident);
        assert_eq!(s.pos(), 0);
        assert_eq!(s.next(), Tok::Plus);
        assert_eq!(s.pos(), 3);
        assert_eq!(s.next(), Tok::Ident);
        assert_eq!(s.pos(), 5);
        assert_eq!(s.lexeme(), "cd");
    }

    #[test]
    fn keywords_are_reserved() {
        assert_eq!(scan_all("for end while"), vec![Tok::For, Tok::End, Tok::While]);
        assert_eq!(scan_all("forx"), vec![Tok::Ident]);
    }

    #[test]
    fn malformed_string_counts_an_error() {
        let mut s = Scanner::new();
        s.set_string("'unterminated\n");
        assert_eq!(s.next(), Tok::Err);
        assert_eq!(s.errors(), 1);
    }

    #[test]
    fn malformed_float_counts_an_error() {
        let mut s = Scanner::new();
        s.set_string("1e+");
        assert_eq!(s.next(), Tok::Err);
        assert_eq!(s.errors(), 1);
    }

    #[test]
    fn file_input_streams_through_the_buffer() {
        use std::io::Write;
        let dir = std::env::temp_dir();
        let path = dir.join("matte_scanner_stream_test.m");
        let mut body = String::new();
        for i in 0..2000 {
            body.push_str(&format!("x{i} = {i};\n"));
        }
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        drop(f);

        let mut s = Scanner::new();
        s.set_file(path.to_str().unwrap()).unwrap();
        let mut idents = 0;
        loop {
            match s.next() {
                Tok::Eof => break,
                Tok::Ident => idents += 1,
                _ => {}
            }
        }
        assert_eq!(idents, 2000);
        assert_eq!(s.errors(), 0);
        std::fs::remove_file(&path).ok();
    }
}
