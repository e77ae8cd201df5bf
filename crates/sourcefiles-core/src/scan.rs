//! Import reference scanner.
//!
//! Finds the literal module specifiers of static `import`/`export ... from`
//! declarations and literal dynamic `import()` calls without a full parse.
//! Comments, strings, template literals and regular expressions are skipped.
//!
//! Offsets are byte offsets into the scanned text and span the quoted
//! literal including its quotes, so they can be spliced directly.

use crate::error::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// How a reference appears in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    /// `import x from "s"`, `import "s"`
    Import,
    /// `export * from "s"`, `export { a } from "s"`
    ReExport,
    /// `import("s")`
    Dynamic,
}

/// A single import reference. Every occurrence is reported, duplicates
/// included, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReference {
    /// Specifier text between the quotes.
    pub specifier: String,
    /// Offset of the opening quote.
    pub start: usize,
    /// Offset just past the closing quote.
    pub end: usize,
    pub kind: ReferenceKind,
}

/// Scan `text` (the module at `path`) for import references.
///
/// # Errors
/// Returns [`Error::Parse`] for a CommonJS `require(` call, an unterminated
/// string, comment or template, or a declaration without a `from` literal.
pub fn scan(path: &Path, text: &str) -> Result<Vec<ImportReference>> {
    let mut scanner = Scanner {
        path,
        text,
        bytes: text.as_bytes(),
        pos: 0,
        prev: Prev::Start,
        parens: Vec::new(),
        refs: Vec::new(),
    };
    if text.starts_with(BOM) {
        scanner.pos = BOM.len_utf8();
    }
    scanner.skip_hashbang();
    scanner.scan_code(false)?;
    Ok(scanner.refs)
}

const BOM: char = '\u{FEFF}';

/// Last significant token, used to tell a regex literal from division.
#[derive(Debug, Clone, Copy)]
enum Prev {
    Start,
    Punct(u8),
    Word(usize, usize),
    Value,
    /// `)` closing the head of `if`, `while`, `for` or `with`.
    HeadEnd,
}

/// Keywords after which `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// Keywords whose parenthesized head is followed by a statement.
const CONTROL_KEYWORDS: &[&str] = &["if", "while", "for", "with"];

struct Scanner<'a> {
    path: &'a Path,
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    prev: Prev,
    /// One entry per open `(`: whether it opened a control head.
    parens: Vec<bool>,
    refs: Vec<ImportReference>,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn is_ident_char(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

/// Non-ASCII characters that separate tokens.
fn is_unicode_space(c: char) -> bool {
    c == BOM || c.is_whitespace()
}

impl<'a> Scanner<'a> {
    fn error(&self, offset: usize, message: &str) -> Error {
        Error::parse(self.path, offset, message)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn skip_hashbang(&mut self) {
        if self.bytes[self.pos..].starts_with(b"#!") {
            self.skip_line_comment();
        }
    }

    /// Scan code until EOF, or until the `}` closing a template expression.
    fn scan_code(&mut self, in_template: bool) -> Result<()> {
        let mut depth = 0usize;

        while let Some(b) = self.peek(0) {
            if let Some(len) = self.unicode_space_len() {
                self.pos += len;
                continue;
            }
            match b {
                b if b.is_ascii_whitespace() => self.pos += 1,
                b'/' if self.peek(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'/' => {
                    if self.regex_allowed() && self.skip_regex() {
                        self.prev = Prev::Value;
                    } else {
                        self.pos += 1;
                        self.prev = Prev::Punct(b'/');
                    }
                }
                b'\'' | b'"' => {
                    self.read_literal()?;
                    self.prev = Prev::Value;
                }
                b'`' => {
                    self.skip_template()?;
                    self.prev = Prev::Value;
                }
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                    self.prev = Prev::Punct(b);
                }
                b'}' => {
                    self.pos += 1;
                    if in_template && depth == 0 {
                        return Ok(());
                    }
                    depth = depth.saturating_sub(1);
                    self.prev = Prev::Punct(b);
                }
                b if b.is_ascii_digit() => {
                    while self.peek(0).is_some_and(|c| is_ident_char(c) || c == b'.') {
                        self.pos += 1;
                    }
                    self.prev = Prev::Value;
                }
                b'(' => {
                    let head = matches!(self.prev, Prev::Word(start, end)
                        if CONTROL_KEYWORDS.contains(&&self.text[start..end]));
                    self.parens.push(head);
                    self.pos += 1;
                    self.prev = Prev::Punct(b);
                }
                b')' => {
                    self.pos += 1;
                    self.prev = if self.parens.pop().unwrap_or(false) {
                        Prev::HeadEnd
                    } else {
                        Prev::Punct(b)
                    };
                }
                b if is_ident_start(b) => {
                    let start = self.pos;
                    let end = self.ident_end(start);
                    let before = self.prev;
                    self.pos = end;
                    self.prev = Prev::Word(start, end);
                    if !self.is_member_access(start) {
                        self.on_word(start, end, before)?;
                    }
                }
                _ => {
                    self.pos += 1;
                    self.prev = Prev::Punct(b);
                }
            }
        }

        if in_template {
            return Err(self.error(self.pos, "unterminated template literal"));
        }
        Ok(())
    }

    /// React to a keyword; `before` is the token preceding it.
    fn on_word(&mut self, start: usize, end: usize, before: Prev) -> Result<()> {
        match &self.text[start..end] {
            "import" => self.scan_import(start),
            "export" => self.scan_export(start),
            "require" => {
                let after = self.pos;
                self.skip_trivia()?;
                let is_call = self.peek(0) == Some(b'(')
                    && !self.is_word(before, "function")
                    && !self.is_definition(self.pos);
                if is_call {
                    return Err(self.error(start, "CommonJS require() call cannot be served as an ES module"));
                }
                self.pos = after;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn is_word(&self, token: Prev, word: &str) -> bool {
        matches!(token, Prev::Word(start, end) if &self.text[start..end] == word)
    }

    /// Whether the parameter list opening at `open` is followed by a body,
    /// as in a method definition `require(x) { ... }`.
    fn is_definition(&self, open: usize) -> bool {
        let mut depth = 0usize;
        let mut i = open;
        while let Some(&b) = self.bytes.get(i) {
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return self.bytes[i + 1..]
                            .iter()
                            .find(|c| !c.is_ascii_whitespace())
                            == Some(&b'{');
                    }
                }
                b'\'' | b'"' | b'`' => {
                    i += 1;
                    while let Some(&c) = self.bytes.get(i) {
                        if c == b'\\' {
                            i += 1;
                        } else if c == b {
                            break;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn scan_import(&mut self, start: usize) -> Result<()> {
        let after = self.pos;
        self.skip_trivia()?;

        match self.peek(0) {
            Some(b'(') => {
                self.pos += 1;
                self.parens.push(false);
                self.prev = Prev::Punct(b'(');
                self.scan_dynamic_import()
            }
            Some(b'\'' | b'"') => {
                let (lit_start, lit_end) = self.read_literal()?;
                self.push(lit_start, lit_end, ReferenceKind::Import);
                Ok(())
            }
            Some(b) if b == b'{' || b == b'*' || is_ident_start(b) => self.scan_import_clause(start),
            // `import.meta`, or `import` used as a property name
            _ => {
                self.pos = after;
                Ok(())
            }
        }
    }

    /// `import(...)` after the opening paren. Only a single literal argument
    /// (optionally followed by an options argument) is a reference.
    fn scan_dynamic_import(&mut self) -> Result<()> {
        let resume = self.pos;
        self.skip_trivia()?;

        let literal = match self.peek(0) {
            Some(b'\'' | b'"') => Some(self.read_literal()?),
            Some(b'`') => self.read_plain_template()?,
            _ => None,
        };

        if let Some((lit_start, lit_end)) = literal {
            self.skip_trivia()?;
            if matches!(self.peek(0), Some(b')' | b',')) {
                self.push(lit_start, lit_end, ReferenceKind::Dynamic);
                return Ok(());
            }
        }

        self.pos = resume;
        Ok(())
    }

    /// The rest of `import <clause> from "s"`.
    fn scan_import_clause(&mut self, start: usize) -> Result<()> {
        loop {
            self.skip_trivia()?;
            let Some(b) = self.peek(0) else {
                return Err(self.error(start, "import declaration has no `from` clause"));
            };
            match b {
                b';' | b'=' => {
                    return Err(self.error(start, "import declaration has no `from` clause"));
                }
                b'\'' | b'"' => {
                    self.read_literal()?;
                }
                b if is_ident_start(b) => {
                    let word_start = self.pos;
                    self.pos = self.ident_end(word_start);
                    if &self.text[word_start..self.pos] == "from" {
                        self.skip_trivia()?;
                        if matches!(self.peek(0), Some(b'\'' | b'"')) {
                            let (lit_start, lit_end) = self.read_literal()?;
                            self.push(lit_start, lit_end, ReferenceKind::Import);
                            return Ok(());
                        }
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_export(&mut self, start: usize) -> Result<()> {
        let after = self.pos;
        self.skip_trivia()?;

        // `export type { A } from "s"`
        if self.word_at() == Some("type") {
            self.pos += "type".len();
            self.skip_trivia()?;
        }

        match self.peek(0) {
            Some(b'*') => {
                self.pos += 1;
                self.skip_trivia()?;
                if self.word_at() == Some("as") {
                    self.pos += "as".len();
                    self.skip_trivia()?;
                    match self.peek(0) {
                        Some(b'\'' | b'"') => {
                            self.read_literal()?;
                        }
                        Some(b) if is_ident_start(b) => self.pos = self.ident_end(self.pos),
                        _ => return Err(self.error(start, "expected a name after `export * as`")),
                    }
                }
                let (lit_start, lit_end) = self.expect_from_literal(start)?;
                self.push(lit_start, lit_end, ReferenceKind::ReExport);
                Ok(())
            }
            Some(b'{') => {
                self.skip_export_braces(start)?;
                let after_braces = self.pos;
                self.skip_trivia()?;
                if self.word_at() == Some("from") {
                    let (lit_start, lit_end) = self.expect_from_literal(start)?;
                    self.push(lit_start, lit_end, ReferenceKind::ReExport);
                } else {
                    self.pos = after_braces;
                    self.prev = Prev::Punct(b'}');
                }
                Ok(())
            }
            _ => {
                self.pos = after;
                Ok(())
            }
        }
    }

    fn skip_export_braces(&mut self, start: usize) -> Result<()> {
        self.pos += 1;
        loop {
            self.skip_trivia()?;
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated export clause")),
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'\'' | b'"') => {
                    self.read_literal()?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// `from "s"`, returning the literal span.
    fn expect_from_literal(&mut self, start: usize) -> Result<(usize, usize)> {
        self.skip_trivia()?;
        if self.word_at() != Some("from") {
            return Err(self.error(start, "expected `from` clause"));
        }
        self.pos += "from".len();
        self.skip_trivia()?;
        if !matches!(self.peek(0), Some(b'\'' | b'"')) {
            return Err(self.error(self.pos, "expected a module specifier literal after `from`"));
        }
        self.read_literal()
    }

    fn push(&mut self, start: usize, end: usize, kind: ReferenceKind) {
        self.refs.push(ImportReference {
            specifier: self.text[start + 1..end - 1].to_string(),
            start,
            end,
            kind,
        });
        self.prev = Prev::Value;
    }

    /// Read a `'` or `"` string at the cursor; returns its span.
    fn read_literal(&mut self) -> Result<(usize, usize)> {
        let start = self.pos;
        let quote = self.bytes[start];
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some(b'\n') => return Err(self.error(start, "unterminated string literal")),
                Some(b'\\') => self.pos += 2,
                Some(b) if b == quote => {
                    self.pos += 1;
                    return Ok((start, self.pos));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// A template literal with no `${` substitutions; `None` (cursor
    /// unchanged) otherwise.
    fn read_plain_template(&mut self) -> Result<Option<(usize, usize)>> {
        let start = self.pos;
        let mut i = start + 1;
        loop {
            match self.bytes.get(i) {
                None => return Err(self.error(start, "unterminated template literal")),
                Some(b'\\') => i += 2,
                Some(b'`') => {
                    self.pos = i + 1;
                    return Ok(Some((start, self.pos)));
                }
                Some(b'$') if self.bytes.get(i + 1) == Some(&b'{') => return Ok(None),
                Some(_) => i += 1,
            }
        }
    }

    fn skip_template(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error(start, "unterminated template literal")),
                Some(b'\\') => self.pos += 2,
                Some(b'`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b'$') if self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.prev = Prev::Punct(b'{');
                    self.scan_code(true)?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Skip a regex literal at the cursor. Returns false (cursor unchanged)
    /// if the line ends first, in which case the `/` was division after all.
    fn skip_regex(&mut self) -> bool {
        let mut i = self.pos + 1;
        let mut in_class = false;
        loop {
            match self.bytes.get(i) {
                None | Some(b'\n') => return false,
                Some(b'\\') => i += 2,
                Some(b'[') => {
                    in_class = true;
                    i += 1;
                }
                Some(b']') => {
                    in_class = false;
                    i += 1;
                }
                Some(b'/') if !in_class => {
                    i += 1;
                    break;
                }
                Some(_) => i += 1,
            }
        }
        while self.bytes.get(i).is_some_and(|&b| is_ident_char(b)) {
            i += 1;
        }
        self.pos = i;
        true
    }

    fn regex_allowed(&self) -> bool {
        match self.prev {
            Prev::Start | Prev::HeadEnd => true,
            Prev::Punct(b) => !matches!(b, b')' | b']'),
            Prev::Word(start, end) => REGEX_PRECEDING_KEYWORDS.contains(&&self.text[start..end]),
            Prev::Value => false,
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek(0).is_some_and(|b| b != b'\n') {
            self.pos += 1;
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.pos;
        match self.text[start + 2..].find("*/") {
            Some(i) => {
                self.pos = start + 2 + i + 2;
                Ok(())
            }
            None => Err(self.error(start, "unterminated block comment")),
        }
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            if let Some(len) = self.unicode_space_len() {
                self.pos += len;
                continue;
            }
            match (self.peek(0), self.peek(1)) {
                (Some(b), _) if b.is_ascii_whitespace() => self.pos += 1,
                (Some(b'/'), Some(b'/')) => self.skip_line_comment(),
                (Some(b'/'), Some(b'*')) => self.skip_block_comment()?,
                _ => return Ok(()),
            }
        }
    }

    /// Length of the non-ASCII whitespace character at the cursor, if any.
    fn unicode_space_len(&self) -> Option<usize> {
        let c = self.text.get(self.pos..)?.chars().next()?;
        (!c.is_ascii() && is_unicode_space(c)).then(|| c.len_utf8())
    }

    fn ident_end(&self, start: usize) -> usize {
        let mut end = start;
        while let Some(&b) = self.bytes.get(end) {
            if b.is_ascii() {
                if !is_ident_char(b) {
                    break;
                }
                end += 1;
                continue;
            }
            match self.text.get(end..).and_then(|rest| rest.chars().next()) {
                Some(c) if !is_unicode_space(c) => end += c.len_utf8(),
                _ => break,
            }
        }
        end
    }

    fn word_at(&self) -> Option<&'a str> {
        let start = self.pos;
        if !self.peek(0).is_some_and(is_ident_start) {
            return None;
        }
        Some(&self.text[start..self.ident_end(start)])
    }

    /// Whether the word at `start` follows a `.` (but not a `...` spread).
    fn is_member_access(&self, start: usize) -> bool {
        let before = self.bytes[..start]
            .iter()
            .rev()
            .copied()
            .skip_while(u8::is_ascii_whitespace);
        let mut before = before.take(2);
        before.next() == Some(b'.') && before.next() != Some(b'.')
    }
}
