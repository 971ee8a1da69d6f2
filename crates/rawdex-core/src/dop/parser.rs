//! Recursive-descent parser for DxO Optics Pro sidecars.
//!
//! ```text
//! document   = key_value
//! key_value  = key '=' value
//! key        = one or more chars that are not space/tab/newline
//! value      = bool | real | integer | string | list_wrap | group_wrap
//! real       = decimal number with a '.' or an exponent
//! integer    = signed 64-bit decimal
//! string     = '"' *(char except '"') '"'
//! list_wrap  = '{' list  [','] '}'
//! group_wrap = '{' group [','] '}'
//! list       = empty | value (',' value)*
//! group      = key_value (',' key_value)*
//! ```
//!
//! Spaces, tabs and newlines are skipped between tokens. Alternatives are
//! tried in order with backtracking, so `{}` is an empty list and a plain
//! integer literal is never read as a real.

use std::collections::BTreeMap;
use std::io::Read;

use super::value::{DopValue, KeyValuePair};
use crate::error::DopError;

/// Nesting limit for lists and groups.
const MAX_DEPTH: usize = 128;

/// Parse a complete DOP document.
///
/// Fails if the document does not match the grammar or if anything other
/// than whitespace follows it.
pub fn parse_document(input: &[u8]) -> Result<KeyValuePair, DopError> {
    let mut parser = Parser::new(input);
    let pair = parser.key_value(0);
    parser.skip_space();
    match pair {
        Some(pair) if parser.at_end() => Ok(pair),
        _ => Err(DopError::Parse {
            offset: parser.furthest,
        }),
    }
}

/// Read a stream to its end and parse it as a DOP document.
pub fn parse_reader<R: Read>(mut reader: R) -> Result<KeyValuePair, DopError> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    parse_document(&input)
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n')
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
    /// Furthest offset reached, reported on failure
    furthest: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            furthest: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos += n;
        self.furthest = self.furthest.max(self.pos);
    }

    fn skip_space(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    /// Run `f`, rewinding to the current position if it fails.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let start = self.pos;
        let result = f(self);
        if result.is_none() {
            self.pos = start;
        }
        result
    }

    fn literal(&mut self, lit: &[u8]) -> bool {
        self.skip_space();
        if self.input[self.pos..].starts_with(lit) {
            self.advance(lit.len());
            true
        } else {
            false
        }
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.advance(1);
        }
        self.pos - start
    }

    fn sign(&mut self) {
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance(1);
        }
    }

    fn key_value(&mut self, depth: usize) -> Option<KeyValuePair> {
        self.attempt(|p| {
            let key = p.key()?;
            if !p.literal(b"=") {
                return None;
            }
            let value = p.value(depth)?;
            Some(KeyValuePair { key, value })
        })
    }

    fn key(&mut self) -> Option<String> {
        self.skip_space();
        let start = self.pos;
        while self.peek().is_some_and(|b| !is_space(b)) {
            self.advance(1);
        }
        if self.pos == start {
            return None;
        }
        Some(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn value(&mut self, depth: usize) -> Option<DopValue> {
        if depth > MAX_DEPTH {
            return None;
        }
        self.skip_space();
        self.attempt(|p| p.boolean())
            .or_else(|| self.attempt(|p| p.real()))
            .or_else(|| self.attempt(|p| p.integer()))
            .or_else(|| self.attempt(|p| p.string()))
            .or_else(|| self.attempt(|p| p.list_wrap(depth + 1)))
            .or_else(|| self.attempt(|p| p.group_wrap(depth + 1)))
    }

    fn boolean(&mut self) -> Option<DopValue> {
        if self.literal(b"true") {
            Some(DopValue::Bool(true))
        } else if self.literal(b"false") {
            Some(DopValue::Bool(false))
        } else {
            None
        }
    }

    fn real(&mut self) -> Option<DopValue> {
        let start = self.pos;
        self.sign();
        let int_digits = self.digits();
        let mut has_dot = false;
        let mut frac_digits = 0;
        if self.peek() == Some(b'.') {
            self.advance(1);
            has_dot = true;
            frac_digits = self.digits();
        }
        if int_digits + frac_digits == 0 {
            return None;
        }

        let mut has_exponent = false;
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let before_exponent = self.pos;
            self.advance(1);
            self.sign();
            if self.digits() > 0 {
                has_exponent = true;
            } else {
                self.pos = before_exponent;
            }
        }

        if !has_dot && !has_exponent {
            return None;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).ok()?;
        text.parse().ok().map(DopValue::Real)
    }

    fn integer(&mut self) -> Option<DopValue> {
        let start = self.pos;
        self.sign();
        if self.digits() == 0 {
            return None;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos]).ok()?;
        text.parse().ok().map(DopValue::Int)
    }

    fn string(&mut self) -> Option<DopValue> {
        if self.peek() != Some(b'"') {
            return None;
        }
        self.advance(1);
        let start = self.pos;
        let len = self.input[start..].iter().position(|&b| b == b'"')?;
        self.advance(len + 1);
        Some(DopValue::Text(
            String::from_utf8_lossy(&self.input[start..start + len]).into_owned(),
        ))
    }

    fn list_wrap(&mut self, depth: usize) -> Option<DopValue> {
        if !self.literal(b"{") {
            return None;
        }
        let mut entries = Vec::new();
        if let Some(first) = self.attempt(|p| p.value(depth)) {
            entries.push(first);
            while let Some(next) = self.attempt(|p| {
                if p.literal(b",") {
                    p.value(depth)
                } else {
                    None
                }
            }) {
                entries.push(next);
            }
        }
        self.attempt(|p| p.literal(b",").then_some(()));
        self.literal(b"}").then_some(DopValue::List(entries))
    }

    fn group_wrap(&mut self, depth: usize) -> Option<DopValue> {
        if !self.literal(b"{") {
            return None;
        }
        let mut entries = BTreeMap::new();
        let first = self.key_value(depth)?;
        entries.insert(first.key, first.value);
        while let Some(next) = self.attempt(|p| {
            if p.literal(b",") {
                p.key_value(depth)
            } else {
                None
            }
        }) {
            // Later duplicates replace earlier ones.
            entries.insert(next.key, next.value);
        }
        self.attempt(|p| p.literal(b",").then_some(()));
        self.literal(b"}").then_some(DopValue::Group(entries))
    }
}
