//! Textual value tree (codec layer 1).
//!
//! A small tree of integers, strings, booleans and keyed tables, printed in a
//! table-literal syntax:
//!
//! ```text
//! {version=1,type="layout",data={level=10,slots={[5]={t="s",n="Fireball",r="Rank 1"}}}}
//! ```
//!
//! Integer keys `1..n` with no gaps print positionally (`{"a","b"}`).
//! Both printing and parsing are bounded to [`MAX_VALUE_DEPTH`] levels of
//! nesting, and the parser rejects anything it does not fully understand.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use thiserror::Error;

use crate::constants::{MAX_EXPORT_LEN, MAX_VALUE_DEPTH};
use crate::error::LayoutError;

/// Table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Integer key
    Int(i64),
    /// String key
    Str(String),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

/// Keyed table, ordered with integer keys first.
pub type Table = BTreeMap<Key, Value>;

/// A node of the value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// String
    Str(String),
    /// Table
    Table(Table),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Table> for Value {
    fn from(value: Table) -> Self {
        Self::Table(value)
    }
}

impl Value {
    /// Builds a positional table from a list of values.
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::Table(
            items
                .into_iter()
                .zip(1_i64..)
                .map(|(value, index)| (Key::Int(index), value))
                .collect(),
        )
    }

    /// Returns the table, if this is one.
    #[must_use]
    pub const fn as_table(&self) -> Option<&Table> {
        match self {
            Self::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Returns the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Looks up a string key in a table.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_table()?.get(&Key::Str(key.to_string()))
    }
}

/// Errors from printing or parsing a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Nesting deeper than the limit
    #[error("value nesting exceeds {MAX_VALUE_DEPTH} levels")]
    TooDeep,
    /// Input longer than the limit
    #[error("input of {0} bytes exceeds the size limit")]
    TooLong(usize),
    /// Input ended inside a value
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// Unexpected byte
    #[error("unexpected '{found}' at offset {pos}")]
    Unexpected {
        /// Offending character
        found: char,
        /// Byte offset
        pos: usize,
    },
    /// Malformed or out-of-range integer
    #[error("invalid number at offset {0}")]
    InvalidNumber(usize),
    /// Unknown escape sequence
    #[error("invalid escape at offset {0}")]
    InvalidEscape(usize),
    /// String bytes are not UTF-8
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    /// Table key that is not an integer or string
    #[error("invalid table key at offset {0}")]
    InvalidKey(usize),
    /// Same key twice in one table
    #[error("duplicate table key at offset {0}")]
    DuplicateKey(usize),
    /// Bytes left after the top-level value
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
}

impl From<ValueError> for LayoutError {
    fn from(err: ValueError) -> Self {
        Self::DecodeFailed(err.to_string())
    }
}

// ============================================================================
// Printing
// ============================================================================

/// Prints a value tree.
pub fn to_text(value: &Value) -> Result<String, ValueError> {
    let mut out = String::new();
    write_value(&mut out, value, 0)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &Value, depth: usize) -> Result<(), ValueError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(ValueError::TooDeep);
    }
    match value {
        Value::Nil => out.push_str("nil"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(n) => {
            let _ = write!(out, "{n}");
        }
        Value::Str(s) => write_string(out, s),
        Value::Table(table) => write_table(out, table, depth)?,
    }
    Ok(())
}

fn write_table(out: &mut String, table: &Table, depth: usize) -> Result<(), ValueError> {
    out.push('{');
    let mut first = true;
    let mut separator = |out: &mut String| {
        if !first {
            out.push(',');
        }
        first = false;
    };

    // Positional run 1..n
    let mut next_index = 1_i64;
    while let Some(value) = table.get(&Key::Int(next_index)) {
        if matches!(value, Value::Nil) {
            break;
        }
        separator(out);
        write_value(out, value, depth + 1)?;
        next_index += 1;
    }

    for (key, value) in table {
        if matches!(value, Value::Nil) {
            continue;
        }
        match key {
            Key::Int(n) if (1..next_index).contains(n) => continue,
            Key::Int(n) => {
                separator(out);
                let _ = write!(out, "[{n}]=");
            }
            Key::Str(s) if is_identifier(s) => {
                separator(out);
                out.push_str(s);
                out.push('=');
            }
            Key::Str(s) => {
                separator(out);
                out.push('[');
                write_string(out, s);
                out.push_str("]=");
            }
        }
        write_value(out, value, depth + 1)?;
    }

    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\{:03}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(s, "nil" | "true" | "false")
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses a value tree, rejecting oversized, overdeep or malformed input.
pub fn from_text(text: &str) -> Result<Value, ValueError> {
    if text.len() > MAX_EXPORT_LEN {
        return Err(ValueError::TooLong(text.len()));
    }
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_whitespace();
    let value = parser.value(0)?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(ValueError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn unexpected(&self) -> ValueError {
        match self.peek() {
            Some(b) => ValueError::Unexpected {
                found: char::from(b),
                pos: self.pos,
            },
            None => ValueError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), ValueError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, ValueError> {
        if depth > MAX_VALUE_DEPTH {
            return Err(ValueError::TooDeep);
        }
        match self.peek() {
            Some(b'{') => self.table(depth),
            Some(b'"') => self.string().map(Value::Str),
            Some(b'-' | b'0'..=b'9') => self.integer().map(Value::Int),
            Some(b) if b.is_ascii_alphabetic() => {
                let start = self.pos;
                match self.identifier() {
                    "nil" => Ok(Value::Nil),
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    _ => {
                        self.pos = start;
                        Err(self.unexpected())
                    }
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    fn identifier(&mut self) -> &str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        // Identifier bytes are ASCII
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default()
    }

    fn integer(&mut self) -> Result<i64, ValueError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(ValueError::InvalidNumber(start));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(ValueError::InvalidNumber(start))
    }

    fn string(&mut self) -> Result<String, ValueError> {
        self.expect(b'"')?;
        let mut buf = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(ValueError::UnexpectedEnd);
            };
            self.pos += 1;
            match b {
                b'"' => break,
                b'\\' => {
                    let escape_pos = self.pos - 1;
                    let Some(next) = self.peek() else {
                        return Err(ValueError::UnexpectedEnd);
                    };
                    self.pos += 1;
                    match next {
                        b'"' => buf.push(b'"'),
                        b'\\' => buf.push(b'\\'),
                        b'n' => buf.push(b'\n'),
                        b'r' => buf.push(b'\r'),
                        b't' => buf.push(b'\t'),
                        b'0'..=b'9' => {
                            let mut code = u32::from(next - b'0');
                            for _ in 0..2 {
                                match self.peek() {
                                    Some(d @ b'0'..=b'9') => {
                                        code = code * 10 + u32::from(d - b'0');
                                        self.pos += 1;
                                    }
                                    _ => break,
                                }
                            }
                            let byte =
                                u8::try_from(code).map_err(|_| ValueError::InvalidEscape(escape_pos))?;
                            buf.push(byte);
                        }
                        _ => return Err(ValueError::InvalidEscape(escape_pos)),
                    }
                }
                other => buf.push(other),
            }
        }
        String::from_utf8(buf).map_err(|_| ValueError::InvalidUtf8)
    }

    fn table(&mut self, depth: usize) -> Result<Value, ValueError> {
        self.expect(b'{')?;
        let mut table = Table::new();
        let mut next_index = 1_i64;

        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                break;
            }

            let entry_pos = self.pos;
            let (key, value) = match self.peek() {
                Some(b'[') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    let key = match self.value(depth + 1)? {
                        Value::Int(n) => Key::Int(n),
                        Value::Str(s) => Key::Str(s),
                        _ => return Err(ValueError::InvalidKey(entry_pos)),
                    };
                    self.skip_whitespace();
                    self.expect(b']')?;
                    self.skip_whitespace();
                    self.expect(b'=')?;
                    self.skip_whitespace();
                    (key, self.value(depth + 1)?)
                }
                Some(b) if b.is_ascii_alphabetic() || b == b'_' => {
                    let name = self.identifier().to_string();
                    self.skip_whitespace();
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        (Key::Str(name), self.value(depth + 1)?)
                    } else {
                        // A bare literal in positional form
                        self.pos = entry_pos;
                        let key = Key::Int(next_index);
                        next_index += 1;
                        (key, self.value(depth + 1)?)
                    }
                }
                _ => {
                    let key = Key::Int(next_index);
                    next_index += 1;
                    (key, self.value(depth + 1)?)
                }
            };

            if table.insert(key, value).is_some() {
                return Err(ValueError::DuplicateKey(entry_pos));
            }

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.unexpected()),
            }
        }

        Ok(Value::Table(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: Vec<(Key, Value)>) -> Value {
        Value::Table(entries.into_iter().collect())
    }

    #[test]
    fn test_print_scalars() {
        assert_eq!(to_text(&Value::Int(-42)).unwrap(), "-42");
        assert_eq!(to_text(&Value::Bool(true)).unwrap(), "true");
        assert_eq!(to_text(&Value::Nil).unwrap(), "nil");
        assert_eq!(
            to_text(&Value::from("say \"hi\"\n")).unwrap(),
            r#""say \"hi\"\n""#
        );
    }

    #[test]
    fn test_print_collapses_positional_run() {
        let value = table(vec![
            (Key::Int(1), Value::from("a")),
            (Key::Int(2), Value::from("b")),
            (Key::Int(5), Value::from("e")),
            (Key::from("name"), Value::from("x")),
            (Key::from("two words"), Value::Int(1)),
        ]);
        assert_eq!(
            to_text(&value).unwrap(),
            r#"{"a","b",[5]="e",name="x",["two words"]=1}"#
        );
    }

    #[test]
    fn test_parse_mixed_table() {
        let parsed = from_text(r#" { "a" , [5] = "e", name = "x", true, ["k"]={} } "#).unwrap();
        let expected = table(vec![
            (Key::Int(1), Value::from("a")),
            (Key::Int(2), Value::Bool(true)),
            (Key::Int(5), Value::from("e")),
            (Key::from("name"), Value::from("x")),
            (Key::from("k"), Value::Table(Table::new())),
        ]);
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_text_round_trip() {
        let value = table(vec![
            (Key::from("version"), Value::Int(1)),
            (
                Key::from("data"),
                Value::list(vec![Value::from("tab\there"), Value::from("ünïcode"), Value::Int(0)]),
            ),
            (Key::from("ctrl"), Value::from("\u{1}bell")),
        ]);
        let text = to_text(&value).unwrap();
        assert_eq!(from_text(&text).unwrap(), value);
    }

    #[test]
    fn test_depth_limit() {
        let mut value = Value::Int(1);
        for _ in 0..=MAX_VALUE_DEPTH {
            value = Value::list(vec![value]);
        }
        assert_eq!(to_text(&value), Err(ValueError::TooDeep));

        let deep = format!("{}{}", "{".repeat(100), "}".repeat(100));
        assert_eq!(from_text(&deep), Err(ValueError::TooDeep));

        let ok = format!("{}{}", "{".repeat(MAX_VALUE_DEPTH), "}".repeat(MAX_VALUE_DEPTH));
        assert!(from_text(&ok).is_ok());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(from_text("").is_err());
        assert!(from_text("{").is_err());
        assert!(from_text("{1,,2}").is_err());
        assert!(from_text("{a=}").is_err());
        assert!(from_text(r#""unterminated"#).is_err());
        assert!(from_text(r#""\q""#).is_err());
        assert!(from_text(r#""\999""#).is_err());
        assert!(from_text("99999999999999999999").is_err());
        assert!(from_text("{[{}]=1}").is_err());
        assert!(from_text("{a=1,a=2}").is_err());
        assert!(from_text("{} {}").is_err());
        assert!(from_text("function() end").is_err());
        assert!(from_text("-").is_err());
    }

    #[test]
    fn test_rejects_oversized_input() {
        let huge = "1".repeat(MAX_EXPORT_LEN + 1);
        assert!(matches!(from_text(&huge), Err(ValueError::TooLong(_))));
    }

    #[test]
    fn test_value_error_maps_to_decode_failed() {
        let err: LayoutError = ValueError::UnexpectedEnd.into();
        assert!(matches!(err, LayoutError::DecodeFailed(_)));
    }
}
