//! Array-literal group files.
//!
//! Group files are PHP scripts that return one array literal:
//!
//! ```text
//! <?php
//!
//! return [
//!   'failed' => 'These credentials do not match our records.',
//!   'password' => [
//!     'reset' => 'Your password has been reset.',
//!   ],
//! ];
//! ```
//!
//! The reader accepts the literal subset that translation files use: `[...]`
//! and `array(...)`, single and double quoted strings (without variable
//! interpolation), `.` concatenation of string literals, integers, floats,
//! `true`/`false`/`null` and comments. Anything else is reported with its
//! position.
//!
//! The writer emits short-array brackets, two spaces per nesting level,
//! single-quoted strings, bare integer keys and a trailing comma after every
//! entry.

use serde_json::{
    Map,
    Number,
    Value,
};

use super::CodecError;

/// One nesting level of rendered output.
pub const INDENT: &str = "  ";

/// Parses a group file into its (possibly nested) translation tree.
pub fn parse(source: &str) -> Result<Map<String, Value>, CodecError> {
    Parser::new(source).parse_file()
}

/// Renders a translation tree as a group file.
#[must_use]
pub fn render(tree: &Map<String, Value>) -> String {
    let mut output = String::from("<?php\n\nreturn ");
    write_map(&mut output, tree, 0);
    output.push_str(";\n");
    output
}

/// Two spaces per level.
fn write_indent(output: &mut String, depth: usize) {
    for _ in 0..depth {
        output.push_str(INDENT);
    }
}

/// Writes a nested array, `[]` when empty.
fn write_map(output: &mut String, map: &Map<String, Value>, depth: usize) {
    write_entries(output, map.iter().map(|(k, v)| (k.clone(), v)), map.is_empty(), depth);
}

/// Writes `key => value,` lines.
fn write_entries<'a>(
    output: &mut String,
    entries: impl Iterator<Item = (String, &'a Value)>,
    empty: bool,
    depth: usize,
) {
    if empty {
        output.push_str("[]");
        return;
    }

    output.push_str("[\n");
    for (key, value) in entries {
        write_indent(output, depth + 1);
        write_key(output, &key);
        output.push_str(" => ");
        write_value(output, value, depth + 1);
        output.push_str(",\n");
    }
    write_indent(output, depth);
    output.push(']');
}

/// Integer-like keys are written bare.
fn write_key(output: &mut String, key: &str) {
    if canonical_int(key).is_some() {
        output.push_str(key);
    } else {
        write_string(output, key);
    }
}

/// Scalars inline, objects as nested arrays.
fn write_value(output: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => output.push_str(&n.to_string()),
        Value::String(s) => write_string(output, s),
        Value::Array(items) => write_entries(
            output,
            items.iter().enumerate().map(|(i, v)| (i.to_string(), v)),
            items.is_empty(),
            depth,
        ),
        Value::Object(map) => write_map(output, map, depth),
    }
}

/// Single-quoted literal with `\\` and `\'` escaped.
fn write_string(output: &mut String, s: &str) {
    output.push('\'');
    for c in s.chars() {
        if c == '\\' || c == '\'' {
            output.push('\\');
        }
        output.push(c);
    }
    output.push('\'');
}

/// Returns the integer a key string denotes when PHP would store it as an
/// integer key (`"0"`, `"42"`, `"-7"`, but not `"007"` or `"+1"`).
fn canonical_int(key: &str) -> Option<i64> {
    let digits = key.strip_prefix('-').unwrap_or(key);
    let mut chars = digits.chars();
    let first = chars.next()?;
    if !first.is_ascii_digit() || !chars.all(|c| c.is_ascii_digit()) {
        return None;
    }
    if first == '0' && (digits.len() > 1 || key.starts_with('-')) {
        return None;
    }
    key.parse().ok()
}

/// Recursive-descent reader over the characters of one file.
struct Parser {
    /// Source characters.
    chars: Vec<char>,
    /// Index of the next unread character.
    pos: usize,
}

impl Parser {
    /// Parser at the start of `source`.
    fn new(source: &str) -> Self {
        Self { chars: source.trim_start_matches('\u{feff}').chars().collect(), pos: 0 }
    }

    /// Next character.
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    /// Character `offset` positions ahead.
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Consumes one character.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Error at the current position.
    fn error(&self, message: impl Into<String>) -> CodecError {
        let mut line = 1;
        let mut column = 1;
        for c in self.chars.iter().take(self.pos) {
            if *c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        CodecError::new(line, column, message)
    }

    /// The next character for error messages.
    fn describe_next(&self) -> String {
        self.peek().map_or_else(|| "end of file".to_string(), |c| format!("'{c}'"))
    }

    /// Consumes `expected` or fails.
    fn expect(&mut self, expected: char) -> Result<(), CodecError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("expected '{expected}', found {}", self.describe_next())))
        }
    }

    /// Whether the remaining input starts with `text`.
    fn starts_with(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Case-insensitive keyword followed by a non-identifier character.
    fn at_keyword(&self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        keyword
            .chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i).is_some_and(|p| p.eq_ignore_ascii_case(&c)))
            && !self.peek_at(len).is_some_and(is_identifier_char)
    }

    /// Consumes a case-insensitive keyword not followed by an identifier character.
    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.chars().count();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments.
    fn skip_trivia(&mut self) -> Result<(), CodecError> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => self.pos += 1,
                (Some('/'), Some('/')) | (Some('#'), _) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        if self.starts_with("*/") {
                            self.pos += 2;
                            break;
                        }
                        if self.bump().is_none() {
                            self.pos = start;
                            return Err(self.error("unterminated block comment"));
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// `<?php [declare(...);] return <array>;`
    fn parse_file(&mut self) -> Result<Map<String, Value>, CodecError> {
        self.skip_trivia()?;
        if self.starts_with("<?php") {
            self.pos += "<?php".len();
        }
        self.skip_trivia()?;

        while self.consume_keyword("declare") {
            while let Some(c) = self.bump() {
                if c == ';' {
                    break;
                }
            }
            self.skip_trivia()?;
        }

        if !self.consume_keyword("return") {
            return Err(self.error(format!(
                "expected the file to return an array, found {}",
                self.describe_next()
            )));
        }

        let value = self.parse_value()?;
        self.skip_trivia()?;
        self.expect(';')?;
        self.skip_trivia()?;
        if self.starts_with("?>") {
            self.pos += 2;
            self.skip_trivia()?;
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected content after the return statement"));
        }

        match value {
            Value::Object(map) => Ok(map),
            _ => Err(CodecError::new(1, 1, "the file must return an array")),
        }
    }

    /// Array, keyword, string, number or concatenation.
    fn parse_value(&mut self) -> Result<Value, CodecError> {
        self.skip_trivia()?;

        if self.consume_keyword("array") {
            self.skip_trivia()?;
            self.expect('(')?;
            return self.parse_array(')');
        }
        for (keyword, value) in
            [("true", Value::Bool(true)), ("false", Value::Bool(false)), ("null", Value::Null)]
        {
            if self.consume_keyword(keyword) {
                return Ok(value);
            }
        }

        match self.peek() {
            Some('[') => {
                self.pos += 1;
                self.parse_array(']')
            }
            Some('\'' | '"') => self.parse_concatenation(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => self.parse_number(),
            Some('.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.parse_number(),
            _ => Err(self
                .error(format!("unsupported expression starting with {}", self.describe_next()))),
        }
    }

    /// Parses the entries after an opening bracket up to and including `close`.
    fn parse_array(&mut self, close: char) -> Result<Value, CodecError> {
        let mut map = Map::new();
        let mut next_index: i64 = 0;

        loop {
            self.skip_trivia()?;
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key_start = self.pos;
            let first = self.parse_value()?;
            self.skip_trivia()?;

            let (key, value) = if self.starts_with("=>") {
                self.pos += 2;
                let value = self.parse_value()?;
                let key = array_key(&first).ok_or_else(|| {
                    self.pos = key_start;
                    self.error("arrays cannot be used as array keys")
                })?;
                (key, value)
            } else {
                (ArrayKey::Int(next_index), first)
            };

            let key = match key {
                ArrayKey::Int(index) => {
                    if index >= next_index {
                        next_index = index.saturating_add(1);
                    }
                    index.to_string()
                }
                ArrayKey::String(key) => key,
            };
            map.insert(key, value);

            self.skip_trivia()?;
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => {
                    return Err(self.error(format!(
                        "expected ',' or '{close}', found {}",
                        self.describe_next()
                    )));
                }
            }
        }
    }

    /// String literals joined with `.`.
    fn parse_concatenation(&mut self) -> Result<Value, CodecError> {
        let mut text = self.parse_string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia()?;
            if self.peek() == Some('.') && !self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
                self.skip_trivia()?;
                match self.peek() {
                    Some('\'' | '"') => text.push_str(&self.parse_string()?),
                    _ => {
                        return Err(self.error(format!(
                            "only string literals can be concatenated, found {}",
                            self.describe_next()
                        )));
                    }
                }
            } else {
                self.pos = checkpoint;
                return Ok(Value::String(text));
            }
        }
    }

    /// A single- or double-quoted literal.
    fn parse_string(&mut self) -> Result<String, CodecError> {
        let start = self.pos;
        match self.bump() {
            Some('\'') => self.parse_single_quoted(start),
            Some('"') => self.parse_double_quoted(start),
            _ => {
                self.pos = start;
                Err(self.error("expected a string literal"))
            }
        }
    }

    /// Error pointing at the opening quote.
    fn unterminated(&mut self, start: usize) -> CodecError {
        self.pos = start;
        self.error("unterminated string literal")
    }

    /// Only `\\` and `\'` are escapes.
    fn parse_single_quoted(&mut self, start: usize) -> Result<String, CodecError> {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => return Err(self.unterminated(start)),
                Some('\'') => return Ok(text),
                Some('\\') => match self.peek() {
                    Some(c @ ('\'' | '\\')) => {
                        self.pos += 1;
                        text.push(c);
                    }
                    _ => text.push('\\'),
                },
                Some(c) => text.push(c),
            }
        }
    }

    /// Escapes are resolved, `$` interpolation is rejected.
    ///
    /// Byte escapes (`\xC3`, `\303`) are collected as raw bytes, so the literal
    /// is decoded as UTF-8 once it is closed.
    fn parse_double_quoted(&mut self, start: usize) -> Result<String, CodecError> {
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                None => return Err(self.unterminated(start)),
                Some('"') => {
                    return String::from_utf8(bytes).map_err(|_| {
                        self.pos = start;
                        self.error("escape sequences do not form valid UTF-8")
                    });
                }
                Some('\\') => self.parse_escape(&mut bytes)?,
                Some('$') if self.peek().is_some_and(|c| c == '{' || is_identifier_start(c)) => {
                    self.pos -= 1;
                    return Err(self.error("variable interpolation is not supported"));
                }
                Some('{') if self.peek() == Some('$') => {
                    self.pos -= 1;
                    return Err(self.error("variable interpolation is not supported"));
                }
                Some(c) => push_char(&mut bytes, c),
            }
        }
    }

    /// One escape sequence after a backslash.
    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), CodecError> {
        let Some(c) = self.peek() else {
            bytes.push(b'\\');
            return Ok(());
        };
        let simple = match c {
            'n' => Some(b'\n'),
            't' => Some(b'\t'),
            'r' => Some(b'\r'),
            'v' => Some(0x0b),
            'e' => Some(0x1b),
            'f' => Some(0x0c),
            '\\' => Some(b'\\'),
            '$' => Some(b'$'),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(escaped) = simple {
            self.pos += 1;
            bytes.push(escaped);
            return Ok(());
        }

        match c {
            '0'..='7' => {
                let digits = self.take_while_max(3, |c| c.is_digit(8));
                let code = u16::from_str_radix(&digits, 8).unwrap_or(0) & 0xff;
                bytes.push(u8::try_from(code).unwrap_or(0));
            }
            'x' if self.peek_at(1).is_some_and(|c| c.is_ascii_hexdigit()) => {
                self.pos += 1;
                let digits = self.take_while_max(2, |c| c.is_ascii_hexdigit());
                bytes.push(u8::from_str_radix(&digits, 16).unwrap_or(0));
            }
            'u' if self.peek_at(1) == Some('{') => {
                let start = self.pos;
                self.pos += 2;
                let digits = self.take_while_max(8, |c| c.is_ascii_hexdigit());
                let code = u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32);
                match (code, self.peek()) {
                    (Some(ch), Some('}')) => {
                        self.pos += 1;
                        push_char(bytes, ch);
                    }
                    _ => {
                        self.pos = start;
                        return Err(self.error("invalid unicode escape sequence"));
                    }
                }
            }
            _ => bytes.push(b'\\'),
        }
        Ok(())
    }

    /// Up to `max` characters matching `predicate`.
    fn take_while_max(&mut self, max: usize, predicate: impl Fn(char) -> bool) -> String {
        let mut taken = String::new();
        while taken.len() < max {
            match self.peek() {
                Some(c) if predicate(c) => {
                    taken.push(c);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        taken
    }

    /// Integer (decimal, hex, octal, binary) or float literal.
    fn parse_number(&mut self) -> Result<Value, CodecError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.pos += 1;
                true
            }
            Some('+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        self.skip_trivia()?;

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('b' | 'B')) => Some(2),
            (Some('0'), Some('o' | 'O')) => Some(8),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.pos += 2;
            let digits: String = self
                .take_while_max(usize::MAX, |c| c.is_digit(radix) || c == '_')
                .replace('_', "");
            let parsed = i64::from_str_radix(&digits, radix).ok();
            parsed.map(|n| Value::from(if negative { -n } else { n }))
        } else {
            let literal: String = self
                .take_while_max(usize::MAX, |c| {
                    c.is_ascii_digit() || matches!(c, '.' | '_' | 'e' | 'E')
                })
                .replace('_', "");
            // Exponent sign
            let literal = if literal.ends_with(['e', 'E']) && matches!(self.peek(), Some('+' | '-'))
            {
                let mut literal = literal;
                literal.extend(self.bump());
                literal.push_str(&self.take_while_max(usize::MAX, |c| c.is_ascii_digit()));
                literal
            } else {
                literal
            };
            decimal_value(&literal, negative)
        };

        value.ok_or_else(|| {
            self.pos = start;
            self.error("invalid number literal")
        })
    }
}

/// Converts a decimal literal, following PHP: a leading `0` marks octal,
/// integers that overflow become floats.
fn decimal_value(literal: &str, negative: bool) -> Option<Value> {
    if literal.is_empty() {
        return None;
    }

    let is_float = literal.contains(['.', 'e', 'E']);
    if !is_float {
        let parsed = if literal.len() > 1 && literal.starts_with('0') {
            i64::from_str_radix(literal, 8).ok()
        } else {
            literal.parse::<i64>().ok()
        };
        if let Some(n) = parsed {
            return Some(Value::from(if negative { -n } else { n }));
        }
    }

    let float: f64 = literal.parse().ok()?;
    Number::from_f64(if negative { -float } else { float }).map(Value::Number)
}

/// A key as PHP stores it.
enum ArrayKey {
    Int(i64),
    String(String),
}

/// Applies PHP's key casts; `None` for values that cannot be keys.
fn array_key(value: &Value) -> Option<ArrayKey> {
    match value {
        Value::String(s) => Some(canonical_int(s).map_or_else(|| ArrayKey::String(s.clone()), ArrayKey::Int)),
        Value::Number(n) => {
            #[allow(clippy::cast_possible_truncation)]
            let index = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?;
            Some(ArrayKey::Int(index))
        }
        Value::Bool(b) => Some(ArrayKey::Int(i64::from(*b))),
        Value::Null => Some(ArrayKey::String(String::new())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// PHP identifier start.
fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// PHP identifier character.
fn is_identifier_char(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Appends the UTF-8 encoding of `c`.
fn push_char(bytes: &mut Vec<u8>, c: char) {
    let mut buffer = [0; 4];
    bytes.extend_from_slice(c.encode_utf8(&mut buffer).as_bytes());
}
