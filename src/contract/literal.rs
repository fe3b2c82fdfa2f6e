//! Structured literal parser for command line arguments
//!
//! Accepts a JSON superset: numbers (decimal, negative, `0x` hex), single or
//! double quoted strings with JSON escapes (including `\uXXXX` surrogate
//! pairs), `true`/`false`/`True`/`False`, `null`/`None`, lists
//! `[..]`, tuples `(..)` and records `{key: value}`. Anything else in a bare
//! token position is taken as a plain string. Nothing is ever evaluated.

use crate::error::{DymkaError, DymkaResult};

use serde_json::{Map, Value};

/// A parsed argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Null,
    Bool(bool),
    /// Numeric literal kept as text so wide integers survive unchanged
    Number(String),
    Str(String),
    List(Vec<ArgValue>),
    Record(Vec<(String, ArgValue)>),
}

impl ArgValue {
    /// Text of a scalar, as typed by the user
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ArgValue::Number(s) | ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into JSON for raw RPC parameters
    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Null => Value::Null,
            ArgValue::Bool(b) => Value::Bool(*b),
            ArgValue::Number(n) => {
                if n.starts_with("0x") || n.starts_with("-0x") {
                    // Hex quantities travel as strings on JSON-RPC
                    Value::String(n.clone())
                } else {
                    serde_json::from_str::<serde_json::Number>(n)
                        .map(Value::Number)
                        .unwrap_or_else(|_| Value::String(n.clone()))
                }
            }
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::List(items) => Value::Array(items.iter().map(ArgValue::to_json).collect()),
            ArgValue::Record(fields) => {
                let mut map = Map::new();
                for (key, value) in fields {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

/// Parse the positional tokens following a function or method name.
///
/// A single token holding a list literal is the whole argument list,
/// otherwise every token is one argument.
pub fn parse_arguments(tokens: &[String]) -> DymkaResult<Vec<ArgValue>> {
    if let [only] = tokens {
        let trimmed = only.trim_start();
        if trimmed.starts_with('[') {
            return match parse_literal(only)? {
                ArgValue::List(items) => Ok(items),
                other => Ok(vec![other]),
            };
        }
    }

    tokens.iter().map(|t| parse_token(t)).collect()
}

/// Parse one token, falling back to a plain string for bare words
pub fn parse_token(token: &str) -> DymkaResult<ArgValue> {
    let trimmed = token.trim();
    match trimmed.chars().next() {
        Some('[') | Some('(') | Some('{') | Some('"') | Some('\'') => parse_literal(trimmed),
        _ => match parse_literal(trimmed) {
            Ok(value) => Ok(value),
            Err(_) => Ok(ArgValue::Str(token.to_string())),
        },
    }
}

/// Parse a complete literal, rejecting trailing input
pub fn parse_literal(input: &str) -> DymkaResult<ArgValue> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.chars.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: &str) -> DymkaError {
        DymkaError::ArgumentParse(format!("{} at position {}", message, self.pos))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> DymkaResult<()> {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn value(&mut self) -> DymkaResult<ArgValue> {
        self.skip_ws();
        match self.peek() {
            Some('[') => self.sequence('[', ']').map(ArgValue::List),
            Some('(') => self.sequence('(', ')').map(ArgValue::List),
            Some('{') => self.record(),
            Some(q @ '"') | Some(q @ '\'') => self.string(q).map(ArgValue::Str),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn sequence(&mut self, open: char, close: char) -> DymkaResult<Vec<ArgValue>> {
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(c) if c == close => {}
                _ => return Err(self.error(&format!("expected ',' or '{}'", close))),
            }
        }
    }

    fn record(&mut self) -> DymkaResult<ArgValue> {
        self.expect('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(ArgValue::Record(fields));
            }
            let key = match self.peek() {
                Some(q @ '"') | Some(q @ '\'') => self.string(q)?,
                Some(c) if c.is_alphabetic() || c == '_' => self.identifier(),
                _ => return Err(self.error("expected record key")),
            };
            self.expect(':')?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn string(&mut self, quote: char) -> DymkaResult<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some('\\') => {
                    self.pos += 1;
                    let escaped = match self.peek() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('0') => '\0',
                        Some('u') => {
                            self.pos += 1;
                            let c = self.unicode_escape()?;
                            out.push(c);
                            continue;
                        }
                        Some(c @ ('\\' | '"' | '\'' | '/')) => c,
                        _ => return Err(self.error("invalid escape")),
                    };
                    out.push(escaped);
                    self.pos += 1;
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    /// Four hex digits of a `\u` escape
    fn hex4(&mut self) -> DymkaResult<u32> {
        let end = self.pos + 4;
        let digits: String = match self.chars.get(self.pos..end) {
            Some(chars) if chars.iter().all(|c| c.is_ascii_hexdigit()) => chars.iter().collect(),
            _ => return Err(self.error("invalid unicode escape")),
        };
        self.pos = end;
        u32::from_str_radix(&digits, 16).map_err(|_| self.error("invalid unicode escape"))
    }

    /// Body of a `\u` escape; UTF-16 surrogates must come in pairs
    fn unicode_escape(&mut self) -> DymkaResult<char> {
        let unit = self.hex4()?;
        let code = match unit {
            0xD800..=0xDBFF => {
                if self.peek() != Some('\\') || self.chars.get(self.pos + 1) != Some(&'u') {
                    return Err(self.error("unpaired surrogate"));
                }
                self.pos += 2;
                let low = self.hex4()?;
                if !(0xDC00..=0xDFFF).contains(&low) {
                    return Err(self.error("unpaired surrogate"));
                }
                0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00)
            }
            0xDC00..=0xDFFF => return Err(self.error("unpaired surrogate")),
            scalar => scalar,
        };
        char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
    }

    fn number(&mut self) -> DymkaResult<ArgValue> {
        let start = self.pos;
        if matches!(self.peek(), Some('-') | Some('+')) {
            self.pos += 1;
        }
        let is_hex = self.peek() == Some('0')
            && matches!(self.chars.get(self.pos + 1), Some('x') | Some('X'));
        if is_hex {
            self.pos += 2;
            let digits = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            if self.pos == digits {
                return Err(self.error("empty hex literal"));
            }
        } else {
            let digits = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '_') {
                self.pos += 1;
            }
            if self.pos == digits {
                return Err(self.error("expected digits"));
            }
            if self.peek() == Some('.') {
                self.pos += 1;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
            if matches!(self.peek(), Some('e') | Some('E')) {
                self.pos += 1;
                if matches!(self.peek(), Some('-') | Some('+')) {
                    self.pos += 1;
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        if matches!(self.peek(), Some(c) if c.is_alphanumeric()) {
            return Err(self.error("malformed number"));
        }

        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_' && **c != '+')
            .collect();
        Ok(ArgValue::Number(text))
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn word(&mut self) -> DymkaResult<ArgValue> {
        let start = self.pos;
        let word = self.identifier();
        match word.as_str() {
            "true" | "True" => Ok(ArgValue::Bool(true)),
            "false" | "False" => Ok(ArgValue::Bool(false)),
            "null" | "None" => Ok(ArgValue::Null),
            _ => {
                self.pos = start;
                Err(self.error(&format!("unknown identifier {}", word)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str) -> ArgValue {
        ArgValue::Number(s.to_string())
    }

    fn text(s: &str) -> ArgValue {
        ArgValue::Str(s.to_string())
    }

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_list_literal() {
        let args = parse_arguments(&tokens(&[r#"[1, "0xabc", true, [2, 'x'], None]"#])).unwrap();
        assert_eq!(
            args,
            vec![
                num("1"),
                text("0xabc"),
                ArgValue::Bool(true),
                ArgValue::List(vec![num("2"), text("x")]),
                ArgValue::Null,
            ]
        );
    }

    #[test]
    fn test_separate_tokens() {
        let args = parse_arguments(&tokens(&[
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23",
            "1000",
            "hello world",
            "-5",
        ]))
        .unwrap();
        assert_eq!(
            args,
            vec![
                num("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"),
                num("1000"),
                text("hello world"),
                num("-5"),
            ]
        );
    }

    #[test]
    fn test_tuple_and_record() {
        assert_eq!(
            parse_literal("(1, {amount: 5, 'to': \"a\"})").unwrap(),
            ArgValue::List(vec![
                num("1"),
                ArgValue::Record(vec![
                    ("amount".to_string(), num("5")),
                    ("to".to_string(), text("a")),
                ]),
            ])
        );
    }

    #[test]
    fn test_underscores_and_escapes() {
        assert_eq!(parse_literal("1_000_000").unwrap(), num("1000000"));
        assert_eq!(parse_literal(r#""a\"b\n""#).unwrap(), text("a\"b\n"));
    }

    #[test]
    fn test_json_escapes() {
        assert_eq!(
            parse_arguments(&tokens(&[r#"["\u0041", "a\/b"]"#])).unwrap(),
            vec![text("A"), text("a/b")]
        );
        assert_eq!(parse_literal(r#""\b\f""#).unwrap(), text("\u{8}\u{c}"));
        assert_eq!(parse_literal(r#""\ud83d\ude00""#).unwrap(), text("\u{1F600}"));
        assert_eq!(parse_literal(r#"'\u00e9t\u00E9'"#).unwrap(), text("été"));

        assert!(parse_literal(r#""\ud83d""#).is_err());
        assert!(parse_literal(r#""\ude00""#).is_err());
        assert!(parse_literal(r#""\u12""#).is_err());
        assert!(parse_literal(r#""\u+041""#).is_err());
        assert!(parse_literal(r#""\x41""#).is_err());
    }

    #[test]
    fn test_rejects_code() {
        assert!(matches!(
            parse_literal("[__import__('os').system('ls')]"),
            Err(DymkaError::ArgumentParse(_))
        ));
        assert!(parse_literal("[1, 2").is_err());
        assert!(parse_literal("[1] 2").is_err());
        assert!(parse_token("'unterminated").is_err());
    }

    #[test]
    fn test_empty_arguments() {
        assert!(parse_arguments(&[]).unwrap().is_empty());
        assert!(parse_arguments(&tokens(&["[]"])).unwrap().is_empty());
    }

    #[test]
    fn test_to_json() {
        let value = parse_literal(r#"["0x10", 0x10, 7, {a: false}]"#).unwrap();
        assert_eq!(
            value.to_json(),
            serde_json::json!(["0x10", "0x10", 7, {"a": false}])
        );
    }
}
