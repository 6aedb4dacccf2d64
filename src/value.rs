//! Property values carried by nodes, resources and project settings.
//!
//! [`Value`] is a closed set of variants. Everything that writes engine text goes
//! through the single `match` in [`Value::fmt`], and everything that reads it back
//! goes through [`parse_value`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Sequence(Vec<Value>),
    Map(IndexMap<String, Value>),
    Vector2 { x: f64, y: f64 },
    Vector3 { x: f64, y: f64, z: f64 },
    Color { r: f64, g: f64, b: f64, a: f64 },
}

impl Value {
    pub fn vector2(x: f64, y: f64) -> Self {
        Value::Vector2 { x, y }
    }

    pub fn vector3(x: f64, y: f64, z: f64) -> Self {
        Value::Vector3 { x, y, z }
    }

    pub fn color(r: f64, g: f64, b: f64, a: f64) -> Self {
        Value::Color { r, g, b, a }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Converts loosely-typed JSON (as produced by a command layer) into a value.
    ///
    /// Objects whose keys are exactly `x`/`y` or `x`/`y`/`z` with numeric values
    /// become vectors, and `r`/`g`/`b` (optionally `a`) become a color. `null`
    /// has no counterpart and yields `None`; nulls inside collections are dropped.
    pub fn from_json(json: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;

        match json {
            Json::Null => None,
            Json::Bool(b) => Some(Value::Bool(*b)),
            Json::Number(n) => n.as_f64().map(Value::Number),
            Json::String(s) => Some(Value::String(s.clone())),
            Json::Array(items) => Some(Value::Sequence(
                items.iter().filter_map(Value::from_json).collect(),
            )),
            Json::Object(obj) => {
                let num = |key: &str| obj.get(key).and_then(|v| v.as_f64());
                let has_only = |keys: &[&str]| {
                    obj.len() == keys.len() && keys.iter().all(|k| num(k).is_some())
                };

                if has_only(&["x", "y"]) {
                    return Some(Value::vector2(num("x")?, num("y")?));
                }
                if has_only(&["x", "y", "z"]) {
                    return Some(Value::vector3(num("x")?, num("y")?, num("z")?));
                }
                if has_only(&["r", "g", "b"]) || has_only(&["r", "g", "b", "a"]) {
                    return Some(Value::color(
                        num("r")?,
                        num("g")?,
                        num("b")?,
                        num("a").unwrap_or(1.0),
                    ));
                }

                Some(Value::Map(
                    obj.iter()
                        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                        .collect(),
                ))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items)
    }
}

pub(crate) fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Engine text form of a value, e.g. `Vector2(10, 20)` or `{"hp": 3}`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(&quote(s)),
            Value::Number(n) if n.is_nan() => f.write_str("nan"),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "inf" } else { "-inf" })
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value)?;
                }
                f.write_str("}")
            }
            Value::Vector2 { x, y } => write!(f, "Vector2({}, {})", x, y),
            Value::Vector3 { x, y, z } => write!(f, "Vector3({}, {}, {})", x, y, z),
            Value::Color { r, g, b, a } => write!(f, "Color({}, {}, {}, {})", r, g, b, a),
        }
    }
}

/// Parses one value in engine text form.
///
/// Accepts everything [`Value`]'s `Display` writes, plus the engine's
/// `Packed*Array(...)` constructors (read as sequences) and `&"..."` string names.
pub fn parse_value(text: &str) -> Result<Value, String> {
    let mut cursor = Cursor::new(text);
    let value = cursor.value()?;
    cursor.skip_ws();
    match cursor.peek() {
        None => Ok(value),
        Some(c) => Err(format!("unexpected '{}' after value", c)),
    }
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), String> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == want => Ok(()),
            Some(c) => Err(format!("expected '{}', found '{}'", want, c)),
            None => Err(format!("expected '{}', found end of input", want)),
        }
    }

    fn value(&mut self) -> Result<Value, String> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.string().map(Value::String),
            Some('&') => {
                self.bump();
                self.string().map(Value::String)
            }
            Some('[') => {
                self.bump();
                self.list(']').map(Value::Sequence)
            }
            Some('{') => self.map(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.word(),
            Some(c) => Err(format!("unexpected '{}'", c)),
            None => Err("unexpected end of input".to_string()),
        }
    }

    fn string(&mut self) -> Result<String, String> {
        self.expect('"')?;
        let mut s = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c) => s.push(c),
                    None => return Err("unterminated escape".to_string()),
                },
                Some(c) => s.push(c),
                None => return Err("unterminated string".to_string()),
            }
        }
    }

    fn number(&mut self) -> Result<Value, String> {
        let mut s = String::new();
        if let Some(sign @ ('-' | '+')) = self.peek() {
            s.push(sign);
            self.bump();
        }
        if matches!(self.peek(), Some(c) if c.is_alphabetic()) {
            let word = self.ident();
            let n = match word.as_str() {
                "inf" => f64::INFINITY,
                "nan" => f64::NAN,
                _ => return Err(format!("invalid number '{}{}'", s, word)),
            };
            return Ok(Value::Number(if s == "-" { -n } else { n }));
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s.parse::<f64>()
            .map(Value::Number)
            .map_err(|_| format!("invalid number '{}'", s))
    }

    fn ident(&mut self) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                s.push(c);
                self.bump();
            } else {
                break;
            }
        }
        s
    }

    fn word(&mut self) -> Result<Value, String> {
        let word = self.ident();
        match word.as_str() {
            "true" => return Ok(Value::Bool(true)),
            "false" => return Ok(Value::Bool(false)),
            "inf" => return Ok(Value::Number(f64::INFINITY)),
            "nan" => return Ok(Value::Number(f64::NAN)),
            _ => {}
        }

        self.expect('(')?;
        let args = self.list(')')?;

        if word.starts_with("Packed") && word.ends_with("Array") {
            return Ok(Value::Sequence(args));
        }

        let nums: Vec<f64> = args.iter().filter_map(Value::as_f64).collect();
        if nums.len() != args.len() {
            return Err(format!("{} expects numeric arguments", word));
        }
        match (word.as_str(), nums.as_slice()) {
            ("Vector2" | "Vector2i", [x, y]) => Ok(Value::vector2(*x, *y)),
            ("Vector3" | "Vector3i", [x, y, z]) => Ok(Value::vector3(*x, *y, *z)),
            ("Color", [r, g, b]) => Ok(Value::color(*r, *g, *b, 1.0)),
            ("Color", [r, g, b, a]) => Ok(Value::color(*r, *g, *b, *a)),
            _ => Err(format!("unsupported constructor {}({} args)", word, nums.len())),
        }
    }

    fn list(&mut self, close: char) -> Result<Vec<Value>, String> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.peek() == Some(close) {
            self.bump();
            return Ok(items);
        }
        loop {
            items.push(self.value()?);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                Some(c) => return Err(format!("expected ',' or '{}', found '{}'", close, c)),
                None => return Err(format!("missing '{}'", close)),
            }
        }
    }

    fn map(&mut self) -> Result<Value, String> {
        self.expect('{')?;
        let mut entries = IndexMap::new();
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(Value::Map(entries));
        }
        loop {
            self.skip_ws();
            let key = self.string()?;
            self.expect(':')?;
            let value = self.value()?;
            entries.insert(key, value);
            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(Value::Map(entries)),
                Some(c) => return Err(format!("expected ',' or '}}', found '{}'", c)),
                None => return Err("missing '}'".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encodes_primitives() {
        assert_eq!(Value::from("hi").to_string(), "\"hi\"");
        assert_eq!(Value::from(10.0).to_string(), "10");
        assert_eq!(Value::from(0.5).to_string(), "0.5");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from("say \"hi\"").to_string(), r#""say \"hi\"""#);
    }

    #[test]
    fn test_encodes_nested_collections() {
        let mut map = IndexMap::new();
        map.insert("hp".to_string(), Value::from(3.0));
        map.insert("tags".to_string(), Value::from(vec![Value::from("a"), Value::from(false)]));
        assert_eq!(Value::Map(map).to_string(), r#"{"hp": 3, "tags": ["a", false]}"#);
    }

    #[test]
    fn test_encodes_geometry() {
        assert_eq!(Value::vector2(10.0, 20.0).to_string(), "Vector2(10, 20)");
        assert_eq!(Value::vector3(1.0, 2.5, -3.0).to_string(), "Vector3(1, 2.5, -3)");
        assert_eq!(Value::color(1.0, 0.0, 0.0, 1.0).to_string(), "Color(1, 0, 0, 1)");
    }

    #[test]
    fn test_from_json_infers_vectors_and_colors() {
        assert_eq!(
            Value::from_json(&json!({"x": 10, "y": 20})),
            Some(Value::vector2(10.0, 20.0))
        );
        assert_eq!(
            Value::from_json(&json!({"r": 1, "g": 0.5, "b": 0})),
            Some(Value::color(1.0, 0.5, 0.0, 1.0))
        );
        // an extra key keeps it a plain map
        assert!(matches!(
            Value::from_json(&json!({"x": 1, "y": 2, "label": "p"})),
            Some(Value::Map(_))
        ));
        assert_eq!(Value::from_json(&json!(null)), None);
    }

    #[test]
    fn test_non_finite_numbers_use_engine_spelling() {
        assert_eq!(Value::from(f64::NAN).to_string(), "nan");
        assert_eq!(Value::from(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::from(f64::NEG_INFINITY).to_string(), "-inf");

        assert_eq!(parse_value("inf"), Ok(Value::from(f64::INFINITY)));
        assert_eq!(parse_value("-inf"), Ok(Value::from(f64::NEG_INFINITY)));
        assert!(matches!(parse_value("nan"), Ok(Value::Number(n)) if n.is_nan()));
        assert_eq!(
            parse_value(&Value::vector2(f64::NEG_INFINITY, 1.0).to_string()),
            Ok(Value::vector2(f64::NEG_INFINITY, 1.0))
        );
        assert!(parse_value("-infinity").is_err());
    }

    #[test]
    fn test_parse_reads_back_display_output() {
        let mut map = IndexMap::new();
        map.insert("pos".to_string(), Value::vector2(-1.5, 2.0));
        map.insert("name".to_string(), Value::from("a\\b \"c\"\nd"));
        let value = Value::Sequence(vec![
            Value::Map(map),
            Value::color(0.1, 0.2, 0.3, 0.4),
            Value::vector3(1.0, 2.0, 3.0),
            Value::from(true),
            Value::from(1e-3),
        ]);
        assert_eq!(parse_value(&value.to_string()), Ok(value));
    }

    #[test]
    fn test_parse_engine_specific_forms() {
        assert_eq!(
            parse_value(r#"PackedStringArray("4.3", "2D")"#),
            Ok(Value::from(vec![Value::from("4.3"), Value::from("2D")]))
        );
        assert_eq!(parse_value(r#"&"idle""#), Ok(Value::from("idle")));
        assert_eq!(parse_value("Color(1, 1, 1)"), Ok(Value::color(1.0, 1.0, 1.0, 1.0)));
        assert!(parse_value("Transform3D(1, 0)").is_err());
        assert!(parse_value("[1, 2").is_err());
    }
}
