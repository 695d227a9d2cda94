//! Dynamic values bound in a template scope.
//!
//! Variables arrive as untyped JSON. They are converted once into [`Value`]
//! so that every later decision (is this a sequence? how does this number
//! print?) is an exhaustive match instead of a structural cast.

use std::collections::BTreeMap;

/// A dynamic template value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// A missing path, a type mismatch during lookup, or JSON `null`.
    #[default]
    Absent,
    Bool(bool),
    Number(Number),
    String(String),
    Mapping(BTreeMap<String, Value>),
    Sequence(Vec<Value>),
}

/// Numbers keep the integer/float distinction because they print differently.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Follow path segments through nested mappings.
    ///
    /// Any segment that is missing, or that lands on a non-mapping, yields
    /// `Value::Absent`.
    pub fn get_path<'a, I>(&self, segments: I) -> &Value
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for segment in segments {
            current = match current {
                Value::Mapping(map) => match map.get(segment) {
                    Some(v) => v,
                    None => return &ABSENT,
                },
                _ => return &ABSENT,
            };
        }
        current
    }

    /// Render this value as text for insertion into a JSON string literal.
    ///
    /// Strings and the JSON form of mappings and sequences are escaped;
    /// integers print bare, floats with two decimals, `Absent` as nothing.
    pub fn to_template_text(&self) -> String {
        match self {
            Value::Absent => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(Number::Int(i)) => i.to_string(),
            Value::Number(Number::Float(f)) => format!("{:.2}", f),
            Value::String(s) => escape_json_text(s),
            Value::Mapping(_) | Value::Sequence(_) => {
                let json = serde_json::Value::from(self);
                escape_json_text(&json.to_string())
            }
        }
    }
}

static ABSENT: Value = Value::Absent;

/// Escape the characters that would break out of a JSON string literal.
pub fn escape_json_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Number(Number::Int(i)),
                None => Value::Number(Number::Float(n.as_f64().unwrap_or(0.0))),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Absent => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(Number::Int(i)) => serde_json::Value::from(*i),
            Value::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Number(Number::Int(i as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_integers_stay_integers() {
        assert_eq!(Value::from(json!(3)), Value::Number(Number::Int(3)));
        assert_eq!(Value::from(json!(3.5)), Value::Number(Number::Float(3.5)));
    }

    #[test]
    fn null_is_absent() {
        assert!(Value::from(json!(null)).is_absent());
    }

    #[test]
    fn number_formatting() {
        assert_eq!(Value::from(json!(42)).to_template_text(), "42");
        assert_eq!(Value::from(json!(19.5)).to_template_text(), "19.50");
        assert_eq!(Value::from(json!(0.125)).to_template_text(), "0.13");
        assert_eq!(Value::from(json!(-7)).to_template_text(), "-7");
    }

    #[test]
    fn booleans_render_as_words() {
        assert_eq!(Value::Bool(true).to_template_text(), "true");
        assert_eq!(Value::Bool(false).to_template_text(), "false");
    }

    #[test]
    fn strings_are_escaped() {
        let v = Value::from("say \"hi\"\n\tC:\\tmp\r");
        assert_eq!(v.to_template_text(), "say \\\"hi\\\"\\n\\tC:\\\\tmp\\r");
    }

    #[test]
    fn collections_render_as_escaped_json() {
        let v = Value::from(json!({"a": 1, "b": ["x"]}));
        assert_eq!(v.to_template_text(), "{\\\"a\\\":1,\\\"b\\\":[\\\"x\\\"]}");
    }

    #[test]
    fn get_path_through_mappings() {
        let v = Value::from(json!({"user": {"name": "Ada", "tags": ["a"]}}));
        assert_eq!(v.get_path(["user", "name"]), &Value::from("Ada"));
        assert!(v.get_path(["user", "missing"]).is_absent());
        // sequences are not indexed by path segments
        assert!(v.get_path(["user", "tags", "0"]).is_absent());
        assert!(v.get_path(["user", "name", "first"]).is_absent());
    }
}
