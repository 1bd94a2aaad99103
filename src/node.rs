//! Shared value model for native and normalized trees.
//!
//! Both representations are plain JSON-shaped values. Objects keep their
//! insertion order (so output is deterministic) but compare as maps;
//! sequences compare element by element.
use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::uast::KEY_TYPE;

pub type Object = IndexMap<String, Node>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged, from = "serde_json::Value")]
pub enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Sequence(Vec<Node>),
    Object(Object),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    /// Only for integers above `i64::MAX`; everything else is `Int`.
    UInt(u64),
    Float(OrderedFloat<f64>),
}

/// Coarse classification used by pattern dispatch and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Object,
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Null => Kind::Null,
            Node::Bool(_) => Kind::Bool,
            Node::Number(_) => Kind::Number,
            Node::String(_) => Kind::String,
            Node::Sequence(_) => Kind::Sequence,
            Node::Object(_) => Kind::Object,
        }
    }

    /// Scalars, including null.
    pub fn is_value(&self) -> bool {
        !matches!(self, Node::Sequence(_) | Node::Object(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Node::Object(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Node::Sequence(_))
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Node::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Number(Number::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// The `@type` tag of an object node.
    pub fn type_tag(&self) -> Option<&str> {
        self.as_object()?.get(KEY_TYPE)?.as_str()
    }

    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Node)>,
    {
        Node::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Null => "null",
            Kind::Bool => "bool",
            Kind::Number => "number",
            Kind::String => "string",
            Kind::Sequence => "sequence",
            Kind::Object => "object",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONVERSIONS
// ————————————————————————————————————————————————————————————————————————————

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Node::Number(Number::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Node::Number(Number::UInt(u))
                } else {
                    Node::Number(Number::Float(OrderedFloat(n.as_f64().unwrap_or(f64::NAN))))
                }
            }
            Value::String(s) => Node::String(s),
            Value::Array(xs) => Node::Sequence(xs.into_iter().map(Node::from).collect()),
            Value::Object(m) => Node::Object(m.into_iter().map(|(k, v)| (k, Node::from(v))).collect()),
        }
    }
}

impl From<&Node> for serde_json::Value {
    fn from(node: &Node) -> Self {
        use serde_json::Value;
        match node {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(Number::Int(i)) => Value::from(*i),
            Node::Number(Number::UInt(u)) => Value::from(*u),
            // non-finite floats have no JSON form
            Node::Number(Number::Float(f)) => serde_json::Number::from_f64(f.0)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Node::String(s) => Value::String(s.clone()),
            Node::Sequence(xs) => Value::Array(xs.iter().map(Value::from).collect()),
            Node::Object(m) => Value::Object(
                m.iter().map(|(k, v)| (k.clone(), Value::from(v))).collect(),
            ),
        }
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self { Node::Bool(b) }
}

impl From<i64> for Node {
    fn from(i: i64) -> Self { Node::Number(Number::Int(i)) }
}

impl From<i32> for Node {
    fn from(i: i32) -> Self { Node::Number(Number::Int(i64::from(i))) }
}

impl From<u64> for Node {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Node::Number(Number::Int(i)),
            Err(_) => Node::Number(Number::UInt(u)),
        }
    }
}

impl From<f64> for Node {
    fn from(f: f64) -> Self { Node::Number(Number::Float(OrderedFloat(f))) }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self { Node::String(s.to_string()) }
}

impl From<String> for Node {
    fn from(s: String) -> Self { Node::String(s) }
}

impl From<Vec<Node>> for Node {
    fn from(xs: Vec<Node>) -> Self { Node::Sequence(xs) }
}

impl From<Object> for Node {
    fn from(m: Object) -> Self { Node::Object(m) }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_equality_ignores_field_order() {
        let a = Node::from(json!({"x": 1, "y": "a"}));
        let b = Node::from(json!({"y": "a", "x": 1}));
        assert_eq!(a, b);
    }

    #[test]
    fn sequence_equality_is_positional() {
        let a = Node::from(json!([1, 2, 3]));
        let b = Node::from(json!([3, 2, 1]));
        assert_ne!(a, b);
    }

    #[test]
    fn display_keeps_insertion_order() {
        let n = Node::from(json!({"b": 1, "a": [true, null]}));
        assert_eq!(n.to_string(), r#"{"b":1,"a":[true,null]}"#);
    }

    #[test]
    fn classification() {
        assert!(Node::from(json!("x")).is_value());
        assert!(Node::Null.is_value());
        assert!(Node::from(json!([])).is_sequence());
        assert!(Node::from(json!({})).is_object());
        assert_eq!(Node::from(json!(1.5)).kind(), Kind::Number);
    }

    #[test]
    fn deserialize_keeps_order_and_ints() {
        let n: Node = serde_json::from_str(r#"{"z": 3, "a": 2.5}"#).unwrap();
        let m = n.as_object().unwrap();
        assert_eq!(m.keys().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(m["z"].as_i64(), Some(3));
        assert_eq!(m["a"], Node::from(2.5));
    }

    #[test]
    fn integers_above_i64_stay_exact() {
        let src = r#"{"n": 18446744073709551616, "m": 18446744073709551615}"#;
        let n: Node = serde_json::from_str(src).unwrap();
        let m = n.as_object().unwrap();
        // past u64 there is no exact form left
        assert!(matches!(m["n"], Node::Number(Number::Float(_))));
        assert_eq!(m["m"], Node::Number(Number::UInt(u64::MAX)));
        assert_eq!(m["m"].to_string(), "18446744073709551615");
        assert_eq!(Node::from(5u64), Node::from(5));
    }

    #[test]
    fn type_tag_reads_reserved_key() {
        let n = Node::from(json!({"@type": "Name", "id": "x"}));
        assert_eq!(n.type_tag(), Some("Name"));
        assert_eq!(Node::from(json!({"id": "x"})).type_tag(), None);
    }
}
