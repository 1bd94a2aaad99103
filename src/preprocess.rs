//! Structural stages that run around the rule sets: they reshape the
//! native response into something rules can match and undo it on the way
//! back.
use std::fmt;

use crate::config::Options;
use crate::error::{Error, Result};
use crate::node::{Node, Object};
use crate::uast::pos::{TYPE_POSITION, TYPE_POSITIONS};
use crate::uast::{is_reserved, Position, Positions, KEY_POS, KEY_TYPE};
use crate::walk::{self, Path};

pub trait Preprocess: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Native response to rule input.
    fn apply(&self, root: Node, opts: &Options) -> Result<Node>;

    /// Inverse of [`apply`](Self::apply).
    fn revert(&self, root: Node, opts: &Options) -> Result<Node>;
}

// ————————————————————————————————————————————————————————————————————————————
// RESPONSE METADATA
// ————————————————————————————————————————————————————————————————————————————

/// Unwraps the root node from the parser's response envelope.
///
/// With `top_level_is_root` unset the response must be an object with a
/// single entry, whose value is the actual root; reverting wraps the root
/// back under `root_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMetadata {
    pub top_level_is_root: bool,
    pub root_key: String,
}

impl Preprocess for ResponseMetadata {
    fn name(&self) -> &str {
        "response-metadata"
    }

    fn apply(&self, root: Node, _: &Options) -> Result<Node> {
        if self.top_level_is_root {
            return Ok(root);
        }
        match root {
            Node::Object(m) if m.len() == 1 => {
                Ok(m.into_iter().next().map(|(_, v)| v).unwrap_or_default())
            }
            other => Err(Error::MalformedInput(format!(
                "expected a single-entry response envelope, got {}",
                other.kind()
            ))),
        }
    }

    fn revert(&self, root: Node, _: &Options) -> Result<Node> {
        if self.top_level_is_root {
            return Ok(root);
        }
        Ok(Node::object([(self.root_key.as_str(), root)]))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OBJECT TO NODE
// ————————————————————————————————————————————————————————————————————————————

/// Moves parser-specific bookkeeping fields onto the reserved keys: the
/// internal type field becomes `@type`, line/column fields become `@pos`.
///
/// Positions are folded only when both line and column of a point are
/// present as non-negative integers; anything else is left in place so the
/// stage stays reversible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectToNode {
    pub internal_type_key: Option<String>,
    pub offset_key: Option<String>,
    pub line_key: Option<String>,
    pub column_key: Option<String>,
    pub end_offset_key: Option<String>,
    pub end_line_key: Option<String>,
    pub end_column_key: Option<String>,
}

/// Field names of one position point.
struct PointKeys<'a> {
    offset: Option<&'a str>,
    line: &'a str,
    col: &'a str,
}

impl ObjectToNode {
    fn start_keys(&self) -> Option<PointKeys<'_>> {
        Some(PointKeys {
            offset: self.offset_key.as_deref(),
            line: self.line_key.as_deref()?,
            col: self.column_key.as_deref()?,
        })
    }

    fn end_keys(&self) -> Option<PointKeys<'_>> {
        Some(PointKeys {
            offset: self.end_offset_key.as_deref(),
            line: self.end_line_key.as_deref()?,
            col: self.end_column_key.as_deref()?,
        })
    }

    fn to_node(&self, mut m: Object, path: &Path) -> Result<Node> {
        if let Some(key) = m.keys().find(|k| is_reserved(k)) {
            return Err(Error::ReservedKeyCollision { key: key.clone(), path: path.to_string() });
        }
        let typ = self.internal_type_key.as_deref().and_then(|k| m.shift_remove(k));
        let pos = Positions {
            start: self.start_keys().and_then(|keys| take_point(&mut m, &keys)),
            end: self.end_keys().and_then(|keys| take_point(&mut m, &keys)),
        };
        let mut out = Object::with_capacity(m.len() + 2);
        if let Some(typ) = typ {
            out.insert(KEY_TYPE.to_string(), typ);
        }
        out.extend(m);
        if !pos.is_empty() {
            out.insert(KEY_POS.to_string(), pos.to_node());
        }
        Ok(Node::Object(out))
    }

    fn to_object(&self, m: Object) -> Result<Node> {
        let mut out = Object::with_capacity(m.len() + 4);
        let mut pos = None;
        for (k, v) in m {
            match k.as_str() {
                KEY_TYPE => match &self.internal_type_key {
                    Some(key) => {
                        out.insert(key.clone(), v);
                    }
                    None => {
                        out.insert(k, v);
                    }
                },
                KEY_POS if self.start_keys().is_some() || self.end_keys().is_some() => {
                    pos = Some(Positions::from_node(&v)?);
                }
                _ => {
                    out.insert(k, v);
                }
            }
        }
        if let Some(pos) = pos {
            if let (Some(keys), Some(p)) = (self.start_keys(), pos.start) {
                put_point(&mut out, &keys, p);
            }
            if let (Some(keys), Some(p)) = (self.end_keys(), pos.end) {
                put_point(&mut out, &keys, p);
            }
        }
        Ok(Node::Object(out))
    }
}

impl Preprocess for ObjectToNode {
    fn name(&self) -> &str {
        "object-to-node"
    }

    fn apply(&self, root: Node, opts: &Options) -> Result<Node> {
        walk::post_order(root, opts.max_depth, &mut |node, path| match node {
            Node::Object(m) => self.to_node(m, path),
            other => Ok(other),
        })
    }

    fn revert(&self, root: Node, opts: &Options) -> Result<Node> {
        walk::pre_order(root, opts.max_depth, &mut |node, _| match node {
            Node::Object(m) if !is_position(&m) => self.to_object(m),
            other => Ok(other),
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn is_position(m: &Object) -> bool {
    matches!(m.get(KEY_TYPE).and_then(Node::as_str), Some(TYPE_POSITIONS | TYPE_POSITION))
}

fn as_u32(m: &Object, key: &str) -> Option<u32> {
    m.get(key)?.as_i64().and_then(|i| u32::try_from(i).ok())
}

fn take_point(m: &mut Object, keys: &PointKeys<'_>) -> Option<Position> {
    let line = as_u32(m, keys.line)?;
    let col = as_u32(m, keys.col)?;
    let offset = match keys.offset {
        Some(k) if m.contains_key(k) => Some(as_u32(m, k)?),
        _ => None,
    };
    m.shift_remove(keys.line);
    m.shift_remove(keys.col);
    if let Some(k) = keys.offset.filter(|_| offset.is_some()) {
        m.shift_remove(k);
    }
    Some(Position { offset, line, col })
}

fn put_point(m: &mut Object, keys: &PointKeys<'_>, p: Position) {
    m.insert(keys.line.to_string(), Node::from(p.line as i64));
    m.insert(keys.col.to_string(), Node::from(p.col as i64));
    if let (Some(k), Some(off)) = (keys.offset, p.offset) {
        m.insert(k.to_string(), Node::from(off as i64));
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn python_like() -> ObjectToNode {
        ObjectToNode {
            internal_type_key: Some("ast_type".into()),
            line_key: Some("lineno".into()),
            column_key: Some("col_offset".into()),
            end_line_key: Some("end_lineno".into()),
            end_column_key: Some("end_col_offset".into()),
            ..Default::default()
        }
    }

    #[test]
    fn envelope_is_unwrapped_and_restored() {
        let meta = ResponseMetadata { top_level_is_root: false, root_key: "PY3AST".into() };
        let opts = Options::default();
        let root = meta.apply(Node::from(json!({"PY3AST": {"ast_type": "Module"}})), &opts).unwrap();
        assert_eq!(root, Node::from(json!({"ast_type": "Module"})));
        assert_eq!(
            meta.revert(root, &opts).unwrap(),
            Node::from(json!({"PY3AST": {"ast_type": "Module"}})),
        );
    }

    #[test]
    fn envelope_with_several_entries_is_malformed() {
        let meta = ResponseMetadata { top_level_is_root: false, root_key: "PY3AST".into() };
        let err = meta.apply(Node::from(json!({"a": 1, "b": 2})), &Options::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
        let err = meta.apply(Node::from(json!([1])), &Options::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn type_and_positions_fold_onto_reserved_keys() {
        let stage = python_like();
        let native = Node::from(json!({
            "ast_type": "Name", "id": "x", "lineno": 1, "col_offset": 4,
            "end_lineno": 1, "end_col_offset": 5,
            "ctx": {"ast_type": "Load"},
        }));
        let out = stage.apply(native.clone(), &Options::default()).unwrap();
        assert_eq!(out, Node::from(json!({
            "@type": "Name", "id": "x", "ctx": {"@type": "Load"},
            "@pos": {
                "@type": "uast:Positions",
                "start": {"@type": "uast:Position", "line": 1, "col": 4},
                "end": {"@type": "uast:Position", "line": 1, "col": 5},
            },
        })));
        assert_eq!(stage.revert(out, &Options::default()).unwrap(), native);
    }

    #[test]
    fn unusable_positions_stay_raw() {
        let stage = python_like();
        let native = Node::from(json!({"ast_type": "Str", "lineno": 3, "col_offset": -1}));
        let out = stage.apply(native.clone(), &Options::default()).unwrap();
        assert_eq!(out, Node::from(json!({"@type": "Str", "lineno": 3, "col_offset": -1})));
        assert_eq!(stage.revert(out, &Options::default()).unwrap(), native);
    }

    #[test]
    fn reserved_key_in_native_input_is_rejected() {
        let stage = python_like();
        let native = Node::from(json!({"ast_type": "Name", "body": [{"@role": []}]}));
        let err = stage.apply(native, &Options::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::ReservedKeyCollision { ref key, ref path } if key == "@role" && path == "/body/0"
        ));
    }

    #[test]
    fn reconciled_offsets_are_dropped_on_revert() {
        let stage = python_like();
        let norm = Node::from(json!({
            "@type": "Pass",
            "@pos": {
                "@type": "uast:Positions",
                "start": {"@type": "uast:Position", "offset": 10, "line": 2, "col": 0},
            },
        }));
        let out = stage.revert(norm, &Options::default()).unwrap();
        assert_eq!(out, Node::from(json!({"ast_type": "Pass", "lineno": 2, "col_offset": 0})));
    }
}
