//! Line/column positions as they are carried on normalized nodes.
//!
//! The core only ever fills `line` and `col`; absolute offsets belong to
//! the position reconciliation step that runs after normalization.
use crate::error::{Error, Result};
use crate::node::{Node, Object};
use crate::uast::KEY_TYPE;

pub const TYPE_POSITIONS: &str = "uast:Positions";
pub const TYPE_POSITION: &str = "uast:Position";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: Option<u32>,
    pub line: u32,
    pub col: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Positions {
    pub start: Option<Position>,
    pub end: Option<Position>,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Self { offset: None, line, col }
    }

    pub fn to_node(&self) -> Node {
        let mut m = Object::new();
        m.insert(KEY_TYPE.into(), Node::from(TYPE_POSITION));
        if let Some(off) = self.offset {
            m.insert("offset".into(), Node::from(off as i64));
        }
        m.insert("line".into(), Node::from(self.line as i64));
        m.insert("col".into(), Node::from(self.col as i64));
        Node::Object(m)
    }

    pub fn from_node(node: &Node) -> Result<Self> {
        let m = expect_tagged(node, TYPE_POSITION)?;
        let field = |k: &str| -> Result<Option<u32>> {
            match m.get(k) {
                None => Ok(None),
                Some(v) => v.as_i64()
                    .and_then(|i| u32::try_from(i).ok())
                    .map(Some)
                    .ok_or_else(|| Error::MalformedInput(format!("position `{k}` is not a u32: {v}"))),
            }
        };
        Ok(Position {
            offset: field("offset")?,
            line: field("line")?.unwrap_or(0),
            col: field("col")?.unwrap_or(0),
        })
    }
}

impl Positions {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn to_node(&self) -> Node {
        let mut m = Object::new();
        m.insert(KEY_TYPE.into(), Node::from(TYPE_POSITIONS));
        if let Some(start) = &self.start {
            m.insert("start".into(), start.to_node());
        }
        if let Some(end) = &self.end {
            m.insert("end".into(), end.to_node());
        }
        Node::Object(m)
    }

    pub fn from_node(node: &Node) -> Result<Self> {
        let m = expect_tagged(node, TYPE_POSITIONS)?;
        Ok(Positions {
            start: m.get("start").map(Position::from_node).transpose()?,
            end: m.get("end").map(Position::from_node).transpose()?,
        })
    }
}

fn expect_tagged<'a>(node: &'a Node, typ: &str) -> Result<&'a Object> {
    let m = node.as_object()
        .ok_or_else(|| Error::ExpectedObject(node.to_string()))?;
    match node.type_tag() {
        Some(t) if t == typ => Ok(m),
        _ => Err(Error::MalformedInput(format!("expected `{typ}` node, got {node}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_node_shape() {
        let pos = Positions { start: Some(Position::new(3, 4)), end: None };
        let n = pos.to_node();
        assert_eq!(n.type_tag(), Some(TYPE_POSITIONS));
        assert_eq!(Positions::from_node(&n).unwrap(), pos);
    }

    #[test]
    fn offset_survives_when_present() {
        let p = Position { offset: Some(17), line: 2, col: 0 };
        assert_eq!(Position::from_node(&p.to_node()).unwrap(), p);
    }

    #[test]
    fn wrong_tag_is_malformed() {
        let n = Position::new(1, 1).to_node();
        assert!(matches!(Positions::from_node(&n), Err(Error::MalformedInput(_))));
    }
}
