//! Depth-bounded tree walks over owned nodes.
//!
//! Both walks rebuild every container they pass through; the callback
//! receives each node by value together with its path from the root.
use std::fmt;

use crate::error::{Error, Result};
use crate::node::{Node, Object};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a node, rendered as a JSON pointer (`/body/0/value`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self { Self::default() }

    pub fn depth(&self) -> usize { self.0.len() }

    fn push(&mut self, seg: Segment) { self.0.push(seg); }

    fn pop(&mut self) { self.0.pop(); }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.0 {
            match seg {
                Segment::Key(k) => write!(f, "/{}", k.replace('~', "~0").replace('/', "~1"))?,
                Segment::Index(i) => write!(f, "/{i}")?,
            }
        }
        Ok(())
    }
}

/// Children first, then the node itself.
pub fn post_order<F>(root: Node, max_depth: usize, f: &mut F) -> Result<Node>
where
    F: FnMut(Node, &Path) -> Result<Node>,
{
    fn go<F>(node: Node, path: &mut Path, max_depth: usize, f: &mut F) -> Result<Node>
    where
        F: FnMut(Node, &Path) -> Result<Node>,
    {
        if path.depth() > max_depth {
            return Err(Error::DepthExceeded { limit: max_depth, path: path.to_string() });
        }
        let node = descend(node, path, &mut |child, path| go(child, path, max_depth, f))?;
        f(node, &*path)
    }
    go(root, &mut Path::root(), max_depth, f)
}

/// The node itself, then the children of whatever it was replaced with.
pub fn pre_order<F>(root: Node, max_depth: usize, f: &mut F) -> Result<Node>
where
    F: FnMut(Node, &Path) -> Result<Node>,
{
    fn go<F>(node: Node, path: &mut Path, max_depth: usize, f: &mut F) -> Result<Node>
    where
        F: FnMut(Node, &Path) -> Result<Node>,
    {
        if path.depth() > max_depth {
            return Err(Error::DepthExceeded { limit: max_depth, path: path.to_string() });
        }
        let node = f(node, &*path)?;
        descend(node, path, &mut |child, path| go(child, path, max_depth, f))
    }
    go(root, &mut Path::root(), max_depth, f)
}

fn descend(
    node: Node,
    path: &mut Path,
    visit: &mut dyn FnMut(Node, &mut Path) -> Result<Node>,
) -> Result<Node> {
    match node {
        Node::Object(m) => {
            let mut out = Object::with_capacity(m.len());
            for (k, v) in m {
                path.push(Segment::Key(k.clone()));
                let v = visit(v, path)?;
                path.pop();
                out.insert(k, v);
            }
            Ok(Node::Object(out))
        }
        Node::Sequence(xs) => {
            let mut out = Vec::with_capacity(xs.len());
            for (i, x) in xs.into_iter().enumerate() {
                path.push(Segment::Index(i));
                out.push(visit(x, path)?);
                path.pop();
            }
            Ok(Node::Sequence(out))
        }
        other => Ok(other),
    }
}
