//! Binding context for one rule attempt.
//!
//! Bindings are only ever appended, so a checkpoint is just the current
//! length and rolling back truncates to it.
use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node::{Node, Object};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    vars: IndexMap<String, Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl State {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.vars.len() }

    pub fn is_empty(&self) -> bool { self.vars.is_empty() }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.vars.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Node> {
        self.get(name).ok_or_else(|| Error::UndefinedVariable(name.to_string()))
    }

    /// Bind `name`, or confirm an existing binding. Returns false when the
    /// name is already bound to a different node.
    pub fn bind(&mut self, name: &str, node: Node) -> bool {
        match self.vars.get(name) {
            Some(prev) => *prev == node,
            None => {
                self.vars.insert(name.to_string(), node);
                true
            }
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.vars.len())
    }

    pub fn restore(&mut self, cp: Checkpoint) {
        self.vars.truncate(cp.0);
    }

    pub fn reset(&mut self) {
        self.vars.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Bindings as an object node; used for per-element scopes.
    pub fn to_node(&self) -> Node {
        Node::Object(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<Object>())
    }

    pub fn from_node(node: &Node) -> Result<Self> {
        let m = node.as_object()
            .ok_or_else(|| Error::ExpectedObject(node.to_string()))?;
        Ok(Self { vars: m.clone() })
    }
}
