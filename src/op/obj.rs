use indexmap::IndexMap;

use super::Op;
use crate::error::{Error, Result};
use crate::node::{Node, Object};
use crate::state::State;

/// Object pattern/template.
///
/// Listed fields are checked one by one. Unlisted fields are bound as one
/// object to the `rest` variable and re-emitted after the listed fields
/// (open world); without `rest` they make the pattern fail (exhaustive).
#[derive(Debug, Clone, Default)]
pub struct ObjectOp {
    fields: IndexMap<String, Op>,
    rest: Option<String>,
    // keys declared more than once; rejected when the rule set is built
    duplicates: Vec<String>,
}

impl ObjectOp {
    pub fn new() -> Self { Self::default() }

    pub fn field(mut self, key: impl Into<String>, op: Op) -> Self {
        self.insert(key, op);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, op: Op) {
        let key = key.into();
        if self.fields.contains_key(&key) {
            self.duplicates.push(key.clone());
        }
        self.fields.insert(key, op);
    }

    /// Append all fields of `other`, keeping its rest variable if we have none.
    pub fn merge(mut self, other: ObjectOp) -> Self {
        for (k, op) in other.fields {
            self.insert(k, op);
        }
        self.duplicates.extend(other.duplicates);
        if self.rest.is_none() {
            self.rest = other.rest;
        }
        self
    }

    pub fn with_rest(mut self, name: impl Into<String>) -> Self {
        self.rest = Some(name.into());
        self
    }

    pub fn exhaustive(mut self) -> Self {
        self.rest = None;
        self
    }

    pub fn get(&self, key: &str) -> Option<&Op> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Op)> {
        self.fields.iter().map(|(k, op)| (k.as_str(), op))
    }

    pub fn rest(&self) -> Option<&str> {
        self.rest.as_deref()
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub(super) fn check(&self, st: &mut State, n: &Node) -> Result<bool> {
        let Node::Object(m) = n else {
            return Ok(false);
        };
        for (k, op) in &self.fields {
            let ok = match m.get(k) {
                Some(v) => op.check(st, v)?,
                None => op.check_missing(st)?,
            };
            if !ok {
                return Ok(false);
            }
        }
        match &self.rest {
            Some(name) => {
                let rest: Object = m.iter()
                    .filter(|(k, _)| !self.fields.contains_key(*k))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(st.bind(name, Node::Object(rest)))
            }
            None => Ok(m.keys().all(|k| self.fields.contains_key(k))),
        }
    }

    pub(super) fn construct(&self, st: &State) -> Result<Node> {
        let mut out = Object::with_capacity(self.fields.len());
        for (k, op) in &self.fields {
            if let Some(v) = op.construct_field(st)? {
                out.insert(k.clone(), v);
            }
        }
        if let Some(name) = &self.rest {
            match st.require(name)? {
                Node::Object(rest) => {
                    for (k, v) in rest {
                        if out.contains_key(k) {
                            return Err(Error::FieldCollision(k.clone()));
                        }
                        out.insert(k.clone(), v.clone());
                    }
                }
                other => {
                    return Err(Error::UnexpectedKind { var: name.clone(), kind: other.kind() });
                }
            }
        }
        Ok(Node::Object(out))
    }
}
