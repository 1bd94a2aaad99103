//! Operator protocol shared by patterns and templates.
//!
//! Every element of a mapping is an [`Op`]. Used as a pattern it is
//! *checked* against a candidate node and may bind variables; used as a
//! template it *constructs* a node from those bindings. A rule is a pair of
//! ops, and running it backwards just swaps which side is checked.
//!
//! Contract: `check` followed by `construct` over the same state yields a
//! node equal to the candidate. Role sets are the one exception: they are
//! derived data, so their check is lenient (see [`roles`]).
pub mod obj;
pub mod arr;
pub mod roles;
pub mod custom;

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{Error, Result};
use crate::node::Node;
use crate::state::State;
use crate::uast::{Role, KEY_TYPE};

pub use custom::{CheckOrder, CustomOp, Repeated};
pub use obj::ObjectOp;

#[derive(Debug, Clone)]
pub enum Op {
    /// Literal value.
    Is(Node),
    /// Variable capture.
    Var(String),
    Obj(ObjectOp),
    /// Fixed-length sequence, matched position by position.
    Arr(Vec<Op>),
    /// Sequence of any length; `op` is applied to each element in its own
    /// scope and the scopes are bound to `name`.
    Each { name: String, op: Box<Op> },
    /// Field that may be absent; presence is bound to `exists`.
    Opt { exists: String, op: Box<Op> },
    Roles(Vec<Role>),
    AppendRoles { op: Box<Op>, roles: Vec<Role> },
    Custom(Arc<dyn CustomOp>),
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl Op {
    pub fn is(value: impl Into<Node>) -> Self {
        Op::Is(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Op::Var(name.into())
    }

    pub fn obj(obj: ObjectOp) -> Self {
        Op::Obj(obj)
    }

    pub fn each(name: impl Into<String>, op: Op) -> Self {
        Op::Each { name: name.into(), op: Box::new(op) }
    }

    pub fn opt(exists: impl Into<String>, op: Op) -> Self {
        Op::Opt { exists: exists.into(), op: Box::new(op) }
    }

    pub fn roles(roles: &[Role]) -> Self {
        Op::Roles(roles.to_vec())
    }

    pub fn append_roles(op: Op, roles: &[Role]) -> Self {
        if roles.is_empty() {
            return op;
        }
        Op::AppendRoles { op: Box::new(op), roles: roles.to_vec() }
    }

    pub fn custom(op: impl CustomOp + 'static) -> Self {
        Op::Custom(Arc::new(op))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PROTOCOL
// ————————————————————————————————————————————————————————————————————————————

impl Op {
    /// Reconcile `n` with this op. On `Ok(false)` the state is exactly as
    /// it was before the call.
    pub fn check(&self, st: &mut State, n: &Node) -> Result<bool> {
        let cp = st.checkpoint();
        let ok = match self {
            Op::Is(v) => v == n,
            Op::Var(name) => st.bind(name, n.clone()),
            Op::Obj(obj) => obj.check(st, n)?,
            Op::Arr(ops) => arr::check_arr(ops, st, n)?,
            Op::Each { name, op } => arr::check_each(name, op, st, n)?,
            Op::Opt { exists, op } => st.bind(exists, Node::Bool(true)) && op.check(st, n)?,
            Op::Roles(_) => roles::check_roles(n),
            Op::AppendRoles { op, roles } => roles::check_append(op, roles, st, n)?,
            Op::Custom(op) => op.check(st, n)?,
        };
        if !ok {
            st.restore(cp);
        }
        Ok(ok)
    }

    /// Called by an object pattern when the field this op sits on is absent.
    pub(crate) fn check_missing(&self, st: &mut State) -> Result<bool> {
        match self {
            Op::Opt { exists, .. } => Ok(st.bind(exists, Node::Bool(false))),
            // roles may have been stripped entirely by a parent
            Op::Roles(_) => Ok(true),
            _ => Ok(false),
        }
    }

    pub fn construct(&self, st: &State) -> Result<Node> {
        Ok(self.construct_field(st)?.unwrap_or(Node::Null))
    }

    /// `None` means the enclosing object should omit the field.
    pub(crate) fn construct_field(&self, st: &State) -> Result<Option<Node>> {
        let node = match self {
            Op::Is(v) => v.clone(),
            Op::Var(name) => st.require(name)?.clone(),
            Op::Obj(obj) => obj.construct(st)?,
            Op::Arr(ops) => Node::Sequence(
                ops.iter().map(|op| op.construct(st)).collect::<Result<Vec<_>>>()?,
            ),
            Op::Each { name, op } => arr::construct_each(name, op, st)?,
            Op::Opt { exists, op } => match st.require(exists)? {
                Node::Bool(true) => return op.construct_field(st),
                Node::Bool(false) => return Ok(None),
                other => {
                    return Err(Error::UnexpectedKind { var: exists.clone(), kind: other.kind() })
                }
            },
            Op::Roles(roles) => {
                if roles.is_empty() {
                    return Ok(None);
                }
                roles::to_node(roles)
            }
            Op::AppendRoles { op, roles } => roles::append(op.construct(st)?, roles)?,
            Op::Custom(op) => op.construct(st)?,
        };
        Ok(Some(node))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTROSPECTION
// ————————————————————————————————————————————————————————————————————————————

impl Op {
    /// The literal `@type` this op requires, if it is an object pattern
    /// that pins one. Used to index rules.
    pub fn type_literal(&self) -> Option<&str> {
        match self {
            Op::Obj(obj) => match obj.get(KEY_TYPE) {
                Some(Op::Is(Node::String(s))) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn collect_vars(&self, vars: &mut Vars) {
        match self {
            Op::Is(_) | Op::Roles(_) => {}
            Op::Var(name) => vars.insert(name),
            Op::Obj(obj) => {
                for (_, op) in obj.fields() {
                    op.collect_vars(vars);
                }
                if let Some(rest) = obj.rest() {
                    vars.insert(rest);
                }
            }
            Op::Arr(ops) => ops.iter().for_each(|op| op.collect_vars(vars)),
            Op::Each { name, op } => {
                vars.insert(name);
                op.collect_vars(vars.scope(name));
            }
            Op::Opt { exists, op } => {
                vars.insert(exists);
                op.collect_vars(vars);
            }
            Op::AppendRoles { op, .. } => op.collect_vars(vars),
            Op::Custom(op) => op.operands().into_iter().for_each(|op| op.collect_vars(vars)),
        }
    }

    /// Visit every object op, outermost first.
    pub fn visit_objects<'a>(&'a self, f: &mut dyn FnMut(&'a ObjectOp)) {
        match self {
            Op::Is(_) | Op::Var(_) | Op::Roles(_) => {}
            Op::Obj(obj) => {
                f(obj);
                for (_, op) in obj.fields() {
                    op.visit_objects(f);
                }
            }
            Op::Arr(ops) => ops.iter().for_each(|op| op.visit_objects(f)),
            Op::Each { op, .. } | Op::Opt { op, .. } | Op::AppendRoles { op, .. } => {
                op.visit_objects(f)
            }
            Op::Custom(op) => op.operands().into_iter().for_each(|op| op.visit_objects(f)),
        }
    }
}

/// Variables referenced by an op, with a nested scope per `Each`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    names: IndexSet<String>,
    scopes: IndexMap<String, Vars>,
}

impl Vars {
    pub fn of(op: &Op) -> Self {
        let mut vars = Vars::default();
        op.collect_vars(&mut vars);
        vars
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn scope(&mut self, name: &str) -> &mut Vars {
        self.scopes.entry(name.to_string()).or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Names referenced here but absent from `bound`; nested scopes are
    /// reported as `scope.name`.
    pub fn missing_from(&self, bound: &Vars) -> Vec<String> {
        let mut out: Vec<String> = self.names.iter()
            .filter(|n| !bound.contains(n))
            .cloned()
            .collect();
        let empty = Vars::default();
        for (scope, inner) in &self.scopes {
            let other = bound.scopes.get(scope).unwrap_or(&empty);
            out.extend(inner.missing_from(other).into_iter().map(|n| format!("{scope}.{n}")));
        }
        out
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(v: serde_json::Value) -> Node { Node::from(v) }

    #[test]
    fn literal_round_trip() {
        let op = Op::is("x");
        let mut st = State::new();
        assert!(op.check(&mut st, &node(json!("x"))).unwrap());
        assert!(!op.check(&mut st, &node(json!("y"))).unwrap());
        assert_eq!(op.construct(&st).unwrap(), node(json!("x")));
    }

    #[test]
    fn variable_binds_then_compares() {
        let op = Op::Arr(vec![Op::var("a"), Op::var("a")]);
        let mut st = State::new();
        assert!(op.check(&mut st, &node(json!([1, 1]))).unwrap());
        assert_eq!(op.construct(&st).unwrap(), node(json!([1, 1])));

        let mut st = State::new();
        assert!(!op.check(&mut st, &node(json!([1, 2]))).unwrap());
        assert!(st.is_empty(), "failed check must not leak bindings");
    }

    #[test]
    fn unbound_variable_cannot_be_constructed() {
        let err = Op::var("nope").construct(&State::new()).unwrap_err();
        assert!(matches!(err, Error::UndefinedVariable(v) if v == "nope"));
    }

    #[test]
    fn optional_field_binds_absence() {
        let op = Op::obj(ObjectOp::new().field("exc", Op::opt("exc?", Op::var("exc"))));
        let mut st = State::new();
        assert!(op.check(&mut st, &node(json!({}))).unwrap());
        assert_eq!(st.get("exc?"), Some(&Node::Bool(false)));
        assert_eq!(op.construct(&st).unwrap(), node(json!({})));

        let mut st = State::new();
        let present = node(json!({"exc": {"@type": "Name"}}));
        assert!(op.check(&mut st, &present).unwrap());
        assert_eq!(op.construct(&st).unwrap(), present);
    }

    #[test]
    fn type_literal_is_read_from_object_pattern() {
        let op = Op::obj(ObjectOp::new().field(KEY_TYPE, Op::is("Call")));
        assert_eq!(op.type_literal(), Some("Call"));
        assert_eq!(Op::var("x").type_literal(), None);
    }

    #[test]
    fn vars_report_nested_scopes() {
        let pattern = Op::obj(ObjectOp::new().field("args", Op::each("args", Op::var("item"))));
        let template = Op::obj(ObjectOp::new().field("args", Op::each("args", Op::var("elem"))));
        let missing = Vars::of(&template).missing_from(&Vars::of(&pattern));
        assert_eq!(missing, vec!["args.elem".to_string()]);
    }
}
