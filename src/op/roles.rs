//! Role-set operators.
//!
//! Roles are a function of the type tag and of the parent that appended
//! them, so in the normalized-to-native direction they are not used to
//! discriminate: `Roles` accepts any role list (or none), and
//! `AppendRoles` only requires its own roles to be present before it
//! strips them from the child.
use super::Op;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::state::State;
use crate::uast::{Role, KEY_ROLES};

pub(crate) fn to_node(roles: &[Role]) -> Node {
    Node::Sequence(roles.iter().map(|r| Node::from(r.as_str())).collect())
}

pub(super) fn check_roles(n: &Node) -> bool {
    matches!(n, Node::Sequence(xs) if xs.iter().all(|x| x.as_str().is_some()))
}

pub(super) fn append(node: Node, roles: &[Role]) -> Result<Node> {
    match node {
        Node::Object(mut m) => {
            let extra = roles.iter().map(|r| Node::from(r.as_str()));
            match m.get_mut(KEY_ROLES) {
                Some(Node::Sequence(existing)) => existing.extend(extra),
                Some(other) => {
                    return Err(Error::UnexpectedKind { var: KEY_ROLES.to_string(), kind: other.kind() });
                }
                None => {
                    m.insert(KEY_ROLES.to_string(), Node::Sequence(extra.collect()));
                }
            }
            Ok(Node::Object(m))
        }
        // absent optional children stay absent
        Node::Null => Ok(Node::Null),
        other => Err(Error::ExpectedObject(other.to_string())),
    }
}

pub(super) fn check_append(op: &Op, roles: &[Role], st: &mut State, n: &Node) -> Result<bool> {
    let m = match n {
        Node::Object(m) => m,
        Node::Null => return op.check(st, n),
        _ => return Ok(false),
    };
    let names: Vec<&str> = roles.iter().map(|r| r.as_str()).collect();
    let Some(Node::Sequence(existing)) = m.get(KEY_ROLES) else {
        return Ok(false);
    };
    if !names.iter().all(|name| existing.iter().any(|x| x.as_str() == Some(name))) {
        return Ok(false);
    }
    let kept: Vec<Node> = existing.iter()
        .filter(|x| !x.as_str().is_some_and(|s| names.contains(&s)))
        .cloned()
        .collect();
    let mut stripped = m.clone();
    if kept.is_empty() {
        stripped.shift_remove(KEY_ROLES);
    } else {
        stripped.insert(KEY_ROLES.to_string(), Node::Sequence(kept));
    }
    op.check(st, &Node::Object(stripped))
}
