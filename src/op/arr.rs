use super::Op;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::state::State;

pub(super) fn check_arr(ops: &[Op], st: &mut State, n: &Node) -> Result<bool> {
    let Node::Sequence(xs) = n else {
        return Ok(false);
    };
    if xs.len() != ops.len() {
        return Ok(false);
    }
    for (op, x) in ops.iter().zip(xs) {
        if !op.check(st, x)? {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(super) fn check_each(name: &str, op: &Op, st: &mut State, n: &Node) -> Result<bool> {
    let Node::Sequence(xs) = n else {
        return Ok(false);
    };
    let mut scopes = Vec::with_capacity(xs.len());
    for x in xs {
        let mut sub = State::new();
        if !op.check(&mut sub, x)? {
            return Ok(false);
        }
        scopes.push(sub.to_node());
    }
    Ok(st.bind(name, Node::Sequence(scopes)))
}

pub(super) fn construct_each(name: &str, op: &Op, st: &State) -> Result<Node> {
    let scopes = match st.require(name)? {
        Node::Sequence(xs) => xs,
        other => return Err(Error::UnexpectedKind { var: name.to_string(), kind: other.kind() }),
    };
    let mut out = Vec::with_capacity(scopes.len());
    for scope in scopes {
        let sub = State::from_node(scope)?;
        out.push(op.construct(&sub)?);
    }
    Ok(Node::Sequence(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uast::Role;
    use serde_json::json;

    #[test]
    fn each_maps_every_element_and_keeps_order() {
        let native = Op::each("args", Op::var("item"));
        let norm = Op::each("args", Op::append_roles(Op::var("item"), &[Role::Argument]));
        let n = Node::from(json!([{"@type": "a"}, {"@type": "b"}, {"@type": "c"}]));

        let mut st = State::new();
        assert!(native.check(&mut st, &n).unwrap());
        let out = norm.construct(&st).unwrap();
        assert_eq!(out, Node::from(json!([
            {"@type": "a", "@role": ["Argument"]},
            {"@type": "b", "@role": ["Argument"]},
            {"@type": "c", "@role": ["Argument"]},
        ])));

        let mut back = State::new();
        assert!(norm.check(&mut back, &out).unwrap());
        assert_eq!(native.construct(&back).unwrap(), n);
    }

    #[test]
    fn each_fails_atomically() {
        let op = Op::each("xs", Op::is(1));
        let mut st = State::new();
        assert!(!op.check(&mut st, &Node::from(json!([1, 2]))).unwrap());
        assert!(st.is_empty());
        assert!(op.check(&mut st, &Node::from(json!([]))).unwrap());
        assert_eq!(op.construct(&st).unwrap(), Node::from(json!([])));
    }

    #[test]
    fn fixed_arity_sequence() {
        let op = Op::Arr(vec![Op::var("a"), Op::var("b")]);
        let mut st = State::new();
        assert!(!op.check(&mut st, &Node::from(json!([1]))).unwrap());
        assert!(op.check(&mut st, &Node::from(json!([1, "x"]))).unwrap());
        assert_eq!(st.get("b"), Some(&Node::from("x")));
    }
}
