use indexmap::IndexSet;

use crate::error::Result;
use crate::node::Node;
use crate::uast::KEY_ROLES;
use crate::walk;

/// Collapse repeated entries in every `@role` list, keeping the first
/// occurrence of each. Running it twice changes nothing.
pub fn dedup_roles(root: Node, max_depth: usize) -> Result<Node> {
    walk::post_order(root, max_depth, &mut |node, _| {
        let mut m = match node {
            Node::Object(m) => m,
            other => return Ok(other),
        };
        if let Some(Node::Sequence(roles)) = m.get_mut(KEY_ROLES) {
            let mut seen = IndexSet::with_capacity(roles.len());
            roles.retain(|r| seen.insert(r.to_string()));
        }
        Ok(Node::Object(m))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_first_occurrence_order() {
        let tree = Node::from(json!({
            "@type": "Name",
            "@role": ["Identifier", "Expression", "Identifier", "Left", "Expression"],
            "args": [{"@role": ["Call", "Call"]}],
        }));
        let out = dedup_roles(tree, 16).unwrap();
        assert_eq!(out, Node::from(json!({
            "@type": "Name",
            "@role": ["Identifier", "Expression", "Left"],
            "args": [{"@role": ["Call"]}],
        })));
    }

    #[test]
    fn idempotent() {
        let tree = Node::from(json!({"@role": ["A", "B", "A"], "x": {"@role": ["C", "C"]}}));
        let once = dedup_roles(tree, 16).unwrap();
        assert_eq!(dedup_roles(once.clone(), 16).unwrap(), once);
    }

    #[test]
    fn leaves_other_fields_alone() {
        let tree = Node::from(json!({"tags": ["a", "a"], "@role": "not-a-list"}));
        assert_eq!(dedup_roles(tree.clone(), 16).unwrap(), tree);
    }
}
