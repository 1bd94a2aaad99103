//! Ordered, validated collections of mappings and the walks that apply
//! them.
//!
//! Rule order is authoritative: for every node the first rule whose
//! pattern accepts it wins, and a node no rule accepts passes through
//! unchanged. Rules are indexed by the `@type` literal their pattern pins
//! so only plausible candidates are tried.
use std::collections::HashMap;

use tracing::{trace, warn};

use crate::config::Options;
use crate::error::{ConfigError, Result};
use crate::mapping::{Direction, Mapping};
use crate::node::Node;
use crate::op::Vars;
use crate::state::State;
use crate::uast::{KEY_ROLES, KEY_TOKEN};
use crate::walk::{self, Path};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct RuleSet {
    name: String,
    rules: Vec<Mapping>,
    forward: TypeIndex,
    backward: TypeIndex,
}

/// Rule positions per pinned type, plus the rules that pin none.
#[derive(Debug, Default)]
struct TypeIndex {
    typed: HashMap<String, Vec<usize>>,
    generic: Vec<usize>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<Mapping>) -> Result<Self, ConfigError> {
        let name = name.into();
        for rule in &rules {
            validate(rule)?;
        }
        let forward = TypeIndex::build(&name, &rules, Direction::Normalize);
        let backward = TypeIndex::build(&name, &rules, Direction::Denormalize);
        Ok(Self { name, rules, forward, backward })
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn rules(&self) -> &[Mapping] { &self.rules }

    pub fn len(&self) -> usize { self.rules.len() }

    pub fn is_empty(&self) -> bool { self.rules.is_empty() }

    /// Native to normalized, children before parents.
    pub fn normalize(&self, root: Node, opts: &Options) -> Result<Node> {
        walk::post_order(root, opts.max_depth, &mut |node, path| {
            self.rewrite(Direction::Normalize, node, path)
        })
    }

    /// Normalized to native, parents before children: a parent has to
    /// take back the roles it appended before its children are matched.
    pub fn denormalize(&self, root: Node, opts: &Options) -> Result<Node> {
        walk::pre_order(root, opts.max_depth, &mut |node, path| {
            self.rewrite(Direction::Denormalize, node, path)
        })
    }

    /// Apply the first accepting rule to this one node.
    pub fn rewrite(&self, dir: Direction, node: Node, path: &Path) -> Result<Node> {
        let index = match dir {
            Direction::Normalize => &self.forward,
            Direction::Denormalize => &self.backward,
        };
        for i in index.candidates(node.type_tag()) {
            let rule = &self.rules[i];
            let mut st = State::new();
            let matched = rule.pattern(dir).check(&mut st, &node)
                .map_err(|err| err.in_rule(rule.name(), path))?;
            if !matched {
                continue;
            }
            trace!(rule = rule.name(), %path, direction = %dir, "rule applied");
            return rule.template(dir).construct(&st)
                .map_err(|err| err.in_rule(rule.name(), path));
        }
        Ok(node)
    }
}

impl TypeIndex {
    fn build(set: &str, rules: &[Mapping], dir: Direction) -> Self {
        let mut index = TypeIndex::default();
        for (i, rule) in rules.iter().enumerate() {
            match rule.pattern(dir).type_literal() {
                Some(typ) => index.typed.entry(typ.to_string()).or_default().push(i),
                None => index.generic.push(i),
            }
        }
        let shadowed = index.shadowed();
        if let Some(&first) = index.generic.first().filter(|_| shadowed > 0) {
            warn!(
                rule_set = set,
                generic = rules[first].name(),
                shadowed,
                direction = %dir,
                "generic rule is tried before typed rules registered after it"
            );
        }
        index
    }

    /// Typed rules registered after the first generic one.
    fn shadowed(&self) -> usize {
        match self.generic.first() {
            Some(&first) => self.typed.values().flatten().filter(|&&i| i > first).count(),
            None => 0,
        }
    }

    /// Typed candidates merged with generic ones, in registration order.
    fn candidates(&self, typ: Option<&str>) -> Vec<usize> {
        let typed = typ.and_then(|t| self.typed.get(t)).map(Vec::as_slice).unwrap_or(&[]);
        let mut out = Vec::with_capacity(typed.len() + self.generic.len());
        out.extend_from_slice(typed);
        out.extend_from_slice(&self.generic);
        out.sort_unstable();
        out
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn validate(rule: &Mapping) -> Result<(), ConfigError> {
    let mut error = None;
    for side in [rule.native(), rule.norm()] {
        side.visit_objects(&mut |obj| {
            if error.is_some() {
                return;
            }
            if let Some(field) = obj.duplicates().first() {
                error = Some(ConfigError::DuplicateField {
                    rule: rule.name().to_string(),
                    field: field.clone(),
                });
            }
        });
    }
    rule.native().visit_objects(&mut |obj| {
        if error.is_some() {
            return;
        }
        if let Some((key, _)) = obj.fields().find(|(k, _)| *k == KEY_ROLES || *k == KEY_TOKEN) {
            error = Some(ConfigError::ReservedKey {
                rule: rule.name().to_string(),
                key: key.to_string(),
            });
        }
    });
    if let Some(err) = error {
        return Err(err);
    }
    for dir in [Direction::Normalize, Direction::Denormalize] {
        let bound = Vars::of(rule.pattern(dir));
        let used = Vars::of(rule.template(dir));
        if let Some(var) = used.missing_from(&bound).into_iter().next() {
            return Err(ConfigError::UnboundVariable {
                rule: rule.name().to_string(),
                direction: dir.as_str(),
                var,
            });
        }
    }
    Ok(())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mapping::{annotate_type, annotate_type_token, map_ast, FieldRoles, REST};
    use crate::op::{ObjectOp, Op};
    use crate::uast::{Role, KEY_TYPE};
    use serde_json::json;

    fn opts() -> Options { Options::default() }

    fn node(v: serde_json::Value) -> Node { Node::from(v) }

    fn binop_rules() -> RuleSet {
        RuleSet::new("test", vec![
            annotate_type("BinOp", FieldRoles::new()
                .roles("left", &[Role::Binary, Role::Left])
                .roles("right", &[Role::Binary, Role::Right])
                .roles("op", &[Role::Binary]),
                &[Role::Expression, Role::Binary]),
            annotate_type("Name", FieldRoles::new().rename("id", KEY_TOKEN), &[Role::Identifier]),
            annotate_type_token("Add", "+", &[Role::Operator, Role::Arithmetic, Role::Add]),
        ]).unwrap()
    }

    #[test]
    fn nested_normalize_and_back() {
        let rules = binop_rules();
        let native = node(json!({
            "@type": "BinOp",
            "left": {"@type": "Name", "id": "a"},
            "op": {"@type": "Add"},
            "right": {"@type": "Name", "id": "b"},
        }));
        let norm = rules.normalize(native.clone(), &opts()).unwrap();
        assert_eq!(norm, node(json!({
            "@type": "BinOp",
            "@role": ["Expression", "Binary"],
            "left": {"@type": "Name", "@role": ["Identifier", "Binary", "Left"], "@token": "a"},
            "op": {"@type": "Add", "@role": ["Operator", "Arithmetic", "Add", "Binary"], "@token": "+"},
            "right": {"@type": "Name", "@role": ["Identifier", "Binary", "Right"], "@token": "b"},
        })));
        assert_eq!(rules.denormalize(norm, &opts()).unwrap(), native);
    }

    #[test]
    fn unmatched_nodes_pass_through() {
        let rules = binop_rules();
        let native = node(json!({"@type": "Starred", "value": [1, "x", null]}));
        assert_eq!(rules.normalize(native.clone(), &opts()).unwrap(), native);
        assert_eq!(rules.denormalize(native.clone(), &opts()).unwrap(), native);
    }

    #[test]
    fn first_matching_rule_wins() {
        // both accept a node with `kwonlyargs`; only the second accepts one without
        let specific = map_ast(
            "arguments",
            ObjectOp::new().field("kwonlyargs", Op::var("kw")),
            ObjectOp::new().field("kwonlyargs", Op::var("kw")),
            &[Role::Argument, Role::Incomplete],
        ).named("py3");
        let fallback = annotate_type("arguments", FieldRoles::new(), &[Role::Argument]).named("py2");

        let rules = RuleSet::new("precedence", vec![specific.clone(), fallback.clone()]).unwrap();
        let with_kw = node(json!({"@type": "arguments", "kwonlyargs": []}));
        let out = rules.normalize(with_kw.clone(), &opts()).unwrap();
        assert_eq!(out.as_object().unwrap()["@role"], node(json!(["Argument", "Incomplete"])));
        let out = rules.normalize(node(json!({"@type": "arguments"})), &opts()).unwrap();
        assert_eq!(out.as_object().unwrap()["@role"], node(json!(["Argument"])));

        // swapping the order changes the result for the overlapping node
        let swapped = RuleSet::new("precedence", vec![fallback, specific]).unwrap();
        let out = swapped.normalize(with_kw, &opts()).unwrap();
        assert_eq!(out.as_object().unwrap()["@role"], node(json!(["Argument"])));
    }

    /// Any object with an `id`, whatever its type.
    fn any_ident() -> Mapping {
        Mapping::new(
            "generic:ident",
            Op::obj(ObjectOp::new().field("id", Op::var("id")).with_rest(REST)),
            Op::obj(ObjectOp::new().field("ident", Op::var("id")).with_rest(REST)),
        )
    }

    fn name_rule() -> Mapping {
        annotate_type("Name", FieldRoles::new().rename("id", KEY_TOKEN), &[Role::Identifier])
    }

    #[test]
    fn typed_rule_before_generic_fallback() {
        let rules = RuleSet::new("typed-first", vec![name_rule(), any_ident()]).unwrap();
        assert_eq!(rules.forward.generic, [1]);
        assert_eq!(rules.forward.candidates(Some("Name")), [0, 1]);
        assert_eq!(rules.forward.candidates(Some("Var")), [1]);
        assert_eq!(rules.forward.shadowed(), 0);

        let name = node(json!({"@type": "Name", "id": "a"}));
        let norm = rules.normalize(name.clone(), &opts()).unwrap();
        assert_eq!(norm, node(json!({"@type": "Name", "@role": ["Identifier"], "@token": "a"})));
        assert_eq!(rules.denormalize(norm, &opts()).unwrap(), name);

        let var = node(json!({"@type": "Var", "id": "b"}));
        let norm = rules.normalize(var.clone(), &opts()).unwrap();
        assert_eq!(norm, node(json!({"@type": "Var", "ident": "b"})));
        assert_eq!(rules.denormalize(norm, &opts()).unwrap(), var);
    }

    #[test]
    fn generic_rule_registered_first_shadows_typed_rule() {
        let rules = RuleSet::new("generic-first", vec![any_ident(), name_rule()]).unwrap();
        assert_eq!(rules.forward.generic, [0]);
        assert_eq!(rules.forward.candidates(Some("Name")), [0, 1]);
        assert_eq!(rules.forward.shadowed(), 1);

        let name = node(json!({"@type": "Name", "id": "a"}));
        let norm = rules.normalize(name.clone(), &opts()).unwrap();
        assert_eq!(norm, node(json!({"@type": "Name", "ident": "a"})));
        assert_eq!(rules.denormalize(norm, &opts()).unwrap(), name);
    }

    #[test]
    fn output_is_deterministic() {
        let rules = binop_rules();
        let native = node(json!({
            "@type": "BinOp",
            "right": {"@type": "Name", "id": "b"},
            "left": {"@type": "Name", "id": "a"},
            "op": {"@type": "Add"},
        }));
        let a = rules.normalize(native.clone(), &opts()).unwrap().to_string();
        let b = rules.normalize(native, &opts()).unwrap().to_string();
        assert_eq!(a, b);
    }

    #[test]
    fn grouping_node_for_list_field() {
        let rules = RuleSet::new("fn", vec![map_ast(
            "FunctionDef",
            ObjectOp::new().field("body", Op::var("body_stmts")),
            ObjectOp::new().field("body", Op::obj(ObjectOp::new()
                .field(KEY_TYPE, Op::is("FunctionDef.body"))
                .field(KEY_ROLES, Op::roles(&[Role::Function, Role::Body]))
                .field("body_stmts", Op::var("body_stmts")))),
            &[Role::Function, Role::Declaration],
        )]).unwrap();
        let native = node(json!({
            "@type": "FunctionDef",
            "body": [{"@type": "Pass"}, {"@type": "Pass"}, {"@type": "Return"}],
        }));
        let norm = rules.normalize(native.clone(), &opts()).unwrap();
        let body = &norm.as_object().unwrap()["body"];
        assert_eq!(body.type_tag(), Some("FunctionDef.body"));
        assert_eq!(body.as_object().unwrap()["@role"], node(json!(["Function", "Body"])));
        assert_eq!(body.as_object().unwrap()["body_stmts"], native.as_object().unwrap()["body"]);
        assert_eq!(rules.denormalize(norm, &opts()).unwrap(), native);
    }

    #[test]
    fn unbound_template_variable_is_a_config_error() {
        let bad = map_ast(
            "Call",
            ObjectOp::new().field("func", Op::var("f")),
            ObjectOp::new().field("func", Op::var("g")),
            &[],
        );
        let err = RuleSet::new("bad", vec![bad]).unwrap_err();
        assert_eq!(err, ConfigError::UnboundVariable {
            rule: "map:Call".into(),
            direction: "normalize",
            var: "g".into(),
        });
    }

    #[test]
    fn reserved_key_on_native_side_is_a_config_error() {
        let bad = map_ast("Call", ObjectOp::new().field(KEY_TOKEN, Op::var("t")), ObjectOp::new()
            .field(KEY_TOKEN, Op::var("t")), &[]);
        assert!(matches!(
            RuleSet::new("bad", vec![bad]),
            Err(ConfigError::ReservedKey { key, .. }) if key == KEY_TOKEN
        ));
    }

    #[test]
    fn duplicate_type_key_is_a_config_error() {
        let bad = map_ast("Call", ObjectOp::new().field(KEY_TYPE, Op::is("Other")), ObjectOp::new(), &[]);
        assert!(matches!(
            RuleSet::new("bad", vec![bad]),
            Err(ConfigError::DuplicateField { field, .. }) if field == KEY_TYPE
        ));
    }

    #[test]
    fn construct_failure_names_rule_and_path() {
        // the template re-emits the rest, which already holds `@token`
        let clash = map_ast("Name", ObjectOp::new(), ObjectOp::new().field(KEY_TOKEN, Op::is("x")), &[]);
        let rules = RuleSet::new("clash", vec![clash]).unwrap();
        let native = node(json!({"body": [{"@type": "Name", "x": 1, "@token": "y"}]}));
        let err = rules.normalize(native, &opts()).unwrap_err();
        match err {
            Error::Rule { rule, path, source } => {
                assert_eq!(rule, "map:Name");
                assert_eq!(path, "/body/0");
                assert!(matches!(*source, Error::FieldCollision(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn depth_limit_applies_to_rule_walks() {
        let rules = binop_rules();
        let mut tree = node(json!({"@type": "Name", "id": "x"}));
        for _ in 0..20 {
            tree = Node::Sequence(vec![tree]);
        }
        let shallow = Options { max_depth: 8, ..Options::default() };
        assert!(matches!(rules.normalize(tree, &shallow), Err(Error::DepthExceeded { limit: 8, .. })));
    }
}
