//! Full conversion pipeline for one language.
//!
//! normalize: preprocess stages → rule sets → role dedup → code transformers
//! denormalize: rule sets (reversed) → preprocess stages (reverted)
//!
//! A failing stage aborts the conversion; no partial tree is returned.
use std::fmt;

use tracing::{debug, debug_span};

use crate::config::Options;
use crate::dedup::dedup_roles;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::preprocess::Preprocess;
use crate::rules::RuleSet;

/// Post-normalization step that needs the original source text, such as
/// filling absolute offsets from line/column positions.
pub trait CodeTransformer: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn on_code(&self, code: &str, root: Node) -> Result<Node>;
}

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct Transforms {
    namespace: String,
    preprocess: Vec<Box<dyn Preprocess>>,
    annotations: Vec<RuleSet>,
    dedup_roles: bool,
    code: Vec<Box<dyn CodeTransformer>>,
    options: Options,
}

#[derive(Debug)]
pub struct TransformsBuilder {
    inner: Transforms,
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl TransformsBuilder {
    pub fn preprocess(mut self, stage: impl Preprocess + 'static) -> Self {
        self.inner.preprocess.push(Box::new(stage));
        self
    }

    pub fn annotations(mut self, rules: RuleSet) -> Self {
        self.inner.annotations.push(rules);
        self
    }

    pub fn dedup_roles(mut self, enabled: bool) -> Self {
        self.inner.dedup_roles = enabled;
        self
    }

    pub fn code(mut self, transformer: impl CodeTransformer + 'static) -> Self {
        self.inner.code.push(Box::new(transformer));
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.inner.options = options;
        self
    }

    pub fn build(self) -> Transforms {
        self.inner
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Transforms {
    pub fn builder(namespace: impl Into<String>) -> TransformsBuilder {
        TransformsBuilder {
            inner: Transforms {
                namespace: namespace.into(),
                preprocess: Vec::new(),
                annotations: Vec::new(),
                dedup_roles: true,
                code: Vec::new(),
                options: Options::default(),
            },
        }
    }

    pub fn namespace(&self) -> &str { &self.namespace }

    pub fn options(&self) -> &Options { &self.options }

    pub fn annotations(&self) -> &[RuleSet] { &self.annotations }

    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Native tree to normalized tree. Code transformers only run when the
    /// source text is supplied.
    pub fn normalize(&self, native: Node, code: Option<&str>) -> Result<Node> {
        let _span = debug_span!("normalize", namespace = %self.namespace).entered();
        let opts = &self.options;
        let mut root = native;
        for stage in &self.preprocess {
            root = stage.apply(root, opts).map_err(|e| e.in_stage(stage.name()))?;
            debug!(stage = stage.name(), "preprocess applied");
        }
        for rules in &self.annotations {
            root = rules.normalize(root, opts).map_err(|e| e.in_stage(rules.name()))?;
            debug!(stage = rules.name(), rules = rules.len(), "rule set applied");
        }
        if self.dedup_roles && opts.dedup_roles {
            root = dedup_roles(root, opts.max_depth).map_err(|e| e.in_stage("dedup-roles"))?;
        }
        match code {
            Some(code) => {
                for transformer in &self.code {
                    root = transformer.on_code(code, root)
                        .map_err(|e| e.in_stage(transformer.name()))?;
                    debug!(stage = transformer.name(), "code transformer applied");
                }
            }
            None if !self.code.is_empty() => {
                debug!(skipped = self.code.len(), "no source text, code transformers skipped");
            }
            None => {}
        }
        Ok(root)
    }

    /// Normalized tree back to the native tree.
    pub fn denormalize(&self, norm: Node) -> Result<Node> {
        let _span = debug_span!("denormalize", namespace = %self.namespace).entered();
        let opts = &self.options;
        let mut root = norm;
        for rules in self.annotations.iter().rev() {
            root = rules.denormalize(root, opts).map_err(|e| e.in_stage(rules.name()))?;
            debug!(stage = rules.name(), "rule set reverted");
        }
        for stage in self.preprocess.iter().rev() {
            root = stage.revert(root, opts).map_err(|e| e.in_stage(stage.name()))?;
            debug!(stage = stage.name(), "preprocess reverted");
        }
        Ok(root)
    }

    /// Normalize then denormalize; returns the normalized tree and the
    /// reconstructed native tree.
    pub fn round_trip(&self, native: Node, code: Option<&str>) -> Result<(Node, Node)> {
        let norm = self.normalize(native, code)?;
        let back = self.denormalize(norm.clone())?;
        Ok((norm, back))
    }
}

/// Stage name of a failure, if it came from the pipeline.
pub fn failed_stage(err: &Error) -> Option<&str> {
    match err {
        Error::Stage { stage, .. } => Some(stage),
        _ => None,
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{annotate_type, FieldRoles};
    use crate::preprocess::{ObjectToNode, ResponseMetadata};
    use crate::uast::{Role, KEY_POS, KEY_TOKEN};
    use serde_json::json;

    /// Stamps the source length on the root, standing in for offset filling.
    #[derive(Debug)]
    struct SourceLength;

    impl CodeTransformer for SourceLength {
        fn name(&self) -> &str { "source-length" }

        fn on_code(&self, code: &str, root: Node) -> Result<Node> {
            match root {
                Node::Object(mut m) => {
                    m.insert("source_len".into(), Node::from(code.len() as i64));
                    Ok(Node::Object(m))
                }
                other => Err(Error::ExpectedObject(other.to_string())),
            }
        }
    }

    fn pipeline() -> TransformsBuilder {
        Transforms::builder("test")
            .preprocess(ResponseMetadata { top_level_is_root: false, root_key: "AST".into() })
            .preprocess(ObjectToNode {
                internal_type_key: Some("kind".into()),
                line_key: Some("line".into()),
                column_key: Some("column".into()),
                ..Default::default()
            })
            .annotations(RuleSet::new("annotations", vec![
                annotate_type("Name", FieldRoles::new().rename("id", KEY_TOKEN), &[Role::Identifier]),
                annotate_type("Call", FieldRoles::new()
                    .roles("func", &[Role::Call, Role::Callee, Role::Identifier])
                    .arr("args", &[Role::Argument]), &[Role::Call]),
            ]).unwrap())
    }

    fn native() -> Node {
        Node::from(json!({"AST": {
            "kind": "Call", "line": 1, "column": 0,
            "func": {"kind": "Name", "id": "f", "line": 1, "column": 0},
            "args": [{"kind": "Name", "id": "x", "line": 1, "column": 2}],
        }}))
    }

    #[test]
    fn normalize_runs_every_stage_in_order() {
        let t = pipeline().build();
        let norm = t.normalize(native(), None).unwrap();
        let func = &norm.as_object().unwrap()["func"];
        // Identifier appears twice before dedup
        assert_eq!(func.as_object().unwrap()["@role"], Node::from(json!(["Identifier", "Call", "Callee"])));
        assert!(func.as_object().unwrap().contains_key(KEY_POS));
        assert_eq!(norm.type_tag(), Some("Call"));
    }

    #[test]
    fn denormalize_restores_the_response() {
        let t = pipeline().build();
        let (_, back) = t.round_trip(native(), None).unwrap();
        assert_eq!(back, native());
    }

    #[test]
    fn code_transformers_need_source() {
        let t = pipeline().code(SourceLength).build();
        let without = t.normalize(native(), None).unwrap();
        assert!(!without.as_object().unwrap().contains_key("source_len"));
        let with = t.normalize(native(), Some("f(x)")).unwrap();
        assert_eq!(with.as_object().unwrap()["source_len"], Node::from(4));
    }

    #[test]
    fn failing_stage_aborts_with_its_name() {
        let t = pipeline().build();
        let err = t.normalize(Node::from(json!({"a": 1, "b": 2})), None).unwrap_err();
        assert_eq!(failed_stage(&err), Some("response-metadata"));
        assert!(matches!(err.root_cause(), Error::MalformedInput(_)));
    }

    #[test]
    fn dedup_can_be_switched_off() {
        let t = pipeline()
            .options(Options { dedup_roles: false, ..Options::default() })
            .build();
        let norm = t.normalize(native(), None).unwrap();
        let func = &norm.as_object().unwrap()["func"];
        assert_eq!(
            func.as_object().unwrap()["@role"],
            Node::from(json!(["Identifier", "Call", "Callee", "Identifier"])),
        );
    }

    #[test]
    fn transforms_are_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Transforms>();
    }
}
