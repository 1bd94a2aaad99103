//! Conversion and configuration failures.
//!
//! A pattern mismatch is never an error: operators report it as `Ok(false)`
//! and the rule set falls through to the next rule.
use thiserror::Error;

use crate::node::Kind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure while converting one tree. Aborts the whole conversion.
#[derive(Debug, Error)]
pub enum Error {
    /// A template needs a variable that was never bound.
    #[error("variable `{0}` is not bound")]
    UndefinedVariable(String),

    #[error("operator `{op}` expected {expected}, got {got}")]
    OperatorType {
        op: String,
        expected: &'static str,
        got: String,
    },

    #[error("field `{0}` is produced twice")]
    FieldCollision(String),

    #[error("expected an object, got {0}")]
    ExpectedObject(String),

    #[error("unexpected {kind} for variable `{var}`")]
    UnexpectedKind { var: String, kind: Kind },

    #[error("native node at `{path}` already carries reserved key `{key}`")]
    ReservedKeyCollision { key: String, path: String },

    #[error("tree is nested deeper than {limit} levels at `{path}`")]
    DepthExceeded { limit: usize, path: String },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("rule `{rule}` failed at `{path}`: {source}")]
    Rule {
        rule: String,
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn in_rule(self, rule: &str, path: impl ToString) -> Self {
        Error::Rule {
            rule: rule.to_string(),
            path: path.to_string(),
            source: Box::new(self),
        }
    }

    pub fn in_stage(self, stage: impl Into<String>) -> Self {
        Error::Stage {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, below rule and stage context.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Rule { source, .. } | Error::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Rule set rejected while it is being assembled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("rule `{rule}` ({direction}) uses variable `{var}` that its pattern never binds")]
    UnboundVariable {
        rule: String,
        direction: &'static str,
        var: String,
    },

    #[error("rule `{rule}` names reserved key `{key}` on the native side")]
    ReservedKey { rule: String, key: String },

    #[error("rule `{rule}` declares field `{field}` more than once")]
    DuplicateField { rule: String, field: String },
}
