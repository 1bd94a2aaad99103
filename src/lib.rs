//! Bidirectional rewriting between a parser's native AST and a normalized
//! UAST.
//!
//! Rules are declared once as pairs of [`op::Op`]s and run in both
//! directions: the native side is matched and the normalized side built
//! when normalizing, and the other way around when denormalizing.
pub mod config;
pub mod dedup;
pub mod error;
pub mod mapping;
pub mod node;
pub mod op;
pub mod path_de;
pub mod pipeline;
pub mod preprocess;
pub mod python;
pub mod rules;
pub mod state;
pub mod uast;
pub mod walk;

pub use config::Options;
pub use error::{ConfigError, Error, Result};
pub use mapping::{annotate_type, annotate_type_token, map_ast, Direction, FieldRoles, Mapping};
pub use node::{Node, Number, Object};
pub use op::{ObjectOp, Op};
pub use pipeline::{CodeTransformer, Transforms};
pub use rules::RuleSet;
pub use state::State;
pub use uast::Role;
