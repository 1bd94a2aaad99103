//! Python dialect: the driver's native AST to the normalized tree.
pub mod annotations;

use crate::error::ConfigError;
use crate::pipeline::Transforms;
use crate::preprocess::{ObjectToNode, ResponseMetadata};
use crate::rules::RuleSet;

/// Key the native parser wraps its root node in.
pub const ROOT_KEY: &str = "PY3AST";

pub fn object_to_node() -> ObjectToNode {
    ObjectToNode {
        internal_type_key: Some("ast_type".to_string()),
        line_key: Some("lineno".to_string()),
        column_key: Some("col_offset".to_string()),
        end_line_key: Some("end_lineno".to_string()),
        end_column_key: Some("end_col_offset".to_string()),
        ..ObjectToNode::default()
    }
}

pub fn transforms() -> Result<Transforms, ConfigError> {
    Ok(Transforms::builder("python")
        .preprocess(ResponseMetadata { top_level_is_root: false, root_key: ROOT_KEY.to_string() })
        .preprocess(object_to_node())
        .annotations(RuleSet::new("python", annotations::annotations())?)
        .dedup_roles(true)
        .build())
}

// ------------------------------- Tests ------------------------------------ //
