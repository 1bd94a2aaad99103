//! Engine options, loadable from JSON.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::path_de::{from_slice_with_path, from_str_with_path, PathError};

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Deepest nesting a walk will enter before giving up with
    /// `DepthExceeded`.
    pub max_depth: usize,
    /// Collapse repeated roles after the rule sets have run.
    pub dedup_roles: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, dedup_roles: true }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid options in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: PathError,
    },
}

impl Options {
    pub fn from_json_str(src: &str) -> Result<Self, PathError> {
        from_str_with_path(src)
    }

    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let display = path.display().to_string();
        let bytes = std::fs::read(path)
            .map_err(|source| OptionsError::Io { path: display.clone(), source })?;
        from_slice_with_path(&bytes).map_err(|source| OptionsError::Parse { path: display, source })
    }
}
