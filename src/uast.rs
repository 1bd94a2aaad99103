//! Reserved keys and shared vocabulary of the normalized tree.
pub mod role;
pub mod pos;

pub use role::Role;
pub use pos::{Position, Positions};

/// Semantic node kind.
pub const KEY_TYPE: &str = "@type";
/// Role set, stored as a sequence of role names.
pub const KEY_ROLES: &str = "@role";
/// Literal surface text the node speaks as.
pub const KEY_TOKEN: &str = "@token";
/// Line/column positions.
pub const KEY_POS: &str = "@pos";

pub const RESERVED_KEYS: [&str; 4] = [KEY_TYPE, KEY_ROLES, KEY_TOKEN, KEY_POS];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}
