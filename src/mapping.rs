//! Bidirectional mapping rules and the annotation vocabulary used to
//! write them.
//!
//! A [`Mapping`] holds a native-side op and a normalized-side op. Going
//! forward the native op is the pattern and the normalized op the
//! template; going backward the roles swap. The builders below produce
//! open-world rules: fields a rule does not mention travel through the
//! `@rest` variable untouched.
use std::fmt;

use crate::node::Node;
use crate::op::{ObjectOp, Op};
use crate::uast::{Role, KEY_ROLES, KEY_TOKEN, KEY_TYPE};

/// Variable that carries the fields a rule does not mention.
pub const REST: &str = "@rest";

/// Variable bound by each element scope of an array field.
pub const ITEM: &str = "item";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Native to normalized.
    Normalize,
    /// Normalized to native.
    Denormalize,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Normalize => "normalize",
            Direction::Denormalize => "denormalize",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Mapping {
    name: String,
    native: Op,
    norm: Op,
}

impl Mapping {
    pub fn new(name: impl Into<String>, native: Op, norm: Op) -> Self {
        Self { name: name.into(), native, norm }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn native(&self) -> &Op { &self.native }

    pub fn norm(&self) -> &Op { &self.norm }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The side that is checked when converting in `dir`.
    pub fn pattern(&self, dir: Direction) -> &Op {
        match dir {
            Direction::Normalize => &self.native,
            Direction::Denormalize => &self.norm,
        }
    }

    /// The side that is constructed when converting in `dir`.
    pub fn template(&self, dir: Direction) -> &Op {
        match dir {
            Direction::Normalize => &self.norm,
            Direction::Denormalize => &self.native,
        }
    }

    pub fn reverse(self) -> Self {
        Self { name: self.name, native: self.norm, norm: self.native }
    }

    /// Drop the open-world rest on both sides: nodes with fields the rule
    /// does not name will no longer match.
    pub fn exhaustive(self) -> Self {
        let close = |op: Op| match op {
            Op::Obj(obj) => Op::Obj(obj.exhaustive()),
            other => other,
        };
        Self { name: self.name, native: close(self.native), norm: close(self.norm) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FIELD ANNOTATIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default)]
struct FieldRole {
    rename: Option<String>,
    add: Option<Node>,
    roles: Vec<Role>,
    arr: bool,
    opt: bool,
}

/// Per-field declarations for [`annotate_type`], in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FieldRoles {
    fields: Vec<(String, FieldRole)>,
}

impl FieldRoles {
    pub fn new() -> Self { Self::default() }

    fn push(mut self, field: &str, role: FieldRole) -> Self {
        self.fields.push((field.to_string(), role));
        self
    }

    /// Move the field to another key on the normalized side.
    pub fn rename(self, field: &str, to: &str) -> Self {
        self.push(field, FieldRole { rename: Some(to.to_string()), ..Default::default() })
    }

    /// A literal that exists only on the normalized side.
    pub fn add(self, field: &str, literal: impl Into<Node>) -> Self {
        self.push(field, FieldRole { add: Some(literal.into()), ..Default::default() })
    }

    /// Append roles to the child node held by the field.
    pub fn roles(self, field: &str, roles: &[Role]) -> Self {
        self.push(field, FieldRole { roles: roles.to_vec(), ..Default::default() })
    }

    /// Append roles to every element of the sequence held by the field.
    pub fn arr(self, field: &str, roles: &[Role]) -> Self {
        self.push(field, FieldRole { roles: roles.to_vec(), arr: true, ..Default::default() })
    }

    /// Like [`roles`](Self::roles), for a field that may be absent.
    pub fn opt(self, field: &str, roles: &[Role]) -> Self {
        self.push(field, FieldRole { roles: roles.to_vec(), opt: true, ..Default::default() })
    }

    pub fn opt_arr(self, field: &str, roles: &[Role]) -> Self {
        self.push(field, FieldRole { roles: roles.to_vec(), arr: true, opt: true, ..Default::default() })
    }

    /// Native-side and normalized-side object ops for these fields.
    pub fn into_ops(self) -> (ObjectOp, ObjectOp) {
        let mut native = ObjectOp::new();
        let mut norm = ObjectOp::new();
        for (field, role) in self.fields {
            if let Some(lit) = role.add {
                norm.insert(field, Op::Is(lit));
                continue;
            }
            let (mut from, mut to) = if role.arr {
                (
                    Op::each(field.as_str(), Op::var(ITEM)),
                    Op::each(field.as_str(), Op::append_roles(Op::var(ITEM), &role.roles)),
                )
            } else {
                (Op::var(field.as_str()), Op::append_roles(Op::var(field.as_str()), &role.roles))
            };
            if role.opt {
                let exists = format!("{field}?");
                from = Op::opt(exists.as_str(), from);
                to = Op::opt(exists, to);
            }
            let target = role.rename.unwrap_or_else(|| field.clone());
            native.insert(field, from);
            norm.insert(target, to);
        }
        (native, norm)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

/// Type-preserving rule: both sides pin `@type` to `typ` and keep
/// unlisted fields; the normalized side also carries `roles`.
pub fn map_ast(typ: &str, native: ObjectOp, norm: ObjectOp, roles: &[Role]) -> Mapping {
    let native = ObjectOp::new()
        .field(KEY_TYPE, Op::is(typ))
        .merge(native)
        .with_rest(REST);
    let norm = ObjectOp::new()
        .field(KEY_TYPE, Op::is(typ))
        .field(KEY_ROLES, Op::roles(roles))
        .merge(norm)
        .with_rest(REST);
    Mapping::new(format!("map:{typ}"), Op::obj(native), Op::obj(norm))
}

pub fn annotate_type(typ: &str, fields: FieldRoles, roles: &[Role]) -> Mapping {
    let (native, norm) = fields.into_ops();
    map_ast(typ, native, norm, roles).named(format!("annotate:{typ}"))
}

/// Type annotated with a fixed token, e.g. `Add` with `+`.
pub fn annotate_type_token(typ: &str, token: &str, roles: &[Role]) -> Mapping {
    annotate_type(typ, FieldRoles::new().add(KEY_TOKEN, token), roles)
}

// ------------------------------- Tests ------------------------------------ //
