use std::fmt;
use std::str::FromStr;

macro_rules! roles {
    ($($name:ident),* $(,)?) => {
        /// Semantic tag attached to a normalized node, orthogonal to its type.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Role {
            $($name,)*
        }

        impl Role {
            pub const ALL: &'static [Role] = &[$(Role::$name,)*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Role::$name => stringify!($name),)*
                }
            }
        }

        impl FromStr for Role {
            type Err = UnknownRole;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($name) => Ok(Role::$name),)*
                    _ => Err(UnknownRole(s.to_string())),
                }
            }
        }
    };
}

roles! {
    Identifier, Qualified, Operator, Binary, Unary, Left, Right, Infix,
    Postfix, Bitwise, Boolean, Unsigned, LeftShift, RightShift, Or, Xor, And,
    Expression, Statement, Equal, Not, LessThan, LessThanOrEqual, GreaterThan,
    GreaterThanOrEqual, Identical, Contains, Increment, Decrement, Negative,
    Positive, Dereference, TakeAddress, File, Add, Substract, Multiply, Divide,
    Modulo, Package, Declaration, Import, Pathname, Alias, Function, Body,
    Name, Receiver, Argument, Value, ArgsList, Base, Implements, Instance,
    Subtype, Subpackage, Module, Friend, World, If, Condition, Then, Else,
    Switch, Case, Default, For, Initialization, Update, Iterator, While,
    DoWhile, Break, Continue, Goto, Block, Scope, Return, Try, Catch, Finally,
    Throw, Assert, Call, Callee, Positional, Noop, Literal, Byte, ByteString,
    Character, List, Map, Null, Number, Regexp, Set, String, Tuple, Type,
    Entry, Key, Primitive, Assignment, This, Comment, Documentation,
    Whitespace, Incomplete, Unannotated, Visibility, Annotation, Anonymous,
    Enumeration, Arithmetic, Relational, Variable, Callable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role `{}`", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(*role));
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("Frobnicate".parse::<Role>().is_err());
    }
}
