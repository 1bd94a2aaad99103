//! Extension point for value conversions that the built-in ops can't say.
use std::fmt;

use super::Op;
use crate::error::{Error, Result};
use crate::node::{Node, Number};
use crate::state::State;

/// A user-supplied operator. Implementations must keep the round-trip
/// law: `construct` after a successful `check` reproduces the candidate.
/// The engine rolls bindings back when `check` returns `Ok(false)`.
pub trait CustomOp: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, st: &mut State, n: &Node) -> Result<bool>;

    fn construct(&self, st: &State) -> Result<Node>;

    /// Inner operators, for variable and field validation.
    fn operands(&self) -> Vec<&Op> {
        Vec::new()
    }
}

/// Which inner check [`Repeated`] runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckOrder {
    #[default]
    ConvertedFirst,
    OriginalFirst,
}

/// Largest count [`Repeated`] will expand unless told otherwise.
pub const DEFAULT_MAX_COUNT: usize = 1024;

/// A count re-expressed as a repeated symbol: `3` <-> `"..."`.
///
/// `check` takes the count, and both `text` (against the repeated string)
/// and `count` (against the count itself) must accept; if either rejects,
/// neither keeps its bindings. `construct` rebuilds the count from `count`,
/// or from `text` when `count` was never bound. Counts above `max_count`
/// are an `OperatorType` error.
#[derive(Debug, Clone)]
pub struct Repeated {
    pub symbol: char,
    pub text: Op,
    pub count: Op,
    pub order: CheckOrder,
    pub max_count: usize,
}

impl Repeated {
    pub fn new(symbol: char, text: Op, count: Op) -> Self {
        Self { symbol, text, count, order: CheckOrder::default(), max_count: DEFAULT_MAX_COUNT }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    /// Relative import level: number of leading dots.
    pub fn dots(text: Op, count: Op) -> Self {
        Self::new('.', text, count)
    }

    pub fn with_order(mut self, order: CheckOrder) -> Self {
        self.order = order;
        self
    }

    fn type_error(&self, expected: &'static str, got: &Node) -> Error {
        Error::OperatorType { op: self.name().to_string(), expected, got: got.to_string() }
    }

    fn count_of(&self, text: &Node) -> Result<i64> {
        match text.as_str() {
            Some(s) if s.chars().all(|c| c == self.symbol) => Ok(s.chars().count() as i64),
            _ => Err(self.type_error("a repeated symbol string", text)),
        }
    }
}

impl CustomOp for Repeated {
    fn name(&self) -> &str {
        "repeated"
    }

    fn check(&self, st: &mut State, n: &Node) -> Result<bool> {
        if !n.is_value() {
            return Ok(false);
        }
        let count = match n {
            Node::Number(Number::Int(i)) if *i >= 0 => *i as u64,
            Node::Number(Number::UInt(u)) => *u,
            other => return Err(self.type_error("a non-negative integer", other)),
        };
        let count = match usize::try_from(count) {
            Ok(count) if count <= self.max_count => count,
            _ => return Err(self.type_error("a count within the repeat limit", n)),
        };
        let text = Node::String(self.symbol.to_string().repeat(count));
        let cp = st.checkpoint();
        let ok = match self.order {
            CheckOrder::ConvertedFirst => self.text.check(st, &text)? && self.count.check(st, n)?,
            CheckOrder::OriginalFirst => self.count.check(st, n)? && self.text.check(st, &text)?,
        };
        if !ok {
            st.restore(cp);
        }
        Ok(ok)
    }

    fn construct(&self, st: &State) -> Result<Node> {
        let count = match self.count.construct(st) {
            Ok(Node::Number(Number::Int(i))) if i >= 0 => i,
            Ok(other) => return Err(self.type_error("a non-negative integer", &other)),
            Err(Error::UndefinedVariable(_)) => {
                let text = self.text.construct(st)?;
                return self.count_of(&text).map(Node::from);
            }
            Err(err) => return Err(err),
        };
        // when both sides are bound they have to agree
        match self.text.construct(st) {
            Ok(text) if self.count_of(&text)? != count => {
                Err(self.type_error("text consistent with the count", &text))
            }
            Ok(_) | Err(Error::UndefinedVariable(_)) => Ok(Node::from(count)),
            Err(err) => Err(err),
        }
    }

    fn operands(&self) -> Vec<&Op> {
        vec![&self.text, &self.count]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(order: CheckOrder) -> Op {
        Op::custom(Repeated::dots(Op::var("level"), Op::var("num")).with_order(order))
    }

    #[test]
    fn count_becomes_dots_and_back() {
        for order in [CheckOrder::ConvertedFirst, CheckOrder::OriginalFirst] {
            let op = level(order);
            let mut st = State::new();
            assert!(op.check(&mut st, &Node::from(3)).unwrap());
            assert_eq!(st.get("level"), Some(&Node::from("...")));
            assert_eq!(st.get("num"), Some(&Node::from(3)));
            assert_eq!(op.construct(&st).unwrap(), Node::from(3));
        }
    }

    #[test]
    fn zero_is_the_empty_string() {
        let op = level(CheckOrder::ConvertedFirst);
        let mut st = State::new();
        assert!(op.check(&mut st, &Node::from(0)).unwrap());
        assert_eq!(st.get("level"), Some(&Node::from("")));
        assert_eq!(op.construct(&st).unwrap(), Node::from(0));
    }

    #[test]
    fn dots_alone_reconstruct_the_count() {
        let op = level(CheckOrder::ConvertedFirst);
        let mut st = State::new();
        st.bind("level", Node::from("..."));
        assert_eq!(op.construct(&st).unwrap(), Node::from(3));
    }

    #[test]
    fn inconsistent_bindings_are_rejected() {
        let op = level(CheckOrder::ConvertedFirst);
        let mut st = State::new();
        st.bind("level", Node::from(".."));
        st.bind("num", Node::from(3));
        assert!(matches!(op.construct(&st), Err(Error::OperatorType { .. })));
    }

    #[test]
    fn non_numeric_value_is_a_type_error() {
        let op = level(CheckOrder::ConvertedFirst);
        let mut st = State::new();
        assert!(matches!(op.check(&mut st, &Node::from("2")), Err(Error::OperatorType { .. })));
        assert!(matches!(op.check(&mut st, &Node::from(-1)), Err(Error::OperatorType { .. })));
        assert!(!op.check(&mut st, &Node::Sequence(vec![])).unwrap());
    }

    #[test]
    fn huge_count_is_rejected_without_expanding() {
        let op = level(CheckOrder::ConvertedFirst);
        let mut st = State::new();
        assert!(matches!(op.check(&mut st, &Node::from(i64::MAX)), Err(Error::OperatorType { .. })));
        assert!(st.is_empty());

        let small = Op::custom(Repeated::dots(Op::var("level"), Op::var("num")).with_max_count(2));
        assert!(small.check(&mut st, &Node::from(2)).unwrap());
        let mut st = State::new();
        assert!(matches!(small.check(&mut st, &Node::from(3)), Err(Error::OperatorType { .. })));
    }

    #[test]
    fn failure_in_either_order_leaves_no_bindings() {
        // `num` pre-bound to a different count: the second inner check fails
        // in one order and the first fails in the other.
        for order in [CheckOrder::ConvertedFirst, CheckOrder::OriginalFirst] {
            let op = level(order);
            let mut st = State::new();
            st.bind("num", Node::from(2));
            assert!(!op.check(&mut st, &Node::from(3)).unwrap());
            assert_eq!(st.len(), 1);
            assert!(st.get("level").is_none());
        }
    }
}
