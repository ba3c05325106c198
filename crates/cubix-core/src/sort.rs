//! Universe levels and sorts.
//!
//! A [`Sort`] pairs a predicative level `p` with a homotopy level `h`. Homotopy level
//! `-1` is the impredicative `\Prop`, `0` are sets. Levels are either constants, the
//! level variables `lp`/`lh` of a polymorphic definition, or infinity.
//!
//! The join of two levels is partial: a variable only absorbs constants that are
//! known to be below every instantiation of it. Everything else that cannot be
//! compared is reported by the caller as an incompatible sort.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelVar {
    #[display("lp")]
    Lp,
    #[display("lh")]
    Lh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Const(i32),
    Var(LevelVar),
    Infinity,
}

impl Level {
    pub fn join(self, other: Level) -> Option<Level> {
        match (self, other) {
            (Level::Infinity, _) | (_, Level::Infinity) => Some(Level::Infinity),
            (Level::Const(a), Level::Const(b)) => Some(Level::Const(a.max(b))),
            (Level::Var(a), Level::Var(b)) => (a == b).then_some(Level::Var(a)),
            (Level::Var(v), Level::Const(c)) | (Level::Const(c), Level::Var(v)) => {
                (c <= 0).then_some(Level::Var(v))
            }
        }
    }

    pub fn leq(self, other: Level) -> bool {
        self.join(other) == Some(other)
    }

    pub fn succ(self) -> Level {
        match self {
            Level::Const(n) => Level::Const(n + 1),
            Level::Var(_) | Level::Infinity => Level::Infinity,
        }
    }

    pub fn is_infinity(self) -> bool {
        self == Level::Infinity
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Const(n) => write!(f, "{n}"),
            Level::Var(v) => write!(f, "{v}"),
            Level::Infinity => f.write_str("oo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    p: Level,
    h: Level,
}

impl Sort {
    pub const PROP: Sort = Sort {
        p: Level::Const(0),
        h: Level::Const(-1),
    };
    pub const SET0: Sort = Sort {
        p: Level::Const(0),
        h: Level::Const(0),
    };
    pub const STD: Sort = Sort {
        p: Level::Var(LevelVar::Lp),
        h: Level::Var(LevelVar::Lh),
    };

    /// Every sort with homotopy level `-1` is `\Prop`, whatever its predicative level.
    pub fn new(p: Level, h: Level) -> Self {
        if h == Level::Const(-1) {
            Self::PROP
        } else {
            Self { p, h }
        }
    }

    pub fn set(p: i32) -> Self {
        Self::new(Level::Const(p), Level::Const(0))
    }

    #[inline]
    pub fn p(self) -> Level {
        self.p
    }

    #[inline]
    pub fn h(self) -> Level {
        self.h
    }

    pub fn is_prop(self) -> bool {
        self.h == Level::Const(-1)
    }

    pub fn is_set(self) -> bool {
        self.h == Level::Const(0)
    }

    pub fn join(self, other: Sort) -> Option<Sort> {
        if self.is_prop() {
            return Some(other);
        }
        if other.is_prop() {
            return Some(self);
        }
        Some(Sort::new(self.p.join(other.p)?, self.h.join(other.h)?))
    }

    pub fn leq(self, other: Sort) -> bool {
        self.is_prop() || self.join(other) == Some(other)
    }

    /// The sort of the universe `\Type self`.
    pub fn succ(self) -> Sort {
        if self.is_prop() {
            Sort::SET0
        } else {
            Sort::new(self.p.succ(), self.h.succ())
        }
    }

    /// The sort of a Pi type whose domain lives in `domain` and codomain in `codomain`.
    ///
    /// Pi types into a proposition are propositions.
    pub fn pi(domain: Sort, codomain: Sort) -> Option<Sort> {
        if codomain.is_prop() {
            return Some(Sort::PROP);
        }
        if domain.is_prop() {
            return Some(codomain);
        }
        Some(Sort::new(domain.p.join(codomain.p)?, codomain.h))
    }

    pub fn with_p(self, p: Level) -> Sort {
        Sort::new(p, self.h)
    }

    pub fn with_h(self, h: Level) -> Sort {
        Sort::new(self.p, h)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.p, self.h) {
            (_, Level::Const(-1)) => f.write_str("\\Prop"),
            (Level::Const(p), Level::Const(0)) => write!(f, "\\Set{p}"),
            (Level::Const(p), Level::Infinity) => write!(f, "\\oo-Type{p}"),
            (Level::Const(p), Level::Const(h)) => write!(f, "\\{h}-Type{p}"),
            (p, h) => write!(f, "\\Type {p} {h}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p_level() -> impl Strategy<Value = Level> {
        prop_oneof![
            (0..4i32).prop_map(Level::Const),
            Just(Level::Var(LevelVar::Lp)),
            Just(Level::Infinity),
        ]
    }

    fn h_level() -> impl Strategy<Value = Level> {
        prop_oneof![
            (-1..4i32).prop_map(Level::Const),
            Just(Level::Var(LevelVar::Lh)),
            Just(Level::Infinity),
        ]
    }

    fn sort() -> impl Strategy<Value = Sort> {
        (p_level(), h_level()).prop_map(|(p, h)| Sort::new(p, h))
    }

    proptest! {
        #[test]
        fn join_is_commutative(a in sort(), b in sort()) {
            prop_assert_eq!(a.join(b), b.join(a));
        }

        #[test]
        fn join_is_idempotent(a in sort()) {
            prop_assert_eq!(a.join(a), Some(a));
        }

        #[test]
        fn join_is_associative_where_defined(a in sort(), b in sort(), c in sort()) {
            let left = a.join(b).and_then(|ab| ab.join(c));
            let right = b.join(c).and_then(|bc| a.join(bc));
            if let (Some(left), Some(right)) = (left, right) {
                prop_assert_eq!(left, right);
            }
        }

        #[test]
        fn prop_is_below_everything(a in sort()) {
            prop_assert!(Sort::PROP.leq(a));
            prop_assert_eq!(Sort::PROP.join(a), Some(a));
        }

        #[test]
        fn leq_is_reflexive(a in sort()) {
            prop_assert!(a.leq(a));
        }

        #[test]
        fn join_is_an_upper_bound(a in sort(), b in sort()) {
            if let Some(j) = a.join(b) {
                prop_assert!(a.leq(j));
                prop_assert!(b.leq(j));
            }
        }

        #[test]
        fn universe_is_above_its_sort(a in sort()) {
            prop_assert!(a.leq(a.succ()));
        }
    }

    #[test]
    fn variables_absorb_small_constants() {
        let lp = Level::Var(LevelVar::Lp);
        assert_eq!(lp.join(Level::Const(0)), Some(lp));
        assert_eq!(lp.join(Level::Const(1)), None);
        assert_eq!(lp.join(Level::Var(LevelVar::Lh)), None);
        assert_eq!(lp.join(Level::Infinity), Some(Level::Infinity));
    }

    #[test]
    fn truncated_universe_is_below_untruncated() {
        // \2-Type7 <= \oo-Type7, but \oo-Type7 does not fit into \2-Type7
        let truncated = Sort::new(Level::Const(7), Level::Const(2));
        let full = Sort::new(Level::Const(7), Level::Infinity);
        assert!(truncated.leq(full));
        assert!(!full.leq(truncated));
    }

    #[test]
    fn propositions_collapse() {
        let prop = Sort::new(Level::Const(5), Level::Const(-1));
        assert_eq!(prop, Sort::PROP);
        assert_eq!(prop.succ(), Sort::SET0);
    }

    #[test]
    fn pi_sorts() {
        assert_eq!(Sort::pi(Sort::set(1), Sort::PROP), Some(Sort::PROP));
        assert_eq!(Sort::pi(Sort::set(1), Sort::SET0), Some(Sort::set(1)));
        assert_eq!(
            Sort::pi(Sort::STD, Sort::set(2)),
            None,
            "lp cannot absorb a positive constant"
        );
    }

    #[test]
    fn display() {
        assert_eq!(Sort::PROP.to_string(), "\\Prop");
        assert_eq!(Sort::set(1).to_string(), "\\Set1");
        assert_eq!(
            Sort::new(Level::Const(7), Level::Const(2)).to_string(),
            "\\2-Type7"
        );
        assert_eq!(Sort::STD.to_string(), "\\Type lp lh");
    }
}
