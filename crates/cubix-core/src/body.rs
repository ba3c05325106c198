use crate::{DefId, Expr, Name};

#[derive(Debug, Clone, PartialEq)]
pub enum CorePattern {
    Var(Name),
    Con {
        constructor: DefId,
        args: Vec<CorePattern>,
    },
    Left,
    Right,
}

impl CorePattern {
    /// Number of variables bound by the pattern.
    pub fn binders(&self) -> usize {
        match self {
            CorePattern::Var(_) => 1,
            CorePattern::Con { args, .. } => args.iter().map(CorePattern::binders).sum(),
            CorePattern::Left | CorePattern::Right => 0,
        }
    }

    pub fn is_var(&self) -> bool {
        matches!(self, CorePattern::Var(_))
    }

    /// Returns true if every value matched by `other` is matched by `self`.
    pub fn covers(&self, other: &CorePattern) -> bool {
        match (self, other) {
            (CorePattern::Var(_), _) => true,
            (
                CorePattern::Con {
                    constructor: a,
                    args: xs,
                },
                CorePattern::Con {
                    constructor: b,
                    args: ys,
                },
            ) => a == b && xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| x.covers(y)),
            (CorePattern::Left, CorePattern::Left) | (CorePattern::Right, CorePattern::Right) => true,
            _ => false,
        }
    }
}

/// One clause of a pattern matching definition. An absent right-hand side marks an
/// absurd clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreClause {
    pub patterns: Vec<CorePattern>,
    pub rhs: Option<Expr>,
}

/// Clause table over the eliminated parameters (indices into the parameter telescope).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElimBody {
    pub eliminated: Vec<usize>,
    pub clauses: Vec<CoreClause>,
}

/// Elimination of an interval parameter: the values at the endpoints plus the clauses
/// handling everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalElim {
    pub left: Option<Expr>,
    pub right: Option<Expr>,
    pub otherwise: ElimBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A trivial case tree with a single leaf.
    Term(Expr),
    Elim(ElimBody),
    Interval(IntervalElim),
}

impl Body {
    pub fn is_interval(&self) -> bool {
        matches!(self, Body::Interval(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn con(id: u32, args: Vec<CorePattern>) -> CorePattern {
        CorePattern::Con {
            constructor: DefId::from_raw(id),
            args,
        }
    }

    #[test]
    fn variables_cover_everything() {
        let x = CorePattern::Var("x".into());
        assert!(x.covers(&con(1, vec![])));
        assert!(x.covers(&CorePattern::Left));
        assert!(!con(1, vec![]).covers(&x));
    }

    #[test]
    fn constructor_covering_is_structural() {
        let suc_x = con(2, vec![CorePattern::Var("x".into())]);
        let suc_zero = con(2, vec![con(1, vec![])]);
        assert!(suc_x.covers(&suc_zero));
        assert!(!suc_zero.covers(&suc_x));
        assert!(!con(1, vec![]).covers(&suc_zero));
    }

    #[test]
    fn binders_count_nested_variables() {
        let p = con(
            3,
            vec![
                CorePattern::Var("a".into()),
                con(2, vec![CorePattern::Var("b".into())]),
                CorePattern::Left,
            ],
        );
        assert_eq!(p.binders(), 2);
    }
}
