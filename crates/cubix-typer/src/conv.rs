//! Definitional equality and cumulativity.
//!
//! Terms are compared structurally after weak-head normalization. Comparison in
//! [`Cmp::Le`] mode additionally admits universe cumulativity and sub-classing of
//! class calls, in covariant positions only.

use cubix_core::{ClassCall, Expr, TypecheckerState, whnf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    Le,
}

pub fn convertible(state: &TypecheckerState, lhs: &Expr, rhs: &Expr, cmp: Cmp) -> bool {
    if lhs == rhs {
        return true;
    }

    let lhs = whnf(lhs);
    let rhs = whnf(rhs);
    match (&lhs, &rhs) {
        (Expr::Error, _) | (_, Expr::Error) => true,
        (Expr::Universe(a), Expr::Universe(b)) => match cmp {
            Cmp::Eq => a == b,
            Cmp::Le => a.leq(*b),
        },
        (Expr::Var(a), Expr::Var(b)) => a == b,
        (Expr::Def(a), Expr::Def(b)) => a == b,
        (
            Expr::Pi {
                domain: d1,
                codomain: c1,
                ..
            },
            Expr::Pi {
                domain: d2,
                codomain: c2,
                ..
            },
        ) => convertible(state, d1, d2, Cmp::Eq) && convertible(state, c1, c2, cmp),
        (Expr::Lam { body: b1, .. }, Expr::Lam { body: b2, .. }) => {
            convertible(state, b1, b2, Cmp::Eq)
        }
        (Expr::Lam { body, .. }, other) | (other, Expr::Lam { body, .. }) => {
            let eta = Expr::app(other.shift(1), [Expr::Var(0)]);
            convertible(state, body, &eta, Cmp::Eq)
        }
        (Expr::App(f1, a1), Expr::App(f2, a2)) => {
            convertible(state, f1, f2, Cmp::Eq) && convertible(state, a1, a2, Cmp::Eq)
        }
        (Expr::ClassCall(c1), Expr::ClassCall(c2)) => class_calls(state, c1, c2, cmp),
        (Expr::New(c1), Expr::New(c2)) => class_calls(state, c1, c2, Cmp::Eq),
        (Expr::Interval, Expr::Interval)
        | (Expr::Left, Expr::Left)
        | (Expr::Right, Expr::Right) => true,
        _ => false,
    }
}

/// `C1 {impls1} <= C2 {impls2}` if `C1` extends `C2` and implements at least what
/// `C2 {impls2}` implements, with equal implementations.
fn class_calls(state: &TypecheckerState, lhs: &ClassCall, rhs: &ClassCall, cmp: Cmp) -> bool {
    let classes_ok = match cmp {
        Cmp::Eq => {
            lhs.class == rhs.class && lhs.implementations.len() == rhs.implementations.len()
        }
        Cmp::Le => state.is_subclass(lhs.class, rhs.class),
    };

    classes_ok
        && rhs.implementations.iter().all(|(field, expr)| {
            lhs.implementation(*field)
                .is_some_and(|other| convertible(state, other, expr, Cmp::Eq))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubix_core::{ClassDef, DefId, Sort};

    #[test]
    fn universes_are_cumulative() {
        let state = TypecheckerState::new();
        let small = Expr::Universe(Sort::SET0);
        let big = Expr::Universe(Sort::set(1));
        assert!(convertible(&state, &small, &big, Cmp::Le));
        assert!(!convertible(&state, &big, &small, Cmp::Le));
        assert!(!convertible(&state, &small, &big, Cmp::Eq));
    }

    #[test]
    fn pi_domains_are_invariant() {
        let state = TypecheckerState::new();
        let a = Expr::pi("x", Expr::Universe(Sort::SET0), Expr::Universe(Sort::SET0));
        let b = Expr::pi("y", Expr::Universe(Sort::set(1)), Expr::Universe(Sort::set(1)));
        let c = Expr::pi("z", Expr::Universe(Sort::SET0), Expr::Universe(Sort::set(1)));
        assert!(!convertible(&state, &a, &b, Cmp::Le));
        assert!(convertible(&state, &a, &c, Cmp::Le));
    }

    #[test]
    fn beta_and_eta() {
        let state = TypecheckerState::new();
        let f = Expr::Def(DefId::from_raw(3));
        let redex = Expr::app(
            Expr::lam("x", Expr::Interval, Expr::Var(0)),
            [Expr::Left],
        );
        assert!(convertible(&state, &redex, &Expr::Left, Cmp::Eq));

        let eta = Expr::lam("x", Expr::Interval, Expr::app(f.clone(), [Expr::Var(0)]));
        assert!(convertible(&state, &eta, &f, Cmp::Eq));
    }

    #[test]
    fn subclasses_are_smaller() {
        let mut state = TypecheckerState::new();
        let (base, derived) = (DefId::from_raw(1), DefId::from_raw(2));
        state.record(ClassDef::new(base, "Base"));
        let mut class = ClassDef::new(derived, "Derived");
        class.super_classes.push(base);
        state.record(class);

        let base_call = Expr::class_call(base);
        let derived_call = Expr::class_call(derived);
        assert!(convertible(&state, &derived_call, &base_call, Cmp::Le));
        assert!(!convertible(&state, &base_call, &derived_call, Cmp::Le));
    }

    #[test]
    fn errors_convert_with_anything() {
        let state = TypecheckerState::new();
        assert!(convertible(&state, &Expr::Error, &Expr::Interval, Cmp::Eq));
    }
}
