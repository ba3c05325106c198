use crate::{DefId, Expr};

/// Weak-head normal form.
///
/// Only beta reduction and the projection of an implemented field out of `New` are
/// performed; definitions are never unfolded.
pub fn whnf(expr: &Expr) -> Expr {
    match expr {
        Expr::App(f, arg) => match whnf(f) {
            Expr::Lam { body, .. } => whnf(&body.instantiate(arg)),
            Expr::Def(field) => match whnf(arg) {
                Expr::New(call) => match call.implementation(field) {
                    Some(implementation) => whnf(implementation),
                    None => Expr::app(Expr::Def(field), [Expr::New(call)]),
                },
                _ => Expr::app(Expr::Def(field), [arg.as_ref().clone()]),
            },
            f => Expr::App(Box::new(f), arg.clone()),
        },
        _ => expr.clone(),
    }
}

/// The global at the head of an application spine.
pub fn head_def(expr: &Expr) -> Option<DefId> {
    match expr {
        Expr::Def(id) => Some(*id),
        Expr::App(f, _) => head_def(f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassCall, Sort};

    #[test]
    fn beta_reduces_in_head_position() {
        let id = Expr::lam("x", Expr::Universe(Sort::SET0), Expr::Var(0));
        let nat = Expr::Def(DefId::from_raw(1));
        assert_eq!(whnf(&Expr::app(id, [nat.clone()])), nat);
    }

    #[test]
    fn projects_implemented_fields_from_new() {
        let field = DefId::from_raw(2);
        let mut call = ClassCall::new(DefId::from_raw(3));
        call.implementations
            .insert(field, Expr::Def(DefId::from_raw(4)));

        let projection = Expr::app(Expr::Def(field), [Expr::New(call)]);
        assert_eq!(whnf(&projection), Expr::Def(DefId::from_raw(4)));
    }

    #[test]
    fn stuck_applications_are_kept() {
        let stuck = Expr::app(Expr::Def(DefId::from_raw(2)), [Expr::Var(0)]);
        assert_eq!(whnf(&stuck), stuck);
        assert_eq!(head_def(&stuck), Some(DefId::from_raw(2)));
    }
}
