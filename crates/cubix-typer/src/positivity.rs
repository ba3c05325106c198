//! Strict positivity of recursive occurrences and covariance of data parameters.

use cubix_core::{ConstructorDef, DefId, Definition, Expr, TypecheckerState};

/// What must only occur positively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'t> {
    /// The data types of a recursive group.
    Defs(&'t [DefId]),
    /// A local variable, by de Bruijn index.
    Var(usize),
}

impl Target<'_> {
    fn occurs_in(self, expr: &Expr) -> bool {
        match self {
            Target::Defs(ids) => expr.mentions_def(&mut |id| ids.contains(&id)),
            Target::Var(index) => expr.has_var(index),
        }
    }

    fn under(self, binders: usize) -> Self {
        match self {
            Target::Var(index) => Target::Var(index + binders),
            defs => defs,
        }
    }
}

/// Checks that `ty`, the type of a constructor parameter, mentions `target` only
/// strictly positively: never in the domain of a function type and, below a data
/// type, only in covariant arguments of that data type.
pub fn is_positive(state: &TypecheckerState, ty: &Expr, target: Target) -> bool {
    let mut ty = ty;
    let mut target = target;
    while let Expr::Pi {
        domain, codomain, ..
    } = ty
    {
        if target.occurs_in(domain) {
            return false;
        }
        ty = codomain;
        target = target.under(1);
    }

    let (head, args) = ty.spine();
    if args.is_empty() {
        return matches!(ty, Expr::Var(_) | Expr::Def(_)) || !target.occurs_in(ty);
    }

    match head {
        Expr::Def(id) => match state.get(*id) {
            Some(Definition::Data(data)) => args.iter().enumerate().all(|(i, arg)| {
                if data.is_covariant(i) {
                    is_positive_under_lambdas(state, arg, target)
                } else {
                    !target.occurs_in(arg)
                }
            }),
            _ => args.iter().all(|arg| !target.occurs_in(arg)),
        },
        Expr::Var(_) => args.iter().all(|arg| !target.occurs_in(arg)),
        _ => args.iter().all(|arg| !target.occurs_in(arg)) && is_positive(state, head, target),
    }
}

fn is_positive_under_lambdas(state: &TypecheckerState, expr: &Expr, target: Target) -> bool {
    match expr {
        Expr::Lam { domain, body, .. } => {
            !target.occurs_in(domain) && is_positive_under_lambdas(state, body, target.under(1))
        }
        _ => is_positive(state, expr, target),
    }
}

/// Computes which of the `params` parameters of a data type occur only positively in
/// its constructors.
///
/// Constructors defined by patterns, and constructors whose header failed, do not
/// constrain the result.
pub fn covariance(state: &TypecheckerState, params: usize, constructors: &[&ConstructorDef]) -> Vec<bool> {
    (0..params)
        .map(|i| {
            constructors
                .iter()
                .filter(|constructor| {
                    constructor.patterns.is_none() && constructor.status.header_is_ok()
                })
                .all(|constructor| {
                    constructor.params.iter().enumerate().all(|(j, binder)| {
                        is_positive(state, &binder.ty, Target::Var(params + j - 1 - i))
                    })
                })
        })
        .collect()
}
