//! De Bruijn indexed core terms.
//!
//! `Var(0)` is the innermost binder. Substitution and shifting follow the usual
//! discipline: [`Expr::instantiate`] replaces the innermost variable of a binder body
//! and lowers the remaining free variables, [`Expr::shift`] lifts free variables over
//! newly introduced binders.

use indexmap::IndexMap;

use crate::{DefId, Sort};

pub type Name = String;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(usize),
    Def(DefId),
    Universe(Sort),
    Pi {
        name: Name,
        domain: Box<Expr>,
        codomain: Box<Expr>,
    },
    Lam {
        name: Name,
        domain: Box<Expr>,
        body: Box<Expr>,
    },
    App(Box<Expr>, Box<Expr>),
    ClassCall(ClassCall),
    /// An instance of a class call, all of whose fields are implemented.
    New(ClassCall),
    Interval,
    Left,
    Right,
    /// Stand-in for anything that failed to elaborate. Converts with every term.
    Error,
}

/// A class together with implementations of some of its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassCall {
    pub class: DefId,
    pub implementations: IndexMap<DefId, Expr>,
}

impl ClassCall {
    pub fn new(class: DefId) -> Self {
        Self {
            class,
            implementations: IndexMap::new(),
        }
    }

    pub fn implementation(&self, field: DefId) -> Option<&Expr> {
        self.implementations.get(&field)
    }

    fn map(&self, f: &mut impl FnMut(&Expr) -> Expr) -> Self {
        Self {
            class: self.class,
            implementations: self
                .implementations
                .iter()
                .map(|(field, expr)| (*field, f(expr)))
                .collect(),
        }
    }
}

impl Expr {
    pub fn pi(name: impl Into<Name>, domain: Expr, codomain: Expr) -> Self {
        Expr::Pi {
            name: name.into(),
            domain: Box::new(domain),
            codomain: Box::new(codomain),
        }
    }

    pub fn lam(name: impl Into<Name>, domain: Expr, body: Expr) -> Self {
        Expr::Lam {
            name: name.into(),
            domain: Box::new(domain),
            body: Box::new(body),
        }
    }

    pub fn app(head: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        args.into_iter()
            .fold(head, |f, arg| Expr::App(Box::new(f), Box::new(arg)))
    }

    pub fn class_call(class: DefId) -> Self {
        Expr::ClassCall(ClassCall::new(class))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Expr::Error)
    }

    /// Splits an application into its head and arguments.
    pub fn spine(&self) -> (&Expr, Vec<&Expr>) {
        let mut args = Vec::new();
        let mut head = self;
        while let Expr::App(f, arg) = head {
            args.push(arg.as_ref());
            head = f;
        }
        args.reverse();
        (head, args)
    }

    /// Rebuilds the term, replacing every free variable `Var(i)` (with `i >= depth` at
    /// the point of occurrence) by `f(i - depth, depth)`.
    fn map_free(&self, depth: usize, f: &mut impl FnMut(usize, usize) -> Expr) -> Expr {
        match self {
            Expr::Var(i) if *i >= depth => f(*i - depth, depth),
            Expr::Var(_)
            | Expr::Def(_)
            | Expr::Universe(_)
            | Expr::Interval
            | Expr::Left
            | Expr::Right
            | Expr::Error => self.clone(),
            Expr::Pi {
                name,
                domain,
                codomain,
            } => Expr::Pi {
                name: name.clone(),
                domain: Box::new(domain.map_free(depth, f)),
                codomain: Box::new(codomain.map_free(depth + 1, f)),
            },
            Expr::Lam { name, domain, body } => Expr::Lam {
                name: name.clone(),
                domain: Box::new(domain.map_free(depth, f)),
                body: Box::new(body.map_free(depth + 1, f)),
            },
            Expr::App(fun, arg) => Expr::App(
                Box::new(fun.map_free(depth, f)),
                Box::new(arg.map_free(depth, f)),
            ),
            Expr::ClassCall(call) => Expr::ClassCall(call.map(&mut |e| e.map_free(depth, f))),
            Expr::New(call) => Expr::New(call.map(&mut |e| e.map_free(depth, f))),
        }
    }

    pub fn shift(&self, amount: usize) -> Expr {
        if amount == 0 {
            return self.clone();
        }
        self.map_free(0, &mut |i, depth| Expr::Var(i + amount + depth))
    }

    /// Lifts the free variables at or above `cutoff` by `amount`.
    pub fn shift_above(&self, cutoff: usize, amount: usize) -> Expr {
        self.map_free(0, &mut |i, depth| {
            if i >= cutoff {
                Expr::Var(i + amount + depth)
            } else {
                Expr::Var(i + depth)
            }
        })
    }

    /// Substitutes `replacement` for `Var(0)` and lowers the other free variables.
    pub fn instantiate(&self, replacement: &Expr) -> Expr {
        self.map_free(0, &mut |i, depth| {
            if i == 0 {
                replacement.shift(depth)
            } else {
                Expr::Var(i - 1 + depth)
            }
        })
    }

    /// Substitutes a whole telescope at once: `args[0]` replaces the outermost of the
    /// `args.len()` innermost binders.
    pub fn instantiate_many(&self, args: &[Expr]) -> Expr {
        let n = args.len();
        if n == 0 {
            return self.clone();
        }
        self.map_free(0, &mut |i, depth| {
            if i < n {
                args[n - 1 - i].shift(depth)
            } else {
                Expr::Var(i - n + depth)
            }
        })
    }

    /// Lowers every free variable by `amount`, or returns `None` if one of the
    /// `amount` innermost variables occurs.
    pub fn unshift(&self, amount: usize) -> Option<Expr> {
        if self.has_vars_below(amount) {
            return None;
        }
        Some(self.map_free(0, &mut |i, depth| Expr::Var(i - amount + depth)))
    }

    pub fn has_var(&self, var: usize) -> bool {
        self.any_free(0, &mut |i| i == var)
    }

    fn has_vars_below(&self, bound: usize) -> bool {
        self.any_free(0, &mut |i| i < bound)
    }

    fn any_free(&self, depth: usize, p: &mut impl FnMut(usize) -> bool) -> bool {
        match self {
            Expr::Var(i) => *i >= depth && p(*i - depth),
            Expr::Def(_)
            | Expr::Universe(_)
            | Expr::Interval
            | Expr::Left
            | Expr::Right
            | Expr::Error => false,
            Expr::Pi {
                domain, codomain, ..
            } => domain.any_free(depth, p) || codomain.any_free(depth + 1, p),
            Expr::Lam { domain, body, .. } => {
                domain.any_free(depth, p) || body.any_free(depth + 1, p)
            }
            Expr::App(f, arg) => f.any_free(depth, p) || arg.any_free(depth, p),
            Expr::ClassCall(call) | Expr::New(call) => call
                .implementations
                .values()
                .any(|e| e.any_free(depth, p)),
        }
    }

    /// Returns true if a global satisfying `p` is referenced anywhere in the term.
    pub fn mentions_def(&self, p: &mut impl FnMut(DefId) -> bool) -> bool {
        match self {
            Expr::Def(id) => p(*id),
            Expr::Var(_)
            | Expr::Universe(_)
            | Expr::Interval
            | Expr::Left
            | Expr::Right
            | Expr::Error => false,
            Expr::Pi {
                domain, codomain, ..
            } => domain.mentions_def(p) || codomain.mentions_def(p),
            Expr::Lam { domain, body, .. } => domain.mentions_def(p) || body.mentions_def(p),
            Expr::App(f, arg) => f.mentions_def(p) || arg.mentions_def(p),
            Expr::ClassCall(call) | Expr::New(call) => {
                p(call.class) || call.implementations.values().any(|e| e.mentions_def(p))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binder {
    pub name: Name,
    pub ty: Expr,
}

impl Binder {
    pub fn new(name: impl Into<Name>, ty: Expr) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A sequence of binders, each type living in the context of the previous ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Telescope(pub Vec<Binder>);

impl Telescope {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, binder: Binder) {
        self.0.push(binder);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binder> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Binder> {
        self.0.get(index)
    }

    /// Closes `codomain` (which lives under all binders) into nested Pi types.
    pub fn pi(&self, codomain: Expr) -> Expr {
        self.0.iter().rev().fold(codomain, |acc, binder| {
            Expr::pi(binder.name.clone(), binder.ty.clone(), acc)
        })
    }

    /// References to the binders from a context that has `extra` further binders
    /// below the telescope, outermost first.
    pub fn vars(&self, extra: usize) -> Vec<Expr> {
        let n = self.len();
        (0..n).map(|i| Expr::Var(extra + n - 1 - i)).collect()
    }

    /// The types of the telescope with `args` substituted for its binders, suitable for
    /// checking arguments one at a time.
    pub fn instantiate_type(&self, index: usize, args: &[Expr]) -> Option<Expr> {
        let binder = self.0.get(index)?;
        Some(binder.ty.instantiate_many(args.get(..index)?))
    }
}

impl FromIterator<Binder> for Telescope {
    fn from_iter<T: IntoIterator<Item = Binder>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
