//! Bidirectional checking of concrete terms against the core language.

use cubix_core::{
    ClassCall, DefId, Definition, Expr, Sort, TypecheckerState, pretty_in, whnf,
};
use cubix_syntax::{FieldImpl, LamParam, Param, Program, Term};

use crate::{
    context::Context,
    conv::{Cmp, convertible},
    error::TypeError,
};

pub type CheckResult<T> = Result<T, TypeError>;

/// Elaborates concrete terms in a local context.
///
/// References to definitions whose header failed elaborate to [`Expr::Error`] and mark
/// the checker with a soft error instead of failing.
pub struct Checker<'a> {
    state: &'a TypecheckerState,
    program: &'a Program,
    pub ctx: Context,
    soft_errors: bool,
}

impl<'a> Checker<'a> {
    pub fn new(state: &'a TypecheckerState, program: &'a Program) -> Self {
        Self {
            state,
            program,
            ctx: Context::new(),
            soft_errors: false,
        }
    }

    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn state(&self) -> &'a TypecheckerState {
        self.state
    }

    pub fn has_soft_errors(&self) -> bool {
        self.soft_errors
    }

    pub fn mark_soft_error(&mut self) {
        self.soft_errors = true;
    }

    /// Renders `expr`, naming free variables after the current context.
    pub fn pretty(&self, expr: &Expr) -> String {
        pretty_in(expr, self.state, self.ctx.names())
    }

    fn global_name(&self, id: DefId) -> String {
        match self.state.get(id) {
            Some(def) => def.name().to_owned(),
            None => self
                .program
                .name(id)
                .map(str::to_owned)
                .unwrap_or_else(|| id.to_string()),
        }
    }

    /// Checks `term` against some universe, returning the type and its sort.
    pub fn check_type(&mut self, term: &Term) -> CheckResult<(Expr, Sort)> {
        let (expr, ty) = self.infer(term)?;
        match whnf(&ty) {
            Expr::Universe(sort) => Ok((expr, sort)),
            Expr::Error => Ok((expr, Sort::PROP)),
            other => Err(TypeError::NotAType(self.pretty(&other))),
        }
    }

    /// Elaborates a parameter telescope into the context, returning the sort of every
    /// bound variable's type.
    pub fn check_params(&mut self, params: &[Param]) -> CheckResult<Vec<Sort>> {
        let mut sorts = Vec::new();
        for param in params {
            let Some(ty) = &param.ty else {
                let name = param.names.first().cloned().unwrap_or_default();
                return Err(TypeError::UntypedParameter(name));
            };
            let (ty, sort) = self.check_type(ty)?;
            for (k, name) in param.names.iter().enumerate() {
                self.ctx.push(name.clone(), ty.shift(k));
                sorts.push(sort);
            }
        }
        Ok(sorts)
    }

    pub fn check(&mut self, term: &Term, expected: &Expr) -> CheckResult<Expr> {
        if let Term::Lam(params, body) = term {
            return self.check_lam(params, body, expected);
        }

        let (expr, actual) = self.infer(term)?;
        if convertible(self.state, &actual, expected, Cmp::Le) {
            Ok(expr)
        } else {
            Err(TypeError::Mismatch {
                expected: self.pretty(expected),
                actual: self.pretty(&actual),
            })
        }
    }

    fn check_lam(&mut self, params: &[LamParam], body: &Term, expected: &Expr) -> CheckResult<Expr> {
        let Some((param, rest)) = params.split_first() else {
            return self.check(body, expected);
        };

        let (domain, codomain) = match whnf(expected) {
            Expr::Pi {
                domain, codomain, ..
            } => (*domain, *codomain),
            Expr::Error => (Expr::Error, Expr::Error),
            other => return Err(TypeError::NotAFunction(self.pretty(&other))),
        };

        if let Some(ty) = &param.ty {
            let (annotated, _) = self.check_type(ty)?;
            if !convertible(self.state, &annotated, &domain, Cmp::Eq) {
                return Err(TypeError::Mismatch {
                    expected: self.pretty(&domain),
                    actual: self.pretty(&annotated),
                });
            }
        }

        let len = self.ctx.len();
        self.ctx.push(param.name.clone(), domain.clone());
        let body = self.check_lam(rest, body, &codomain);
        self.ctx.truncate(len);
        Ok(Expr::lam(param.name.clone(), domain, body?))
    }

    /// Infers the type of `term`, returning the elaborated term and its type.
    pub fn infer(&mut self, term: &Term) -> CheckResult<(Expr, Expr)> {
        match term {
            Term::Local(name) => self
                .ctx
                .lookup(name)
                .map(|(index, ty)| (Expr::Var(index), ty))
                .ok_or_else(|| TypeError::Unbound(name.clone())),
            Term::Global(id) => self.global(*id),
            Term::Universe(sort) => Ok((Expr::Universe(*sort), Expr::Universe(sort.succ()))),
            Term::Pi(params, codomain) => {
                let len = self.ctx.len();
                let result = self.infer_pi(params, codomain, len);
                self.ctx.truncate(len);
                result
            }
            Term::Lam(params, body) => {
                let len = self.ctx.len();
                let result = self.infer_lam(params, body, len);
                self.ctx.truncate(len);
                result
            }
            Term::App(head, args) => {
                let (mut expr, mut ty) = self.infer(head)?;
                for arg in args {
                    match whnf(&ty) {
                        Expr::Pi {
                            domain, codomain, ..
                        } => {
                            let arg = self.check(arg, &domain)?;
                            ty = codomain.instantiate(&arg);
                            expr = Expr::app(expr, [arg]);
                        }
                        Expr::Error => {
                            let (arg, _) = self.infer(arg)?;
                            expr = Expr::app(expr, [arg]);
                        }
                        other => return Err(TypeError::NotAFunction(self.pretty(&other))),
                    }
                }
                Ok((expr, ty))
            }
            Term::ClassExt(class, implementations) => {
                match self.class_ext(*class, implementations)? {
                    Some((call, sort)) => Ok((Expr::ClassCall(call), Expr::Universe(sort))),
                    None => Ok((Expr::Error, Expr::Error)),
                }
            }
            Term::Interval => Ok((Expr::Interval, Expr::Universe(Sort::SET0))),
            Term::Left => Ok((Expr::Left, Expr::Interval)),
            Term::Right => Ok((Expr::Right, Expr::Interval)),
        }
    }

    fn infer_pi(&mut self, params: &[Param], codomain: &Term, len: usize) -> CheckResult<(Expr, Expr)> {
        let sorts = self.check_params(params)?;
        let (codomain, codomain_sort) = self.check_type(codomain)?;
        let telescope = self.ctx.telescope_from(len);

        let mut sort = codomain_sort;
        for domain_sort in sorts.iter().rev() {
            sort = Sort::pi(*domain_sort, sort)
                .ok_or(TypeError::IncompatibleSorts(*domain_sort, sort))?;
        }
        Ok((telescope.pi(codomain), Expr::Universe(sort)))
    }

    fn infer_lam(&mut self, params: &[LamParam], body: &Term, len: usize) -> CheckResult<(Expr, Expr)> {
        for param in params {
            let Some(ty) = &param.ty else {
                return Err(TypeError::UntypedLambda(param.name.clone()));
            };
            let (ty, _) = self.check_type(ty)?;
            self.ctx.push(param.name.clone(), ty);
        }
        let (body, body_ty) = self.infer(body)?;
        let telescope = self.ctx.telescope_from(len);

        let lam = telescope
            .iter()
            .rev()
            .fold(body, |acc, binder| Expr::lam(binder.name.clone(), binder.ty.clone(), acc));
        Ok((lam, telescope.pi(body_ty)))
    }

    fn global(&mut self, id: DefId) -> CheckResult<(Expr, Expr)> {
        let state = self.state;
        let Some(def) = state.get(id) else {
            return Err(TypeError::NotTypechecked(self.global_name(id)));
        };
        if !def.status().header_is_ok() {
            self.soft_errors = true;
            return Ok((Expr::Error, Expr::Error));
        }

        match def {
            Definition::Class(_) | Definition::ClassSynonym(_) => {
                let class = state
                    .resolve_class(id)
                    .ok_or_else(|| TypeError::NotAClass(self.global_name(id)))?;
                Ok((Expr::class_call(class.id), Expr::Universe(class.sort)))
            }
            Definition::FieldSynonym(synonym) => self.global(synonym.underlying),
            _ => match state.type_of(id) {
                Some(ty) => Ok((Expr::Def(id), ty)),
                None => Err(TypeError::NotTypechecked(self.global_name(id))),
            },
        }
    }

    /// Elaborates a class extension `C { | f => e ... }`, checking each implementation
    /// against the field type instantiated with the partially built instance.
    ///
    /// Returns `None` if the class itself failed to elaborate.
    pub fn class_ext(
        &mut self,
        class: DefId,
        implementations: &[FieldImpl],
    ) -> CheckResult<Option<(ClassCall, Sort)>> {
        let state = self.state;
        let Some(def) = state.get(class) else {
            return Err(TypeError::NotTypechecked(self.global_name(class)));
        };
        if !def.status().header_is_ok() {
            self.soft_errors = true;
            return Ok(None);
        }
        let class_def = state
            .resolve_class(class)
            .ok_or_else(|| TypeError::NotAClass(self.global_name(class)))?;

        let mut call = ClassCall::new(class_def.id);
        for implementation in implementations {
            let field = state
                .resolve_field(implementation.field)
                .filter(|field| class_def.has_field(*field))
                .ok_or_else(|| TypeError::NotAField {
                    field: self.global_name(implementation.field),
                    class: class_def.name.clone(),
                })?;
            if class_def.is_implemented(field) || call.implementations.contains_key(&field) {
                return Err(TypeError::AlreadyImplemented(self.global_name(field)));
            }

            let Some(Definition::Field(field_def)) = state.get(field) else {
                return Err(TypeError::NotTypechecked(self.global_name(field)));
            };
            let term = if field_def.status.header_is_ok() {
                let expected = field_def.codomain().instantiate(&Expr::New(call.clone()));
                self.check(&implementation.term, &expected)?
            } else {
                self.soft_errors = true;
                Expr::Error
            };
            call.implementations.insert(field, term);
        }

        Ok(Some((call, class_def.sort)))
    }
}
