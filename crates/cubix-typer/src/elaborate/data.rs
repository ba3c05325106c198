use cubix_core::{
    Body, ConstructorDef, CorePattern, DataDef, DefId, Definition, Expr, Level, Sort, Status,
    Telescope, whnf,
};
use cubix_span::Loc;
use cubix_syntax::{ConcreteDef, ConstructorDecl, DataDecl, Pattern};
use log::debug;

use crate::{
    check::Checker,
    context::Context,
    elaborate::{Elaborator, Phase},
    error::{ElabError, ElabWarning, TypeError},
    external::{ElimRequest, PatternOutcome},
    positivity::{Target, covariance, is_positive},
};

/// The context a clause of constructors lives in.
struct ClauseScope {
    ctx: Context,
    data_args: Vec<Expr>,
    patterns: Option<Vec<CorePattern>>,
}

impl<'a> Elaborator<'a> {
    pub(super) fn data_header(&mut self, def: &'a ConcreteDef, decl: &'a DataDecl, in_group: bool) {
        let mut data = DataDef::new(def.id, &def.name);
        let mut checker = Checker::new(&*self.state, self.program);

        let mut header_ok = match checker.check_params(&decl.params) {
            Ok(_) => true,
            Err(err) => {
                self.reporter.error(Phase::Header.wrap(err), def.loc);
                false
            }
        };
        data.params = checker.ctx.telescope_from(0);

        if header_ok && let Some(universe) = &decl.universe {
            match checker.infer(universe) {
                Ok((expr, _)) => match whnf(&expr) {
                    Expr::Universe(sort) => data.sort = Some(sort),
                    Expr::Error => {}
                    _ => self.reporter.error(ElabError::ExpectedUniverse, def.loc),
                },
                Err(err) => self.reporter.error(Phase::Header.wrap(err), def.loc),
            }
        }
        let soft = checker.has_soft_errors();

        if header_ok && in_group && data.sort.is_none_or(|sort| sort.p().is_infinity()) {
            self.reporter.error(ElabError::RecursiveDataSort, def.loc);
            header_ok = false;
        }

        self.mark_soft(def.id, soft);
        data.status = Status::after_header(header_ok);
        if !header_ok {
            for constructor in decl.constructors() {
                self.record_constructor_stub(constructor, def.id);
            }
        }
        self.state.record(data);
    }

    fn record_constructor_stub(&mut self, decl: &ConstructorDecl, data: DefId) {
        self.state.record(ConstructorDef {
            id: decl.id,
            name: decl.name.clone(),
            status: Status::HeaderHasErrors,
            data,
            data_params: Telescope::new(),
            data_args: Vec::new(),
            patterns: None,
            params: Telescope::new(),
            body: None,
        });
    }

    /// Elaborates the constructors of a data type. `recursion` are the data types of
    /// the group, whose occurrences in constructor parameters must be strictly
    /// positive.
    pub(super) fn data_body(&mut self, def: &'a ConcreteDef, decl: &'a DataDecl, recursion: &[DefId]) {
        let Some(Definition::Data(data)) = self.state.get(def.id) else {
            self.reporter.error(
                ElabError::Internal(format!("header of `{}` is missing", def.name)),
                def.loc,
            );
            return;
        };
        if !data.status.header_is_ok() || data.status.is_terminal() {
            return;
        }
        let mut data = data.clone();
        let user_sort = data.sort;
        let errors_before = self.reporter.errors();
        let mut data_ok = true;

        // Start from the finite levels of the declared universe.
        let mut inferred = match user_sort {
            Some(user) => {
                let p = Some(user.p()).filter(|p| !p.is_infinity()).unwrap_or(Level::Const(0));
                let h = Some(user.h()).filter(|h| !h.is_infinity()).unwrap_or(Level::Const(-1));
                Sort::new(p, h)
            }
            None => Sort::PROP,
        };
        // Constructors may refer to the data type while its sort is still unknown.
        data.sort = Some(inferred);
        self.state.record(data.clone());

        if decl.constructors().count() > 1 {
            inferred = inferred.join(Sort::SET0).unwrap_or(inferred);
        }

        let indices = match &decl.eliminated {
            Some(names) => {
                let indices = self.eliminated(names, &data.params, def.loc);
                data_ok &= indices.is_some();
                indices
            }
            None => None,
        };

        let mut rows: Vec<Vec<CorePattern>> = Vec::new();
        let mut constructors = Vec::new();
        for clause in &decl.clauses {
            let scope = match (&clause.patterns, &decl.eliminated) {
                (Some(_), None) => {
                    self.reporter.error(ElabError::UnexpectedPatterns, clause.loc);
                    data_ok = false;
                    None
                }
                (None, Some(_)) => {
                    self.reporter.error(ElabError::ExpectedPatterns, clause.loc);
                    data_ok = false;
                    Some(ClauseScope {
                        ctx: Context::from_telescope(&data.params),
                        data_args: data.params.vars(0),
                        patterns: None,
                    })
                }
                (None, None) => Some(ClauseScope {
                    ctx: Context::from_telescope(&data.params),
                    data_args: data.params.vars(0),
                    patterns: None,
                }),
                (Some(patterns), Some(_)) => match &indices {
                    Some(indices) => {
                        let scope = self.clause_scope(&data.params, indices, patterns, &rows, clause.loc);
                        if let Some(scope) = &scope
                            && let Some(row) = &scope.patterns
                        {
                            rows.push(row.clone());
                        }
                        scope
                    }
                    None => None,
                },
            };

            for constructor in &clause.constructors {
                constructors.push(constructor.id);
                let Some(scope) = &scope else {
                    self.record_constructor_stub(constructor, def.id);
                    continue;
                };
                match self.constructor(&data, constructor, scope, user_sort, decl.truncated, recursion) {
                    Some(sort) => match inferred.join(sort) {
                        Some(joined) => inferred = joined,
                        None => {
                            self.reporter
                                .error(ElabError::IncompatibleSorts(inferred, sort), constructor.loc);
                            data_ok = false;
                        }
                    },
                    None => data_ok = false,
                }
            }
        }
        data.constructors = constructors;

        let elaborated: Vec<ConstructorDef> = data
            .constructors
            .iter()
            .filter_map(|id| self.state.get(*id)?.as_constructor().cloned())
            .collect();
        if elaborated
            .iter()
            .any(|c| c.body.as_ref().is_some_and(Body::is_interval))
        {
            data.matches_on_interval = true;
            inferred = inferred.with_h(Level::Infinity);
        }
        // Greatest fixpoint, so that recursive occurrences may pass a parameter on.
        let refs: Vec<&ConstructorDef> = elaborated.iter().collect();
        data.covariant = vec![true; data.params.len()];
        loop {
            self.state.record(data.clone());
            let next = covariance(self.state, data.params.len(), &refs);
            if next == data.covariant {
                break;
            }
            data.covariant = next;
        }

        if decl.truncated {
            match user_sort {
                None => self
                    .reporter
                    .warning(ElabWarning::TruncationWithoutUniverse, def.loc),
                Some(user) if inferred.leq(user) => self
                    .reporter
                    .warning(ElabWarning::TruncationNotNeeded, def.loc),
                Some(_) => data.truncated = true,
            }
        } else if self.reporter.errors() == errors_before
            && let Some(user) = user_sort
            && !inferred.leq(user)
        {
            self.reporter.error(
                ElabError::UniverseMismatch {
                    actual: inferred,
                    expected: user,
                },
                def.loc,
            );
        }

        let has_errors = self.reporter.errors() > errors_before;
        data.sort = match user_sort {
            Some(user) if !has_errors => Some(user),
            _ => Some(inferred),
        };
        data.status = if !data_ok || has_errors {
            Status::BodyHasErrors
        } else {
            Status::after_body(true, self.is_soft(def))
        };

        debug!("data {} is {} in {:?}", def.name, data.status, data.sort);
        self.state.record(data);
    }

    /// Typechecks the patterns of a constructor clause against the data parameters.
    fn clause_scope(
        &mut self,
        params: &Telescope,
        indices: &[usize],
        patterns: &[Pattern],
        rows: &[Vec<CorePattern>],
        loc: Loc,
    ) -> Option<ClauseScope> {
        if patterns.len() != indices.len() {
            self.reporter.error(
                ElabError::Pattern(format!(
                    "expected {} patterns, got {}",
                    indices.len(),
                    patterns.len()
                )),
                loc,
            );
            return None;
        }

        let full: Vec<Pattern> = params
            .iter()
            .enumerate()
            .map(|(i, binder)| match indices.iter().position(|index| *index == i) {
                Some(k) => patterns[k].clone(),
                None => Pattern::Var(binder.name.clone()),
            })
            .collect();

        let checker = Checker::new(&*self.state, self.program);
        match self
            .externals
            .patterns
            .typecheck_patterns(&checker, &full, params, rows)
        {
            PatternOutcome::Matched(matched) => Some(ClauseScope {
                ctx: Context::from_telescope(&matched.bindings),
                data_args: matched.exprs,
                patterns: Some(matched.patterns),
            }),
            PatternOutcome::Redundant => {
                self.reporter.error(ElabError::RedundantClause, loc);
                None
            }
            PatternOutcome::Failed(err) => {
                self.reporter.error(err, loc);
                None
            }
        }
    }

    /// Elaborates one constructor and returns the sort of its parameters, or `None` if
    /// the constructor could not be recorded with a valid type.
    fn constructor(
        &mut self,
        data: &DataDef,
        decl: &ConstructorDecl,
        scope: &ClauseScope,
        user_sort: Option<Sort>,
        truncated: bool,
        recursion: &[DefId],
    ) -> Option<Sort> {
        let mut checker =
            Checker::new(&*self.state, self.program).with_context(scope.ctx.clone());
        let start = checker.ctx.len();
        let outcome = checker.check_params(&decl.params);
        let params = checker.ctx.telescope_from(start);
        let mut soft = checker.has_soft_errors();

        let mut constructor = ConstructorDef {
            id: decl.id,
            name: decl.name.clone(),
            status: Status::HeaderHasErrors,
            data: data.id,
            data_params: scope.ctx.telescope_from(0),
            data_args: scope.data_args.clone(),
            patterns: scope.patterns.clone(),
            params,
            body: None,
        };

        let sorts = match outcome {
            Ok(sorts) => sorts,
            Err(err) => {
                self.reporter.error(Phase::Body.wrap(err), decl.loc);
                constructor.params = Telescope::new();
                self.state.record(constructor);
                return None;
            }
        };

        if let Some(user) = user_sort
            && !truncated
            && let Some(sort) = sorts.iter().find(|sort| !sort.leq(user))
        {
            self.reporter.error(
                ElabError::Body(TypeError::SortTooLarge {
                    expected: user,
                    actual: *sort,
                }),
                decl.loc,
            );
        }

        let non_positive = constructor
            .params
            .iter()
            .find(|binder| !is_positive(self.state, &binder.ty, Target::Defs(recursion)))
            .cloned();
        if let Some(binder) = non_positive {
            self.reporter.error(
                ElabError::NonPositive {
                    data: data.name.clone(),
                    constructor: decl.name.clone(),
                    parameter: binder.name.clone(),
                },
                decl.loc,
            );
            self.state.record(constructor);
            return None;
        }

        let mut sort = Sort::PROP;
        for param_sort in sorts {
            match sort.join(param_sort) {
                Some(joined) => sort = joined,
                None => {
                    self.reporter
                        .error(ElabError::IncompatibleSorts(sort, param_sort), decl.loc);
                }
            }
        }

        constructor.status = Status::BodyNeedsTypechecking;
        self.state.record(constructor.clone());

        if !decl.clauses.is_empty() {
            match self.eliminated(&decl.eliminated, &constructor.params, decl.loc) {
                Some(indices) => {
                    let expected = Expr::app(
                        Expr::Def(data.id),
                        scope
                            .data_args
                            .iter()
                            .map(|arg| arg.shift(constructor.params.len())),
                    );
                    let mut outer =
                        Checker::new(&*self.state, self.program).with_context(scope.ctx.clone());
                    let request = ElimRequest {
                        params: &constructor.params,
                        eliminated: &indices,
                        clauses: &decl.clauses,
                        expected: &expected,
                        total: false,
                    };
                    let body = self.externals.elim.typecheck_elim(
                        &mut outer,
                        &*self.externals.patterns,
                        request,
                    );
                    soft |= outer.has_soft_errors();
                    match body {
                        Ok(body) => {
                            if !self
                                .externals
                                .conditions
                                .check_conditions(self.state, decl.id, &body)
                            {
                                self.reporter
                                    .error(ElabError::Conditions(decl.name.clone()), decl.loc);
                                soft = true;
                            }
                            constructor.body = Some(body);
                        }
                        Err(errors) => {
                            for (err, loc) in errors {
                                self.reporter.error(err, loc);
                            }
                        }
                    }
                }
                None => {}
            }
        }

        self.mark_soft(data.id, soft);
        constructor.status = Status::after_body(true, soft);
        self.state.record(constructor);
        Some(sort)
    }
}
