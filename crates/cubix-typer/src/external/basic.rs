use cubix_core::{
    Body, CoreClause, CorePattern, Definition, ElimBody, Expr, IntervalElim, Telescope,
    TypecheckerState, Binder, DefId, whnf,
};
use cubix_span::Located;
use cubix_syntax::Pattern;

use crate::{
    check::Checker,
    error::ElabError,
    external::{
        ConditionsChecker, ElimRequest, ElimTypechecker, MatchedPatterns, PatternOutcome,
        PatternTypechecker, TerminationChecker,
    },
};

/// Variables, constructors of non-pattern data types and interval endpoints.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPatterns;

impl PatternTypechecker for BasicPatterns {
    fn typecheck_patterns(
        &self,
        checker: &Checker,
        patterns: &[Pattern],
        telescope: &Telescope,
        previous: &[Vec<CorePattern>],
    ) -> PatternOutcome {
        if patterns.len() != telescope.len() {
            return PatternOutcome::Failed(ElabError::Pattern(format!(
                "expected {} patterns, got {}",
                telescope.len(),
                patterns.len()
            )));
        }

        let mut matcher = Matcher {
            state: checker.state(),
            bindings: Telescope::new(),
        };
        let mut cores = Vec::with_capacity(patterns.len());
        let mut exprs: Vec<At> = Vec::with_capacity(patterns.len());
        for (k, (pattern, binder)) in patterns.iter().zip(telescope.iter()).enumerate() {
            let depth = matcher.depth();
            let args: Vec<Expr> = exprs.iter().map(|e| e.at(depth)).collect();
            let ty = binder.ty.shift_above(k, depth).instantiate_many(&args);
            match matcher.pattern(pattern, ty) {
                Ok((core, expr)) => {
                    cores.push(core);
                    exprs.push(expr);
                }
                Err(err) => return PatternOutcome::Failed(err),
            }
        }

        let redundant = previous.iter().any(|row| {
            row.len() == cores.len() && row.iter().zip(&cores).all(|(p, q)| p.covers(q))
        });
        if redundant {
            return PatternOutcome::Redundant;
        }

        let depth = matcher.depth();
        PatternOutcome::Matched(MatchedPatterns {
            patterns: cores,
            bindings: matcher.bindings,
            exprs: exprs.iter().map(|e| e.at(depth)).collect(),
        })
    }
}

/// A term together with the number of pattern variables bound when it was built.
struct At {
    expr: Expr,
    depth: usize,
}

impl At {
    fn at(&self, depth: usize) -> Expr {
        self.expr.shift(depth - self.depth)
    }
}

struct Matcher<'s> {
    state: &'s TypecheckerState,
    bindings: Telescope,
}

impl Matcher<'_> {
    fn depth(&self) -> usize {
        self.bindings.len()
    }

    fn name(&self, id: DefId) -> String {
        self.state.name(id)
    }

    /// Matches `pattern` against `ty`, which lives in the context extended by the
    /// bindings so far.
    fn pattern(&mut self, pattern: &Pattern, ty: Expr) -> Result<(CorePattern, At), ElabError> {
        match pattern {
            Pattern::Var(name) => {
                self.bindings.push(Binder::new(name.clone(), ty));
                let depth = self.depth();
                Ok((CorePattern::Var(name.clone()), At {
                    expr: Expr::Var(0),
                    depth,
                }))
            }
            Pattern::Left | Pattern::Right => {
                if !matches!(whnf(&ty), Expr::Interval | Expr::Error) {
                    return Err(ElabError::Pattern(
                        "interval endpoints only match the interval".to_owned(),
                    ));
                }
                let (core, expr) = match pattern {
                    Pattern::Left => (CorePattern::Left, Expr::Left),
                    _ => (CorePattern::Right, Expr::Right),
                };
                Ok((core, At {
                    expr,
                    depth: self.depth(),
                }))
            }
            Pattern::Con(id, args) => self.constructor(*id, args, ty),
        }
    }

    fn constructor(&mut self, id: DefId, args: &[Pattern], ty: Expr) -> Result<(CorePattern, At), ElabError> {
        let state = self.state;
        let Some(Definition::Constructor(constructor)) = state.get(id) else {
            return Err(ElabError::Pattern(format!("`{}` is not a constructor", self.name(id))));
        };
        if !constructor.status.header_is_ok() {
            return Err(ElabError::Pattern(format!(
                "constructor `{}` has errors",
                constructor.name
            )));
        }
        if constructor.patterns.is_some() {
            return Err(ElabError::Pattern(format!(
                "cannot match on `{}`, its data type is defined by patterns",
                constructor.name
            )));
        }

        let ty = whnf(&ty);
        let (head, data_args) = ty.spine();
        if head != &Expr::Def(constructor.data) || data_args.len() != constructor.data_params.len() {
            return Err(ElabError::Pattern(format!(
                "`{}` is not a constructor of the matched type",
                constructor.name
            )));
        }
        if args.len() != constructor.params.len() {
            return Err(ElabError::Pattern(format!(
                "`{}` expects {} arguments, got {}",
                constructor.name,
                constructor.params.len(),
                args.len()
            )));
        }

        let start = self.depth();
        let data_args: Vec<Expr> = data_args.into_iter().cloned().collect();
        let mut cores = Vec::with_capacity(args.len());
        let mut exprs: Vec<At> = Vec::with_capacity(args.len());
        for (pattern, binder) in args.iter().zip(constructor.params.iter()) {
            let depth = self.depth();
            let subst: Vec<Expr> = data_args
                .iter()
                .map(|arg| arg.shift(depth - start))
                .chain(exprs.iter().map(|e| e.at(depth)))
                .collect();
            let (core, expr) = self.pattern(pattern, binder.ty.instantiate_many(&subst))?;
            cores.push(core);
            exprs.push(expr);
        }

        let depth = self.depth();
        let args = data_args
            .iter()
            .map(|arg| arg.shift(depth - start))
            .chain(exprs.iter().map(|e| e.at(depth)));
        Ok((
            CorePattern::Con {
                constructor: id,
                args: cores,
            },
            At {
                expr: Expr::app(Expr::Def(id), args),
                depth,
            },
        ))
    }
}

/// Compiles clauses into a clause table, checking top-level coverage of every
/// eliminated parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicElim;

impl ElimTypechecker for BasicElim {
    fn typecheck_elim(
        &self,
        checker: &mut Checker,
        patterns: &dyn PatternTypechecker,
        request: ElimRequest,
    ) -> Result<Body, Vec<Located<ElabError>>> {
        let ElimRequest {
            params,
            eliminated,
            clauses,
            expected,
            total,
        } = request;

        let mut errors = Vec::new();
        let mut rows: Vec<Vec<CorePattern>> = Vec::new();
        let mut core_clauses = Vec::new();
        for clause in clauses {
            if clause.patterns.len() != eliminated.len() {
                errors.push((
                    ElabError::Pattern(format!(
                        "expected {} patterns, got {}",
                        eliminated.len(),
                        clause.patterns.len()
                    )),
                    clause.loc,
                ));
                continue;
            }

            let full: Vec<Pattern> = params
                .iter()
                .enumerate()
                .map(|(i, binder)| match eliminated.iter().position(|e| *e == i) {
                    Some(k) => clause.patterns[k].clone(),
                    None => Pattern::Var(binder.name.clone()),
                })
                .collect();

            let matched = match patterns.typecheck_patterns(checker, &full, params, &rows) {
                PatternOutcome::Matched(matched) => matched,
                PatternOutcome::Redundant => {
                    errors.push((ElabError::RedundantClause, clause.loc));
                    continue;
                }
                PatternOutcome::Failed(err) => {
                    errors.push((err, clause.loc));
                    continue;
                }
            };

            let rhs = match &clause.rhs {
                Some(rhs) => {
                    let expected = expected
                        .shift_above(params.len(), matched.bindings.len())
                        .instantiate_many(&matched.exprs);
                    let len = checker.ctx.len();
                    checker.ctx.extend(&matched.bindings);
                    let result = checker.check(rhs, &expected);
                    checker.ctx.truncate(len);
                    match result {
                        Ok(rhs) => Some(rhs),
                        Err(err) => {
                            errors.push((ElabError::Body(err), clause.loc));
                            continue;
                        }
                    }
                }
                None => None,
            };

            core_clauses.push(CoreClause {
                patterns: eliminated
                    .iter()
                    .filter_map(|i| matched.patterns.get(*i).cloned())
                    .collect(),
                rhs,
            });
            rows.push(matched.patterns);
        }

        if total && errors.is_empty() {
            let state = checker.state();
            for (k, index) in eliminated.iter().enumerate() {
                let missing = missing_constructors(state, params, *index, &core_clauses, k);
                if !missing.is_empty() {
                    let loc = clauses.first().map(|c| c.loc).unwrap_or_default();
                    errors.push((ElabError::MissingClauses(missing), loc));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let matches_interval = core_clauses.iter().any(|clause| {
            clause
                .patterns
                .iter()
                .any(|p| matches!(p, CorePattern::Left | CorePattern::Right))
        });
        let eliminated = eliminated.to_vec();
        if !matches_interval {
            return Ok(Body::Elim(ElimBody {
                eliminated,
                clauses: core_clauses,
            }));
        }

        let mut left = None;
        let mut right = None;
        let mut otherwise = Vec::new();
        for clause in core_clauses {
            if left.is_none() && clause.patterns.contains(&CorePattern::Left) {
                left = clause.rhs;
            } else if right.is_none() && clause.patterns.contains(&CorePattern::Right) {
                right = clause.rhs;
            } else {
                otherwise.push(clause);
            }
        }
        Ok(Body::Interval(IntervalElim {
            left,
            right,
            otherwise: ElimBody {
                eliminated,
                clauses: otherwise,
            },
        }))
    }
}

/// Constructors of the type of parameter `index` that no clause matches at position
/// `k`. The endpoints `left` and `right` count as the constructors of the interval.
/// Empty if a clause matches with a variable or the type is neither a data type nor
/// the interval.
fn missing_constructors(
    state: &TypecheckerState,
    params: &Telescope,
    index: usize,
    clauses: &[CoreClause],
    k: usize,
) -> Vec<String> {
    let column: Vec<&CorePattern> = clauses.iter().filter_map(|c| c.patterns.get(k)).collect();
    if column.iter().any(|p| p.is_var()) {
        return Vec::new();
    }

    let Some(binder) = params.get(index) else {
        return Vec::new();
    };
    let ty = whnf(&binder.ty);
    if matches!(ty, Expr::Interval) {
        return [(CorePattern::Left, "left"), (CorePattern::Right, "right")]
            .into_iter()
            .filter(|(endpoint, _)| !column.contains(&endpoint))
            .map(|(_, name)| name.to_owned())
            .collect();
    }
    let (head, _) = ty.spine();
    let Expr::Def(data) = head else {
        return Vec::new();
    };
    let Some(Definition::Data(data)) = state.get(*data) else {
        return Vec::new();
    };

    data.constructors
        .iter()
        .filter(|c| {
            !column.iter().any(|p| {
                matches!(p, CorePattern::Con { constructor, .. } if constructor == *c)
            })
        })
        .map(|c| state.name(*c))
        .collect()
}

/// Accepts every body.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ConditionsChecker for AcceptAll {
    fn check_conditions(&self, _state: &TypecheckerState, _def: DefId, _body: &Body) -> bool {
        true
    }
}

impl TerminationChecker for AcceptAll {
    fn check_termination(
        &self,
        _state: &TypecheckerState,
        _def: DefId,
        _body: &Body,
        _group: &[DefId],
    ) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cubix_core::{ConstructorDef, DataDef, Sort, Status};
    use cubix_syntax::{Program, Term, build::*};

    fn id(n: u32) -> DefId {
        DefId::from_raw(n)
    }

    /// `Nat` with `zero` and `suc`, as recorded by the elaborator.
    fn nat_state() -> TypecheckerState {
        let mut state = TypecheckerState::new();
        let mut nat = DataDef::new(id(0), "Nat");
        nat.sort = Some(Sort::SET0);
        nat.constructors = vec![id(1), id(2)];
        nat.covariant = Vec::new();
        nat.status = Status::NoErrors;
        state.record(nat);
        for (n, name, params) in [
            (1, "zero", Telescope::new()),
            (2, "suc", Telescope(vec![Binder::new("n", Expr::Def(id(0)))])),
        ] {
            state.record(ConstructorDef {
                id: id(n),
                name: name.into(),
                status: Status::NoErrors,
                data: id(0),
                data_params: Telescope::new(),
                data_args: Vec::new(),
                patterns: None,
                params,
                body: None,
            });
        }
        state
    }

    fn nat_telescope() -> Telescope {
        Telescope(vec![Binder::new("n", Expr::Def(id(0)))])
    }

    #[test]
    fn constructor_patterns_bind_variables() {
        let state = nat_state();
        let program = Program::new();
        let checker = Checker::new(&state, &program);

        let outcome = BasicPatterns.typecheck_patterns(
            &checker,
            &[pcon(id(2), vec![pvar("m")])],
            &nat_telescope(),
            &[],
        );
        let PatternOutcome::Matched(matched) = outcome else {
            panic!("expected a match, got {outcome:?}");
        };
        assert_eq!(matched.bindings.len(), 1);
        assert_eq!(matched.bindings.0[0].ty, Expr::Def(id(0)));
        assert_eq!(matched.exprs, vec![Expr::app(Expr::Def(id(2)), [Expr::Var(0)])]);
    }

    #[test]
    fn covered_rows_are_redundant() {
        let state = nat_state();
        let program = Program::new();
        let checker = Checker::new(&state, &program);

        let previous = vec![vec![CorePattern::Var("n".into())]];
        let outcome =
            BasicPatterns.typecheck_patterns(&checker, &[pcon(id(1), vec![])], &nat_telescope(), &previous);
        assert_eq!(outcome, PatternOutcome::Redundant);
    }

    #[test]
    fn elim_reports_missing_constructors() {
        let state = nat_state();
        let program = Program::new();
        let mut checker = Checker::new(&state, &program);

        let params = nat_telescope();
        let clauses = [clause(vec![pcon(id(1), vec![])], global(id(1)))];
        let errors = BasicElim
            .typecheck_elim(&mut checker, &BasicPatterns, ElimRequest {
                params: &params,
                eliminated: &[0],
                clauses: &clauses,
                expected: &Expr::Def(id(0)),
                total: true,
            })
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ElabError::MissingClauses(vec!["suc".into()]));
    }

    #[test]
    fn elim_checks_right_hand_sides_under_patterns() {
        let state = nat_state();
        let program = Program::new();
        let mut checker = Checker::new(&state, &program);

        let params = nat_telescope();
        let clauses = [
            clause(vec![pcon(id(1), vec![])], global(id(1))),
            clause(vec![pcon(id(2), vec![pvar("m")])], local("m")),
        ];
        let body = BasicElim
            .typecheck_elim(&mut checker, &BasicPatterns, ElimRequest {
                params: &params,
                eliminated: &[0],
                clauses: &clauses,
                expected: &Expr::Def(id(0)),
                total: true,
            })
            .unwrap();
        let Body::Elim(elim) = body else {
            panic!("expected a clause table");
        };
        assert_eq!(elim.clauses.len(), 2);
        assert_eq!(elim.clauses[1].rhs, Some(Expr::Var(0)));
        assert!(checker.ctx.is_empty());
    }

    #[test]
    fn endpoint_clauses_build_interval_elims() {
        let state = nat_state();
        let program = Program::new();
        let mut checker = Checker::new(&state, &program);

        let params = Telescope(vec![Binder::new("i", Expr::Interval)]);
        let clauses = [
            clause(vec![Pattern::Left], global(id(1))),
            clause(vec![Pattern::Right], global(id(1))),
        ];
        let body = BasicElim
            .typecheck_elim(&mut checker, &BasicPatterns, ElimRequest {
                params: &params,
                eliminated: &[0],
                clauses: &clauses,
                expected: &Expr::Def(id(0)),
                total: false,
            })
            .unwrap();
        assert!(body.is_interval());
    }

    #[test]
    fn elim_reports_missing_endpoints() {
        let state = nat_state();
        let program = Program::new();
        let mut checker = Checker::new(&state, &program);

        let params = Telescope(vec![Binder::new("i", Expr::Interval)]);
        let clauses = [clause(vec![Pattern::Left], Term::Left)];
        let errors = BasicElim
            .typecheck_elim(&mut checker, &BasicPatterns, ElimRequest {
                params: &params,
                eliminated: &[0],
                clauses: &clauses,
                expected: &Expr::Interval,
                total: true,
            })
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, ElabError::MissingClauses(vec!["right".into()]));
    }

    #[test]
    fn variables_cover_both_endpoints() {
        let state = nat_state();
        let program = Program::new();
        let mut checker = Checker::new(&state, &program);

        let params = Telescope(vec![Binder::new("i", Expr::Interval)]);
        let clauses = [
            clause(vec![Pattern::Left], Term::Left),
            clause(vec![pvar("j")], local("j")),
        ];
        let body = BasicElim.typecheck_elim(&mut checker, &BasicPatterns, ElimRequest {
            params: &params,
            eliminated: &[0],
            clauses: &clauses,
            expected: &Expr::Interval,
            total: true,
        });
        assert!(body.is_ok(), "{body:?}");
    }
}
