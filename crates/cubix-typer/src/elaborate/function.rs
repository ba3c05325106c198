use cubix_core::{Body, DefId, Definition, FunctionDef, Status};
use cubix_syntax::{ConcreteDef, FunctionBody, FunctionDecl};
use log::debug;

use crate::{
    check::Checker,
    context::Context,
    elaborate::{Elaborator, Phase},
    error::ElabError,
    external::ElimRequest,
};

impl<'a> Elaborator<'a> {
    pub(super) fn function_header(&mut self, def: &'a ConcreteDef, decl: &'a FunctionDecl, in_group: bool) {
        let mut function = FunctionDef::new(def.id, &def.name);
        let mut checker = Checker::new(&*self.state, self.program);

        let mut header_ok = match checker.check_params(&decl.params) {
            Ok(_) => true,
            Err(err) => {
                self.reporter.error(Phase::Header.wrap(err), def.loc);
                false
            }
        };
        function.params = checker.ctx.telescope_from(0);

        if header_ok && let Some(result_type) = &decl.result_type {
            match checker.check_type(result_type) {
                Ok((ty, _)) => function.result_type = Some(ty),
                Err(err) => {
                    self.reporter.error(Phase::Header.wrap(err), def.loc);
                    header_ok = false;
                }
            }
        }
        let soft = checker.has_soft_errors();

        if header_ok && in_group && decl.result_type.is_none() {
            self.reporter.error(ElabError::RecursiveResultType, def.loc);
            header_ok = false;
        }

        self.mark_soft(def.id, soft);
        function.status = Status::after_header(header_ok);
        self.state.record(function);
    }

    pub(super) fn function_body(
        &mut self,
        def: &'a ConcreteDef,
        decl: &'a FunctionDecl,
        recursive: bool,
        group: &[DefId],
    ) {
        let Some(Definition::Function(function)) = self.state.get(def.id) else {
            self.reporter.error(
                ElabError::Internal(format!("header of `{}` is missing", def.name)),
                def.loc,
            );
            return;
        };
        if !function.status.header_is_ok() || function.status.is_terminal() {
            return;
        }
        let mut function = function.clone();

        let indices = match &decl.body {
            FunctionBody::Elim { eliminated, .. } => {
                self.eliminated(eliminated, &function.params, def.loc)
            }
            FunctionBody::Term(_) => Some(Vec::new()),
        };
        let mut checker = Checker::new(&*self.state, self.program)
            .with_context(Context::from_telescope(&function.params));
        let result = match &decl.body {
            FunctionBody::Term(term) => {
                let result = match &function.result_type {
                    Some(expected) => checker
                        .check(term, expected)
                        .map(|expr| (expr, expected.clone())),
                    None => checker.infer(term),
                };
                result
                    .map(|(expr, ty)| (Body::Term(expr), ty))
                    .map_err(|err| vec![(Phase::Body.wrap(err), def.loc)])
            }
            FunctionBody::Elim { clauses, .. } => match function.result_type.clone() {
                None => Err(vec![(ElabError::MissingResultType, def.loc)]),
                Some(expected) => match indices {
                    None => Err(Vec::new()),
                    Some(indices) => {
                        let mut outer = Checker::new(&*self.state, self.program);
                        let request = ElimRequest {
                            params: &function.params,
                            eliminated: &indices,
                            clauses,
                            expected: &expected,
                            total: true,
                        };
                        let body = self.externals.elim.typecheck_elim(
                            &mut outer,
                            &*self.externals.patterns,
                            request,
                        );
                        if outer.has_soft_errors() {
                            checker.mark_soft_error();
                        }
                        body.map(|body| (body, expected))
                    }
                },
            },
        };
        let mut soft = checker.has_soft_errors() || self.is_soft(def);

        match result {
            Ok((body, result_type)) => {
                let is_elim = !matches!(body, Body::Term(_));
                if is_elim
                    && !self
                        .externals
                        .conditions
                        .check_conditions(self.state, def.id, &body)
                {
                    self.reporter
                        .error(ElabError::Conditions(def.name.clone()), def.loc);
                    soft = true;
                }
                if (recursive || group.len() > 1)
                    && !self
                        .externals
                        .termination
                        .check_termination(self.state, def.id, &body, group)
                {
                    self.reporter
                        .error(ElabError::Termination(def.name.clone()), def.loc);
                    soft = true;
                }

                function.result_type = Some(result_type);
                function.body = Some(body);
                function.status = Status::after_body(true, soft);
            }
            Err(errors) => {
                for (err, loc) in errors {
                    self.reporter.error(err, loc);
                }
                function.status = if function.result_type.is_some() {
                    Status::BodyHasErrors
                } else {
                    Status::HeaderHasErrors
                };
            }
        }

        debug!("function {} is {}", def.name, function.status);
        self.state.record(function);
    }
}

#[cfg(test)]
mod tests {
    use cubix_core::{Body, Definition, Expr, Sort, Status, TypecheckerState};
    use cubix_span::Report;
    use cubix_syntax::{Program, Term, build::*};

    use crate::{
        elaborate::{Elaborator, Reporter},
        external::Externals,
    };

    #[test]
    fn infers_missing_result_types() {
        let mut program = Program::new();
        let f = program.fresh();
        program.add(function(f, "f", vec![], None, term_body(Term::Interval)));

        let mut state = TypecheckerState::new();
        let mut report = Report::new();
        let externals = Externals::default();
        let mut elaborator =
            Elaborator::new(&program, &mut state, Reporter::new(&mut report, None), &externals);
        elaborator.elaborate_unit(f, false);

        let Some(Definition::Function(def)) = state.get(f) else {
            panic!("f is not recorded");
        };
        assert_eq!(def.status, Status::NoErrors);
        assert_eq!(def.result_type, Some(Expr::Universe(Sort::SET0)));
        assert_eq!(def.body, Some(Body::Term(Expr::Interval)));
        assert!(report.is_empty());
    }

    #[test]
    fn self_reference_without_result_type_is_rejected() {
        let mut program = Program::new();
        let g = program.fresh();
        program.add(function(g, "g", vec![], None, term_body(global(g))));

        let mut state = TypecheckerState::new();
        let mut report = Report::new();
        let externals = Externals::default();
        let mut elaborator =
            Elaborator::new(&program, &mut state, Reporter::new(&mut report, None), &externals);
        elaborator.elaborate_unit(g, true);

        assert_eq!(state.status(g), Some(Status::HeaderHasErrors));
        assert_eq!(report.error_count(), 1);
        assert!(report.diagnostics[0].message.contains("recursive function"));
    }

    #[test]
    fn body_errors_keep_the_header() {
        let mut program = Program::new();
        let f = program.fresh();
        program.add(function(
            f,
            "f",
            vec![param("x", Term::Interval)],
            Some(prop()),
            term_body(local("x")),
        ));

        let mut state = TypecheckerState::new();
        let mut report = Report::new();
        let externals = Externals::default();
        let mut elaborator =
            Elaborator::new(&program, &mut state, Reporter::new(&mut report, None), &externals);
        elaborator.elaborate_unit(f, false);

        assert_eq!(state.status(f), Some(Status::BodyHasErrors));
        assert_eq!(report.diagnostics[0].code.as_deref(), Some("body"));
    }
}
