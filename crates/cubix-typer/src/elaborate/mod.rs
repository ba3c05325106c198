//! Elaboration of concrete definitions into the [`TypecheckerState`].
//!
//! Every definition goes through a header phase, fixing its type, and a body phase.
//! A single definition is elaborated in one go; the members of a recursive group
//! first get all their headers, in dependency order, before any body is checked.

mod class;
mod data;
mod function;
mod instance;
mod synonym;

use std::collections::HashSet;

use cubix_core::{DefId, Definition, DefinitionKind, Status, TypecheckerState};
use cubix_span::{Diagnostic, IntoDiagnostic, Loc, Located, Report};
use cubix_syntax::{ConcreteDef, Decl, Program};
use cubix_utils::visit::post_order;
use indexmap::IndexSet;
use log::debug;

use crate::{
    error::{ElabError, ElabWarning, TypeError},
    external::Externals,
    order::header_dependencies,
};

/// Sink for the diagnostics of one request.
///
/// Counts every error reported, including those dropped once `limit` errors have been
/// collected, so that elaboration can tell whether a definition produced errors.
#[derive(Debug)]
pub struct Reporter<'r> {
    report: &'r mut Report,
    limit: Option<usize>,
    errors: usize,
}

impl<'r> Reporter<'r> {
    pub fn new(report: &'r mut Report, limit: Option<usize>) -> Self {
        Self {
            report,
            limit,
            errors: 0,
        }
    }

    /// Number of errors reported so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn error(&mut self, error: ElabError, loc: Loc) {
        self.diagnostic(error.into_diagnostic(loc));
    }

    pub fn error_with_trace(&mut self, error: ElabError, loc: Loc, trace: Vec<Located<String>>) {
        self.diagnostic(error.into_diagnostic(loc).with_trace(trace));
    }

    pub fn warning(&mut self, warning: ElabWarning, loc: Loc) {
        self.diagnostic(warning.into_diagnostic(loc));
    }

    pub fn diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
            if self
                .limit
                .is_some_and(|limit| self.report.error_count() >= limit)
            {
                return;
            }
        }
        self.report.add_diagnostic(diagnostic);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Body,
}

impl Phase {
    fn wrap(self, error: TypeError) -> ElabError {
        match self {
            Phase::Header => ElabError::Header(error),
            Phase::Body => ElabError::Body(error),
        }
    }
}

pub struct Elaborator<'a> {
    program: &'a Program,
    state: &'a mut TypecheckerState,
    reporter: Reporter<'a>,
    externals: &'a Externals,
    /// Definitions that referenced a definition with errors.
    soft: HashSet<DefId>,
    touched: IndexSet<DefId>,
}

impl<'a> Elaborator<'a> {
    pub fn new(
        program: &'a Program,
        state: &'a mut TypecheckerState,
        reporter: Reporter<'a>,
        externals: &'a Externals,
    ) -> Self {
        Self {
            program,
            state,
            reporter,
            externals,
            soft: HashSet::new(),
            touched: IndexSet::new(),
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn state(&self) -> &TypecheckerState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut TypecheckerState {
        self.state
    }

    pub fn reporter(&mut self) -> &mut Reporter<'a> {
        &mut self.reporter
    }

    /// Number of definitions elaborated by this elaborator.
    pub fn elaborated(&self) -> usize {
        self.touched.len()
    }

    fn concrete(&mut self, id: DefId) -> Option<&'a ConcreteDef> {
        let program = self.program;
        let def = program.definition(id);
        if def.is_none() {
            self.reporter.error(
                ElabError::Internal(format!("no concrete definition for {id}")),
                Loc::default(),
            );
        }
        def
    }

    fn mark_soft(&mut self, id: DefId, soft: bool) {
        if soft {
            self.soft.insert(id);
        }
    }

    fn is_soft(&self, def: &ConcreteDef) -> bool {
        def.has_errors || self.soft.contains(&def.id)
    }

    fn header_done(&self, id: DefId) -> bool {
        self.state
            .status(id)
            .is_some_and(|status| status != Status::HeaderNeedsTypechecking)
    }

    /// Elaborates a definition that is not part of a recursive group. `recursive` is
    /// set if its body refers to itself.
    pub fn elaborate_unit(&mut self, id: DefId, recursive: bool) {
        let Some(def) = self.concrete(id) else {
            return;
        };
        debug!("elaborating {} ({id}), recursive: {recursive}", def.name);
        self.touched.insert(id);

        match &def.decl {
            Decl::Function(decl) => {
                if !self.header_done(id) {
                    self.function_header(def, decl, recursive);
                }
                self.function_body(def, decl, recursive, &[id]);
            }
            Decl::Data(decl) => {
                if !self.header_done(id) {
                    self.data_header(def, decl, false);
                }
                self.data_body(def, decl, &[id]);
            }
            Decl::Class(decl) => self.class(def, decl, recursive),
            Decl::Instance(decl) => self.instance(def, decl, recursive),
            Decl::ClassSynonym(decl) => self.synonym(def, decl, recursive),
        }
    }

    /// Elaborates only the header of a definition whose body is part of a larger group.
    pub fn elaborate_header(&mut self, id: DefId) {
        if self.header_done(id) {
            return;
        }
        let Some(def) = self.concrete(id) else {
            return;
        };
        debug!("elaborating the header of {} ({id})", def.name);
        self.touched.insert(id);

        match &def.decl {
            Decl::Function(decl) => self.function_header(def, decl, true),
            Decl::Data(decl) => self.data_header(def, decl, true),
            Decl::Class(_) | Decl::Instance(_) | Decl::ClassSynonym(_) => {
                self.reporter.error(
                    ElabError::Internal(format!("`{}` has no header", def.name)),
                    def.loc,
                );
            }
        }
    }

    /// Elaborates a recursive group. `bodies` are the members whose bodies belong to
    /// the group; members in `headers` only need their header.
    pub fn elaborate_group(&mut self, headers: &[DefId], bodies: &[DefId]) {
        let program = self.program;
        let members: IndexSet<DefId> = bodies.iter().chain(headers).copied().collect();
        debug!("elaborating recursive group {members:?}");

        for &id in bodies {
            let Some(def) = self.concrete(id) else {
                continue;
            };
            match &def.decl {
                Decl::Class(_) | Decl::ClassSynonym(_) => {
                    self.touched.insert(id);
                    self.recursive_class(def);
                }
                Decl::Instance(_) => {
                    self.touched.insert(id);
                    self.recursive_instance(def);
                }
                Decl::Function(_) | Decl::Data(_) => {}
            }
        }

        let with_headers: Vec<DefId> = members
            .iter()
            .copied()
            .filter(|id| {
                program
                    .definition(*id)
                    .is_some_and(|def| matches!(def.decl, Decl::Function(_) | Decl::Data(_)))
            })
            .collect();
        for id in post_order(&with_headers, |id| header_dependencies(program, id)) {
            self.elaborate_header(id);
        }

        let data: Vec<DefId> = bodies
            .iter()
            .copied()
            .filter(|id| self.kind_of(*id) == Some(DefinitionKind::Data))
            .collect();
        let functions: Vec<DefId> = bodies
            .iter()
            .copied()
            .filter(|id| self.kind_of(*id) == Some(DefinitionKind::Function))
            .collect();

        for &id in &data {
            let Some(def) = self.concrete(id) else {
                continue;
            };
            if let Decl::Data(decl) = &def.decl {
                self.touched.insert(id);
                self.data_body(def, decl, &data);
            }
        }
        for &id in &functions {
            let Some(def) = self.concrete(id) else {
                continue;
            };
            if let Decl::Function(decl) = &def.decl {
                self.touched.insert(id);
                self.function_body(def, decl, true, &functions);
            }
        }
    }

    fn kind_of(&self, id: DefId) -> Option<DefinitionKind> {
        match &self.program.definition(id)?.decl {
            Decl::Function(_) => Some(DefinitionKind::Function),
            Decl::Data(_) => Some(DefinitionKind::Data),
            Decl::Class(_) => Some(DefinitionKind::Class),
            Decl::Instance(_) => Some(DefinitionKind::Instance),
            Decl::ClassSynonym(_) => Some(DefinitionKind::ClassSynonym),
        }
    }

    /// Records `def` as failed without elaborating it.
    pub fn record_failed(&mut self, id: DefId) {
        let Some(def) = self.program.definition(id) else {
            return;
        };
        let mut stub: Definition = match &def.decl {
            Decl::Function(_) => cubix_core::FunctionDef::new(id, &def.name).into(),
            Decl::Data(_) => cubix_core::DataDef::new(id, &def.name).into(),
            Decl::Class(_) => cubix_core::ClassDef::new(id, &def.name).into(),
            Decl::Instance(_) => cubix_core::InstanceDef {
                id,
                name: def.name.clone(),
                status: Status::HeaderNeedsTypechecking,
                params: Default::default(),
                result_type: None,
            }
            .into(),
            Decl::ClassSynonym(decl) => cubix_core::ClassSynonymDef {
                id,
                name: def.name.clone(),
                status: Status::HeaderNeedsTypechecking,
                underlying: decl.underlying.0,
                fields: Default::default(),
            }
            .into(),
        };
        stub.set_status(Status::HeaderHasErrors);
        self.state.record(stub);
    }

    /// Resolves eliminated parameter names to their positions; an empty list
    /// eliminates every parameter.
    fn eliminated(
        &mut self,
        names: &[String],
        params: &cubix_core::Telescope,
        loc: Loc,
    ) -> Option<Vec<usize>> {
        if names.is_empty() {
            return Some((0..params.len()).collect());
        }

        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            match params.iter().rposition(|binder| &binder.name == name) {
                Some(index) => indices.push(index),
                None => {
                    self.reporter.error(
                        ElabError::Pattern(format!("`{name}` is not a parameter")),
                        loc,
                    );
                    return None;
                }
            }
        }
        Some(indices)
    }
}
