//! Batch elaboration over a persistent [`TypecheckerState`].

pub mod config;

use cubix_core::{DefId, Status, TypecheckerState};
use cubix_span::{Report, Severity};
use cubix_syntax::Program;
use cubix_typer::prelude::*;
use indexmap::IndexMap;
use log::{debug, info};

pub use config::DriverOptions;

/// The result of one [`Driver::typecheck`] request.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// The status of every requested root that has been recorded.
    pub statuses: IndexMap<DefId, Status>,
    pub report: Report,
}

impl BatchOutput {
    pub fn status(&self, id: DefId) -> Option<Status> {
        self.statuses.get(&id).copied()
    }
}

#[derive(Debug, Default)]
pub struct Driver {
    state: TypecheckerState,
    externals: Externals,
    options: DriverOptions,
    elaborated: usize,
}

impl Driver {
    pub fn new(options: DriverOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn with_externals(mut self, externals: Externals) -> Self {
        self.externals = externals;
        self
    }

    pub fn state(&self) -> &TypecheckerState {
        &self.state
    }

    /// Gives access to the state, for example to [`TypecheckerState::reset`] a
    /// definition before elaborating it again.
    pub fn state_mut(&mut self) -> &mut TypecheckerState {
        &mut self.state
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Number of definitions elaborated by this driver so far.
    pub fn elaborated(&self) -> usize {
        self.elaborated
    }

    /// Elaborates `roots`, in order, together with everything they depend on.
    ///
    /// Definitions elaborated by earlier requests are reused as they are.
    pub fn typecheck(&mut self, program: &Program, roots: &[DefId]) -> BatchOutput {
        let mut report = Report::new();

        let elaborated = {
            let reporter = Reporter::new(&mut report, self.options.error_limit);
            let elaborator = Elaborator::new(program, &mut self.state, reporter, &self.externals);
            let mut typechecking = Typechecking::new(elaborator);
            let mut ordering = Ordering::new(program);

            for &root in roots {
                let clean = typechecking.typecheck(&mut ordering, root);
                let failed = !clean
                    || typechecking
                        .elaborator()
                        .state()
                        .status(root)
                        .is_none_or(|status| status.has_errors());
                if failed && !self.options.continue_on_error {
                    info!("stopping after {root} failed");
                    break;
                }
            }
            typechecking.elaborated()
        };
        self.elaborated += elaborated;
        debug!("elaborated {elaborated} definitions");

        let report = self.filter(report);
        let statuses = roots
            .iter()
            .filter_map(|root| Some((*root, self.state.status(*root)?)))
            .collect();
        BatchOutput { statuses, report }
    }

    fn filter(&self, report: Report) -> Report {
        let mut filtered = Report::new();
        for diagnostic in report.diagnostics {
            if !diagnostic.is_warning() {
                filtered.add_diagnostic(diagnostic);
            } else if self.options.warnings_as_errors {
                filtered.add_diagnostic(diagnostic.with_severity(Severity::Error));
            } else if self.options.warnings {
                filtered.add_diagnostic(diagnostic);
            }
        }
        filtered
    }
}
