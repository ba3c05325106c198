//! Collaborators the elaborator delegates to: pattern typechecking, compilation of
//! clauses, the conditions checker and the termination checker.
//!
//! Each is a trait so that a richer implementation can be plugged into the
//! [`Externals`] bundle; the [`basic`] implementations are enough to elaborate
//! ordinary programs.

pub mod basic;

use cubix_core::{Body, CorePattern, DefId, Expr, Telescope, TypecheckerState};
use cubix_span::Located;
use cubix_syntax::{Clause, Pattern};

use crate::{check::Checker, error::ElabError};

pub use basic::{AcceptAll, BasicElim, BasicPatterns};

/// The result of typechecking a row of patterns against a telescope.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedPatterns {
    pub patterns: Vec<CorePattern>,
    /// Variables bound by the patterns, living in the context of the checker.
    pub bindings: Telescope,
    /// One term per telescope entry, living in the context extended by `bindings`.
    pub exprs: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternOutcome {
    Matched(MatchedPatterns),
    /// Every value matched by the row is matched by an earlier one.
    Redundant,
    Failed(ElabError),
}

pub trait PatternTypechecker {
    /// Typechecks `patterns` against `telescope`, whose types live in the checker's
    /// context. `previous` are the rows accepted before this one.
    fn typecheck_patterns(
        &self,
        checker: &Checker,
        patterns: &[Pattern],
        telescope: &Telescope,
        previous: &[Vec<CorePattern>],
    ) -> PatternOutcome;
}

/// Clauses to compile over the parameters `params` of a definition.
#[derive(Debug, Clone, Copy)]
pub struct ElimRequest<'r> {
    pub params: &'r Telescope,
    /// Indices of the parameters matched on; the clauses have one pattern per
    /// eliminated parameter.
    pub eliminated: &'r [usize],
    pub clauses: &'r [Clause],
    /// The result type, living in the context extended by `params`.
    pub expected: &'r Expr,
    /// Whether the clauses must cover every case.
    pub total: bool,
}

pub trait ElimTypechecker {
    /// Compiles the clauses of `request` into a body. The checker's context does not
    /// contain the parameters.
    fn typecheck_elim(
        &self,
        checker: &mut Checker,
        patterns: &dyn PatternTypechecker,
        request: ElimRequest,
    ) -> Result<Body, Vec<Located<ElabError>>>;
}

pub trait ConditionsChecker {
    /// Verifies that overlapping clauses of `body` agree.
    fn check_conditions(&self, state: &TypecheckerState, def: DefId, body: &Body) -> bool;
}

pub trait TerminationChecker {
    /// Verifies that the recursive calls of `def` to members of `group` decrease.
    fn check_termination(
        &self,
        state: &TypecheckerState,
        def: DefId,
        body: &Body,
        group: &[DefId],
    ) -> bool;
}

pub struct Externals {
    pub patterns: Box<dyn PatternTypechecker>,
    pub elim: Box<dyn ElimTypechecker>,
    pub conditions: Box<dyn ConditionsChecker>,
    pub termination: Box<dyn TerminationChecker>,
}

impl Default for Externals {
    fn default() -> Self {
        Self {
            patterns: Box::new(BasicPatterns),
            elim: Box::new(BasicElim),
            conditions: Box::new(AcceptAll),
            termination: Box::new(AcceptAll),
        }
    }
}

impl std::fmt::Debug for Externals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Externals").finish_non_exhaustive()
    }
}
