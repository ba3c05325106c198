//! Source locations and diagnostics.
//!
//! Elaboration never aborts on the first problem: every error, warning or note is
//! collected as a [`Diagnostic`] inside a [`Report`] and attached to the [`Loc`] of the
//! definition, parameter or clause it concerns.

mod diag;
mod loc;
mod source;
mod span;

pub use diag::{Diagnostic, IntoDiagnostic, Report, Severity};
pub use loc::{Loc, Located};
pub use source::SourceId;
pub use span::Span;
