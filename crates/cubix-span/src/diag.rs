//! Diagnostics and their terminal rendering.
//!
//! Definitions carry a [`Loc`] but no source text, so [`Report::eprint`] renders a
//! location-only header per diagnostic instead of annotated source snippets.

use derive_more::Display;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, Write},
};

use crate::{Loc, Located};

/// Collects the diagnostics produced while elaborating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Creates a new report with no diagnostics.
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Adds a diagnostic to the report.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Diagnostics carrying the given code.
    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.code.as_deref() == Some(code))
    }

    pub fn write(&self, mut w: impl Write) -> io::Result<()> {
        for diagnostic in &self.diagnostics {
            diagnostic.write(&mut w)?;
        }
        Ok(())
    }

    /// Prints the report to the standard output.
    pub fn print(&self) -> io::Result<()> {
        self.write(io::stdout())
    }

    /// Prints the report to the standard error output.
    pub fn eprint(&self) -> io::Result<()> {
        self.write(io::stderr())
    }
}

/// Represents the severity of a diagnostic message.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn color(self) -> Style {
        match self {
            Severity::Info => Style::new().green(),
            Severity::Warning => Style::new().yellow(),
            Severity::Error => Style::new().red(),
        }
    }
}

/// Converts a type into a source diagnostic.
pub trait IntoDiagnostic: fmt::Display + Sized {
    /// Converts the type into a source diagnostic.
    fn into_diagnostic(self, loc: Loc) -> Diagnostic {
        Diagnostic::error(loc, self.to_string())
    }
}

/// A message about a location in the source.
///
/// Besides the message and the severity it may carry help text, trace entries pointing
/// at related locations, free-form notes and a machine readable code that classifies
/// the diagnostic (for example the kind of elaboration error).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    /// The main diagnostic message.
    pub message: String,
    /// Optional help text that provides additional guidance.
    pub help: Option<String>,
    /// The severity of the diagnostic (Error, Warning, or Info).
    pub severity: Severity,
    /// The source code location this diagnostic refers to.
    pub loc: Loc,
    /// Additional context information with their respective locations.
    pub trace: Vec<Located<String>>,
    /// Additional notes related to the diagnostic.
    pub notes: Vec<String>,
    /// Classification of the diagnostic.
    pub code: Option<String>,
}

impl Diagnostic {
    fn new(severity: Severity, loc: Loc, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            help: None,
            severity,
            loc,
            trace: Vec::new(),
            notes: Vec::new(),
            code: None,
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, loc, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warn(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, loc, message)
    }

    /// Creates a new informational diagnostic.
    pub fn info(loc: Loc, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, loc, message)
    }

    /// Adds help text to the diagnostic and returns self for method chaining.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Adds trace information to the diagnostic and returns self for method chaining.
    pub fn with_trace(mut self, trace: impl IntoIterator<Item = Located<String>>) -> Self {
        self.trace = trace.into_iter().collect();
        self
    }

    /// Adds notes to the diagnostic and returns self for method chaining.
    pub fn with_notes(mut self, notes: impl IntoIterator<Item = String>) -> Self {
        self.notes = notes.into_iter().collect();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Changes the severity, keeping everything else.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_info(&self) -> bool {
        self.severity == Severity::Info
    }

    pub fn write(&self, mut w: impl Write) -> io::Result<()> {
        let style = self.severity.color();

        match &self.code {
            Some(code) => writeln!(
                w,
                "{}[{}] at {}: {}",
                self.severity.style(style),
                code.style(style),
                self.loc,
                self.message
            )?,
            None => writeln!(
                w,
                "{} at {}: {}",
                self.severity.style(style),
                self.loc,
                self.message
            )?,
        }

        for (label, loc) in &self.trace {
            writeln!(w, "  {} {label} at {loc}", "-->".blue())?;
        }
        for note in &self.notes {
            writeln!(w, "  {} {note}", "Note:".blue())?;
        }
        if let Some(help) = &self.help {
            writeln!(w, "  {} {help}", "Help:".cyan())?;
        }

        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}
