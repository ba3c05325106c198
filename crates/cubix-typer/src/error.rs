use cubix_core::{Name, Sort};
use cubix_span::{Diagnostic, IntoDiagnostic, Loc};
use derive_more::Display;
use thiserror::Error;

/// Errors raised while checking a single expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("Unbound variable `{0}`")]
    Unbound(Name),
    #[error("`{0}` is not typechecked")]
    NotTypechecked(String),
    #[error("Expected `{expected}` but got `{actual}`")]
    Mismatch { expected: String, actual: String },
    #[error("Expected a function, but `{0}` is not a function type")]
    NotAFunction(String),
    #[error("Expected a type, but got an expression of type `{0}`")]
    NotAType(String),
    #[error("Expected a class, but got `{0}`")]
    NotAClass(String),
    #[error("Cannot infer the type of the parameter `{0}`")]
    UntypedParameter(Name),
    #[error("Cannot infer the type of the lambda parameter `{0}`")]
    UntypedLambda(Name),
    #[error("`{field}` is not a field of `{class}`")]
    NotAField { field: String, class: String },
    #[error("Field `{0}` is already implemented")]
    AlreadyImplemented(String),
    #[error("Universes {0} and {1} have no common upper bound")]
    IncompatibleSorts(Sort, Sort),
    #[error("Expected a universe of sort at most {expected}, but got {actual}")]
    SortTooLarge { expected: Sort, actual: Sort },
}

impl IntoDiagnostic for TypeError {}

/// Classification of elaboration errors.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[display("header")]
    Header,
    #[display("body")]
    Body,
    #[display("sort")]
    Sort,
    #[display("positivity")]
    Positivity,
    #[display("field")]
    Field,
    #[display("structural")]
    Structural,
    #[display("internal")]
    Internal,
}

impl ErrorKind {
    /// The code attached to diagnostics of this kind.
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::Header => "header",
            ErrorKind::Body => "body",
            ErrorKind::Sort => "sort",
            ErrorKind::Positivity => "positivity",
            ErrorKind::Field => "field",
            ErrorKind::Structural => "structural",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors reported while elaborating definitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElabError {
    #[error("{0}")]
    Header(TypeError),
    #[error("{0}")]
    Body(TypeError),
    #[error("Cannot infer the result type of a recursive function")]
    RecursiveResultType,
    #[error("Cannot infer the sort of a recursive data type")]
    RecursiveDataSort,
    #[error("Cannot infer the type of the expression")]
    MissingResultType,
    #[error("Cycle through the declared types of {}", .0.join(", "))]
    HeaderCycle(Vec<String>),
    #[error("Expected a universe")]
    ExpectedUniverse,
    #[error("Actual universe {actual} is not compatible with expected universe {expected}")]
    UniverseMismatch { actual: Sort, expected: Sort },
    #[error("Universes {0} and {1} have no common upper bound")]
    IncompatibleSorts(Sort, Sort),
    #[error(
        "Non-positive recursive occurrence of data type `{data}` in parameter `{parameter}` of constructor `{constructor}`"
    )]
    NonPositive {
        data: String,
        constructor: String,
        parameter: String,
    },
    #[error("The following fields are already implemented: {}", .0.join(", "))]
    AlreadyImplemented(Vec<String>),
    #[error("The following fields are not implemented: {}", .0.join(", "))]
    NotImplemented(Vec<String>),
    #[error("Internal error: coercing field must be a field belonging to the class")]
    CoercingField,
    #[error("`{field}` is not a field of `{class}`")]
    UnresolvedField { field: String, class: String },
    #[error("Field `{field}` is overridden by several synonyms: {}", .synonyms.join(", "))]
    AmbiguousOverride { field: String, synonyms: Vec<String> },
    #[error("`{super_class}` is not a super class of `{class}`")]
    NotASuperClass { super_class: String, class: String },
    #[error("Expected a class, but `{0}` is not a class")]
    ExpectedClass(String),
    #[error("A class cannot be recursive")]
    RecursiveClass,
    #[error("An instance cannot be recursive")]
    RecursiveInstance,
    #[error("Expected a constructor without patterns")]
    UnexpectedPatterns,
    #[error("Expected constructors with patterns")]
    ExpectedPatterns,
    #[error("This clause is redundant")]
    RedundantClause,
    #[error("Pattern matching is not exhaustive, missing: {}", .0.join(", "))]
    MissingClauses(Vec<String>),
    #[error("Invalid pattern: {0}")]
    Pattern(String),
    #[error("Conditions of `{0}` are not satisfied")]
    Conditions(String),
    #[error("Termination check failed for `{0}`")]
    Termination(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ElabError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ElabError::Header(TypeError::IncompatibleSorts(..) | TypeError::SortTooLarge { .. })
            | ElabError::Body(TypeError::IncompatibleSorts(..) | TypeError::SortTooLarge { .. })
            | ElabError::ExpectedUniverse
            | ElabError::UniverseMismatch { .. }
            | ElabError::IncompatibleSorts(..) => ErrorKind::Sort,
            ElabError::Header(_)
            | ElabError::RecursiveResultType
            | ElabError::RecursiveDataSort
            | ElabError::HeaderCycle(_) => ErrorKind::Header,
            ElabError::Body(_)
            | ElabError::MissingResultType
            | ElabError::RedundantClause
            | ElabError::MissingClauses(_)
            | ElabError::Pattern(_)
            | ElabError::Conditions(_)
            | ElabError::Termination(_) => ErrorKind::Body,
            ElabError::NonPositive { .. } => ErrorKind::Positivity,
            ElabError::AlreadyImplemented(_)
            | ElabError::NotImplemented(_)
            | ElabError::CoercingField
            | ElabError::UnresolvedField { .. }
            | ElabError::AmbiguousOverride { .. } => ErrorKind::Field,
            ElabError::NotASuperClass { .. }
            | ElabError::ExpectedClass(_)
            | ElabError::RecursiveClass
            | ElabError::RecursiveInstance
            | ElabError::UnexpectedPatterns
            | ElabError::ExpectedPatterns => ErrorKind::Structural,
            ElabError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl IntoDiagnostic for ElabError {
    fn into_diagnostic(self, loc: Loc) -> Diagnostic {
        let code = self.kind().code();
        Diagnostic::error(loc, self.to_string()).with_code(code)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElabWarning {
    #[error("The data type cannot be truncated since its universe is not specified")]
    TruncationWithoutUniverse,
    #[error("The data type will not be truncated since it already fits in the specified universe")]
    TruncationNotNeeded,
}

impl IntoDiagnostic for ElabWarning {
    fn into_diagnostic(self, loc: Loc) -> Diagnostic {
        Diagnostic::warn(loc, self.to_string()).with_code(ErrorKind::Sort.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_errors_are_classified_as_sort() {
        let err = ElabError::Header(TypeError::IncompatibleSorts(Sort::SET0, Sort::STD));
        assert_eq!(err.kind(), ErrorKind::Sort);
        assert_eq!(
            ElabError::Header(TypeError::Unbound("x".into())).kind(),
            ErrorKind::Header
        );
    }

    #[test]
    fn diagnostics_carry_the_kind() {
        let diagnostic = ElabError::NonPositive {
            data: "Bad".into(),
            constructor: "mk".into(),
            parameter: "f".into(),
        }
        .into_diagnostic(Loc::default());
        assert!(diagnostic.is_error());
        assert_eq!(diagnostic.code.as_deref(), Some("positivity"));
        assert!(diagnostic.message.contains("`Bad`"));
    }

    #[test]
    fn messages_list_fields() {
        let err = ElabError::AlreadyImplemented(vec!["x".into(), "y".into()]);
        assert_eq!(
            err.to_string(),
            "The following fields are already implemented: x, y"
        );
    }
}
