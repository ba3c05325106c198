//! Elaboration of concrete definitions into the core language.
//!
//! The [`order::Ordering`] walks the dependency graph of a requested definition and
//! hands strongly connected groups of header and body units to the
//! [`typecheck::Typechecking`] listener, which elaborates them with an
//! [`elaborate::Elaborator`].

pub mod check;
pub mod context;
pub mod conv;
pub mod elaborate;
pub mod error;
pub mod external;
pub mod order;
pub mod positivity;
pub mod typecheck;

pub mod prelude {
    pub use crate::check::{CheckResult, Checker};
    pub use crate::context::Context;
    pub use crate::conv::{Cmp, convertible};
    pub use crate::elaborate::{Elaborator, Reporter};
    pub use crate::error::{ElabError, ElabWarning, ErrorKind, TypeError};
    pub use crate::external::{
        ConditionsChecker, ElimRequest, ElimTypechecker, Externals, PatternOutcome,
        PatternTypechecker, TerminationChecker,
    };
    pub use crate::order::{HeaderCycle, Ordering, OrderingListener, Scc, Typecheckable, Unit};
    pub use crate::positivity::{Target, covariance, is_positive};
    pub use crate::typecheck::{Typechecking, typecheck};
}
