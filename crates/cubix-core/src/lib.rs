//! Core language of the elaborator.
//!
//! Everything the elaborator produces lives here: the universe algebra ([`Sort`]),
//! de Bruijn indexed core terms ([`Expr`]), the typed [`Definition`] variants with
//! their elaboration [`Status`], and the [`TypecheckerState`] mapping definition
//! handles to their elaborated counterpart.

mod body;
mod def;
mod expr;
mod id;
mod print;
mod reduce;
mod sort;
mod state;

pub use body::{Body, CoreClause, CorePattern, ElimBody, IntervalElim};
pub use def::{
    ClassDef, ClassSynonymDef, ConstructorDef, DataDef, Definition, DefinitionKind, FieldDef,
    FieldSynonymDef, FunctionDef, InstanceDef, Status,
};
pub use expr::{Binder, ClassCall, Expr, Name, Telescope};
pub use id::DefId;
pub use print::{pretty, pretty_in};
pub use reduce::{head_def, whnf};
pub use sort::{Level, LevelVar, Sort};
pub use state::TypecheckerState;
