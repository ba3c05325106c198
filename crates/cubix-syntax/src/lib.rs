//! Concrete, already name-resolved definitions handed to the elaborator.
//!
//! Parsing and name resolution happen elsewhere: global references arrive as
//! [`DefId`](cubix_core::DefId) handles, local references as names. The [`Program`]
//! is the table of all concrete definitions together with the ownership information
//! (constructors belong to data types, fields to classes) the scheduler needs.

pub mod build;
mod concrete;
mod deps;
mod program;

pub use concrete::{
    ClassDecl, Clause, ConcreteDef, ConstructorClause, ConstructorDecl, DataDecl, Decl, FieldDecl,
    FieldImpl, FieldSynonymDecl, FunctionBody, FunctionDecl, InstanceDecl, LamParam, Param,
    Pattern, SynonymDecl, Term,
};
pub use deps::dependencies;
pub use program::{Entry, Program};
