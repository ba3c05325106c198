//! Helpers for assembling concrete programs by hand.
//!
//! Every definition gets a location derived from its handle, so diagnostics produced
//! for hand-built programs still point at distinct places.

use std::rc::Rc;

use cubix_core::{DefId, Sort};
use cubix_span::{Loc, SourceId, Span};

use crate::{
    ClassDecl, Clause, ConcreteDef, ConstructorClause, ConstructorDecl, DataDecl, Decl, FieldDecl,
    FieldImpl, FieldSynonymDecl, FunctionBody, FunctionDecl, InstanceDecl, LamParam, Param,
    Pattern, SynonymDecl, Term,
};

/// The synthetic location of a handle.
pub fn loc_of(id: DefId) -> Loc {
    let start = id.as_usize() * 16;
    Loc::new(SourceId::default(), Span::new(start, start + 8))
}

pub fn local(name: &str) -> Term {
    Term::Local(name.to_owned())
}

pub fn global(id: DefId) -> Term {
    Term::Global(id)
}

pub fn app(head: Term, args: impl IntoIterator<Item = Term>) -> Term {
    Term::App(Box::new(head), args.into_iter().collect())
}

pub fn pi(params: Vec<Param>, codomain: Term) -> Term {
    Term::Pi(params, Box::new(codomain))
}

/// A non-dependent function type.
pub fn arrow(domain: Term, codomain: Term) -> Term {
    pi(vec![param("_", domain)], codomain)
}

pub fn lam(names: &[&str], body: Term) -> Term {
    let params = names
        .iter()
        .map(|name| LamParam {
            name: (*name).to_owned(),
            ty: None,
        })
        .collect();
    Term::Lam(params, Box::new(body))
}

pub fn typed_lam(name: &str, ty: Term, body: Term) -> Term {
    Term::Lam(
        vec![LamParam {
            name: name.to_owned(),
            ty: Some(ty),
        }],
        Box::new(body),
    )
}

pub fn universe(sort: Sort) -> Term {
    Term::Universe(sort)
}

pub fn set(p: i32) -> Term {
    universe(Sort::set(p))
}

pub fn prop() -> Term {
    universe(Sort::PROP)
}

pub fn class_ext(class: DefId, implementations: Vec<FieldImpl>) -> Term {
    Term::ClassExt(class, implementations)
}

pub fn param(name: &str, ty: Term) -> Param {
    Param {
        names: vec![name.to_owned()],
        ty: Some(ty),
        loc: Loc::default(),
    }
}

pub fn untyped_param(name: &str) -> Param {
    Param {
        names: vec![name.to_owned()],
        ty: None,
        loc: Loc::default(),
    }
}

pub fn pvar(name: &str) -> Pattern {
    Pattern::Var(name.to_owned())
}

pub fn pcon(constructor: DefId, args: Vec<Pattern>) -> Pattern {
    Pattern::Con(constructor, args)
}

pub fn clause(patterns: Vec<Pattern>, rhs: Term) -> Clause {
    Clause {
        patterns,
        rhs: Some(rhs),
        loc: Loc::default(),
    }
}

pub fn term_body(term: Term) -> FunctionBody {
    FunctionBody::Term(term)
}

pub fn elim_body(eliminated: &[&str], clauses: Vec<Clause>) -> FunctionBody {
    FunctionBody::Elim {
        eliminated: eliminated.iter().map(|name| (*name).to_owned()).collect(),
        clauses,
    }
}

pub fn function(
    id: DefId,
    name: &str,
    params: Vec<Param>,
    result_type: Option<Term>,
    body: FunctionBody,
) -> ConcreteDef {
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::Function(FunctionDecl {
            params,
            result_type,
            body,
        }),
    )
}

pub fn constructor(id: DefId, name: &str, params: Vec<Param>) -> ConstructorDecl {
    ConstructorDecl {
        id,
        name: name.to_owned(),
        params,
        eliminated: Vec::new(),
        clauses: Vec::new(),
        loc: loc_of(id),
    }
}

/// A data type whose constructors do not match on its parameters.
pub fn data(
    id: DefId,
    name: &str,
    params: Vec<Param>,
    universe: Option<Term>,
    constructors: Vec<ConstructorDecl>,
) -> ConcreteDef {
    let clauses = vec![ConstructorClause {
        patterns: None,
        constructors,
        loc: loc_of(id),
    }];
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::Data(DataDecl {
            params,
            universe,
            truncated: false,
            eliminated: None,
            clauses,
        }),
    )
}

pub fn constructor_clause(patterns: Vec<Pattern>, constructors: Vec<ConstructorDecl>) -> ConstructorClause {
    ConstructorClause {
        patterns: Some(patterns),
        constructors,
        loc: Loc::default(),
    }
}

/// A data type defined by matching on some of its parameters.
pub fn data_elim(
    id: DefId,
    name: &str,
    params: Vec<Param>,
    universe: Option<Term>,
    eliminated: &[&str],
    clauses: Vec<ConstructorClause>,
) -> ConcreteDef {
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::Data(DataDecl {
            params,
            universe,
            truncated: false,
            eliminated: Some(eliminated.iter().map(|name| (*name).to_owned()).collect()),
            clauses,
        }),
    )
}

pub fn field(id: DefId, name: &str, ty: Term) -> FieldDecl {
    FieldDecl {
        id,
        name: name.to_owned(),
        ty: Rc::new(ty),
        loc: loc_of(id),
    }
}

/// Fields declared together, `| x y : A`, sharing a single type term.
pub fn shared_fields(fields: &[(DefId, &str)], ty: Term) -> Vec<FieldDecl> {
    let ty = Rc::new(ty);
    fields
        .iter()
        .map(|(id, name)| FieldDecl {
            id: *id,
            name: (*name).to_owned(),
            ty: Rc::clone(&ty),
            loc: loc_of(*id),
        })
        .collect()
}

pub fn implement(field: DefId, term: Term) -> FieldImpl {
    FieldImpl {
        field,
        term,
        loc: loc_of(field),
    }
}

pub fn class(
    id: DefId,
    name: &str,
    super_classes: Vec<DefId>,
    fields: Vec<FieldDecl>,
    implementations: Vec<FieldImpl>,
) -> ConcreteDef {
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::Class(ClassDecl {
            super_classes: super_classes.into_iter().map(|s| (s, loc_of(s))).collect(),
            fields,
            implementations,
            coercing_field: None,
            instances: Vec::new(),
        }),
    )
}

pub fn instance(
    id: DefId,
    name: &str,
    params: Vec<Param>,
    class: DefId,
    implementations: Vec<FieldImpl>,
) -> ConcreteDef {
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::Instance(InstanceDecl {
            params,
            result: class_ext(class, implementations),
        }),
    )
}

pub fn field_synonym(id: DefId, name: &str, underlying: DefId) -> FieldSynonymDecl {
    FieldSynonymDecl {
        id,
        name: name.to_owned(),
        underlying,
        loc: loc_of(id),
    }
}

pub fn synonym(
    id: DefId,
    name: &str,
    underlying: DefId,
    super_classes: Vec<DefId>,
    fields: Vec<FieldSynonymDecl>,
) -> ConcreteDef {
    ConcreteDef::new(
        id,
        name,
        loc_of(id),
        Decl::ClassSynonym(SynonymDecl {
            underlying: (underlying, loc_of(underlying)),
            super_classes: super_classes.into_iter().map(|s| (s, loc_of(s))).collect(),
            fields,
        }),
    )
}
