use cubix_core::DefId;
use indexmap::IndexSet;

use crate::{Clause, ConcreteDef, Decl, FieldImpl, FunctionBody, Param, Pattern, Term};

/// Global references made by a definition, in order of first occurrence.
///
/// With `header_only` only the parts needed to know the type of the definition are
/// visited: parameters and declared result type or universe for functions and data
/// types, the super-classes of classes and the underlying class of synonyms.
pub fn dependencies(def: &ConcreteDef, header_only: bool) -> IndexSet<DefId> {
    let mut deps = DepCollector::default();

    match &def.decl {
        Decl::Function(function) => {
            deps.params(&function.params);
            deps.opt_term(function.result_type.as_ref());
            if !header_only {
                match &function.body {
                    FunctionBody::Term(term) => deps.term(term),
                    FunctionBody::Elim { clauses, .. } => deps.clauses(clauses),
                }
            }
        }
        Decl::Data(data) => {
            deps.params(&data.params);
            deps.opt_term(data.universe.as_ref());
            if !header_only {
                for clause in &data.clauses {
                    for pattern in clause.patterns.iter().flatten() {
                        deps.pattern(pattern);
                    }
                    for constructor in &clause.constructors {
                        deps.params(&constructor.params);
                        deps.clauses(&constructor.clauses);
                    }
                }
            }
        }
        Decl::Class(class) => {
            deps.extend(class.super_classes.iter().map(|(id, _)| *id));
            if !header_only {
                for field in &class.fields {
                    deps.term(&field.ty);
                }
                deps.implementations(&class.implementations);
                deps.0.retain(|id| !class.fields.iter().any(|field| field.id == *id));
            }
        }
        Decl::Instance(instance) => {
            deps.params(&instance.params);
            deps.term(&instance.result);
        }
        Decl::ClassSynonym(synonym) => {
            deps.extend([synonym.underlying.0]);
            deps.extend(synonym.super_classes.iter().map(|(id, _)| *id));
            if !header_only {
                deps.extend(synonym.fields.iter().map(|field| field.underlying));
            }
        }
    }

    deps.0
}

#[derive(Default)]
struct DepCollector(IndexSet<DefId>);

impl DepCollector {
    fn extend(&mut self, ids: impl IntoIterator<Item = DefId>) {
        self.0.extend(ids);
    }

    fn params(&mut self, params: &[Param]) {
        for param in params {
            self.opt_term(param.ty.as_ref());
        }
    }

    fn opt_term(&mut self, term: Option<&Term>) {
        if let Some(term) = term {
            self.term(term);
        }
    }

    fn term(&mut self, term: &Term) {
        match term {
            Term::Global(id) => {
                self.0.insert(*id);
            }
            Term::Local(_) | Term::Universe(_) | Term::Interval | Term::Left | Term::Right => {}
            Term::Pi(params, codomain) => {
                self.params(params);
                self.term(codomain);
            }
            Term::Lam(params, body) => {
                for param in params {
                    self.opt_term(param.ty.as_ref());
                }
                self.term(body);
            }
            Term::App(head, args) => {
                self.term(head);
                for arg in args {
                    self.term(arg);
                }
            }
            Term::ClassExt(class, implementations) => {
                self.0.insert(*class);
                self.implementations(implementations);
            }
        }
    }

    fn implementations(&mut self, implementations: &[FieldImpl]) {
        for implementation in implementations {
            self.0.insert(implementation.field);
            self.term(&implementation.term);
        }
    }

    fn pattern(&mut self, pattern: &Pattern) {
        if let Pattern::Con(constructor, args) = pattern {
            self.0.insert(*constructor);
            for arg in args {
                self.pattern(arg);
            }
        }
    }

    fn clauses(&mut self, clauses: &[Clause]) {
        for clause in clauses {
            for pattern in &clause.patterns {
                self.pattern(pattern);
            }
            self.opt_term(clause.rhs.as_ref());
        }
    }
}
