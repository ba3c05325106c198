use std::rc::Rc;

use cubix_core::{ClassDef, ClassSynonymDef, DefId, Expr, FieldDef, FieldSynonymDef, Sort, Status};
use cubix_span::Located;
use cubix_syntax::{ClassDecl, ConcreteDef, Decl, Term};
use indexmap::IndexMap;
use log::debug;

use crate::{
    check::Checker,
    context::Context,
    conv::{Cmp, convertible},
    elaborate::{Elaborator, Phase},
    error::ElabError,
};

/// An implementation together with where it came from.
struct Inherited {
    expr: Expr,
    source: Located<String>,
}

impl<'a> Elaborator<'a> {
    pub(super) fn class(&mut self, def: &'a ConcreteDef, decl: &'a ClassDecl, recursive: bool) {
        if self.state.is_typechecked(def.id) {
            return;
        }
        if recursive {
            self.recursive_class(def);
            return;
        }

        let errors_before = self.reporter.errors();
        let mut soft = self.is_soft(def);
        let mut class = ClassDef::new(def.id, &def.name);
        let this_ty = Expr::class_call(def.id);

        // Inherit fields and implementations, first super class wins.
        let mut inherited: IndexMap<DefId, Inherited> = IndexMap::new();
        let mut conflicts = Vec::new();
        let mut trace = Vec::new();
        for &(super_id, loc) in &decl.super_classes {
            let Some(super_class) = self.state.resolve_class(super_id) else {
                self.reporter
                    .error(ElabError::ExpectedClass(self.state.name(super_id)), loc);
                continue;
            };
            if !super_class.status.header_is_ok() {
                soft = true;
                continue;
            }
            soft |= super_class.status.has_errors();

            if !class.super_classes.contains(&super_class.id) {
                class.super_classes.push(super_class.id);
            }
            for field in &super_class.fields {
                if !class.fields.contains(field) {
                    class.fields.push(*field);
                }
            }
            for (field, expr) in &super_class.implemented {
                let source = (format!("implemented in `{}`", super_class.name), loc);
                match inherited.get(field) {
                    None => {
                        inherited.insert(*field, Inherited {
                            expr: expr.clone(),
                            source,
                        });
                    }
                    Some(previous) if convertible(self.state, &previous.expr, expr, Cmp::Eq) => {}
                    Some(previous) => {
                        conflicts.push(self.state.name(*field));
                        trace.push(previous.source.clone());
                        trace.push(source);
                    }
                }
            }
            if class.coercing_field.is_none() {
                class.coercing_field = super_class.coercing_field;
            }
        }
        if !conflicts.is_empty() {
            self.reporter
                .error_with_trace(ElabError::AlreadyImplemented(conflicts), def.loc, trace);
        }
        class.implemented = inherited
            .into_iter()
            .map(|(field, inherited)| (field, inherited.expr))
            .collect();

        class.status = Status::BodyNeedsTypechecking;
        self.state.record(class.clone());

        // Personal fields; fields declared together share their type.
        let mut shared: Option<(Rc<Term>, Expr, Sort, Status)> = None;
        for field in &decl.fields {
            let (ty, sort, status) = match &shared {
                Some((term, ty, sort, status)) if Rc::ptr_eq(term, &field.ty) => {
                    (ty.clone(), *sort, *status)
                }
                _ => {
                    let mut checker = Checker::new(&*self.state, self.program)
                        .with_context(this_context(&this_ty));
                    let checked = match checker.check_type(&field.ty) {
                        Ok((ty, sort)) => (ty, sort, Status::after_body(true, checker.has_soft_errors())),
                        Err(err) => {
                            self.reporter.error(Phase::Body.wrap(err), field.loc);
                            (Expr::Error, Sort::PROP, Status::BodyHasErrors)
                        }
                    };
                    shared = Some((Rc::clone(&field.ty), checked.0.clone(), checked.1, checked.2));
                    checked
                }
            };
            soft |= status == Status::HasErrors;

            self.state.record(FieldDef {
                id: field.id,
                name: field.name.clone(),
                status,
                class: def.id,
                ty: Expr::pi("this", this_ty.clone(), ty),
                sort,
            });
            class.fields.push(field.id);
            class.personal_fields.push(field.id);
            self.state.record(class.clone());
        }

        if let Some(coercing) = decl.coercing_field
            && class.coercing_field.is_none()
        {
            if class.personal_fields.contains(&coercing) {
                class.coercing_field = Some(coercing);
            } else {
                self.reporter.error(ElabError::CoercingField, def.loc);
            }
        }

        self.implementations(def, decl, &mut class, &mut soft);

        let mut sort = Sort::PROP;
        for field in &class.fields {
            if class.is_implemented(*field) {
                continue;
            }
            let Some(field_sort) = self
                .state
                .get(*field)
                .and_then(|def| def.as_field())
                .map(|field| field.sort)
            else {
                continue;
            };
            match sort.join(field_sort) {
                Some(joined) => sort = joined,
                None => self
                    .reporter
                    .error(ElabError::IncompatibleSorts(sort, field_sort), def.loc),
            }
        }
        class.sort = sort;

        class.status = if self.reporter.errors() > errors_before {
            Status::BodyHasErrors
        } else {
            Status::after_body(true, soft)
        };
        debug!("class {} is {} in {}", def.name, class.status, class.sort);
        self.state.record(class);
    }

    /// Checks the implementations a class declares for its own or inherited fields.
    fn implementations(
        &mut self,
        def: &ConcreteDef,
        decl: &ClassDecl,
        class: &mut ClassDef,
        soft: &mut bool,
    ) {
        let this_ty = Expr::class_call(def.id);
        let mut already = Vec::new();
        let mut trace = Vec::new();

        for implementation in &decl.implementations {
            let Some(field) = self
                .state
                .resolve_field(implementation.field)
                .filter(|field| class.has_field(*field))
            else {
                self.reporter.error(
                    ElabError::UnresolvedField {
                        field: self.state.name(implementation.field),
                        class: def.name.clone(),
                    },
                    implementation.loc,
                );
                continue;
            };
            if class.is_implemented(field) {
                already.push(self.state.name(field));
                trace.push((
                    format!("`{}` is implemented again here", self.state.name(field)),
                    implementation.loc,
                ));
                continue;
            }

            let Some(field_def) = self.state.get(field).and_then(|def| def.as_field()) else {
                continue;
            };
            if !field_def.status.header_is_ok() {
                *soft = true;
                continue;
            }
            let expected = field_def.codomain().clone();
            let mut checker =
                Checker::new(&*self.state, self.program).with_context(this_context(&this_ty));
            match checker.check(&implementation.term, &expected) {
                Ok(expr) => {
                    *soft |= checker.has_soft_errors();
                    class.implemented.insert(field, expr);
                }
                Err(err) => self
                    .reporter
                    .error(Phase::Body.wrap(err), implementation.loc),
            }
        }

        if !already.is_empty() {
            self.reporter
                .error_with_trace(ElabError::AlreadyImplemented(already), def.loc, trace);
        }
    }

    /// Rejects a class or class synonym that is part of a recursive group. Its fields
    /// are still recorded so that references to them do not cascade.
    pub(super) fn recursive_class(&mut self, def: &'a ConcreteDef) {
        if self.state.is_typechecked(def.id) {
            return;
        }
        self.reporter.error(ElabError::RecursiveClass, def.loc);

        match &def.decl {
            Decl::Class(decl) => {
                let mut class = ClassDef::new(def.id, &def.name);
                for field in &decl.fields {
                    self.state.record(FieldDef {
                        id: field.id,
                        name: field.name.clone(),
                        status: Status::BodyHasErrors,
                        class: def.id,
                        ty: Expr::pi("this", Expr::class_call(def.id), Expr::Error),
                        sort: Sort::PROP,
                    });
                    class.fields.push(field.id);
                    class.personal_fields.push(field.id);
                }
                class.status = Status::HeaderHasErrors;
                self.state.record(class);
            }
            Decl::ClassSynonym(decl) => {
                for field in &decl.fields {
                    self.state.record(FieldSynonymDef {
                        id: field.id,
                        name: field.name.clone(),
                        status: Status::HeaderHasErrors,
                        synonym: def.id,
                        underlying: field.underlying,
                    });
                }
                self.state.record(ClassSynonymDef {
                    id: def.id,
                    name: def.name.clone(),
                    status: Status::HeaderHasErrors,
                    underlying: decl.underlying.0,
                    fields: decl.fields.iter().map(|f| (f.id, f.underlying)).collect(),
                });
            }
            Decl::Function(_) | Decl::Data(_) | Decl::Instance(_) => {
                self.reporter.error(
                    ElabError::Internal(format!("`{}` is not a class", def.name)),
                    def.loc,
                );
            }
        }
    }
}

fn this_context(this_ty: &Expr) -> Context {
    let mut ctx = Context::new();
    ctx.push("this", this_ty.clone());
    ctx
}
