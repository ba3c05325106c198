use std::collections::HashSet;

use cubix_core::{ClassSynonymDef, DefId, Definition, FieldSynonymDef, Status};
use cubix_syntax::{ConcreteDef, Decl, SynonymDecl};
use indexmap::{IndexMap, IndexSet};
use log::debug;

use crate::{elaborate::Elaborator, error::ElabError};

impl<'a> Elaborator<'a> {
    pub(super) fn synonym(&mut self, def: &'a ConcreteDef, decl: &'a SynonymDecl, recursive: bool) {
        if self.state.is_typechecked(def.id) {
            return;
        }
        if recursive {
            self.recursive_class(def);
            return;
        }

        let (underlying_id, loc) = decl.underlying;
        let underlying = match self.state.resolve_class(underlying_id) {
            Some(class) if class.status.header_is_ok() => class.clone(),
            Some(_) => {
                self.mark_soft(def.id, true);
                self.synonym_stub(def, decl);
                return;
            }
            None => {
                self.reporter
                    .error(ElabError::ExpectedClass(self.state.name(underlying_id)), loc);
                self.synonym_stub(def, decl);
                return;
            }
        };
        let errors_before = self.reporter.errors();
        let soft = self.is_soft(def) || underlying.status.has_errors();

        let mut supers = Vec::new();
        for &(super_id, loc) in &decl.super_classes {
            let Some(super_class) = self.state.resolve_class(super_id) else {
                self.reporter
                    .error(ElabError::ExpectedClass(self.state.name(super_id)), loc);
                continue;
            };
            if !self.state.is_subclass(underlying.id, super_class.id) {
                self.reporter.error(
                    ElabError::NotASuperClass {
                        super_class: self.state.name(super_id),
                        class: underlying.name.clone(),
                    },
                    loc,
                );
                continue;
            }
            supers.push(super_id);
        }

        let mut fields = IndexMap::new();
        for field in &decl.fields {
            let resolved = self
                .state
                .resolve_field(field.underlying)
                .filter(|id| underlying.has_field(*id));
            let status = match resolved {
                Some(core) => {
                    fields.insert(field.id, core);
                    Status::NoErrors
                }
                None => {
                    self.reporter.error(
                        ElabError::UnresolvedField {
                            field: self.state.name(field.underlying),
                            class: underlying.name.clone(),
                        },
                        field.loc,
                    );
                    Status::HeaderHasErrors
                }
            };
            self.state.record(FieldSynonymDef {
                id: field.id,
                name: field.name.clone(),
                status,
                synonym: def.id,
                underlying: resolved.unwrap_or(field.underlying),
            });
        }

        self.ambiguous_overrides(def, &supers, &fields);

        let status = if self.reporter.errors() > errors_before {
            Status::BodyHasErrors
        } else {
            Status::after_body(true, soft)
        };
        debug!("class synonym {} is {status}", def.name);
        self.state.record(ClassSynonymDef {
            id: def.id,
            name: def.name.clone(),
            status,
            underlying: underlying.id,
            fields,
        });
    }

    fn synonym_stub(&mut self, def: &ConcreteDef, decl: &SynonymDecl) {
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
            fields: IndexMap::new(),
        });
    }

    /// Reports every core field that the super-class closure of a synonym reaches
    /// under more than one name.
    fn ambiguous_overrides(
        &mut self,
        def: &ConcreteDef,
        supers: &[DefId],
        own: &IndexMap<DefId, DefId>,
    ) {
        let mut names: IndexMap<DefId, IndexSet<DefId>> = IndexMap::new();
        for (synonym, core) in own {
            names.entry(*core).or_default().insert(*synonym);
        }

        let mut queue: Vec<DefId> = supers.to_vec();
        let mut seen = HashSet::new();
        let mut next = 0;
        while let Some(&id) = queue.get(next) {
            next += 1;
            if !seen.insert(id) {
                continue;
            }
            match self.state.get(id) {
                Some(Definition::ClassSynonym(synonym)) => {
                    for (field, core) in &synonym.fields {
                        names.entry(*core).or_default().insert(*field);
                    }
                    if let Some(Decl::ClassSynonym(decl)) =
                        self.program.definition(id).map(|def| &def.decl)
                    {
                        queue.extend(decl.super_classes.iter().map(|(id, _)| *id));
                    }
                }
                Some(Definition::Class(class)) => {
                    for field in &class.personal_fields {
                        names.entry(*field).or_default().insert(*field);
                    }
                    queue.extend(class.super_classes.iter().copied());
                }
                _ => {}
            }
        }

        for (core, refs) in names {
            if refs.len() > 1 {
                self.reporter.error(
                    ElabError::AmbiguousOverride {
                        field: self.state.name(core),
                        synonyms: refs.iter().map(|id| self.state.name(*id)).collect(),
                    },
                    def.loc,
                );
            }
        }
    }
}
