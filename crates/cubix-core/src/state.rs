use std::collections::HashMap;

use crate::{ClassDef, Definition, DefId, Expr, Status};

/// Maps definition handles to their elaborated counterparts.
///
/// The state outlives a single typechecking request: definitions that reached a
/// terminal [`Status`] are reused by later requests and only revisited after an
/// explicit [`TypecheckerState::reset`].
#[derive(Debug, Clone, Default)]
pub struct TypecheckerState {
    definitions: HashMap<DefId, Definition>,
}

impl TypecheckerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a definition, replacing a previous record for the same handle.
    pub fn record(&mut self, def: impl Into<Definition>) -> Option<Definition> {
        let def = def.into();
        self.definitions.insert(def.id(), def)
    }

    pub fn get(&self, id: DefId) -> Option<&Definition> {
        self.definitions.get(&id)
    }

    pub fn get_mut(&mut self, id: DefId) -> Option<&mut Definition> {
        self.definitions.get_mut(&id)
    }

    pub fn contains(&self, id: DefId) -> bool {
        self.definitions.contains_key(&id)
    }

    pub fn status(&self, id: DefId) -> Option<Status> {
        self.get(id).map(Definition::status)
    }

    /// True once the definition reached a terminal status.
    pub fn is_typechecked(&self, id: DefId) -> bool {
        self.status(id).is_some_and(Status::is_terminal)
    }

    /// Forgets a definition so that the next request elaborates it again.
    pub fn reset(&mut self, id: DefId) -> Option<Definition> {
        self.definitions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    /// Name of a definition for diagnostics.
    pub fn name(&self, id: DefId) -> String {
        self.get(id)
            .map(|def| def.name().to_owned())
            .unwrap_or_else(|| id.to_string())
    }

    /// The class a handle denotes, looking through class synonyms.
    pub fn resolve_class(&self, id: DefId) -> Option<&ClassDef> {
        let mut current = id;
        // synonyms of synonyms are allowed, cycles are not
        for _ in 0..=self.definitions.len() {
            match self.get(current)? {
                Definition::Class(class) => return Some(class),
                Definition::ClassSynonym(synonym) => current = synonym.underlying,
                _ => return None,
            }
        }
        None
    }

    /// The field a handle denotes, looking through field synonyms.
    pub fn resolve_field(&self, id: DefId) -> Option<DefId> {
        let mut current = id;
        for _ in 0..=self.definitions.len() {
            match self.get(current)? {
                Definition::Field(field) => return Some(field.id),
                Definition::FieldSynonym(synonym) => current = synonym.underlying,
                _ => return None,
            }
        }
        None
    }

    /// Reflexive, transitive sub-class relation.
    pub fn is_subclass(&self, sub: DefId, sup: DefId) -> bool {
        let mut stack = vec![sub];
        let mut seen = Vec::new();
        while let Some(current) = stack.pop() {
            if current == sup {
                return true;
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(class) = self.resolve_class(current) {
                if class.id == sup {
                    return true;
                }
                stack.extend(class.super_classes.iter().copied());
            }
        }
        false
    }

    /// The type of a global reference, if its header is available.
    pub fn type_of(&self, id: DefId) -> Option<Expr> {
        match self.get(id)? {
            Definition::Function(function) => {
                let result = function.result_type.clone()?;
                Some(function.params.pi(result))
            }
            Definition::Data(data) => {
                let sort = data.sort?;
                Some(data.params.pi(Expr::Universe(sort)))
            }
            Definition::Constructor(constructor) => Some(constructor.ty()),
            Definition::Class(class) => Some(Expr::Universe(class.sort)),
            Definition::Field(field) => Some(field.ty.clone()),
            Definition::Instance(instance) => {
                let result = instance.result_type.clone()?;
                Some(instance.params.pi(result))
            }
            Definition::ClassSynonym(synonym) => self.type_of(synonym.underlying),
            Definition::FieldSynonym(synonym) => self.type_of(synonym.underlying),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Binder, ClassSynonymDef, DataDef, FieldDef, FieldSynonymDef, FunctionDef, Sort, Telescope,
    };

    fn id(n: u32) -> DefId {
        DefId::from_raw(n)
    }

    #[test]
    fn record_replaces_and_reset_forgets() {
        let mut state = TypecheckerState::new();
        let mut f = FunctionDef::new(id(1), "f");
        f.status = Status::BodyNeedsTypechecking;
        assert!(state.record(f.clone()).is_none());
        assert!(!state.is_typechecked(id(1)));

        f.status = Status::NoErrors;
        assert!(state.record(f).is_some());
        assert!(state.is_typechecked(id(1)));

        assert!(state.reset(id(1)).is_some());
        assert!(!state.contains(id(1)));
    }

    #[test]
    fn types_of_globals() {
        let mut state = TypecheckerState::new();
        let nat = id(1);
        let mut data = DataDef::new(nat, "Nat");
        data.sort = Some(Sort::SET0);
        state.record(data);

        let mut f = FunctionDef::new(id(2), "f");
        f.params = Telescope(vec![Binder::new("n", Expr::Def(nat))]);
        f.result_type = Some(Expr::Def(nat));
        state.record(f);

        assert_eq!(state.type_of(nat), Some(Expr::Universe(Sort::SET0)));
        assert_eq!(
            state.type_of(id(2)),
            Some(Expr::pi("n", Expr::Def(nat), Expr::Def(nat)))
        );
        assert_eq!(state.type_of(id(3)), None);
    }

    #[test]
    fn synonyms_resolve_to_underlying() {
        let mut state = TypecheckerState::new();
        let (base, sub, syn, field, field_syn) = (id(1), id(2), id(3), id(4), id(5));

        state.record(ClassDef::new(base, "Base"));
        let mut derived = ClassDef::new(sub, "Sub");
        derived.super_classes.push(base);
        state.record(derived);
        state.record(ClassSynonymDef {
            id: syn,
            name: "Syn".into(),
            status: Status::NoErrors,
            underlying: sub,
            fields: Default::default(),
        });
        state.record(FieldDef {
            id: field,
            name: "x".into(),
            status: Status::NoErrors,
            class: base,
            ty: Expr::pi("this", Expr::class_call(base), Expr::Universe(Sort::SET0)),
            sort: Sort::set(1),
        });
        state.record(FieldSynonymDef {
            id: field_syn,
            name: "y".into(),
            status: Status::NoErrors,
            synonym: syn,
            underlying: field,
        });

        assert_eq!(state.resolve_class(syn).map(|c| c.id), Some(sub));
        assert_eq!(state.resolve_field(field_syn), Some(field));
        assert!(state.is_subclass(syn, base));
        assert!(state.is_subclass(sub, sub));
        assert!(!state.is_subclass(base, sub));
    }
}
