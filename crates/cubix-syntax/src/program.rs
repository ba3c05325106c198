use std::collections::HashMap;

use cubix_core::{DefId, Name};

use crate::{ConcreteDef, Decl};

/// What a handle refers to in the concrete program.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Definition(ConcreteDef),
    Constructor { data: DefId, name: Name },
    Field { class: DefId, name: Name },
    FieldSynonym { synonym: DefId, name: Name },
}

/// The concrete definitions of a program, indexed by handle.
#[derive(Debug, Clone, Default)]
pub struct Program {
    entries: HashMap<DefId, Entry>,
    order: Vec<DefId>,
    next_id: u32,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh handle.
    pub fn fresh(&mut self) -> DefId {
        let id = DefId::from_raw(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds a definition together with the constructors, fields and field synonyms it
    /// owns.
    pub fn add(&mut self, def: ConcreteDef) -> DefId {
        let id = def.id;
        self.next_id = self.next_id.max(id.id() + 1);

        let mut owned = Vec::new();
        match &def.decl {
            Decl::Data(data) => owned.extend(data.constructors().map(|c| {
                (c.id, Entry::Constructor {
                    data: id,
                    name: c.name.clone(),
                })
            })),
            Decl::Class(class) => owned.extend(class.fields.iter().map(|f| {
                (f.id, Entry::Field {
                    class: id,
                    name: f.name.clone(),
                })
            })),
            Decl::ClassSynonym(synonym) => owned.extend(synonym.fields.iter().map(|f| {
                (f.id, Entry::FieldSynonym {
                    synonym: id,
                    name: f.name.clone(),
                })
            })),
            Decl::Function(_) | Decl::Instance(_) => {}
        }
        for (owned_id, entry) in owned {
            self.next_id = self.next_id.max(owned_id.id() + 1);
            self.entries.insert(owned_id, entry);
        }

        if !self.entries.contains_key(&id) {
            self.order.push(id);
        }
        self.entries.insert(id, Entry::Definition(def));
        id
    }

    pub fn entry(&self, id: DefId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// The top-level concrete definition behind a handle.
    pub fn definition(&self, id: DefId) -> Option<&ConcreteDef> {
        match self.entries.get(&id)? {
            Entry::Definition(def) => Some(def),
            _ => None,
        }
    }

    /// Top-level definitions in the order they were added.
    pub fn definitions(&self) -> impl Iterator<Item = &ConcreteDef> {
        self.order.iter().filter_map(|id| self.definition(*id))
    }

    /// The definition owning a constructor, field or field synonym.
    pub fn owner(&self, id: DefId) -> Option<DefId> {
        match self.entries.get(&id)? {
            Entry::Definition(_) => None,
            Entry::Constructor { data, .. } => Some(*data),
            Entry::Field { class, .. } => Some(*class),
            Entry::FieldSynonym { synonym, .. } => Some(*synonym),
        }
    }

    pub fn name(&self, id: DefId) -> Option<&str> {
        match self.entries.get(&id)? {
            Entry::Definition(def) => Some(&def.name),
            Entry::Constructor { name, .. }
            | Entry::Field { name, .. }
            | Entry::FieldSynonym { name, .. } => Some(name),
        }
    }

    pub fn is_class(&self, id: DefId) -> bool {
        self.definition(id)
            .is_some_and(|def| matches!(def.decl, Decl::Class(_)))
    }

    /// The nearest class that has a non-static definition on the way up from `id`.
    ///
    /// Static-ness only matters for the definition sitting directly in a class; a
    /// static definition nested in a class member still sees the class through it.
    pub fn enclosing_class(&self, id: DefId) -> Option<DefId> {
        let def = self.definition(id)?;
        let parent = def.parent?;
        if self.is_class(parent) && !def.is_static {
            Some(parent)
        } else {
            self.enclosing_class(parent)
        }
    }

    /// Instances declared inside a class.
    pub fn instances_of(&self, class: DefId) -> &[DefId] {
        match self.definition(class).map(|def| &def.decl) {
            Some(Decl::Class(class)) => &class.instances,
            _ => &[],
        }
    }
}
