//! Elaborated definitions.

use derive_more::{Display, From};
use enum_as_inner::EnumAsInner;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Body, CorePattern, DefId, Expr, Name, Sort, Telescope};

/// Progress of a definition through elaboration.
///
/// A definition starts out needing its header checked, moves to
/// [`Status::BodyNeedsTypechecking`] once the header is accepted, and ends in one of the
/// four terminal statuses. Transitions are pure functions of the previous status and
/// the outcome of the phase that just ran.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[display("needs-typechecking")]
    HeaderNeedsTypechecking,
    #[display("header-ok")]
    BodyNeedsTypechecking,
    #[display("header-has-errors")]
    HeaderHasErrors,
    #[display("body-has-errors")]
    BodyHasErrors,
    #[display("has-errors")]
    HasErrors,
    #[display("no-errors")]
    NoErrors,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::HeaderHasErrors | Status::BodyHasErrors | Status::HasErrors | Status::NoErrors
        )
    }

    pub fn header_is_ok(self) -> bool {
        !matches!(
            self,
            Status::HeaderNeedsTypechecking | Status::HeaderHasErrors
        )
    }

    pub fn has_errors(self) -> bool {
        matches!(
            self,
            Status::HeaderHasErrors | Status::BodyHasErrors | Status::HasErrors
        )
    }

    pub fn after_header(header_ok: bool) -> Status {
        if header_ok {
            Status::BodyNeedsTypechecking
        } else {
            Status::HeaderHasErrors
        }
    }

    /// Final status of a definition whose header was accepted.
    pub fn after_body(body_ok: bool, soft_errors: bool) -> Status {
        match (body_ok, soft_errors) {
            (false, _) => Status::BodyHasErrors,
            (true, true) => Status::HasErrors,
            (true, false) => Status::NoErrors,
        }
    }

    /// Demotes a clean status to [`Status::HasErrors`]; other statuses are kept.
    pub fn with_soft_errors(self, soft_errors: bool) -> Status {
        if soft_errors && self == Status::NoErrors {
            Status::HasErrors
        } else {
            self
        }
    }
}

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefinitionKind {
    #[display("function")]
    Function,
    #[display("data type")]
    Data,
    #[display("constructor")]
    Constructor,
    #[display("class")]
    Class,
    #[display("field")]
    Field,
    #[display("instance")]
    Instance,
    #[display("class synonym")]
    ClassSynonym,
    #[display("field synonym")]
    FieldSynonym,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub params: Telescope,
    pub result_type: Option<Expr>,
    pub body: Option<Body>,
}

impl FunctionDef {
    pub fn new(id: DefId, name: impl Into<Name>) -> Self {
        Self {
            id,
            name: name.into(),
            status: Status::HeaderNeedsTypechecking,
            params: Telescope::new(),
            result_type: None,
            body: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub params: Telescope,
    pub sort: Option<Sort>,
    pub constructors: Vec<DefId>,
    /// One entry per parameter.
    pub covariant: Vec<bool>,
    pub matches_on_interval: bool,
    pub truncated: bool,
}

impl DataDef {
    pub fn new(id: DefId, name: impl Into<Name>) -> Self {
        Self {
            id,
            name: name.into(),
            status: Status::HeaderNeedsTypechecking,
            params: Telescope::new(),
            sort: None,
            constructors: Vec::new(),
            covariant: Vec::new(),
            matches_on_interval: false,
            truncated: false,
        }
    }

    pub fn is_covariant(&self, index: usize) -> bool {
        self.covariant.get(index).copied().unwrap_or(false)
    }
}

/// A constructor lives in the context `data_params`: the parameters of its data type,
/// or the variables bound by its patterns when the data type matches on parameters.
/// `data_args` are the arguments of the data type it constructs in that context.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub data: DefId,
    pub data_params: Telescope,
    pub data_args: Vec<Expr>,
    pub patterns: Option<Vec<CorePattern>>,
    pub params: Telescope,
    pub body: Option<Body>,
}

impl ConstructorDef {
    /// `Pi data_params. Pi params. D data_args`
    pub fn ty(&self) -> Expr {
        let args = self.data_args.iter().map(|arg| arg.shift(self.params.len()));
        let result = Expr::app(Expr::Def(self.data), args);
        self.data_params.pi(self.params.pi(result))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub super_classes: Vec<DefId>,
    /// All fields, inherited ones first.
    pub fields: Vec<DefId>,
    pub personal_fields: Vec<DefId>,
    /// Implementations as functions of `this`.
    pub implemented: IndexMap<DefId, Expr>,
    pub coercing_field: Option<DefId>,
    pub sort: Sort,
}

impl ClassDef {
    pub fn new(id: DefId, name: impl Into<Name>) -> Self {
        Self {
            id,
            name: name.into(),
            status: Status::HeaderNeedsTypechecking,
            super_classes: Vec::new(),
            fields: Vec::new(),
            personal_fields: Vec::new(),
            implemented: IndexMap::new(),
            coercing_field: None,
            sort: Sort::PROP,
        }
    }

    pub fn is_implemented(&self, field: DefId) -> bool {
        self.implemented.contains_key(&field)
    }

    pub fn has_field(&self, field: DefId) -> bool {
        self.fields.contains(&field)
    }
}

/// A field has type `Pi (this : C). T`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub class: DefId,
    pub ty: Expr,
    /// Sort of `T`.
    pub sort: Sort,
}

impl FieldDef {
    /// The type of the field with `this` as the innermost variable.
    pub fn codomain(&self) -> &Expr {
        match &self.ty {
            Expr::Pi { codomain, .. } => codomain,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub params: Telescope,
    pub result_type: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSynonymDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub underlying: DefId,
    /// Field synonym to underlying field.
    pub fields: IndexMap<DefId, DefId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSynonymDef {
    pub id: DefId,
    pub name: Name,
    pub status: Status,
    pub synonym: DefId,
    pub underlying: DefId,
}

#[derive(Debug, Clone, PartialEq, From, EnumAsInner)]
pub enum Definition {
    Function(FunctionDef),
    Data(DataDef),
    Constructor(ConstructorDef),
    Class(ClassDef),
    Field(FieldDef),
    Instance(InstanceDef),
    ClassSynonym(ClassSynonymDef),
    FieldSynonym(FieldSynonymDef),
}

macro_rules! each_variant {
    ($self:expr, $def:ident => $body:expr) => {
        match $self {
            Definition::Function($def) => $body,
            Definition::Data($def) => $body,
            Definition::Constructor($def) => $body,
            Definition::Class($def) => $body,
            Definition::Field($def) => $body,
            Definition::Instance($def) => $body,
            Definition::ClassSynonym($def) => $body,
            Definition::FieldSynonym($def) => $body,
        }
    };
}

impl Definition {
    pub fn id(&self) -> DefId {
        each_variant!(self, def => def.id)
    }

    pub fn name(&self) -> &str {
        each_variant!(self, def => &def.name)
    }

    pub fn status(&self) -> Status {
        each_variant!(self, def => def.status)
    }

    pub fn set_status(&mut self, status: Status) {
        each_variant!(self, def => def.status = status)
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::Function(_) => DefinitionKind::Function,
            Definition::Data(_) => DefinitionKind::Data,
            Definition::Constructor(_) => DefinitionKind::Constructor,
            Definition::Class(_) => DefinitionKind::Class,
            Definition::Field(_) => DefinitionKind::Field,
            Definition::Instance(_) => DefinitionKind::Instance,
            Definition::ClassSynonym(_) => DefinitionKind::ClassSynonym,
            Definition::FieldSynonym(_) => DefinitionKind::FieldSynonym,
        }
    }
}
