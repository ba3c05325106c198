use std::rc::Rc;

use cubix_core::{DefId, Name, Sort};
use cubix_span::{Loc, Located};
use enum_as_inner::EnumAsInner;

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Local(Name),
    Global(DefId),
    Universe(Sort),
    Pi(Vec<Param>, Box<Term>),
    Lam(Vec<LamParam>, Box<Term>),
    App(Box<Term>, Vec<Term>),
    /// `C { | f => t ... }`
    ClassExt(DefId, Vec<FieldImpl>),
    Interval,
    Left,
    Right,
}

/// `(a b : A)`; a parameter without a type is only legal where it can be inferred.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub names: Vec<Name>,
    pub ty: Option<Term>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LamParam {
    pub name: Name,
    pub ty: Option<Term>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldImpl {
    pub field: DefId,
    pub term: Term,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A variable; `_` binds nothing nameable.
    Var(Name),
    Con(DefId, Vec<Pattern>),
    Left,
    Right,
}

/// `| patterns => rhs`; an absent right-hand side is an absurd clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub patterns: Vec<Pattern>,
    pub rhs: Option<Term>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Term(Term),
    /// `\elim x y` followed by clauses; no eliminated names means all parameters.
    Elim {
        eliminated: Vec<Name>,
        clauses: Vec<Clause>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub params: Vec<Param>,
    pub result_type: Option<Term>,
    pub body: FunctionBody,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub id: DefId,
    pub name: Name,
    pub params: Vec<Param>,
    /// Conditions: a constructor may compute on some of its arguments.
    pub eliminated: Vec<Name>,
    pub clauses: Vec<Clause>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorClause {
    pub patterns: Option<Vec<Pattern>>,
    pub constructors: Vec<ConstructorDecl>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataDecl {
    pub params: Vec<Param>,
    pub universe: Option<Term>,
    pub truncated: bool,
    pub eliminated: Option<Vec<Name>>,
    pub clauses: Vec<ConstructorClause>,
}

impl DataDecl {
    pub fn constructors(&self) -> impl Iterator<Item = &ConstructorDecl> {
        self.clauses.iter().flat_map(|clause| &clause.constructors)
    }
}

/// A field type is written with `this` bound to the enclosing class. Consecutive
/// fields declared together share one type term.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: DefId,
    pub name: Name,
    pub ty: Rc<Term>,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub super_classes: Vec<Located<DefId>>,
    pub fields: Vec<FieldDecl>,
    /// Implementations see `this` bound to the class being defined.
    pub implementations: Vec<FieldImpl>,
    pub coercing_field: Option<DefId>,
    pub instances: Vec<DefId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceDecl {
    pub params: Vec<Param>,
    /// A class extension expression.
    pub result: Term,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSynonymDecl {
    pub id: DefId,
    pub name: Name,
    pub underlying: DefId,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynonymDecl {
    pub underlying: Located<DefId>,
    pub super_classes: Vec<Located<DefId>>,
    pub fields: Vec<FieldSynonymDecl>,
}

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum Decl {
    Function(FunctionDecl),
    Data(DataDecl),
    Class(ClassDecl),
    Instance(InstanceDecl),
    ClassSynonym(SynonymDecl),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteDef {
    pub id: DefId,
    pub name: Name,
    pub loc: Loc,
    pub parent: Option<DefId>,
    pub is_static: bool,
    /// Set when the source of the definition was malformed.
    pub has_errors: bool,
    pub decl: Decl,
}

impl ConcreteDef {
    pub fn new(id: DefId, name: impl Into<Name>, loc: Loc, decl: Decl) -> Self {
        Self {
            id,
            name: name.into(),
            loc,
            parent: None,
            is_static: true,
            has_errors: false,
            decl,
        }
    }

    /// Definitions with a header are elaborated in two phases so that recursive
    /// references can use the declared type before the body is known.
    pub fn has_header(&self) -> bool {
        match &self.decl {
            Decl::Function(function) => function.result_type.is_some(),
            Decl::Data(data) => data.universe.is_some(),
            Decl::Class(_) | Decl::Instance(_) | Decl::ClassSynonym(_) => false,
        }
    }

    pub fn params(&self) -> &[Param] {
        match &self.decl {
            Decl::Function(function) => &function.params,
            Decl::Data(data) => &data.params,
            Decl::Instance(instance) => &instance.params,
            Decl::Class(_) | Decl::ClassSynonym(_) => &[],
        }
    }
}
