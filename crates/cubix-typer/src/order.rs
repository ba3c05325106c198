//! Dependency ordering of definitions.
//!
//! Definitions are explored depth first from a requested root, following the global
//! references of their concrete syntax. Tarjan's algorithm groups mutually recursive
//! definitions into strongly connected components, which are handed to an
//! [`OrderingListener`] in dependency order.
//!
//! A definition with a declared type is split into two units: its header, which only
//! depends on the parts needed to know its type, and its body. Recursion through
//! bodies is allowed; recursion through headers is not.

use std::collections::HashMap;

use cubix_core::{DefId, TypecheckerState};
use cubix_syntax::{Decl, Entry, Program, dependencies};
use cubix_utils::visit::has_cycle;
use derive_more::Display;
use indexmap::IndexSet;
use log::trace;
use thiserror::Error;

/// Either the header or the whole of a definition.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("{id}{}", if *header { " (header)" } else { "" })]
pub struct Typecheckable {
    pub id: DefId,
    pub header: bool,
}

impl Typecheckable {
    pub fn new(id: DefId) -> Self {
        Self { id, header: false }
    }

    pub fn header(id: DefId) -> Self {
        Self { id, header: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub typecheckable: Typecheckable,
    pub enclosing_class: Option<DefId>,
}

/// A group of mutually dependent units, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scc {
    pub units: Vec<Unit>,
}

impl Scc {
    /// The distinct definitions of the group.
    pub fn definitions(&self) -> Vec<DefId> {
        self.units
            .iter()
            .map(|unit| unit.typecheckable.id)
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }
}

/// The declared types of these definitions depend on each other.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cycle through the headers of {0:?}")]
pub struct HeaderCycle(pub Vec<DefId>);

pub trait OrderingListener {
    fn state(&self) -> &TypecheckerState;

    fn already_typechecked(&mut self, _id: DefId) {}

    fn depends_on(&mut self, _unit: Typecheckable, _dependency: DefId) {}

    /// A unit that is not part of a cycle; `recursive` if it refers to itself.
    fn unit_found(&mut self, unit: Unit, recursive: bool);

    fn scc_found(&mut self, scc: Scc);
}

#[derive(Debug, Clone, Copy)]
struct Vertex {
    index: usize,
    lowlink: usize,
    on_stack: bool,
}

#[derive(Debug)]
pub struct Ordering<'p> {
    program: &'p Program,
    index: usize,
    stack: Vec<Unit>,
    vertices: HashMap<Typecheckable, Vertex>,
}

impl<'p> Ordering<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            index: 0,
            stack: Vec::new(),
            vertices: HashMap::new(),
        }
    }

    /// Orders `id` and everything it depends on that is not typechecked yet.
    ///
    /// On a header cycle nothing more is dispatched for this request and the
    /// exploration state is discarded, so that the ordering can be reused once the
    /// members of the cycle have been dealt with.
    pub fn order<L: OrderingListener>(&mut self, id: DefId, listener: &mut L) -> Result<(), HeaderCycle> {
        let id = match self.program.entry(id) {
            Some(Entry::Definition(_)) => id,
            Some(_) => match translate(self.program, id, None).first() {
                Some(owner) => *owner,
                None => return Ok(()),
            },
            None => return Ok(()),
        };
        if listener.state().is_typechecked(id) {
            listener.already_typechecked(id);
            return Ok(());
        }

        let typecheckable = Typecheckable::new(id);
        if self.vertices.contains_key(&typecheckable) {
            return Ok(());
        }
        let result = self.explore(typecheckable, listener).map(|_| ());
        if result.is_err() {
            self.index = 0;
            self.stack.clear();
            self.vertices.clear();
        }
        result
    }

    /// Returns false only for a header that was not dispatched as its own component.
    fn update<L: OrderingListener>(
        &mut self,
        current: Typecheckable,
        dependency: Typecheckable,
        listener: &mut L,
    ) -> Result<bool, HeaderCycle> {
        if listener.state().is_typechecked(dependency.id) {
            return Ok(true);
        }

        let mut ok = true;
        let lowlink = match self.vertices.get(&dependency).copied() {
            None => {
                ok = self.explore(dependency, listener)?;
                self.vertices.get(&dependency).map(|vertex| vertex.lowlink)
            }
            Some(vertex) if vertex.on_stack => Some(vertex.index),
            Some(_) => None,
        };
        if let Some(lowlink) = lowlink
            && let Some(vertex) = self.vertices.get_mut(&current)
        {
            vertex.lowlink = vertex.lowlink.min(lowlink);
        }
        Ok(ok)
    }

    fn explore<L: OrderingListener>(
        &mut self,
        typecheckable: Typecheckable,
        listener: &mut L,
    ) -> Result<bool, HeaderCycle> {
        let program = self.program;
        let Some(def) = program.definition(typecheckable.id) else {
            return Ok(true);
        };
        let enclosing_class = program.enclosing_class(typecheckable.id);
        let unit = Unit {
            typecheckable,
            enclosing_class,
        };
        let index = self.index;
        self.index += 1;
        self.vertices.insert(typecheckable, Vertex {
            index,
            lowlink: index,
            on_stack: true,
        });
        self.stack.push(unit);
        trace!("exploring {typecheckable}");

        let mut deps = IndexSet::new();
        deps.extend(enclosing_class);

        let mut header = None;
        if !typecheckable.header && def.has_header() {
            let unit_header = Typecheckable::header(typecheckable.id);
            if !self.update(typecheckable, unit_header, listener)? {
                header = Some(unit_header);
            }
        }

        deps.extend(dependencies(def, typecheckable.header));
        let mut recursive = false;
        for referable in deps {
            // Fields of the class being explored are part of it.
            if let Some(Entry::Field { class, .. }) = program.entry(referable)
                && *class == typecheckable.id
            {
                continue;
            }
            for dependency in translate(program, referable, enclosing_class) {
                // An instance reaches itself through the instances of its class.
                if dependency == typecheckable.id
                    && dependency != referable
                    && program.is_class(referable)
                {
                    continue;
                }
                if dependency == typecheckable.id {
                    if typecheckable.header {
                        return Err(HeaderCycle(vec![dependency]));
                    }
                    recursive = true;
                } else {
                    listener.depends_on(typecheckable, dependency);
                    self.update(typecheckable, Typecheckable::new(dependency), listener)?;
                }
            }
        }

        let lowlink = self
            .vertices
            .get(&typecheckable)
            .map_or(index, |vertex| vertex.lowlink);
        let mut scc = None;
        if lowlink == index {
            let mut units = Vec::new();
            while let Some(popped) = self.stack.pop() {
                if let Some(vertex) = self.vertices.get_mut(&popped.typecheckable) {
                    vertex.on_stack = false;
                }
                units.push(popped);
                if popped.typecheckable == typecheckable {
                    break;
                }
            }
            units.reverse();

            if units.len() == 1 {
                if typecheckable.header {
                    return Ok(false);
                }
                listener.unit_found(unit, recursive);
                return Ok(true);
            }
            scc = Some(Scc { units });
        }

        if let Some(header) = header {
            listener.scc_found(Scc {
                units: vec![Unit {
                    typecheckable: header,
                    enclosing_class,
                }],
            });
        }
        if let Some(scc) = scc {
            let members = scc.definitions();
            if has_cycle(&members, |id| header_dependencies(program, id)) {
                return Err(HeaderCycle(members));
            }
            listener.scc_found(scc);
        }
        Ok(true)
    }
}

/// The definitions a reference makes the current definition depend on: owners of
/// constructors, fields and field synonyms, and for a class other than the enclosing
/// one also the instances declared in it.
pub fn translate(program: &Program, referable: DefId, enclosing_class: Option<DefId>) -> Vec<DefId> {
    match program.entry(referable) {
        Some(Entry::Constructor { data, .. }) => vec![*data],
        Some(Entry::Field { class, .. }) => vec![*class],
        Some(Entry::FieldSynonym { synonym, .. }) => vec![*synonym],
        Some(Entry::Definition(def))
            if matches!(def.decl, Decl::Class(_)) && Some(referable) != enclosing_class =>
        {
            let mut result = vec![referable];
            result.extend_from_slice(program.instances_of(referable));
            result
        }
        Some(Entry::Definition(_)) => vec![referable],
        None => Vec::new(),
    }
}

/// Definitions the declared type of `id` depends on, excluding `id` itself.
pub fn header_dependencies(program: &Program, id: DefId) -> Vec<DefId> {
    let Some(def) = program.definition(id) else {
        return Vec::new();
    };
    let enclosing_class = program.enclosing_class(id);
    let mut deps: IndexSet<DefId> = IndexSet::new();
    deps.extend(enclosing_class);
    for referable in dependencies(def, true) {
        deps.extend(translate(program, referable, enclosing_class));
    }
    deps.shift_remove(&id);
    deps.into_iter().collect()
}

/// What an [`Ordering`] dispatched, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    AlreadyTypechecked(DefId),
    Unit { unit: Typecheckable, recursive: bool },
    Scc(Vec<Typecheckable>),
}

/// A listener that only records what it is handed.
#[derive(Debug, Default)]
pub struct EventLog {
    pub state: TypecheckerState,
    pub events: Vec<OrderEvent>,
}

impl EventLog {
    pub fn new(state: TypecheckerState) -> Self {
        Self {
            state,
            events: Vec::new(),
        }
    }
}

impl OrderingListener for EventLog {
    fn state(&self) -> &TypecheckerState {
        &self.state
    }

    fn already_typechecked(&mut self, id: DefId) {
        self.events.push(OrderEvent::AlreadyTypechecked(id));
    }

    fn unit_found(&mut self, unit: Unit, recursive: bool) {
        self.events.push(OrderEvent::Unit {
            unit: unit.typecheckable,
            recursive,
        });
    }

    fn scc_found(&mut self, scc: Scc) {
        self.events.push(OrderEvent::Scc(
            scc.units.iter().map(|unit| unit.typecheckable).collect(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use cubix_core::{FunctionDef, Sort, Status};
    use cubix_syntax::{Term, build::*};

    use super::*;

    fn order(program: &Program, roots: &[DefId]) -> (Vec<OrderEvent>, Option<HeaderCycle>) {
        let mut log = EventLog::default();
        let mut ordering = Ordering::new(program);
        for root in roots {
            if let Err(cycle) = ordering.order(*root, &mut log) {
                return (log.events, Some(cycle));
            }
        }
        (log.events, None)
    }

    fn unit(id: DefId, recursive: bool) -> OrderEvent {
        OrderEvent::Unit {
            unit: Typecheckable::new(id),
            recursive,
        }
    }

    #[test]
    fn dependencies_come_first() {
        let mut program = Program::new();
        let a = program.fresh();
        let b = program.fresh();
        program.add(function(a, "a", vec![], None, term_body(global(b))));
        program.add(function(b, "b", vec![], None, term_body(Term::Interval)));

        let (events, cycle) = order(&program, &[a]);
        assert_eq!(cycle, None);
        assert_eq!(events, vec![unit(b, false), unit(a, false)]);
    }

    #[test]
    fn self_reference_is_recursive() {
        let mut program = Program::new();
        let g = program.fresh();
        program.add(function(g, "g", vec![], None, term_body(global(g))));

        let (events, _) = order(&program, &[g]);
        assert_eq!(events, vec![unit(g, true)]);
    }

    #[test]
    fn classes_referring_to_their_own_fields_are_not_recursive() {
        let mut program = Program::new();
        let pointed = program.fresh();
        let carrier = program.fresh();
        let point = program.fresh();
        let mut def = class(
            pointed,
            "Pointed",
            vec![],
            vec![
                field(carrier, "E", set(0)),
                field(point, "pt", app(global(carrier), [local("this")])),
            ],
            vec![],
        );
        if let Decl::Class(decl) = &mut def.decl {
            decl.coercing_field = Some(carrier);
        }
        program.add(def);

        let (events, cycle) = order(&program, &[pointed]);
        assert_eq!(cycle, None);
        assert_eq!(events, vec![unit(pointed, false)]);
    }

    #[test]
    fn mutual_recursion_through_bodies_is_a_group() {
        let mut program = Program::new();
        let f = program.fresh();
        let g = program.fresh();
        program.add(function(f, "f", vec![], Some(set(0)), term_body(global(g))));
        program.add(function(g, "g", vec![], Some(set(0)), term_body(global(f))));

        let (events, cycle) = order(&program, &[f]);
        assert_eq!(cycle, None);
        assert_eq!(
            events,
            vec![
                OrderEvent::Scc(vec![Typecheckable::header(g)]),
                OrderEvent::Scc(vec![Typecheckable::header(f)]),
                OrderEvent::Scc(vec![Typecheckable::new(f), Typecheckable::new(g)]),
            ]
        );
    }

    #[test]
    fn cycles_through_headers_are_rejected() {
        let mut program = Program::new();
        let f = program.fresh();
        let g = program.fresh();
        program.add(function(f, "f", vec![], Some(global(g)), term_body(Term::Interval)));
        program.add(function(g, "g", vec![], Some(global(f)), term_body(Term::Interval)));

        let (events, cycle) = order(&program, &[f]);
        assert!(events.is_empty());
        let HeaderCycle(mut members) = cycle.unwrap();
        members.sort();
        assert_eq!(members, vec![f, g]);
    }

    #[test]
    fn a_header_referring_to_itself_is_a_cycle() {
        let mut program = Program::new();
        let f = program.fresh();
        program.add(function(f, "f", vec![], Some(global(f)), term_body(Term::Interval)));

        let (_, cycle) = order(&program, &[f]);
        assert_eq!(cycle, Some(HeaderCycle(vec![f])));
    }

    #[test]
    fn typechecked_definitions_are_not_revisited() {
        let mut program = Program::new();
        let a = program.fresh();
        let b = program.fresh();
        program.add(function(a, "a", vec![], None, term_body(global(b))));
        program.add(function(b, "b", vec![], None, term_body(Term::Interval)));

        let mut state = TypecheckerState::new();
        let mut done = FunctionDef::new(b, "b");
        done.status = Status::NoErrors;
        done.result_type = Some(cubix_core::Expr::Universe(Sort::SET0));
        state.record(done);

        let mut log = EventLog::new(state);
        let mut ordering = Ordering::new(&program);
        ordering.order(b, &mut log).unwrap();
        ordering.order(a, &mut log).unwrap();
        assert_eq!(log.events, vec![OrderEvent::AlreadyTypechecked(b), unit(a, false)]);
    }

    #[test]
    fn references_are_translated_to_their_owners() {
        let mut program = Program::new();
        let nat = program.fresh();
        let zero = program.fresh();
        let c = program.fresh();
        let x = program.fresh();
        let inst = program.fresh();
        let user = program.fresh();
        program.add(data(nat, "Nat", vec![], None, vec![constructor(zero, "zero", vec![])]));
        let mut class_def = class(c, "C", vec![], vec![field(x, "x", set(0))], vec![]);
        if let Decl::Class(decl) = &mut class_def.decl {
            decl.instances.push(inst);
        }
        program.add(class_def);
        program.add(instance(inst, "inst", vec![], c, vec![implement(x, global(nat))]));
        program.add(function(
            user,
            "user",
            vec![param("i", global(c))],
            None,
            term_body(app(global(x), [local("i")])),
        ));

        assert_eq!(translate(&program, zero, None), vec![nat]);
        assert_eq!(translate(&program, x, None), vec![c]);
        assert_eq!(translate(&program, c, None), vec![c, inst]);
        assert_eq!(translate(&program, c, Some(c)), vec![c]);

        let (events, _) = order(&program, &[user]);
        assert_eq!(
            events,
            vec![unit(c, false), unit(nat, false), unit(inst, false), unit(user, false)]
        );
    }

    #[test]
    fn header_dependencies_skip_bodies() {
        let mut program = Program::new();
        let f = program.fresh();
        let g = program.fresh();
        let h = program.fresh();
        program.add(function(
            f,
            "f",
            vec![param("x", global(g))],
            Some(universe(Sort::PROP)),
            term_body(global(h)),
        ));
        assert_eq!(header_dependencies(&program, f), vec![g]);
    }
}
