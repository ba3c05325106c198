//! The typechecking front: feeds the units found by the [`Ordering`] to the
//! [`Elaborator`] and turns header cycles into reported errors.

use cubix_core::{DefId, TypecheckerState};
use cubix_span::Report;
use cubix_syntax::Program;
use log::{debug, trace, warn};

use crate::{
    elaborate::{Elaborator, Reporter},
    error::ElabError,
    external::Externals,
    order::{HeaderCycle, Ordering, OrderingListener, Scc, Unit},
};

pub struct Typechecking<'a> {
    elaborator: Elaborator<'a>,
}

impl<'a> Typechecking<'a> {
    pub fn new(elaborator: Elaborator<'a>) -> Self {
        Self { elaborator }
    }

    pub fn elaborator(&mut self) -> &mut Elaborator<'a> {
        &mut self.elaborator
    }

    pub fn elaborated(&self) -> usize {
        self.elaborator.elaborated()
    }

    /// Elaborates `root` and everything it needs.
    ///
    /// Returns `false` if a header cycle was met on the way. The members of the cycle
    /// are then recorded with header errors and the request is retried, so the rest of
    /// the dependencies of `root` are still elaborated.
    pub fn typecheck(&mut self, ordering: &mut Ordering<'_>, root: DefId) -> bool {
        let mut clean = true;
        loop {
            match ordering.order(root, self) {
                Ok(()) => return clean,
                Err(HeaderCycle(members)) => {
                    clean = false;
                    if !self.header_cycle(&members) {
                        return false;
                    }
                }
            }
        }
    }

    /// Reports a header cycle on each of its members. Returns `false` if none of them
    /// could be recorded, in which case retrying would find the same cycle again.
    fn header_cycle(&mut self, members: &[DefId]) -> bool {
        let program = self.elaborator.program();
        let names: Vec<String> = members
            .iter()
            .filter_map(|id| program.definition(*id))
            .map(|def| def.name.clone())
            .collect();
        warn!("header cycle through {}", names.join(", "));

        let mut recorded = false;
        for &id in members {
            let Some(def) = program.definition(id) else {
                continue;
            };
            if self.elaborator.state().is_typechecked(id) {
                continue;
            }
            self.elaborator
                .reporter()
                .error(ElabError::HeaderCycle(names.clone()), def.loc);
            self.elaborator.record_failed(id);
            recorded = true;
        }
        recorded
    }
}

impl OrderingListener for Typechecking<'_> {
    fn state(&self) -> &TypecheckerState {
        self.elaborator.state()
    }

    fn already_typechecked(&mut self, id: DefId) {
        trace!("{id} is already typechecked");
    }

    fn unit_found(&mut self, unit: Unit, recursive: bool) {
        let id = unit.typecheckable.id;
        if unit.typecheckable.header {
            self.elaborator.elaborate_header(id);
        } else {
            self.elaborator.elaborate_unit(id, recursive);
        }
    }

    fn scc_found(&mut self, scc: Scc) {
        if let [unit] = scc.units.as_slice()
            && unit.typecheckable.header
        {
            self.elaborator.elaborate_header(unit.typecheckable.id);
            return;
        }

        let (headers, bodies): (Vec<Unit>, Vec<Unit>) = scc
            .units
            .iter()
            .partition(|unit| unit.typecheckable.header);
        let headers: Vec<DefId> = headers.iter().map(|unit| unit.typecheckable.id).collect();
        let bodies: Vec<DefId> = bodies.iter().map(|unit| unit.typecheckable.id).collect();
        let headers: Vec<DefId> = headers
            .into_iter()
            .filter(|id| !bodies.contains(id))
            .collect();
        debug!("recursive group: headers {headers:?}, bodies {bodies:?}");
        self.elaborator.elaborate_group(&headers, &bodies);
    }
}

/// Elaborates `roots` in order over a shared state. Returns the number of definitions
/// elaborated.
pub fn typecheck(
    program: &Program,
    state: &mut TypecheckerState,
    report: &mut Report,
    externals: &Externals,
    roots: &[DefId],
) -> usize {
    let elaborator = Elaborator::new(program, state, Reporter::new(report, None), externals);
    let mut typechecking = Typechecking::new(elaborator);
    let mut ordering = Ordering::new(program);
    for root in roots {
        typechecking.typecheck(&mut ordering, *root);
    }
    typechecking.elaborated()
}
