use cubix_core::{Expr, InstanceDef, Status, Telescope};
use cubix_syntax::{ConcreteDef, InstanceDecl, Term};
use log::debug;

use crate::{
    check::Checker,
    elaborate::{Elaborator, Phase},
    error::{ElabError, TypeError},
};

impl<'a> Elaborator<'a> {
    pub(super) fn instance(&mut self, def: &'a ConcreteDef, decl: &'a InstanceDecl, recursive: bool) {
        if self.state.is_typechecked(def.id) {
            return;
        }
        if recursive {
            self.recursive_instance(def);
            return;
        }

        let mut instance = InstanceDef {
            id: def.id,
            name: def.name.clone(),
            status: Status::HeaderHasErrors,
            params: Telescope::new(),
            result_type: None,
        };
        let mut checker = Checker::new(&*self.state, self.program);
        if let Err(err) = checker.check_params(&decl.params) {
            self.reporter.error(Phase::Header.wrap(err), def.loc);
            self.state.record(instance);
            return;
        }
        instance.params = checker.ctx.telescope_from(0);

        let Term::ClassExt(class, implementations) = &decl.result else {
            let err = match checker.infer(&decl.result) {
                Ok((expr, _)) => TypeError::NotAClass(checker.pretty(&expr)),
                Err(err) => err,
            };
            self.reporter.error(Phase::Header.wrap(err), def.loc);
            self.state.record(instance);
            return;
        };

        let call = match checker.class_ext(*class, implementations) {
            Ok(Some((call, _))) => call,
            Ok(None) => {
                self.mark_soft(def.id, true);
                self.state.record(instance);
                return;
            }
            Err(err) => {
                self.reporter.error(Phase::Header.wrap(err), def.loc);
                self.state.record(instance);
                return;
            }
        };
        let soft = checker.has_soft_errors() || self.is_soft(def);

        let missing: Vec<String> = self
            .state
            .resolve_class(call.class)
            .map(|class| {
                class
                    .fields
                    .iter()
                    .filter(|field| {
                        !class.is_implemented(**field) && !call.implementations.contains_key(*field)
                    })
                    .map(|field| self.state.name(*field))
                    .collect()
            })
            .unwrap_or_default();

        instance.status = if missing.is_empty() {
            Status::after_body(true, soft)
        } else {
            self.reporter.error(ElabError::NotImplemented(missing), def.loc);
            Status::HasErrors
        };
        instance.result_type = Some(Expr::ClassCall(call));

        debug!("instance {} is {}", def.name, instance.status);
        self.state.record(instance);
    }

    /// Rejects an instance that is part of a recursive group.
    pub(super) fn recursive_instance(&mut self, def: &'a ConcreteDef) {
        if self.state.is_typechecked(def.id) {
            return;
        }
        self.reporter.error(ElabError::RecursiveInstance, def.loc);
        self.record_failed(def.id);
    }
}
