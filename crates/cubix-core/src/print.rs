use std::fmt::Write;

use crate::{Expr, TypecheckerState};

/// Renders a core term for diagnostics, naming globals through `state`.
pub fn pretty(expr: &Expr, state: &TypecheckerState) -> String {
    pretty_in(expr, state, [])
}

/// Like [`pretty`], naming free variables after `scope` (outermost first).
pub fn pretty_in<'n>(
    expr: &Expr,
    state: &TypecheckerState,
    scope: impl IntoIterator<Item = &'n str>,
) -> String {
    let mut printer = Printer {
        state,
        names: scope.into_iter().map(str::to_owned).collect(),
        out: String::new(),
    };
    printer.expr(expr, false);
    printer.out
}

struct Printer<'a> {
    state: &'a TypecheckerState,
    names: Vec<String>,
    out: String,
}

impl Printer<'_> {
    fn expr(&mut self, expr: &Expr, atom: bool) {
        match expr {
            Expr::Var(i) => {
                let name = self
                    .names
                    .len()
                    .checked_sub(i + 1)
                    .and_then(|pos| self.names.get(pos))
                    .cloned()
                    .unwrap_or_else(|| format!("#{i}"));
                self.out.push_str(&name);
            }
            Expr::Def(id) => {
                let name = self.state.name(*id);
                self.out.push_str(&name);
            }
            Expr::Universe(sort) => {
                let _ = write!(self.out, "{sort}");
            }
            Expr::Pi {
                name,
                domain,
                codomain,
            } => self.parens(atom, |p| {
                if codomain.has_var(0) {
                    let _ = write!(p.out, "\\Pi ({name} : ");
                    p.expr(domain, false);
                    p.out.push_str(") -> ");
                } else {
                    p.expr(domain, true);
                    p.out.push_str(" -> ");
                }
                p.binder(name, |p| p.expr(codomain, false));
            }),
            Expr::Lam { name, body, .. } => self.parens(atom, |p| {
                let _ = write!(p.out, "\\lam {name} => ");
                p.binder(name, |p| p.expr(body, false));
            }),
            Expr::App(..) => self.parens(atom, |p| {
                let (head, args) = expr.spine();
                p.expr(head, true);
                for arg in args {
                    p.out.push(' ');
                    p.expr(arg, true);
                }
            }),
            Expr::ClassCall(call) | Expr::New(call) => {
                if matches!(expr, Expr::New(_)) {
                    self.out.push_str("\\new ");
                }
                let name = self.state.name(call.class);
                self.out.push_str(&name);
                if !call.implementations.is_empty() {
                    self.out.push_str(" {");
                    for (field, implementation) in &call.implementations {
                        let field = self.state.name(*field);
                        let _ = write!(self.out, " | {field} => ");
                        self.expr(implementation, false);
                    }
                    self.out.push_str(" }");
                }
            }
            Expr::Interval => self.out.push('I'),
            Expr::Left => self.out.push_str("left"),
            Expr::Right => self.out.push_str("right"),
            Expr::Error => self.out.push_str("{?error}"),
        }
    }

    fn parens(&mut self, atom: bool, f: impl FnOnce(&mut Self)) {
        if atom {
            self.out.push('(');
        }
        f(self);
        if atom {
            self.out.push(')');
        }
    }

    fn binder(&mut self, name: &str, f: impl FnOnce(&mut Self)) {
        self.names.push(name.to_owned());
        f(self);
        self.names.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataDef, DefId, Sort};

    #[test]
    fn prints_names_and_binders() {
        let mut state = TypecheckerState::new();
        let nat = DefId::from_raw(1);
        state.record(DataDef::new(nat, "Nat"));

        let ty = Expr::pi(
            "A",
            Expr::Universe(Sort::SET0),
            Expr::pi("x", Expr::Var(0), Expr::Def(nat)),
        );
        assert_eq!(pretty(&ty, &state), "\\Pi (A : \\Set0) -> A -> Nat");
    }

    #[test]
    fn free_variables_use_the_scope() {
        let state = TypecheckerState::new();
        let e = Expr::app(Expr::Var(0), [Expr::Var(1)]);
        assert_eq!(pretty_in(&e, &state, ["f", "x"]), "x f");
    }

    #[test]
    fn unknown_globals_print_their_handle() {
        let state = TypecheckerState::new();
        let e = Expr::app(Expr::Def(DefId::from_raw(9)), [Expr::Left]);
        assert_eq!(pretty(&e, &state), "#9 left");
    }
}
