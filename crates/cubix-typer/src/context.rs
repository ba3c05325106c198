use cubix_core::{Binder, Expr, Name, Telescope};

/// Local variables in scope, innermost last.
///
/// Each type lives in the context of the binders before it; lookups shift it to the
/// full context.
#[derive(Debug, Clone, Default)]
pub struct Context {
    binders: Vec<Binder>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_telescope(telescope: &Telescope) -> Self {
        Self {
            binders: telescope.0.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.binders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binders.is_empty()
    }

    pub fn push(&mut self, name: impl Into<Name>, ty: Expr) {
        self.binders.push(Binder::new(name, ty));
    }

    pub fn extend(&mut self, telescope: &Telescope) {
        self.binders.extend(telescope.iter().cloned());
    }

    pub fn truncate(&mut self, len: usize) {
        self.binders.truncate(len);
    }

    /// The de Bruijn index and type of the innermost variable called `name`.
    pub fn lookup(&self, name: &str) -> Option<(usize, Expr)> {
        let pos = self.binders.iter().rposition(|b| b.name == name)?;
        let index = self.binders.len() - 1 - pos;
        Some((index, self.binders[pos].ty.shift(index + 1)))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.binders.iter().map(|b| b.name.as_str())
    }

    /// The binders from position `from` on.
    pub fn telescope_from(&self, from: usize) -> Telescope {
        self.binders.get(from..).unwrap_or_default().iter().cloned().collect()
    }
}
