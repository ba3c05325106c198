use std::fmt;

use crate::{Span, source::SourceId};

/// A value paired with where it comes from.
pub type Located<T> = (T, Loc);

/// A span inside a particular source.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc {
    pub source: SourceId,
    pub span: Span,
}

impl Loc {
    pub fn new(source: SourceId, span: Span) -> Self {
        Self { source, span }
    }
}

impl fmt::Debug for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_name_their_source() {
        let loc = Loc::new(SourceId::from_raw(1), Span::new(2, 9));
        assert_eq!(loc.to_string(), "#1:2..9");
        assert_eq!(format!("{loc:?}"), "#1:2..9");
    }
}
