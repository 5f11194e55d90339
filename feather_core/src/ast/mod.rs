//! The SQL syntax tree.
//!
//! Every node carries a [`SyntaxId`] (process-wide monotonic, used to key
//! diagnostics and cross-references) and the [`SourceLocation`] of the text
//! it was parsed from. Statements own their expressions and expressions own
//! their embedded subqueries, so the tree is a plain owned tree.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::SourceLocation;

mod display;
mod expr;
mod stmt;

pub use expr::*;
pub use stmt::*;

static NEXT_SYNTAX_ID: AtomicU64 = AtomicU64::new(1);

/// A process-wide monotonic identity for a syntax node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SyntaxId(u64);

impl SyntaxId {
    pub fn fresh() -> SyntaxId {
        SyntaxId(NEXT_SYNTAX_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The identifier value the parser synthesizes when recovering from an
/// unexpected token.
pub const RECOVERY_IDENT: &str = "<<error>>";

/// An identifier, bare or quoted.
#[derive(Clone, Debug)]
pub struct Ident {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub value: String,
    pub quoted: bool,
}

impl Ident {
    pub fn new(value: impl Into<String>, location: SourceLocation) -> Self {
        Ident {
            id: SyntaxId::fresh(),
            location,
            value: value.into(),
            quoted: false,
        }
    }

    pub fn quoted(value: impl Into<String>, location: SourceLocation) -> Self {
        Ident {
            id: SyntaxId::fresh(),
            location,
            value: value.into(),
            quoted: true,
        }
    }

    /// The node the parser emits in place of a missing identifier.
    pub fn recovery(location: SourceLocation) -> Self {
        Ident::new(RECOVERY_IDENT, location)
    }

    pub fn is_recovery(&self) -> bool {
        self.value == RECOVERY_IDENT
    }

    pub fn text(&self) -> &str {
        &self.value
    }

    /// SQL identifiers compare case-insensitively unless quoted; schema
    /// lookups in this crate always fold case.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.value.eq_ignore_ascii_case(other)
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.quoted == other.quoted
    }
}
impl Eq for Ident {}

/// A possibly schema-qualified object name (`main.users`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub schema: Option<Ident>,
    pub name: Ident,
}

impl QualifiedName {
    pub fn new(schema: Option<Ident>, name: Ident) -> Self {
        let location = match &schema {
            Some(s) => s.location.spanning(&name.location),
            None => name.location,
        };
        QualifiedName {
            id: SyntaxId::fresh(),
            location,
            schema,
            name,
        }
    }
}

/// A signed numeric literal as it appears in type arguments
/// (`VARCHAR(255)`, `DECIMAL(10, -2)`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedNumber {
    pub negative: bool,
    pub digits: String,
}

/// A declared column type: a (possibly multi-word) name plus up to two
/// signed-number arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeName {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub name: String,
    pub args: Vec<SignedNumber>,
}

impl TypeName {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        TypeName {
            id: SyntaxId::fresh(),
            location,
            name: name.into(),
            args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_ids_are_monotonic() {
        let a = SyntaxId::fresh();
        let b = SyntaxId::fresh();
        assert!(b > a);
    }

    #[test]
    fn ident_equality_ignores_location() {
        let a = Ident::new("users", SourceLocation::new(0, 5));
        let b = Ident::new("users", SourceLocation::new(20, 25));
        assert_eq!(a, b);
        assert!(a.eq_ignore_case("USERS"));
    }
}
