//! Typed diagnostic records produced by the compile pipeline.
//!
//! Every pass (lexing, parsing, schema derivation, type inference,
//! compilation) appends to a [`Diagnostics`] bag and keeps going; a
//! non-empty bag is the caller's signal that the compiled artifact is
//! partial. Only truly unterminated input aborts a pass.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::SourceLocation;

/// What went wrong, as a stable machine-readable kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    // Lexing
    UnterminatedString,
    UnterminatedBlockComment,
    InvalidCharacter,
    InvalidNumber,
    MalformedBlobLiteral,
    // Parsing
    UnexpectedToken,
    ExpectedSymbol,
    ExpectedNumeric,
    InvalidOperator,
    // Schema derivation
    DuplicateTable,
    DuplicateColumn,
    UnknownColumnType,
    UnresolvedReference,
    // Type inference and compilation
    IncorrectType,
    AmbiguousColumn,
    TableNotFound,
    ColumnNotFound,
    ArityMismatch,
    NonBooleanPredicate,
    UnknownFunction,
    ParameterTypeConflict,
}

/// A suggested source edit attached to a diagnostic.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum FixIt {
    /// Replace the text covered by `location` with `text`.
    Replace {
        location: SourceLocation,
        text: String,
    },
    /// Insert `text` immediately after `location`.
    Append {
        location: SourceLocation,
        text: String,
    },
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: SourceLocation,
    pub fixit: Option<FixIt>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, location: SourceLocation) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            location,
            fixit: None,
        }
    }

    pub fn with_fixit(mut self, fixit: FixIt) -> Self {
        self.fixit = Some(fixit);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at byte {}..{}",
            self.message, self.location.start, self.location.end
        )?;
        if let (Some(line), Some(column)) = (self.location.line, self.location.column) {
            write!(f, " (line {line}, column {column})")?;
        }
        Ok(())
    }
}

/// An append-only bag of diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.items.first()
    }

    pub fn contains_kind(&self, kind: DiagnosticKind) -> bool {
        self.items.iter().any(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_range_and_position() {
        let d = Diagnostic::new(
            DiagnosticKind::ColumnNotFound,
            "Column 'nope' not found",
            SourceLocation::with_position(7, 11, 1, 8),
        );
        assert_eq!(
            d.to_string(),
            "Column 'nope' not found at byte 7..11 (line 1, column 8)"
        );
    }

    #[test]
    fn bag_accumulates_in_order() {
        let mut bag = Diagnostics::new();
        bag.push(Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            "first",
            SourceLocation::new(0, 1),
        ));
        bag.push(Diagnostic::new(
            DiagnosticKind::TableNotFound,
            "second",
            SourceLocation::new(2, 3),
        ));
        assert_eq!(bag.len(), 2);
        assert_eq!(bag.first().unwrap().message, "first");
        assert!(bag.contains_kind(DiagnosticKind::TableNotFound));
    }
}
