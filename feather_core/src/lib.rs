//! Internals for Feather: the build-time SQL toolkit (lexer, parser, schema
//! extraction, type inference, query compilation) and the native SQLite
//! handle wrapper used by the `feather` runtime crate.
//!
//! The compile pipeline is pure and synchronous: raw SQL text becomes
//! tokens, tokens become a syntax tree, DDL statements build a [`Schema`]
//! and DML/SELECT statements compile against it into a
//! [`CompiledQuery`][compile::CompiledQuery] describing the query's bind
//! parameters and result columns. Problems found along the way accumulate
//! in a [`Diagnostics`][diag::Diagnostics] bag rather than aborting.

use thiserror::Error as ThisError;

pub mod ast;
pub mod compile;
pub mod db;
pub mod diag;
pub mod infer;
pub mod keyword;
pub mod lexer;
pub mod migrations;
pub mod parser;
pub mod schema;
pub mod token;
pub mod types;
pub mod value;

mod srcloc;
pub use srcloc::SourceLocation;

pub use compile::{compile_statement, CompiledQuery, QueryInput, QueryOutput};
pub use diag::{Diagnostic, DiagnosticKind, Diagnostics, FixIt};
pub use schema::Schema;
pub use types::Ty;
pub use value::{FromValue, ToValue, Value, ValueRef};

pub type Result<T> = std::result::Result<T, crate::Error>;

/// Feather runtime errors.
///
/// Compile-time problems (lexing, parsing, schema derivation, type
/// inference) are not `Error`s; they are [`Diagnostic`]s collected in a
/// bag. `Error` covers the runtime surface: opening handles, preparing and
/// stepping statements, transactions, pools and observations.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Failed to open database at {path}: {source}")]
    Open {
        path: String,
        source: rusqlite::Error,
    },
    #[error("Failed to prepare statement: {0}")]
    Prepare(rusqlite::Error),
    #[error("Bind parameter {index} rejected: {source}")]
    Bind {
        index: usize,
        source: rusqlite::Error,
    },
    #[error("Step failed: {0}")]
    Step(rusqlite::Error),
    #[error("Column index {0} out of range")]
    ColumnOutOfRange(usize),
    #[error("Type mismatch decoding column. Expected {expected}, found {found}")]
    DecodeMismatch { expected: String, found: String },
    #[error("Transaction has already been consumed")]
    TransactionConsumed,
    #[error("Pool must allow at least one connection")]
    PoolCapacity,
    #[error("Connection acquisition failed: pool is closed")]
    PoolClosed,
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Observation has already been started")]
    ObservationStarted,
    #[error("Observation was cancelled")]
    ObservationCancelled,
    #[error("Statement did not compile cleanly: {0}")]
    InvalidQuery(String),
    #[error("Internal logic error: {0}")]
    Internal(String),
    #[error("Sqlite error {0}")]
    SQLite(#[from] rusqlite::Error),
    #[error("(De)serialization error {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("IO error {0}")]
    IO(#[from] std::io::Error),
}
