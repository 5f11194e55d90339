//! Build-time checked SQL and a pooled, observable SQLite runtime.
//!
//! The `feather_core` crate carries the SQL front-end (lexer, parser,
//! schema derivation, type inference, query compilation) and the native
//! handle wrapper; this crate adds the runtime the application actually
//! holds: a bounded connection [`Pool`] with single-writer transaction
//! discipline, and live-query [`Observation`]s fed by the engine's
//! row-change hook.
//!
//! ```no_run
//! # async fn demo() -> feather::Result<()> {
//! use feather::{Migration, Pool, TransactionKind};
//!
//! let migrations = vec![Migration::new(
//!     1,
//!     "CREATE TABLE todos(id INTEGER PRIMARY KEY, title TEXT NOT NULL);",
//! )];
//! let pool = Pool::open("app.db", 5, migrations)?;
//!
//! let txn = pool.begin(TransactionKind::Write).await?;
//! txn.execute("INSERT INTO todos(title) VALUES ('ship it')")?;
//! txn.commit().await?;
//! # Ok(())
//! # }
//! ```

pub use feather_core::ast;
pub use feather_core::compile::{self, CompiledQuery, QueryInput, QueryOutput};
pub use feather_core::db::{ChangeOp, Connection, RowChange};
pub use feather_core::diag::{Diagnostic, DiagnosticKind, Diagnostics, FixIt};
pub use feather_core::lexer;
pub use feather_core::migrations::Migration;
pub use feather_core::parser;
pub use feather_core::schema::Schema;
pub use feather_core::types::Ty;
pub use feather_core::{Error, FromValue, Result, SourceLocation, ToValue, Value, ValueRef};

mod observe;
mod pool;

pub use observe::Observation;
pub use pool::{Pool, Transaction, TransactionBehavior, TransactionKind};
