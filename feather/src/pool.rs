//! The connection pool.
//!
//! A pool owns up to `limit` native handles. Acquisition is
//! suspend-based: tasks waiting for a handle (or for the pool-wide write
//! lock) park on FIFO-fair semaphores, never an OS thread. Transactions
//! are RAII scopes: an un-committed read transaction commits on drop, an
//! un-committed write transaction rolls back, and the handle returns to
//! the pool exactly once either way.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use feather_core::db::{Connection, RowChange, Statement};
use feather_core::migrations::{self, Migration};
use feather_core::schema::Schema;
use feather_core::types::Ty;
use feather_core::value::Value;
use feather_core::{Error, Result};

use crate::observe::ObserverRegistry;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionKind {
    Read,
    Write,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionBehavior {
    Deferred,
    Immediate,
    Exclusive,
}

impl TransactionBehavior {
    fn begin_sql(&self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}

/// A handle plus the row-change buffer its update hook feeds.
pub(crate) struct PooledConn {
    pub(crate) conn: Connection,
    events: Arc<Mutex<Vec<RowChange>>>,
}

impl PooledConn {
    fn attach(conn: Connection) -> PooledConn {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        conn.install_update_hook(move |change| sink.lock().unwrap().push(change));
        PooledConn { conn, events }
    }

    fn drain_events(&self) -> Vec<RowChange> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    fn discard_events(&self) {
        self.events.lock().unwrap().clear();
    }
}

struct PoolState {
    idle: Vec<PooledConn>,
    open_count: usize,
}

pub(crate) struct PoolInner {
    path: PathBuf,
    limit: usize,
    /// One permit per allowed checkout; waiters are served in FIFO order.
    capacity: Arc<Semaphore>,
    /// The pool-wide single-writer lock.
    write_lock: Arc<Semaphore>,
    state: Mutex<PoolState>,
    pub(crate) observers: ObserverRegistry,
    pub(crate) schema: Schema,
}

/// A bounded pool of SQLite handles over one database file.
#[derive(Clone)]
pub struct Pool {
    pub(crate) inner: Arc<PoolInner>,
}

impl Pool {
    pub const DEFAULT_LIMIT: usize = 5;

    /// Open the database, apply pending migrations inside a write
    /// transaction, and derive the build-time schema from the migration
    /// list. `limit` is the maximum number of concurrently open handles.
    pub fn open(
        path: impl AsRef<Path>,
        limit: usize,
        migrations: Vec<Migration>,
    ) -> Result<Pool> {
        if limit == 0 {
            return Err(Error::PoolCapacity);
        }
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        // a single handle cannot benefit from concurrent reads
        if limit > 1 {
            run_pragma(&conn, "PRAGMA journal_mode=WAL")?;
        } else {
            run_pragma(&conn, "PRAGMA journal_mode=DELETE")?;
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        match migrations::run_pending(&conn, &migrations) {
            Ok(applied) => {
                conn.execute_batch("COMMIT")?;
                if applied > 0 {
                    log::info!("applied {applied} migrations to {}", path.display());
                }
            }
            Err(err) => {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(err);
            }
        }
        let (schema, diagnostics) = migrations::derive_schema(&migrations);
        for diagnostic in diagnostics.iter() {
            log::warn!("migration schema: {diagnostic}");
        }
        let inner = Arc::new(PoolInner {
            path,
            limit,
            capacity: Arc::new(Semaphore::new(limit)),
            write_lock: Arc::new(Semaphore::new(1)),
            state: Mutex::new(PoolState {
                idle: vec![PooledConn::attach(conn)],
                open_count: 1,
            }),
            observers: ObserverRegistry::new(),
            schema,
        });
        Ok(Pool { inner })
    }

    /// The schema derived from the migration list.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Begin a transaction. Writers take the pool-wide write lock first;
    /// at most one write transaction is outstanding at any instant.
    pub async fn begin(&self, kind: TransactionKind) -> Result<Transaction> {
        let behavior = match kind {
            TransactionKind::Read => TransactionBehavior::Deferred,
            TransactionKind::Write => TransactionBehavior::Immediate,
        };
        self.begin_with(kind, behavior).await
    }

    pub async fn begin_with(
        &self,
        kind: TransactionKind,
        behavior: TransactionBehavior,
    ) -> Result<Transaction> {
        let write_permit = match kind {
            TransactionKind::Write => Some(
                self.inner
                    .write_lock
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|_| Error::PoolClosed)?,
            ),
            TransactionKind::Read => None,
        };
        let capacity_permit = self
            .inner
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let available = self.inner.state.lock().unwrap().idle.pop();
        let pooled = match available {
            Some(pooled) => pooled,
            None => {
                // the capacity permit guarantees we are under the limit
                let conn = Connection::open(&self.inner.path)?;
                let mut state = self.inner.state.lock().unwrap();
                debug_assert!(state.open_count < self.inner.limit);
                state.open_count += 1;
                drop(state);
                PooledConn::attach(conn)
            }
        };
        if let Err(err) = pooled.conn.execute_batch(behavior.begin_sql()) {
            self.inner.state.lock().unwrap().idle.push(pooled);
            return Err(err);
        }
        Ok(Transaction {
            pool: self.inner.clone(),
            pooled: Some(pooled),
            kind,
            _write_permit: write_permit,
            _capacity_permit: Some(capacity_permit),
        })
    }

    /// Create a live-query observation over `sql` with bound `params`.
    /// The subscription is inert until [`Observation::start`].
    pub fn observe(&self, sql: impl Into<String>, params: Vec<Value>) -> crate::Observation {
        crate::Observation::new(self.clone(), sql.into(), params)
    }
}

/// A pragma that reports its value back as a row.
fn run_pragma(conn: &Connection, sql: &str) -> Result<()> {
    let stmt = conn.prepare(sql)?;
    let mut cursor = stmt.into_cursor()?;
    while cursor.step()? {}
    Ok(())
}

/// A scoped transaction owning one pooled handle.
///
/// Dropping without [`commit`][Transaction::commit] finalizes the scope:
/// a read transaction commits (nothing was mutated), a write transaction
/// rolls back and its buffered change events are discarded.
pub struct Transaction {
    pool: Arc<PoolInner>,
    pooled: Option<PooledConn>,
    kind: TransactionKind,
    _write_permit: Option<OwnedSemaphorePermit>,
    _capacity_permit: Option<OwnedSemaphorePermit>,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    fn conn(&self) -> Result<&Connection> {
        self.pooled
            .as_ref()
            .map(|pooled| &pooled.conn)
            .ok_or(Error::TransactionConsumed)
    }

    /// Run one or more statements, discarding any rows.
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.conn()?.execute_batch(sql)
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        self.conn()?.prepare(sql)
    }

    /// Prepare, bind and run a query, decoding every row against the
    /// given column types.
    pub fn query_rows(
        &self,
        sql: &str,
        params: &[Value],
        column_tys: &[Ty],
    ) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.prepare(sql)?;
        stmt.bind_all(params)?;
        let mut cursor = stmt.into_cursor()?;
        let mut rows = Vec::new();
        while cursor.step()? {
            rows.push(cursor.row(column_tys)?);
        }
        Ok(rows)
    }

    pub fn last_insert_rowid(&self) -> Result<i64> {
        Ok(self.conn()?.last_insert_rowid())
    }

    /// Commit the transaction. Buffered row-change events are delivered
    /// to every subscriber, in order, before the write lock is released,
    /// so a subscriber sees this commit's events before the next writer
    /// can begin.
    pub async fn commit(mut self) -> Result<()> {
        let pooled = self.pooled.take().ok_or(Error::TransactionConsumed)?;
        match pooled.conn.execute_batch("COMMIT") {
            Ok(()) => {
                let events = pooled.drain_events();
                self.pool.state.lock().unwrap().idle.push(pooled);
                // readers may proceed during fan-out; the write lock stays
                // held so the next writer begins only after delivery
                self._capacity_permit = None;
                if !events.is_empty() {
                    self.pool.observers.publish(events).await;
                }
                // the write permit drops here, waking the next writer
                Ok(())
            }
            Err(err) => {
                pooled.discard_events();
                self.pool.state.lock().unwrap().idle.push(pooled);
                Err(err)
            }
        }
    }

    /// Roll back explicitly. Equivalent to dropping a write transaction.
    pub async fn rollback(mut self) -> Result<()> {
        let pooled = self.pooled.take().ok_or(Error::TransactionConsumed)?;
        let result = pooled.conn.execute_batch("ROLLBACK");
        pooled.discard_events();
        self.pool.state.lock().unwrap().idle.push(pooled);
        result
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let Some(pooled) = self.pooled.take() else {
            return;
        };
        let sql = match self.kind {
            TransactionKind::Read => "COMMIT",
            TransactionKind::Write => "ROLLBACK",
        };
        if let Err(err) = pooled.conn.execute_batch(sql) {
            log::warn!("transaction finalize failed: {err}");
        }
        pooled.discard_events();
        self.pool.state.lock().unwrap().idle.push(pooled);
    }
}
