//! Live-query observations.
//!
//! Every pooled handle carries the engine's update hook; a transaction
//! buffers the reported row changes until it commits, at which point the
//! pool fans the batch out to every subscriber through a bounded
//! in-order queue. Each observation re-executes its query per committed
//! batch and hands the fresh result to its sink.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use feather_core::compile;
use feather_core::db::RowChange;
use feather_core::types::Ty;
use feather_core::value::Value;
use feather_core::{Error, Result};

use crate::pool::{Pool, TransactionKind};

/// Per-subscriber queue depth. A subscriber that falls this far behind
/// back-pressures committing writers rather than dropping batches.
const SUBSCRIBER_QUEUE_DEPTH: usize = 32;

type Batch = Arc<Vec<RowChange>>;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Batch>,
}

/// The pool-wide fan-out of committed change batches.
pub(crate) struct ObserverRegistry {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        ObserverRegistry {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn register(&self) -> (u64, mpsc::Receiver<Batch>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        self.subscribers.lock().unwrap().push(Subscriber { id, tx });
        (id, rx)
    }

    /// Remove a sink. Idempotent; the sink sees no further deliveries.
    pub(crate) fn cancel(&self, id: u64) {
        self.subscribers.lock().unwrap().retain(|s| s.id != id);
    }

    /// Deliver a committed batch to every subscriber, in registration
    /// order. Called with the write lock still held, so batches arrive
    /// in commit order.
    pub(crate) async fn publish(&self, events: Vec<RowChange>) {
        let batch: Batch = Arc::new(events);
        let targets: Vec<(u64, mpsc::Sender<Batch>)> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers.iter().map(|s| (s.id, s.tx.clone())).collect()
        };
        for (id, tx) in targets {
            if tx.send(batch.clone()).await.is_err() {
                self.cancel(id);
            }
        }
    }
}

enum ObservationState {
    Pending,
    Subscribed { id: u64 },
    Cancelled,
}

/// A live query: a compiled query plus inputs paired with a sink.
///
/// Lifecycle: pending until [`start`][Observation::start], then
/// subscribed; [`cancel`][Observation::cancel] detaches the sink and is
/// idempotent. On start the sink synchronously receives the current
/// result; afterwards it receives a fresh result per committed batch.
pub struct Observation {
    pool: Pool,
    sql: String,
    params: Vec<Value>,
    state: Mutex<ObservationState>,
    cancelled: Arc<AtomicBool>,
}

impl Observation {
    pub(crate) fn new(pool: Pool, sql: String, params: Vec<Value>) -> Self {
        Observation {
            pool,
            sql,
            params,
            state: Mutex::new(ObservationState::Pending),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Compile the query, emit the initial snapshot, and subscribe to
    /// committed change batches. Fails if the query does not compile
    /// cleanly against the pool's schema, or if already started.
    pub fn start(
        &self,
        on_change: impl FnMut(Vec<Vec<Value>>) + Send + 'static,
        on_error: impl FnOnce(Error) + Send + 'static,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match *state {
            ObservationState::Pending => {}
            ObservationState::Subscribed { .. } => return Err(Error::ObservationStarted),
            ObservationState::Cancelled => return Err(Error::ObservationCancelled),
        }
        let compiled = compile::compile_sql(self.pool.schema(), &self.sql);
        if let Some(diagnostic) = compiled.diagnostics.first() {
            return Err(Error::InvalidQuery(diagnostic.to_string()));
        }
        if compiled.query.inputs.len() != self.params.len() {
            return Err(Error::InvalidQuery(format!(
                "query expects {} parameters, {} provided",
                compiled.query.inputs.len(),
                self.params.len()
            )));
        }
        let column_tys: Vec<Ty> = compiled
            .query
            .outputs
            .iter()
            .map(|output| output.ty.clone())
            .collect();

        let (id, mut rx) = self.pool.inner.observers.register();
        let pool = self.pool.clone();
        let sql = self.sql.clone();
        let params = self.params.clone();
        let cancelled = self.cancelled.clone();
        let mut on_change = on_change;
        let mut on_error = Some(on_error);

        tokio::spawn(async move {
            // the initial snapshot is delivered before any change event
            // originating after the subscription
            match run_query(&pool, &sql, &params, &column_tys).await {
                Ok(rows) => {
                    if cancelled.load(Ordering::Acquire) {
                        return;
                    }
                    on_change(rows);
                }
                Err(err) => {
                    pool.inner.observers.cancel(id);
                    if let Some(on_error) = on_error.take() {
                        on_error(err);
                    }
                    return;
                }
            }
            while rx.recv().await.is_some() {
                // re-executions triggered before a cancel complete, and
                // their results are discarded
                match run_query(&pool, &sql, &params, &column_tys).await {
                    Ok(rows) => {
                        if !cancelled.load(Ordering::Acquire) {
                            on_change(rows);
                        }
                    }
                    Err(err) => {
                        pool.inner.observers.cancel(id);
                        if let Some(on_error) = on_error.take() {
                            on_error(err);
                        }
                        return;
                    }
                }
            }
        });

        *state = ObservationState::Subscribed { id };
        Ok(())
    }

    /// Detach the sink. Safe to call repeatedly and from any state.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap();
        if let ObservationState::Subscribed { id } = *state {
            self.pool.inner.observers.cancel(id);
        }
        self.cancelled.store(true, Ordering::Release);
        *state = ObservationState::Cancelled;
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_query(
    pool: &Pool,
    sql: &str,
    params: &[Value],
    column_tys: &[Ty],
) -> Result<Vec<Vec<Value>>> {
    let txn = pool.begin(TransactionKind::Read).await?;
    let rows = txn.query_rows(sql, params, column_tys)?;
    drop(txn); // a read scope commits on drop
    Ok(rows)
}
