//! Live-query observation behavior: snapshots, commit-driven updates,
//! rollback discards and cancellation.

use std::time::Duration;

use feather::{Error, Migration, Pool, TransactionKind, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )]
}

fn temp_pool(limit: usize) -> (TempDir, Pool) {
    let dir = TempDir::new().unwrap();
    let pool = Pool::open(dir.path().join("test.db"), limit, migrations()).unwrap();
    (dir, pool)
}

/// Start an observation over the item names, collecting each emitted
/// result set into a channel.
fn observe_names(pool: &Pool) -> (feather::Observation, mpsc::UnboundedReceiver<Vec<String>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observation = pool.observe("SELECT name FROM items ORDER BY id", Vec::new());
    observation
        .start(
            move |rows: Vec<Vec<Value>>| {
                let names = rows
                    .into_iter()
                    .map(|row| match row.into_iter().next().unwrap() {
                        Value::Text(t) => t,
                        other => panic!("expected text, got {other:?}"),
                    })
                    .collect();
                let _ = tx.send(names);
            },
            |err| panic!("observation failed: {err}"),
        )
        .unwrap();
    (observation, rx)
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<Vec<String>>) -> Vec<String> {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("observation result in time")
        .expect("observation channel open")
}

async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<Vec<String>>) {
    assert!(
        timeout(Duration::from_millis(300), rx.recv()).await.is_err(),
        "unexpected delivery"
    );
}

#[tokio::test]
async fn initial_snapshot_precedes_change_events() {
    let (_dir, pool) = temp_pool(4);
    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    txn.execute("INSERT INTO items(name) VALUES ('pre')").unwrap();
    txn.commit().await.unwrap();

    let (_observation, mut rx) = observe_names(&pool);
    // the snapshot reflects the state at subscription time
    assert_eq!(recv(&mut rx).await, vec!["pre"]);

    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    txn.execute("INSERT INTO items(name) VALUES ('post')").unwrap();
    txn.commit().await.unwrap();
    assert_eq!(recv(&mut rx).await, vec!["pre", "post"]);
}

#[tokio::test]
async fn events_fan_out_in_commit_order_with_single_writer() {
    let (_dir, pool) = temp_pool(4);
    let (_observation, mut rx) = observe_names(&pool);
    assert_eq!(recv(&mut rx).await, Vec::<String>::new());

    let first = pool.begin(TransactionKind::Write).await.unwrap();
    first.execute("INSERT INTO items(name) VALUES ('a')").unwrap();

    let pool2 = pool.clone();
    let second = tokio::spawn(async move {
        let txn = pool2.begin(TransactionKind::Write).await.unwrap();
        txn.execute("INSERT INTO items(name) VALUES ('b')").unwrap();
        txn.commit().await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished(), "second writer must wait on the lock");

    first.commit().await.unwrap();
    second.await.unwrap();

    // one re-execution per committed batch, in commit order; the final
    // result reflects both writes
    let after_first = recv(&mut rx).await;
    assert!(!after_first.is_empty());
    assert_eq!(after_first[0], "a");
    let after_second = recv(&mut rx).await;
    assert_eq!(after_second, vec!["a", "b"]);
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn rolled_back_events_are_discarded() {
    let (_dir, pool) = temp_pool(4);
    let (_observation, mut rx) = observe_names(&pool);
    assert_eq!(recv(&mut rx).await, Vec::<String>::new());

    {
        let txn = pool.begin(TransactionKind::Write).await.unwrap();
        txn.execute("INSERT INTO items(name) VALUES ('never')").unwrap();
        // dropped: write transactions roll back
    }
    expect_silence(&mut rx).await;

    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    txn.execute("INSERT INTO items(name) VALUES ('real')").unwrap();
    txn.commit().await.unwrap();
    assert_eq!(recv(&mut rx).await, vec!["real"]);
}

#[tokio::test]
async fn cancellation_is_idempotent_and_stops_delivery() {
    let (_dir, pool) = temp_pool(4);
    let (observation, mut rx) = observe_names(&pool);
    assert_eq!(recv(&mut rx).await, Vec::<String>::new());

    observation.cancel();
    observation.cancel();

    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    txn.execute("INSERT INTO items(name) VALUES ('unseen')").unwrap();
    txn.commit().await.unwrap();
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn starting_twice_is_an_error() {
    let (_dir, pool) = temp_pool(2);
    let (observation, mut rx) = observe_names(&pool);
    assert_eq!(recv(&mut rx).await, Vec::<String>::new());
    match observation.start(|_| {}, |_| {}) {
        Err(Error::ObservationStarted) => {}
        other => panic!("expected ObservationStarted, got {other:?}"),
    }
}

#[tokio::test]
async fn queries_that_do_not_compile_are_rejected() {
    let (_dir, pool) = temp_pool(2);
    let observation = pool.observe("SELECT nope FROM items", Vec::new());
    match observation.start(|_| {}, |_| {}) {
        Err(Error::InvalidQuery(message)) => {
            assert!(message.contains("nope"), "{message}");
        }
        other => panic!("expected InvalidQuery, got {other:?}"),
    }
}

#[tokio::test]
async fn parameterized_observations_bind_their_inputs() {
    let (_dir, pool) = temp_pool(4);
    for name in ["keep", "skip"] {
        let txn = pool.begin(TransactionKind::Write).await.unwrap();
        let mut stmt = txn.prepare("INSERT INTO items(name) VALUES (?)").unwrap();
        stmt.bind(1, feather::ValueRef::Text(name)).unwrap();
        stmt.execute().unwrap();
        drop(stmt);
        txn.commit().await.unwrap();
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let observation = pool.observe(
        "SELECT id FROM items WHERE name = :name",
        vec![Value::Text("keep".to_string())],
    );
    observation
        .start(
            move |rows: Vec<Vec<Value>>| {
                let _ = tx.send(rows.len());
            },
            |err| panic!("observation failed: {err}"),
        )
        .unwrap();
    let count = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count, 1);
}
