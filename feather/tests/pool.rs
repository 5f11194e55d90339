//! Pool acquisition, transaction finalization and migration behavior
//! against a real on-disk database.

use std::time::Duration;

use feather::{Error, Migration, Pool, TransactionKind, Ty, Value};
use tempfile::TempDir;

fn migrations() -> Vec<Migration> {
    vec![Migration::new(
        1,
        "CREATE TABLE items(id INTEGER PRIMARY KEY, name TEXT NOT NULL, done INTEGER NOT NULL DEFAULT (0));",
    )]
}

fn temp_pool(limit: usize) -> (TempDir, Pool) {
    let dir = TempDir::new().unwrap();
    let pool = Pool::open(dir.path().join("test.db"), limit, migrations()).unwrap();
    (dir, pool)
}

async fn insert(pool: &Pool, name: &str) {
    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    let mut stmt = txn.prepare("INSERT INTO items(name) VALUES (?)").unwrap();
    stmt.bind(1, feather::ValueRef::Text(name)).unwrap();
    stmt.execute().unwrap();
    drop(stmt);
    txn.commit().await.unwrap();
}

async fn names(pool: &Pool) -> Vec<String> {
    let txn = pool.begin(TransactionKind::Read).await.unwrap();
    txn.query_rows("SELECT name FROM items ORDER BY id", &[], &[Ty::Text])
        .unwrap()
        .into_iter()
        .map(|row| match row.into_iter().next().unwrap() {
            Value::Text(t) => t,
            other => panic!("expected text, got {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn read_write_round_trip() {
    let (_dir, pool) = temp_pool(4);
    insert(&pool, "alpha").await;
    insert(&pool, "beta").await;
    assert_eq!(names(&pool).await, vec!["alpha", "beta"]);
}

#[tokio::test]
async fn write_transactions_are_serialized() {
    let (_dir, pool) = temp_pool(4);
    let first = pool.begin(TransactionKind::Write).await.unwrap();
    first.execute("INSERT INTO items(name) VALUES ('first')").unwrap();

    let pool2 = pool.clone();
    let second = tokio::spawn(async move {
        let txn = pool2.begin(TransactionKind::Write).await.unwrap();
        txn.execute("INSERT INTO items(name) VALUES ('second')").unwrap();
        txn.commit().await.unwrap();
    });

    // the second writer must observe the write lock being held
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished());

    first.commit().await.unwrap();
    second.await.unwrap();
    assert_eq!(names(&pool).await, vec!["first", "second"]);
}

#[tokio::test]
async fn dropping_a_write_transaction_rolls_back() {
    let (_dir, pool) = temp_pool(2);
    {
        let txn = pool.begin(TransactionKind::Write).await.unwrap();
        txn.execute("INSERT INTO items(name) VALUES ('doomed')").unwrap();
        // dropped without commit
    }
    assert_eq!(names(&pool).await, Vec::<String>::new());
}

#[tokio::test]
async fn dropping_a_read_transaction_returns_the_handle() {
    // with limit 1 the second read can only proceed if the first
    // returned its handle
    let (_dir, pool) = temp_pool(1);
    {
        let txn = pool.begin(TransactionKind::Read).await.unwrap();
        txn.query_rows("SELECT id FROM items", &[], &[Ty::Integer])
            .unwrap();
    }
    let again = tokio::time::timeout(
        Duration::from_secs(1),
        pool.begin(TransactionKind::Read),
    )
    .await
    .expect("handle was returned")
    .unwrap();
    drop(again);
}

#[tokio::test]
async fn capacity_bounds_concurrent_readers() {
    let (_dir, pool) = temp_pool(2);
    let first = pool.begin(TransactionKind::Read).await.unwrap();
    let second = pool.begin(TransactionKind::Read).await.unwrap();

    let blocked =
        tokio::time::timeout(Duration::from_millis(100), pool.begin(TransactionKind::Read)).await;
    assert!(blocked.is_err(), "third reader should wait at capacity");

    drop(first);
    let third = tokio::time::timeout(
        Duration::from_secs(1),
        pool.begin(TransactionKind::Read),
    )
    .await
    .expect("reader resumes after a handle returns")
    .unwrap();
    drop(third);
    drop(second);
}

#[tokio::test]
async fn explicit_rollback_discards_changes() {
    let (_dir, pool) = temp_pool(2);
    let txn = pool.begin(TransactionKind::Write).await.unwrap();
    txn.execute("INSERT INTO items(name) VALUES ('gone')").unwrap();
    txn.rollback().await.unwrap();
    assert_eq!(names(&pool).await, Vec::<String>::new());
}

#[tokio::test]
async fn migrations_apply_exactly_once_across_opens() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.db");
    {
        let pool = Pool::open(&path, 2, migrations()).unwrap();
        insert(&pool, "persisted").await;
    }
    // reopening replays nothing and keeps the data
    let pool = Pool::open(&path, 2, migrations()).unwrap();
    assert_eq!(names(&pool).await, vec!["persisted"]);
    let txn = pool.begin(TransactionKind::Read).await.unwrap();
    let rows = txn
        .query_rows(
            "SELECT number FROM __featherMigrations",
            &[],
            &[Ty::Integer],
        )
        .unwrap();
    assert_eq!(rows, vec![vec![Value::Integer(1)]]);
}

#[tokio::test]
async fn zero_capacity_is_rejected() {
    let dir = TempDir::new().unwrap();
    match Pool::open(dir.path().join("test.db"), 0, migrations()) {
        Err(Error::PoolCapacity) => {}
        Err(other) => panic!("expected PoolCapacity, got {other:?}"),
        Ok(_) => panic!("expected PoolCapacity, got a pool"),
    }
}

#[tokio::test]
async fn journal_mode_follows_the_limit() {
    let (_dir, pool) = temp_pool(4);
    let txn = pool.begin(TransactionKind::Read).await.unwrap();
    let mode = txn
        .query_rows("PRAGMA journal_mode", &[], &[Ty::Text])
        .unwrap();
    assert_eq!(mode, vec![vec![Value::Text("wal".to_string())]]);
    drop(txn);

    let (_dir, pool) = temp_pool(1);
    let txn = pool.begin(TransactionKind::Read).await.unwrap();
    let mode = txn
        .query_rows("PRAGMA journal_mode", &[], &[Ty::Text])
        .unwrap();
    assert_eq!(mode, vec![vec![Value::Text("delete".to_string())]]);
}

#[tokio::test]
async fn schema_is_derived_from_migrations() {
    let (_dir, pool) = temp_pool(2);
    let items = pool.schema().get_table("items").unwrap();
    assert_eq!(items.columns.len(), 3);
    assert!(items.column("id").unwrap().primary_key);
    assert!(items.column("name").unwrap().not_null);
}
