//! Numbered schema migrations.
//!
//! Applications declare their schema as an ordered list of migrations
//! numbered `1..N`. Applied numbers are tracked in the bookkeeping table
//! `__featherMigrations`; running the list again applies only the pending
//! ones. The same list drives build-time schema derivation, so the
//! compiler and the live database agree on the schema by construction.

use std::collections::BTreeSet;

use crate::db::Connection;
use crate::diag::Diagnostics;
use crate::schema::Schema;
use crate::value::ValueRef;
use crate::{Error, Result};

/// The bookkeeping table recording applied migration numbers.
pub const MIGRATIONS_TABLE: &str = "__featherMigrations";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Migration {
    pub number: u32,
    pub sql: String,
}

impl Migration {
    pub fn new(number: u32, sql: impl Into<String>) -> Self {
        Migration {
            number,
            sql: sql.into(),
        }
    }
}

/// Migrations must be numbered 1..N in order, with no gaps.
pub fn validate(migrations: &[Migration]) -> Result<()> {
    for (i, migration) in migrations.iter().enumerate() {
        let expected = i as u32 + 1;
        if migration.number != expected {
            return Err(Error::Migration(format!(
                "migrations must be numbered 1..{}; found {} at position {}",
                migrations.len(),
                migration.number,
                expected
            )));
        }
    }
    Ok(())
}

/// Derive the build-time schema by replaying the migration DDL.
pub fn derive_schema(migrations: &[Migration]) -> (Schema, Diagnostics) {
    let mut schema = Schema::new();
    let mut diagnostics = Diagnostics::new();
    for migration in migrations {
        let (stmts, stmt_diagnostics) = crate::parser::parse_sql(&migration.sql);
        diagnostics.extend(stmt_diagnostics);
        for stmt in &stmts {
            schema.apply_statement(stmt, &mut diagnostics);
        }
    }
    (schema, diagnostics)
}

/// The set of migration numbers already applied to this database.
pub fn applied_numbers(conn: &Connection) -> Result<BTreeSet<u32>> {
    if !conn.has_table(MIGRATIONS_TABLE)? {
        return Ok(BTreeSet::new());
    }
    let stmt = conn.prepare(&format!("SELECT number FROM {MIGRATIONS_TABLE}"))?;
    let mut cursor = stmt.into_cursor()?;
    let mut numbers = BTreeSet::new();
    while cursor.step()? {
        match cursor.column(0, &crate::Ty::Integer)? {
            crate::Value::Integer(n) if n >= 0 => {
                numbers.insert(n as u32);
            }
            other => {
                return Err(Error::Migration(format!(
                    "unexpected migration record {other}"
                )))
            }
        }
    }
    Ok(numbers)
}

/// Apply every pending migration, in order, recording each as it lands.
/// The caller is expected to hold a write transaction; each migration is
/// applied exactly once across the database's lifetime.
pub fn run_pending(conn: &Connection, migrations: &[Migration]) -> Result<usize> {
    validate(migrations)?;
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE}(number INTEGER PRIMARY KEY)"
    ))?;
    let applied = applied_numbers(conn)?;
    let mut count = 0;
    for migration in migrations {
        if applied.contains(&migration.number) {
            continue;
        }
        log::info!("Applying migration {}", migration.number);
        conn.execute_batch(&migration.sql)?;
        let mut record = conn.prepare(&format!(
            "INSERT INTO {MIGRATIONS_TABLE} (number) VALUES (?)"
        ))?;
        record.bind(1, ValueRef::Integer(i64::from(migration.number)))?;
        record.execute()?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Migration> {
        vec![
            Migration::new(1, "CREATE TABLE t(a INTEGER NOT NULL, b INTEGER);"),
            Migration::new(2, "ALTER TABLE t ADD COLUMN c TEXT;"),
        ]
    }

    #[test]
    fn numbering_must_be_contiguous_from_one() {
        assert!(validate(&sample()).is_ok());
        let bad = vec![
            Migration::new(1, "CREATE TABLE a(x INTEGER);"),
            Migration::new(3, "CREATE TABLE b(x INTEGER);"),
        ];
        assert!(matches!(validate(&bad), Err(Error::Migration(_))));
    }

    #[test]
    fn pending_migrations_apply_exactly_once() {
        let conn = Connection::open(":memory:").unwrap();
        let migrations = sample();
        assert_eq!(run_pending(&conn, &migrations).unwrap(), 2);
        // a second run applies nothing
        assert_eq!(run_pending(&conn, &migrations).unwrap(), 0);
        assert_eq!(
            applied_numbers(&conn).unwrap().into_iter().collect::<Vec<_>>(),
            vec![1, 2]
        );
        // the migrated table exists with the added column
        conn.execute_batch("INSERT INTO t(a, b, c) VALUES (1, NULL, 'x')")
            .unwrap();
    }

    #[test]
    fn extending_the_list_applies_only_the_tail() {
        let conn = Connection::open(":memory:").unwrap();
        let mut migrations = sample();
        run_pending(&conn, &migrations).unwrap();
        migrations.push(Migration::new(3, "CREATE TABLE u(z TEXT);"));
        assert_eq!(run_pending(&conn, &migrations).unwrap(), 1);
    }

    #[test]
    fn derived_schema_matches_migrated_database() {
        let (schema, diagnostics) = derive_schema(&sample());
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let t = schema.get_table("t").unwrap();
        assert_eq!(t.columns.len(), 3);
        assert!(t.column("c").is_some());
    }
}
