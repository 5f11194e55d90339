//! The native SQLite handle wrapper.
//!
//! Opens a database handle, prepares statements, binds typed primitives,
//! steps row-streaming cursors and decodes columns against inferred
//! types. This is the only module that talks to `rusqlite`; everything
//! above it works in terms of [`Value`] and [`Ty`].

use std::path::Path;
use std::pin::Pin;

use fallible_streaming_iterator::FallibleStreamingIterator;
use pin_project::pin_project;

use crate::types::Ty;
use crate::value::{Value, ValueRef};
use crate::{Error, Result};

/// A row mutation reported by the engine's update hook.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One row-change event: operation, database name, table name, rowid.
#[derive(Clone, Debug, PartialEq)]
pub struct RowChange {
    pub op: ChangeOp,
    pub database: String,
    pub table: String,
    pub rowid: i64,
}

/// An open database handle.
#[derive(Debug)]
pub struct Connection {
    conn: rusqlite::Connection,
}

impl Connection {
    /// Open (creating if necessary) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open(path).map_err(|source| Error::Open {
            path: path.display().to_string(),
            source,
        })?;
        let conn = Connection { conn };
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(conn)
    }

    /// Run one or more statements, discarding any rows.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        log::debug!("execute sql {}", sql);
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    pub fn prepare(&self, sql: &str) -> Result<Statement<'_>> {
        log::debug!("prepare sql {}", sql);
        self.conn
            .prepare(sql)
            .map(|stmt| Statement { stmt })
            .map_err(Error::Prepare)
    }

    pub fn has_table(&self, table: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?")?;
        let mut rows = stmt.query([table])?;
        Ok(rows.next()?.is_some())
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    /// Install the engine's per-handle update hook. The callback fires
    /// synchronously inside the engine on every row insert, update and
    /// delete.
    pub fn install_update_hook(
        &self,
        mut hook: impl FnMut(RowChange) + Send + 'static,
    ) {
        self.conn.update_hook(Some(
            move |action: rusqlite::hooks::Action, database: &str, table: &str, rowid: i64| {
                let op = match action {
                    rusqlite::hooks::Action::SQLITE_INSERT => ChangeOp::Insert,
                    rusqlite::hooks::Action::SQLITE_UPDATE => ChangeOp::Update,
                    rusqlite::hooks::Action::SQLITE_DELETE => ChangeOp::Delete,
                    _ => return,
                };
                hook(RowChange {
                    op,
                    database: database.to_string(),
                    table: table.to_string(),
                    rowid,
                });
            },
        ));
    }

    pub fn clear_update_hook(&self) {
        self.conn
            .update_hook(None::<fn(rusqlite::hooks::Action, &str, &str, i64)>);
    }
}

/// A prepared statement.
pub struct Statement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl<'c> Statement<'c> {
    pub fn parameter_count(&self) -> usize {
        self.stmt.parameter_count()
    }

    pub fn column_count(&self) -> usize {
        self.stmt.column_count()
    }

    /// Bind a typed primitive at a 1-based parameter index.
    pub fn bind(&mut self, index: usize, value: ValueRef<'_>) -> Result<()> {
        self.stmt
            .raw_bind_parameter(index, value)
            .map_err(|source| Error::Bind { index, source })
    }

    pub fn bind_all(&mut self, values: &[Value]) -> Result<()> {
        for (i, value) in values.iter().enumerate() {
            self.bind(i + 1, value.as_ref())?;
        }
        Ok(())
    }

    /// Run a statement that produces no rows; returns the change count.
    pub fn execute(&mut self) -> Result<usize> {
        self.stmt.raw_execute().map_err(Error::Step)
    }

    /// Turn the bound statement into a row-streaming cursor.
    pub fn into_cursor(self) -> Result<Cursor<'c>> {
        Cursor::new(self.stmt)
    }
}

#[pin_project]
// Debug can not be derived because rusqlite::Rows doesn't implement it.
struct CursorInner<'a> {
    stmt: rusqlite::Statement<'a>,
    // Always Some once the constructor finishes; the Option only exists
    // so the stmt is in place before rows can reference it.
    rows: Option<rusqlite::Rows<'a>>,
}

impl<'a> CursorInner<'a> {
    fn new(stmt: rusqlite::Statement<'a>) -> Result<Pin<Box<Self>>> {
        let mut inner = Box::pin(CursorInner { stmt, rows: None });
        unsafe {
            // Soundness: stmt and the rows referencing it are pinned
            // together; neither can be dropped or moved without the other.
            let inner_ref = Pin::get_unchecked_mut(Pin::as_mut(&mut inner));
            let stmt_ref: *mut rusqlite::Statement<'a> = &mut inner_ref.stmt;
            inner_ref.rows = Some((*stmt_ref).raw_query());
        }
        Ok(inner)
    }

    fn advance(self: Pin<&mut Self>) -> Result<bool> {
        let this = self.project();
        let rows: &mut rusqlite::Rows<'a> = this.rows.as_mut().expect("constructed");
        Ok(rows.next().map_err(Error::Step)?.is_some())
    }

    fn current(self: Pin<&Self>) -> Option<&rusqlite::Row<'_>> {
        let this = self.project_ref();
        this.rows.as_ref().expect("constructed").get()
    }
}

/// A streaming cursor over a prepared statement's rows.
pub struct Cursor<'c> {
    inner: Pin<Box<CursorInner<'c>>>,
}

impl<'c> Cursor<'c> {
    fn new(stmt: rusqlite::Statement<'c>) -> Result<Self> {
        Ok(Cursor {
            inner: CursorInner::new(stmt)?,
        })
    }

    /// Advance to the next row. Returns false when the statement is done.
    pub fn step(&mut self) -> Result<bool> {
        self.inner.as_mut().advance()
    }

    /// Decode the column at `index` of the current row against the
    /// expected type.
    pub fn column(&self, index: usize, ty: &Ty) -> Result<Value> {
        let row = self
            .inner
            .as_ref()
            .current()
            .ok_or_else(|| Error::Internal("column() without a current row".to_string()))?;
        let raw = row
            .get_ref(index)
            .map_err(|_| Error::ColumnOutOfRange(index))?;
        decode_column(raw, ty)
    }

    /// Decode every column of the current row.
    pub fn row(&self, tys: &[Ty]) -> Result<Vec<Value>> {
        tys.iter()
            .enumerate()
            .map(|(i, ty)| self.column(i, ty))
            .collect()
    }
}

impl rusqlite::ToSql for ValueRef<'_> {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::ToSqlOutput::{Borrowed, Owned};
        Ok(match self {
            ValueRef::Null => Owned(rusqlite::types::Value::Null),
            ValueRef::Integer(i) => Owned(rusqlite::types::Value::Integer(*i)),
            ValueRef::Real(r) => Owned(rusqlite::types::Value::Real(*r)),
            ValueRef::Text(t) => Borrowed(rusqlite::types::ValueRef::Text(t.as_bytes())),
            ValueRef::Blob(b) => Borrowed(rusqlite::types::ValueRef::Blob(b)),
        })
    }
}

impl rusqlite::ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::ToSqlOutput::{Borrowed, Owned};
        Ok(match self {
            Value::Null => Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => Owned(rusqlite::types::Value::Integer(*i)),
            Value::Real(r) => Owned(rusqlite::types::Value::Real(*r)),
            Value::Text(t) => Borrowed(rusqlite::types::ValueRef::Text(t.as_bytes())),
            Value::Blob(b) => Borrowed(rusqlite::types::ValueRef::Blob(b)),
        })
    }
}

/// Decode a raw engine value against the inferred column type.
fn decode_column(raw: rusqlite::types::ValueRef<'_>, ty: &Ty) -> Result<Value> {
    let (base, nullable) = ty.strip_optional();
    if matches!(raw, rusqlite::types::ValueRef::Null) {
        if nullable || matches!(base, Ty::Any | Ty::Error | Ty::Var(_)) {
            return Ok(Value::Null);
        }
        return Err(Error::DecodeMismatch {
            expected: base.to_string(),
            found: "NULL".to_string(),
        });
    }
    let mismatch = |expected: &Ty| Error::DecodeMismatch {
        expected: expected.to_string(),
        found: raw.data_type().to_string(),
    };
    Ok(match base {
        Ty::Integer | Ty::Int | Ty::Bool => {
            Value::Integer(raw.as_i64().map_err(|_| mismatch(base))?)
        }
        Ty::Real => match raw {
            rusqlite::types::ValueRef::Integer(i) => Value::Real(i as f64),
            other => Value::Real(other.as_f64().map_err(|_| mismatch(base))?),
        },
        Ty::Text => Value::Text(raw.as_str().map_err(|_| mismatch(base))?.to_string()),
        Ty::Blob => Value::Blob(raw.as_blob().map_err(|_| mismatch(base))?.to_vec()),
        // dynamically typed columns surface whatever the engine stored
        _ => match raw {
            rusqlite::types::ValueRef::Integer(i) => Value::Integer(i),
            rusqlite::types::ValueRef::Real(r) => Value::Real(r),
            rusqlite::types::ValueRef::Text(t) => {
                Value::Text(String::from_utf8_lossy(t).into_owned())
            }
            rusqlite::types::ValueRef::Blob(b) => Value::Blob(b.to_vec()),
            rusqlite::types::ValueRef::Null => Value::Null,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open(":memory:").unwrap();
        conn.execute_batch(
            "CREATE TABLE t(a INTEGER NOT NULL, b TEXT);\
             INSERT INTO t VALUES (1, 'one'), (2, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn prepare_bind_step_decode() {
        let conn = memory_db();
        let mut stmt = conn.prepare("SELECT a, b FROM t WHERE a >= ? ORDER BY a").unwrap();
        stmt.bind(1, ValueRef::Integer(1)).unwrap();
        let mut cursor = stmt.into_cursor().unwrap();

        assert!(cursor.step().unwrap());
        assert_eq!(cursor.column(0, &Ty::Integer).unwrap(), Value::Integer(1));
        assert_eq!(
            cursor.column(1, &Ty::optional(Ty::Text)).unwrap(),
            Value::Text("one".to_string())
        );

        assert!(cursor.step().unwrap());
        assert_eq!(
            cursor.column(1, &Ty::optional(Ty::Text)).unwrap(),
            Value::Null
        );

        assert!(!cursor.step().unwrap());
    }

    #[test]
    fn null_in_non_nullable_column_is_a_decode_error() {
        let conn = memory_db();
        let stmt = conn.prepare("SELECT b FROM t WHERE a = 2").unwrap();
        let mut cursor = stmt.into_cursor().unwrap();
        assert!(cursor.step().unwrap());
        assert!(matches!(
            cursor.column(0, &Ty::Text),
            Err(Error::DecodeMismatch { .. })
        ));
    }

    #[test]
    fn column_out_of_range() {
        let conn = memory_db();
        let stmt = conn.prepare("SELECT a FROM t").unwrap();
        let mut cursor = stmt.into_cursor().unwrap();
        assert!(cursor.step().unwrap());
        assert!(matches!(
            cursor.column(5, &Ty::Integer),
            Err(Error::ColumnOutOfRange(5))
        ));
    }

    #[test]
    fn update_hook_reports_mutations() {
        use std::sync::{Arc, Mutex};
        let conn = memory_db();
        let seen: Arc<Mutex<Vec<RowChange>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        conn.install_update_hook(move |change| sink.lock().unwrap().push(change));
        conn.execute_batch("INSERT INTO t VALUES (3, 'three'); DELETE FROM t WHERE a = 1;")
            .unwrap();
        conn.clear_update_hook();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].op, ChangeOp::Insert);
        assert_eq!(seen[0].table, "t");
        assert_eq!(seen[1].op, ChangeOp::Delete);
        assert_eq!(seen[1].rowid, 1);
    }

    #[test]
    fn execute_reports_change_count() {
        let conn = memory_db();
        let mut stmt = conn.prepare("UPDATE t SET b = 'x'").unwrap();
        assert_eq!(stmt.execute().unwrap(), 2);
    }
}
