//! End-to-end pipeline checks: SQL text through the lexer, parser,
//! schema derivation and query compilation, plus the invariants every
//! stage is expected to hold.

use feather_core::compile::{compile_sql, CompiledQuery};
use feather_core::lexer;
use feather_core::migrations::{derive_schema, Migration};
use feather_core::parser::parse_sql;
use feather_core::{Schema, Ty};

const CORPUS: &[&str] = &[
    "SELECT 1;",
    "SELECT a, b AS two FROM t WHERE a = :x AND b BETWEEN 1 AND 10;",
    "SELECT t.*, u.c FROM t LEFT JOIN u ON u.a = t.a ORDER BY t.a DESC LIMIT 10 OFFSET 2;",
    "WITH top (a) AS (SELECT a FROM t) SELECT a FROM top INTERSECT SELECT a FROM u;",
    "INSERT INTO t (a, b) VALUES (1, 2), (3, 4) ON CONFLICT (a) DO UPDATE SET b = excluded.b;",
    "UPDATE t SET b = b + 1 WHERE a IN (SELECT a FROM u) RETURNING a, b;",
    "DELETE FROM t WHERE b ISNULL;",
    "CREATE TABLE n (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL DEFAULT ('')) STRICT;",
    "CREATE INDEX idx ON t (a DESC) WHERE b NOTNULL;",
    "CREATE VIEW va AS SELECT a FROM t;",
    "CREATE VIRTUAL TABLE fts USING fts5(body, meta UNINDEXED);",
    "PRAGMA user_version = 4;",
    "BEGIN IMMEDIATE;",
    "COMMIT;",
    "ROLLBACK;",
    "SELECT CASE b WHEN 1 THEN 'one' WHEN 2 THEN 'two' END FROM t; -- trailing\n",
    "/* leading */ SELECT count(*) FILTER (WHERE a > 0) FROM t;",
];

fn fixture_schema() -> Schema {
    let (schema, diagnostics) = Schema::from_sql(
        "CREATE TABLE t(a INTEGER NOT NULL, b INTEGER);\
         CREATE TABLE u(a INTEGER NOT NULL, c TEXT NOT NULL);",
    );
    assert!(diagnostics.is_empty(), "{diagnostics:?}");
    schema
}

#[test]
fn token_ranges_reconstruct_every_corpus_entry() {
    for source in CORPUS {
        let (tokens, diagnostics) = lexer::tokenize(source);
        assert!(diagnostics.is_empty(), "lex issues in {source:?}: {diagnostics:?}");
        let mut rebuilt = String::new();
        let mut last = 0;
        for token in &tokens {
            rebuilt.push_str(&source[last..token.location.start]);
            rebuilt.push_str(token.location.slice(source));
            last = token.location.end;
        }
        rebuilt.push_str(&source[last..]);
        assert_eq!(&rebuilt, source);
    }
}

#[test]
fn statement_spans_are_substrings_of_the_input() {
    for source in CORPUS {
        let (stmts, diagnostics) = parse_sql(source);
        assert!(diagnostics.is_empty(), "parse issues in {source:?}: {diagnostics:?}");
        assert!(!stmts.is_empty(), "no statement in {source:?}");
        for stmt in &stmts {
            assert!(stmt.location.end <= source.len());
            let covered = stmt.location.slice(source);
            // the span must cover the statement exactly: it re-parses to
            // a tree with the same description
            let (reparsed, rediag) = parse_sql(covered);
            assert!(rediag.is_empty(), "span of {source:?} re-lexes dirty: {covered:?}");
            assert_eq!(reparsed.len(), 1);
            assert_eq!(reparsed[0].to_string(), stmt.to_string());
        }
    }
}

#[test]
fn print_reparse_is_a_fixpoint_across_the_corpus() {
    for source in CORPUS {
        let (stmts, _) = parse_sql(source);
        for stmt in &stmts {
            let printed = stmt.to_string();
            let (reparsed, diagnostics) = parse_sql(&printed);
            assert!(
                diagnostics.is_empty(),
                "description of {source:?} does not re-parse: {printed:?} -> {diagnostics:?}"
            );
            assert_eq!(reparsed.len(), 1, "{printed:?}");
            assert_eq!(reparsed[0].to_string(), printed, "unstable description for {source:?}");
        }
    }
}

#[test]
fn diagnostic_ranges_are_always_valid() {
    let broken = [
        "SELECT 'unterminated",
        "SELECT FROM WHERE;",
        "CREATE TABLE (a INTEGER);",
        "SELECT a FROM t WHERE a ^^ 2;",
        "INSERT INTO;",
        "12 + 34",
    ];
    for source in broken {
        let (_, diagnostics) = parse_sql(source);
        assert!(!diagnostics.is_empty(), "expected diagnostics for {source:?}");
        for diagnostic in diagnostics.iter() {
            assert!(
                diagnostic.location.start <= diagnostic.location.end,
                "inverted range in {source:?}: {diagnostic:?}"
            );
            assert!(
                diagnostic.location.end <= source.len(),
                "range past EOF in {source:?}: {diagnostic:?}"
            );
        }
    }
}

#[test]
fn compiling_the_corpus_leaves_no_type_variables() {
    let schema = fixture_schema();
    for source in CORPUS {
        let result = compile_sql(&schema, source);
        for input in &result.query.inputs {
            assert!(!matches!(input.ty, Ty::Var(_)), "{source:?}: {input:?}");
        }
        for output in &result.query.outputs {
            assert!(!matches!(output.ty, Ty::Var(_)), "{source:?}: {output:?}");
        }
    }
}

#[test]
fn select_output_count_matches_star_expansion() {
    let schema = fixture_schema();
    let result = compile_sql(&schema, "SELECT *, t.a, u.* FROM t JOIN u ON u.a = t.a;");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    // 4 from *, 1 explicit, 2 from u.*
    assert_eq!(result.query.outputs.len(), 7);
}

#[test]
fn todo_app_queries_compile_against_their_migrations() {
    let migrations = vec![
        Migration::new(
            1,
            "CREATE TABLE lists(id INTEGER PRIMARY KEY, title TEXT NOT NULL);\
             CREATE TABLE todos(\
               id INTEGER PRIMARY KEY,\
               list INTEGER NOT NULL REFERENCES lists (id) ON DELETE CASCADE,\
               body TEXT NOT NULL,\
               done INTEGER NOT NULL DEFAULT (0),\
               due TEXT\
             );",
        ),
        Migration::new(2, "CREATE INDEX todos_list ON todos (list);"),
    ];
    let (schema, diagnostics) = derive_schema(&migrations);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let open_items = compile_sql(
        &schema,
        "SELECT todos.id, body, due FROM todos \
         JOIN lists ON lists.id = todos.list \
         WHERE lists.id = :list AND done = 0 ORDER BY due;",
    );
    assert!(open_items.diagnostics.is_empty(), "{:?}", open_items.diagnostics);
    let query: &CompiledQuery = &open_items.query;
    assert_eq!(query.inputs.len(), 1);
    assert_eq!(query.inputs[0].name, ":list");
    assert_eq!(query.inputs[0].ty, Ty::Integer);
    let names: Vec<&str> = query.outputs.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["id", "body", "due"]);
    assert!(!query.outputs[0].nullable());
    assert!(!query.outputs[1].nullable());
    assert!(query.outputs[2].nullable());

    let complete = compile_sql(
        &schema,
        "UPDATE todos SET done = 1 WHERE id = ?1 RETURNING id;",
    );
    assert!(complete.diagnostics.is_empty(), "{:?}", complete.diagnostics);
    assert_eq!(complete.query.inputs[0].name, "?1");
    assert_eq!(complete.query.inputs[0].ty, Ty::Integer);
    assert_eq!(complete.query.outputs.len(), 1);
}
