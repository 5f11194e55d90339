//! The query compiler.
//!
//! Walks one SELECT/INSERT/UPDATE/DELETE statement against an ambient
//! [`Schema`] and produces a [`CompiledQuery`]: the ordered bind
//! parameters the statement consumes and the ordered, typed columns it
//! produces. Problems accumulate in the diagnostic bag; the caller always
//! receives a (possibly partial) artifact.

use serde::{Deserialize, Serialize};

use crate::ast::*;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::infer::{CteDef, Inferencer, Source};
use crate::schema::{Schema, TableKind};
use crate::types::Ty;

/// One bind parameter: the source spelling (`?N`, `:x`, `@x`, `$x`) and
/// the inferred type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryInput {
    pub name: String,
    pub ty: Ty,
}

/// One result column: output name and inferred type. Nullability is the
/// structural `Optional` wrapper on `ty`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub name: String,
    pub ty: Ty,
}

impl QueryOutput {
    pub fn nullable(&self) -> bool {
        self.ty.is_optional()
    }
}

/// The stable exchange record handed to downstream code generators.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    pub inputs: Vec<QueryInput>,
    pub outputs: Vec<QueryOutput>,
}

#[derive(Clone, Debug)]
pub struct CompileResult {
    pub query: CompiledQuery,
    pub diagnostics: Diagnostics,
}

impl CompileResult {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Compile a single parsed statement against `schema`.
pub fn compile_statement(schema: &Schema, stmt: &Stmt) -> CompileResult {
    let mut inf = Inferencer::new(schema);
    let outputs = match &stmt.kind {
        StmtKind::Select(select) => compile_select(&mut inf, select),
        StmtKind::Insert(insert) => compile_insert(&mut inf, insert),
        StmtKind::Update(update) => compile_update(&mut inf, update),
        StmtKind::Delete(delete) => compile_delete(&mut inf, delete),
        // DDL and transaction control produce no rows and take no inputs
        _ => Vec::new(),
    };
    let query = CompiledQuery {
        inputs: inf
            .inputs
            .iter()
            .map(|slot| QueryInput {
                name: slot.name.clone(),
                ty: inf.subst.finalize(&slot.ty),
            })
            .collect(),
        outputs: outputs
            .into_iter()
            .map(|(name, ty)| QueryOutput {
                name,
                ty: inf.subst.finalize(&ty),
            })
            .collect(),
    };
    CompileResult {
        query,
        diagnostics: inf.diagnostics,
    }
}

/// Lex, parse and compile one statement of SQL text.
pub fn compile_sql(schema: &Schema, source: &str) -> CompileResult {
    let (stmt, mut diagnostics) = crate::parser::parse_statement(source);
    let mut result = match stmt {
        Some(stmt) => compile_statement(schema, &stmt),
        None => CompileResult {
            query: CompiledQuery::default(),
            diagnostics: Diagnostics::new(),
        },
    };
    diagnostics.extend(result.diagnostics);
    result.diagnostics = diagnostics;
    result
}

/// The output columns a select produces, for schema derivation (views,
/// `CREATE TABLE ... AS SELECT`).
pub(crate) fn select_columns(
    schema: &Schema,
    select: &SelectStmt,
    diagnostics: &mut Diagnostics,
) -> Vec<(String, Ty)> {
    let mut inf = Inferencer::new(schema);
    let columns = compile_select(&mut inf, select);
    let finalized = columns
        .into_iter()
        .map(|(name, ty)| {
            let ty = inf.subst.finalize(&ty);
            (name, ty)
        })
        .collect();
    diagnostics.extend(inf.diagnostics);
    finalized
}

/// Compile a subquery in the current inference context (scopes remain
/// visible, so correlated references resolve).
pub(crate) fn subquery_columns(inf: &mut Inferencer, select: &SelectStmt) -> Vec<(String, Ty)> {
    compile_select(inf, select)
}

// ------------------------------------------------------------------ SELECT

fn compile_select(inf: &mut Inferencer, select: &SelectStmt) -> Vec<(String, Ty)> {
    let cte_mark = register_ctes(inf, select.with.as_ref());

    // first core keeps its scope open: ORDER BY and LIMIT are evaluated in
    // it (plus the output aliases) purely for their input side effects
    let mut outputs = compile_core(inf, &select.body.first, true);
    for (_, core) in &select.body.compounds {
        let arm = compile_core(inf, core, false);
        if arm.len() != outputs.len() {
            inf.diagnostics.push(Diagnostic::new(
                DiagnosticKind::ArityMismatch,
                format!(
                    "Compound select arms produce {} and {} columns",
                    outputs.len(),
                    arm.len()
                ),
                select.location,
            ));
        } else {
            // the output row type is the column-wise unification of the arms
            for ((_, out_ty), (_, arm_ty)) in outputs.iter_mut().zip(arm.iter()) {
                *out_ty = inf.unify(out_ty, arm_ty, select.location);
            }
        }
    }

    if !select.order_by.is_empty() || select.limit.is_some() {
        // output aliases shadow the FROM columns, so `ORDER BY name`
        // resolves to the projected column rather than tripping over the
        // source column of the same name
        inf.env.push_scope();
        inf.env.add_source(Source {
            name: None,
            columns: outputs.clone(),
            has_rowid: false,
        });
        for term in &select.order_by {
            inf.infer_expr(&term.expr);
        }
        if let Some(limit) = &select.limit {
            let limit_ty = inf.infer_expr(&limit.limit);
            inf.unify(&limit_ty, &Ty::Integer, limit.limit.location);
            if let Some(offset) = &limit.offset {
                let offset_ty = inf.infer_expr(offset);
                inf.unify(&offset_ty, &Ty::Integer, offset.location);
            }
        }
        inf.env.pop_scope();
    }
    inf.env.pop_scope();

    inf.ctes.truncate(cte_mark);
    outputs
}

/// Register the CTEs of a `WITH` clause and return the registry length to
/// truncate back to. Recursive CTEs are forward-declared with fresh type
/// variables, then pinned to their first arm's output.
fn register_ctes(inf: &mut Inferencer, with: Option<&WithClause>) -> usize {
    let mark = inf.ctes.len();
    let Some(with) = with else {
        return mark;
    };
    for cte in &with.ctes {
        if with.recursive {
            // find the column names first: the declared list, or the
            // first (non-recursive) arm compiled on its own
            let names: Vec<String> = if cte.columns.is_empty() {
                let first_only = SelectStmt {
                    id: cte.select.id,
                    location: cte.select.location,
                    with: None,
                    body: SelectBody {
                        first: cte.select.body.first.clone(),
                        compounds: Vec::new(),
                    },
                    order_by: Vec::new(),
                    limit: None,
                };
                compile_select(inf, &first_only)
                    .into_iter()
                    .map(|(name, _)| name)
                    .collect()
            } else {
                cte.columns.iter().map(|c| c.text().to_string()).collect()
            };
            let forward: Vec<(String, Ty)> = names
                .into_iter()
                .map(|name| {
                    let var = inf.subst.fresh();
                    (name, var)
                })
                .collect();
            inf.ctes.push(CteDef {
                name: cte.name.text().to_string(),
                columns: forward.clone(),
            });
            let body = compile_select(inf, &cte.select);
            if body.len() != forward.len() {
                inf.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ArityMismatch,
                    format!(
                        "Recursive table '{}' declares {} columns but its select produces {}",
                        cte.name.text(),
                        forward.len(),
                        body.len()
                    ),
                    cte.select.location,
                ));
            } else {
                for ((_, declared), (_, inferred)) in forward.iter().zip(body.iter()) {
                    inf.unify(declared, inferred, cte.select.location);
                }
            }
        } else {
            let mut columns = compile_select(inf, &cte.select);
            if !cte.columns.is_empty() {
                if cte.columns.len() != columns.len() {
                    inf.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ArityMismatch,
                        format!(
                            "Table '{}' declares {} columns but its select produces {}",
                            cte.name.text(),
                            cte.columns.len(),
                            columns.len()
                        ),
                        cte.select.location,
                    ));
                }
                for (column, name) in columns.iter_mut().zip(cte.columns.iter()) {
                    column.0 = name.text().to_string();
                }
            }
            inf.ctes.push(CteDef {
                name: cte.name.text().to_string(),
                columns,
            });
        }
    }
    mark
}

/// Compile one select core. The core's scope is popped unless
/// `keep_scope` is set (the enclosing select pops it after ORDER BY).
fn compile_core(inf: &mut Inferencer, core: &SelectCore, keep_scope: bool) -> Vec<(String, Ty)> {
    inf.env.push_scope();
    let outputs = match core {
        SelectCore::Values(rows) => {
            let mut outputs: Vec<(String, Ty)> = Vec::new();
            for (row_index, row) in rows.iter().enumerate() {
                let tys: Vec<Ty> = row.iter().map(|expr| inf.infer_expr(expr)).collect();
                if row_index == 0 {
                    outputs = tys
                        .into_iter()
                        .enumerate()
                        .map(|(i, ty)| (format!("column{}", i + 1), ty))
                        .collect();
                } else if tys.len() != outputs.len() {
                    let location = row
                        .first()
                        .map(|e| e.location)
                        .unwrap_or_default();
                    inf.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ArityMismatch,
                        format!(
                            "VALUES rows have {} and {} columns",
                            outputs.len(),
                            tys.len()
                        ),
                        location,
                    ));
                } else {
                    for ((_, out_ty), ty) in outputs.iter_mut().zip(tys.iter()) {
                        let location = row.first().map(|e| e.location).unwrap_or_default();
                        *out_ty = inf.unify(out_ty, ty, location);
                    }
                }
            }
            outputs
        }
        SelectCore::Select {
            columns,
            from,
            where_clause,
            group_by,
            having,
            ..
        } => {
            if let Some(from) = from {
                add_from_clause(inf, from);
            }
            let mut outputs: Vec<(String, Ty)> = Vec::new();
            for column in columns {
                match column {
                    ResultColumn::Star => {
                        // all in-scope columns, source order
                        for source in inf.env.current_sources().to_vec() {
                            outputs.extend(source.columns.iter().cloned());
                        }
                    }
                    ResultColumn::TableStar(table) => {
                        let found = inf
                            .env
                            .current_sources()
                            .iter()
                            .find(|source| {
                                source
                                    .name
                                    .as_deref()
                                    .map(|name| name.eq_ignore_ascii_case(table.text()))
                                    .unwrap_or(false)
                            })
                            .cloned();
                        match found {
                            Some(source) => outputs.extend(source.columns.iter().cloned()),
                            None => inf.diagnostics.push(Diagnostic::new(
                                DiagnosticKind::TableNotFound,
                                format!("Table '{}' not found", table.text()),
                                table.location,
                            )),
                        }
                    }
                    ResultColumn::Expr { expr, alias } => {
                        let ty = inf.infer_expr(expr);
                        let name = match alias {
                            Some(alias) => alias.text().to_string(),
                            None => match &expr.kind {
                                ExprKind::Column(column) => column.column.text().to_string(),
                                _ => format!("column{}", outputs.len() + 1),
                            },
                        };
                        outputs.push((name, ty));
                    }
                }
            }
            if let Some(where_clause) = where_clause {
                inf.check_predicate(where_clause, "WHERE");
            }
            for expr in group_by {
                inf.infer_expr(expr);
            }
            if let Some(having) = having {
                inf.check_predicate(having, "HAVING");
            }
            outputs
        }
    };
    if !keep_scope {
        inf.env.pop_scope();
    }
    outputs
}

// -------------------------------------------------------------------- FROM

fn add_from_clause(inf: &mut Inferencer, from: &FromClause) {
    // resolve all sources first so join nullability can wrap them, then
    // extend the environment, then type the ON constraints
    let mut sources = vec![resolve_source(inf, &from.source)];
    for join in &from.joins {
        let mut source = resolve_source(inf, &join.source);
        if join.op.nullable_right() {
            wrap_source(&mut source);
        }
        if join.op.nullable_left() {
            for earlier in &mut sources {
                wrap_source(earlier);
            }
        }
        sources.push(source);
    }
    for source in sources {
        inf.env.add_source(source);
    }
    for join in &from.joins {
        match &join.constraint {
            Some(JoinConstraint::On(expr)) => inf.check_predicate(expr, "ON"),
            Some(JoinConstraint::Using(_)) | None => {}
        }
    }
}

fn wrap_source(source: &mut Source) {
    for (_, ty) in &mut source.columns {
        *ty = Ty::optional(ty.clone());
    }
}

fn resolve_source(inf: &mut Inferencer, source: &TableOrSubquery) -> Source {
    match source {
        TableOrSubquery::Table { name, alias } => {
            let table_name = name.name.text();
            let source_name = alias
                .as_ref()
                .map(|a| a.text().to_string())
                .unwrap_or_else(|| table_name.to_string());
            if let Some(cte) = inf.lookup_cte(table_name) {
                return Source {
                    name: Some(source_name),
                    columns: cte.columns.clone(),
                    has_rowid: false,
                };
            }
            match inf.schema.get_table(table_name) {
                Some(table) => Source {
                    name: Some(source_name),
                    columns: table
                        .columns
                        .iter()
                        .map(|column| (column.name.clone(), column.read_ty()))
                        .collect(),
                    has_rowid: table.kind == TableKind::Table && !table.options.without_rowid,
                },
                None => {
                    inf.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TableNotFound,
                        format!("Table '{table_name}' not found"),
                        name.location,
                    ));
                    Source {
                        name: Some(source_name),
                        columns: Vec::new(),
                        has_rowid: false,
                    }
                }
            }
        }
        TableOrSubquery::Subquery { select, alias } => {
            let columns = compile_select(inf, select);
            Source {
                name: alias.as_ref().map(|a| a.text().to_string()),
                columns,
                has_rowid: false,
            }
        }
        TableOrSubquery::Function { name, args, alias } => {
            for arg in args {
                inf.infer_expr(arg);
            }
            let columns = table_function_columns(name.name.text());
            Source {
                name: Some(
                    alias
                        .as_ref()
                        .map(|a| a.text().to_string())
                        .unwrap_or_else(|| name.name.text().to_string()),
                ),
                columns,
                has_rowid: false,
            }
        }
    }
}

/// Columns of the table-valued functions the checker knows about. Other
/// modules are surfaced with no columns and left unanalyzed.
fn table_function_columns(name: &str) -> Vec<(String, Ty)> {
    match name.to_ascii_lowercase().as_str() {
        "json_each" | "json_tree" => [
            ("key", Ty::optional(Ty::Any)),
            ("value", Ty::optional(Ty::Any)),
            ("type", Ty::Text),
            ("atom", Ty::optional(Ty::Any)),
            ("id", Ty::Integer),
            ("parent", Ty::optional(Ty::Integer)),
            ("fullkey", Ty::Text),
            ("path", Ty::Text),
        ]
        .into_iter()
        .map(|(name, ty)| (name.to_string(), ty))
        .collect(),
        _ => Vec::new(),
    }
}

// --------------------------------------------------------------------- DML

/// The target table's columns, or an empty list plus a diagnostic.
fn target_table(inf: &mut Inferencer, name: &QualifiedName) -> Option<Source> {
    match inf.schema.get_table(name.name.text()) {
        Some(table) => Some(Source {
            name: Some(table.name.clone()),
            columns: table
                .columns
                .iter()
                .map(|column| (column.name.clone(), column.read_ty()))
                .collect(),
            has_rowid: table.kind == TableKind::Table && !table.options.without_rowid,
        }),
        None => {
            inf.diagnostics.push(Diagnostic::new(
                DiagnosticKind::TableNotFound,
                format!("Table '{}' not found", name.name.text()),
                name.location,
            ));
            None
        }
    }
}

/// The declared (non-optional) types of the insert targets: the named
/// column list when present, else every table column in order.
fn insert_targets(
    inf: &mut Inferencer,
    table: &QualifiedName,
    columns: &[Ident],
) -> Vec<(String, Ty)> {
    let Some(schema_table) = inf.schema.get_table(table.name.text()) else {
        return Vec::new();
    };
    if columns.is_empty() {
        return schema_table
            .columns
            .iter()
            .map(|column| (column.name.clone(), column.read_ty()))
            .collect();
    }
    let schema_table = schema_table.clone();
    columns
        .iter()
        .filter_map(|name| match schema_table.column(name.text()) {
            Some(column) => Some((column.name.clone(), column.read_ty())),
            None => {
                inf.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ColumnNotFound,
                    format!(
                        "Column '{}' not found in '{}'",
                        name.text(),
                        schema_table.name
                    ),
                    name.location,
                ));
                None
            }
        })
        .collect()
}

fn compile_insert(inf: &mut Inferencer, insert: &InsertStmt) -> Vec<(String, Ty)> {
    let cte_mark = register_ctes(inf, insert.with.as_ref());
    let target = target_table(inf, &insert.table);
    let targets = insert_targets(inf, &insert.table, &insert.columns);

    match &insert.source {
        InsertSource::DefaultValues => {}
        InsertSource::Values(rows) => {
            for row in rows {
                if row.len() != targets.len() && !targets.is_empty() {
                    let location = row
                        .first()
                        .map(|e| e.location)
                        .unwrap_or(insert.location);
                    inf.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ArityMismatch,
                        format!(
                            "INSERT supplies {} values for {} columns",
                            row.len(),
                            targets.len()
                        ),
                        location,
                    ));
                }
                for (expr, (_, target_ty)) in row.iter().zip(targets.iter()) {
                    let ty = inf.infer_expr(expr);
                    let target_ty = target_ty.clone();
                    inf.unify(&ty, &target_ty, expr.location);
                }
            }
        }
        InsertSource::Select(select) => {
            let columns = compile_select(inf, select);
            if columns.len() != targets.len() && !targets.is_empty() {
                inf.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ArityMismatch,
                    format!(
                        "INSERT selects {} columns for {} targets",
                        columns.len(),
                        targets.len()
                    ),
                    select.location,
                ));
            }
            for ((_, column_ty), (_, target_ty)) in columns.iter().zip(targets.iter()) {
                inf.unify(column_ty, target_ty, select.location);
            }
        }
    }

    let mut outputs = Vec::new();
    if let Some(target) = target {
        let alias = insert
            .alias
            .as_ref()
            .map(|a| a.text().to_string())
            .unwrap_or_else(|| target.name.clone().unwrap_or_default());
        // the upsert SET expressions and RETURNING clause see the target
        // row, and upsert additionally sees `excluded`
        if !insert.upsert.is_empty() {
            inf.env.push_scope();
            inf.env.add_source(Source {
                name: Some(alias.clone()),
                columns: target.columns.clone(),
                has_rowid: target.has_rowid,
            });
            inf.env.add_source(Source {
                name: Some("excluded".to_string()),
                columns: target.columns.clone(),
                has_rowid: false,
            });
            for upsert in &insert.upsert {
                if let Some(where_clause) = &upsert.target_where {
                    inf.check_predicate(where_clause, "ON CONFLICT WHERE");
                }
                if let UpsertAction::Update { sets, where_clause } = &upsert.action {
                    compile_set_actions(inf, &target, sets);
                    if let Some(where_clause) = where_clause {
                        inf.check_predicate(where_clause, "WHERE");
                    }
                }
            }
            inf.env.pop_scope();
        }
        if let Some(returning) = &insert.returning {
            outputs = compile_returning(inf, &target, &alias, returning);
        }
    }
    inf.ctes.truncate(cte_mark);
    outputs
}

/// Each SET action binds the target column's type to its right-hand side.
fn compile_set_actions(inf: &mut Inferencer, target: &Source, sets: &[SetAction]) {
    for set in sets {
        let value_ty = inf.infer_expr(&set.value);
        match set.columns.as_slice() {
            [single] => match target.column_named(single.text()) {
                Some(column_ty) => {
                    inf.unify(&column_ty, &value_ty, set.value.location);
                }
                None => inf.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ColumnNotFound,
                    format!(
                        "Column '{}' not found in '{}'",
                        single.text(),
                        target.name.as_deref().unwrap_or("?")
                    ),
                    single.location,
                )),
            },
            many => {
                // (a, b) = (expr, expr) or a row-valued subquery
                let column_tys: Vec<Ty> = many
                    .iter()
                    .filter_map(|name| {
                        let found = target.column_named(name.text());
                        if found.is_none() {
                            inf.diagnostics.push(Diagnostic::new(
                                DiagnosticKind::ColumnNotFound,
                                format!(
                                    "Column '{}' not found in '{}'",
                                    name.text(),
                                    target.name.as_deref().unwrap_or("?")
                                ),
                                name.location,
                            ));
                        }
                        found
                    })
                    .collect();
                let row = Ty::Row(crate::types::RowTy::Tuple(column_tys));
                inf.unify(&row, &value_ty, set.value.location);
            }
        }
    }
}

fn compile_returning(
    inf: &mut Inferencer,
    target: &Source,
    alias: &str,
    returning: &[ResultColumn],
) -> Vec<(String, Ty)> {
    inf.env.push_scope();
    inf.env.add_source(Source {
        name: Some(alias.to_string()),
        columns: target.columns.clone(),
        has_rowid: target.has_rowid,
    });
    let mut outputs = Vec::new();
    for column in returning {
        match column {
            ResultColumn::Star => outputs.extend(target.columns.iter().cloned()),
            ResultColumn::TableStar(table) => {
                if table.eq_ignore_case(alias) {
                    outputs.extend(target.columns.iter().cloned());
                } else {
                    inf.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::TableNotFound,
                        format!("Table '{}' not found", table.text()),
                        table.location,
                    ));
                }
            }
            ResultColumn::Expr { expr, alias } => {
                let ty = inf.infer_expr(expr);
                let name = match alias {
                    Some(alias) => alias.text().to_string(),
                    None => match &expr.kind {
                        ExprKind::Column(column) => column.column.text().to_string(),
                        _ => format!("column{}", outputs.len() + 1),
                    },
                };
                outputs.push((name, ty));
            }
        }
    }
    inf.env.pop_scope();
    outputs
}

fn compile_update(inf: &mut Inferencer, update: &UpdateStmt) -> Vec<(String, Ty)> {
    let cte_mark = register_ctes(inf, update.with.as_ref());
    let target = target_table(inf, &update.table);
    let mut outputs = Vec::new();
    if let Some(target) = target {
        let alias = update
            .alias
            .as_ref()
            .map(|a| a.text().to_string())
            .unwrap_or_else(|| target.name.clone().unwrap_or_default());
        inf.env.push_scope();
        inf.env.add_source(Source {
            name: Some(alias.clone()),
            columns: target.columns.clone(),
            has_rowid: target.has_rowid,
        });
        if let Some(from) = &update.from {
            add_from_clause(inf, from);
        }
        compile_set_actions(inf, &target, &update.sets);
        if let Some(where_clause) = &update.where_clause {
            inf.check_predicate(where_clause, "WHERE");
        }
        inf.env.pop_scope();
        if let Some(returning) = &update.returning {
            outputs = compile_returning(inf, &target, &alias, returning);
        }
    } else {
        // still collect inputs from the WHERE and SET expressions
        for set in &update.sets {
            inf.infer_expr(&set.value);
        }
        if let Some(where_clause) = &update.where_clause {
            inf.infer_expr(where_clause);
        }
    }
    inf.ctes.truncate(cte_mark);
    outputs
}

fn compile_delete(inf: &mut Inferencer, delete: &DeleteStmt) -> Vec<(String, Ty)> {
    let cte_mark = register_ctes(inf, delete.with.as_ref());
    let target = target_table(inf, &delete.table);
    let mut outputs = Vec::new();
    if let Some(target) = target {
        let alias = delete
            .alias
            .as_ref()
            .map(|a| a.text().to_string())
            .unwrap_or_else(|| target.name.clone().unwrap_or_default());
        inf.env.push_scope();
        inf.env.add_source(Source {
            name: Some(alias.clone()),
            columns: target.columns.clone(),
            has_rowid: target.has_rowid,
        });
        if let Some(where_clause) = &delete.where_clause {
            inf.check_predicate(where_clause, "WHERE");
        }
        inf.env.pop_scope();
        if let Some(returning) = &delete.returning {
            outputs = compile_returning(inf, &target, &alias, returning);
        }
    } else if let Some(where_clause) = &delete.where_clause {
        inf.infer_expr(where_clause);
    }
    inf.ctes.truncate(cte_mark);
    outputs
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::diag::FixIt;

    fn fixture_schema() -> Schema {
        let (schema, diagnostics) = Schema::from_sql(
            "CREATE TABLE t(a INTEGER NOT NULL, b INTEGER);\
             CREATE TABLE u(a INTEGER NOT NULL, c TEXT NOT NULL);",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        schema
    }

    fn compile(sql: &str) -> CompileResult {
        compile_sql(&fixture_schema(), sql)
    }

    fn compile_clean(sql: &str) -> CompiledQuery {
        let result = compile(sql);
        assert!(
            result.diagnostics.is_empty(),
            "unexpected diagnostics for {sql:?}: {:?}",
            result.diagnostics
        );
        result.query
    }

    fn outputs(query: &CompiledQuery) -> Vec<(&str, &Ty)> {
        query
            .outputs
            .iter()
            .map(|o| (o.name.as_str(), &o.ty))
            .collect()
    }

    #[test]
    fn arithmetic_with_nullable_column() {
        let query = compile_clean("SELECT a + b AS s FROM t;");
        assert_eq!(outputs(&query), vec![("s", &Ty::optional(Ty::Integer))]);
        assert!(query.inputs.is_empty());
    }

    #[test]
    fn named_bind_inferred_from_comparison() {
        let query = compile_clean("SELECT * FROM t WHERE a = :x;");
        assert_eq!(query.inputs.len(), 1);
        assert_eq!(query.inputs[0].name, ":x");
        assert_eq!(query.inputs[0].ty, Ty::Integer);
        assert_eq!(
            outputs(&query),
            vec![("a", &Ty::Integer), ("b", &Ty::optional(Ty::Integer))]
        );
    }

    #[test]
    fn left_join_wraps_right_side_nullable() {
        let query = compile_clean("SELECT t.a, u.c FROM t LEFT JOIN u ON u.a = t.a;");
        assert_eq!(
            outputs(&query),
            vec![("a", &Ty::Integer), ("c", &Ty::optional(Ty::Text))]
        );
    }

    #[test]
    fn inner_join_leaves_nullability_untouched() {
        let query = compile_clean("SELECT t.a, u.c FROM t JOIN u ON u.a = t.a;");
        assert_eq!(
            outputs(&query),
            vec![("a", &Ty::Integer), ("c", &Ty::Text)]
        );
    }

    #[test]
    fn ambiguous_column_gets_fixit_and_error_output() {
        let result = compile("SELECT a FROM t, u;");
        let diagnostic = result
            .diagnostics
            .iter()
            .find(|d| d.kind == DiagnosticKind::AmbiguousColumn)
            .expect("ambiguity diagnostic");
        assert_eq!(
            diagnostic.message,
            "Column 'a' is ambiguous in the current context"
        );
        match &diagnostic.fixit {
            Some(FixIt::Replace { text, .. }) => assert_eq!(text, "t.a"),
            other => panic!("expected replace fix-it, got {other:?}"),
        }
        assert_eq!(result.query.outputs.len(), 1);
        assert_eq!(result.query.outputs[0].ty, Ty::Error);
    }

    #[test]
    fn between_predicate_is_boolean() {
        let query = compile_clean("SELECT 1 WHERE 5 BETWEEN 1 AND 10;");
        assert_eq!(query.outputs.len(), 1);
    }

    #[test]
    fn star_expansion_matches_projection_count() {
        let query = compile_clean("SELECT * FROM t JOIN u ON u.a = t.a;");
        assert_eq!(query.outputs.len(), 4);
        let query = compile_clean("SELECT u.* FROM t JOIN u ON u.a = t.a;");
        assert_eq!(query.outputs.len(), 2);
    }

    #[test]
    fn duplicate_projection_is_preserved() {
        let query = compile_clean("SELECT a, a FROM t;");
        assert_eq!(
            outputs(&query),
            vec![("a", &Ty::Integer), ("a", &Ty::Integer)]
        );
    }

    #[test]
    fn synthesized_output_names() {
        let query = compile_clean("SELECT a + 1, b FROM t;");
        assert_eq!(query.outputs[0].name, "column1");
        assert_eq!(query.outputs[1].name, "b");
    }

    #[test]
    fn insert_binds_take_target_column_types() {
        let query = compile_clean("INSERT INTO t (a, b) VALUES (:a, :b);");
        assert_eq!(query.inputs[0].name, ":a");
        assert_eq!(query.inputs[0].ty, Ty::Integer);
        assert_eq!(query.inputs[1].name, ":b");
        assert_eq!(query.inputs[1].ty, Ty::optional(Ty::Integer));
        assert!(query.outputs.is_empty());
    }

    #[test]
    fn positional_parameters_are_numbered_in_appearance_order() {
        let query = compile_clean("SELECT * FROM t WHERE a = ? AND b = ? AND a = ?1;");
        let names: Vec<&str> = query.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["?1", "?2"]);
    }

    #[test]
    fn duplicate_named_parameters_coalesce() {
        let query = compile_clean("SELECT * FROM t WHERE a = :x AND b = :x;");
        assert_eq!(query.inputs.len(), 1);
        assert_eq!(query.inputs[0].ty, Ty::Integer);
    }

    #[test]
    fn conflicting_parameter_uses_are_reported() {
        let result = compile("SELECT * FROM t WHERE a = :x AND :x = x'FF';");
        assert!(result.diagnostics.contains_kind(DiagnosticKind::IncorrectType));
    }

    #[test]
    fn compound_arms_unify_columnwise() {
        let query = compile_clean("SELECT a FROM t UNION SELECT c FROM u;");
        assert_eq!(outputs(&query), vec![("a", &Ty::Text)]);
    }

    #[test]
    fn compound_arity_mismatch_is_reported() {
        let result = compile("SELECT a FROM t UNION SELECT a, c FROM u;");
        assert!(result.diagnostics.contains_kind(DiagnosticKind::ArityMismatch));
    }

    #[test]
    fn update_collects_inputs_in_appearance_order() {
        let query = compile_clean("UPDATE t SET b = :v WHERE a = ?;");
        let names: Vec<&str> = query.inputs.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec![":v", "?1"]);
        assert_eq!(query.inputs[0].ty, Ty::optional(Ty::Integer));
        assert_eq!(query.inputs[1].ty, Ty::Integer);
    }

    #[test]
    fn delete_outputs_come_from_returning_only() {
        let query = compile_clean("DELETE FROM t WHERE a = 1;");
        assert!(query.outputs.is_empty());
        let query = compile_clean("DELETE FROM t WHERE a = 1 RETURNING *;");
        assert_eq!(query.outputs.len(), 2);
    }

    #[test]
    fn upsert_set_expressions_contribute_inputs() {
        let query = compile_clean(
            "INSERT INTO t (a, b) VALUES (1, 2) \
             ON CONFLICT (a) DO UPDATE SET b = :bump;",
        );
        assert_eq!(query.inputs.len(), 1);
        assert_eq!(query.inputs[0].name, ":bump");
        assert_eq!(query.inputs[0].ty, Ty::optional(Ty::Integer));
    }

    #[test]
    fn scalar_subquery_is_nullable_and_correlates() {
        let query = compile_clean("SELECT (SELECT c FROM u WHERE u.a = t.a) AS c0 FROM t;");
        assert_eq!(outputs(&query), vec![("c0", &Ty::optional(Ty::Text))]);
    }

    #[test]
    fn recursive_cte_pins_forward_declaration() {
        let query = compile_clean(
            "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM cnt) \
             SELECT x FROM cnt LIMIT 5;",
        );
        assert_eq!(outputs(&query), vec![("x", &Ty::Integer)]);
    }

    #[test]
    fn insert_select_arity_is_checked() {
        let result = compile("INSERT INTO u SELECT a FROM t;");
        assert!(result.diagnostics.contains_kind(DiagnosticKind::ArityMismatch));
    }

    #[test]
    fn non_boolean_where_is_reported() {
        let result = compile("SELECT a FROM t WHERE 'nope';");
        assert!(result
            .diagnostics
            .contains_kind(DiagnosticKind::NonBooleanPredicate));
    }

    #[test]
    fn unknown_table_and_column_diagnostics() {
        let result = compile("SELECT z FROM missing;");
        assert!(result.diagnostics.contains_kind(DiagnosticKind::TableNotFound));
        let result = compile("SELECT z FROM t;");
        assert!(result.diagnostics.contains_kind(DiagnosticKind::ColumnNotFound));
    }

    #[test]
    fn no_output_type_is_a_variable_after_compilation() {
        let query = compile_clean("SELECT :loose, a FROM t;");
        for output in &query.outputs {
            assert!(
                !matches!(output.ty, Ty::Var(_)),
                "variable leaked: {:?}",
                output
            );
        }
        assert_eq!(query.inputs[0].ty, Ty::Any);
    }

    #[test]
    fn compiled_query_serializes_stably() {
        let query = compile_clean("SELECT a, b FROM t WHERE a = :x;");
        let json = serde_json::to_string(&query).unwrap();
        let back: CompiledQuery = serde_json::from_str(&json).unwrap();
        assert_eq!(query, back);
    }
}
