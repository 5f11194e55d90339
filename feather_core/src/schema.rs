//! The schema model derived from DDL statements.
//!
//! An ordered collection of tables (declaration order is preserved),
//! mutated by `CREATE`/`ALTER`/`DROP` statements as the migration scripts
//! are replayed at build time. Views register the inferred output columns
//! of their SELECT; fts5 virtual tables surface their column lists but
//! are not analyzed further.

use serde::{Deserialize, Serialize};

use crate::ast::*;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::types::Ty;

/// Resolve a declared type name against the SQLite affinity set by
/// case-insensitive matching. Unknown names fall back to `ANY` and keep
/// the declared spelling on the column.
pub fn affinity(type_name: &str) -> Option<Ty> {
    match type_name.to_ascii_uppercase().as_str() {
        "TEXT" => Some(Ty::Text),
        "INTEGER" => Some(Ty::Integer),
        "INT" => Some(Ty::Int),
        "REAL" => Some(Ty::Real),
        "BLOB" => Some(Ty::Blob),
        "ANY" => Some(Ty::Any),
        "BOOL" | "BOOLEAN" => Some(Ty::Bool),
        _ => None,
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TableKind {
    Table,
    View,
    Virtual { module: String },
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    pub without_rowid: bool,
    pub strict: bool,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// The type name as written, kept even when it resolves to nothing.
    pub declared_type: Option<String>,
    /// The resolved base type, never `Optional`; nullability is derived
    /// via [`ColumnSchema::read_ty`].
    pub ty: Ty,
    pub primary_key: bool,
    pub not_null: bool,
    pub unique: bool,
    pub has_default: bool,
}

impl ColumnSchema {
    /// The type a read of this column produces: optional unless the
    /// schema marks the column NOT NULL or PRIMARY KEY.
    pub fn read_ty(&self) -> Ty {
        if self.not_null || self.primary_key {
            self.ty.clone()
        } else {
            Ty::optional(self.ty.clone())
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<ColumnSchema>,
    pub options: TableOptions,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// The ambient schema: an ordered mapping from table name to definition.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    tables: Vec<TableSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Schema::default()
    }

    /// Derive a schema by replaying every DDL statement in `sql`.
    pub fn from_sql(sql: &str) -> (Schema, Diagnostics) {
        let (stmts, mut diagnostics) = crate::parser::parse_sql(sql);
        let mut schema = Schema::new();
        for stmt in &stmts {
            schema.apply_statement(stmt, &mut diagnostics);
        }
        (schema, diagnostics)
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn get_table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    fn get_table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Apply one statement. Non-DDL statements are ignored; problems are
    /// recorded and the schema is left in the best state available.
    pub fn apply_statement(&mut self, stmt: &Stmt, diagnostics: &mut Diagnostics) {
        match &stmt.kind {
            StmtKind::CreateTable(create) => self.apply_create_table(create, diagnostics),
            StmtKind::AlterTable(alter) => self.apply_alter_table(alter, diagnostics),
            StmtKind::DropTable(drop) => self.apply_drop_table(drop, diagnostics),
            StmtKind::CreateView(view) => self.apply_create_view(view, diagnostics),
            StmtKind::CreateVirtualTable(vtab) => self.apply_create_virtual(vtab, diagnostics),
            _ => {}
        }
    }

    fn insert_table(
        &mut self,
        table: TableSchema,
        location: crate::SourceLocation,
        if_not_exists: bool,
        diagnostics: &mut Diagnostics,
    ) {
        if self.get_table(&table.name).is_some() {
            if !if_not_exists {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::DuplicateTable,
                    format!("Table '{}' already exists", table.name),
                    location,
                ));
            }
            return;
        }
        self.tables.push(table);
    }

    fn apply_create_table(&mut self, create: &CreateTableStmt, diagnostics: &mut Diagnostics) {
        let name = create.name.name.text().to_string();
        let table = match &create.body {
            CreateTableBody::Columns {
                columns,
                constraints,
                options,
            } => {
                let mut table = TableSchema {
                    name,
                    kind: TableKind::Table,
                    columns: Vec::new(),
                    options: TableOptions {
                        without_rowid: options.contains(&TableOption::WithoutRowid),
                        strict: options.contains(&TableOption::Strict),
                    },
                };
                for def in columns {
                    match column_from_def(def, diagnostics) {
                        Some(column) if table.column(&column.name).is_some() => {
                            diagnostics.push(Diagnostic::new(
                                DiagnosticKind::DuplicateColumn,
                                format!(
                                    "Column '{}' is declared twice in table '{}'",
                                    column.name, table.name
                                ),
                                def.location,
                            ));
                        }
                        Some(column) => table.columns.push(column),
                        None => {}
                    }
                }
                apply_table_constraints(&mut table, constraints, diagnostics);
                table
            }
            CreateTableBody::AsSelect(select) => {
                let outputs = crate::compile::select_columns(self, select, diagnostics);
                TableSchema {
                    name,
                    kind: TableKind::Table,
                    columns: outputs
                        .into_iter()
                        .map(|(name, ty)| {
                            let (base, nullable) = ty.strip_optional();
                            ColumnSchema {
                                name,
                                declared_type: None,
                                ty: base.clone(),
                                primary_key: false,
                                not_null: !nullable,
                                unique: false,
                                has_default: false,
                            }
                        })
                        .collect(),
                    options: TableOptions::default(),
                }
            }
        };
        self.insert_table(table, create.location, create.if_not_exists, diagnostics);
    }

    fn apply_alter_table(&mut self, alter: &AlterTableStmt, diagnostics: &mut Diagnostics) {
        let table_name = alter.table.name.text().to_string();
        let Some(table) = self.get_table_mut(&table_name) else {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                format!("Table '{table_name}' does not exist"),
                alter.location,
            ));
            return;
        };
        match &alter.action {
            AlterAction::RenameTo(new_name) => {
                table.name = new_name.text().to_string();
            }
            AlterAction::RenameColumn { old, new } => {
                match table.column_mut(old.text()) {
                    Some(column) => column.name = new.text().to_string(),
                    None => diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        format!("Column '{}' does not exist in '{table_name}'", old.text()),
                        old.location,
                    )),
                }
            }
            AlterAction::AddColumn(def) => {
                if table.column(def.name.text()).is_some() {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::DuplicateColumn,
                        format!(
                            "Column '{}' already exists in '{table_name}'",
                            def.name.text()
                        ),
                        def.location,
                    ));
                } else if let Some(column) = column_from_def(def, diagnostics) {
                    table.columns.push(column);
                }
            }
            AlterAction::DropColumn(name) => {
                let before = table.columns.len();
                table
                    .columns
                    .retain(|c| !c.name.eq_ignore_ascii_case(name.text()));
                if table.columns.len() == before {
                    diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnresolvedReference,
                        format!("Column '{}' does not exist in '{table_name}'", name.text()),
                        name.location,
                    ));
                }
            }
        }
    }

    fn apply_drop_table(&mut self, drop: &DropTableStmt, diagnostics: &mut Diagnostics) {
        let name = drop.name.name.text();
        let before = self.tables.len();
        self.tables.retain(|t| !t.name.eq_ignore_ascii_case(name));
        if self.tables.len() == before && !drop.if_exists {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedReference,
                format!("Table '{name}' does not exist"),
                drop.location,
            ));
        }
    }

    fn apply_create_view(&mut self, view: &CreateViewStmt, diagnostics: &mut Diagnostics) {
        let outputs = crate::compile::select_columns(self, &view.select, diagnostics);
        let columns: Vec<ColumnSchema> = if view.columns.is_empty() {
            outputs
                .into_iter()
                .map(|(name, ty)| view_column(name, ty))
                .collect()
        } else {
            if view.columns.len() != outputs.len() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ArityMismatch,
                    format!(
                        "View '{}' names {} columns but its select produces {}",
                        view.name.name.text(),
                        view.columns.len(),
                        outputs.len()
                    ),
                    view.location,
                ));
            }
            let mut inferred = outputs.into_iter();
            view.columns
                .iter()
                .map(|name| {
                    let ty = inferred.next().map(|(_, ty)| ty).unwrap_or(Ty::Error);
                    view_column(name.text().to_string(), ty)
                })
                .collect()
        };
        let table = TableSchema {
            name: view.name.name.text().to_string(),
            kind: TableKind::View,
            columns,
            options: TableOptions::default(),
        };
        self.insert_table(table, view.location, view.if_not_exists, diagnostics);
    }

    fn apply_create_virtual(
        &mut self,
        vtab: &CreateVirtualTableStmt,
        diagnostics: &mut Diagnostics,
    ) {
        // fts5 column lists are surfaced; the module internals are not
        // analyzed
        let columns = vtab
            .args
            .iter()
            .filter_map(|arg| match arg {
                VirtualTableArg::Column { name, .. } => Some(ColumnSchema {
                    name: name.text().to_string(),
                    declared_type: None,
                    ty: Ty::Text,
                    primary_key: false,
                    not_null: false,
                    unique: false,
                    has_default: false,
                }),
                VirtualTableArg::Option { .. } => None,
            })
            .collect();
        let table = TableSchema {
            name: vtab.name.name.text().to_string(),
            kind: TableKind::Virtual {
                module: vtab.module.text().to_string(),
            },
            columns,
            options: TableOptions::default(),
        };
        self.insert_table(table, vtab.location, vtab.if_not_exists, diagnostics);
    }
}

fn view_column(name: String, ty: Ty) -> ColumnSchema {
    let (base, nullable) = ty.strip_optional();
    ColumnSchema {
        name,
        declared_type: None,
        ty: base.clone(),
        primary_key: false,
        not_null: !nullable,
        unique: false,
        has_default: false,
    }
}

fn column_from_def(def: &ColumnDef, diagnostics: &mut Diagnostics) -> Option<ColumnSchema> {
    if def.name.is_recovery() {
        return None;
    }
    let declared_type = def.type_name.as_ref().map(|t| t.name.clone());
    let ty = match &def.type_name {
        None => Ty::Any,
        Some(type_name) => match affinity(&type_name.name) {
            Some(ty) => ty,
            None => {
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnknownColumnType,
                    format!("Unknown column type '{}'", type_name.name),
                    type_name.location,
                ));
                Ty::Any
            }
        },
    };
    let mut column = ColumnSchema {
        name: def.name.text().to_string(),
        declared_type,
        ty,
        primary_key: false,
        not_null: false,
        unique: false,
        has_default: false,
    };
    for constraint in &def.constraints {
        apply_column_constraint(&mut column, constraint);
    }
    Some(column)
}

fn apply_column_constraint(column: &mut ColumnSchema, constraint: &ColumnConstraint) {
    match constraint {
        ColumnConstraint::PrimaryKey { .. } => column.primary_key = true,
        ColumnConstraint::NotNull => column.not_null = true,
        ColumnConstraint::Unique => column.unique = true,
        ColumnConstraint::Default(_) => column.has_default = true,
        ColumnConstraint::Named { constraint, .. } => apply_column_constraint(column, constraint),
        ColumnConstraint::Check(_)
        | ColumnConstraint::Collate(_)
        | ColumnConstraint::ForeignKey(_)
        | ColumnConstraint::Generated { .. } => {}
    }
}

fn apply_table_constraints(
    table: &mut TableSchema,
    constraints: &[TableConstraint],
    diagnostics: &mut Diagnostics,
) {
    for constraint in constraints {
        match constraint {
            TableConstraint::PrimaryKey(columns) => {
                for name in columns {
                    match table.column_mut(name.text()) {
                        Some(column) => column.primary_key = true,
                        None => diagnostics.push(Diagnostic::new(
                            DiagnosticKind::UnresolvedReference,
                            format!(
                                "Primary key names unknown column '{}' in '{}'",
                                name.text(),
                                table.name
                            ),
                            name.location,
                        )),
                    }
                }
            }
            TableConstraint::Unique(columns) => {
                if let [single] = columns.as_slice() {
                    if let Some(column) = table.column_mut(single.text()) {
                        column.unique = true;
                    }
                }
            }
            TableConstraint::ForeignKey { columns, .. } => {
                for name in columns {
                    if table.column(name.text()).is_none() {
                        diagnostics.push(Diagnostic::new(
                            DiagnosticKind::UnresolvedReference,
                            format!(
                                "Foreign key names unknown column '{}' in '{}'",
                                name.text(),
                                table.name
                            ),
                            name.location,
                        ));
                    }
                }
            }
            TableConstraint::Check(_) => {}
            TableConstraint::Named { constraint, .. } => {
                apply_table_constraints(table, std::slice::from_ref(constraint), diagnostics)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn schema_ok(sql: &str) -> Schema {
        let (schema, diagnostics) = Schema::from_sql(sql);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        schema
    }

    #[test]
    fn create_table_preserves_column_order_and_derives_flags() {
        let schema = schema_ok(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL, bio TEXT, score REAL DEFAULT (0.0));",
        );
        let t = schema.get_table("t").unwrap();
        let names: Vec<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "bio", "score"]);
        assert!(t.column("id").unwrap().primary_key);
        assert!(t.column("name").unwrap().not_null);
        assert!(!t.column("bio").unwrap().not_null);
        assert!(t.column("score").unwrap().has_default);
        assert_eq!(t.column("id").unwrap().read_ty(), Ty::Integer);
        assert_eq!(t.column("bio").unwrap().read_ty(), Ty::optional(Ty::Text));
    }

    #[test]
    fn table_level_primary_key_marks_columns() {
        let schema = schema_ok("CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a, b));");
        let t = schema.get_table("t").unwrap();
        assert!(t.column("a").unwrap().primary_key);
        assert!(t.column("b").unwrap().primary_key);
    }

    #[test]
    fn alter_table_round() {
        let schema = schema_ok(
            "CREATE TABLE t (a INTEGER);\
             ALTER TABLE t ADD COLUMN b TEXT;\
             ALTER TABLE t RENAME COLUMN a TO a2;\
             ALTER TABLE t RENAME TO t2;",
        );
        assert!(schema.get_table("t").is_none());
        let t2 = schema.get_table("t2").unwrap();
        assert!(t2.column("a2").is_some());
        assert!(t2.column("b").is_some());
        let schema = schema_ok(
            "CREATE TABLE t (a INTEGER, b TEXT);\
             ALTER TABLE t DROP COLUMN a;",
        );
        assert_eq!(schema.get_table("t").unwrap().columns.len(), 1);
    }

    #[test]
    fn duplicate_table_is_reported() {
        let (_, diagnostics) =
            Schema::from_sql("CREATE TABLE t (a INTEGER); CREATE TABLE t (b TEXT);");
        assert!(diagnostics.contains_kind(DiagnosticKind::DuplicateTable));
        let (_, diagnostics) =
            Schema::from_sql("CREATE TABLE t (a INTEGER); CREATE TABLE IF NOT EXISTS t (b TEXT);");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unknown_type_falls_back_to_any_and_keeps_spelling() {
        let (schema, diagnostics) = Schema::from_sql("CREATE TABLE t (v VARCHAR(40));");
        assert!(diagnostics.contains_kind(DiagnosticKind::UnknownColumnType));
        let column = schema.get_table("t").unwrap().column("v").unwrap();
        assert_eq!(column.ty, Ty::Any);
        assert_eq!(column.declared_type.as_deref(), Some("VARCHAR"));
    }

    #[test]
    fn view_columns_come_from_its_select() {
        let schema = schema_ok(
            "CREATE TABLE t (a INTEGER NOT NULL, b TEXT);\
             CREATE VIEW v AS SELECT a, b FROM t;",
        );
        let v = schema.get_table("v").unwrap();
        assert_eq!(v.kind, TableKind::View);
        assert_eq!(v.column("a").unwrap().read_ty(), Ty::Integer);
        assert_eq!(v.column("b").unwrap().read_ty(), Ty::optional(Ty::Text));
    }

    #[test]
    fn fts5_virtual_table_surfaces_columns() {
        let schema = schema_ok(
            "CREATE VIRTUAL TABLE notes USING fts5(title, body, meta UNINDEXED, tokenize = 'porter');",
        );
        let notes = schema.get_table("notes").unwrap();
        assert_eq!(
            notes.kind,
            TableKind::Virtual {
                module: "fts5".to_string()
            }
        );
        let names: Vec<&str> = notes.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["title", "body", "meta"]);
    }

    #[test]
    fn drop_missing_table_is_reported_unless_if_exists() {
        let (_, diagnostics) = Schema::from_sql("DROP TABLE nope;");
        assert!(diagnostics.contains_kind(DiagnosticKind::UnresolvedReference));
        let (_, diagnostics) = Schema::from_sql("DROP TABLE IF EXISTS nope;");
        assert!(diagnostics.is_empty());
    }
}
