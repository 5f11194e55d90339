//! Statement nodes.

use crate::SourceLocation;

use super::{Expr, Ident, QualifiedName, SyntaxId, TypeName};

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: SourceLocation) -> Self {
        Stmt {
            id: SyntaxId::fresh(),
            location,
            kind,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateTable(CreateTableStmt),
    AlterTable(AlterTableStmt),
    DropTable(DropTableStmt),
    CreateIndex(CreateIndexStmt),
    CreateView(CreateViewStmt),
    CreateVirtualTable(CreateVirtualTableStmt),
    Pragma(PragmaStmt),
    Reindex(ReindexStmt),
    Begin(BeginStmt),
    Commit,
    Rollback,
}

// ---------------------------------------------------------------- SELECT

#[derive(Clone, Debug, PartialEq)]
pub struct SelectStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub with: Option<WithClause>,
    pub body: SelectBody,
    pub order_by: Vec<OrderingTerm>,
    pub limit: Option<LimitClause>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithClause {
    pub recursive: bool,
    pub ctes: Vec<CommonTableExpr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CommonTableExpr {
    pub name: Ident,
    pub columns: Vec<Ident>,
    pub materialized: Option<bool>,
    pub select: Box<SelectStmt>,
}

/// A compound select: the first core plus zero or more
/// `UNION`/`INTERSECT`/`EXCEPT` arms.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectBody {
    pub first: SelectCore,
    pub compounds: Vec<(CompoundOp, SelectCore)>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectCore {
    Select {
        distinct: bool,
        columns: Vec<ResultColumn>,
        from: Option<FromClause>,
        where_clause: Option<Expr>,
        group_by: Vec<Expr>,
        having: Option<Expr>,
        /// Named `WINDOW` definitions, surfaced as syntax only.
        windows: Vec<Ident>,
    },
    Values(Vec<Vec<Expr>>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ResultColumn {
    /// `*`
    Star,
    /// `t.*`
    TableStar(Ident),
    Expr {
        expr: Expr,
        alias: Option<Ident>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FromClause {
    pub source: TableOrSubquery,
    pub joins: Vec<Join>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableOrSubquery {
    Table {
        name: QualifiedName,
        alias: Option<Ident>,
    },
    Subquery {
        select: Box<SelectStmt>,
        alias: Option<Ident>,
    },
    /// A table-valued function such as `json_each(...)`.
    Function {
        name: QualifiedName,
        args: Vec<Expr>,
        alias: Option<Ident>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Join {
    pub op: JoinOp,
    pub source: TableOrSubquery,
    pub constraint: Option<JoinConstraint>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JoinOp {
    /// `,` in a FROM list.
    Comma,
    Inner,
    Cross,
    Left,
    Right,
    Full,
    Natural,
    NaturalLeft,
}

impl JoinOp {
    /// The right side of this join produces NULL-extended rows.
    pub fn nullable_right(&self) -> bool {
        matches!(self, JoinOp::Left | JoinOp::NaturalLeft | JoinOp::Full)
    }

    /// The left side of this join produces NULL-extended rows.
    pub fn nullable_left(&self) -> bool {
        matches!(self, JoinOp::Right | JoinOp::Full)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(Vec<Ident>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderingTerm {
    pub expr: Expr,
    pub ascending: Option<bool>,
    pub nulls_first: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LimitClause {
    pub limit: Expr,
    pub offset: Option<Expr>,
}

// ------------------------------------------------------------------- DML

#[derive(Clone, Debug, PartialEq)]
pub struct InsertStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub with: Option<WithClause>,
    /// `REPLACE INTO` or `INSERT OR <action> INTO`.
    pub action: InsertAction,
    pub table: QualifiedName,
    pub alias: Option<Ident>,
    pub columns: Vec<Ident>,
    pub source: InsertSource,
    pub upsert: Vec<UpsertClause>,
    pub returning: Option<Vec<ResultColumn>>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InsertAction {
    Insert,
    Replace,
    InsertOrAbort,
    InsertOrFail,
    InsertOrIgnore,
    InsertOrReplace,
    InsertOrRollback,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InsertSource {
    DefaultValues,
    Values(Vec<Vec<Expr>>),
    Select(Box<SelectStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpsertClause {
    /// `ON CONFLICT (cols) [WHERE ...]`; empty columns means the bare form.
    pub target_columns: Vec<Ident>,
    pub target_where: Option<Expr>,
    pub action: UpsertAction,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpsertAction {
    Nothing,
    Update {
        sets: Vec<SetAction>,
        where_clause: Option<Expr>,
    },
}

/// `column = expr` or `(a, b) = expr` in UPDATE/upsert SET lists.
#[derive(Clone, Debug, PartialEq)]
pub struct SetAction {
    pub columns: Vec<Ident>,
    pub value: Expr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub alias: Option<Ident>,
    pub sets: Vec<SetAction>,
    pub from: Option<FromClause>,
    pub where_clause: Option<Expr>,
    pub returning: Option<Vec<ResultColumn>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeleteStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub with: Option<WithClause>,
    pub table: QualifiedName,
    pub alias: Option<Ident>,
    pub where_clause: Option<Expr>,
    pub returning: Option<Vec<ResultColumn>>,
}

// ------------------------------------------------------------------- DDL

#[derive(Clone, Debug, PartialEq)]
pub struct CreateTableStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub if_not_exists: bool,
    pub name: QualifiedName,
    pub body: CreateTableBody,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CreateTableBody {
    /// Column definitions, table constraints and table options are nested
    /// here, on the variant.
    Columns {
        columns: Vec<ColumnDef>,
        constraints: Vec<TableConstraint>,
        options: Vec<TableOption>,
    },
    AsSelect(Box<SelectStmt>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub name: Ident,
    pub type_name: Option<TypeName>,
    pub constraints: Vec<ColumnConstraint>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnConstraint {
    PrimaryKey {
        ascending: Option<bool>,
        autoincrement: bool,
    },
    NotNull,
    Unique,
    Check(Expr),
    Default(Expr),
    Collate(Ident),
    ForeignKey(ForeignKeyClause),
    Generated {
        expr: Expr,
        stored: bool,
    },
    /// `CONSTRAINT name <constraint>`.
    Named {
        name: Ident,
        constraint: Box<ColumnConstraint>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableConstraint {
    PrimaryKey(Vec<Ident>),
    Unique(Vec<Ident>),
    Check(Expr),
    ForeignKey {
        columns: Vec<Ident>,
        clause: ForeignKeyClause,
    },
    Named {
        name: Ident,
        constraint: Box<TableConstraint>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKeyClause {
    pub table: Ident,
    pub columns: Vec<Ident>,
    pub actions: Vec<(FkTrigger, FkAction)>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FkTrigger {
    OnDelete,
    OnUpdate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FkAction {
    SetNull,
    SetDefault,
    Cascade,
    Restrict,
    NoAction,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TableOption {
    WithoutRowid,
    Strict,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlterTableStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub table: QualifiedName,
    pub action: AlterAction,
}

#[derive(Clone, Debug, PartialEq)]
pub enum AlterAction {
    RenameTo(Ident),
    RenameColumn { old: Ident, new: Ident },
    AddColumn(ColumnDef),
    DropColumn(Ident),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DropTableStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub if_exists: bool,
    pub name: QualifiedName,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateIndexStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub unique: bool,
    pub if_not_exists: bool,
    pub name: QualifiedName,
    pub table: Ident,
    pub columns: Vec<OrderingTerm>,
    pub where_clause: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateViewStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub if_not_exists: bool,
    pub name: QualifiedName,
    pub columns: Vec<Ident>,
    pub select: Box<SelectStmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateVirtualTableStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub if_not_exists: bool,
    pub name: QualifiedName,
    pub module: Ident,
    pub args: Vec<VirtualTableArg>,
}

/// An argument in a `CREATE VIRTUAL TABLE ... USING module(...)` list.
/// For fts5 these are column definitions (optionally `UNINDEXED`) or
/// `key = value` module options.
#[derive(Clone, Debug, PartialEq)]
pub enum VirtualTableArg {
    Column { name: Ident, unindexed: bool },
    Option { key: Ident, value: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PragmaStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub name: QualifiedName,
    pub value: Option<Expr>,
    /// `PRAGMA name(value)` rather than `PRAGMA name = value`.
    pub call_form: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReindexStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub target: Option<QualifiedName>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BeginStmt {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub behavior: Option<TransactionBehavior>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionBehavior {
    Deferred,
    Immediate,
    Exclusive,
}
