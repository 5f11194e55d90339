//! Expression nodes.

use crate::SourceLocation;

use super::{Ident, OrderingTerm, QualifiedName, SelectStmt, SyntaxId, TypeName};

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: SyntaxId,
    pub location: SourceLocation,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Expr {
            id: SyntaxId::fresh(),
            location,
            kind,
        }
    }

    /// The recovery expression: a column reference to the synthesized
    /// `<<error>>` identifier.
    pub fn recovery(location: SourceLocation) -> Self {
        Expr::new(
            ExprKind::Column(ColumnRef {
                schema: None,
                table: None,
                column: Ident::recovery(location),
            }),
            location,
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    /// A bind parameter, kept in source form (`?`, `?3`, `:x`, `@x`, `$x`).
    Placeholder(String),
    Column(ColumnRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `expr ISNULL`, `expr NOTNULL`, `expr NOT NULL`, `expr IS [NOT] NULL`.
    IsNull {
        operand: Box<Expr>,
        negated: bool,
    },
    /// `expr COLLATE name`.
    Collate {
        operand: Box<Expr>,
        collation: Ident,
    },
    /// `expr [NOT] LIKE/GLOB/REGEXP/MATCH pattern [ESCAPE escape]`.
    Like {
        operand: Box<Expr>,
        op: LikeOp,
        negated: bool,
        pattern: Box<Expr>,
        escape: Option<Box<Expr>>,
    },
    /// `expr [NOT] BETWEEN low AND high`.
    Between {
        operand: Box<Expr>,
        negated: bool,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    /// `expr [NOT] IN (...)`.
    In {
        operand: Box<Expr>,
        negated: bool,
        items: InItems,
    },
    Function(FunctionCall),
    Cast {
        operand: Box<Expr>,
        ty: TypeName,
    },
    /// A parenthesized expression.
    Grouped(Box<Expr>),
    /// A parenthesized row value `(a, b, ...)` with two or more members.
    Tuple(Vec<Expr>),
    Case {
        operand: Option<Box<Expr>>,
        whens: Vec<CaseWhen>,
        else_expr: Option<Box<Expr>>,
    },
    /// A scalar subquery `(SELECT ...)`.
    Subquery(Box<SelectStmt>),
    /// `[NOT] EXISTS (SELECT ...)`.
    Exists {
        negated: bool,
        select: Box<SelectStmt>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    /// Numeric literal in source form; integral when it has no fraction
    /// or exponent.
    Numeric(String),
    String(String),
    /// Hex digit run of an `x'...'` literal.
    Blob(String),
    Null,
    True,
    False,
    CurrentTime,
    CurrentDate,
    CurrentTimestamp,
}

impl Literal {
    pub fn is_integral(&self) -> bool {
        match self {
            Literal::Numeric(text) => !text.contains('.') && !text.contains(['e', 'E']),
            _ => false,
        }
    }
}

/// A `schema.table.column` reference with optional qualifiers.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnRef {
    pub schema: Option<Ident>,
    pub table: Option<Ident>,
    pub column: Ident,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    /// `-expr`
    Negate,
    /// `+expr`
    Plus,
    /// `~expr`
    BitNot,
    /// `NOT expr`
    Not,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Concat,
    /// `->` json extraction
    Extract,
    /// `->>` json extraction as text
    ExtractText,
    Multiply,
    Divide,
    Modulo,
    Add,
    Subtract,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    Is,
    IsNot,
    IsDistinctFrom,
    IsNotDistinctFrom,
    And,
    Or,
}

impl BinaryOp {
    /// Operators whose result is a boolean.
    pub fn is_comparison(&self) -> bool {
        use BinaryOp::*;
        matches!(
            self,
            Lt | LtEq | Gt | GtEq | Eq | NotEq | Is | IsNot | IsDistinctFrom | IsNotDistinctFrom
                | And | Or
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LikeOp {
    Like,
    Glob,
    Regexp,
    Match,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InItems {
    List(Vec<Expr>),
    Subquery(Box<SelectStmt>),
    /// `expr IN table` or `expr IN table(args)`.
    Table(QualifiedName, Vec<Expr>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionCall {
    pub name: Ident,
    pub args: FunctionArgs,
    /// `FILTER (WHERE expr)`, surfaced as syntax only.
    pub filter: Option<Box<Expr>>,
    /// `OVER (...)` window definition, surfaced as syntax only.
    pub over: Option<OverClause>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FunctionArgs {
    /// `COUNT(*)`
    Star,
    List {
        distinct: bool,
        args: Vec<Expr>,
    },
}

/// A window definition. Parsed for syntactic completeness; the analysis
/// passes treat window functions as opaque.
#[derive(Clone, Debug, PartialEq)]
pub struct OverClause {
    pub window_name: Option<Ident>,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderingTerm>,
    /// A frame specification (`ROWS ...`/`RANGE ...`) was present.
    pub has_frame: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaseWhen {
    pub when: Expr,
    pub then: Expr,
}
