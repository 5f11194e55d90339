//! Canonical SQL descriptions of syntax nodes.
//!
//! The output is valid SQL that re-parses to a semantically equal tree.
//! It is a description for diagnostics and tests, not a formatter: one
//! line, single spaces, canonical keyword casing.

use std::fmt::{self, Display, Formatter, Write};

use super::*;

fn write_joined<T: Display>(f: &mut Formatter, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Whether this expression's own description already carries outer
/// parentheses. Keeps printing a fixpoint: `(a = b)` re-parses to a
/// grouped node that prints as `(a = b)` again, not `((a = b))`.
fn self_parenthesized(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Binary { .. }
            | ExprKind::IsNull { .. }
            | ExprKind::Collate { .. }
            | ExprKind::Like { .. }
            | ExprKind::Between { .. }
            | ExprKind::In { .. }
            | ExprKind::Grouped(_)
            | ExprKind::Tuple(_)
            | ExprKind::Subquery(_)
    )
}

impl Display for Ident {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.quoted {
            write!(f, "\"{}\"", self.value.replace('"', "\"\""))
        } else {
            f.write_str(&self.value)
        }
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        write!(f, "{}", self.name)
    }
}

impl Display for SignedNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.negative {
            f.write_char('-')?;
        }
        f.write_str(&self.digits)
    }
}

impl Display for TypeName {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_char('(')?;
            write_joined(f, &self.args, ", ")?;
            f.write_char(')')?;
        }
        Ok(())
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Literal::Numeric(text) => f.write_str(text),
            Literal::String(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Literal::Blob(hex) => write!(f, "x'{hex}'"),
            Literal::Null => f.write_str("NULL"),
            Literal::True => f.write_str("TRUE"),
            Literal::False => f.write_str("FALSE"),
            Literal::CurrentTime => f.write_str("CURRENT_TIME"),
            Literal::CurrentDate => f.write_str("CURRENT_DATE"),
            Literal::CurrentTimestamp => f.write_str("CURRENT_TIMESTAMP"),
        }
    }
}

impl Display for ColumnRef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(schema) = &self.schema {
            write!(f, "{schema}.")?;
        }
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}", self.column)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::Not => "NOT",
        })
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Concat => "||",
            BinaryOp::Extract => "->",
            BinaryOp::ExtractText => "->>",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Is => "IS",
            BinaryOp::IsNot => "IS NOT",
            BinaryOp::IsDistinctFrom => "IS DISTINCT FROM",
            BinaryOp::IsNotDistinctFrom => "IS NOT DISTINCT FROM",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        })
    }
}

impl Display for LikeOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            LikeOp::Like => "LIKE",
            LikeOp::Glob => "GLOB",
            LikeOp::Regexp => "REGEXP",
            LikeOp::Match => "MATCH",
        })
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(lit) => write!(f, "{lit}"),
            ExprKind::Placeholder(text) => f.write_str(text),
            ExprKind::Column(col) => write!(f, "{col}"),
            ExprKind::Unary { op, operand } => {
                let sep = if *op == UnaryOp::Not { " " } else { "" };
                if self_parenthesized(&operand.kind) {
                    write!(f, "{op}{sep}{operand}")
                } else {
                    write!(f, "{op}{sep}({operand})")
                }
            }
            ExprKind::Binary { left, op, right } => write!(f, "({left} {op} {right})"),
            ExprKind::IsNull { operand, negated } => {
                if *negated {
                    write!(f, "({operand} NOTNULL)")
                } else {
                    write!(f, "({operand} ISNULL)")
                }
            }
            ExprKind::Collate { operand, collation } => {
                write!(f, "({operand} COLLATE {collation})")
            }
            ExprKind::Like {
                operand,
                op,
                negated,
                pattern,
                escape,
            } => {
                write!(f, "({operand} ")?;
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "{op} {pattern}")?;
                if let Some(escape) = escape {
                    write!(f, " ESCAPE {escape}")?;
                }
                f.write_char(')')
            }
            ExprKind::Between {
                operand,
                negated,
                low,
                high,
            } => {
                write!(f, "({operand} ")?;
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "BETWEEN {low} AND {high})")
            }
            ExprKind::In {
                operand,
                negated,
                items,
            } => {
                write!(f, "({operand} ")?;
                if *negated {
                    f.write_str("NOT ")?;
                }
                f.write_str("IN ")?;
                match items {
                    InItems::List(list) => {
                        f.write_char('(')?;
                        write_joined(f, list, ", ")?;
                        f.write_char(')')?;
                    }
                    InItems::Subquery(select) => write!(f, "({select})")?,
                    InItems::Table(name, args) => {
                        write!(f, "{name}")?;
                        if !args.is_empty() {
                            f.write_char('(')?;
                            write_joined(f, args, ", ")?;
                            f.write_char(')')?;
                        }
                    }
                }
                f.write_char(')')
            }
            ExprKind::Function(call) => write!(f, "{call}"),
            ExprKind::Cast { operand, ty } => write!(f, "CAST({operand} AS {ty})"),
            ExprKind::Grouped(inner) => {
                if self_parenthesized(&inner.kind) {
                    write!(f, "{inner}")
                } else {
                    write!(f, "({inner})")
                }
            }
            ExprKind::Tuple(items) => {
                f.write_char('(')?;
                write_joined(f, items, ", ")?;
                f.write_char(')')
            }
            ExprKind::Case {
                operand,
                whens,
                else_expr,
            } => {
                f.write_str("CASE")?;
                if let Some(operand) = operand {
                    write!(f, " {operand}")?;
                }
                for CaseWhen { when, then } in whens {
                    write!(f, " WHEN {when} THEN {then}")?;
                }
                if let Some(else_expr) = else_expr {
                    write!(f, " ELSE {else_expr}")?;
                }
                f.write_str(" END")
            }
            ExprKind::Subquery(select) => write!(f, "({select})"),
            ExprKind::Exists { negated, select } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "EXISTS ({select})")
            }
        }
    }
}

impl Display for FunctionCall {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        match &self.args {
            FunctionArgs::Star => f.write_char('*')?,
            FunctionArgs::List { distinct, args } => {
                if *distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_joined(f, args, ", ")?;
            }
        }
        f.write_char(')')?;
        if let Some(filter) = &self.filter {
            write!(f, " FILTER (WHERE {filter})")?;
        }
        if let Some(over) = &self.over {
            f.write_str(" OVER (")?;
            let mut wrote = false;
            if let Some(name) = &over.window_name {
                write!(f, "{name}")?;
                wrote = true;
            }
            if !over.partition_by.is_empty() {
                if wrote {
                    f.write_char(' ')?;
                }
                f.write_str("PARTITION BY ")?;
                write_joined(f, &over.partition_by, ", ")?;
                wrote = true;
            }
            if !over.order_by.is_empty() {
                if wrote {
                    f.write_char(' ')?;
                }
                f.write_str("ORDER BY ")?;
                write_joined(f, &over.order_by, ", ")?;
            }
            f.write_char(')')?;
        }
        Ok(())
    }
}

impl Display for OrderingTerm {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.expr)?;
        match self.ascending {
            Some(true) => f.write_str(" ASC")?,
            Some(false) => f.write_str(" DESC")?,
            None => {}
        }
        match self.nulls_first {
            Some(true) => f.write_str(" NULLS FIRST")?,
            Some(false) => f.write_str(" NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

impl Display for ResultColumn {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ResultColumn::Star => f.write_char('*'),
            ResultColumn::TableStar(table) => write!(f, "{table}.*"),
            ResultColumn::Expr { expr, alias } => {
                write!(f, "{expr}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for TableOrSubquery {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TableOrSubquery::Table { name, alias } => {
                write!(f, "{name}")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            TableOrSubquery::Subquery { select, alias } => {
                write!(f, "({select})")?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
            TableOrSubquery::Function { name, args, alias } => {
                write!(f, "{name}(")?;
                write_joined(f, args, ", ")?;
                f.write_char(')')?;
                if let Some(alias) = alias {
                    write!(f, " AS {alias}")?;
                }
                Ok(())
            }
        }
    }
}

impl Display for JoinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            JoinOp::Comma => ",",
            JoinOp::Inner => "JOIN",
            JoinOp::Cross => "CROSS JOIN",
            JoinOp::Left => "LEFT JOIN",
            JoinOp::Right => "RIGHT JOIN",
            JoinOp::Full => "FULL JOIN",
            JoinOp::Natural => "NATURAL JOIN",
            JoinOp::NaturalLeft => "NATURAL LEFT JOIN",
        })
    }
}

impl Display for FromClause {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.source)?;
        for join in &self.joins {
            if join.op == JoinOp::Comma {
                write!(f, ", {}", join.source)?;
            } else {
                write!(f, " {} {}", join.op, join.source)?;
            }
            match &join.constraint {
                Some(JoinConstraint::On(expr)) => write!(f, " ON {expr}")?,
                Some(JoinConstraint::Using(cols)) => {
                    f.write_str(" USING (")?;
                    write_joined(f, cols, ", ")?;
                    f.write_char(')')?;
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl Display for SelectCore {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SelectCore::Select {
                distinct,
                columns,
                from,
                where_clause,
                group_by,
                having,
                windows: _,
            } => {
                f.write_str("SELECT ")?;
                if *distinct {
                    f.write_str("DISTINCT ")?;
                }
                write_joined(f, columns, ", ")?;
                if let Some(from) = from {
                    write!(f, " FROM {from}")?;
                }
                if let Some(where_clause) = where_clause {
                    write!(f, " WHERE {where_clause}")?;
                }
                if !group_by.is_empty() {
                    f.write_str(" GROUP BY ")?;
                    write_joined(f, group_by, ", ")?;
                }
                if let Some(having) = having {
                    write!(f, " HAVING {having}")?;
                }
                Ok(())
            }
            SelectCore::Values(rows) => {
                f.write_str("VALUES ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_char('(')?;
                    write_joined(f, row, ", ")?;
                    f.write_char(')')?;
                }
                Ok(())
            }
        }
    }
}

impl Display for CompoundOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            CompoundOp::Union => "UNION",
            CompoundOp::UnionAll => "UNION ALL",
            CompoundOp::Intersect => "INTERSECT",
            CompoundOp::Except => "EXCEPT",
        })
    }
}

impl Display for WithClause {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("WITH ")?;
        if self.recursive {
            f.write_str("RECURSIVE ")?;
        }
        for (i, cte) in self.ctes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", cte.name)?;
            if !cte.columns.is_empty() {
                f.write_char('(')?;
                write_joined(f, &cte.columns, ", ")?;
                f.write_char(')')?;
            }
            write!(f, " AS ({})", cte.select)?;
        }
        Ok(())
    }
}

impl Display for SelectStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{with} ")?;
        }
        write!(f, "{}", self.body.first)?;
        for (op, core) in &self.body.compounds {
            write!(f, " {op} {core}")?;
        }
        if !self.order_by.is_empty() {
            f.write_str(" ORDER BY ")?;
            write_joined(f, &self.order_by, ", ")?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit.limit)?;
            if let Some(offset) = &limit.offset {
                write!(f, " OFFSET {offset}")?;
            }
        }
        Ok(())
    }
}

impl Display for SetAction {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.columns.len() == 1 {
            write!(f, "{} = {}", self.columns[0], self.value)
        } else {
            f.write_char('(')?;
            write_joined(f, &self.columns, ", ")?;
            write!(f, ") = {}", self.value)
        }
    }
}

impl Display for InsertStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{with} ")?;
        }
        f.write_str(match self.action {
            InsertAction::Insert => "INSERT",
            InsertAction::Replace => "REPLACE",
            InsertAction::InsertOrAbort => "INSERT OR ABORT",
            InsertAction::InsertOrFail => "INSERT OR FAIL",
            InsertAction::InsertOrIgnore => "INSERT OR IGNORE",
            InsertAction::InsertOrReplace => "INSERT OR REPLACE",
            InsertAction::InsertOrRollback => "INSERT OR ROLLBACK",
        })?;
        write!(f, " INTO {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            write_joined(f, &self.columns, ", ")?;
            f.write_char(')')?;
        }
        match &self.source {
            InsertSource::DefaultValues => f.write_str(" DEFAULT VALUES")?,
            InsertSource::Values(rows) => {
                f.write_str(" VALUES ")?;
                for (i, row) in rows.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_char('(')?;
                    write_joined(f, row, ", ")?;
                    f.write_char(')')?;
                }
            }
            InsertSource::Select(select) => write!(f, " {select}")?,
        }
        for upsert in &self.upsert {
            f.write_str(" ON CONFLICT")?;
            if !upsert.target_columns.is_empty() {
                f.write_str(" (")?;
                write_joined(f, &upsert.target_columns, ", ")?;
                f.write_char(')')?;
                if let Some(where_clause) = &upsert.target_where {
                    write!(f, " WHERE {where_clause}")?;
                }
            }
            match &upsert.action {
                UpsertAction::Nothing => f.write_str(" DO NOTHING")?,
                UpsertAction::Update { sets, where_clause } => {
                    f.write_str(" DO UPDATE SET ")?;
                    write_joined(f, sets, ", ")?;
                    if let Some(where_clause) = where_clause {
                        write!(f, " WHERE {where_clause}")?;
                    }
                }
            }
        }
        if let Some(returning) = &self.returning {
            f.write_str(" RETURNING ")?;
            write_joined(f, returning, ", ")?;
        }
        Ok(())
    }
}

impl Display for UpdateStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{with} ")?;
        }
        write!(f, "UPDATE {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        f.write_str(" SET ")?;
        write_joined(f, &self.sets, ", ")?;
        if let Some(from) = &self.from {
            write!(f, " FROM {from}")?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        if let Some(returning) = &self.returning {
            f.write_str(" RETURNING ")?;
            write_joined(f, returning, ", ")?;
        }
        Ok(())
    }
}

impl Display for DeleteStmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(with) = &self.with {
            write!(f, "{with} ")?;
        }
        write!(f, "DELETE FROM {}", self.table)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        if let Some(where_clause) = &self.where_clause {
            write!(f, " WHERE {where_clause}")?;
        }
        if let Some(returning) = &self.returning {
            f.write_str(" RETURNING ")?;
            write_joined(f, returning, ", ")?;
        }
        Ok(())
    }
}

impl Display for ColumnDef {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(type_name) = &self.type_name {
            write!(f, " {type_name}")?;
        }
        for constraint in &self.constraints {
            write!(f, " {constraint}")?;
        }
        Ok(())
    }
}

impl Display for ColumnConstraint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ColumnConstraint::PrimaryKey {
                ascending,
                autoincrement,
            } => {
                f.write_str("PRIMARY KEY")?;
                match ascending {
                    Some(true) => f.write_str(" ASC")?,
                    Some(false) => f.write_str(" DESC")?,
                    None => {}
                }
                if *autoincrement {
                    f.write_str(" AUTOINCREMENT")?;
                }
                Ok(())
            }
            ColumnConstraint::NotNull => f.write_str("NOT NULL"),
            ColumnConstraint::Unique => f.write_str("UNIQUE"),
            ColumnConstraint::Check(expr) => write!(f, "CHECK ({expr})"),
            ColumnConstraint::Default(expr) => {
                if self_parenthesized(&expr.kind) {
                    write!(f, "DEFAULT {expr}")
                } else {
                    write!(f, "DEFAULT ({expr})")
                }
            }
            ColumnConstraint::Collate(name) => write!(f, "COLLATE {name}"),
            ColumnConstraint::ForeignKey(clause) => write!(f, "{clause}"),
            ColumnConstraint::Generated { expr, stored } => {
                write!(f, "GENERATED ALWAYS AS ({expr})")?;
                if *stored {
                    f.write_str(" STORED")?;
                }
                Ok(())
            }
            ColumnConstraint::Named { name, constraint } => {
                write!(f, "CONSTRAINT {name} {constraint}")
            }
        }
    }
}

impl Display for ForeignKeyClause {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "REFERENCES {}", self.table)?;
        if !self.columns.is_empty() {
            f.write_str(" (")?;
            write_joined(f, &self.columns, ", ")?;
            f.write_char(')')?;
        }
        for (trigger, action) in &self.actions {
            f.write_str(match trigger {
                FkTrigger::OnDelete => " ON DELETE ",
                FkTrigger::OnUpdate => " ON UPDATE ",
            })?;
            f.write_str(match action {
                FkAction::SetNull => "SET NULL",
                FkAction::SetDefault => "SET DEFAULT",
                FkAction::Cascade => "CASCADE",
                FkAction::Restrict => "RESTRICT",
                FkAction::NoAction => "NO ACTION",
            })?;
        }
        Ok(())
    }
}

impl Display for TableConstraint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TableConstraint::PrimaryKey(cols) => {
                f.write_str("PRIMARY KEY (")?;
                write_joined(f, cols, ", ")?;
                f.write_char(')')
            }
            TableConstraint::Unique(cols) => {
                f.write_str("UNIQUE (")?;
                write_joined(f, cols, ", ")?;
                f.write_char(')')
            }
            TableConstraint::Check(expr) => write!(f, "CHECK ({expr})"),
            TableConstraint::ForeignKey { columns, clause } => {
                f.write_str("FOREIGN KEY (")?;
                write_joined(f, columns, ", ")?;
                write!(f, ") {clause}")
            }
            TableConstraint::Named { name, constraint } => {
                write!(f, "CONSTRAINT {name} {constraint}")
            }
        }
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.kind {
            StmtKind::Select(s) => write!(f, "{s}"),
            StmtKind::Insert(s) => write!(f, "{s}"),
            StmtKind::Update(s) => write!(f, "{s}"),
            StmtKind::Delete(s) => write!(f, "{s}"),
            StmtKind::CreateTable(s) => {
                f.write_str("CREATE TABLE ")?;
                if s.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                write!(f, "{}", s.name)?;
                match &s.body {
                    CreateTableBody::Columns {
                        columns,
                        constraints,
                        options,
                    } => {
                        f.write_str(" (")?;
                        write_joined(f, columns, ", ")?;
                        for constraint in constraints {
                            write!(f, ", {constraint}")?;
                        }
                        f.write_char(')')?;
                        for (i, option) in options.iter().enumerate() {
                            f.write_str(if i == 0 { " " } else { ", " })?;
                            f.write_str(match option {
                                TableOption::WithoutRowid => "WITHOUT ROWID",
                                TableOption::Strict => "STRICT",
                            })?;
                        }
                        Ok(())
                    }
                    CreateTableBody::AsSelect(select) => write!(f, " AS {select}"),
                }
            }
            StmtKind::AlterTable(s) => {
                write!(f, "ALTER TABLE {} ", s.table)?;
                match &s.action {
                    AlterAction::RenameTo(name) => write!(f, "RENAME TO {name}"),
                    AlterAction::RenameColumn { old, new } => {
                        write!(f, "RENAME COLUMN {old} TO {new}")
                    }
                    AlterAction::AddColumn(def) => write!(f, "ADD COLUMN {def}"),
                    AlterAction::DropColumn(name) => write!(f, "DROP COLUMN {name}"),
                }
            }
            StmtKind::DropTable(s) => {
                f.write_str("DROP TABLE ")?;
                if s.if_exists {
                    f.write_str("IF EXISTS ")?;
                }
                write!(f, "{}", s.name)
            }
            StmtKind::CreateIndex(s) => {
                f.write_str("CREATE ")?;
                if s.unique {
                    f.write_str("UNIQUE ")?;
                }
                f.write_str("INDEX ")?;
                if s.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                write!(f, "{} ON {} (", s.name, s.table)?;
                write_joined(f, &s.columns, ", ")?;
                f.write_char(')')?;
                if let Some(where_clause) = &s.where_clause {
                    write!(f, " WHERE {where_clause}")?;
                }
                Ok(())
            }
            StmtKind::CreateView(s) => {
                f.write_str("CREATE VIEW ")?;
                if s.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                write!(f, "{}", s.name)?;
                if !s.columns.is_empty() {
                    f.write_str(" (")?;
                    write_joined(f, &s.columns, ", ")?;
                    f.write_char(')')?;
                }
                write!(f, " AS {}", s.select)
            }
            StmtKind::CreateVirtualTable(s) => {
                f.write_str("CREATE VIRTUAL TABLE ")?;
                if s.if_not_exists {
                    f.write_str("IF NOT EXISTS ")?;
                }
                write!(f, "{} USING {}", s.name, s.module)?;
                if !s.args.is_empty() {
                    f.write_char('(')?;
                    for (i, arg) in s.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        match arg {
                            VirtualTableArg::Column { name, unindexed } => {
                                write!(f, "{name}")?;
                                if *unindexed {
                                    f.write_str(" UNINDEXED")?;
                                }
                            }
                            VirtualTableArg::Option { key, value } => {
                                write!(f, "{key} = {value}")?;
                            }
                        }
                    }
                    f.write_char(')')?;
                }
                Ok(())
            }
            StmtKind::Pragma(s) => {
                write!(f, "PRAGMA {}", s.name)?;
                if let Some(value) = &s.value {
                    if s.call_form {
                        write!(f, "({value})")?;
                    } else {
                        write!(f, " = {value}")?;
                    }
                }
                Ok(())
            }
            StmtKind::Reindex(s) => {
                f.write_str("REINDEX")?;
                if let Some(target) = &s.target {
                    write!(f, " {target}")?;
                }
                Ok(())
            }
            StmtKind::Begin(s) => {
                f.write_str("BEGIN")?;
                match s.behavior {
                    Some(TransactionBehavior::Deferred) => f.write_str(" DEFERRED")?,
                    Some(TransactionBehavior::Immediate) => f.write_str(" IMMEDIATE")?,
                    Some(TransactionBehavior::Exclusive) => f.write_str(" EXCLUSIVE")?,
                    None => {}
                }
                Ok(())
            }
            StmtKind::Commit => f.write_str("COMMIT"),
            StmtKind::Rollback => f.write_str("ROLLBACK"),
        }
    }
}
