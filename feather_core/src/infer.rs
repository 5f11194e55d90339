//! Constraint-based type inference over expressions.
//!
//! The engine walks an expression, accumulating a substitution (type
//! variables stand in for bind parameters and recursive CTE columns) and
//! the ordered list of bind parameters it met. Problems emit `Ty::Error`
//! plus a diagnostic and never abort the walk.

use crate::ast::*;
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics, FixIt};
use crate::schema::Schema;
use crate::types::{joined_to_any, Subst, Ty};
use crate::SourceLocation;

/// One source visible in a scope: a table, view, subquery or
/// table-valued function, with its columns in declaration order.
#[derive(Clone, Debug)]
pub struct Source {
    /// The name the source answers to: an alias when present, else the
    /// table name. Anonymous subqueries have none.
    pub name: Option<String>,
    pub columns: Vec<(String, Ty)>,
    /// Real tables expose the implicit `rowid` alias.
    pub has_rowid: bool,
}

impl Source {
    fn column_ty(&self, column: &str) -> Option<Ty> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, ty)| ty.clone())
    }

    /// The declared type of a column of this source, if present.
    pub fn column_named(&self, column: &str) -> Option<Ty> {
        self.column_ty(column)
    }
}

/// The result of an unqualified column lookup.
pub enum Lookup {
    Found(Ty),
    /// More than one source in the innermost matching scope carries the
    /// name. The payload lists the source names that could qualify it.
    Ambiguous(Vec<String>),
    NotFound,
}

/// A lexical scope stack of sources. Inner scopes (subqueries) shadow
/// outer ones by exact name; insertion order within a scope only matters
/// for star expansion.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    scopes: Vec<Vec<Source>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            scopes: vec![Vec::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn add_source(&mut self, source: Source) {
        self.scopes
            .last_mut()
            .expect("environment always has a scope")
            .push(source);
    }

    /// The sources of the innermost scope, in insertion order. Used for
    /// `*` expansion.
    pub fn current_sources(&self) -> &[Source] {
        self.scopes.last().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lookup(&self, column: &str) -> Lookup {
        for scope in self.scopes.iter().rev() {
            let mut hits: Vec<(&Source, Ty)> = Vec::new();
            for source in scope {
                if let Some(ty) = source.column_ty(column) {
                    hits.push((source, ty));
                }
            }
            match hits.len() {
                0 => continue,
                1 => return Lookup::Found(hits.remove(0).1),
                _ => {
                    return Lookup::Ambiguous(
                        hits.iter()
                            .filter_map(|(source, _)| source.name.clone())
                            .collect(),
                    )
                }
            }
        }
        Lookup::NotFound
    }

    /// Look up `table.column`. The outer result distinguishes an unknown
    /// table from an unknown column within a known table.
    pub fn lookup_qualified(&self, table: &str, column: &str) -> Result<Lookup, ()> {
        for scope in self.scopes.iter().rev() {
            for source in scope {
                let matches = source
                    .name
                    .as_deref()
                    .map(|name| name.eq_ignore_ascii_case(table))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
                if let Some(ty) = source.column_ty(column) {
                    return Ok(Lookup::Found(ty));
                }
                if source.has_rowid && column.eq_ignore_ascii_case("rowid") {
                    return Ok(Lookup::Found(Ty::Integer));
                }
                return Ok(Lookup::NotFound);
            }
        }
        Err(())
    }
}

/// A bind parameter slot collected during inference, in appearance order.
#[derive(Clone, Debug)]
pub struct InputSlot {
    pub name: String,
    pub ty: Ty,
    pub location: SourceLocation,
}

/// A named subquery visible while compiling: a CTE from an enclosing
/// `WITH` clause. Recursive CTEs are forward-declared here with fresh
/// type variables and pinned once their first arm compiles.
#[derive(Clone, Debug)]
pub struct CteDef {
    pub name: String,
    pub columns: Vec<(String, Ty)>,
}

pub struct Inferencer<'a> {
    pub schema: &'a Schema,
    pub subst: Subst,
    pub env: Environment,
    pub inputs: Vec<InputSlot>,
    pub diagnostics: Diagnostics,
    pub(crate) ctes: Vec<CteDef>,
    max_positional: u32,
}

impl<'a> Inferencer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Inferencer {
            schema,
            subst: Subst::new(),
            env: Environment::new(),
            inputs: Vec::new(),
            diagnostics: Diagnostics::new(),
            ctes: Vec::new(),
            max_positional: 0,
        }
    }

    /// Innermost CTE with the given name, if any.
    pub(crate) fn lookup_cte(&self, name: &str) -> Option<&CteDef> {
        self.ctes
            .iter()
            .rev()
            .find(|cte| cte.name.eq_ignore_ascii_case(name))
    }

    fn diagnostic(&mut self, kind: DiagnosticKind, message: String, location: SourceLocation) {
        self.diagnostics.push(Diagnostic::new(kind, message, location));
    }

    /// Record a bind parameter occurrence. Duplicate names coalesce into
    /// one slot; every occurrence shares the slot's type variable so uses
    /// constrain each other.
    pub fn record_input(&mut self, text: &str, location: SourceLocation) -> Ty {
        let name = if text == "?" {
            self.max_positional += 1;
            format!("?{}", self.max_positional)
        } else if let Some(digits) = text.strip_prefix('?') {
            if let Ok(n) = digits.parse::<u32>() {
                self.max_positional = self.max_positional.max(n);
            }
            text.to_string()
        } else {
            text.to_string()
        };
        if let Some(slot) = self.inputs.iter().find(|slot| slot.name == name) {
            return slot.ty.clone();
        }
        let ty = self.subst.fresh();
        self.inputs.push(InputSlot {
            name,
            ty: ty.clone(),
            location,
        });
        ty
    }

    /// Unify and surface a diagnostic when two concrete types genuinely
    /// disagree.
    pub fn unify(&mut self, a: &Ty, b: &Ty, location: SourceLocation) -> Ty {
        let ra = self.subst.resolve(a);
        let rb = self.subst.resolve(b);
        if joined_to_any(&ra, &rb) {
            self.diagnostic(
                DiagnosticKind::IncorrectType,
                format!("Cannot unify {ra} with {rb}"),
                location,
            );
        }
        self.subst.unify(a, b)
    }

    /// WHERE / HAVING / ON predicates must be boolean-like.
    pub fn check_predicate(&mut self, expr: &Expr, clause: &str) {
        let ty = self.infer_expr(expr);
        let resolved = self.subst.resolve(&ty);
        if !resolved.is_boolean_like() {
            self.diagnostic(
                DiagnosticKind::NonBooleanPredicate,
                format!("{clause} expects a boolean expression, found {resolved}"),
                expr.location,
            );
        }
    }

    pub fn infer_expr(&mut self, expr: &Expr) -> Ty {
        match &expr.kind {
            ExprKind::Literal(literal) => self.infer_literal(literal),
            ExprKind::Placeholder(text) => {
                let text = text.clone();
                self.record_input(&text, expr.location)
            }
            ExprKind::Column(column) => self.infer_column(column, expr.location),
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.infer_expr(operand);
                match op {
                    UnaryOp::Negate | UnaryOp::Plus | UnaryOp::BitNot => operand_ty,
                    UnaryOp::Not => Ty::Bool.wrap_if(operand_ty.is_optional()),
                }
            }
            ExprKind::Binary { left, op, right } => self.infer_binary(left, *op, right, expr.location),
            ExprKind::IsNull { operand, .. } => {
                self.infer_expr(operand);
                Ty::Bool
            }
            ExprKind::Collate { operand, .. } => self.infer_expr(operand),
            ExprKind::Like {
                operand,
                pattern,
                escape,
                ..
            } => {
                let operand_ty = self.infer_expr(operand);
                let pattern_ty = self.infer_expr(pattern);
                self.unify(&operand_ty, &pattern_ty, expr.location);
                if let Some(escape) = escape {
                    let escape_ty = self.infer_expr(escape);
                    self.unify(&escape_ty, &Ty::Text, escape.location);
                }
                let nullable = operand_ty.is_optional() || pattern_ty.is_optional();
                Ty::Bool.wrap_if(nullable)
            }
            ExprKind::Between {
                operand, low, high, ..
            } => {
                let operand_ty = self.infer_expr(operand);
                let low_ty = self.infer_expr(low);
                let high_ty = self.infer_expr(high);
                self.unify(&operand_ty, &low_ty, low.location);
                self.unify(&operand_ty, &high_ty, high.location);
                let nullable =
                    operand_ty.is_optional() || low_ty.is_optional() || high_ty.is_optional();
                Ty::Bool.wrap_if(nullable)
            }
            ExprKind::In {
                operand, items, ..
            } => {
                let operand_ty = self.infer_expr(operand);
                match items {
                    InItems::List(list) => {
                        for item in list {
                            let item_ty = self.infer_expr(item);
                            self.unify(&operand_ty, &item_ty, item.location);
                        }
                    }
                    InItems::Subquery(select) => {
                        let columns = crate::compile::subquery_columns(self, select);
                        if columns.len() != 1 {
                            self.diagnostic(
                                DiagnosticKind::ArityMismatch,
                                format!(
                                    "IN subquery must produce one column, found {}",
                                    columns.len()
                                ),
                                select.location,
                            );
                        } else {
                            let (_, column_ty) = &columns[0];
                            let column_ty = column_ty.clone();
                            self.unify(&operand_ty, &column_ty, expr.location);
                        }
                    }
                    InItems::Table(name, args) => {
                        for arg in args {
                            self.infer_expr(arg);
                        }
                        if self.schema.get_table(name.name.text()).is_none() {
                            self.diagnostic(
                                DiagnosticKind::TableNotFound,
                                format!("Table '{}' not found", name.name.text()),
                                name.location,
                            );
                        }
                    }
                }
                Ty::Bool.wrap_if(operand_ty.is_optional())
            }
            ExprKind::Function(call) => self.infer_function(call, expr.location),
            ExprKind::Cast { operand, ty } => {
                let operand_ty = self.infer_expr(operand);
                let target = crate::schema::affinity(&ty.name).unwrap_or(Ty::Any);
                target.wrap_if(operand_ty.is_optional())
            }
            ExprKind::Grouped(inner) => self.infer_expr(inner),
            ExprKind::Tuple(items) => {
                let tys: Vec<Ty> = items.iter().map(|item| self.infer_expr(item)).collect();
                Ty::Row(crate::types::RowTy::Tuple(tys))
            }
            ExprKind::Case {
                operand,
                whens,
                else_expr,
            } => self.infer_case(operand.as_deref(), whens, else_expr.as_deref()),
            ExprKind::Subquery(select) => {
                let columns = crate::compile::subquery_columns(self, select);
                match columns.len() {
                    // a scalar subquery yields NULL when it produces no row
                    1 => Ty::optional(columns.into_iter().next().map(|(_, ty)| ty).unwrap()),
                    _ => Ty::Row(crate::types::RowTy::Named(columns)),
                }
            }
            ExprKind::Exists { select, .. } => {
                crate::compile::subquery_columns(self, select);
                Ty::Bool
            }
        }
    }

    fn infer_literal(&mut self, literal: &Literal) -> Ty {
        match literal {
            Literal::Numeric(_) => {
                if literal.is_integral() {
                    Ty::Integer
                } else {
                    Ty::Real
                }
            }
            Literal::String(_) => Ty::Text,
            Literal::Blob(_) => Ty::Blob,
            Literal::Null => Ty::optional(Ty::Any),
            Literal::True | Literal::False => Ty::Bool,
            Literal::CurrentTime | Literal::CurrentDate | Literal::CurrentTimestamp => Ty::Text,
        }
    }

    fn infer_column(&mut self, column: &ColumnRef, location: SourceLocation) -> Ty {
        if column.column.is_recovery() {
            // the parser already reported this
            return Ty::Error;
        }
        if let Some(table) = &column.table {
            return match self.env.lookup_qualified(table.text(), column.column.text()) {
                Ok(Lookup::Found(ty)) => ty,
                Ok(_) => {
                    self.diagnostic(
                        DiagnosticKind::ColumnNotFound,
                        format!(
                            "Column '{}' not found in '{}'",
                            column.column.text(),
                            table.text()
                        ),
                        location,
                    );
                    Ty::Error
                }
                Err(()) => {
                    self.diagnostic(
                        DiagnosticKind::TableNotFound,
                        format!("Table '{}' not found", table.text()),
                        location,
                    );
                    Ty::Error
                }
            };
        }
        match self.env.lookup(column.column.text()) {
            Lookup::Found(ty) => ty,
            Lookup::Ambiguous(sources) => {
                let mut diagnostic = Diagnostic::new(
                    DiagnosticKind::AmbiguousColumn,
                    format!(
                        "Column '{}' is ambiguous in the current context",
                        column.column.text()
                    ),
                    location,
                );
                if let Some(source) = sources.first() {
                    diagnostic = diagnostic.with_fixit(FixIt::Replace {
                        location,
                        text: format!("{source}.{}", column.column.text()),
                    });
                }
                self.diagnostics.push(diagnostic);
                Ty::Error
            }
            Lookup::NotFound => {
                if column.column.eq_ignore_case("rowid")
                    && self.env.current_sources().iter().any(|s| s.has_rowid)
                {
                    return Ty::Integer;
                }
                self.diagnostic(
                    DiagnosticKind::ColumnNotFound,
                    format!("Column '{}' not found", column.column.text()),
                    location,
                );
                Ty::Error
            }
        }
    }

    fn infer_binary(
        &mut self,
        left: &Expr,
        op: BinaryOp,
        right: &Expr,
        location: SourceLocation,
    ) -> Ty {
        use BinaryOp::*;
        let left_ty = self.infer_expr(left);
        let right_ty = self.infer_expr(right);
        match op {
            Add | Subtract | Multiply | Divide | Modulo | BitAnd | BitOr | ShiftLeft
            | ShiftRight => self.unify(&left_ty, &right_ty, location),
            Concat => {
                let nullable = left_ty.is_optional() || right_ty.is_optional();
                Ty::Text.wrap_if(nullable)
            }
            Extract => Ty::optional(Ty::Text),
            ExtractText => Ty::optional(Ty::Any),
            Is | IsNot | IsDistinctFrom | IsNotDistinctFrom => {
                // null-safe comparisons never yield NULL
                self.unify(&left_ty, &right_ty, location);
                Ty::Bool
            }
            Eq | NotEq | Lt | LtEq | Gt | GtEq => {
                self.unify(&left_ty, &right_ty, location);
                let nullable = left_ty.is_optional() || right_ty.is_optional();
                Ty::Bool.wrap_if(nullable)
            }
            And | Or => {
                let nullable = left_ty.is_optional() || right_ty.is_optional();
                Ty::Bool.wrap_if(nullable)
            }
        }
    }

    fn infer_case(
        &mut self,
        operand: Option<&Expr>,
        whens: &[CaseWhen],
        else_expr: Option<&Expr>,
    ) -> Ty {
        let operand_ty = operand.map(|operand| self.infer_expr(operand));
        for CaseWhen { when, then: _ } in whens {
            let when_ty = self.infer_expr(when);
            match &operand_ty {
                Some(operand_ty) => {
                    let operand_ty = operand_ty.clone();
                    self.unify(&operand_ty, &when_ty, when.location);
                }
                None => {
                    let resolved = self.subst.resolve(&when_ty);
                    if !resolved.is_boolean_like() {
                        self.diagnostic(
                            DiagnosticKind::IncorrectType,
                            format!("CASE condition expects a boolean, found {resolved}"),
                            when.location,
                        );
                    }
                }
            }
        }
        let mut result: Option<Ty> = None;
        let mut fold = |inferencer: &mut Self, ty: Ty, location: SourceLocation| {
            result = Some(match result.take() {
                Some(current) => inferencer.unify(&current, &ty, location),
                None => ty,
            });
        };
        for CaseWhen { then, .. } in whens {
            let then_ty = self.infer_expr(then);
            fold(self, then_ty, then.location);
        }
        if let Some(else_expr) = else_expr {
            let else_ty = self.infer_expr(else_expr);
            fold(self, else_ty, else_expr.location);
        }
        let result = result.unwrap_or(Ty::Any);
        // a CASE with no ELSE yields NULL when nothing matches
        result.wrap_if(else_expr.is_none())
    }

    fn infer_function(&mut self, call: &FunctionCall, location: SourceLocation) -> Ty {
        let (arg_tys, star) = match &call.args {
            FunctionArgs::Star => (Vec::new(), true),
            FunctionArgs::List { args, .. } => {
                (args.iter().map(|arg| self.infer_expr(arg)).collect(), false)
            }
        };
        if let Some(filter) = &call.filter {
            self.check_predicate(filter, "FILTER");
        }
        let name = call.name.text().to_ascii_uppercase();
        match self.builtin_function(&name, &arg_tys, star, location) {
            Some(ty) => ty,
            None => {
                self.diagnostic(
                    DiagnosticKind::UnknownFunction,
                    format!("Unknown function '{}'", call.name.text()),
                    location,
                );
                Ty::Any
            }
        }
    }

    /// The built-in function table: result types and argument constraints
    /// for the SQLite functions the checker understands.
    fn builtin_function(
        &mut self,
        name: &str,
        args: &[Ty],
        star: bool,
        location: SourceLocation,
    ) -> Option<Ty> {
        let any_nullable = args.iter().any(Ty::is_optional);
        let all_nullable = !args.is_empty() && args.iter().all(Ty::is_optional);
        let first_base = args
            .first()
            .map(|ty| ty.strip_optional().0.clone())
            .unwrap_or(Ty::Any);
        let ty = match name {
            "COUNT" => Ty::Integer,
            "SUM" => {
                // SUM of no rows is NULL
                Ty::optional(first_base)
            }
            "TOTAL" => Ty::Real,
            "AVG" => Ty::optional(Ty::Real),
            "MIN" | "MAX" => {
                if star {
                    return None;
                }
                if args.len() <= 1 {
                    Ty::optional(first_base)
                } else {
                    let mut joined = args[0].clone();
                    for arg in &args[1..] {
                        joined = self.unify(&joined, arg, location);
                    }
                    joined
                }
            }
            "GROUP_CONCAT" | "STRING_AGG" => Ty::optional(Ty::Text),
            "COALESCE" => {
                let mut joined = first_base;
                for arg in args.iter().skip(1) {
                    let (base, _) = arg.strip_optional();
                    let base = base.clone();
                    joined = self.unify(&joined, &base, location);
                }
                // nullable only when every alternative is
                joined.wrap_if(all_nullable)
            }
            "IFNULL" => {
                if args.len() != 2 {
                    self.arity_diagnostic(name, 2, args.len(), location);
                }
                first_base.wrap_if(all_nullable)
            }
            "NULLIF" => {
                if args.len() != 2 {
                    self.arity_diagnostic(name, 2, args.len(), location);
                }
                Ty::optional(first_base)
            }
            "LENGTH" | "OCTET_LENGTH" | "INSTR" | "UNICODE" | "SIGN" => {
                Ty::Integer.wrap_if(any_nullable)
            }
            "UPPER" | "LOWER" | "TRIM" | "LTRIM" | "RTRIM" | "SUBSTR" | "SUBSTRING" | "REPLACE"
            | "HEX" | "QUOTE" | "CHAR" | "PRINTF" | "FORMAT" | "CONCAT" | "CONCAT_WS" => {
                Ty::Text.wrap_if(any_nullable)
            }
            "TYPEOF" => Ty::Text,
            "ABS" => first_base.wrap_if(any_nullable),
            "ROUND" => Ty::Real.wrap_if(any_nullable),
            "RANDOM" => Ty::Integer,
            "RANDOMBLOB" | "ZEROBLOB" | "UNHEX" => Ty::Blob.wrap_if(any_nullable),
            "IIF" => {
                if args.len() != 3 {
                    self.arity_diagnostic(name, 3, args.len(), location);
                    Ty::Any
                } else {
                    let joined = self.unify(&args[1].clone(), &args[2].clone(), location);
                    joined
                }
            }
            "LIKELY" | "UNLIKELY" | "LIKELIHOOD" => args.first().cloned().unwrap_or(Ty::Any),
            "DATE" | "TIME" | "DATETIME" | "STRFTIME" | "TIMEDIFF" | "JULIANDAY" => {
                Ty::optional(Ty::Text)
            }
            "UNIXEPOCH" => Ty::optional(Ty::Integer),
            "JSON" | "JSON_ARRAY" | "JSON_OBJECT" | "JSON_INSERT" | "JSON_REPLACE"
            | "JSON_SET" | "JSON_REMOVE" | "JSON_PATCH" => Ty::Text.wrap_if(any_nullable),
            "JSON_EXTRACT" => Ty::optional(Ty::Any),
            "JSON_TYPE" => Ty::optional(Ty::Text),
            "JSON_VALID" => Ty::Bool,
            "JSON_ARRAY_LENGTH" => Ty::Integer.wrap_if(any_nullable),
            "CHANGES" | "TOTAL_CHANGES" | "LAST_INSERT_ROWID" => Ty::Integer,
            "GLOB" | "LIKE" => Ty::Bool.wrap_if(any_nullable),
            "ROW_NUMBER" | "RANK" | "DENSE_RANK" | "NTILE" => Ty::Integer,
            "LAG" | "LEAD" | "FIRST_VALUE" | "LAST_VALUE" | "NTH_VALUE" => {
                Ty::optional(first_base)
            }
            "HIGHLIGHT" | "SNIPPET" => Ty::optional(Ty::Text),
            "BM25" => Ty::Real,
            _ => return None,
        };
        Some(ty)
    }

    fn arity_diagnostic(
        &mut self,
        name: &str,
        expected: usize,
        found: usize,
        location: SourceLocation,
    ) {
        self.diagnostic(
            DiagnosticKind::ArityMismatch,
            format!("{name} expects {expected} arguments, found {found}"),
            location,
        );
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source(name: &str, columns: &[(&str, Ty)]) -> Source {
        Source {
            name: Some(name.to_string()),
            columns: columns
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.clone()))
                .collect(),
            has_rowid: true,
        }
    }

    #[test]
    fn lookup_distinguishes_found_ambiguous_missing() {
        let mut env = Environment::new();
        env.add_source(source("t", &[("a", Ty::Integer), ("b", Ty::Text)]));
        env.add_source(source("u", &[("a", Ty::Real)]));
        assert!(matches!(env.lookup("b"), Lookup::Found(Ty::Text)));
        match env.lookup("a") {
            Lookup::Ambiguous(sources) => assert_eq!(sources, vec!["t", "u"]),
            _ => panic!("expected an ambiguous lookup for 'a'"),
        }
        assert!(matches!(env.lookup("zzz"), Lookup::NotFound));
    }

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut env = Environment::new();
        env.add_source(source("t", &[("a", Ty::Integer)]));
        env.push_scope();
        env.add_source(source("s", &[("a", Ty::Text)]));
        // the inner `a` wins; no ambiguity with the shadowed outer one
        assert!(matches!(env.lookup("a"), Lookup::Found(Ty::Text)));
        env.pop_scope();
        assert!(matches!(env.lookup("a"), Lookup::Found(Ty::Integer)));
    }

    #[test]
    fn qualified_lookup_separates_table_and_column_misses() {
        let mut env = Environment::new();
        env.add_source(source("t", &[("a", Ty::Integer)]));
        assert!(matches!(env.lookup_qualified("t", "a"), Ok(Lookup::Found(_))));
        assert!(matches!(env.lookup_qualified("t", "b"), Ok(Lookup::NotFound)));
        assert!(env.lookup_qualified("nope", "a").is_err());
        // the implicit rowid alias on real tables
        assert!(matches!(
            env.lookup_qualified("t", "rowid"),
            Ok(Lookup::Found(Ty::Integer))
        ));
    }

    #[test]
    fn positional_inputs_number_from_the_largest_seen_index() {
        let schema = Schema::new();
        let mut inf = Inferencer::new(&schema);
        let loc = SourceLocation::new(0, 1);
        inf.record_input("?", loc);
        inf.record_input("?5", loc);
        inf.record_input("?", loc);
        let names: Vec<&str> = inf.inputs.iter().map(|slot| slot.name.as_str()).collect();
        assert_eq!(names, vec!["?1", "?5", "?6"]);
    }

    #[test]
    fn named_inputs_share_one_slot_and_variable() {
        let schema = Schema::new();
        let mut inf = Inferencer::new(&schema);
        let loc = SourceLocation::new(0, 1);
        let first = inf.record_input(":x", loc);
        let second = inf.record_input(":x", loc);
        assert_eq!(first, second);
        assert_eq!(inf.inputs.len(), 1);
    }

    #[test]
    fn coalesce_strips_nullability_with_a_non_null_alternative() {
        let schema = Schema::new();
        let mut inf = Inferencer::new(&schema);
        let loc = SourceLocation::new(0, 1);
        let nullable = vec![Ty::optional(Ty::Integer), Ty::Integer];
        let ty = inf.builtin_function("COALESCE", &nullable, false, loc).unwrap();
        assert_eq!(ty, Ty::Integer);
        let all_nullable = vec![Ty::optional(Ty::Integer), Ty::optional(Ty::Integer)];
        let ty = inf
            .builtin_function("COALESCE", &all_nullable, false, loc)
            .unwrap();
        assert_eq!(ty, Ty::optional(Ty::Integer));
    }

    #[test]
    fn aggregates_are_nullable_count_is_not() {
        let schema = Schema::new();
        let mut inf = Inferencer::new(&schema);
        let loc = SourceLocation::new(0, 1);
        assert_eq!(
            inf.builtin_function("COUNT", &[], true, loc).unwrap(),
            Ty::Integer
        );
        assert_eq!(
            inf.builtin_function("SUM", &[Ty::Integer], false, loc).unwrap(),
            Ty::optional(Ty::Integer)
        );
        assert_eq!(
            inf.builtin_function("MAX", &[Ty::Text], false, loc).unwrap(),
            Ty::optional(Ty::Text)
        );
        assert!(inf.builtin_function("FROBNICATE", &[], false, loc).is_none());
    }
}
