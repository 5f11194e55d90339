//! Expression parsing: a Pratt climber over SQLite's precedence table.
//!
//! Multi-word operators (`IS NOT`, `IS NOT DISTINCT FROM`, `NOT LIKE`,
//! `NOT BETWEEN`, ...) are resolved by a bounded two-token lookahead. The
//! guess only has to land in the right precedence class; the exact
//! operator is pinned down while consuming it. `CAST` is a primary
//! expression and never appears in the guess.

use crate::ast::*;
use crate::diag::{Diagnostic, DiagnosticKind};
use crate::keyword::Keyword;
use crate::token::{Token, TokenKind};

use super::Parser;

pub(crate) const PREC_OR: u8 = 1;
pub(crate) const PREC_AND: u8 = 2;
pub(crate) const PREC_NOT: u8 = 3;
pub(crate) const PREC_EQ: u8 = 4;
pub(crate) const PREC_CMP: u8 = 5;
pub(crate) const PREC_ESCAPE: u8 = 6;
pub(crate) const PREC_BIT: u8 = 7;
pub(crate) const PREC_ADD: u8 = 8;
pub(crate) const PREC_MUL: u8 = 9;
pub(crate) const PREC_CONCAT: u8 = 10;
pub(crate) const PREC_COLLATE: u8 = 11;
pub(crate) const PREC_UNARY: u8 = 12;

/// The operator class guessed from at most two tokens of lookahead.
#[derive(Clone, Copy, Debug)]
enum OpGuess {
    Binary(BinaryOp),
    /// `IS ...`; may resolve to `IS`, `IS NOT`, `IS [NOT] DISTINCT FROM`
    /// or `IS [NOT] NULL` while consuming. All share one precedence class.
    Is,
    Like(LikeOp, bool),
    Between(bool),
    In(bool),
    IsNullPostfix(bool),
    Escape,
    Collate,
}

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> Expr {
        self.parse_subexpr(0)
    }

    /// Parses operators until one binds no tighter than `min_prec`.
    pub(crate) fn parse_subexpr(&mut self, min_prec: u8) -> Expr {
        let mut expr = self.parse_prefix();
        while let Some((guess, prec)) = self.guess_infix() {
            if prec <= min_prec {
                break;
            }
            expr = self.parse_infix(expr, guess, prec);
        }
        expr
    }

    /// Guess the class of the operator at the cursor, looking at most two
    /// tokens ahead. Returns the guess and its precedence.
    fn guess_infix(&self) -> Option<(OpGuess, u8)> {
        let token = self.peek()?;
        let guess = match &token.kind {
            TokenKind::Keyword(Keyword::Or) => (OpGuess::Binary(BinaryOp::Or), PREC_OR),
            TokenKind::Keyword(Keyword::And) => (OpGuess::Binary(BinaryOp::And), PREC_AND),
            TokenKind::Keyword(Keyword::Not) => {
                // NOT is only an infix lead-in when followed by one of the
                // level-4 operators; otherwise it is not infix at all.
                let next = self.peek_nth(1)?;
                match next.keyword()? {
                    Keyword::Like => (OpGuess::Like(LikeOp::Like, true), PREC_EQ),
                    Keyword::Glob => (OpGuess::Like(LikeOp::Glob, true), PREC_EQ),
                    Keyword::Regexp => (OpGuess::Like(LikeOp::Regexp, true), PREC_EQ),
                    Keyword::Match => (OpGuess::Like(LikeOp::Match, true), PREC_EQ),
                    Keyword::Between => (OpGuess::Between(true), PREC_EQ),
                    Keyword::In => (OpGuess::In(true), PREC_EQ),
                    Keyword::Null => (OpGuess::IsNullPostfix(true), PREC_EQ),
                    _ => return None,
                }
            }
            TokenKind::Keyword(Keyword::Is) => (OpGuess::Is, PREC_EQ),
            TokenKind::Keyword(Keyword::Between) => (OpGuess::Between(false), PREC_EQ),
            TokenKind::Keyword(Keyword::In) => (OpGuess::In(false), PREC_EQ),
            TokenKind::Keyword(Keyword::Like) => (OpGuess::Like(LikeOp::Like, false), PREC_EQ),
            TokenKind::Keyword(Keyword::Glob) => (OpGuess::Like(LikeOp::Glob, false), PREC_EQ),
            TokenKind::Keyword(Keyword::Regexp) => (OpGuess::Like(LikeOp::Regexp, false), PREC_EQ),
            TokenKind::Keyword(Keyword::Match) => (OpGuess::Like(LikeOp::Match, false), PREC_EQ),
            TokenKind::Keyword(Keyword::Isnull) => (OpGuess::IsNullPostfix(false), PREC_EQ),
            TokenKind::Keyword(Keyword::Notnull) => (OpGuess::IsNullPostfix(true), PREC_EQ),
            TokenKind::Keyword(Keyword::Escape) => (OpGuess::Escape, PREC_ESCAPE),
            TokenKind::Keyword(Keyword::Collate) => (OpGuess::Collate, PREC_COLLATE),
            TokenKind::Eq | TokenKind::EqEq => (OpGuess::Binary(BinaryOp::Eq), PREC_EQ),
            TokenKind::NotEq => (OpGuess::Binary(BinaryOp::NotEq), PREC_EQ),
            TokenKind::Lt => (OpGuess::Binary(BinaryOp::Lt), PREC_CMP),
            TokenKind::LtEq => (OpGuess::Binary(BinaryOp::LtEq), PREC_CMP),
            TokenKind::Gt => (OpGuess::Binary(BinaryOp::Gt), PREC_CMP),
            TokenKind::GtEq => (OpGuess::Binary(BinaryOp::GtEq), PREC_CMP),
            TokenKind::Ampersand => (OpGuess::Binary(BinaryOp::BitAnd), PREC_BIT),
            TokenKind::Pipe => (OpGuess::Binary(BinaryOp::BitOr), PREC_BIT),
            TokenKind::LtLt => (OpGuess::Binary(BinaryOp::ShiftLeft), PREC_BIT),
            TokenKind::GtGt => (OpGuess::Binary(BinaryOp::ShiftRight), PREC_BIT),
            TokenKind::Plus => (OpGuess::Binary(BinaryOp::Add), PREC_ADD),
            TokenKind::Minus => (OpGuess::Binary(BinaryOp::Subtract), PREC_ADD),
            TokenKind::Star => (OpGuess::Binary(BinaryOp::Multiply), PREC_MUL),
            TokenKind::Slash => (OpGuess::Binary(BinaryOp::Divide), PREC_MUL),
            TokenKind::Percent => (OpGuess::Binary(BinaryOp::Modulo), PREC_MUL),
            TokenKind::Concat => (OpGuess::Binary(BinaryOp::Concat), PREC_CONCAT),
            TokenKind::Arrow => (OpGuess::Binary(BinaryOp::Extract), PREC_CONCAT),
            TokenKind::LongArrow => (OpGuess::Binary(BinaryOp::ExtractText), PREC_CONCAT),
            _ => return None,
        };
        Some(guess)
    }

    fn parse_infix(&mut self, left: Expr, guess: OpGuess, prec: u8) -> Expr {
        let start = left.location;
        match guess {
            OpGuess::Binary(op) => {
                self.bump();
                let right = self.parse_subexpr(prec);
                let location = start.spanning(&right.location);
                Expr::new(
                    ExprKind::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    location,
                )
            }
            OpGuess::Is => {
                self.bump(); // IS
                let negated = self.eat_keyword(Keyword::Not);
                if self.eat_keyword(Keyword::Distinct) {
                    self.expect_keyword(Keyword::From);
                    let op = if negated {
                        BinaryOp::IsNotDistinctFrom
                    } else {
                        BinaryOp::IsDistinctFrom
                    };
                    let right = self.parse_subexpr(prec);
                    let location = start.spanning(&right.location);
                    return Expr::new(
                        ExprKind::Binary {
                            left: Box::new(left),
                            op,
                            right: Box::new(right),
                        },
                        location,
                    );
                }
                if self.at_keyword(Keyword::Null) {
                    self.bump();
                    let location = self.span_from(start);
                    return Expr::new(
                        ExprKind::IsNull {
                            operand: Box::new(left),
                            negated,
                        },
                        location,
                    );
                }
                let op = if negated { BinaryOp::IsNot } else { BinaryOp::Is };
                let right = self.parse_subexpr(prec);
                let location = start.spanning(&right.location);
                Expr::new(
                    ExprKind::Binary {
                        left: Box::new(left),
                        op,
                        right: Box::new(right),
                    },
                    location,
                )
            }
            OpGuess::Like(op, negated) => {
                if negated {
                    self.bump(); // NOT
                }
                self.bump(); // LIKE/GLOB/REGEXP/MATCH
                // stop short of ESCAPE so it attaches to this node
                let pattern = self.parse_subexpr(PREC_ESCAPE);
                let escape = if self.eat_keyword(Keyword::Escape) {
                    Some(Box::new(self.parse_subexpr(PREC_ESCAPE)))
                } else {
                    None
                };
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Like {
                        operand: Box::new(left),
                        op,
                        negated,
                        pattern: Box::new(pattern),
                        escape,
                    },
                    location,
                )
            }
            OpGuess::Between(negated) => {
                if negated {
                    self.bump(); // NOT
                }
                self.bump(); // BETWEEN
                // bounds are parsed one level above AND so the separating
                // AND is not absorbed into the lower bound
                let low = self.parse_subexpr(PREC_AND);
                self.expect_keyword(Keyword::And);
                let high = self.parse_subexpr(PREC_AND);
                let location = start.spanning(&high.location);
                Expr::new(
                    ExprKind::Between {
                        operand: Box::new(left),
                        negated,
                        low: Box::new(low),
                        high: Box::new(high),
                    },
                    location,
                )
            }
            OpGuess::In(negated) => {
                if negated {
                    self.bump(); // NOT
                }
                self.bump(); // IN
                let items = if self.eat(&TokenKind::LeftParen) {
                    let items = if self.at_select_start() {
                        InItems::Subquery(Box::new(self.parse_select_stmt(None)))
                    } else if self.at(&TokenKind::RightParen) {
                        InItems::List(Vec::new())
                    } else {
                        InItems::List(self.comma_separated(|p| p.parse_expr()))
                    };
                    self.expect(&TokenKind::RightParen);
                    items
                } else {
                    let name = self.parse_qualified_name();
                    let args = if self.eat(&TokenKind::LeftParen) {
                        let args = if self.at(&TokenKind::RightParen) {
                            Vec::new()
                        } else {
                            self.comma_separated(|p| p.parse_expr())
                        };
                        self.expect(&TokenKind::RightParen);
                        args
                    } else {
                        Vec::new()
                    };
                    InItems::Table(name, args)
                };
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::In {
                        operand: Box::new(left),
                        negated,
                        items,
                    },
                    location,
                )
            }
            OpGuess::IsNullPostfix(negated) => {
                let token = self.bump().expect("guessed");
                if token.is_keyword(Keyword::Not) {
                    self.expect_keyword(Keyword::Null);
                }
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::IsNull {
                        operand: Box::new(left),
                        negated,
                    },
                    location,
                )
            }
            OpGuess::Escape => {
                // ESCAPE is only meaningful directly after a LIKE family
                // operator; the Like arm consumes it there. Reaching it
                // here is a stray.
                let location = self.here();
                self.bump();
                self.push_diagnostic(Diagnostic::new(
                    DiagnosticKind::InvalidOperator,
                    "ESCAPE must follow a LIKE, GLOB, REGEXP or MATCH pattern",
                    location,
                ));
                // consume the operand for recovery
                let _ = self.parse_subexpr(PREC_ESCAPE);
                left
            }
            OpGuess::Collate => {
                self.bump(); // COLLATE
                let collation = self.parse_identifier();
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Collate {
                        operand: Box::new(left),
                        collation,
                    },
                    location,
                )
            }
        }
    }

    fn parse_prefix(&mut self) -> Expr {
        let start = self.here();
        let Some(token) = self.peek() else {
            self.unexpected("an expression");
            return Expr::recovery(start);
        };
        match &token.kind {
            TokenKind::Number(text) => {
                let text = text.clone();
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Numeric(text)), start)
            }
            TokenKind::String(text) => {
                let text = text.clone();
                self.bump();
                Expr::new(ExprKind::Literal(Literal::String(text)), start)
            }
            TokenKind::Blob(hex) => {
                let hex = hex.clone();
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Blob(hex)), start)
            }
            TokenKind::Placeholder(text) => {
                let text = text.clone();
                self.bump();
                Expr::new(ExprKind::Placeholder(text), start)
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Null), start)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::True), start)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::False), start)
            }
            TokenKind::Keyword(Keyword::CurrentTime) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::CurrentTime), start)
            }
            TokenKind::Keyword(Keyword::CurrentDate) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::CurrentDate), start)
            }
            TokenKind::Keyword(Keyword::CurrentTimestamp) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::CurrentTimestamp), start)
            }
            TokenKind::Minus => {
                self.bump();
                let operand = self.parse_subexpr(PREC_UNARY);
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Negate,
                        operand: Box::new(operand),
                    },
                    location,
                )
            }
            TokenKind::Plus => {
                self.bump();
                let operand = self.parse_subexpr(PREC_UNARY);
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Plus,
                        operand: Box::new(operand),
                    },
                    location,
                )
            }
            TokenKind::Tilde => {
                self.bump();
                let operand = self.parse_subexpr(PREC_UNARY);
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::BitNot,
                        operand: Box::new(operand),
                    },
                    location,
                )
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.bump();
                if self.at_keyword(Keyword::Exists) {
                    return self.parse_exists(start, true);
                }
                let operand = self.parse_subexpr(PREC_NOT);
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: Box::new(operand),
                    },
                    location,
                )
            }
            TokenKind::Keyword(Keyword::Cast) => {
                self.bump();
                self.expect(&TokenKind::LeftParen);
                let operand = self.parse_expr();
                self.expect_keyword(Keyword::As);
                let ty = self.parse_type_name();
                self.expect(&TokenKind::RightParen);
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Cast {
                        operand: Box::new(operand),
                        ty,
                    },
                    location,
                )
            }
            TokenKind::Keyword(Keyword::Case) => self.parse_case(start),
            TokenKind::Keyword(Keyword::Exists) => self.parse_exists(start, false),
            TokenKind::LeftParen => {
                self.bump();
                if self.at_select_start() {
                    let select = self.parse_select_stmt(None);
                    self.expect(&TokenKind::RightParen);
                    let location = self.span_from(start);
                    return Expr::new(ExprKind::Subquery(Box::new(select)), location);
                }
                let first = self.parse_expr();
                if self.eat(&TokenKind::Comma) {
                    let mut items = vec![first];
                    items.extend(self.comma_separated(|p| p.parse_expr()));
                    self.expect(&TokenKind::RightParen);
                    let location = self.span_from(start);
                    Expr::new(ExprKind::Tuple(items), location)
                } else {
                    self.expect(&TokenKind::RightParen);
                    let location = self.span_from(start);
                    Expr::new(ExprKind::Grouped(Box::new(first)), location)
                }
            }
            TokenKind::Ident(_) | TokenKind::Keyword(_) => {
                // a keyword here must be usable as an identifier
                if let Some(kw) = token.keyword() {
                    if !kw.non_reserved() {
                        return self.recover_expr("an expression");
                    }
                }
                if matches!(self.peek_nth(1), Some(Token { kind: TokenKind::LeftParen, .. })) {
                    return self.parse_function_call(start);
                }
                self.parse_column_ref(start)
            }
            _ => self.recover_expr("an expression"),
        }
    }

    /// Record a diagnostic, synthesize a recovery node and skip the
    /// offending token unless it is a resynchronization point.
    fn recover_expr(&mut self, expected: &str) -> Expr {
        self.unexpected(expected);
        let location = self.here();
        if !self.at_follow_set() {
            self.bump();
        }
        Expr::recovery(location)
    }

    fn parse_case(&mut self, start: crate::SourceLocation) -> Expr {
        self.bump(); // CASE
        let operand = if self.at_keyword(Keyword::When) {
            None
        } else {
            Some(Box::new(self.parse_expr()))
        };
        let mut whens = Vec::new();
        while self.eat_keyword(Keyword::When) {
            let when = self.parse_expr();
            self.expect_keyword(Keyword::Then);
            let then = self.parse_expr();
            whens.push(CaseWhen { when, then });
        }
        if whens.is_empty() {
            self.unexpected("'WHEN'");
        }
        let else_expr = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_expr()))
        } else {
            None
        };
        self.expect_keyword(Keyword::End);
        let location = self.span_from(start);
        Expr::new(
            ExprKind::Case {
                operand,
                whens,
                else_expr,
            },
            location,
        )
    }

    fn parse_exists(&mut self, start: crate::SourceLocation, negated: bool) -> Expr {
        self.bump(); // EXISTS
        self.expect(&TokenKind::LeftParen);
        let select = self.parse_select_stmt(None);
        self.expect(&TokenKind::RightParen);
        let location = self.span_from(start);
        Expr::new(
            ExprKind::Exists {
                negated,
                select: Box::new(select),
            },
            location,
        )
    }

    fn parse_function_call(&mut self, start: crate::SourceLocation) -> Expr {
        let name = self.parse_identifier();
        self.expect(&TokenKind::LeftParen);
        let args = if self.eat(&TokenKind::Star) {
            FunctionArgs::Star
        } else if self.at(&TokenKind::RightParen) {
            FunctionArgs::List {
                distinct: false,
                args: Vec::new(),
            }
        } else {
            let distinct = self.eat_keyword(Keyword::Distinct);
            FunctionArgs::List {
                distinct,
                args: self.comma_separated(|p| p.parse_expr()),
            }
        };
        self.expect(&TokenKind::RightParen);
        let filter = if self.at_keyword(Keyword::Filter) {
            self.bump();
            self.expect(&TokenKind::LeftParen);
            self.expect_keyword(Keyword::Where);
            let filter = self.parse_expr();
            self.expect(&TokenKind::RightParen);
            Some(Box::new(filter))
        } else {
            None
        };
        let over = if self.eat_keyword(Keyword::Over) {
            Some(self.parse_over_clause())
        } else {
            None
        };
        let location = self.span_from(start);
        Expr::new(
            ExprKind::Function(FunctionCall {
                name,
                args,
                filter,
                over,
            }),
            location,
        )
    }

    /// Window definitions are parsed for completeness but treated as
    /// opaque by the analysis passes.
    fn parse_over_clause(&mut self) -> OverClause {
        if !self.eat(&TokenKind::LeftParen) {
            // `OVER window_name`
            let name = self.parse_identifier();
            return OverClause {
                window_name: Some(name),
                partition_by: Vec::new(),
                order_by: Vec::new(),
                has_frame: false,
            };
        }
        let mut over = OverClause {
            window_name: None,
            partition_by: Vec::new(),
            order_by: Vec::new(),
            has_frame: false,
        };
        if !self.at(&TokenKind::RightParen)
            && !self.at_keyword(Keyword::Partition)
            && !self.at_keyword(Keyword::Order)
            && !self.at_keyword(Keyword::Range)
            && !self.at_keyword(Keyword::Rows)
        {
            over.window_name = Some(self.parse_identifier());
        }
        if self.eat_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::By);
            over.partition_by = self.comma_separated(|p| p.parse_expr());
        }
        if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By);
            over.order_by = self.comma_separated(|p| p.parse_ordering_term());
        }
        if self.at_keyword(Keyword::Range) || self.at_keyword(Keyword::Rows) {
            over.has_frame = true;
            // skip the frame specification up to the closing paren
            let mut depth = 0u32;
            while let Some(token) = self.peek() {
                match token.kind {
                    TokenKind::LeftParen => depth += 1,
                    TokenKind::RightParen => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    _ => {}
                }
                self.bump();
            }
        }
        self.expect(&TokenKind::RightParen);
        over
    }

    fn parse_column_ref(&mut self, start: crate::SourceLocation) -> Expr {
        let first = self.parse_identifier();
        if !self.at(&TokenKind::Period) {
            let location = self.span_from(start);
            return Expr::new(
                ExprKind::Column(ColumnRef {
                    schema: None,
                    table: None,
                    column: first,
                }),
                location,
            );
        }
        self.bump(); // .
        let second = self.parse_identifier();
        if !self.at(&TokenKind::Period) {
            let location = self.span_from(start);
            return Expr::new(
                ExprKind::Column(ColumnRef {
                    schema: None,
                    table: Some(first),
                    column: second,
                }),
                location,
            );
        }
        self.bump(); // .
        let third = self.parse_identifier();
        let location = self.span_from(start);
        Expr::new(
            ExprKind::Column(ColumnRef {
                schema: Some(first),
                table: Some(second),
                column: third,
            }),
            location,
        )
    }

    /// True when the cursor sits on the start of a (possibly
    /// CTE-prefixed) select.
    pub(crate) fn at_select_start(&self) -> bool {
        matches!(
            self.peek().and_then(Token::keyword),
            Some(Keyword::Select) | Some(Keyword::With) | Some(Keyword::Values)
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::parse_statement;
    use crate::ast::*;

    /// Parse `source` as the lone result column of a SELECT.
    fn expr(source: &str) -> Expr {
        let (stmt, diagnostics) = parse_statement(&format!("SELECT {source}"));
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics for {source:?}: {diagnostics:?}"
        );
        let StmtKind::Select(select) = stmt.unwrap().kind else {
            panic!()
        };
        let SelectCore::Select { mut columns, .. } = select.body.first else {
            panic!()
        };
        assert_eq!(columns.len(), 1, "{source:?} split into multiple columns");
        match columns.remove(0) {
            ResultColumn::Expr { expr, .. } => expr,
            other => panic!("expected expression column, got {other:?}"),
        }
    }

    fn binary(expr: &Expr) -> (&Expr, BinaryOp, &Expr) {
        match &expr.kind {
            ExprKind::Binary { left, op, right } => (left, *op, right),
            other => panic!("expected binary, got {other:?}"),
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = expr("1 + 2 * 3");
        let (left, op, right) = binary(&e);
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(left.kind, ExprKind::Literal(_)));
        assert_eq!(binary(right).1, BinaryOp::Multiply);
    }

    #[test]
    fn addition_binds_tighter_than_shifts() {
        let e = expr("1 << 2 + 3");
        let (_, op, right) = binary(&e);
        assert_eq!(op, BinaryOp::ShiftLeft);
        assert_eq!(binary(right).1, BinaryOp::Add);
    }

    #[test]
    fn comparison_binds_tighter_than_and_and_or() {
        let e = expr("a = b AND c = d OR e");
        // ((a = b AND c = d) OR e)
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::Or);
        let (and_left, and_op, and_right) = binary(left);
        assert_eq!(and_op, BinaryOp::And);
        assert_eq!(binary(and_left).1, BinaryOp::Eq);
        assert_eq!(binary(and_right).1, BinaryOp::Eq);
    }

    #[test]
    fn left_associativity() {
        let e = expr("1 - 2 - 3");
        // ((1 - 2) - 3)
        let (left, op, right) = binary(&e);
        assert_eq!(op, BinaryOp::Subtract);
        assert!(matches!(right.kind, ExprKind::Literal(_)));
        assert_eq!(binary(left).1, BinaryOp::Subtract);
    }

    #[test]
    fn unary_minus_binds_tighter_than_multiplication() {
        let e = expr("-a * b");
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::Multiply);
        assert!(matches!(
            left.kind,
            ExprKind::Unary {
                op: UnaryOp::Negate,
                ..
            }
        ));
    }

    #[test]
    fn not_is_looser_than_comparison() {
        let e = expr("NOT a = b");
        let ExprKind::Unary {
            op: UnaryOp::Not,
            operand,
        } = &e.kind
        else {
            panic!("expected NOT, got {e:?}")
        };
        assert_eq!(binary(operand).1, BinaryOp::Eq);
    }

    #[test]
    fn collate_is_postfix_and_tight() {
        let e = expr("a COLLATE nocase = b");
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::Eq);
        let ExprKind::Collate { collation, .. } = &left.kind else {
            panic!("expected COLLATE on the left, got {left:?}")
        };
        assert!(collation.eq_ignore_case("nocase"));
    }

    #[test]
    fn concat_and_extraction_share_a_level() {
        let e = expr("a || b -> c");
        // ((a || b) -> c)
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::Extract);
        assert_eq!(binary(left).1, BinaryOp::Concat);
    }

    #[test]
    fn is_forms_resolve_by_lookahead() {
        assert!(matches!(
            expr("a IS NULL").kind,
            ExprKind::IsNull { negated: false, .. }
        ));
        assert!(matches!(
            expr("a IS NOT NULL").kind,
            ExprKind::IsNull { negated: true, .. }
        ));
        assert_eq!(binary(&expr("a IS b")).1, BinaryOp::Is);
        assert_eq!(binary(&expr("a IS NOT b")).1, BinaryOp::IsNot);
        assert_eq!(
            binary(&expr("a IS DISTINCT FROM b")).1,
            BinaryOp::IsDistinctFrom
        );
        assert_eq!(
            binary(&expr("a IS NOT DISTINCT FROM b")).1,
            BinaryOp::IsNotDistinctFrom
        );
    }

    #[test]
    fn negated_membership_forms() {
        assert!(matches!(
            expr("a NOT IN (1, 2)").kind,
            ExprKind::In { negated: true, .. }
        ));
        assert!(matches!(
            expr("a NOT BETWEEN 1 AND 2").kind,
            ExprKind::Between { negated: true, .. }
        ));
        assert!(matches!(
            expr("a NOT GLOB 'x*'").kind,
            ExprKind::Like {
                op: LikeOp::Glob,
                negated: true,
                ..
            }
        ));
        assert!(matches!(
            expr("a NOT NULL").kind,
            ExprKind::IsNull { negated: true, .. }
        ));
    }

    #[test]
    fn like_escape_attaches_to_the_like() {
        let e = expr("a NOT LIKE b ESCAPE c AND d");
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::And);
        let ExprKind::Like {
            negated, escape, ..
        } = &left.kind
        else {
            panic!("expected LIKE, got {left:?}")
        };
        assert!(*negated);
        assert!(escape.is_some());
    }

    #[test]
    fn in_accepts_lists_subqueries_and_tables() {
        assert!(matches!(
            expr("a IN (1, 2, 3)").kind,
            ExprKind::In {
                items: InItems::List(_),
                ..
            }
        ));
        assert!(matches!(
            expr("a IN (SELECT b FROM t)").kind,
            ExprKind::In {
                items: InItems::Subquery(_),
                ..
            }
        ));
        assert!(matches!(
            expr("a IN other_table").kind,
            ExprKind::In {
                items: InItems::Table(..),
                ..
            }
        ));
    }

    #[test]
    fn cast_is_a_primary_expression() {
        let e = expr("CAST(a + 1 AS VARCHAR(10)) || 'x'");
        let (left, op, _) = binary(&e);
        assert_eq!(op, BinaryOp::Concat);
        let ExprKind::Cast { ty, .. } = &left.kind else {
            panic!("expected CAST, got {left:?}")
        };
        assert_eq!(ty.name, "VARCHAR");
        assert_eq!(ty.args.len(), 1);
    }

    #[test]
    fn case_with_and_without_operand() {
        let e = expr("CASE WHEN a THEN 1 ELSE 2 END");
        assert!(matches!(
            e.kind,
            ExprKind::Case {
                operand: None,
                ..
            }
        ));
        let e = expr("CASE a WHEN 1 THEN 'one' END");
        let ExprKind::Case {
            operand, else_expr, ..
        } = &e.kind
        else {
            panic!()
        };
        assert!(operand.is_some());
        assert!(else_expr.is_none());
    }

    #[test]
    fn tuples_group_and_subqueries() {
        assert!(matches!(expr("(1, 2)").kind, ExprKind::Tuple(_)));
        assert!(matches!(expr("(1)").kind, ExprKind::Grouped(_)));
        assert!(matches!(
            expr("(SELECT 1)").kind,
            ExprKind::Subquery(_)
        ));
        assert!(matches!(
            expr("NOT EXISTS (SELECT 1)").kind,
            ExprKind::Exists { negated: true, .. }
        ));
    }

    #[test]
    fn qualified_column_references() {
        let e = expr("main.t.c");
        let ExprKind::Column(column) = &e.kind else {
            panic!()
        };
        assert!(column.schema.as_ref().unwrap().eq_ignore_case("main"));
        assert!(column.table.as_ref().unwrap().eq_ignore_case("t"));
        assert!(column.column.eq_ignore_case("c"));
    }

    #[test]
    fn window_function_syntax_is_surfaced() {
        let e = expr("row_number() OVER (PARTITION BY a ORDER BY b)");
        let ExprKind::Function(call) = &e.kind else {
            panic!()
        };
        let over = call.over.as_ref().unwrap();
        assert_eq!(over.partition_by.len(), 1);
        assert_eq!(over.order_by.len(), 1);
        assert!(!over.has_frame);
    }

    #[test]
    fn expression_spans_cover_their_text() {
        let source = "SELECT a + b * c";
        let (stmt, _) = parse_statement(source);
        let StmtKind::Select(select) = stmt.unwrap().kind else {
            panic!()
        };
        let SelectCore::Select { columns, .. } = &select.body.first else {
            panic!()
        };
        let ResultColumn::Expr { expr, .. } = &columns[0] else {
            panic!()
        };
        assert_eq!(expr.location.slice(source), "a + b * c");
    }
}
