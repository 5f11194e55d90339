//! Statement parsing: recursive descent dispatched on the leading keyword.

use crate::ast::*;
use crate::keyword::Keyword;
use crate::token::{Token, TokenKind};

use super::Parser;

impl Parser {
    pub(crate) fn parse_stmt(&mut self) -> Option<Stmt> {
        let start = self.here();
        let Some(token) = self.peek() else {
            return None;
        };
        let Some(kw) = token.keyword() else {
            self.unexpected("a statement");
            self.recover_to_statement_boundary();
            return None;
        };
        let kind = match kw {
            Keyword::Select | Keyword::Values => {
                StmtKind::Select(self.parse_select_stmt(None))
            }
            Keyword::With => {
                let with = self.parse_with_clause();
                match self.peek().and_then(Token::keyword) {
                    Some(Keyword::Select) | Some(Keyword::Values) => {
                        StmtKind::Select(self.parse_select_stmt(Some(with)))
                    }
                    Some(Keyword::Insert) | Some(Keyword::Replace) => {
                        StmtKind::Insert(self.parse_insert_stmt(Some(with)))
                    }
                    Some(Keyword::Update) => StmtKind::Update(self.parse_update_stmt(Some(with))),
                    Some(Keyword::Delete) => StmtKind::Delete(self.parse_delete_stmt(Some(with))),
                    _ => {
                        self.unexpected("SELECT, INSERT, UPDATE or DELETE after WITH");
                        self.recover_to_statement_boundary();
                        return None;
                    }
                }
            }
            Keyword::Insert | Keyword::Replace => StmtKind::Insert(self.parse_insert_stmt(None)),
            Keyword::Update => StmtKind::Update(self.parse_update_stmt(None)),
            Keyword::Delete => StmtKind::Delete(self.parse_delete_stmt(None)),
            Keyword::Create => self.parse_create_stmt()?,
            Keyword::Alter => StmtKind::AlterTable(self.parse_alter_table_stmt()),
            Keyword::Drop => StmtKind::DropTable(self.parse_drop_table_stmt()?),
            Keyword::Pragma => StmtKind::Pragma(self.parse_pragma_stmt()),
            Keyword::Reindex => StmtKind::Reindex(self.parse_reindex_stmt()),
            Keyword::Begin => StmtKind::Begin(self.parse_begin_stmt()),
            Keyword::Commit => {
                self.bump();
                self.eat_keyword(Keyword::Transaction);
                StmtKind::Commit
            }
            Keyword::Rollback => {
                self.bump();
                self.eat_keyword(Keyword::Transaction);
                StmtKind::Rollback
            }
            _ => {
                self.unexpected("a statement");
                self.recover_to_statement_boundary();
                return None;
            }
        };
        Some(Stmt::new(kind, self.span_from(start)))
    }

    // ---------------------------------------------------------------- WITH

    pub(crate) fn parse_with_clause(&mut self) -> WithClause {
        self.expect_keyword(Keyword::With);
        let recursive = self.eat_keyword(Keyword::Recursive);
        let ctes = self.comma_separated(|p| p.parse_cte());
        WithClause { recursive, ctes }
    }

    fn parse_cte(&mut self) -> CommonTableExpr {
        let name = self.parse_identifier();
        let columns = if self.eat(&TokenKind::LeftParen) {
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            columns
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::As);
        let materialized = if self.eat_keywords(&[Keyword::Not, Keyword::Materialized]) {
            Some(false)
        } else if self.eat_keyword(Keyword::Materialized) {
            Some(true)
        } else {
            None
        };
        self.expect(&TokenKind::LeftParen);
        let select = self.parse_select_stmt(None);
        self.expect(&TokenKind::RightParen);
        CommonTableExpr {
            name,
            columns,
            materialized,
            select: Box::new(select),
        }
    }

    // -------------------------------------------------------------- SELECT

    pub(crate) fn parse_select_stmt(&mut self, with: Option<WithClause>) -> SelectStmt {
        let start = self.here();
        let with = match with {
            Some(with) => Some(with),
            None if self.at_keyword(Keyword::With) => Some(self.parse_with_clause()),
            None => None,
        };
        let first = self.parse_select_core();
        let mut compounds = Vec::new();
        loop {
            let op = if self.eat_keyword(Keyword::Union) {
                if self.eat_keyword(Keyword::All) {
                    CompoundOp::UnionAll
                } else {
                    CompoundOp::Union
                }
            } else if self.eat_keyword(Keyword::Intersect) {
                CompoundOp::Intersect
            } else if self.eat_keyword(Keyword::Except) {
                CompoundOp::Except
            } else {
                break;
            };
            compounds.push((op, self.parse_select_core()));
        }
        let order_by = if self.eat_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By);
            self.comma_separated(|p| p.parse_ordering_term())
        } else {
            Vec::new()
        };
        let limit = self.parse_limit_clause();
        SelectStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            with,
            body: SelectBody { first, compounds },
            order_by,
            limit,
        }
    }

    fn parse_select_core(&mut self) -> SelectCore {
        if self.eat_keyword(Keyword::Values) {
            let rows = self.comma_separated(|p| {
                p.expect(&TokenKind::LeftParen);
                let row = p.comma_separated(|p| p.parse_expr());
                p.expect(&TokenKind::RightParen);
                row
            });
            return SelectCore::Values(rows);
        }
        self.expect_keyword(Keyword::Select);
        let distinct = if self.eat_keyword(Keyword::Distinct) {
            true
        } else {
            self.eat_keyword(Keyword::All);
            false
        };
        let columns = self.comma_separated(|p| p.parse_result_column());
        let from = if self.eat_keyword(Keyword::From) {
            Some(self.parse_from_clause())
        } else {
            None
        };
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr())
        } else {
            None
        };
        let group_by = if self.eat_keyword(Keyword::Group) {
            self.expect_keyword(Keyword::By);
            self.comma_separated(|p| p.parse_expr())
        } else {
            Vec::new()
        };
        let having = if self.eat_keyword(Keyword::Having) {
            Some(self.parse_expr())
        } else {
            None
        };
        let mut windows = Vec::new();
        if self.eat_keyword(Keyword::Window) {
            loop {
                let name = self.parse_identifier();
                self.expect_keyword(Keyword::As);
                self.expect(&TokenKind::LeftParen);
                // window definitions are surfaced as syntax only
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
                self.expect(&TokenKind::RightParen);
                windows.push(name);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        SelectCore::Select {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            windows,
        }
    }

    fn parse_result_column(&mut self) -> ResultColumn {
        if self.eat(&TokenKind::Star) {
            return ResultColumn::Star;
        }
        // `table.*`
        if let (Some(Token { kind: TokenKind::Ident(_), .. }), Some(period), Some(star)) =
            (self.peek(), self.peek_nth(1), self.peek_nth(2))
        {
            if period.kind == TokenKind::Period && star.kind == TokenKind::Star {
                let table = self.parse_identifier();
                self.bump(); // .
                self.bump(); // *
                return ResultColumn::TableStar(table);
            }
        }
        let expr = self.parse_expr();
        let alias = self.parse_alias();
        ResultColumn::Expr { expr, alias }
    }

    /// `AS name`, or a bare trailing identifier.
    fn parse_alias(&mut self) -> Option<Ident> {
        if self.eat_keyword(Keyword::As) {
            return Some(self.parse_identifier());
        }
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(_),
                ..
            }) => Some(self.parse_identifier()),
            _ => None,
        }
    }

    pub(crate) fn parse_ordering_term(&mut self) -> OrderingTerm {
        let expr = self.parse_expr();
        let ascending = if self.eat_keyword(Keyword::Asc) {
            Some(true)
        } else if self.eat_keyword(Keyword::Desc) {
            Some(false)
        } else {
            None
        };
        let nulls_first = if self.eat_keyword(Keyword::Nulls) {
            if self.eat_keyword(Keyword::First) {
                Some(true)
            } else {
                self.expect_keyword(Keyword::Last);
                Some(false)
            }
        } else {
            None
        };
        OrderingTerm {
            expr,
            ascending,
            nulls_first,
        }
    }

    fn parse_limit_clause(&mut self) -> Option<LimitClause> {
        if !self.eat_keyword(Keyword::Limit) {
            return None;
        }
        let first = self.parse_expr();
        if self.eat_keyword(Keyword::Offset) {
            let offset = self.parse_expr();
            Some(LimitClause {
                limit: first,
                offset: Some(offset),
            })
        } else if self.eat(&TokenKind::Comma) {
            // LIMIT offset, limit
            let limit = self.parse_expr();
            Some(LimitClause {
                limit,
                offset: Some(first),
            })
        } else {
            Some(LimitClause {
                limit: first,
                offset: None,
            })
        }
    }

    // ---------------------------------------------------------------- FROM

    pub(crate) fn parse_from_clause(&mut self) -> FromClause {
        // one table-or-subquery first; a following `,` continues the list,
        // anything else proceeds as a join clause
        let source = self.parse_table_or_subquery();
        let mut joins = Vec::new();
        loop {
            if self.eat(&TokenKind::Comma) {
                let source = self.parse_table_or_subquery();
                joins.push(Join {
                    op: JoinOp::Comma,
                    source,
                    constraint: None,
                });
                continue;
            }
            let Some(op) = self.parse_join_op() else {
                break;
            };
            let source = self.parse_table_or_subquery();
            let constraint = if self.eat_keyword(Keyword::On) {
                Some(JoinConstraint::On(self.parse_expr()))
            } else if self.eat_keyword(Keyword::Using) {
                self.expect(&TokenKind::LeftParen);
                let columns = self.comma_separated(|p| p.parse_identifier());
                self.expect(&TokenKind::RightParen);
                Some(JoinConstraint::Using(columns))
            } else {
                None
            };
            joins.push(Join {
                op,
                source,
                constraint,
            });
        }
        FromClause { source, joins }
    }

    fn parse_join_op(&mut self) -> Option<JoinOp> {
        if self.eat_keyword(Keyword::Join) {
            return Some(JoinOp::Inner);
        }
        if self.eat_keyword(Keyword::Inner) {
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Inner);
        }
        if self.eat_keyword(Keyword::Cross) {
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Cross);
        }
        if self.eat_keyword(Keyword::Left) {
            self.eat_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Left);
        }
        if self.eat_keyword(Keyword::Right) {
            self.eat_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Right);
        }
        if self.eat_keyword(Keyword::Full) {
            self.eat_keyword(Keyword::Outer);
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Full);
        }
        if self.at_keyword(Keyword::Natural) {
            self.bump();
            if self.eat_keyword(Keyword::Left) {
                self.eat_keyword(Keyword::Outer);
                self.expect_keyword(Keyword::Join);
                return Some(JoinOp::NaturalLeft);
            }
            self.eat_keyword(Keyword::Inner);
            self.expect_keyword(Keyword::Join);
            return Some(JoinOp::Natural);
        }
        None
    }

    fn parse_table_or_subquery(&mut self) -> TableOrSubquery {
        if self.eat(&TokenKind::LeftParen) {
            if self.at_select_start() {
                let select = self.parse_select_stmt(None);
                self.expect(&TokenKind::RightParen);
                let alias = self.parse_alias();
                return TableOrSubquery::Subquery {
                    select: Box::new(select),
                    alias,
                };
            }
            // a parenthesized table-or-subquery
            let inner = self.parse_table_or_subquery();
            self.expect(&TokenKind::RightParen);
            return inner;
        }
        let name = self.parse_qualified_name();
        if self.eat(&TokenKind::LeftParen) {
            let args = if self.at(&TokenKind::RightParen) {
                Vec::new()
            } else {
                self.comma_separated(|p| p.parse_expr())
            };
            self.expect(&TokenKind::RightParen);
            let alias = self.parse_alias();
            return TableOrSubquery::Function { name, args, alias };
        }
        let alias = self.parse_alias();
        TableOrSubquery::Table { name, alias }
    }

    // ----------------------------------------------------------------- DML

    fn parse_insert_stmt(&mut self, with: Option<WithClause>) -> InsertStmt {
        let start = self.here();
        let action = if self.eat_keyword(Keyword::Replace) {
            InsertAction::Replace
        } else {
            self.expect_keyword(Keyword::Insert);
            if self.eat_keyword(Keyword::Or) {
                if self.eat_keyword(Keyword::Abort) {
                    InsertAction::InsertOrAbort
                } else if self.eat_keyword(Keyword::Fail) {
                    InsertAction::InsertOrFail
                } else if self.eat_keyword(Keyword::Ignore) {
                    InsertAction::InsertOrIgnore
                } else if self.eat_keyword(Keyword::Replace) {
                    InsertAction::InsertOrReplace
                } else if self.eat_keyword(Keyword::Rollback) {
                    InsertAction::InsertOrRollback
                } else {
                    self.unexpected("a conflict action after OR");
                    InsertAction::Insert
                }
            } else {
                InsertAction::Insert
            }
        };
        self.expect_keyword(Keyword::Into);
        let table = self.parse_qualified_name();
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.parse_identifier())
        } else {
            None
        };
        let columns = if self.at(&TokenKind::LeftParen) {
            self.bump();
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            columns
        } else {
            Vec::new()
        };
        let source = if self.eat_keywords(&[Keyword::Default, Keyword::Values]) {
            InsertSource::DefaultValues
        } else if self.at_keyword(Keyword::Values) {
            self.bump();
            let rows = self.comma_separated(|p| {
                p.expect(&TokenKind::LeftParen);
                let row = if p.at(&TokenKind::RightParen) {
                    Vec::new()
                } else {
                    p.comma_separated(|p| p.parse_expr())
                };
                p.expect(&TokenKind::RightParen);
                row
            });
            InsertSource::Values(rows)
        } else if self.at_select_start() {
            InsertSource::Select(Box::new(self.parse_select_stmt(None)))
        } else {
            self.unexpected("VALUES, SELECT or DEFAULT VALUES");
            InsertSource::DefaultValues
        };
        let mut upsert = Vec::new();
        while self.at_keyword(Keyword::On) && self.nth_is_keyword(1, Keyword::Conflict) {
            upsert.push(self.parse_upsert_clause());
        }
        let returning = self.parse_returning();
        InsertStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            with,
            action,
            table,
            alias,
            columns,
            source,
            upsert,
            returning,
        }
    }

    fn parse_upsert_clause(&mut self) -> UpsertClause {
        self.expect_keyword(Keyword::On);
        self.expect_keyword(Keyword::Conflict);
        let (target_columns, target_where) = if self.eat(&TokenKind::LeftParen) {
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            let target_where = if self.eat_keyword(Keyword::Where) {
                Some(self.parse_expr())
            } else {
                None
            };
            (columns, target_where)
        } else {
            (Vec::new(), None)
        };
        self.expect_keyword(Keyword::Do);
        let action = if self.eat_keyword(Keyword::Nothing) {
            UpsertAction::Nothing
        } else {
            self.expect_keyword(Keyword::Update);
            self.expect_keyword(Keyword::Set);
            let sets = self.comma_separated(|p| p.parse_set_action());
            let where_clause = if self.eat_keyword(Keyword::Where) {
                Some(self.parse_expr())
            } else {
                None
            };
            UpsertAction::Update { sets, where_clause }
        };
        UpsertClause {
            target_columns,
            target_where,
            action,
        }
    }

    fn parse_set_action(&mut self) -> SetAction {
        let columns = if self.eat(&TokenKind::LeftParen) {
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            columns
        } else {
            vec![self.parse_identifier()]
        };
        self.expect(&TokenKind::Eq);
        let value = self.parse_expr();
        SetAction { columns, value }
    }

    fn parse_returning(&mut self) -> Option<Vec<ResultColumn>> {
        if self.eat_keyword(Keyword::Returning) {
            Some(self.comma_separated(|p| p.parse_result_column()))
        } else {
            None
        }
    }

    fn parse_update_stmt(&mut self, with: Option<WithClause>) -> UpdateStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Update);
        let table = self.parse_qualified_name();
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.parse_identifier())
        } else {
            None
        };
        self.expect_keyword(Keyword::Set);
        let sets = self.comma_separated(|p| p.parse_set_action());
        let from = if self.eat_keyword(Keyword::From) {
            Some(self.parse_from_clause())
        } else {
            None
        };
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr())
        } else {
            None
        };
        let returning = self.parse_returning();
        UpdateStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            with,
            table,
            alias,
            sets,
            from,
            where_clause,
            returning,
        }
    }

    fn parse_delete_stmt(&mut self, with: Option<WithClause>) -> DeleteStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Delete);
        self.expect_keyword(Keyword::From);
        let table = self.parse_qualified_name();
        let alias = if self.eat_keyword(Keyword::As) {
            Some(self.parse_identifier())
        } else {
            None
        };
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr())
        } else {
            None
        };
        let returning = self.parse_returning();
        DeleteStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            with,
            table,
            alias,
            where_clause,
            returning,
        }
    }

    // ----------------------------------------------------------------- DDL

    fn parse_create_stmt(&mut self) -> Option<StmtKind> {
        self.expect_keyword(Keyword::Create);
        // TEMP tables behave like ordinary ones for analysis
        self.eat_keyword(Keyword::Temp);
        self.eat_keyword(Keyword::Temporary);
        if self.at_keyword(Keyword::Table) {
            return Some(StmtKind::CreateTable(self.parse_create_table_stmt()));
        }
        if self.at_keyword(Keyword::Unique) || self.at_keyword(Keyword::Index) {
            return Some(StmtKind::CreateIndex(self.parse_create_index_stmt()));
        }
        if self.at_keyword(Keyword::View) {
            return Some(StmtKind::CreateView(self.parse_create_view_stmt()));
        }
        if self.at_keyword(Keyword::Virtual) {
            return Some(StmtKind::CreateVirtualTable(
                self.parse_create_virtual_table_stmt(),
            ));
        }
        self.unexpected("TABLE, INDEX, VIEW or VIRTUAL TABLE after CREATE");
        self.recover_to_statement_boundary();
        None
    }

    fn parse_if_not_exists(&mut self) -> bool {
        self.eat_keywords(&[Keyword::If, Keyword::Not, Keyword::Exists])
    }

    fn parse_create_table_stmt(&mut self) -> CreateTableStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Table);
        let if_not_exists = self.parse_if_not_exists();
        let name = self.parse_qualified_name();
        if self.eat_keyword(Keyword::As) {
            let select = self.parse_select_stmt(None);
            return CreateTableStmt {
                id: SyntaxId::fresh(),
                location: self.span_from(start),
                if_not_exists,
                name,
                body: CreateTableBody::AsSelect(Box::new(select)),
            };
        }
        self.expect(&TokenKind::LeftParen);
        let mut columns = Vec::new();
        let mut constraints = Vec::new();
        loop {
            if self.at_table_constraint_start() {
                constraints.push(self.parse_table_constraint());
            } else {
                columns.push(self.parse_column_def());
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RightParen);
        let mut options = Vec::new();
        loop {
            if self.eat_keywords(&[Keyword::Without, Keyword::Rowid]) {
                options.push(TableOption::WithoutRowid);
            } else if self.eat_keyword(Keyword::Strict) {
                options.push(TableOption::Strict);
            } else {
                break;
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        CreateTableStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            if_not_exists,
            name,
            body: CreateTableBody::Columns {
                columns,
                constraints,
                options,
            },
        }
    }

    fn at_table_constraint_start(&self) -> bool {
        matches!(
            self.peek().and_then(Token::keyword),
            Some(Keyword::Constraint)
                | Some(Keyword::Primary)
                | Some(Keyword::Unique)
                | Some(Keyword::Check)
                | Some(Keyword::Foreign)
        )
    }

    pub(crate) fn parse_column_def(&mut self) -> ColumnDef {
        let start = self.here();
        let name = self.parse_identifier();
        let type_name = match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(_),
                ..
            }) => Some(self.parse_type_name()),
            _ => None,
        };
        let mut constraints = Vec::new();
        while let Some(constraint) = self.parse_column_constraint() {
            constraints.push(constraint);
        }
        ColumnDef {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            name,
            type_name,
            constraints,
        }
    }

    fn parse_column_constraint(&mut self) -> Option<ColumnConstraint> {
        if self.eat_keyword(Keyword::Constraint) {
            let name = self.parse_identifier();
            let Some(constraint) = self.parse_column_constraint() else {
                self.unexpected("a constraint after CONSTRAINT name");
                return None;
            };
            return Some(ColumnConstraint::Named {
                name,
                constraint: Box::new(constraint),
            });
        }
        if self.eat_keyword(Keyword::Primary) {
            self.expect_keyword(Keyword::Key);
            let ascending = if self.eat_keyword(Keyword::Asc) {
                Some(true)
            } else if self.eat_keyword(Keyword::Desc) {
                Some(false)
            } else {
                None
            };
            self.parse_conflict_clause();
            let autoincrement = self.eat_keyword(Keyword::Autoincrement);
            return Some(ColumnConstraint::PrimaryKey {
                ascending,
                autoincrement,
            });
        }
        if self.eat_keywords(&[Keyword::Not, Keyword::Null]) {
            self.parse_conflict_clause();
            return Some(ColumnConstraint::NotNull);
        }
        if self.eat_keyword(Keyword::Unique) {
            self.parse_conflict_clause();
            return Some(ColumnConstraint::Unique);
        }
        if self.eat_keyword(Keyword::Check) {
            self.expect(&TokenKind::LeftParen);
            let expr = self.parse_expr();
            self.expect(&TokenKind::RightParen);
            return Some(ColumnConstraint::Check(expr));
        }
        if self.eat_keyword(Keyword::Default) {
            return Some(ColumnConstraint::Default(self.parse_default_value()));
        }
        if self.eat_keyword(Keyword::Collate) {
            return Some(ColumnConstraint::Collate(self.parse_identifier()));
        }
        if self.at_keyword(Keyword::References) {
            return Some(ColumnConstraint::ForeignKey(
                self.parse_foreign_key_clause(),
            ));
        }
        if self.at_keyword(Keyword::Generated) || self.at_keyword(Keyword::As) {
            if self.eat_keyword(Keyword::Generated) {
                // GENERATED ALWAYS AS — ALWAYS is not in the keyword table,
                // it arrives as an identifier
                if let Some(Token {
                    kind: TokenKind::Ident(word),
                    ..
                }) = self.peek()
                {
                    if word.eq_ignore_ascii_case("always") {
                        self.bump();
                    }
                }
            }
            self.expect_keyword(Keyword::As);
            self.expect(&TokenKind::LeftParen);
            let expr = self.parse_expr();
            self.expect(&TokenKind::RightParen);
            let stored = self.eat_keyword(Keyword::Stored);
            if !stored {
                self.eat_keyword(Keyword::Virtual);
            }
            return Some(ColumnConstraint::Generated { expr, stored });
        }
        None
    }

    /// `ON CONFLICT <action>` attached to a constraint. Parsed and
    /// discarded; conflict resolution is the engine's concern.
    fn parse_conflict_clause(&mut self) {
        if self.at_keyword(Keyword::On) && self.nth_is_keyword(1, Keyword::Conflict) {
            self.bump();
            self.bump();
            if !(self.eat_keyword(Keyword::Rollback)
                || self.eat_keyword(Keyword::Abort)
                || self.eat_keyword(Keyword::Fail)
                || self.eat_keyword(Keyword::Ignore)
                || self.eat_keyword(Keyword::Replace))
            {
                self.unexpected("a conflict action");
            }
        }
    }

    /// DEFAULT values are restricted: a literal, a signed number, or a
    /// parenthesized expression. A full expression parse here would
    /// swallow following constraints (`DEFAULT 1 NOT NULL`).
    fn parse_default_value(&mut self) -> Expr {
        let start = self.here();
        if self.eat(&TokenKind::LeftParen) {
            let expr = self.parse_expr();
            self.expect(&TokenKind::RightParen);
            return Expr::new(ExprKind::Grouped(Box::new(expr)), self.span_from(start));
        }
        if self.at(&TokenKind::Minus) || self.at(&TokenKind::Plus) {
            let negate = self.at(&TokenKind::Minus);
            self.bump();
            let operand = self.parse_default_value();
            return Expr::new(
                ExprKind::Unary {
                    op: if negate { UnaryOp::Negate } else { UnaryOp::Plus },
                    operand: Box::new(operand),
                },
                self.span_from(start),
            );
        }
        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Number(text),
                location,
            }) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Numeric(text)), location)
            }
            Some(Token {
                kind: TokenKind::String(text),
                location,
            }) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::String(text)), location)
            }
            Some(Token {
                kind: TokenKind::Blob(hex),
                location,
            }) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Blob(hex)), location)
            }
            Some(Token {
                kind: TokenKind::Keyword(kw),
                location,
            }) => {
                let literal = match kw {
                    Keyword::Null => Some(Literal::Null),
                    Keyword::True => Some(Literal::True),
                    Keyword::False => Some(Literal::False),
                    Keyword::CurrentTime => Some(Literal::CurrentTime),
                    Keyword::CurrentDate => Some(Literal::CurrentDate),
                    Keyword::CurrentTimestamp => Some(Literal::CurrentTimestamp),
                    _ => None,
                };
                match literal {
                    Some(literal) => {
                        self.bump();
                        Expr::new(ExprKind::Literal(literal), location)
                    }
                    None => {
                        self.unexpected("a literal DEFAULT value");
                        Expr::recovery(location)
                    }
                }
            }
            _ => {
                self.unexpected("a literal DEFAULT value");
                Expr::recovery(start)
            }
        }
    }

    fn parse_foreign_key_clause(&mut self) -> ForeignKeyClause {
        self.expect_keyword(Keyword::References);
        let table = self.parse_identifier();
        let columns = if self.eat(&TokenKind::LeftParen) {
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            columns
        } else {
            Vec::new()
        };
        let mut actions = Vec::new();
        while self.at_keyword(Keyword::On) {
            self.bump();
            let trigger = if self.eat_keyword(Keyword::Delete) {
                FkTrigger::OnDelete
            } else {
                self.expect_keyword(Keyword::Update);
                FkTrigger::OnUpdate
            };
            let action = if self.eat_keywords(&[Keyword::Set, Keyword::Null]) {
                FkAction::SetNull
            } else if self.eat_keywords(&[Keyword::Set, Keyword::Default]) {
                FkAction::SetDefault
            } else if self.eat_keyword(Keyword::Cascade) {
                FkAction::Cascade
            } else if self.eat_keyword(Keyword::Restrict) {
                FkAction::Restrict
            } else if self.eat_keywords(&[Keyword::No, Keyword::Action]) {
                FkAction::NoAction
            } else {
                self.unexpected("a foreign key action");
                FkAction::NoAction
            };
            actions.push((trigger, action));
        }
        ForeignKeyClause {
            table,
            columns,
            actions,
        }
    }

    fn parse_table_constraint(&mut self) -> TableConstraint {
        if self.eat_keyword(Keyword::Constraint) {
            let name = self.parse_identifier();
            let constraint = self.parse_table_constraint();
            return TableConstraint::Named {
                name,
                constraint: Box::new(constraint),
            };
        }
        if self.eat_keyword(Keyword::Primary) {
            self.expect_keyword(Keyword::Key);
            self.expect(&TokenKind::LeftParen);
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            self.parse_conflict_clause();
            return TableConstraint::PrimaryKey(columns);
        }
        if self.eat_keyword(Keyword::Unique) {
            self.expect(&TokenKind::LeftParen);
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            self.parse_conflict_clause();
            return TableConstraint::Unique(columns);
        }
        if self.eat_keyword(Keyword::Check) {
            self.expect(&TokenKind::LeftParen);
            let expr = self.parse_expr();
            self.expect(&TokenKind::RightParen);
            return TableConstraint::Check(expr);
        }
        self.expect_keyword(Keyword::Foreign);
        self.expect_keyword(Keyword::Key);
        self.expect(&TokenKind::LeftParen);
        let columns = self.comma_separated(|p| p.parse_identifier());
        self.expect(&TokenKind::RightParen);
        let clause = self.parse_foreign_key_clause();
        TableConstraint::ForeignKey { columns, clause }
    }

    fn parse_alter_table_stmt(&mut self) -> AlterTableStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Alter);
        self.expect_keyword(Keyword::Table);
        let table = self.parse_qualified_name();
        let action = if self.eat_keyword(Keyword::Rename) {
            if self.eat_keyword(Keyword::To) {
                AlterAction::RenameTo(self.parse_identifier())
            } else {
                self.eat_keyword(Keyword::Column);
                let old = self.parse_identifier();
                self.expect_keyword(Keyword::To);
                let new = self.parse_identifier();
                AlterAction::RenameColumn { old, new }
            }
        } else if self.eat_keyword(Keyword::Add) {
            self.eat_keyword(Keyword::Column);
            AlterAction::AddColumn(self.parse_column_def())
        } else if self.eat_keyword(Keyword::Drop) {
            self.eat_keyword(Keyword::Column);
            AlterAction::DropColumn(self.parse_identifier())
        } else {
            self.unexpected("RENAME, ADD or DROP");
            AlterAction::DropColumn(Ident::recovery(self.here()))
        };
        AlterTableStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            table,
            action,
        }
    }

    fn parse_drop_table_stmt(&mut self) -> Option<DropTableStmt> {
        let start = self.here();
        self.expect_keyword(Keyword::Drop);
        if !self.eat_keyword(Keyword::Table) {
            self.unexpected("TABLE after DROP");
            self.recover_to_statement_boundary();
            return None;
        }
        let if_exists = self.eat_keywords(&[Keyword::If, Keyword::Exists]);
        let name = self.parse_qualified_name();
        Some(DropTableStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            if_exists,
            name,
        })
    }

    fn parse_create_index_stmt(&mut self) -> CreateIndexStmt {
        let start = self.here();
        let unique = self.eat_keyword(Keyword::Unique);
        self.expect_keyword(Keyword::Index);
        let if_not_exists = self.parse_if_not_exists();
        let name = self.parse_qualified_name();
        self.expect_keyword(Keyword::On);
        let table = self.parse_identifier();
        self.expect(&TokenKind::LeftParen);
        let columns = self.comma_separated(|p| p.parse_ordering_term());
        self.expect(&TokenKind::RightParen);
        let where_clause = if self.eat_keyword(Keyword::Where) {
            Some(self.parse_expr())
        } else {
            None
        };
        CreateIndexStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            unique,
            if_not_exists,
            name,
            table,
            columns,
            where_clause,
        }
    }

    fn parse_create_view_stmt(&mut self) -> CreateViewStmt {
        let start = self.here();
        self.expect_keyword(Keyword::View);
        let if_not_exists = self.parse_if_not_exists();
        let name = self.parse_qualified_name();
        let columns = if self.eat(&TokenKind::LeftParen) {
            let columns = self.comma_separated(|p| p.parse_identifier());
            self.expect(&TokenKind::RightParen);
            columns
        } else {
            Vec::new()
        };
        self.expect_keyword(Keyword::As);
        let select = self.parse_select_stmt(None);
        CreateViewStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            if_not_exists,
            name,
            columns,
            select: Box::new(select),
        }
    }

    fn parse_create_virtual_table_stmt(&mut self) -> CreateVirtualTableStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Virtual);
        self.expect_keyword(Keyword::Table);
        let if_not_exists = self.parse_if_not_exists();
        let name = self.parse_qualified_name();
        self.expect_keyword(Keyword::Using);
        let module = self.parse_identifier();
        let mut args = Vec::new();
        if self.eat(&TokenKind::LeftParen) {
            if !self.at(&TokenKind::RightParen) {
                args = self.comma_separated(|p| p.parse_virtual_table_arg());
            }
            self.expect(&TokenKind::RightParen);
        }
        CreateVirtualTableStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            if_not_exists,
            name,
            module,
            args,
        }
    }

    /// fts5-style module arguments: a column definition with an optional
    /// `UNINDEXED`, or a `key = value` module option.
    fn parse_virtual_table_arg(&mut self) -> VirtualTableArg {
        let key = self.parse_identifier();
        if self.eat(&TokenKind::Eq) {
            let value = match self.peek().cloned() {
                Some(Token {
                    kind: TokenKind::String(text),
                    ..
                }) => {
                    self.bump();
                    format!("'{text}'")
                }
                Some(Token {
                    kind: TokenKind::Number(text),
                    ..
                }) => {
                    self.bump();
                    text
                }
                Some(Token {
                    kind: TokenKind::Ident(text),
                    ..
                }) => {
                    self.bump();
                    text
                }
                _ => {
                    self.unexpected("a module option value");
                    String::new()
                }
            };
            return VirtualTableArg::Option { key, value };
        }
        let unindexed = self.eat_keyword(Keyword::Unindexed);
        VirtualTableArg::Column {
            name: key,
            unindexed,
        }
    }

    // --------------------------------------------------- PRAGMA and friends

    fn parse_pragma_stmt(&mut self) -> PragmaStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Pragma);
        let name = self.parse_qualified_name();
        let (value, call_form) = if self.eat(&TokenKind::Eq) {
            (Some(self.parse_pragma_value()), false)
        } else if self.eat(&TokenKind::LeftParen) {
            let value = self.parse_pragma_value();
            self.expect(&TokenKind::RightParen);
            (Some(value), true)
        } else {
            (None, false)
        };
        PragmaStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            name,
            value,
            call_form,
        }
    }

    /// Pragma values are loose: numbers, names and a handful of keywords.
    fn parse_pragma_value(&mut self) -> Expr {
        let start = self.here();
        if self.at(&TokenKind::Minus) || self.at(&TokenKind::Plus) {
            return self.parse_subexpr(super::expr::PREC_UNARY);
        }
        match self.peek().cloned() {
            Some(Token {
                kind: TokenKind::Number(text),
                location,
            }) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::Numeric(text)), location)
            }
            Some(Token {
                kind: TokenKind::String(text),
                location,
            }) => {
                self.bump();
                Expr::new(ExprKind::Literal(Literal::String(text)), location)
            }
            Some(Token {
                kind: TokenKind::Keyword(kw),
                location,
            }) => {
                // ON, DELETE, FULL and similar all appear as pragma values
                self.bump();
                Expr::new(
                    ExprKind::Column(ColumnRef {
                        schema: None,
                        table: None,
                        column: Ident::new(kw.as_str().to_ascii_lowercase(), location),
                    }),
                    location,
                )
            }
            _ => {
                let column = self.parse_identifier();
                let location = self.span_from(start);
                Expr::new(
                    ExprKind::Column(ColumnRef {
                        schema: None,
                        table: None,
                        column,
                    }),
                    location,
                )
            }
        }
    }

    fn parse_reindex_stmt(&mut self) -> ReindexStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Reindex);
        let target = match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(_),
                ..
            }) => Some(self.parse_qualified_name()),
            _ => None,
        };
        ReindexStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            target,
        }
    }

    fn parse_begin_stmt(&mut self) -> BeginStmt {
        let start = self.here();
        self.expect_keyword(Keyword::Begin);
        let behavior = if self.eat_keyword(Keyword::Deferred) {
            Some(TransactionBehavior::Deferred)
        } else if self.eat_keyword(Keyword::Immediate) {
            Some(TransactionBehavior::Immediate)
        } else if self.eat_keyword(Keyword::Exclusive) {
            Some(TransactionBehavior::Exclusive)
        } else {
            None
        };
        self.eat_keyword(Keyword::Transaction);
        BeginStmt {
            id: SyntaxId::fresh(),
            location: self.span_from(start),
            behavior,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::{parse_sql, parse_statement};
    use crate::ast::*;
    use crate::diag::DiagnosticKind;

    fn parse_ok(source: &str) -> Stmt {
        let (stmt, diagnostics) = parse_statement(source);
        assert!(
            diagnostics.is_empty(),
            "unexpected diagnostics for {source:?}: {diagnostics:?}"
        );
        stmt.expect("statement")
    }

    fn select_core(stmt: &Stmt) -> &SelectCore {
        match &stmt.kind {
            StmtKind::Select(select) => &select.body.first,
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn statement_location_covers_the_source() {
        let source = "SELECT a, b FROM t WHERE a = 1";
        let stmt = parse_ok(source);
        assert_eq!(stmt.location.slice(source), source);
    }

    #[test]
    fn between_binds_tighter_than_and() {
        let stmt = parse_ok("SELECT 1 WHERE 5 BETWEEN 1 AND 10");
        let SelectCore::Select { where_clause, .. } = select_core(&stmt) else {
            panic!()
        };
        let where_clause = where_clause.as_ref().unwrap();
        // the tree is between(5, 1, 10), not between(5, (1 AND 10))
        let ExprKind::Between { low, high, .. } = &where_clause.kind else {
            panic!("expected BETWEEN, got {where_clause:?}");
        };
        assert!(matches!(&low.kind, ExprKind::Literal(Literal::Numeric(n)) if n == "1"));
        assert!(matches!(&high.kind, ExprKind::Literal(Literal::Numeric(n)) if n == "10"));
    }

    #[test]
    fn between_composes_with_and() {
        let stmt = parse_ok("SELECT 1 WHERE a BETWEEN 1 AND 10 AND b");
        let SelectCore::Select { where_clause, .. } = select_core(&stmt) else {
            panic!()
        };
        let ExprKind::Binary { op, left, .. } = &where_clause.as_ref().unwrap().kind else {
            panic!()
        };
        assert_eq!(*op, BinaryOp::And);
        assert!(matches!(left.kind, ExprKind::Between { .. }));
    }

    #[test]
    fn is_not_distinct_from_resolves() {
        let stmt = parse_ok("SELECT a IS NOT DISTINCT FROM b");
        let SelectCore::Select { columns, .. } = select_core(&stmt) else {
            panic!()
        };
        let ResultColumn::Expr { expr, .. } = &columns[0] else {
            panic!()
        };
        let ExprKind::Binary { op, .. } = &expr.kind else {
            panic!("got {expr:?}")
        };
        assert_eq!(*op, BinaryOp::IsNotDistinctFrom);
    }

    #[test]
    fn not_like_negates() {
        let stmt = parse_ok("SELECT a NOT LIKE 'x%' ESCAPE '\\'");
        let SelectCore::Select { columns, .. } = select_core(&stmt) else {
            panic!()
        };
        let ResultColumn::Expr { expr, .. } = &columns[0] else {
            panic!()
        };
        let ExprKind::Like {
            negated, escape, op, ..
        } = &expr.kind
        else {
            panic!("got {expr:?}")
        };
        assert!(*negated);
        assert_eq!(*op, LikeOp::Like);
        assert!(escape.is_some());
    }

    #[test]
    fn precedence_concat_over_comparison() {
        let stmt = parse_ok("SELECT 'a' || 'b' = 'ab'");
        let SelectCore::Select { columns, .. } = select_core(&stmt) else {
            panic!()
        };
        let ResultColumn::Expr { expr, .. } = &columns[0] else {
            panic!()
        };
        // (('a' || 'b') = 'ab')
        let ExprKind::Binary { op, left, .. } = &expr.kind else {
            panic!()
        };
        assert_eq!(*op, BinaryOp::Eq);
        assert!(
            matches!(&left.kind, ExprKind::Binary { op: BinaryOp::Concat, .. }),
            "got {left:?}"
        );
    }

    #[test]
    fn table_list_vs_join_disambiguation() {
        let stmt = parse_ok("SELECT 1 FROM a, b JOIN c ON c.x = b.x, d");
        let SelectCore::Select { from, .. } = select_core(&stmt) else {
            panic!()
        };
        let from = from.as_ref().unwrap();
        let ops: Vec<JoinOp> = from.joins.iter().map(|j| j.op).collect();
        assert_eq!(ops, vec![JoinOp::Comma, JoinOp::Inner, JoinOp::Comma]);
    }

    #[test]
    fn insert_with_upsert_and_returning() {
        let stmt = parse_ok(
            "INSERT INTO t (a, b) VALUES (1, :b) \
             ON CONFLICT (a) DO UPDATE SET b = excluded.b WHERE t.a > 1 \
             RETURNING a AS id",
        );
        let StmtKind::Insert(insert) = &stmt.kind else {
            panic!()
        };
        assert_eq!(insert.columns.len(), 2);
        assert_eq!(insert.upsert.len(), 1);
        assert!(matches!(
            insert.upsert[0].action,
            UpsertAction::Update { .. }
        ));
        assert_eq!(insert.returning.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn create_table_collects_constraints_and_options() {
        let stmt = parse_ok(
            "CREATE TABLE t (\
               id INTEGER PRIMARY KEY AUTOINCREMENT, \
               name TEXT NOT NULL DEFAULT 'x', \
               team INTEGER REFERENCES teams (id) ON DELETE CASCADE, \
               UNIQUE (name), \
               CHECK (id > 0)\
             ) STRICT",
        );
        let StmtKind::CreateTable(create) = &stmt.kind else {
            panic!()
        };
        let CreateTableBody::Columns {
            columns,
            constraints,
            options,
        } = &create.body
        else {
            panic!()
        };
        assert_eq!(columns.len(), 3);
        assert_eq!(constraints.len(), 2);
        assert_eq!(options, &vec![TableOption::Strict]);
        assert!(matches!(
            columns[0].constraints[0],
            ColumnConstraint::PrimaryKey {
                autoincrement: true,
                ..
            }
        ));
    }

    #[test]
    fn create_virtual_table_fts5() {
        let stmt = parse_ok(
            "CREATE VIRTUAL TABLE notes USING fts5(title, body, meta UNINDEXED, tokenize = 'porter')",
        );
        let StmtKind::CreateVirtualTable(vtab) = &stmt.kind else {
            panic!()
        };
        assert!(vtab.module.eq_ignore_case("fts5"));
        assert_eq!(vtab.args.len(), 4);
        assert!(matches!(
            &vtab.args[2],
            VirtualTableArg::Column { unindexed: true, .. }
        ));
        assert!(matches!(&vtab.args[3], VirtualTableArg::Option { .. }));
    }

    #[test]
    fn with_recursive_cte() {
        let stmt = parse_ok(
            "WITH RECURSIVE cnt(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM cnt LIMIT 5) \
             SELECT x FROM cnt",
        );
        let StmtKind::Select(select) = &stmt.kind else {
            panic!()
        };
        let with = select.with.as_ref().unwrap();
        assert!(with.recursive);
        assert_eq!(with.ctes[0].columns.len(), 1);
    }

    #[test]
    fn recovery_synthesizes_error_node_and_resyncs() {
        let (stmts, diagnostics) = parse_sql("SELECT FROM t; SELECT 2");
        // first statement has a recovery column, second parses clean
        assert_eq!(stmts.len(), 2);
        assert!(diagnostics.contains_kind(DiagnosticKind::UnexpectedToken));
        let SelectCore::Select { columns, .. } = (match &stmts[0].kind {
            StmtKind::Select(s) => &s.body.first,
            _ => panic!(),
        }) else {
            panic!()
        };
        let ResultColumn::Expr { expr, .. } = &columns[0] else {
            panic!()
        };
        let ExprKind::Column(col) = &expr.kind else {
            panic!()
        };
        assert!(col.column.is_recovery());
    }

    #[test]
    fn garbage_statement_recovers_at_semicolon() {
        let (stmts, diagnostics) = parse_sql("17 23; SELECT 1");
        assert_eq!(stmts.len(), 1);
        assert!(!diagnostics.is_empty());
    }

    #[test]
    fn display_round_trips_semantically() {
        for source in [
            "SELECT a, b AS x FROM t LEFT JOIN u ON u.a = t.a WHERE a = :x ORDER BY b DESC LIMIT 10",
            "INSERT INTO t (a) VALUES (1) ON CONFLICT (a) DO NOTHING RETURNING a",
            "UPDATE t SET a = a + 1 WHERE b ISNULL",
            "DELETE FROM t WHERE a IN (SELECT a FROM u)",
            "SELECT CASE WHEN a > 0 THEN 'pos' ELSE 'neg' END FROM t",
            "SELECT CAST(a AS TEXT) FROM t WHERE a BETWEEN 1 AND 10",
        ] {
            let first = parse_ok(source);
            let printed = first.to_string();
            let second = parse_ok(&printed);
            let reprinted = second.to_string();
            assert_eq!(printed, reprinted, "unstable print for {source:?}");
        }
    }

    #[test]
    fn pragma_forms() {
        let stmt = parse_ok("PRAGMA journal_mode = WAL");
        let StmtKind::Pragma(pragma) = &stmt.kind else {
            panic!()
        };
        assert!(!pragma.call_form);
        assert!(pragma.value.is_some());
        let stmt = parse_ok("PRAGMA foreign_keys(ON)");
        let StmtKind::Pragma(pragma) = &stmt.kind else {
            panic!()
        };
        assert!(pragma.call_form);
    }

    #[test]
    fn transaction_control() {
        assert!(matches!(
            parse_ok("BEGIN IMMEDIATE").kind,
            StmtKind::Begin(BeginStmt {
                behavior: Some(TransactionBehavior::Immediate),
                ..
            })
        ));
        assert!(matches!(parse_ok("COMMIT").kind, StmtKind::Commit));
        assert!(matches!(parse_ok("ROLLBACK").kind, StmtKind::Rollback));
    }
}
