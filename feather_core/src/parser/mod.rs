//! The SQL parser: recursive descent for statements, a Pratt climber for
//! expressions.
//!
//! Parsing never aborts on bad input. Unexpected tokens record a
//! diagnostic, synthesize a recovery node (an `<<error>>` identifier) and
//! resynchronize to the nearest statement terminator or clause follow-set
//! member. Every produced node carries the byte range of the text it was
//! parsed from.

mod expr;
mod stmt;

use crate::ast::{Ident, QualifiedName, SignedNumber, Stmt, TypeName};
use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::keyword::Keyword;
use crate::lexer;
use crate::token::{Token, TokenKind};
use crate::SourceLocation;

/// Lex and parse a sequence of statements.
pub fn parse_sql(source: &str) -> (Vec<Stmt>, Diagnostics) {
    let (tokens, diagnostics) = lexer::tokenize(source);
    Parser::new(tokens, diagnostics).parse_statements()
}

/// Lex and parse a single statement; trailing input is a diagnostic.
pub fn parse_statement(source: &str) -> (Option<Stmt>, Diagnostics) {
    let (stmts, mut diagnostics) = parse_sql(source);
    if stmts.len() > 1 {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            "Expected a single statement",
            stmts[1].location,
        ));
    }
    (stmts.into_iter().next(), diagnostics)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, diagnostics: Diagnostics) -> Self {
        Parser {
            tokens,
            pos: 0,
            diagnostics,
        }
    }

    /// Parse statements until the token stream is exhausted.
    pub fn parse_statements(mut self) -> (Vec<Stmt>, Diagnostics) {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            if self.eat(&TokenKind::Semicolon) {
                continue;
            }
            let before = self.pos;
            if let Some(stmt) = self.parse_stmt() {
                stmts.push(stmt);
                // a statement must end at `;` or end of input
                if self.peek().is_some() && !self.at(&TokenKind::Semicolon) {
                    let location = self.here();
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::UnexpectedToken,
                        format!(
                            "Expected ';', found {}",
                            self.peek().map(|t| t.kind.describe()).unwrap_or_default()
                        ),
                        location,
                    ));
                    self.recover_to_statement_boundary();
                } else {
                    self.eat(&TokenKind::Semicolon);
                }
            }
            if self.pos == before {
                // no production consumed anything; skip a token to make progress
                self.bump();
            }
        }
        (stmts, self.diagnostics)
    }

    // ------------------------------------------------------- token access

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Bounded lookahead used by the multi-word operator guess.
    pub(crate) fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n)
    }

    pub(crate) fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// The location of the next token, or an empty range at the end of the
    /// input.
    pub(crate) fn here(&self) -> SourceLocation {
        match self.peek() {
            Some(token) => token.location,
            None => self
                .tokens
                .last()
                .map(|t| SourceLocation::new(t.location.end, t.location.end))
                .unwrap_or_default(),
        }
    }

    /// The location of the most recently consumed token.
    pub(crate) fn prev_location(&self) -> SourceLocation {
        if self.pos == 0 {
            return self.here();
        }
        self.tokens[self.pos - 1].location
    }

    /// The range from `start` through the last consumed token.
    pub(crate) fn span_from(&self, start: SourceLocation) -> SourceLocation {
        start.spanning(&self.prev_location())
    }

    pub(crate) fn at(&self, kind: &TokenKind) -> bool {
        self.peek().map(|t| &t.kind == kind).unwrap_or(false)
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn at_keyword(&self, kw: Keyword) -> bool {
        self.peek().map(|t| t.is_keyword(kw)).unwrap_or(false)
    }

    pub(crate) fn nth_is_keyword(&self, n: usize, kw: Keyword) -> bool {
        self.peek_nth(n).map(|t| t.is_keyword(kw)).unwrap_or(false)
    }

    pub(crate) fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a run of keywords if and only if all of them are present.
    pub(crate) fn eat_keywords(&mut self, kws: &[Keyword]) -> bool {
        for (i, kw) in kws.iter().enumerate() {
            if !self.nth_is_keyword(i, *kw) {
                return false;
            }
        }
        self.pos += kws.len();
        true
    }

    // ------------------------------------------------------- diagnostics

    pub(crate) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Record an unexpected-token diagnostic naming what was expected.
    pub(crate) fn unexpected(&mut self, expected: &str) {
        let found = self
            .peek()
            .map(|t| t.kind.describe())
            .unwrap_or_else(|| "end of input".to_string());
        let location = self.here();
        self.diagnostics.push(Diagnostic::new(
            DiagnosticKind::UnexpectedToken,
            format!("Expected {expected}, found {found}"),
            location,
        ));
    }

    /// Require a keyword. On mismatch a diagnostic is recorded and nothing
    /// is consumed.
    pub(crate) fn expect_keyword(&mut self, kw: Keyword) {
        if !self.eat_keyword(kw) {
            self.unexpected(&format!("'{kw}'"));
        }
    }

    /// Require a punctuation token. On mismatch a diagnostic is recorded
    /// and nothing is consumed.
    pub(crate) fn expect(&mut self, kind: &TokenKind) {
        if !self.eat(kind) {
            self.unexpected(&format!("'{kind}'"));
        }
    }

    /// Skip tokens through the next statement terminator.
    pub(crate) fn recover_to_statement_boundary(&mut self) {
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::Semicolon {
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }

    /// True when the next token belongs to the clause follow set used for
    /// expression recovery.
    pub(crate) fn at_follow_set(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => match &token.kind {
                TokenKind::Semicolon | TokenKind::RightParen | TokenKind::Comma => true,
                TokenKind::Keyword(kw) => matches!(
                    kw,
                    Keyword::From
                        | Keyword::Where
                        | Keyword::Group
                        | Keyword::Order
                        | Keyword::Limit
                ),
                _ => false,
            },
        }
    }

    // -------------------------------------------------------- primitives

    /// Parse an identifier. Bare identifiers, quoted identifiers and
    /// non-reserved keywords are all accepted; anything else records a
    /// diagnostic and yields the `<<error>>` recovery identifier.
    pub(crate) fn parse_identifier(&mut self) -> Ident {
        match self.peek() {
            Some(token) => match &token.kind {
                TokenKind::Ident(_) => {
                    let token = self.bump().expect("peeked");
                    let TokenKind::Ident(value) = token.kind else {
                        unreachable!()
                    };
                    Ident::new(value, token.location)
                }
                TokenKind::Keyword(kw) if kw.non_reserved() => {
                    let text = kw.as_str().to_ascii_lowercase();
                    let token = self.bump().expect("peeked");
                    Ident::new(text, token.location)
                }
                TokenKind::String(value) => {
                    // single-quoted names appear in legacy schemas; accept
                    // them but keep the diagnostic
                    let value = value.clone();
                    let location = token.location;
                    self.push_diagnostic(Diagnostic::new(
                        DiagnosticKind::ExpectedSymbol,
                        "Identifiers should be bare or double-quoted",
                        location,
                    ));
                    self.bump();
                    Ident::quoted(value, location)
                }
                _ => {
                    self.unexpected("an identifier");
                    let location = self.here();
                    if !self.at_follow_set() {
                        self.bump();
                    }
                    Ident::recovery(location)
                }
            },
            None => {
                self.unexpected("an identifier");
                Ident::recovery(self.here())
            }
        }
    }

    /// Parse `name` or `schema.name`.
    pub(crate) fn parse_qualified_name(&mut self) -> QualifiedName {
        let first = self.parse_identifier();
        if self.eat(&TokenKind::Period) {
            let name = self.parse_identifier();
            QualifiedName::new(Some(first), name)
        } else {
            QualifiedName::new(None, first)
        }
    }

    /// Parse a declared column type: one or more name words plus up to two
    /// signed-number arguments.
    pub(crate) fn parse_type_name(&mut self) -> TypeName {
        let start = self.here();
        let mut words: Vec<String> = Vec::new();
        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Ident(word) => {
                    words.push(word.clone());
                    self.bump();
                }
                TokenKind::Keyword(kw) if kw.non_reserved() => {
                    words.push(kw.as_str().to_ascii_lowercase());
                    self.bump();
                }
                _ => break,
            }
        }
        if words.is_empty() {
            self.push_diagnostic(Diagnostic::new(
                DiagnosticKind::ExpectedSymbol,
                "Expected a type name",
                start,
            ));
            return TypeName::new(crate::ast::RECOVERY_IDENT, start);
        }
        let mut ty = TypeName::new(words.join(" "), start);
        if self.eat(&TokenKind::LeftParen) {
            loop {
                match self.parse_signed_number() {
                    Some(number) => ty.args.push(number),
                    None => break,
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RightParen);
            if ty.args.len() > 2 {
                self.push_diagnostic(Diagnostic::new(
                    DiagnosticKind::ExpectedNumeric,
                    "Type names take at most two numeric arguments",
                    self.span_from(start),
                ));
                ty.args.truncate(2);
            }
        }
        ty.location = self.span_from(start);
        ty
    }

    pub(crate) fn parse_signed_number(&mut self) -> Option<SignedNumber> {
        let negative = if self.eat(&TokenKind::Minus) {
            true
        } else {
            self.eat(&TokenKind::Plus);
            false
        };
        match self.peek() {
            Some(Token {
                kind: TokenKind::Number(digits),
                ..
            }) => {
                let digits = digits.clone();
                self.bump();
                Some(SignedNumber { negative, digits })
            }
            _ => {
                self.push_diagnostic(Diagnostic::new(
                    DiagnosticKind::ExpectedNumeric,
                    "Expected a numeric literal",
                    self.here(),
                ));
                None
            }
        }
    }

    /// Parse a comma-separated list of one or more items.
    pub(crate) fn comma_separated<T>(&mut self, mut f: impl FnMut(&mut Parser) -> T) -> Vec<T> {
        let mut items = vec![f(self)];
        while self.eat(&TokenKind::Comma) {
            items.push(f(self));
        }
        items
    }
}
