//! The SQL lexer.
//!
//! A single pass over the source text with two-character lookahead.
//! Whitespace and comments are skipped but every token carries the exact
//! byte range it came from, so the token stream re-concatenates to the
//! original input. Lexing never loses its place: unterminated strings and
//! unknown characters record a diagnostic and surface as
//! [`TokenKind::Invalid`] tokens.

use crate::diag::{Diagnostic, DiagnosticKind, Diagnostics, FixIt};
use crate::keyword::Keyword;
use crate::token::{Token, TokenKind};
use crate::SourceLocation;

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            pos: 0,
            line: 1,
            column: 1,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Start lexing at an arbitrary byte offset. Line and column are
    /// recovered by scanning the prefix, so restarting is equivalent to
    /// lexing from the beginning and discarding earlier tokens.
    pub fn new_at(source: &'a str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let prefix = &source[..offset];
        let line = prefix.bytes().filter(|b| *b == b'\n').count() as u32 + 1;
        let column = prefix
            .rfind('\n')
            .map(|nl| prefix[nl + 1..].chars().count() as u32 + 1)
            .unwrap_or(prefix.chars().count() as u32 + 1);
        Lexer {
            source,
            pos: offset,
            line,
            column,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Tokenizes the whole input, returning the tokens alongside any
    /// diagnostics recorded on the way.
    pub fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        (tokens, self.diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.bump();
        }
    }

    fn location_from(&self, mark: Mark) -> SourceLocation {
        SourceLocation::with_position(mark.pos, self.pos, mark.line, mark.column)
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn diagnostic(&mut self, kind: DiagnosticKind, message: impl Into<String>, mark: Mark) {
        let location = self.location_from(mark);
        self.diagnostics.push(Diagnostic::new(kind, message, location));
    }

    /// Produces the next token, skipping whitespace and comments. `None`
    /// means end of input.
    pub fn next_token(&mut self) -> Option<Token> {
        self.skip_trivia();
        let mark = self.mark();
        let ch = self.peek()?;
        let kind = match ch {
            // blob literal or identifier starting with x
            'x' | 'X' if self.peek2() == Some('\'') => self.lex_blob(mark),
            c if is_ident_start(c) => self.lex_word(),
            '"' => self.lex_quoted_ident(mark),
            '\'' => self.lex_string(mark),
            c if c.is_ascii_digit() => self.lex_number(mark),
            '.' if self.peek2().is_some_and(|c| c.is_ascii_digit()) => self.lex_number(mark),
            '?' | ':' | '@' | '$' => self.lex_placeholder(mark),
            _ => self.lex_symbol(mark),
        };
        Some(Token::new(kind, self.location_from(mark)))
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('-') if self.peek2() == Some('-') => {
                    self.eat_while(|c| c != '\n');
                }
                Some('/') if self.peek2() == Some('*') => {
                    let mark = self.mark();
                    self.bump();
                    self.bump();
                    let mut depth = 1u32;
                    loop {
                        match self.peek() {
                            None => {
                                self.diagnostic(
                                    DiagnosticKind::UnterminatedBlockComment,
                                    "Unterminated block comment",
                                    mark,
                                );
                                break;
                            }
                            Some('*') if self.peek2() == Some('/') => {
                                self.bump();
                                self.bump();
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            Some('/') if self.peek2() == Some('*') => {
                                self.bump();
                                self.bump();
                                depth += 1;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        self.eat_while(is_ident_part);
        let word = &self.source[start..self.pos];
        match Keyword::lookup(word) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(word.to_string()),
        }
    }

    fn lex_quoted_ident(&mut self, mark: Mark) -> TokenKind {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    self.diagnostic(
                        DiagnosticKind::UnterminatedString,
                        "Unterminated quoted identifier",
                        mark,
                    );
                    return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
                }
                Some('"') => {
                    if self.bump_if('"') {
                        value.push('"');
                    } else {
                        return TokenKind::Ident(value);
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn lex_string(&mut self, mark: Mark) -> TokenKind {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    let location = self.location_from(mark);
                    self.diagnostics.push(
                        Diagnostic::new(
                            DiagnosticKind::UnterminatedString,
                            "Unterminated string literal",
                            location,
                        )
                        .with_fixit(FixIt::Append {
                            location,
                            text: "'".to_string(),
                        }),
                    );
                    return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
                }
                Some('\'') => {
                    if self.bump_if('\'') {
                        value.push('\'');
                    } else {
                        return TokenKind::String(value);
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn lex_blob(&mut self, mark: Mark) -> TokenKind {
        self.bump(); // x
        self.bump(); // opening quote
        let digits_start = self.pos;
        self.eat_while(|c| c != '\'');
        let digits = self.source[digits_start..self.pos].to_string();
        if !self.bump_if('\'') {
            self.diagnostic(
                DiagnosticKind::UnterminatedString,
                "Unterminated blob literal",
                mark,
            );
            return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
        }
        if digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            self.diagnostic(
                DiagnosticKind::MalformedBlobLiteral,
                "Blob literal requires an even number of hex digits",
                mark,
            );
            return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
        }
        TokenKind::Blob(digits)
    }

    fn lex_number(&mut self, mark: Mark) -> TokenKind {
        // hexadecimal
        if self.peek() == Some('0') && matches!(self.peek2(), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            self.eat_while(|c| c.is_ascii_hexdigit());
            if self.pos == digits_start {
                self.diagnostic(
                    DiagnosticKind::InvalidNumber,
                    "Hexadecimal literal requires at least one digit",
                    mark,
                );
                return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
            }
            return TokenKind::Number(self.source[mark.pos..self.pos].to_string());
        }

        self.eat_while(|c| c.is_ascii_digit());
        if self.bump_if('.') {
            let frac_start = self.pos;
            self.eat_while(|c| c.is_ascii_digit());
            if self.pos == frac_start {
                self.diagnostic(
                    DiagnosticKind::InvalidNumber,
                    "Decimal literal requires a digit after the point",
                    mark,
                );
                return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let exp_mark = self.mark();
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            let exp_start = self.pos;
            self.eat_while(|c| c.is_ascii_digit());
            if self.pos == exp_start {
                self.diagnostic(
                    DiagnosticKind::InvalidNumber,
                    "Exponent requires at least one digit",
                    exp_mark,
                );
                return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
            }
        }
        TokenKind::Number(self.source[mark.pos..self.pos].to_string())
    }

    fn lex_placeholder(&mut self, mark: Mark) -> TokenKind {
        let sigil = self.bump().expect("caller peeked");
        if sigil == '?' {
            self.eat_while(|c| c.is_ascii_digit());
            return TokenKind::Placeholder(self.source[mark.pos..self.pos].to_string());
        }
        let name_start = self.pos;
        self.eat_while(is_ident_part);
        if self.pos == name_start {
            self.diagnostic(
                DiagnosticKind::InvalidCharacter,
                format!("Bind parameter sigil '{sigil}' requires a name"),
                mark,
            );
            return TokenKind::Invalid(self.source[mark.pos..self.pos].to_string());
        }
        TokenKind::Placeholder(self.source[mark.pos..self.pos].to_string())
    }

    fn lex_symbol(&mut self, mark: Mark) -> TokenKind {
        let ch = self.bump().expect("caller peeked");
        match ch {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '.' => TokenKind::Period,
            '+' => TokenKind::Plus,
            '-' => {
                if self.bump_if('>') {
                    if self.bump_if('>') {
                        TokenKind::LongArrow
                    } else {
                        TokenKind::Arrow
                    }
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '&' => TokenKind::Ampersand,
            '|' => {
                if self.bump_if('|') {
                    TokenKind::Concat
                } else {
                    TokenKind::Pipe
                }
            }
            '~' => TokenKind::Tilde,
            '<' => {
                if self.bump_if('=') {
                    TokenKind::LtEq
                } else if self.bump_if('<') {
                    TokenKind::LtLt
                } else if self.bump_if('>') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.bump_if('=') {
                    TokenKind::GtEq
                } else if self.bump_if('>') {
                    TokenKind::GtGt
                } else {
                    TokenKind::Gt
                }
            }
            '=' => {
                if self.bump_if('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            '!' => {
                if self.bump_if('=') {
                    TokenKind::NotEq
                } else {
                    self.diagnostic(
                        DiagnosticKind::InvalidCharacter,
                        "'!' is only valid as part of '!='",
                        mark,
                    );
                    TokenKind::Invalid("!".to_string())
                }
            }
            other => {
                self.diagnostic(
                    DiagnosticKind::InvalidCharacter,
                    format!("Unexpected character '{other}'"),
                    mark,
                );
                TokenKind::Invalid(other.to_string())
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: u32,
    column: u32,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Convenience entry point: lex the whole input.
pub fn tokenize(source: &str) -> (Vec<Token>, Diagnostics) {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = tokenize(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("select From WHERE"),
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Keyword(Keyword::From),
                TokenKind::Keyword(Keyword::Where),
            ]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            kinds("12 1.5 0x1F x'CAFE' 'it''s'"),
            vec![
                TokenKind::Number("12".into()),
                TokenKind::Number("1.5".into()),
                TokenKind::Number("0x1F".into()),
                TokenKind::Blob("CAFE".into()),
                TokenKind::String("it's".into()),
            ]
        );
    }

    #[test]
    fn multi_character_operators() {
        assert_eq!(
            kinds("<< >> <= >= || == != <> -> ->>"),
            vec![
                TokenKind::LtLt,
                TokenKind::GtGt,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Concat,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::NotEq,
                TokenKind::Arrow,
                TokenKind::LongArrow,
            ]
        );
    }

    #[test]
    fn placeholders() {
        assert_eq!(
            kinds("? ?3 :name @name $name"),
            vec![
                TokenKind::Placeholder("?".into()),
                TokenKind::Placeholder("?3".into()),
                TokenKind::Placeholder(":name".into()),
                TokenKind::Placeholder("@name".into()),
                TokenKind::Placeholder("$name".into()),
            ]
        );
    }

    #[test]
    fn comments_are_skipped_but_positions_survive() {
        let source = "SELECT -- trailing\n/* block /* nested */ */ 1";
        let (tokens, diagnostics) = tokenize(source);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Number("1".into()));
        assert_eq!(tokens[1].location.slice(source), "1");
    }

    #[test]
    fn token_ranges_reconstruct_the_input() {
        let source = "SELECT a, 'txt' FROM t WHERE a >= 10.5;";
        let (tokens, diagnostics) = tokenize(source);
        assert!(diagnostics.is_empty());
        let mut rebuilt = String::new();
        let mut last = 0;
        for token in &tokens {
            rebuilt.push_str(&source[last..token.location.start]);
            rebuilt.push_str(token.location.slice(source));
            last = token.location.end;
        }
        rebuilt.push_str(&source[last..]);
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn unterminated_string_synthesizes_invalid_token() {
        let (tokens, diagnostics) = tokenize("select 'foo");
        assert_eq!(tokens.len(), 2);
        assert!(matches!(tokens[1].kind, TokenKind::Invalid(_)));
        let d = diagnostics.first().unwrap();
        assert_eq!(d.kind, DiagnosticKind::UnterminatedString);
        assert!(matches!(d.fixit, Some(FixIt::Append { .. })));
        // the invalid token still covers its source range
        assert_eq!(tokens[1].location.start, 7);
        assert_eq!(tokens[1].location.end, 11);
    }

    #[test]
    fn unknown_character_keeps_position() {
        let (tokens, diagnostics) = tokenize("select ^ 1");
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[1].kind, TokenKind::Invalid(_)));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.first().unwrap().kind, DiagnosticKind::InvalidCharacter);
        assert_eq!(tokens[2].kind, TokenKind::Number("1".into()));
    }

    #[test]
    fn dot_requires_following_digit() {
        let (tokens, diagnostics) = tokenize("1.");
        assert!(matches!(tokens[0].kind, TokenKind::Invalid(_)));
        assert_eq!(diagnostics.first().unwrap().kind, DiagnosticKind::InvalidNumber);
        // leading-dot decimals are fine
        let (tokens, diagnostics) = tokenize(".5");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Number(".5".into()));
    }

    #[test]
    fn restartable_from_any_offset() {
        let source = "SELECT a\nFROM t";
        let (all, _) = tokenize(source);
        let from = all[2].location.start; // FROM
        let (rest, diagnostics) = Lexer::new_at(source, from).tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].kind, TokenKind::Keyword(Keyword::From));
        assert_eq!(rest[0].location.line, Some(2));
        assert_eq!(rest[0].location.column, Some(1));
    }
}
