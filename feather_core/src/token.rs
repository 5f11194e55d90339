//! Tokens produced by the lexer.

use std::fmt;

use crate::keyword::Keyword;
use crate::SourceLocation;

/// A lexed token: a kind plus the byte range it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Token { kind, location }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.keyword() == Some(kw)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    /// A bare or `"quoted"` identifier. The value is unquoted.
    Ident(String),
    /// A `'string'` literal with escapes resolved.
    String(String),
    /// A numeric literal, kept in source form (`12`, `1.5`, `0xFF`).
    Number(String),
    /// An `x'...'` blob literal; the value is the hex digit run.
    Blob(String),
    Keyword(Keyword),
    /// A bind parameter in source form: `?`, `?3`, `:name`, `@name`, `$name`.
    Placeholder(String),

    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Period,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Tilde,
    Lt,
    Gt,

    Eq,         // =
    EqEq,       // ==
    NotEq,      // != or <>
    LtEq,       // <=
    GtEq,       // >=
    LtLt,       // <<
    GtGt,       // >>
    Concat,     // ||
    Arrow,      // ->
    LongArrow,  // ->>

    /// Source the lexer could not tokenize; the diagnostic explaining why
    /// is already in the bag. The payload is the offending text.
    Invalid(String),
}

impl TokenKind {
    /// A short human-readable description for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::String(_) => "string literal".into(),
            TokenKind::Number(n) => format!("number '{n}'"),
            TokenKind::Blob(_) => "blob literal".into(),
            TokenKind::Keyword(kw) => format!("'{kw}'"),
            TokenKind::Placeholder(p) => format!("parameter '{p}'"),
            TokenKind::Invalid(text) => format!("invalid input '{text}'"),
            other => format!("'{other}'"),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TokenKind::Ident(name) => return f.write_str(name),
            TokenKind::String(s) => return write!(f, "'{s}'"),
            TokenKind::Number(n) => return f.write_str(n),
            TokenKind::Blob(hex) => return write!(f, "x'{hex}'"),
            TokenKind::Keyword(kw) => return f.write_str(kw.as_str()),
            TokenKind::Placeholder(p) => return f.write_str(p),
            TokenKind::Invalid(text) => return f.write_str(text),
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Period => ".",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Tilde => "~",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::Eq => "=",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::Concat => "||",
            TokenKind::Arrow => "->",
            TokenKind::LongArrow => "->>",
        };
        f.write_str(s)
    }
}
