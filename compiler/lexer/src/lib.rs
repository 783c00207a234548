use thiserror::Error;

mod lex;

pub use lex::Lexer;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    #[error("invalid numeric literal")]
    InvalidNumber,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub value: TokenValue,
    pub line: i32,
    pub col: i32,
}

impl Token {
    fn new(kind: TokenKind, lexeme: &str, value: TokenValue, line: i32, col: i32) -> Self {
        Self {
            kind,
            lexeme: lexeme.to_string(),
            value,
            line,
            col,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenValue {
    None,
    Integer(i64),
    Error(LexError),
}

/// One variant per word class of the Aristotle language. The discourse
/// brackets (`ideed,` / `overall.` and their synonyms) all collapse into
/// `OpenBlock` / `CloseBlock`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Identifier,

    // expression operators
    With,
    Without,
    Times,
    Split,
    Root,
    Not,
    Eq,
    Neql,
    Less,
    Leseq,
    More,
    Moreq,

    // statement keywords
    Let,
    Idea,
    Theurgy,
    Criterion,
    Else,
    While,
    Ritual,
    Catharsis,
    Thanks,
    Write,
    Read,

    Comma,
    OpenBlock,
    CloseBlock,

    Unknown,
}
