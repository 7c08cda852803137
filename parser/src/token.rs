//! FILENAME: parser/src/token.rs
//! PURPOSE: Token definitions for the measure formula lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.

/// Tokens recognized by the formula lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    // Literals
    Number(f64),
    /// Raw text between `[` and `]`, e.g. `SUM(Sales)`.
    MeasureRef(String),
    /// Bare words are tokenized so the parser can reject them with a clear message.
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Asterisk,
    Slash,

    // Delimiters
    LParen,
    RParen,

    // Special
    EOF,
    /// A `[` with no matching `]`.
    UnterminatedRef(String),
    Illegal(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::MeasureRef(s) => write!(f, "[{}]", s),
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::EOF => write!(f, "EOF"),
            Token::UnterminatedRef(s) => write!(f, "[{}", s),
            Token::Illegal(c) => write!(f, "ILLEGAL({})", c),
        }
    }
}
