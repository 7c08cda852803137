//! FILENAME: parser/src/lexer.rs
//! PURPOSE: Scans a raw measure formula and produces a stream of Tokens.
//! CONTEXT: First stage of the parsing pipeline. Handles whitespace skipping,
//! number literals (including exponents), bracketed measure references and
//! the four arithmetic operators.
//!
//! SUPPORTED INPUT:
//! - Single char: + - * / ( )
//! - Numbers: 42, 3.5, .5, 1e3, 2.5E-2
//! - Measure references: [SUM(Sales)], [average(Unit Price)]

use crate::token::Token;
use std::iter::Peekable;
use std::str::CharIndices;

pub struct Lexer<'a> {
    source: &'a str,
    input: Peekable<CharIndices<'a>>,
    /// Byte offset of the most recently returned token.
    token_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            source: input,
            input: input.char_indices().peekable(),
            token_start: 0,
        }
    }

    /// Byte offset where the last token returned by `next_token` began.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let Some((pos, ch)) = self.input.next() else {
            self.token_start = self.source.len();
            return Token::EOF;
        };
        self.token_start = pos;

        match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Asterisk,
            '/' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => self.read_measure_ref(),
            ch if ch.is_ascii_digit() || ch == '.' => self.read_number(pos),
            ch if is_letter(ch) => self.read_identifier(pos, ch),
            ch => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads everything up to the closing `]`. Brackets do not nest.
    fn read_measure_ref(&mut self) -> Token {
        let mut content = String::new();
        for (_, ch) in self.input.by_ref() {
            if ch == ']' {
                return Token::MeasureRef(content);
            }
            content.push(ch);
        }
        Token::UnterminatedRef(content)
    }

    fn read_number(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        let mut has_dot = self.source[start..].starts_with('.');
        let mut has_exponent = false;

        while let Some(&(pos, ch)) = self.input.peek() {
            if ch.is_ascii_digit() {
                self.input.next();
                end = pos + 1;
            } else if ch == '.' && !has_dot && !has_exponent {
                has_dot = true;
                self.input.next();
                end = pos + 1;
            } else if (ch == 'e' || ch == 'E') && !has_exponent {
                // Only an exponent when followed by digits (optionally signed).
                let rest = &self.source[pos + 1..];
                let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
                if !digits.starts_with(|c: char| c.is_ascii_digit()) {
                    break;
                }
                has_exponent = true;
                self.input.next();
                end = pos + 1;
                if rest.starts_with(['+', '-']) {
                    if let Some((sign_pos, _)) = self.input.next() {
                        end = sign_pos + 1;
                    }
                }
            } else {
                break;
            }
        }

        match self.source[start..end].parse::<f64>() {
            Ok(n) => Token::Number(n),
            // A lone "." is not a number.
            Err(_) => Token::Illegal('.'),
        }
    }

    fn read_identifier(&mut self, start: usize, first: char) -> Token {
        let mut end = start + first.len_utf8();
        while let Some(&(pos, ch)) = self.input.peek() {
            if is_letter(ch) || ch.is_ascii_digit() {
                self.input.next();
                end = pos + ch.len_utf8();
            } else {
                break;
            }
        }
        Token::Identifier(self.source[start..end].to_string())
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}
