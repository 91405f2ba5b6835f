//! Tokenizer for shape text
//!
//! Produces tokens lazily; the parser pulls them one at a time. A bare run of
//! characters (anything up to whitespace, a parenthesis or a quote) is
//! classified after it has been read in full.

use std::str::CharIndices;
use std::iter::Peekable;
use thiserror::Error;

use super::tree::Literal;
use crate::domain::Hex32;

#[derive(Debug, Error, PartialEq)]
pub enum LexErrorKind {
    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("integer out of range '{0}'")]
    IntegerOverflow(String),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    #[error("unexpected control character {0:?}")]
    ControlCharacter(char),
}

#[derive(Debug, Error, PartialEq)]
#[error("{kind} at line {line} (offset {offset})")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub line: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Open,
    Close,
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub offset: usize,
}

/// Lazy token stream over a source string
pub struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    failed: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self::starting_at(src, 0)
    }

    /// Lexes `src` from byte `offset`, keeping offsets and line numbers
    /// relative to the whole string
    pub fn starting_at(src: &'a str, offset: usize) -> Self {
        let offset = offset.min(src.len());
        let line = 1 + src[..offset].matches('\n').count();
        let mut chars = src.char_indices().peekable();
        while chars.next_if(|&(i, _)| i < offset).is_some() {}

        Self {
            src,
            chars,
            line,
            failed: false,
        }
    }

    /// Line and offset just past the last character, for end-of-input errors
    pub fn end_position(&self) -> (usize, usize) {
        (1 + self.src.matches('\n').count(), self.src.len())
    }

    fn error(&mut self, kind: LexErrorKind, line: usize, offset: usize) -> LexError {
        self.failed = true;
        LexError { kind, line, offset }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while let Some(&(offset, c)) = self.chars.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.chars.next();
                }
                '#' => {
                    while self.chars.next_if(|&(_, c)| c != '\n').is_some() {}
                }
                c if c.is_whitespace() => {
                    self.chars.next();
                }
                c if c.is_control() || c == '\u{feff}' && offset != 0 => {
                    let line = self.line;
                    return Err(self.error(LexErrorKind::ControlCharacter(c), line, offset));
                }
                '\u{feff}' => {
                    self.chars.next();
                }
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    fn string(&mut self, start: usize) -> Result<Token, LexError> {
        let line = self.line;
        let mut value = String::new();

        loop {
            match self.chars.next() {
                None | Some((_, '\n')) => {
                    return Err(self.error(LexErrorKind::UnterminatedString, line, start));
                }
                Some((_, '"')) => break,
                Some((at, '\\')) => {
                    let escaped = match self.chars.next() {
                        Some((_, '"')) => '"',
                        Some((_, '\\')) => '\\',
                        Some((_, 'n')) => '\n',
                        Some((_, 't')) => '\t',
                        Some((_, other)) => {
                            return Err(self.error(LexErrorKind::InvalidEscape(other), line, at));
                        }
                        None => {
                            return Err(self.error(LexErrorKind::UnterminatedString, line, start));
                        }
                    };
                    value.push(escaped);
                }
                Some((at, c)) if c.is_control() && c != '\t' => {
                    return Err(self.error(LexErrorKind::ControlCharacter(c), line, at));
                }
                Some((_, c)) => value.push(c),
            }
        }

        Ok(Token {
            kind: TokenKind::Literal(Literal::Str(value)),
            line,
            offset: start,
        })
    }

    fn bare(&mut self, start: usize) -> Result<Token, LexError> {
        let line = self.line;
        let mut end = start;

        while let Some(&(at, c)) = self.chars.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                break;
            }
            if c.is_control() {
                return Err(self.error(LexErrorKind::ControlCharacter(c), line, at));
            }
            end = at + c.len_utf8();
            self.chars.next();
        }

        let src = self.src;
        let run = &src[start..end];
        let literal = classify(run).map_err(|kind| self.error(kind, line, start))?;

        Ok(Token {
            kind: TokenKind::Literal(literal),
            line,
            offset: start,
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Err(e) = self.skip_trivia() {
            return Some(Err(e));
        }

        let &(offset, c) = self.chars.peek()?;
        let line = self.line;
        let token = match c {
            '(' => {
                self.chars.next();
                Ok(Token { kind: TokenKind::Open, line, offset })
            }
            ')' => {
                self.chars.next();
                Ok(Token { kind: TokenKind::Close, line, offset })
            }
            '"' => {
                self.chars.next();
                self.string(offset)
            }
            _ => self.bare(offset),
        };
        Some(token)
    }
}

/// Classifies a bare run as hex, integer, float or word
pub fn classify(run: &str) -> Result<Literal, LexErrorKind> {
    if Hex32::is_hex_word(run) {
        return Ok(Literal::Hex(run.to_string()));
    }

    if is_integer(run) {
        return run
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| LexErrorKind::IntegerOverflow(run.to_string()));
    }

    if is_decimal_float(run) {
        return run
            .parse::<f64>()
            .map(Literal::Float)
            .map_err(|_| LexErrorKind::InvalidNumber(run.to_string()));
    }

    let numeric_start = run
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'));
    let has_letters = run.chars().any(|c| c.is_alphabetic() || c == '_');
    if numeric_start && !has_letters {
        return Err(LexErrorKind::InvalidNumber(run.to_string()));
    }

    Ok(Literal::Word(run.to_string()))
}

fn strip_sign(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_integer(s: &str) -> bool {
    let digits = strip_sign(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// `[sign] (digits [. digits*] | . digits) [(e|E) [sign] digits]`
fn is_decimal_float(s: &str) -> bool {
    let s = strip_sign(s);
    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };

    let (whole, fraction) = match mantissa.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (mantissa, ""),
    };
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() && fraction.is_empty() {
        return false;
    }
    if !all_digits(whole) || !all_digits(fraction) {
        return false;
    }

    match exponent {
        Some(exp) => is_integer(exp),
        None => true,
    }
}
