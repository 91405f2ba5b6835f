//! Block parser over the token stream
//!
//! The parser knows nothing about shape semantics. It only decides whether a
//! token opens a block, closes one, or is a leaf value:
//!
//! - `Word (` opens block `Word`
//! - `Word X (` opens block `Word` labelled `X` (X is a word, hex or string)
//! - any other literal is a leaf
//!
//! Open blocks are kept on an explicit stack, so nesting depth is limited by
//! memory only. Counts inside blocks are left for the mapper to check.

use std::collections::VecDeque;
use thiserror::Error;

use super::lexer::{LexError, Lexer, Token, TokenKind};
use super::tree::{Block, Leaf, Literal, Node};
use super::DecodeError;

#[derive(Debug, Error, PartialEq)]
pub enum ParseErrorKind {
    #[error("unbalanced delimiters")]
    Unbalanced,

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("block without a name")]
    MissingName,

    #[error("unexpected content outside the root block")]
    OutsideRoot,

    #[error("empty document")]
    EmptyDocument,
}

#[derive(Debug, Error, PartialEq)]
#[error("{kind} at line {line} (offset {offset})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub offset: usize,
}

impl ParseError {
    fn at(kind: ParseErrorKind, token: &Token) -> Self {
        Self {
            kind,
            line: token.line,
            offset: token.offset,
        }
    }
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            lookahead: VecDeque::with_capacity(2),
        }
    }

    /// Parses a whole document: exactly one root block and nothing after it
    pub fn parse_document(mut self) -> Result<Block, DecodeError> {
        let first = match self.next_token()? {
            Some(token) => token,
            None => {
                let (line, offset) = self.lexer.end_position();
                return Err(ParseError {
                    kind: ParseErrorKind::EmptyDocument,
                    line,
                    offset,
                }
                .into());
            }
        };

        let root = match self.item(first.clone())? {
            Item::Open(block) => self.block_body(block)?,
            Item::Leaf(_) => return Err(ParseError::at(ParseErrorKind::OutsideRoot, &first).into()),
        };

        if let Some(extra) = self.next_token()? {
            let kind = match extra.kind {
                TokenKind::Close => ParseErrorKind::Unbalanced,
                _ => ParseErrorKind::OutsideRoot,
            };
            return Err(ParseError::at(kind, &extra).into());
        }

        Ok(root)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        match self.lookahead.pop_front() {
            Some(token) => Ok(Some(token)),
            None => self.lexer.next().transpose(),
        }
    }

    /// Peeks `n` tokens ahead without consuming them
    fn peek(&mut self, n: usize) -> Result<Option<&Token>, LexError> {
        while self.lookahead.len() <= n {
            match self.lexer.next().transpose()? {
                Some(token) => self.lookahead.push_back(token),
                None => return Ok(None),
            }
        }
        Ok(self.lookahead.get(n))
    }

    fn peek_is_open(&mut self, n: usize) -> Result<bool, LexError> {
        Ok(matches!(self.peek(n)?, Some(Token { kind: TokenKind::Open, .. })))
    }

    /// Classifies `token`, consuming the label and `(` when it opens a block
    fn item(&mut self, token: Token) -> Result<Item, DecodeError> {
        let literal = match token.kind {
            TokenKind::Open => return Err(ParseError::at(ParseErrorKind::MissingName, &token).into()),
            TokenKind::Close => return Err(ParseError::at(ParseErrorKind::Unbalanced, &token).into()),
            TokenKind::Literal(literal) => literal,
        };

        if let Literal::Word(name) = literal {
            if self.peek_is_open(0)? {
                self.next_token()?;
                return Ok(Item::Open(Block::new(name, token.line)));
            }

            let labelled = matches!(
                self.peek(0)?,
                Some(Token {
                    kind: TokenKind::Literal(Literal::Word(_) | Literal::Hex(_) | Literal::Str(_)),
                    ..
                })
            );
            if labelled && self.peek_is_open(1)? {
                if let Some(TokenKind::Literal(
                    Literal::Word(label) | Literal::Hex(label) | Literal::Str(label),
                )) = self.next_token()?.map(|t| t.kind)
                {
                    self.next_token()?;
                    let mut block = Block::new(name, token.line);
                    block.label = Some(label);
                    return Ok(Item::Open(block));
                }
            }

            return Ok(Item::Leaf(Leaf {
                value: Literal::Word(name),
                line: token.line,
            }));
        }

        Ok(Item::Leaf(Leaf {
            value: literal,
            line: token.line,
        }))
    }

    /// Reads children up to the `)` matching `root`. Nested blocks are pushed
    /// onto `parents` and attached to their parent when they close.
    fn block_body(&mut self, root: Block) -> Result<Block, DecodeError> {
        let mut current = root;
        let mut parents: Vec<Block> = Vec::new();

        loop {
            let token = match self.next_token()? {
                Some(token) => token,
                None => {
                    let (line, offset) = self.lexer.end_position();
                    return Err(ParseError {
                        kind: ParseErrorKind::UnexpectedEof,
                        line,
                        offset,
                    }
                    .into());
                }
            };

            if token.kind == TokenKind::Close {
                match parents.pop() {
                    Some(parent) => {
                        let closed = std::mem::replace(&mut current, parent);
                        current.children.push(Node::Block(closed));
                    }
                    None => return Ok(current),
                }
                continue;
            }

            match self.item(token)? {
                Item::Open(block) => parents.push(std::mem::replace(&mut current, block)),
                Item::Leaf(leaf) => current.children.push(Node::Leaf(leaf)),
            }
        }
    }
}

/// A token classified as the start of a block or a leaf
enum Item {
    Open(Block),
    Leaf(Leaf),
}
