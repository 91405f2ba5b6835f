//! Generic block tree
//!
//! Schema-agnostic output of the parser. The tree only knows about named
//! blocks and literal leaves; what they mean is decided by the mapper.

use std::fmt;

/// A literal value as it appeared in the source
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    /// Exactly eight hex digits, kept as written
    Hex(String),
    /// Bare identifier such as `TexDiff` or `DB_Track1w.ACE`
    Word(String),
    /// Double-quoted string with escapes resolved
    Str(String),
}

impl Literal {
    /// Name of the literal kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Int(_) => "integer",
            Literal::Float(_) => "float",
            Literal::Hex(_) => "hex",
            Literal::Word(_) => "word",
            Literal::Str(_) => "string",
        }
    }

    /// Returns the value of an integer, or of a hex token made of decimal digits only
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Literal::Int(value) => Some(*value),
            Literal::Hex(digits) if digits.bytes().all(|b| b.is_ascii_digit()) => digits.parse().ok(),
            _ => None,
        }
    }

    /// Returns the value of any numeric literal as a float. A hex token counts
    /// when it reads as a finite decimal number, e.g. `00000400` or `12345e10`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Literal::Float(value) => Some(*value),
            Literal::Int(value) => Some(*value as f64),
            Literal::Hex(digits) => digits.parse::<f64>().ok().filter(|v| v.is_finite()),
            Literal::Word(_) | Literal::Str(_) => None,
        }
    }

    /// Returns the text of a word, string or hex token
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Literal::Word(s) | Literal::Str(s) | Literal::Hex(s) => Some(s),
            Literal::Int(_) | Literal::Float(_) => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{}", value),
            Literal::Float(value) => write!(f, "{}", value),
            Literal::Hex(s) | Literal::Word(s) => f.write_str(s),
            Literal::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// A literal with the line it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub value: Literal,
    pub line: usize,
}

/// `name [label] ( children... )`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub label: Option<String>,
    pub children: Vec<Node>,
    pub line: usize,
}

impl Block {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            label: None,
            children: Vec::new(),
            line,
        }
    }

    /// Iterates over the child blocks, skipping leaves
    #[cfg(test)]
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(|child| match child {
            Node::Block(block) => Some(block),
            Node::Leaf(_) => None,
        })
    }

    /// First child block with the given name
    #[cfg(test)]
    pub fn find(&self, name: &str) -> Option<&Block> {
        self.blocks().find(|block| block.name == name)
    }
}

// Nested blocks are released level by level so that a deep tree cannot
// exhaust the stack while being dropped.
impl Drop for Block {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Block(mut block) = node {
                pending.append(&mut block.children);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Block),
    Leaf(Leaf),
}

impl Node {
    pub fn line(&self) -> usize {
        match self {
            Node::Block(block) => block.line,
            Node::Leaf(leaf) => leaf.line,
        }
    }

    /// Short description for error messages: the block name or the literal kind
    pub fn describe(&self) -> String {
        match self {
            Node::Block(block) => format!("block '{}'", block.name),
            Node::Leaf(leaf) => format!("{} '{}'", leaf.value.kind_name(), leaf.value),
        }
    }
}
