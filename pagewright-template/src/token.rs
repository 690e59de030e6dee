//! Scanner token types

use std::fmt;

/// Byte span into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Slice the source this span was taken from.
    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// What a `{{...}}` tag does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `{{#name}}`
    Open,
    /// `{{/name}}`
    Close,
    /// `{{name}}` or `{{a.b.c}}`
    Var,
}

/// A recognized tag. `span` covers the braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub kind: TagKind,
    pub name: String,
    pub span: Span,
}

/// Scanner output: literal text or a recognized tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(Span),
    Tag(Tag),
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagKind::Open => write!(f, "open"),
            TagKind::Close => write!(f, "close"),
            TagKind::Var => write!(f, "var"),
        }
    }
}
