//! Tag scanner
//!
//! A single forward pass over the source that splits it into literal text
//! spans and recognized tags. Anything between `{{` and `}}` that is not a
//! valid tag stays literal, and scanning resumes one byte after the rejected
//! `{{` so that `{{{name}}}` still yields the inner `{{name}}`.

use super::token::*;

pub const OPEN_DELIM: &str = "{{";
pub const CLOSE_DELIM: &str = "}}";

// ============================================================================
// SCANNER IMPLEMENTATION
// ============================================================================

enum TagRead {
    Tag(Tag),
    Invalid,
    /// No `}}` follows; nothing after this point can be a tag.
    Unterminated,
}

/// Scanner over template source.
pub struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given source.
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Split the entire source into tokens. Adjacent literal text is always
    /// merged into a single `Token::Text`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut text_start = 0;

        while let Some(rel) = self.source[self.pos..].find(OPEN_DELIM) {
            let open = self.pos + rel;
            match self.read_tag(open) {
                TagRead::Tag(tag) => {
                    if text_start < open {
                        tokens.push(Token::Text(Span::new(text_start, open)));
                    }
                    self.pos = tag.span.end;
                    text_start = self.pos;
                    tokens.push(Token::Tag(tag));
                }
                // '{' is one byte, so open + 1 is a char boundary.
                TagRead::Invalid => self.pos = open + 1,
                TagRead::Unterminated => break,
            }
        }

        if text_start < self.source.len() {
            tokens.push(Token::Text(Span::new(text_start, self.source.len())));
        }
        tokens
    }

    fn read_tag(&self, open: usize) -> TagRead {
        let inner_start = open + OPEN_DELIM.len();
        let Some(close_rel) = self.source[inner_start..].find(CLOSE_DELIM) else {
            return TagRead::Unterminated;
        };
        let inner = &self.source[inner_start..inner_start + close_rel];
        let end = inner_start + close_rel + CLOSE_DELIM.len();

        match parse_tag_body(inner) {
            Some((kind, name)) => TagRead::Tag(Tag {
                kind,
                name: name.to_string(),
                span: Span::new(open, end),
            }),
            None => TagRead::Invalid,
        }
    }
}

/// Classify the text between the braces. Surrounding whitespace is ignored,
/// as is whitespace between a `#`/`/` sigil and the name.
fn parse_tag_body(inner: &str) -> Option<(TagKind, &str)> {
    let trimmed = inner.trim();
    let (kind, name) = if let Some(rest) = trimmed.strip_prefix('#') {
        (TagKind::Open, rest.trim_start())
    } else if let Some(rest) = trimmed.strip_prefix('/') {
        (TagKind::Close, rest.trim_start())
    } else {
        (TagKind::Var, trimmed)
    };
    if is_valid_name(name) {
        Some((kind, name))
    } else {
        None
    }
}

/// Names are non-empty runs of `[A-Za-z0-9_.-]`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
}

// ============================================================================
// TESTS
// ============================================================================
