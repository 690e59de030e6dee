//! PAGEWRIGHT Template - Placeholder Compiler
//!
//! Compiles HTML templates containing `{{key}}`, `{{a.b}}` and
//! `{{#list}}...{{this}}...{{/list}}` tags into a reusable node tree that can
//! be applied to any number of data bags without re-parsing.
//!
//! Architecture:
//! ```text
//! Template source
//!     ↓
//! Scanner (tags + literal text spans)
//!     ↓
//! Compiler pass 1 (balanced block matching → node tree)
//!     ↓
//! CompiledTemplate
//!     ↓
//! apply(&DataBag) pass 2 (linear substitution) → HTML
//! ```
//!
//! Missing keys never fail: they render as the empty string. Only block tags
//! that cannot be paired produce a [`TemplateError`].

pub mod compiler;
pub mod inject;
pub mod scanner;
pub mod token;

pub use compiler::{compile, render, CompiledTemplate, Node, MAX_NESTING_DEPTH, THIS_KEY};
pub use inject::{inject_before_body_close, inject_behavior_script, BEHAVIOR_MARKER, BEHAVIOR_SCRIPT};
pub use pagewright_core::TemplateError;
pub use scanner::Scanner;
pub use token::{Span, Tag, TagKind, Token};
