//! PDF Parser Module
//!
//! Reads an existing file into a lazily-resolved object graph: the lexer
//! and object parser work over an in-memory byte slice, the xref table maps
//! object numbers to offsets, and [`PdfDocument`] exposes the page tree.

pub mod document;
pub mod filters;
pub mod lexer;
pub mod objects;

use crate::error::PdfError;

pub use self::document::{PdfDocument, PdfPage};
pub use self::lexer::{Lexer, Token};
pub use self::objects::ObjectParser;

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Low-level syntax errors raised while tokenizing or parsing objects.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at position {position}: {message}")]
    SyntaxError { position: usize, message: String },

    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input")]
    UnexpectedEof,
}

impl From<ParseError> for PdfError {
    fn from(err: ParseError) -> Self {
        PdfError::MalformedDocument(err.to_string())
    }
}

/// Options controlling how tolerant the reader is.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Rebuild the xref by scanning for `n g obj` headers when the
    /// cross-reference section cannot be read.
    pub recover_xref: bool,
    /// Longest chain of indirect references followed by one `resolve`.
    pub max_resolve_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            recover_xref: true,
            max_resolve_depth: 64,
        }
    }
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self {
            recover_xref: false,
            ..Self::default()
        }
    }
}
