//! Content stream tokenizer.

pub mod lexer;

pub use lexer::{ContentLexer, Token};
