//! PDF syntax: byte cursor, tokenizer, object parser and xref grammars.

pub mod cursor;
pub mod lexer;
pub mod object;
pub mod xref;

pub use cursor::ByteCursor;
pub use lexer::{Lexer, Token};
pub use object::{IndirectObject, PDFParser};
pub use xref::{XRefRecord, XRefSection};
