//! Dump text handling
//!
//! - `scanner`: reassembles `INSERT ... VALUES ...;` statements from dump
//!   lines, routing each to its destination table
//! - `tuples`: splits one statement into rows of raw field tokens

pub mod scanner;
pub mod tuples;

pub use scanner::{DumpStatement, StatementScanner};
pub use tuples::{parse_insert, statement_table, ParsedInsert};

const SNIPPET_CHARS: usize = 80;

/// First characters of a statement, for error messages
pub(crate) fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
