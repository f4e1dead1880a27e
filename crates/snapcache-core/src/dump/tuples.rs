//! Tuple parser for dump `INSERT` statements
//!
//! Grammar handled:
//!
//! ```text
//! INSERT INTO <table> [VALUES] (<field>, ...), (<field>, ...) ... [;]
//! ```
//!
//! `<table>` is a backtick-quoted or bare identifier. A field is either a
//! single-quoted literal (backslash escapes, `''` for a quote) or bare text.
//! Bare `NULL` is the null marker. Parentheses inside literals never affect
//! tuple boundaries.

use super::snippet;
use crate::convert::RawRow;
use crate::errors::TupleError;
use std::iter::Peekable;
use std::str::CharIndices;

const INSERT_INTO: &str = "INSERT INTO";
const VALUES: &str = "VALUES";

/// One parsed statement
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInsert {
    pub table: String,
    pub rows: Vec<RawRow>,
}

/// Table named by an `INSERT INTO <table> VALUES` line prefix
///
/// Returns `None` for any other line, including inserts with a column list.
pub fn statement_table(line: &str) -> Option<&str> {
    let (table, rest) = split_prefix(line)?;
    rest.trim_start().starts_with(VALUES).then_some(table)
}

/// Split `INSERT INTO <table>` off the front of a statement
fn split_prefix(statement: &str) -> Option<(&str, &str)> {
    let rest = statement.strip_prefix(INSERT_INTO)?;
    let trimmed = rest.trim_start();
    if trimmed.len() == rest.len() {
        return None;
    }
    if let Some(quoted) = trimmed.strip_prefix('`') {
        let end = quoted.find('`')?;
        let table = &quoted[..end];
        (!table.is_empty()).then_some((table, &quoted[end + 1..]))
    } else {
        let end = trimmed
            .find(|c: char| c.is_whitespace() || c == '(')
            .unwrap_or(trimmed.len());
        let table = &trimmed[..end];
        (!table.is_empty()).then_some((table, &trimmed[end..]))
    }
}

/// Parse one complete statement into rows of raw tokens
///
/// # Errors
///
/// Returns a [`TupleError`] when the statement lacks the `INSERT INTO`
/// prefix, has text outside the value tuples, or ends inside a tuple or
/// string literal.
pub fn parse_insert(statement: &str) -> Result<ParsedInsert, TupleError> {
    let (table, rest) = split_prefix(statement).ok_or_else(|| TupleError::MissingPrefix {
        snippet: snippet(statement),
    })?;

    let payload = rest.trim_start();
    let body = payload.strip_prefix(VALUES).unwrap_or(payload);
    let body = body.trim_end().trim_end_matches(';');

    Ok(ParsedInsert {
        table: table.to_string(),
        rows: parse_tuples(body, statement)?,
    })
}

fn parse_tuples(body: &str, statement: &str) -> Result<Vec<RawRow>, TupleError> {
    let mut rows = Vec::new();
    let mut chars = body.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '(' => rows.push(parse_tuple(&mut chars, statement)?),
            ',' if !rows.is_empty() => {}
            c if c.is_whitespace() => {}
            _ => {
                return Err(TupleError::StrayText {
                    offset,
                    snippet: snippet(&body[offset..]),
                })
            }
        }
    }

    Ok(rows)
}

/// Parse fields up to the `)` closing the current tuple
fn parse_tuple(
    chars: &mut Peekable<CharIndices<'_>>,
    statement: &str,
) -> Result<RawRow, TupleError> {
    let mut fields: RawRow = Vec::new();
    let mut field = FieldBuf::default();
    let mut depth = 0usize;

    loop {
        let Some((_, c)) = chars.next() else {
            return Err(TupleError::UnterminatedTuple {
                snippet: snippet(statement),
            });
        };
        match c {
            '\'' => field.read_literal(chars, statement)?,
            '(' => {
                depth += 1;
                field.push(c);
            }
            ')' if depth > 0 => {
                depth -= 1;
                field.push(c);
            }
            ')' => {
                if fields.is_empty() && field.is_blank() {
                    return Ok(fields);
                }
                fields.push(field.finish());
                return Ok(fields);
            }
            ',' if depth == 0 => fields.push(std::mem::take(&mut field).finish()),
            c => field.push(c),
        }
    }
}

#[derive(Default)]
struct FieldBuf {
    text: String,
    quoted: bool,
}

impl FieldBuf {
    fn push(&mut self, c: char) {
        if self.quoted && c.is_whitespace() {
            return;
        }
        self.text.push(c);
    }

    fn is_blank(&self) -> bool {
        !self.quoted && self.text.trim().is_empty()
    }

    fn read_literal(
        &mut self,
        chars: &mut Peekable<CharIndices<'_>>,
        statement: &str,
    ) -> Result<(), TupleError> {
        if !self.quoted && self.text.trim().is_empty() {
            self.text.clear();
        }
        self.quoted = true;

        loop {
            match chars.next() {
                None => {
                    return Err(TupleError::UnterminatedLiteral {
                        snippet: snippet(statement),
                    })
                }
                Some((_, '\\')) => match chars.next() {
                    Some((_, escaped)) => self.text.push(unescape(escaped)),
                    None => {
                        return Err(TupleError::UnterminatedLiteral {
                            snippet: snippet(statement),
                        })
                    }
                },
                Some((_, '\'')) => {
                    if matches!(chars.peek(), Some((_, '\''))) {
                        chars.next();
                        self.text.push('\'');
                    } else {
                        return Ok(());
                    }
                }
                Some((_, c)) => self.text.push(c),
            }
        }
    }

    fn finish(self) -> Option<String> {
        if self.quoted {
            return Some(self.text);
        }
        let token = self.text.trim();
        if token == "NULL" {
            None
        } else {
            Some(token.to_string())
        }
    }
}

/// MySQL string escapes; anything else stands for itself
fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        'b' => '\u{8}',
        'Z' => '\u{1a}',
        other => other,
    }
}
