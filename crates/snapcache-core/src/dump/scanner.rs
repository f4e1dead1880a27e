//! Line scanner that reassembles dump statements
//!
//! Dumps wrap long `INSERT` statements over many lines. The scanner reads
//! one line at a time and keeps at most one statement in memory:
//!
//! - Idle: blank lines and lines that do not open an `INSERT INTO <table>
//!   VALUES` statement for an accepted table are skipped
//! - Accumulating: stripped lines are appended until one ends with `;`
//!
//! A buffer still open at end of input is emitted with `truncated` set.

use super::tuples::statement_table;
use crate::decode::DecodePolicy;
use std::collections::HashSet;
use std::io::{self, BufRead};

/// One reassembled statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpStatement {
    pub table: String,
    pub text: String,
    /// 1-based line number where the statement starts
    pub line: usize,
    /// Input ended before the `;` terminator
    pub truncated: bool,
}

enum ScanState {
    Idle,
    Accumulating {
        table: String,
        text: String,
        line: usize,
    },
}

/// Streaming iterator of [`DumpStatement`]s over a dump reader
pub struct StatementScanner<R> {
    reader: R,
    tables: Option<HashSet<String>>,
    policy: DecodePolicy,
    state: ScanState,
    line_no: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> StatementScanner<R> {
    /// Scanner accepting statements for every table
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tables: None,
            policy: DecodePolicy::default(),
            state: ScanState::Idle,
            line_no: 0,
            buf: Vec::new(),
            done: false,
        }
    }

    /// Only accept statements for the given tables
    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = Some(tables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_decode_policy(mut self, policy: DecodePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn accepts(&self, table: &str) -> bool {
        self.tables.as_ref().map_or(true, |t| t.contains(table))
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(self.policy.decode(&self.buf).trim().to_string()))
    }

    fn finish_at_eof(&mut self) -> Option<DumpStatement> {
        self.done = true;
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Accumulating { table, text, line } if !text.is_empty() => {
                tracing::warn!(
                    table = %table,
                    line,
                    "dump ended inside a statement; emitting partial statement"
                );
                Some(DumpStatement {
                    table,
                    text,
                    line,
                    truncated: true,
                })
            }
            _ => None,
        }
    }
}

impl<R: BufRead> Iterator for StatementScanner<R> {
    type Item = io::Result<DumpStatement>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => return self.finish_at_eof().map(Ok),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            if line.is_empty() {
                continue;
            }

            let state = std::mem::replace(&mut self.state, ScanState::Idle);
            match state {
                ScanState::Idle => {
                    let Some(table) = statement_table(&line).filter(|t| self.accepts(t)) else {
                        continue;
                    };
                    let table = table.to_string();
                    if line.ends_with(';') {
                        return Some(Ok(DumpStatement {
                            table,
                            text: line,
                            line: self.line_no,
                            truncated: false,
                        }));
                    }
                    self.state = ScanState::Accumulating {
                        table,
                        text: line,
                        line: self.line_no,
                    };
                }
                ScanState::Accumulating {
                    table,
                    mut text,
                    line: start,
                } => {
                    text.push_str(&line);
                    if line.ends_with(';') {
                        return Some(Ok(DumpStatement {
                            table,
                            text,
                            line: start,
                            truncated: false,
                        }));
                    }
                    self.state = ScanState::Accumulating {
                        table,
                        text,
                        line: start,
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(dump: &str, tables: &[&str]) -> Vec<DumpStatement> {
        StatementScanner::new(Cursor::new(dump.as_bytes().to_vec()))
            .with_tables(tables.iter().copied())
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_single_line_statements() {
        let dump = "\
-- MySQL dump
DROP TABLE IF EXISTS `a`;
INSERT INTO `a` VALUES (1),(2);

INSERT INTO `b` VALUES (3);
";
        let statements = scan(dump, &["a", "b"]);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].table, "a");
        assert_eq!(statements[0].text, "INSERT INTO `a` VALUES (1),(2);");
        assert_eq!(statements[0].line, 3);
        assert_eq!(statements[1].table, "b");
    }

    #[test]
    fn test_multi_line_statement_is_joined() {
        let dump = "INSERT INTO `a` VALUES\n  (1,'x'),\n\n  (2,'y');\n";
        let statements = scan(dump, &["a"]);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].text, "INSERT INTO `a` VALUES(1,'x'),(2,'y');");
        assert!(!statements[0].truncated);
    }

    #[test]
    fn test_unaccepted_tables_are_skipped() {
        let dump = "\
INSERT INTO `audit_log` VALUES (1),
(2);
INSERT INTO `a` VALUES (3);
";
        let statements = scan(dump, &["a"]);
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].table, "a");
    }

    #[test]
    fn test_trailing_partial_statement_is_flagged() {
        let dump = "INSERT INTO `a` VALUES (1);\nINSERT INTO `a` VALUES (2),\n(3)";
        let statements = scan(dump, &["a"]);
        assert_eq!(statements.len(), 2);
        assert!(statements[1].truncated);
        assert_eq!(statements[1].text, "INSERT INTO `a` VALUES (2),(3)");
    }

    #[test]
    fn test_crlf_lines_and_invalid_utf8() {
        let mut bytes = b"INSERT INTO `a` VALUES ('caf".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"e');\r\n");
        let statements: Vec<_> = StatementScanner::new(Cursor::new(bytes))
            .collect::<io::Result<Vec<_>>>()
            .unwrap();
        assert_eq!(statements[0].text, "INSERT INTO `a` VALUES ('cafe');");
    }

    #[test]
    fn test_interleaved_tables_keep_dump_order() {
        let dump = "\
INSERT INTO `a` VALUES (1);
INSERT INTO `b` VALUES (2);
INSERT INTO `a` VALUES (3);
";
        let tables: Vec<_> = scan(dump, &["a", "b"]).into_iter().map(|s| s.table).collect();
        assert_eq!(tables, vec!["a", "b", "a"]);
    }
}
