use thiserror::Error;

/// Result type alias using ImportError
pub type Result<T> = std::result::Result<T, ImportError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the cache importer is classified by one of these
/// kinds. Each kind maps to a stable code that callers can match on or show
/// to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportErrorKind {
    /// Neither or both sources supplied, unknown source mode, invalid plan
    Configuration,
    /// Dump missing/unreadable, live connection refused or rejected
    SourceUnavailable,
    /// A dump statement does not have the `INSERT ... VALUES` shape
    Format,
    /// The live source failed while rows were being read
    Connectivity,
    /// The destination store rejected an operation
    Persistence,
    /// Filesystem failure outside of reading the source
    Io,
    Internal,
}

impl ImportErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ImportErrorKind::Configuration => "ERR_CONFIGURATION",
            ImportErrorKind::SourceUnavailable => "ERR_SOURCE_UNAVAILABLE",
            ImportErrorKind::Format => "ERR_FORMAT",
            ImportErrorKind::Connectivity => "ERR_CONNECTIVITY",
            ImportErrorKind::Persistence => "ERR_PERSISTENCE",
            ImportErrorKind::Io => "ERR_IO",
            ImportErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification plus the context an operator needs: the
/// operation that failed, the destination table involved, and the
/// underlying driver or parser message.
#[derive(Debug, Clone)]
pub struct ImportError {
    kind: ImportErrorKind,
    op: Option<String>,
    table: Option<String>,
    message: String,
}

impl ImportError {
    /// Create a new error with the specified kind
    pub fn new(kind: ImportErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add destination table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ImportErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportError {}

// ========== End Error Facility ==========

/// Failures of the tuple parser, before table context is attached
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TupleError {
    #[error("statement does not start with INSERT INTO: {snippet}")]
    MissingPrefix { snippet: String },

    #[error("unexpected text outside a value tuple at offset {offset}: {snippet}")]
    StrayText { offset: usize, snippet: String },

    #[error("unterminated value tuple: {snippet}")]
    UnterminatedTuple { snippet: String },

    #[error("unterminated string literal: {snippet}")]
    UnterminatedLiteral { snippet: String },
}

impl From<TupleError> for ImportError {
    fn from(err: TupleError) -> Self {
        ImportError::new(ImportErrorKind::Format)
            .with_op("parse_insert")
            .with_message(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique() {
        let kinds = [
            ImportErrorKind::Configuration,
            ImportErrorKind::SourceUnavailable,
            ImportErrorKind::Format,
            ImportErrorKind::Connectivity,
            ImportErrorKind::Persistence,
            ImportErrorKind::Io,
            ImportErrorKind::Internal,
        ];
        let mut codes: Vec<_> = kinds.iter().map(|k| k.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ImportError::new(ImportErrorKind::Connectivity)
            .with_op("read_live_rows")
            .with_table("receipts")
            .with_message("Lost connection to MySQL server during query");

        let text = err.to_string();
        assert!(text.starts_with("[ERR_CONNECTIVITY]"));
        assert!(text.contains("read_live_rows"));
        assert!(text.contains("Lost connection"));
        assert!(text.contains("(table: receipts)"));
    }

    #[test]
    fn test_tuple_error_maps_to_format() {
        let err: ImportError = TupleError::UnterminatedTuple {
            snippet: "(1,'a'".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ImportErrorKind::Format);
        assert!(err.message().contains("unterminated value tuple"));
    }
}
