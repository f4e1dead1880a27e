//! Row conversion
//!
//! Turns raw source tokens into typed cells. Numeric conversion is lenient:
//! legacy exports carry malformed numeric fields, and a malformed field must
//! land as zero rather than abort the import.

use crate::plan::TablePlan;

/// One source record: nullable text tokens in source-select order
pub type RawRow = Vec<Option<String>>;

/// One destination record: typed cells in destination-column order
pub type ConvertedRow = Vec<CellValue>;

/// A typed value ready to be bound to a destination placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Real(f64),
    Integer(i64),
}

/// Per-column conversion function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Converter {
    /// Null becomes "", otherwise CRLF -> LF and trimmed
    Text,
    /// Null stays null, otherwise CRLF -> LF (untrimmed)
    NullableText,
    /// Lenient float, see [`LenientNumeric::real`]
    Real,
    /// Lenient integer, see [`LenientNumeric::integer`]
    Integer,
}

impl Converter {
    pub fn apply(&self, token: Option<&str>) -> CellValue {
        match self {
            Converter::Text => CellValue::Text(clean_text(token)),
            Converter::NullableText => match token {
                Some(value) => CellValue::Text(value.replace("\r\n", "\n")),
                None => CellValue::Null,
            },
            Converter::Real => CellValue::Real(LenientNumeric::real(token)),
            Converter::Integer => CellValue::Integer(LenientNumeric::integer(token)),
        }
    }
}

fn clean_text(token: Option<&str>) -> String {
    match token {
        Some(value) => value.replace("\r\n", "\n").trim().to_string(),
        None => String::new(),
    }
}

/// Never-failing numeric coercion
///
/// Null, empty and unparsable input all yield zero. The fallback values are
/// part of the import contract and must not be tightened.
pub struct LenientNumeric;

impl LenientNumeric {
    pub fn real(token: Option<&str>) -> f64 {
        match token {
            None | Some("") => 0.0,
            Some(value) => value.parse::<f64>().unwrap_or(0.0),
        }
    }

    /// Integers go through a float so "12.9" imports as 12 (truncated)
    pub fn integer(token: Option<&str>) -> i64 {
        let value = match token {
            None | Some("") => return 0,
            Some(value) => value,
        };
        if let Ok(n) = value.parse::<i64>() {
            return n;
        }
        match value.parse::<f64>() {
            Ok(f) if f.is_finite() => f.trunc() as i64,
            _ => 0,
        }
    }
}

/// Trim a token and map a case-insensitive `NULL` to a null marker
pub fn normalize_token(token: Option<&str>) -> Option<&str> {
    let value = token?.trim();
    if value.eq_ignore_ascii_case("NULL") {
        None
    } else {
        Some(value)
    }
}

/// Apply a plan's column map to one raw row
///
/// Source positions past the end of the row read as null.
pub fn convert_row(plan: &TablePlan, raw: &[Option<String>]) -> ConvertedRow {
    plan.columns()
        .iter()
        .map(|column| {
            let token = raw.get(column.source).and_then(|t| t.as_deref());
            column.convert.apply(normalize_token(token))
        })
        .collect()
}
