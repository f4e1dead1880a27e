//! SnapCache Core - pure ingestion logic
//!
//! This crate holds everything in the snapshot-cache pipeline that does not
//! touch a database:
//! - Import plans and the clinic plan registry
//! - Dump statement scanner and tuple parser
//! - Lenient row conversion
//! - Error and logging facilities shared by the other crates

pub mod convert;
pub mod decode;
pub mod dump;
pub mod errors;
pub mod logging_facility;
pub mod plan;

// Re-export commonly used types
pub use convert::{convert_row, CellValue, ConvertedRow, Converter, LenientNumeric, RawRow};
pub use decode::DecodePolicy;
pub use errors::{ImportError, ImportErrorKind, Result};
pub use plan::{ColumnMap, PlanRegistry, TablePlan};
