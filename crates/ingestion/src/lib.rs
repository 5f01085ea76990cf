//! # Ingestion
//!
//! Source row ingestion module.
//!
//! Responsibilities:
//! - Read delimited tabular source files (header row + data rows)
//! - Normalize `Date` + `Time` cells into one timestamp
//! - Resolve source columns through a per-kind column schema
//! - Map rows into typed `SourceRecord`s
//!
//! ## Usage Example
//!
//! ```ignore
//! use contracts::RecordKind;
//! use ingestion::{read_table, RecordMapper};
//!
//! let mapper = RecordMapper::builtin(RecordKind::Gas);
//! let table = read_table(path)?;
//! for row in table.rows_from(0) {
//!     match mapper.map_row(row, reactor_id) {
//!         Ok(record) => queue.push(record),
//!         Err(rejected) => tracing::warn!(%rejected, "skipping row"),
//!     }
//! }
//! ```

mod error;
mod mapper;
mod schema;
mod table;
mod timestamp;

// Re-exports
pub use contracts::SourceRecord;
pub use error::{IngestionError, Result};
pub use mapper::{map_dilution, map_gas, map_level, FieldReader, RecordMapper};
pub use schema::{ColumnBinding, RecordSchema};
pub use table::{read_table, SourceRow, SourceTable, TableFormat};
pub use timestamp::{normalize, to_iso, InvalidTimestamp};
