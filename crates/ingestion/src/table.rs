//! Tabular source reader
//!
//! Reads the whole source file on every poll: one header row followed by
//! data rows. Cells are trimmed; ragged rows are tolerated and missing cells
//! read as absent.
//!
//! Delimited text is read up to the last newline. A final line without one
//! is still being written and is left for the next poll. Bytes that are not
//! UTF-8 are replaced rather than failing the read.
//!
//! Workbooks (`.xlsx`, `.xls`, `.ods`, ...) are read from their first sheet.
//! Date and time cells are rendered back to text so the timestamp
//! normalizer sees what the spreadsheet shows.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use calamine::{Data, Reader};
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::error::{IngestionError, Result};
use crate::schema::RecordSchema;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// On-disk source layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma separated (`.csv`, also the fallback for unknown extensions)
    Csv,
    /// Tab separated (`.tsv`, `.tab`)
    Tsv,
    /// Spreadsheet workbook, first sheet only
    Workbook,
}

impl TableFormat {
    /// Infer the format from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "tsv" | "tab" => Self::Tsv,
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Self::Workbook,
            _ => Self::Csv,
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            Self::Tsv => b'\t',
            Self::Csv | Self::Workbook => b',',
        }
    }
}

/// Full contents of one source file
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    headers: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl SourceTable {
    /// Parse delimited text held in memory. The content is taken as complete.
    pub fn parse(content: &str, format: TableFormat) -> Result<Self> {
        Self::from_delimited(content.as_bytes(), format, "<memory>")
    }

    fn from_parts(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        // First occurrence wins for duplicate headers
        let mut index = HashMap::with_capacity(headers.len());
        for (i, name) in headers.iter().enumerate() {
            index.entry(name.clone()).or_insert(i);
        }

        Self {
            headers,
            index,
            rows,
        }
    }

    fn from_delimited(content: &[u8], format: TableFormat, origin: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(format.delimiter())
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(content);

        let headers = rdr
            .byte_headers()
            .map_err(|e| describe_csv_error(origin, e))?
            .iter()
            .map(lossy_cell)
            .collect();

        let mut rows = Vec::new();
        for record in rdr.byte_records() {
            let record = record.map_err(|e| describe_csv_error(origin, e))?;
            rows.push(record.iter().map(lossy_cell).collect());
        }

        Ok(Self::from_parts(headers, rows))
    }

    fn from_workbook(path: &Path, origin: &str) -> Result<Self> {
        // calamine folds open failures into its per-format errors
        std::fs::File::open(path).map_err(|e| describe_io_error(origin, &e))?;
        let mut workbook =
            calamine::open_workbook_auto(path).map_err(|e| describe_workbook_error(origin, e))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestionError::SourceFormat {
                path: origin.to_string(),
                message: "workbook has no sheets".to_string(),
            })?
            .map_err(|e| describe_workbook_error(origin, e))?;

        let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
        let headers = rows.next().unwrap_or_default();
        let mut rows: Vec<Vec<String>> = rows.collect();
        while rows.last().is_some_and(|r| r.iter().all(String::is_empty)) {
            rows.pop();
        }

        Ok(Self::from_parts(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows (header excluded)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, idx: usize) -> Option<SourceRow<'_>> {
        (idx < self.rows.len()).then_some(SourceRow { table: self, idx })
    }

    /// Rows at positions `start..`, oldest first
    pub fn rows_from(&self, start: usize) -> impl Iterator<Item = SourceRow<'_>> {
        (start.min(self.rows.len())..self.rows.len()).map(move |idx| SourceRow { table: self, idx })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    /// Schema columns absent from the header row
    pub fn missing_columns<'s>(&self, schema: &'s RecordSchema) -> Vec<&'s str> {
        schema.columns().filter(|c| !self.has_column(c)).collect()
    }
}

/// Borrowed view of one data row
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    table: &'a SourceTable,
    idx: usize,
}

impl<'a> SourceRow<'a> {
    /// Zero-based data row position
    pub fn index(&self) -> usize {
        self.idx
    }

    /// Cell under `column`; absent when the column or cell is missing or blank
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = *self.table.index.get(column)?;
        self.table.rows[self.idx]
            .get(col)
            .map(String::as_str)
            .filter(|cell| !cell.is_empty())
    }
}

/// Read a whole source file.
///
/// # Errors
/// - `SourceRead` when the file is missing, locked or unreadable
/// - `SourceFormat` for a workbook that cannot be opened or has no sheets
#[instrument(name = "ingestion_read_table", skip_all, fields(path = %path.display()))]
pub fn read_table(path: &Path) -> Result<SourceTable> {
    let display = path.display().to_string();
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    let table = match TableFormat::from_extension(ext) {
        TableFormat::Workbook => SourceTable::from_workbook(path, &display)?,
        format => {
            let content = std::fs::read(path).map_err(|e| describe_io_error(&display, &e))?;
            SourceTable::from_delimited(complete_lines(&content), format, &display)?
        }
    };

    debug!(rows = table.row_count(), columns = table.headers().len(), "source read");
    Ok(table)
}

/// Content up to and including the last newline
fn complete_lines(content: &[u8]) -> &[u8] {
    match content.iter().rposition(|&b| b == b'\n') {
        Some(end) => &content[..=end],
        None => &[],
    }
}

fn lossy_cell(cell: &[u8]) -> String {
    String::from_utf8_lossy(cell).into_owned()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => serial_text(dt.as_f64()),
        Data::DateTimeIso(s) => s.replacen('T', " ", 1),
        Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Render a spreadsheet day serial (days since 1899-12-30)
fn serial_text(serial: f64) -> String {
    let ts = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .zip(chrono::Duration::try_milliseconds((serial * MILLIS_PER_DAY).round() as i64))
        .and_then(|(epoch, offset)| epoch.checked_add_signed(offset));

    match ts {
        Some(ts) if serial < 1.0 => ts.format("%H:%M:%S%.f").to_string(),
        Some(ts) if serial.fract() == 0.0 => ts.format("%Y-%m-%d").to_string(),
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        None => serial.to_string(),
    }
}

fn describe_io_error(path: &str, e: &io::Error) -> IngestionError {
    let message = match e.kind() {
        io::ErrorKind::NotFound => format!("File not found: {path}"),
        io::ErrorKind::PermissionDenied => format!("Permission denied: {path}"),
        _ => format!("Cannot read {path}: {e}"),
    };
    IngestionError::SourceRead {
        path: path.to_string(),
        message,
    }
}

fn describe_csv_error(path: &str, e: csv::Error) -> IngestionError {
    match e.kind() {
        csv::ErrorKind::Io(io_err) => describe_io_error(path, io_err),
        _ => IngestionError::SourceFormat {
            path: path.to_string(),
            message: e.to_string(),
        },
    }
}

fn describe_workbook_error(path: &str, e: calamine::Error) -> IngestionError {
    match e {
        calamine::Error::Io(io_err) => describe_io_error(path, &io_err),
        other => IngestionError::SourceFormat {
            path: path.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RecordKind;
    use std::io::Write;

    const SAMPLE: &str = "Date,Time,PID\n2024-01-05,10:00:00,0.5\n2024-01-05,10:00:03,\n";

    #[test]
    fn test_parse_counts_data_rows() {
        let table = SourceTable::parse(SAMPLE, TableFormat::Csv).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.headers(), &["Date", "Time", "PID"]);
    }

    #[test]
    fn test_blank_and_missing_cells_are_absent() {
        let table = SourceTable::parse(SAMPLE, TableFormat::Csv).unwrap();
        let first = table.row(0).unwrap();
        assert_eq!(first.get("PID"), Some("0.5"));
        let second = table.row(1).unwrap();
        assert_eq!(second.get("PID"), None);
        assert_eq!(second.get("Flowrate"), None);
        assert!(table.row(2).is_none());
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let table =
            SourceTable::parse("Date,Time,PID\n2024-01-05,10:00:00\n", TableFormat::Csv).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.row(0).unwrap().get("PID"), None);
    }

    #[test]
    fn test_rows_from_skips_seen_rows() {
        let table = SourceTable::parse(SAMPLE, TableFormat::Csv).unwrap();
        let idx: Vec<usize> = table.rows_from(1).map(|r| r.index()).collect();
        assert_eq!(idx, vec![1]);
        assert_eq!(table.rows_from(5).count(), 0);
    }

    #[test]
    fn test_header_cells_are_trimmed() {
        let table = SourceTable::parse(" Date , Time \n2024-01-05, 10:00\n", TableFormat::Csv).unwrap();
        assert!(table.has_column("Date"));
        assert_eq!(table.row(0).unwrap().get("Time"), Some("10:00"));
    }

    #[test]
    fn test_missing_columns() {
        let table = SourceTable::parse(SAMPLE, TableFormat::Csv).unwrap();
        let schema = crate::RecordSchema::builtin(RecordKind::LevelControl);
        let missing = table.missing_columns(&schema);
        assert_eq!(
            missing,
            vec!["Reactor weigt(kg)", "Volume of Reactor", "E. Pump RPM"]
        );
    }

    #[test]
    fn test_read_table_tsv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.tsv");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "Date\tTime\tPID\n2024-01-05\t10:00:00\t1.5\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.row(0).unwrap().get("PID"), Some("1.5"));
    }

    #[test]
    fn test_read_table_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, IngestionError::SourceRead { .. }));
        assert!(err.to_string().starts_with("File not found:"));
    }

    #[test]
    fn test_read_table_keeps_undecodable_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.csv");
        std::fs::write(&path, b"Date,Time,Temp \xB0C\n2024-01-05,10:00:00,21.5\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 1);
        assert!(table.has_column("Temp \u{FFFD}C"));
        assert_eq!(table.row(0).unwrap().get("Date"), Some("2024-01-05"));
    }

    #[test]
    fn test_read_table_waits_for_unterminated_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.csv");
        std::fs::write(&path, "Date,Time,PID\n2024-01-05,10:00:00,0.5\n2024-01-05,10:00:0").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 1);

        let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(f, "3,0.6\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 2);
        let row = table.row(1).unwrap();
        assert_eq!(row.get("Time"), Some("10:00:03"));
        assert_eq!(row.get("PID"), Some("0.6"));
    }

    #[test]
    fn test_read_table_header_only_without_newline_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.csv");
        std::fs::write(&path, "Date,Time,PID").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 0);
        assert!(table.headers().is_empty());
    }

    #[test]
    fn test_read_table_workbook_first_sheet() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/level.xlsx");

        let table = read_table(&path).unwrap();
        assert_eq!(table.row_count(), 2);
        assert!(table.has_column("Reactor weigt(kg)"));

        let first = table.row(0).unwrap();
        assert_eq!(first.get("Date"), Some("2024-01-05"));
        assert_eq!(first.get("Time"), Some("10:30:00"));
        assert_eq!(first.get("E. Pump RPM"), Some("30"));
        assert_eq!(table.row(1).unwrap().get("Time"), Some("10:30:03"));

        let ts = crate::timestamp::normalize(
            first.get("Date").unwrap(),
            first.get("Time").unwrap(),
        )
        .unwrap();
        assert_eq!(crate::timestamp::to_iso(&ts), "2024-01-05T10:30:00");
    }

    #[test]
    fn test_read_table_missing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("gas.xlsx")).unwrap_err();
        assert!(matches!(err, IngestionError::SourceRead { .. }));
    }

    #[test]
    fn test_serial_text_renders_dates_and_times() {
        assert_eq!(serial_text(45296.0), "2024-01-05");
        assert_eq!(serial_text(0.75), "18:00:00");
        assert_eq!(serial_text(45296.5), "2024-01-05 12:00:00");
    }

    #[test]
    fn test_extension_selects_format() {
        assert_eq!(TableFormat::from_extension("XLSX"), TableFormat::Workbook);
        assert_eq!(TableFormat::from_extension("ods"), TableFormat::Workbook);
        assert_eq!(TableFormat::from_extension("tab"), TableFormat::Tsv);
        assert_eq!(TableFormat::from_extension("txt"), TableFormat::Csv);
    }
}
