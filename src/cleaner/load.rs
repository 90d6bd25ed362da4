use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::Value;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::table::{Cell, RecordTable};

/// Detect the source format from the file extension and parse accordingly.
/// Unknown extensions fail before any data is read.
pub fn load_table(path: &Path) -> Result<RecordTable> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => load_csv(path),
        Some("xlsx") | Some("xls") => load_spreadsheet(path),
        Some("json") => load_json(path),
        _ => Err(PipelineError::UnsupportedFormat(path.display().to_string())),
    }
}

fn load_csv(path: &Path) -> Result<RecordTable> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(cell_from_str).collect());
    }
    debug!(file = %path.display(), rows = rows.len(), "parsed csv");
    RecordTable::new(columns, rows)
}

fn load_json(path: &Path) -> Result<RecordTable> {
    let file = File::open(path)?;
    let records: Vec<serde_json::Map<String, Value>> =
        serde_json::from_reader(BufReader::new(file))?;

    // Columns are the first-seen union of keys across all records.
    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !columns.iter().any(|column| column == key) {
                columns.push(key.clone());
            }
        }
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let row = columns
            .iter()
            .map(|column| record.get(column).map(cell_from_json).unwrap_or(Cell::Empty))
            .collect();
        rows.push(row);
    }
    debug!(file = %path.display(), rows = rows.len(), "parsed json");
    RecordTable::new(columns, rows)
}

fn load_spreadsheet(path: &Path) -> Result<RecordTable> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PipelineError::Malformed(format!("{}: workbook has no sheets", path.display())))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let mut sheet_rows = range.rows();
    let columns: Vec<String> = match sheet_rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => {
            return Err(PipelineError::Malformed(format!(
                "{}: first sheet '{}' is empty",
                path.display(),
                sheet_name
            )))
        }
    };

    let mut rows = Vec::new();
    for sheet_row in sheet_rows {
        let mut row: Vec<Cell> = sheet_row.iter().map(cell_from_sheet).collect();
        row.resize(columns.len(), Cell::Empty);
        rows.push(row);
    }
    debug!(file = %path.display(), sheet = %sheet_name, rows = rows.len(), "parsed spreadsheet");
    RecordTable::new(columns, rows)
}

/// CSV cells are untyped; integral values are promoted to `Int` so that all
/// three formats load the same logical data into the same cells.
fn cell_from_str(raw: &str) -> Cell {
    if raw.is_empty() {
        return Cell::Empty;
    }
    match raw.trim().parse::<i64>() {
        Ok(value) => Cell::Int(value),
        Err(_) => Cell::Text(raw.to_string()),
    }
}

fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(s) if s.is_empty() => Cell::Empty,
        Value::String(s) => Cell::Text(s.clone()),
        Value::Number(n) => match n.as_i64() {
            Some(int) => Cell::Int(int),
            None => Cell::Text(n.to_string()),
        },
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn cell_from_sheet(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(n) => Cell::Int(*n),
        Data::Float(f) if f.fract() == 0.0 => Cell::Int(*f as i64),
        Data::Float(f) => Cell::Text(f.to_string()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| Cell::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Cell::Empty),
        Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}
