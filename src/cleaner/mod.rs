mod load;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::storage;
use crate::table::{Cell, RecordTable};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Legacy or misnamed survey columns and their canonical names. The housing
/// and pet-gender fields are renamed so they cannot be confused with the
/// adopter-gender field.
static COLUMN_RENAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("cas_o_depa", "tipo_vivienda"),
        ("genero", "genero_mascota"),
        ("género_adoptante", "genero_adoptante"),
    ])
});

/// Tokens treated as semantically missing, matched case-insensitively
/// against the whole (trimmed) cell.
const MISSING_TOKENS: [&str; 5] = ["na", "n/a", "n\\a", "n.a.", "none"];

/// Survey columns expected to hold ages or counts.
const NUMERIC_COLUMNS: [&str; 5] = ["edad", "cuantos", "integrantes_familia", "perros", "gatos"];

/// Day-first formats accepted in date columns, plus the already-clean ISO
/// form so the pipeline stays idempotent. Two-digit-year formats come first:
/// `%Y` would otherwise swallow a two-digit year as year 22.
const DATE_FORMATS: [&str; 6] = [
    "%d/%m/%y",
    "%d/%m/%Y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
];

/// Loads a tabular source file and applies the fixed sequence of
/// normalization passes. A constructed `Cleaner` always holds a fully
/// cleaned table; construction fails outright on unsupported or malformed
/// input, so no partial result ever reaches a sink.
#[derive(Debug)]
pub struct Cleaner {
    table: RecordTable,
}

impl Cleaner {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let table = load::load_table(path)?;
        info!(file = %path.display(), rows = table.row_count(), columns = table.column_count(), "loaded raw table");

        let mut cleaner = Self { table };
        cleaner.clean();
        Ok(cleaner)
    }

    pub fn table(&self) -> &RecordTable {
        &self.table
    }

    /// Terminal handoff of the cleaned table.
    pub fn into_table(self) -> RecordTable {
        self.table
    }

    /// The passes run in this exact order: renaming must see normalized
    /// column names, and date/numeric coercion must see cells that the
    /// string passes have already trimmed.
    fn clean(&mut self) {
        self.normalize_column_names();
        self.rename_columns();
        self.standardize_na_values();
        self.clean_strings();
        self.standardize_dates();
        self.convert_numerics();
        debug!(
            rows = self.table.row_count(),
            columns = self.table.column_count(),
            "cleaning passes complete"
        );
    }

    /// Pass 1: trim, lowercase, collapse whitespace runs to one underscore.
    fn normalize_column_names(&mut self) {
        self.table.map_column_names(|name| {
            WHITESPACE_RUN
                .replace_all(name.trim(), "_")
                .to_lowercase()
        });
    }

    /// Pass 2: canonical renames; unknown columns pass through.
    fn rename_columns(&mut self) {
        self.table.rename_columns(&COLUMN_RENAMES);
    }

    /// Pass 3: recognized missing-value tokens become the empty marker.
    fn standardize_na_values(&mut self) {
        self.table.map_cells(|_, cell| {
            let is_missing = match &*cell {
                Cell::Text(value) => {
                    let trimmed = value.trim();
                    trimmed.is_empty()
                        || MISSING_TOKENS
                            .iter()
                            .any(|token| trimmed.eq_ignore_ascii_case(token))
                }
                _ => false,
            };
            if is_missing {
                *cell = Cell::Empty;
            }
        });
    }

    /// Pass 4: textual cells are trimmed and lowercased.
    fn clean_strings(&mut self) {
        self.table.map_cells(|_, cell| {
            if let Cell::Text(value) = cell {
                *value = value.trim().to_lowercase();
            }
        });
    }

    /// Pass 5: any column whose name contains "fecha" ends up holding either
    /// an empty marker or an ISO `YYYY-MM-DD` string.
    fn standardize_dates(&mut self) {
        self.table.map_cells(|column, cell| {
            if !column.contains("fecha") {
                return;
            }
            let replacement = match &*cell {
                Cell::Text(value) => parse_day_first(value)
                    .map(|date| Cell::Text(date.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Cell::Empty),
                _ => Cell::Empty,
            };
            *cell = replacement;
        });
    }

    /// Pass 6: designated count/age columns become non-negative integers;
    /// anything unparseable (or missing, or negative) becomes 0.
    fn convert_numerics(&mut self) {
        for column in NUMERIC_COLUMNS {
            self.table.map_column(column, |cell| {
                let value = coerce_int(cell);
                *cell = Cell::Int(value);
            });
        }
    }

    /// Export as delimited text with a header row.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(self.table.columns())?;
        for row in self.table.rows() {
            writer.write_record(row.iter().map(Cell::render))?;
        }
        writer.flush()?;
        info!(file = %path.as_ref().display(), rows = self.table.row_count(), "exported csv");
        Ok(())
    }

    /// Export as a pretty-printed JSON array of records, non-ASCII
    /// preserved, empty markers rendered as empty strings.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let records: Vec<Value> = self
            .table
            .rows()
            .iter()
            .map(|row| {
                let mut record = Map::new();
                for (column, cell) in self.table.columns().iter().zip(row) {
                    record.insert(column.clone(), json_value(cell));
                }
                Value::Object(record)
            })
            .collect();

        let file = File::create(path.as_ref())?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &records)?;
        out.flush()?;
        info!(file = %path.as_ref().display(), rows = self.table.row_count(), "exported json");
        Ok(())
    }

    /// Hand the cleaned table to the SQLite sink under `table_name`.
    pub fn to_database<P: AsRef<Path>>(&self, table_name: &str, db_path: P) -> Result<()> {
        storage::save_table(&self.table, table_name, db_path)
    }
}

fn parse_day_first(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn coerce_int(cell: &Cell) -> i64 {
    let parsed = match cell {
        Cell::Int(value) => Some(*value),
        Cell::Text(value) => {
            let value = value.trim();
            value
                .parse::<i64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        Cell::Empty => None,
    };
    parsed.filter(|value| *value >= 0).unwrap_or(0)
}

fn json_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(value) => Value::String(value.clone()),
        Cell::Int(value) => Value::Number((*value).into()),
        Cell::Empty => Value::String(String::new()),
    }
}
