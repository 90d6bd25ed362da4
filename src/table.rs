use std::collections::HashMap;

use crate::error::{PipelineError, Result};

/// A single scalar value in a record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Int(i64),
    /// Missing-value marker; renders as the empty string.
    Empty,
}

impl Cell {
    /// String form used by the CSV export and the SQLite sink.
    pub fn render(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Int(value) => value.to_string(),
            Cell::Empty => String::new(),
        }
    }
}

/// A mutable ordered table whose columns are discovered at load time from
/// the source file. There is no fixed record type; rows are positional and
/// cells are addressed through the column-name list.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RecordTable {
    /// Build a table, validating that every row has one cell per column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(PipelineError::Malformed(format!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell lookup by row index and column name, mainly for assertions.
    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let index = self.column_index(column)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Rewrite every column name through `f`, preserving order.
    pub fn map_column_names<F>(&mut self, f: F)
    where
        F: FnMut(&str) -> String,
    {
        let mut f = f;
        for column in &mut self.columns {
            *column = f(column);
        }
    }

    /// Apply a fixed rename lookup; columns not in the lookup pass through.
    pub fn rename_columns(&mut self, lookup: &HashMap<&str, &str>) {
        for column in &mut self.columns {
            if let Some(renamed) = lookup.get(column.as_str()) {
                *column = (*renamed).to_string();
            }
        }
    }

    /// Visit every cell mutably together with its column name.
    pub fn map_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut Cell),
    {
        for row in &mut self.rows {
            for (index, cell) in row.iter_mut().enumerate() {
                f(&self.columns[index], cell);
            }
        }
    }

    /// Visit every cell of one column mutably. Missing columns are a no-op.
    pub fn map_column<F>(&mut self, column: &str, mut f: F)
    where
        F: FnMut(&mut Cell),
    {
        if let Some(index) = self.column_index(column) {
            for row in &mut self.rows {
                f(&mut row[index]);
            }
        }
    }
}
