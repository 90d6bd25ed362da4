use std::path::Path;

use rusqlite::{params_from_iter, Connection};
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::table::{Cell, RecordTable};

/// Canonical destination schema for the adoption analysis table. This is
/// derived from the cleaner's rename table and numeric-column list so the
/// bootstrap schema and the cleaned output cannot drift apart.
const ADOPTION_COLUMNS: [(&str, &str); 10] = [
    ("nombre", "TEXT"),
    ("edad", "INTEGER"),
    ("genero_adoptante", "TEXT"),
    ("tipo_vivienda", "TEXT"),
    ("genero_mascota", "TEXT"),
    ("fecha_adopcion", "TEXT"),
    ("integrantes_familia", "INTEGER"),
    ("perros", "INTEGER"),
    ("gatos", "INTEGER"),
    ("cuantos", "INTEGER"),
];

pub const ADOPTION_TABLE: &str = "adoption_analysis";

/// Ensure the destination table exists. This is a bootstrap guarantee only;
/// `save_table` governs the live schema on every store.
pub fn run_migrations<P: AsRef<Path>>(db_path: P) -> Result<()> {
    let conn = open(db_path.as_ref())?;
    let columns: Vec<String> = ADOPTION_COLUMNS
        .iter()
        .map(|(name, sql_type)| format!("{name} {sql_type}"))
        .collect();
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {ADOPTION_TABLE} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
        columns.join(", ")
    );
    conn.execute(&sql, [])?;
    info!(db = %db_path.as_ref().display(), "migrations complete");
    Ok(())
}

/// Replace-on-write store: drops any existing table of that name, recreates
/// it with column types inferred from the cells, and inserts all rows in one
/// transaction. Incremental/append semantics are deliberately not offered.
pub fn save_table<P: AsRef<Path>>(table: &RecordTable, table_name: &str, db_path: P) -> Result<()> {
    // A columnless table (e.g. cleaned from an empty JSON array) has no
    // representable schema; fail before emitting invalid DDL.
    if table.column_count() == 0 {
        return Err(PipelineError::Malformed(format!(
            "cannot store '{table_name}': table has no columns"
        )));
    }

    let mut conn = open(db_path.as_ref())?;
    let tx = conn.transaction()?;

    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_name)), [])?;

    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, name)| format!("{} {}", quote_ident(name), infer_sqlite_type(table, index)))
        .collect();
    tx.execute(
        &format!(
            "CREATE TABLE {} ({})",
            quote_ident(table_name),
            column_defs.join(", ")
        ),
        [],
    )?;

    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table_name),
        table
            .columns()
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", "),
        vec!["?"; table.column_count()].join(", ")
    );
    {
        let mut stmt = tx.prepare(&insert)?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter().map(sql_value)))?;
        }
    }

    tx.commit()?;
    info!(table = table_name, rows = table.row_count(), db = %db_path.as_ref().display(), "table stored");
    Ok(())
}

fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(Connection::open(db_path)?)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A column is INTEGER only when every non-empty cell in it is an integer.
fn infer_sqlite_type(table: &RecordTable, column: usize) -> &'static str {
    let mut saw_int = false;
    for row in table.rows() {
        match &row[column] {
            Cell::Int(_) => saw_int = true,
            Cell::Text(_) => return "TEXT",
            Cell::Empty => {}
        }
    }
    if saw_int {
        "INTEGER"
    } else {
        "TEXT"
    }
}

fn sql_value(cell: &Cell) -> rusqlite::types::Value {
    match cell {
        Cell::Text(value) => rusqlite::types::Value::Text(value.clone()),
        Cell::Int(value) => rusqlite::types::Value::Integer(*value),
        Cell::Empty => rusqlite::types::Value::Text(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> RecordTable {
        RecordTable::new(
            vec!["tipo_vivienda".to_string(), "perros".to_string()],
            vec![
                vec![Cell::Text("casa".to_string()), Cell::Int(2)],
                vec![Cell::Empty, Cell::Int(0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn migrations_create_the_canonical_table() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("analysis.db");
        run_migrations(&db_path).unwrap();
        // Re-running is a no-op.
        run_migrations(&db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [ADOPTION_TABLE],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn save_replaces_the_whole_table() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("analysis.db");

        save_table(&sample_table(), "encuestas", &db_path).unwrap();
        save_table(&sample_table(), "encuestas", &db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM encuestas", [], |row| row.get(0))
            .unwrap();
        // Non-append semantics: two stores leave exactly one table's worth.
        assert_eq!(rows, 2);
    }

    #[test]
    fn zero_column_table_is_rejected_with_a_clear_error() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("analysis.db");

        let table = RecordTable::new(Vec::new(), Vec::new()).unwrap();
        let err = save_table(&table, "encuestas", &db_path).unwrap_err();
        assert!(matches!(err, PipelineError::Malformed(_)));
    }

    #[test]
    fn column_types_are_inferred_from_cells() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("analysis.db");
        save_table(&sample_table(), "encuestas", &db_path).unwrap();

        let conn = Connection::open(&db_path).unwrap();
        let sql: String = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE name = 'encuestas'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(sql.contains("\"tipo_vivienda\" TEXT"));
        assert!(sql.contains("\"perros\" INTEGER"));
    }
}
