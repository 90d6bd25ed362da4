use std::fs;
use std::path::PathBuf;

use adoption_pipeline::cleaner::Cleaner;
use adoption_pipeline::error::PipelineError;
use adoption_pipeline::storage;
use adoption_pipeline::table::Cell;
use rusqlite::Connection;
use tempfile::TempDir;

const CSV_INPUT: &str = "\
Nombre,Edad,Género Adoptante,Cas o Depa,Genero,Fecha Adopcion,Integrantes Familia,Perros,Gatos,Cuantos
  María ,34,F,Casa,Hembra,05/03/2023,4,2,1,3
Pedro,treinta,M,Depa,N/A,no recuerda,NA,-1,abc,
";

const JSON_INPUT: &str = r#"[
  {
    "Nombre": "  María ",
    "Edad": 34,
    "Género Adoptante": "F",
    "Cas o Depa": "Casa",
    "Genero": "Hembra",
    "Fecha Adopcion": "05/03/2023",
    "Integrantes Familia": 4,
    "Perros": 2,
    "Gatos": 1,
    "Cuantos": 3
  },
  {
    "Nombre": "Pedro",
    "Edad": "treinta",
    "Género Adoptante": "M",
    "Cas o Depa": "Depa",
    "Genero": "N/A",
    "Fecha Adopcion": "no recuerda",
    "Integrantes Familia": "NA",
    "Perros": -1,
    "Gatos": "abc",
    "Cuantos": null
  }
]"#;

fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn csv_and_json_yield_the_same_cleaned_table() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_input(&dir, "adoptantes.csv", CSV_INPUT);
    let json_path = write_input(&dir, "adoptantes.json", JSON_INPUT);

    let from_csv = Cleaner::from_path(&csv_path).unwrap().into_table();
    let from_json = Cleaner::from_path(&json_path).unwrap().into_table();

    assert_eq!(from_csv, from_json);

    // Spot-check the cleaned content itself.
    assert_eq!(
        from_csv.columns(),
        [
            "nombre",
            "edad",
            "genero_adoptante",
            "tipo_vivienda",
            "genero_mascota",
            "fecha_adopcion",
            "integrantes_familia",
            "perros",
            "gatos",
            "cuantos",
        ]
    );
    assert_eq!(
        from_csv.get(0, "nombre"),
        Some(&Cell::Text("maría".to_string()))
    );
    assert_eq!(
        from_csv.get(0, "fecha_adopcion"),
        Some(&Cell::Text("2023-03-05".to_string()))
    );
    assert_eq!(from_csv.get(1, "edad"), Some(&Cell::Int(0)));
    assert_eq!(from_csv.get(1, "genero_mascota"), Some(&Cell::Empty));
    assert_eq!(from_csv.get(1, "fecha_adopcion"), Some(&Cell::Empty));
    assert_eq!(from_csv.get(1, "perros"), Some(&Cell::Int(0)));
    assert_eq!(from_csv.get(1, "cuantos"), Some(&Cell::Int(0)));
}

#[test]
fn xlsx_yields_the_same_cleaned_table_as_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = write_input(&dir, "adoptantes.csv", CSV_INPUT);

    // The fixture workbook holds the same logical data as CSV_INPUT,
    // including the trailing blank cell in the second record.
    let from_csv = Cleaner::from_path(&csv_path).unwrap().into_table();
    let from_xlsx = Cleaner::from_path("tests/data/adoptantes.xlsx")
        .unwrap()
        .into_table();

    assert_eq!(from_xlsx, from_csv);
}

#[test]
fn empty_json_array_cleans_but_cannot_be_stored() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "vacio.json", "[]");
    let db_path = dir.path().join("adoption_analysis.db");

    let cleaner = Cleaner::from_path(&input).unwrap();
    assert_eq!(cleaner.table().row_count(), 0);

    let err = cleaner
        .to_database(storage::ADOPTION_TABLE, &db_path)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Malformed(_)));
}

#[test]
fn csv_export_reloads_to_the_same_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "adoptantes.csv", CSV_INPUT);
    let exported = dir.path().join("cleaned.csv");

    let cleaner = Cleaner::from_path(&input).unwrap();
    cleaner.to_csv(&exported).unwrap();

    // Re-cleaning already-clean data changes nothing.
    let reloaded = Cleaner::from_path(&exported).unwrap();
    assert_eq!(reloaded.table(), cleaner.table());
}

#[test]
fn json_export_preserves_non_ascii_and_empty_strings() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "adoptantes.json", JSON_INPUT);
    let exported = dir.path().join("cleaned.json");

    Cleaner::from_path(&input)
        .unwrap()
        .to_json(&exported)
        .unwrap();

    let content = fs::read_to_string(&exported).unwrap();
    assert!(content.contains("maría"), "non-ASCII must survive export");
    assert!(content.contains("\"genero_mascota\": \"\""));

    let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 2);
}

#[test]
fn cleaned_table_round_trips_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "adoptantes.csv", CSV_INPUT);
    let db_path = dir.path().join("adoption_analysis.db");

    storage::run_migrations(&db_path).unwrap();
    let cleaner = Cleaner::from_path(&input).unwrap();
    cleaner
        .to_database(storage::ADOPTION_TABLE, &db_path)
        .unwrap();

    let conn = Connection::open(&db_path).unwrap();
    let (nombre, edad, fecha): (String, i64, String) = conn
        .query_row(
            "SELECT nombre, edad, fecha_adopcion FROM adoption_analysis ORDER BY edad DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(nombre, "maría");
    assert_eq!(edad, 34);
    assert_eq!(fecha, "2023-03-05");

    // Storing again replaces rather than appends.
    cleaner
        .to_database(storage::ADOPTION_TABLE, &db_path)
        .unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM adoption_analysis", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn unsupported_extension_never_creates_a_table() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(&dir, "adoptantes.txt", CSV_INPUT);
    assert!(Cleaner::from_path(&input).is_err());
}
