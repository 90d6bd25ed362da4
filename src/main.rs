use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use adoption_pipeline::cleaner::Cleaner;
use adoption_pipeline::config::Config;
use adoption_pipeline::{logging, storage};

#[derive(Parser)]
#[command(name = "adoption_pipeline")]
#[command(about = "Cleans adoptant survey records into a SQLite analysis table")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the destination table exists
    Migrate {
        /// SQLite database path (defaults to the configured path)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Clean one source file, then store and/or export it
    Clean {
        /// Source file (.csv, .xlsx, .xls or .json)
        input: PathBuf,
        /// SQLite database path (defaults to the configured path)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Destination table name (defaults to the configured name)
        #[arg(long)]
        table: Option<String>,
        /// Also export the cleaned table as CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,
        /// Also export the cleaned table as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
        /// Skip the database store step
        #[arg(long)]
        no_store: bool,
    },
    /// Run the full flow: migrate, clean the configured raw file, store
    Run,
}

fn main() -> Result<()> {
    logging::init_logging();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Migrate { db } => {
            let db = db.unwrap_or_else(|| PathBuf::from(&config.db_path));
            storage::run_migrations(&db)?;
            println!("migrations applied to {}", db.display());
        }
        Commands::Clean {
            input,
            db,
            table,
            csv_out,
            json_out,
            no_store,
        } => {
            let db = db.unwrap_or_else(|| PathBuf::from(&config.db_path));
            let table_name = table.unwrap_or_else(|| config.table_name.clone());

            let cleaner = Cleaner::from_path(&input)?;
            info!(file = %input.display(), rows = cleaner.table().row_count(), "cleaned");

            if let Some(path) = csv_out {
                cleaner.to_csv(&path)?;
                println!("wrote {}", path.display());
            }
            if let Some(path) = json_out {
                cleaner.to_json(&path)?;
                println!("wrote {}", path.display());
            }
            if !no_store {
                storage::run_migrations(&db)?;
                cleaner.to_database(&table_name, &db)?;
                println!(
                    "stored {} rows into '{}' at {}",
                    cleaner.table().row_count(),
                    table_name,
                    db.display()
                );
            }
        }
        Commands::Run => {
            storage::run_migrations(&config.db_path)?;
            let cleaner = Cleaner::from_path(&config.raw_data_path)?;
            cleaner.to_database(&config.table_name, &config.db_path)?;
            println!(
                "stored {} rows into '{}' at {}",
                cleaner.table().row_count(),
                config.table_name,
                config.db_path
            );
        }
    }

    Ok(())
}
