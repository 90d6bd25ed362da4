use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Default locations, matching the project's data layout. A `config.toml`
/// next to the binary overrides them; CLI flags override both. Paths always
/// flow into the pipeline as explicit arguments, never as ambient state.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub raw_data_path: String,
    pub db_path: String,
    pub table_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_data_path: "data/raw/adoptantes.json".to_string(),
            db_path: "data/processed/adoption_analysis.db".to_string(),
            table_name: "adoption_analysis".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }
}
