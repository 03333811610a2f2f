//! Configuration loading.
//!
//! The managed table is described by a JSON file. Every field is optional;
//! missing fields fall back to the defaults below.
//!
//! ```json
//! {
//!   "database": "tally.db",
//!   "max_connections": 4,
//!   "table": {
//!     "name": "people",
//!     "balance_column": "age",
//!     "columns": [
//!       { "name": "name", "type": "TEXT" },
//!       { "name": "email", "type": "TEXT" },
//!       { "name": "age", "type": "INTEGER" }
//!     ]
//!   }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ColumnType, SchemaError, TableSchema};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tally.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file
    pub database: PathBuf,

    /// Upper bound on pooled connections
    pub max_connections: u32,

    pub table: TableConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub name: String,
    pub balance_column: String,
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tally.db"),
            max_connections: 4,
            table: TableConfig::default(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "people".to_string(),
            balance_column: "age".to_string(),
            columns: vec![
                ColumnConfig::new("name", ColumnType::Text),
                ColumnConfig::new("email", ColumnType::Text),
                ColumnConfig::new("age", ColumnType::Integer),
            ],
        }
    }
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

impl Config {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.schema()?;
        Ok(config)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if it exists,
    /// else the built-in defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validated schema of the managed table.
    pub fn schema(&self) -> Result<TableSchema, SchemaError> {
        let columns: Vec<(String, ColumnType)> = self
            .table
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type))
            .collect();
        TableSchema::new(&self.table.name, &columns, &self.table.balance_column)
    }

    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }
}
