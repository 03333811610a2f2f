use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Storage type of a managed column.
///
/// Config files may spell it in any case (`"TEXT"`, `"text"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ColumnType {
    Text,
    Integer,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
        }
    }
}

impl FromStr for ColumnType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TEXT" => Ok(ColumnType::Text),
            "INTEGER" => Ok(ColumnType::Integer),
            _ => Err(SchemaError::UnknownColumnType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ColumnType {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid identifier '{0}': use letters, digits and underscores, not starting with a digit")]
    InvalidIdentifier(String),

    #[error("Unknown column type '{0}': expected TEXT or INTEGER")]
    UnknownColumnType(String),

    #[error("Column name '{0}' is reserved")]
    ReservedIdentifier(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Table '{0}' has no managed columns")]
    NoColumns(String),

    #[error("Balance column '{0}' is not one of the managed columns")]
    UnknownBalanceColumn(String),

    #[error("Balance column '{column}' must be INTEGER, not {column_type}")]
    BalanceNotInteger {
        column: String,
        column_type: ColumnType,
    },
}

/// A table or column name that is safe to splice into SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: &str) -> Result<Self, SchemaError> {
        let mut chars = name.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(SchemaError::InvalidIdentifier(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use in statements.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Ident,
    pub column_type: ColumnType,
}

/// Validated description of the managed table.
///
/// Built once at startup; every statement the repository issues is derived
/// from it, so no caller-supplied text ever reaches the SQL itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table: Ident,
    columns: Vec<Column>,
    balance_index: usize,
}

impl TableSchema {
    pub fn new(
        table: &str,
        columns: &[(String, ColumnType)],
        balance_column: &str,
    ) -> Result<Self, SchemaError> {
        let table = Ident::new(table)?;
        if columns.is_empty() {
            return Err(SchemaError::NoColumns(table.to_string()));
        }

        let mut validated: Vec<Column> = Vec::with_capacity(columns.len());
        for (name, column_type) in columns {
            let name = Ident::new(name)?;
            if name.as_str().eq_ignore_ascii_case("id") {
                return Err(SchemaError::ReservedIdentifier(name.to_string()));
            }
            // SQLite folds identifier case
            if validated
                .iter()
                .any(|c| c.name.as_str().eq_ignore_ascii_case(name.as_str()))
            {
                return Err(SchemaError::DuplicateColumn(name.to_string()));
            }
            validated.push(Column {
                name,
                column_type: *column_type,
            });
        }

        let balance_index = validated
            .iter()
            .position(|c| c.name.as_str() == balance_column)
            .ok_or_else(|| SchemaError::UnknownBalanceColumn(balance_column.to_string()))?;

        let balance = &validated[balance_index];
        if balance.column_type != ColumnType::Integer {
            return Err(SchemaError::BalanceNotInteger {
                column: balance.name.to_string(),
                column_type: balance.column_type,
            });
        }

        Ok(Self {
            table,
            columns: validated,
            balance_index,
        })
    }

    pub fn table(&self) -> &Ident {
        &self.table
    }

    /// All managed columns in configured order, balance included.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn balance_column(&self) -> &Column {
        &self.columns[self.balance_index]
    }

    pub fn is_balance(&self, column: &Column) -> bool {
        column.name == self.balance_column().name
    }

    /// Managed columns other than the balance, in configured order.
    pub fn attributes(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.balance_index)
            .map(|(_, c)| c)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.as_str() == name)
    }

    pub fn create_table_sql(&self) -> String {
        let mut defs = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for column in &self.columns {
            if self.is_balance(column) {
                defs.push(format!("{} INTEGER NOT NULL DEFAULT 0", column.name.quoted()));
            } else {
                defs.push(format!("{} {}", column.name.quoted(), column.column_type));
            }
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table.quoted(),
            defs.join(", ")
        )
    }
}
