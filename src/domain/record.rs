use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ColumnType, TableSchema};

/// Store-assigned row identifier. Never reused within one database file.
pub type RecordId = i64;

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Null => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: Value,
}

impl Field {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// One row of the managed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub balance: i64,
    /// Non-balance columns in schema order
    pub attributes: Vec<Field>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Values for every managed column in schema order, balance included.
    pub fn values(&self, schema: &TableSchema) -> Vec<Value> {
        schema
            .columns()
            .iter()
            .map(|column| {
                if schema.is_balance(column) {
                    Value::Integer(self.balance)
                } else {
                    self.get(column.name.as_str()).cloned().unwrap_or(Value::Null)
                }
            })
            .collect()
    }
}

/// Validated payload for an insert: every managed column present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub balance: i64,
    pub attributes: Vec<Field>,
}

impl NewRecord {
    pub fn into_record(self, id: RecordId) -> Record {
        Record {
            id,
            balance: self.balance,
            attributes: self.attributes,
        }
    }
}

/// Validated payload for an update: only the columns being overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordChanges {
    pub balance: Option<i64>,
    pub attributes: Vec<Field>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        self.balance.is_none() && self.attributes.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Missing value for column '{0}'")]
    MissingColumn(String),

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Column '{0}' given more than once")]
    RepeatedColumn(String),

    #[error("Column '{column}' expects an integer, got '{value}'")]
    InvalidInteger { column: String, value: String },

    #[error("Column '{column}' cannot be negative (got {value})")]
    NegativeBalance { column: String, value: i64 },

    #[error("No fields to update")]
    NoChanges,
}

/// Convert raw `(column, text)` pairs into a complete insert payload.
pub fn parse_new_record(
    schema: &TableSchema,
    raw: &[(String, String)],
) -> Result<NewRecord, InputError> {
    let mut changes = parse_changes(schema, raw)?;

    let balance_column = schema.balance_column().name.to_string();
    let balance = changes
        .balance
        .take()
        .ok_or(InputError::MissingColumn(balance_column))?;

    let mut attributes = Vec::new();
    for column in schema.attributes() {
        let name = column.name.as_str();
        let pos = changes
            .attributes
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| InputError::MissingColumn(name.to_string()))?;
        attributes.push(changes.attributes.swap_remove(pos));
    }

    Ok(NewRecord {
        balance,
        attributes,
    })
}

/// Convert raw `(column, text)` pairs into a partial update payload.
pub fn parse_changes(
    schema: &TableSchema,
    raw: &[(String, String)],
) -> Result<RecordChanges, InputError> {
    if raw.is_empty() {
        return Err(InputError::NoChanges);
    }

    let mut changes = RecordChanges::default();
    let mut seen: Vec<&str> = Vec::with_capacity(raw.len());

    for (name, text) in raw {
        let column = schema
            .column(name)
            .ok_or_else(|| InputError::UnknownColumn(name.clone()))?;
        if seen.contains(&name.as_str()) {
            return Err(InputError::RepeatedColumn(name.clone()));
        }
        seen.push(name);

        let value = parse_value(name, column.column_type, text)?;

        match value {
            Value::Integer(balance) if schema.is_balance(column) => {
                if balance < 0 {
                    return Err(InputError::NegativeBalance {
                        column: name.clone(),
                        value: balance,
                    });
                }
                changes.balance = Some(balance);
            }
            value => changes.attributes.push(Field::new(name.clone(), value)),
        }
    }

    // Keep attributes in schema order regardless of input order
    changes.attributes.sort_by_key(|f| {
        schema
            .columns()
            .iter()
            .position(|c| c.name.as_str() == f.name)
    });

    Ok(changes)
}

fn parse_value(column: &str, column_type: ColumnType, text: &str) -> Result<Value, InputError> {
    match column_type {
        ColumnType::Text => Ok(Value::Text(text.to_string())),
        ColumnType::Integer => text
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| InputError::InvalidInteger {
                column: column.to_string(),
                value: text.to_string(),
            }),
    }
}
