use thiserror::Error;

use crate::domain::{InputError, InvalidTransfer, RecordId, SchemaError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Record {0} does not exist")]
    NotFound(RecordId),

    #[error("Insufficient balance in record {id}: balance {balance}, required {required}")]
    InsufficientBalance {
        id: RecordId,
        balance: i64,
        required: i64,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] SchemaError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<InputError> for AppError {
    fn from(err: InputError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<InvalidTransfer> for AppError {
    fn from(err: InvalidTransfer) -> Self {
        AppError::Validation(err.to_string())
    }
}
