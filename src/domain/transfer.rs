use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RecordId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidTransfer {
    #[error("Cannot transfer from record {0} to itself")]
    SameRecord(RecordId),

    #[error("Transfer amount must be positive (got {0})")]
    NonPositiveAmount(i64),
}

/// Check the preconditions that need no storage access.
pub fn validate_transfer(from: RecordId, to: RecordId, amount: i64) -> Result<(), InvalidTransfer> {
    if from == to {
        return Err(InvalidTransfer::SameRecord(from));
    }
    if amount <= 0 {
        return Err(InvalidTransfer::NonPositiveAmount(amount));
    }
    Ok(())
}

/// Balances on both sides after a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    pub from: RecordId,
    pub to: RecordId,
    pub amount: i64,
    pub from_balance: i64,
    pub to_balance: i64,
}

/// Reported result of a transfer: never an error, always a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub success: bool,
    pub message: String,
}

impl TransferOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            message: "Transfer successful.".to_string(),
        }
    }

    pub fn failed(reason: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("Transfer failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_transfer() {
        assert_eq!(validate_transfer(1, 2, 4), Ok(()));
        assert_eq!(
            validate_transfer(1, 1, 4),
            Err(InvalidTransfer::SameRecord(1))
        );
        assert_eq!(
            validate_transfer(1, 2, 0),
            Err(InvalidTransfer::NonPositiveAmount(0))
        );
        assert_eq!(
            validate_transfer(1, 2, -5),
            Err(InvalidTransfer::NonPositiveAmount(-5))
        );
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(TransferOutcome::succeeded().message, "Transfer successful.");

        let failed = TransferOutcome::failed("Record 9 not found");
        assert!(!failed.success);
        assert_eq!(failed.message, "Transfer failed: Record 9 not found");
    }
}
