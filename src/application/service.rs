use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{
    build_integrity_report, parse_changes, parse_new_record, validate_transfer, IntegrityReport,
    Record, RecordId, TableSchema, TransferOutcome, TransferReceipt,
};
use crate::storage::{LedgerTx, Repository};

use super::AppError;

/// Application service providing the operations over the managed table.
/// This is the primary interface for any client (CLI, API, TUI, etc.).
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create the database file and table if needed, then connect.
    pub async fn init(config: &Config) -> Result<Self, AppError> {
        let schema = config.schema()?;
        debug!(
            database = %config.database.display(),
            table = %schema.table(),
            "Initializing database"
        );
        let repo = Repository::init(&config.database, schema, config.max_connections).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        let schema = config.schema()?;
        debug!(database = %config.database.display(), "Connecting to database");
        let repo =
            Repository::connect(&config.database, schema, config.max_connections, false).await?;
        Ok(Self::new(repo))
    }

    pub fn schema(&self) -> &TableSchema {
        self.repo.schema()
    }

    /// Release the underlying connections.
    pub async fn close(&self) {
        self.repo.close().await;
    }

    // ========================
    // Record operations
    // ========================

    /// All records, in insertion order.
    pub async fn fetch_all(&self) -> Result<Vec<Record>, AppError> {
        let records = self.repo.list_records().await?;
        debug!(count = records.len(), "Fetched records");
        Ok(records)
    }

    /// The record with `id`.
    pub async fn fetch_one(&self, id: RecordId) -> Result<Record, AppError> {
        self.repo
            .get_record(id)
            .await?
            .ok_or(AppError::NotFound(id))
    }

    /// Validate raw `(column, text)` input and insert it as a new record.
    pub async fn insert(&self, fields: &[(String, String)]) -> Result<Record, AppError> {
        let new_record = parse_new_record(self.repo.schema(), fields)?;
        let id = self.repo.insert_record(&new_record).await?;
        info!(id, balance = new_record.balance, "Inserted record");
        Ok(new_record.into_record(id))
    }

    /// Overwrite the named columns of record `id`.
    pub async fn update(
        &self,
        id: RecordId,
        fields: &[(String, String)],
    ) -> Result<Record, AppError> {
        let changes = parse_changes(self.repo.schema(), fields)?;
        if !self.repo.update_record(id, &changes).await? {
            return Err(AppError::NotFound(id));
        }
        info!(id, columns = fields.len(), "Updated record");
        self.fetch_one(id).await
    }

    /// Delete record `id`. Deleting a missing record is an error.
    pub async fn delete(&self, id: RecordId) -> Result<(), AppError> {
        if !self.repo.delete_record(id).await? {
            return Err(AppError::NotFound(id));
        }
        info!(id, "Deleted record");
        Ok(())
    }

    // ========================
    // Transfer operations
    // ========================

    /// Move `amount` of balance from one record to another.
    ///
    /// Failures are reported in the outcome rather than returned; see
    /// [`LedgerService::try_transfer`] for the typed error.
    pub async fn transfer(&self, from: RecordId, to: RecordId, amount: i64) -> TransferOutcome {
        match self.try_transfer(from, to, amount).await {
            Ok(_) => TransferOutcome::succeeded(),
            Err(err) => TransferOutcome::failed(err),
        }
    }

    /// Move `amount` of balance from one record to another inside a single
    /// transaction. On any error nothing is applied.
    pub async fn try_transfer(
        &self,
        from: RecordId,
        to: RecordId,
        amount: i64,
    ) -> Result<TransferReceipt, AppError> {
        match self.run_transfer(from, to, amount).await {
            Ok(receipt) => {
                info!(
                    from,
                    to,
                    amount,
                    from_balance = receipt.from_balance,
                    to_balance = receipt.to_balance,
                    "Transfer committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(from, to, amount, error = %err, "Transfer rejected");
                Err(err)
            }
        }
    }

    async fn run_transfer(
        &self,
        from: RecordId,
        to: RecordId,
        amount: i64,
    ) -> Result<TransferReceipt, AppError> {
        validate_transfer(from, to, amount)?;

        let mut tx = self.repo.begin().await?;
        match Self::apply_transfer(&mut tx, from, to, amount).await {
            Ok(receipt) => {
                tx.commit().await?;
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // The connection discards the transaction when it is dropped
                    warn!(error = %rollback_err, "Explicit rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply_transfer(
        tx: &mut LedgerTx<'_>,
        from: RecordId,
        to: RecordId,
        amount: i64,
    ) -> Result<TransferReceipt, AppError> {
        let from_balance = tx.balance(from).await?.ok_or(AppError::NotFound(from))?;
        let to_balance = tx.balance(to).await?.ok_or(AppError::NotFound(to))?;

        if from_balance < amount {
            return Err(AppError::InsufficientBalance {
                id: from,
                balance: from_balance,
                required: amount,
            });
        }

        let to_after = to_balance.checked_add(amount).ok_or_else(|| {
            AppError::Validation(format!(
                "Transfer would overflow the balance of record {}",
                to
            ))
        })?;

        // The debit re-checks the balance itself, so a concurrent drain
        // between the read above and this write cannot overdraw.
        if !tx.debit(from, amount).await? {
            return Err(AppError::InsufficientBalance {
                id: from,
                balance: from_balance,
                required: amount,
            });
        }
        if !tx.credit(to, amount).await? {
            return Err(AppError::NotFound(to));
        }

        Ok(TransferReceipt {
            from,
            to,
            amount,
            from_balance: from_balance - amount,
            to_balance: to_after,
        })
    }

    // ========================
    // Integrity
    // ========================

    /// Sum of all balances in the table.
    pub async fn total_balance(&self) -> Result<i64, AppError> {
        Ok(self.repo.sum_balances().await?)
    }

    /// Verify that no record holds a negative balance.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let records = self.repo.list_records().await?;
        Ok(build_integrity_report(&records))
    }
}
