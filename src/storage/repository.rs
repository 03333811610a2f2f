use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::domain::{
    ColumnType, Field, NewRecord, Record, RecordChanges, RecordId, TableSchema, Value,
};

use super::Statements;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for persisting and querying records of the managed table.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
    schema: Arc<TableSchema>,
    statements: Arc<Statements>,
}

impl Repository {
    /// Create a new repository over an existing pool.
    pub fn new(pool: SqlitePool, schema: TableSchema) -> Self {
        let statements = Statements::new(&schema);
        Self {
            pool,
            schema: Arc::new(schema),
            statements: Arc::new(statements),
        }
    }

    /// Open the SQLite file at `path`.
    /// With `create` set, the file is created if it doesn't exist.
    pub async fn connect(
        path: &Path,
        schema: TableSchema,
        max_connections: u32,
        create: bool,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open database {}", path.display()))?;

        Ok(Self::new(pool, schema))
    }

    /// Create the managed table if it is missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(&self.statements.create_table)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to create table {}", self.schema.table()))?;
        Ok(())
    }

    /// Connect and migrate in one step.
    pub async fn init(path: &Path, schema: TableSchema, max_connections: u32) -> Result<Self> {
        let repo = Self::connect(path, schema, max_connections, true).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ========================
    // Record operations
    // ========================

    /// List all records, ordered by id.
    pub async fn list_records(&self) -> Result<Vec<Record>> {
        let rows = sqlx::query(&self.statements.select_all)
            .fetch_all(&self.pool)
            .await
            .context("Failed to list records")?;

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }

    /// Get a record by id.
    pub async fn get_record(&self, id: RecordId) -> Result<Option<Record>> {
        let row = sqlx::query(&self.statements.select_one)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch record")?;

        match row {
            Some(row) => Ok(Some(self.row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// Insert a new record and return its assigned id.
    pub async fn insert_record(&self, record: &NewRecord) -> Result<RecordId> {
        let mut query = sqlx::query(&self.statements.insert).bind(record.balance);
        for field in &record.attributes {
            query = bind_value(query, &field.value);
        }

        let result = query
            .execute(&self.pool)
            .await
            .context("Failed to insert record")?;

        Ok(result.last_insert_rowid())
    }

    /// Overwrite the given columns. Returns false when no record has `id`.
    pub async fn update_record(&self, id: RecordId, changes: &RecordChanges) -> Result<bool> {
        let (sql, values) = self.statements.update(&self.schema, changes)?;

        let mut query = sqlx::query(&sql);
        if let Some(balance) = changes.balance {
            query = query.bind(balance);
        }
        for value in values {
            query = bind_value(query, value);
        }

        let result = query
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to update record")?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a record. Returns false when no record has `id`.
    pub async fn delete_record(&self, id: RecordId) -> Result<bool> {
        let result = sqlx::query(&self.statements.delete)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete record")?;

        Ok(result.rows_affected() > 0)
    }

    /// Sum of every balance in the table.
    pub async fn sum_balances(&self) -> Result<i64> {
        let row = sqlx::query(&self.statements.sum_balances)
            .fetch_one(&self.pool)
            .await
            .context("Failed to sum balances")?;

        row.try_get("total").context("Invalid balance total")
    }

    /// Start a transaction for a multi-statement balance change.
    pub async fn begin(&self) -> Result<LedgerTx<'_>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(LedgerTx {
            tx,
            statements: &self.statements,
        })
    }

    fn row_to_record(&self, row: &SqliteRow) -> Result<Record> {
        let id: RecordId = row.try_get("id").context("Invalid record id")?;
        let balance: i64 = row
            .try_get(self.schema.balance_column().name.as_str())
            .with_context(|| format!("Invalid balance for record {}", id))?;

        let mut attributes = Vec::new();
        for column in self.schema.attributes() {
            let name = column.name.as_str();
            let value = match column.column_type {
                ColumnType::Integer => row
                    .try_get::<Option<i64>, _>(name)
                    .map(|v| v.map_or(Value::Null, Value::Integer)),
                ColumnType::Text => row
                    .try_get::<Option<String>, _>(name)
                    .map(|v| v.map_or(Value::Null, Value::Text)),
            }
            .with_context(|| format!("Invalid value in column {} of record {}", name, id))?;
            attributes.push(Field::new(name, value));
        }

        Ok(Record {
            id,
            balance,
            attributes,
        })
    }
}

/// An open transaction over the managed table.
///
/// Dropping it without [`LedgerTx::commit`] rolls back.
pub struct LedgerTx<'r> {
    tx: Transaction<'static, Sqlite>,
    statements: &'r Statements,
}

impl LedgerTx<'_> {
    /// Current balance of `id`, or `None` if the record doesn't exist.
    pub async fn balance(&mut self, id: RecordId) -> Result<Option<i64>> {
        let row = sqlx::query(&self.statements.select_balance)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to read balance")?;

        row.map(|row| row.try_get::<i64, _>("balance"))
            .transpose()
            .context("Invalid balance")
    }

    /// Subtract `amount` from `id` unless that would take it below zero.
    /// Returns false when nothing was debited.
    pub async fn debit(&mut self, id: RecordId, amount: i64) -> Result<bool> {
        let result = sqlx::query(&self.statements.debit)
            .bind(amount)
            .bind(id)
            .bind(amount)
            .execute(&mut *self.tx)
            .await
            .context("Failed to debit balance")?;

        Ok(result.rows_affected() == 1)
    }

    /// Add `amount` to `id`. Returns false when the record doesn't exist.
    pub async fn credit(&mut self, id: RecordId, amount: i64) -> Result<bool> {
        let result = sqlx::query(&self.statements.credit)
            .bind(amount)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .context("Failed to credit balance")?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await.context("Failed to commit transaction")
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .context("Failed to roll back transaction")
    }
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Integer(n) => query.bind(*n),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Null => query.bind(None::<String>),
    }
}
