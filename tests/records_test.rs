mod common;

use anyhow::Result;
use common::{add_person, fields, test_service};
use tally::application::{AppError, LedgerService};
use tally::config::{ColumnConfig, Config, TableConfig};
use tally::domain::{ColumnType, Field, Value};
use tempfile::TempDir;

#[tokio::test]
async fn test_insert_then_fetch_round_trips() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let inserted = service
        .insert(&fields(&[
            ("name", "Ada Lovelace"),
            ("email", "ada@example.com"),
            ("age", "36"),
        ]))
        .await?;

    let fetched = service.fetch_one(inserted.id).await?;
    assert_eq!(fetched, inserted);
    assert_eq!(fetched.balance, 36);
    assert_eq!(
        fetched.attributes,
        vec![
            Field::new("name", Value::Text("Ada Lovelace".into())),
            Field::new("email", Value::Text("ada@example.com".into())),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_fetch_all_in_insertion_order() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(service.fetch_all().await?.is_empty());

    let a = add_person(&service, "Alice", 1).await?;
    let b = add_person(&service, "Bob", 2).await?;
    let c = add_person(&service, "Carol", 3).await?;

    let ids: Vec<i64> = service.fetch_all().await?.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![a.id, b.id, c.id]);

    Ok(())
}

#[tokio::test]
async fn test_insert_rejects_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let missing = service
        .insert(&fields(&[("name", "Ada"), ("age", "3")]))
        .await;
    assert!(matches!(missing, Err(AppError::Validation(_))));

    let malformed = service
        .insert(&fields(&[("name", "Ada"), ("email", ""), ("age", "three")]))
        .await;
    assert!(matches!(malformed, Err(AppError::Validation(_))));

    let negative = service
        .insert(&fields(&[("name", "Ada"), ("email", ""), ("age", "-3")]))
        .await;
    assert!(matches!(negative, Err(AppError::Validation(_))));

    assert!(service.fetch_all().await?.is_empty(), "Nothing was written");

    Ok(())
}

#[tokio::test]
async fn test_update_overwrites_named_fields_only() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let record = add_person(&service, "Alice", 10).await?;

    let updated = service
        .update(record.id, &fields(&[("email", "alice@work.example")]))
        .await?;

    assert_eq!(updated.balance, 10);
    assert_eq!(updated.get("name"), Some(&Value::Text("Alice".into())));
    assert_eq!(
        updated.get("email"),
        Some(&Value::Text("alice@work.example".into()))
    );

    let updated = service.update(record.id, &fields(&[("age", "42")])).await?;
    assert_eq!(updated.balance, 42);

    Ok(())
}

#[tokio::test]
async fn test_update_missing_record() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.update(99, &fields(&[("name", "Nobody")])).await;
    assert!(matches!(result, Err(AppError::NotFound(99))));

    Ok(())
}

#[tokio::test]
async fn test_update_rejects_invalid_input() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let record = add_person(&service, "Alice", 10).await?;

    let empty = service.update(record.id, &[]).await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let unknown = service
        .update(record.id, &fields(&[("phone", "555-0100")]))
        .await;
    assert!(matches!(unknown, Err(AppError::Validation(_))));

    let negative = service.update(record.id, &fields(&[("age", "-1")])).await;
    assert!(matches!(negative, Err(AppError::Validation(_))));

    assert_eq!(service.fetch_one(record.id).await?, record);

    Ok(())
}

#[tokio::test]
async fn test_delete_then_fetch_reports_not_found() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let record = add_person(&service, "Alice", 10).await?;

    service.delete(record.id).await?;

    let result = service.fetch_one(record.id).await;
    assert!(matches!(result, Err(AppError::NotFound(id)) if id == record.id));

    Ok(())
}

#[tokio::test]
async fn test_delete_missing_record_is_an_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let record = add_person(&service, "Alice", 10).await?;

    service.delete(record.id).await?;
    let again = service.delete(record.id).await;
    assert!(matches!(again, Err(AppError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let first = add_person(&service, "Alice", 1).await?;
    let second = add_person(&service, "Bob", 1).await?;
    service.delete(second.id).await?;

    let third = add_person(&service, "Carol", 1).await?;
    assert!(third.id > second.id);
    assert_ne!(third.id, first.id);

    Ok(())
}

#[tokio::test]
async fn test_data_persists_across_connections() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::default().with_database(temp_dir.path().join("persist.db"));

    let service = LedgerService::init(&config).await?;
    let record = add_person(&service, "Alice", 10).await?;
    service.close().await;

    let reopened = LedgerService::connect(&config).await?;
    assert_eq!(reopened.fetch_one(record.id).await?, record);

    Ok(())
}

#[tokio::test]
async fn test_connect_requires_existing_database() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config::default().with_database(temp_dir.path().join("missing.db"));

    let result = LedgerService::connect(&config).await;
    assert!(matches!(result, Err(AppError::Storage(_))));

    Ok(())
}

#[tokio::test]
async fn test_custom_table_layout() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = Config {
        database: temp_dir.path().join("accounts.db"),
        max_connections: 2,
        table: TableConfig {
            name: "accounts".into(),
            balance_column: "credits".into(),
            columns: vec![
                ColumnConfig::new("credits", ColumnType::Integer),
                ColumnConfig::new("owner", ColumnType::Text),
                ColumnConfig::new("level", ColumnType::Integer),
            ],
        },
    };
    let service = LedgerService::init(&config).await?;

    let record = service
        .insert(&fields(&[("owner", "ops"), ("level", "3"), ("credits", "100")]))
        .await?;

    let fetched = service.fetch_one(record.id).await?;
    assert_eq!(fetched.balance, 100);
    assert_eq!(fetched.get("level"), Some(&Value::Integer(3)));
    assert_eq!(fetched.get("owner"), Some(&Value::Text("ops".into())));

    Ok(())
}

#[tokio::test]
async fn test_invalid_table_config_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = Config::default().with_database(temp_dir.path().join("bad.db"));
    config.table.name = "people; DROP TABLE people".into();

    let result = LedgerService::init(&config).await;
    assert!(matches!(result, Err(AppError::Config(_))));

    Ok(())
}

#[tokio::test]
async fn test_integrity_check_on_healthy_table() -> Result<()> {
    let (service, _temp) = test_service().await?;
    add_person(&service, "Alice", 10).await?;
    add_person(&service, "Bob", 5).await?;

    let report = service.check_integrity().await?;
    assert_eq!(report.record_count, 2);
    assert_eq!(report.total_balance, 15);
    assert!(report.is_healthy());

    Ok(())
}
