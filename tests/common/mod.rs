// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use tally::application::LedgerService;
use tally::config::Config;
use tally::domain::Record;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let config = Config::default().with_database(temp_dir.path().join("test.db"));
    let service = LedgerService::init(&config).await?;
    Ok((service, temp_dir))
}

/// Raw form input, as a front end would hand it over
pub fn fields(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Insert a person with the given balance ("age")
pub async fn add_person(service: &LedgerService, name: &str, age: i64) -> Result<Record> {
    let email = format!("{}@example.com", name.to_lowercase());
    let age = age.to_string();
    let record = service
        .insert(&fields(&[("name", name), ("email", &email), ("age", &age)]))
        .await?;
    Ok(record)
}

/// Test fixture: record A (balance 10) and record B (balance 5)
pub async fn two_people(service: &LedgerService) -> Result<(Record, Record)> {
    let a = add_person(service, "Alice", 10).await?;
    let b = add_person(service, "Bob", 5).await?;
    Ok((a, b))
}

pub async fn balance_of(service: &LedgerService, id: i64) -> Result<i64> {
    Ok(service.fetch_one(id).await?.balance)
}
