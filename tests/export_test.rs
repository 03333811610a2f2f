mod common;

use anyhow::Result;
use common::{test_service, two_people};
use tally::io::Exporter;

#[tokio::test]
async fn test_export_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let (a, b) = two_people(&service).await?;
    service.transfer(a.id, b.id, 4).await;

    let mut out = Vec::new();
    let count = Exporter::new(&service).export_csv(&mut out).await?;
    assert_eq!(count, 2);

    let text = String::from_utf8(out)?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id,name,email,age");
    assert_eq!(lines[1], format!("{},Alice,alice@example.com,6", a.id));
    assert_eq!(lines[2], format!("{},Bob,bob@example.com,9", b.id));

    Ok(())
}

#[tokio::test]
async fn test_export_json() -> Result<()> {
    let (service, _temp) = test_service().await?;
    two_people(&service).await?;

    let mut out = Vec::new();
    Exporter::new(&service).export_json(&mut out).await?;

    let rows: serde_json::Value = serde_json::from_slice(&out)?;
    let rows = rows.as_array().expect("array of records");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Alice");
    assert_eq!(rows[0]["age"], 10);
    assert_eq!(rows[1]["email"], "bob@example.com");

    Ok(())
}
