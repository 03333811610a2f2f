use anyhow::Result;
use serde_json::{Map, Value as JsonValue};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Record, TableSchema, Value};

/// Exporter for writing the record table in various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export records to CSV format: `id` followed by the managed columns.
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.fetch_all().await?;
        write_csv(self.service.schema(), &records, writer)
    }

    /// Export records as a JSON array of flat objects.
    pub async fn export_json<W: Write>(&self, writer: W) -> Result<usize> {
        let records = self.service.fetch_all().await?;
        write_json(self.service.schema(), &records, writer)
    }
}

pub fn write_csv<W: Write>(schema: &TableSchema, records: &[Record], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    let mut header = vec!["id".to_string()];
    header.extend(schema.columns().iter().map(|c| c.name.to_string()));
    csv_writer.write_record(&header)?;

    for record in records {
        let mut row = vec![record.id.to_string()];
        row.extend(record.values(schema).iter().map(Value::to_string));
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(records.len())
}

pub fn write_json<W: Write>(
    schema: &TableSchema,
    records: &[Record],
    mut writer: W,
) -> Result<usize> {
    let rows: Vec<JsonValue> = records
        .iter()
        .map(|record| -> Result<JsonValue, serde_json::Error> {
            let mut object = Map::new();
            object.insert("id".to_string(), JsonValue::from(record.id));
            for (column, value) in schema.columns().iter().zip(record.values(schema)) {
                object.insert(column.name.to_string(), serde_json::to_value(value)?);
            }
            Ok(JsonValue::Object(object))
        })
        .collect::<Result<_, serde_json::Error>>()?;

    serde_json::to_writer_pretty(&mut writer, &rows)?;
    writeln!(writer)?;
    Ok(records.len())
}
