use std::fs::File;
use std::io::{stdout, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::LedgerService;
use crate::config::Config;
use crate::domain::{Record, RecordId, TableSchema};
use crate::io::export::{write_csv, write_json};
use crate::io::Exporter;

/// Tally - a record table with atomic balance transfers
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Manage the records of a single SQLite table and move balance between them")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(short, long, env = "TALLY_DATABASE", global = true)]
    pub database: Option<PathBuf>,

    /// JSON file describing the managed table (default: ./tally.json if present)
    #[arg(short, long, env = "TALLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database file and table
    Init,

    /// List all records
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,
    },

    /// Show a single record
    Show {
        /// Record ID
        id: RecordId,
    },

    /// Add a new record (every column is required)
    Add {
        /// Column value as COLUMN=VALUE, repeated for each column
        #[arg(short, long = "field", value_name = "COLUMN=VALUE", required = true)]
        fields: Vec<String>,
    },

    /// Overwrite columns of an existing record
    Update {
        /// Record ID
        id: RecordId,

        /// Column value as COLUMN=VALUE, repeated for each column to change
        #[arg(short, long = "field", value_name = "COLUMN=VALUE", required = true)]
        fields: Vec<String>,
    },

    /// Delete a record
    Delete {
        /// Record ID
        id: RecordId,
    },

    /// Move balance from one record to another in a single transaction
    Transfer {
        /// Amount to move (positive integer)
        amount: i64,

        /// Source record ID
        #[arg(long)]
        from: RecordId,

        /// Destination record ID
        #[arg(long)]
        to: RecordId,
    },

    /// Verify that no record holds a negative balance
    Check,

    /// Export all records to CSV or JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl Cli {
    /// Resolve the configuration, with command-line overrides applied.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::resolve(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config = config.with_database(database);
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.load_config()?;

        let service = match self.command {
            Commands::Init => LedgerService::init(&config).await?,
            _ => LedgerService::connect(&config).await.with_context(|| {
                format!(
                    "Cannot open {} (run `tally init` first)",
                    config.database.display()
                )
            })?,
        };

        let result = run_command(&service, &config, self.command).await;
        service.close().await;
        result
    }
}

async fn run_command(service: &LedgerService, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            println!(
                "Database initialized: {} (table '{}')",
                config.database.display(),
                service.schema().table()
            );
        }

        Commands::List { format } => {
            let records = service.fetch_all().await?;
            match format {
                ListFormat::Table => print_table(service.schema(), &records),
                ListFormat::Json => {
                    write_json(service.schema(), &records, stdout().lock())?;
                }
                ListFormat::Csv => {
                    write_csv(service.schema(), &records, stdout().lock())?;
                }
            }
        }

        Commands::Show { id } => {
            let record = service.fetch_one(id).await?;
            print_record(service.schema(), &record);
        }

        Commands::Add { fields } => {
            let fields = parse_assignments(&fields)?;
            let record = service.insert(&fields).await?;
            println!("Record added: {}", record.id);
        }

        Commands::Update { id, fields } => {
            let fields = parse_assignments(&fields)?;
            service.update(id, &fields).await?;
            println!("Record updated: {}", id);
        }

        Commands::Delete { id } => {
            service.delete(id).await?;
            println!("Record deleted: {}", id);
        }

        Commands::Transfer { amount, from, to } => {
            let outcome = service.transfer(from, to, amount).await;
            if !outcome.success {
                anyhow::bail!(outcome.message);
            }
            println!("{}", outcome.message);
            let from_record = service.fetch_one(from).await?;
            let to_record = service.fetch_one(to).await?;
            let label = &service.schema().balance_column().name;
            println!("  {} {}: {}", from, label, from_record.balance);
            println!("  {} {}: {}", to, label, to_record.balance);
        }

        Commands::Check => run_check_command(service).await?,

        Commands::Export { output, format } => {
            let exporter = Exporter::new(service);

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(stdout()),
            };

            let count = match format {
                ExportFormat::Csv => exporter.export_csv(writer).await?,
                ExportFormat::Json => exporter.export_json(writer).await?,
            };

            if output.is_some() {
                eprintln!("Exported {} records", count);
            }
        }
    }

    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking table integrity...\n");

    let report = service.check_integrity().await?;

    println!("Records:       {}", report.record_count);
    println!("Total balance: {}", report.total_balance);
    println!();

    if report.is_healthy() {
        println!("Table is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Integrity check failed");
    }

    Ok(())
}

fn print_table(schema: &TableSchema, records: &[Record]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }

    let mut header = vec!["ID".to_string()];
    header.extend(schema.columns().iter().map(|c| c.name.to_string().to_uppercase()));

    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let mut row = vec![record.id.to_string()];
            row.extend(record.values(schema).iter().map(|v| v.to_string()));
            row
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(header[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", render(&header));
    println!("{}", "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    for row in &rows {
        println!("{}", render(row));
    }
}

fn print_record(schema: &TableSchema, record: &Record) {
    println!("Record {}", record.id);
    for (column, value) in schema.columns().iter().zip(record.values(schema)) {
        println!("  {:<16} {}", format!("{}:", column.name), value);
    }
}

/// Split `COLUMN=VALUE` arguments. Only the first `=` separates; the value
/// may itself contain `=` or be empty.
fn parse_assignments(args: &[String]) -> Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| {
            let (column, value) = arg
                .split_once('=')
                .with_context(|| format!("Expected COLUMN=VALUE, got '{}'", arg))?;
            let column = column.trim();
            if column.is_empty() {
                anyhow::bail!("Missing column name in '{}'", arg);
            }
            Ok((column.to_string(), value.to_string()))
        })
        .collect()
}
