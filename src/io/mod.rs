// Reading and writing the record table outside the database.

pub mod export;

pub use export::Exporter;
