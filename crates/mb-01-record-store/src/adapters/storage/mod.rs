//! # Storage Adapters

mod csv_file;
mod memory;

pub use csv_file::CsvTableFile;
pub use memory::InMemoryTable;
