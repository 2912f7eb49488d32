use crate::adapters::lock::StoreLock;
use crate::domain::entities::{MatchPreferences, Record, PREFERENCE_COLUMNS, RECORD_COLUMNS};
use crate::domain::errors::StoreError;
use crate::domain::table::RecordTable;
use crate::ports::outbound::TableStorage;
use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// CSV file storage in the persisted layout shared with the scorer.
///
/// Holds an exclusive `StoreLock` on `<path>.lock` for its whole lifetime.
pub struct CsvTableFile {
    path: PathBuf,
    _lock: StoreLock,
}

impl CsvTableFile {
    /// Open (or prepare to create) the store file, taking the process lock.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        Self::ensure_parent(&path)?;
        let lock = StoreLock::acquire(&StoreLock::path_for(&path))?;
        Ok(Self { path, _lock: lock })
    }

    /// Like `open`, with an explicit lock wait.
    pub fn open_with_lock_timeout<P: AsRef<Path>>(
        path: P,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        Self::ensure_parent(&path)?;
        let lock = StoreLock::acquire_with_timeout(&StoreLock::path_for(&path), lock_timeout)?;
        Ok(Self { path, _lock: lock })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(StoreError::io)
            }
            _ => Ok(()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn parse_rows(rows: &[csv::StringRecord]) -> Result<RecordTable, StoreError> {
        if rows.is_empty() {
            return Ok(RecordTable::default());
        }
        let [request_header, request_row, record_header, record_rows @ ..] = rows else {
            return Err(StoreError::Malformed(format!(
                "expected at least 3 header rows, found {}",
                rows.len()
            )));
        };

        Self::expect_header(request_header, &PREFERENCE_COLUMNS)?;
        Self::expect_header(record_header, &RECORD_COLUMNS)?;

        let cells: Vec<&str> = request_row.iter().collect();
        let preferences = MatchPreferences::from_cells(&cells)?;

        let records = record_rows
            .iter()
            .map(|row| {
                let cells: Vec<&str> = row.iter().collect();
                Record::from_cells(&cells)
            })
            .collect::<Result<Vec<_>, _>>()?;

        RecordTable::new(preferences, records)
    }

    fn expect_header(row: &csv::StringRecord, expected: &[&str]) -> Result<(), StoreError> {
        if row.iter().eq(expected.iter().copied()) {
            Ok(())
        } else {
            Err(StoreError::Malformed(format!(
                "header {:?} does not match {:?}",
                row.iter().collect::<Vec<_>>(),
                expected
            )))
        }
    }
}

impl TableStorage for CsvTableFile {
    fn load(&self) -> Result<RecordTable, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "No store file yet, starting empty");
            return Ok(RecordTable::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(StoreError::io)?;
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::io)?;

        let table = Self::parse_rows(&rows)?;
        info!(
            path = %self.path.display(),
            records = table.len(),
            "Loaded record store"
        );
        Ok(table)
    }

    fn save(&mut self, table: &RecordTable) -> Result<(), StoreError> {
        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(StoreError::io)?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);

        writer.write_record(PREFERENCE_COLUMNS).map_err(StoreError::io)?;
        match table.preferences() {
            Some(preferences) => writer.write_record(preferences.to_cells()),
            None => writer.write_record([""; 10]),
        }
        .map_err(StoreError::io)?;
        writer.write_record(RECORD_COLUMNS).map_err(StoreError::io)?;
        for record in table.records() {
            writer.write_record(record.to_cells()).map_err(StoreError::io)?;
        }

        // Write atomically via temp file
        let file = writer.into_inner().map_err(StoreError::io)?;
        file.sync_all().map_err(StoreError::io)?;
        std::fs::rename(&temp_path, &self.path).map_err(StoreError::io)?;

        debug!(path = %self.path.display(), records = table.len(), "Store file replaced");
        Ok(())
    }
}
