use crate::domain::errors::StoreError;
use crate::domain::table::RecordTable;
use crate::ports::outbound::TableStorage;

/// Volatile table storage for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryTable {
    table: RecordTable,
    saves: u64,
}

impl InMemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts with `table` already persisted.
    pub fn seeded(table: RecordTable) -> Self {
        Self { table, saves: 0 }
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> u64 {
        self.saves
    }
}

impl TableStorage for InMemoryTable {
    fn load(&self) -> Result<RecordTable, StoreError> {
        Ok(self.table.clone())
    }

    fn save(&mut self, table: &RecordTable) -> Result<(), StoreError> {
        self.table = table.clone();
        self.saves += 1;
        Ok(())
    }
}
