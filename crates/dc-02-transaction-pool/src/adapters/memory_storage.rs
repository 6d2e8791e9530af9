//! In-memory pool storage, for tests and nodes that do not persist the pool.

use std::collections::BTreeMap;

use shared_types::Id;

use crate::domain::{PersistedTransaction, PoolError, Result};
use crate::ports::PersistentPoolStorage;

#[derive(Debug, Default)]
pub struct InMemoryPoolStorage {
    records: BTreeMap<Id, PersistedTransaction>,
    closed: bool,
}

impl InMemoryPoolStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated storage, as left behind by a previous run.
    pub fn with_records(records: impl IntoIterator<Item = PersistedTransaction>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
            closed: false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(PoolError::Closed);
        }
        Ok(())
    }
}

impl PersistentPoolStorage for InMemoryPoolStorage {
    fn load_all(&mut self) -> Result<Vec<PersistedTransaction>> {
        self.ensure_open()?;
        let mut all: Vec<_> = self.records.values().cloned().collect();
        all.sort_by_key(|r| r.sequence);
        Ok(all)
    }

    fn bulk_add(&mut self, records: Vec<PersistedTransaction>) -> Result<()> {
        self.ensure_open()?;
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn bulk_remove_by_id(&mut self, ids: &[Id]) -> Result<()> {
        self.ensure_open()?;
        for id in ids {
            self.records.remove(id);
        }
        Ok(())
    }

    fn delete_all(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.records.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
