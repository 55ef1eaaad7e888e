//! Backing storage for reference entities.

use crate::error::{ProcessorError, Result};
use crate::models::{EntityAttributes, EntityId, EntityRecord, NaturalKey};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Result of a create-if-absent insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Created(EntityRecord),
    /// Another writer created the same `(key, era)` first; this is its record.
    Conflict(EntityRecord),
}

/// Persistent side of the registry. `(key, era)` is unique.
pub trait EntityStore: Send + Sync {
    /// Newest era stored for `key`.
    fn current(&self, key: &NaturalKey) -> Result<Option<EntityRecord>>;

    /// Create `(key, era)` unless it already exists, atomically.
    fn insert_if_absent(
        &self,
        key: &NaturalKey,
        era: u32,
        attributes: &EntityAttributes,
    ) -> Result<InsertOutcome>;

    /// Every stored record, ordered by identity.
    fn records(&self) -> Result<Vec<EntityRecord>>;
}

#[derive(Debug, Default)]
struct StoreInner {
    by_key: HashMap<NaturalKey, Vec<EntityRecord>>,
    next_id: u64,
}

/// Mutex-guarded store used for single-process runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with records from an earlier run.
    pub fn with_records(records: impl IntoIterator<Item = EntityRecord>) -> Self {
        let mut inner = StoreInner::default();
        for record in records {
            inner.next_id = inner.next_id.max(record.id.0 + 1);
            let eras = inner.by_key.entry(record.key.clone()).or_default();
            eras.push(record);
            eras.sort_by_key(|record| record.era);
        }
        Self {
            inner: Mutex::new(inner),
        }
    }

    /// Number of stored records across all keys and eras.
    pub fn len(&self) -> usize {
        self.lock()
            .map(|inner| inner.by_key.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreInner>> {
        self.inner
            .lock()
            .map_err(|_| ProcessorError::store("entity store lock poisoned"))
    }
}

impl EntityStore for InMemoryEntityStore {
    fn current(&self, key: &NaturalKey) -> Result<Option<EntityRecord>> {
        let inner = self.lock()?;
        Ok(inner.by_key.get(key).and_then(|eras| eras.last()).cloned())
    }

    fn insert_if_absent(
        &self,
        key: &NaturalKey,
        era: u32,
        attributes: &EntityAttributes,
    ) -> Result<InsertOutcome> {
        let mut inner = self.lock()?;
        let id = EntityId(inner.next_id);
        let eras = inner.by_key.entry(key.clone()).or_default();

        if let Some(existing) = eras.iter().find(|record| record.era == era) {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        if era as usize != eras.len() {
            return Err(ProcessorError::store(format!(
                "cannot create era {} of {} {}: {} eras exist",
                era,
                key.kind(),
                key,
                eras.len()
            )));
        }

        let record = EntityRecord {
            id,
            key: key.clone(),
            era,
            label: attributes.label.clone(),
            rate: attributes.rate,
        };
        eras.push(record.clone());
        inner.next_id += 1;

        debug!("Created {} {} era {} as #{}", key.kind(), key, era, id.0);
        Ok(InsertOutcome::Created(record))
    }

    fn records(&self) -> Result<Vec<EntityRecord>> {
        let inner = self.lock()?;
        let mut records: Vec<EntityRecord> = inner.by_key.values().flatten().cloned().collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }
}
