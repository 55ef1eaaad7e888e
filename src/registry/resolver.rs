//! Caching get-or-create resolver.
//!
//! The cache is append-only: a key's list of eras only ever grows, so a
//! cached identity never changes once handed out. Misses fall through to the
//! store's create-if-absent insert; a resolver that loses an insert race
//! adopts the winner's record.

use super::store::{EntityStore, InMemoryEntityStore, InsertOutcome};
use super::EntityResolver;
use crate::error::{ProcessorError, Result};
use crate::models::{EntityAttributes, EntityRecord, EntityRef, NaturalKey};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Debug)]
pub struct CachingResolver<S = InMemoryEntityStore> {
    store: Arc<S>,
    cache: RwLock<HashMap<NaturalKey, Vec<EntityRecord>>>,
}

impl CachingResolver<InMemoryEntityStore> {
    /// Resolver over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryEntityStore::new()))
    }
}

impl<S: EntityStore> CachingResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn cached(&self, key: &NaturalKey) -> Result<Option<EntityRecord>> {
        let cache = self
            .cache
            .read()
            .map_err(|_| ProcessorError::store("resolver cache lock poisoned"))?;
        Ok(cache.get(key).and_then(|eras| eras.last()).cloned())
    }

    fn remember(&self, record: &EntityRecord) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| ProcessorError::store("resolver cache lock poisoned"))?;
        let eras = cache.entry(record.key.clone()).or_default();
        if !eras.iter().any(|known| known.id == record.id) {
            eras.push(record.clone());
            eras.sort_by_key(|known| known.era);
        }
        Ok(())
    }
}

/// Motors and boats are renumbered periodically. A stored rate that is set
/// and non-zero, met with a caller rate of exactly zero, marks the start of
/// a new numbering era.
fn starts_new_era(existing: &EntityRecord, attributes: &EntityAttributes) -> bool {
    existing.key.is_equipment()
        && existing.rate.is_some_and(|rate| rate != 0.0)
        && attributes.rate == Some(0.0)
}

impl<S: EntityStore> EntityResolver for CachingResolver<S> {
    fn resolve(&self, key: &NaturalKey, attributes: &EntityAttributes) -> Result<EntityRef> {
        if let Some(record) = self.cached(key)? {
            if !starts_new_era(&record, attributes) {
                return Ok(record.entity_ref());
            }
        }

        let era = match self.store.current(key)? {
            Some(existing) if !starts_new_era(&existing, attributes) => {
                self.remember(&existing)?;
                return Ok(existing.entity_ref());
            }
            Some(existing) => existing.era + 1,
            None => 0,
        };

        let record = match self.store.insert_if_absent(key, era, attributes)? {
            InsertOutcome::Created(record) => record,
            InsertOutcome::Conflict(winner) => {
                debug!(
                    "Lost create race for {} {}; using #{}",
                    key.kind(),
                    key,
                    winner.id.0
                );
                winner
            }
        };
        self.remember(&record)?;
        Ok(record.entity_ref())
    }
}
