//! In-process candidate storage.

use std::sync::{Arc, OnceLock};

use anyhow::Context as _;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Map, Value};
use tracing::debug;

use super::Candidate;
use super::repository::{CandidateRepository, StorageError};

static SHARED: OnceLock<Arc<MemoryCandidateRepository>> = OnceLock::new();

/// Candidate table backed by two concurrent maps: records by id, and the
/// composite-key index pointing at the owning id.
#[derive(Debug, Default)]
pub struct MemoryCandidateRepository {
    table: String,
    by_id: DashMap<String, Candidate>,
    by_composite: DashMap<String, String>,
}

impl MemoryCandidateRepository {
    pub fn new(table: impl Into<String>) -> Self {
        Self { table: table.into(), ..Self::default() }
    }

    /// The process-wide instance, created on first use.
    ///
    /// Concurrent first calls race safely; later calls ignore `table` and
    /// return the same store.
    pub fn shared(table: &str) -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new(table))))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    fn reindex(&self, id: &str, old_key: &str, new_key: &str) {
        if old_key == new_key {
            return;
        }
        self.by_composite.remove_if(old_key, |_, owner| owner == id);
        self.by_composite.insert(new_key.to_owned(), id.to_owned());
    }
}

#[async_trait]
impl CandidateRepository for MemoryCandidateRepository {
    async fn get_by_id(&self, id: &str) -> Result<Option<Candidate>, StorageError> {
        Ok(self.by_id.get(id).map(|c| c.clone()))
    }

    async fn get_by_composite_key(&self, key: &str) -> Result<Option<Candidate>, StorageError> {
        let Some(id) = self.by_composite.get(key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.by_id.get(&id).map(|c| c.clone()))
    }

    async fn create(&self, candidate: Candidate) -> Result<(), StorageError> {
        let key = candidate.composite_key.clone();
        let id = candidate.id.clone();

        // The index entry is held until the record is in place.
        let replaced = match self.by_composite.entry(key.clone()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict(key)),
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
                self.by_id.insert(id.clone(), candidate)
            }
        };

        // Same id under another composite key: the old index entry is stale.
        if let Some(old) = replaced {
            if old.composite_key != key {
                self.by_composite.remove_if(&old.composite_key, |_, owner| *owner == id);
            }
        }

        debug!(table = %self.table, id = %id, "candidate stored");
        Ok(())
    }

    async fn update(&self, id: &str, fields: Map<String, Value>) -> Result<(), StorageError> {
        if id.is_empty() {
            return Err(StorageError::MissingId);
        }
        let fields: Map<String, Value> = fields.into_iter().filter(|(_, v)| !v.is_null()).collect();
        if fields.is_empty() {
            return Ok(());
        }

        let Some(mut record) = self.by_id.get_mut(id) else {
            return Ok(());
        };

        let mut merged = serde_json::to_value(&*record).context("encode candidate")?;
        if let Value::Object(object) = &mut merged {
            object.extend(fields);
        }
        let updated: Candidate = serde_json::from_value(merged).context("apply candidate update")?;

        let old_key = std::mem::replace(&mut *record, updated).composite_key;
        let new_key = record.composite_key.clone();
        drop(record);

        self.reindex(id, &old_key, &new_key);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        if let Some((_, old)) = self.by_id.remove(id) {
            self.by_composite.remove_if(&old.composite_key, |_, owner| owner == id);
        }
        Ok(())
    }
}
