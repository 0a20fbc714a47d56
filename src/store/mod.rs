//! Store module: the persistence seam for capsules.
//!
//! The document store proper lives outside this crate. [`CapsuleStore`] is the
//! contract the core needs from it, and [`MemoryStore`] is an in-process
//! implementation that runs the encryption hook on every save the same way a
//! database adapter would.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::capsule::{self, Capsule, CapsuleView, DirtyFields};
use crate::crypto::CipherKey;
use crate::error::StoreError;

pub trait CapsuleStore: Send + Sync {
    /// The persisted record, sealed fields still encrypted.
    fn get(&self, id: &str) -> Result<Option<Capsule>, StoreError>;

    /// Persist `capsule`, sealing modified fields first. Returns the stored form.
    fn save(&self, capsule: Capsule) -> Result<Capsule, StoreError>;

    fn list(&self) -> Result<Vec<Capsule>, StoreError>;

    /// Key used by the store's hooks.
    fn key(&self) -> &CipherKey;

    /// Safe projection of one capsule.
    fn view(&self, id: &str) -> Result<Option<CapsuleView>, StoreError> {
        Ok(self.get(id)?.map(|c| capsule::project(&c, self.key())))
    }

    /// Safe projections of every capsule. One bad record never fails the batch.
    fn view_all(&self) -> Result<Vec<CapsuleView>, StoreError> {
        let key = self.key();
        Ok(self.list()?.iter().map(|c| capsule::project(c, key)).collect())
    }
}

impl<T: CapsuleStore + ?Sized> CapsuleStore for Arc<T> {
    fn get(&self, id: &str) -> Result<Option<Capsule>, StoreError> {
        (**self).get(id)
    }

    fn save(&self, capsule: Capsule) -> Result<Capsule, StoreError> {
        (**self).save(capsule)
    }

    fn list(&self) -> Result<Vec<Capsule>, StoreError> {
        (**self).list()
    }

    fn key(&self) -> &CipherKey {
        (**self).key()
    }
}

/// Last-writer-wins in-memory store.
pub struct MemoryStore {
    key: CipherKey,
    records: RwLock<HashMap<String, Capsule>>,
}

impl MemoryStore {
    pub fn new(key: CipherKey) -> Self {
        Self {
            key,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl CapsuleStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Capsule>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn save(&self, mut capsule: Capsule) -> Result<Capsule, StoreError> {
        // Seal outside the write lock; encryption is pure CPU work
        let dirty = match self.records.read().get(&capsule.id) {
            Some(stored) => DirtyFields::between(stored, &capsule),
            None => DirtyFields::all(),
        };
        capsule::seal_for_write(&mut capsule, dirty, &self.key).map_err(|source| {
            StoreError::Seal {
                id: capsule.id.clone(),
                source,
            }
        })?;

        self.records
            .write()
            .insert(capsule.id.clone(), capsule.clone());
        Ok(capsule)
    }

    fn list(&self) -> Result<Vec<Capsule>, StoreError> {
        let mut all: Vec<Capsule> = self.records.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    fn key(&self) -> &CipherKey {
        &self.key
    }
}
