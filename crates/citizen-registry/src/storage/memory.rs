//! In-memory implementation of [`CitizenStore`].

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{Citizen, CitizenPatch, NewCitizen};

use super::{now, CitizenStore, ListFilter, RecordKey};

#[derive(Debug, Default)]
struct Records {
    next_id: i64,
    by_id: BTreeMap<i64, Citizen>,
}

impl Records {
    fn find_id(&self, key: &RecordKey) -> Option<i64> {
        match key {
            RecordKey::RecordId(id) => self.by_id.contains_key(id).then_some(*id),
            RecordKey::NationalId(_) => self
                .by_id
                .values()
                .find(|citizen| key.matches(citizen))
                .map(|citizen| citizen.id),
        }
    }
}

/// Citizen storage held in process memory.
///
/// Nothing is persisted. The uniqueness check and the insert happen under
/// one lock, so the national ID constraint holds under concurrent use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Records>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<MutexGuard<'_, Records>> {
        self.records
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

impl CitizenStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn create(&self, citizen: NewCitizen) -> Result<Citizen> {
        let mut records = self.records()?;
        let key = RecordKey::NationalId(citizen.national_id.clone());
        if records.find_id(&key).is_some() {
            return Err(Error::conflict(citizen.national_id));
        }

        records.next_id += 1;
        let id = records.next_id;
        let stored = Citizen::from_new(id, citizen, now());
        records.by_id.insert(id, stored.clone());
        debug!("Inserted citizen with id {}", id);
        Ok(stored)
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<Citizen>> {
        let records = self.records()?;
        let mut citizens: Vec<Citizen> = records
            .by_id
            .values()
            .filter(|citizen| filter.matches(citizen))
            .cloned()
            .collect();
        if filter.newest_first {
            citizens.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        }
        Ok(citizens)
    }

    fn get(&self, key: &RecordKey) -> Result<Citizen> {
        let records = self.records()?;
        records
            .find_id(key)
            .and_then(|id| records.by_id.get(&id))
            .cloned()
            .ok_or(Error::NotFound)
    }

    fn update(&self, key: &RecordKey, patch: &CitizenPatch) -> Result<Citizen> {
        let mut records = self.records()?;
        let id = records.find_id(key).ok_or(Error::NotFound)?;
        let citizen = records.by_id.get_mut(&id).ok_or(Error::NotFound)?;
        citizen.apply(patch, now());
        Ok(citizen.clone())
    }

    fn delete(&self, key: &RecordKey) -> Result<Citizen> {
        let mut records = self.records()?;
        let id = records.find_id(key).ok_or(Error::NotFound)?;
        records.by_id.remove(&id).ok_or(Error::NotFound)
    }

    fn count(&self) -> Result<u64> {
        let records = self.records()?;
        Ok(records.by_id.len() as u64)
    }
}
