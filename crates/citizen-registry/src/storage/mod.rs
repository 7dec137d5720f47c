//! Storage layer for citizen-registry.
//!
//! [`CitizenStore`] is the persistence contract the HTTP layer depends on.
//! [`SqliteStore`] is the production adapter; [`MemoryStore`] is an
//! in-process implementation of the same contract for tests and demos.

mod memory;
pub mod migrations;
pub mod schema;
mod sqlite;

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

use crate::error::{Error, Result};
use crate::record::{Citizen, CitizenPatch, NewCitizen};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Current time, truncated to the precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so stored timestamps sort lexically.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// How a single record is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    /// The business key.
    NationalId(String),
    /// The storage-assigned record id.
    RecordId(i64),
}

impl RecordKey {
    /// Parse a storage record id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedKey`] unless `raw` is a positive decimal
    /// integer.
    pub fn parse_record_id(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::malformed_key(raw));
        }
        match trimmed.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self::RecordId(id)),
            _ => Err(Error::malformed_key(raw)),
        }
    }

    /// Check whether this key addresses the given record.
    #[must_use]
    pub fn matches(&self, citizen: &Citizen) -> bool {
        match self {
            Self::NationalId(national_id) => citizen.national_id == *national_id,
            Self::RecordId(id) => citizen.id == *id,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NationalId(national_id) => write!(f, "national id {national_id}"),
            Self::RecordId(id) => write!(f, "record {id}"),
        }
    }
}

/// Criteria for listing records. All set criteria must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    /// Exact national ID.
    pub national_id: Option<String>,
    /// Exact email.
    pub email: Option<String>,
    /// Case-insensitive substring of the full, first, or last name.
    pub name: Option<String>,
    /// Order by creation time, newest first. Otherwise insertion order.
    pub newest_first: bool,
}

impl ListFilter {
    /// Check whether a record satisfies this filter.
    #[must_use]
    pub fn matches(&self, citizen: &Citizen) -> bool {
        if let Some(national_id) = &self.national_id {
            if citizen.national_id != *national_id {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if citizen.email != *email {
                return false;
            }
        }
        if let Some(name) = &self.name {
            let needle = name.to_lowercase();
            return [&citizen.full_name, &citizen.first_name, &citizen.last_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        }
        true
    }
}

/// Persistence contract for citizen records.
///
/// Every operation is all-or-nothing. Implementations must enforce national
/// ID uniqueness atomically with insertion.
pub trait CitizenStore: Send + Sync {
    /// Short name of this backend (for logging).
    fn name(&self) -> &'static str;

    /// Insert a new record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the national ID is already taken.
    fn create(&self, citizen: NewCitizen) -> Result<Citizen>;

    /// List records matching a filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn list(&self, filter: &ListFilter) -> Result<Vec<Citizen>>;

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing matches the key.
    fn get(&self, key: &RecordKey) -> Result<Citizen>;

    /// Merge a patch onto one record and return the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing matches the key.
    fn update(&self, key: &RecordKey, patch: &CitizenPatch) -> Result<Citizen>;

    /// Remove one record and return what was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if nothing matches the key.
    fn delete(&self, key: &RecordKey) -> Result<Citizen>;

    /// Count stored records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn count(&self) -> Result<u64>;
}
