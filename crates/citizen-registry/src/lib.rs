//! `citizen-registry` - A citizen record store with a JSON HTTP API
//!
//! This library provides request normalization, record validation, the
//! storage contract with its SQLite and in-memory backends, and the axum
//! router that exposes them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod record;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Citizen, CitizenInput, CitizenPatch, NewCitizen};
pub use storage::{CitizenStore, ListFilter, MemoryStore, RecordKey, SqliteStore};
