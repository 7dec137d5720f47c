//! `SQLite` schema definitions for citizen-registry.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the citizens table.
///
/// `national_id` carries the uniqueness constraint that closes the race
/// between concurrent creates with the same key.
pub const CREATE_CITIZENS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS citizens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    national_id TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    full_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    occupations TEXT NOT NULL DEFAULT '[]',
    nationality TEXT NOT NULL,
    blood_group TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on email for lookups.
pub const CREATE_EMAIL_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_citizens_email ON citizens(email)
";

/// SQL statement to create an index on `created_at` for newest-first listing.
pub const CREATE_CREATED_AT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_citizens_created_at ON citizens(created_at DESC)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CITIZENS_TABLE,
    CREATE_EMAIL_INDEX,
    CREATE_CREATED_AT_INDEX,
    CREATE_METADATA_TABLE,
];

/// Columns selected for a full record, in `row_to_citizen` order.
pub const CITIZEN_COLUMNS: &str = "id, national_id, first_name, last_name, full_name, \
     date_of_birth, email, phone, occupations, nationality, blood_group, created_at, updated_at";
