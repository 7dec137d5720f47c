//! `SQLite` implementation of [`CitizenStore`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{Citizen, CitizenPatch, NewCitizen};

use super::schema::CITIZEN_COLUMNS;
use super::{format_timestamp, migrations, now, CitizenStore, ListFilter, RecordKey};

/// Citizen storage backed by a single `SQLite` connection.
///
/// The connection sits behind a mutex so the store can be shared across
/// request handlers.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let mut conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&mut conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&mut conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Fetch the record for a key on an open connection.
    fn find(conn: &Connection, key: &RecordKey) -> Result<Option<Citizen>> {
        let (column, value) = match key {
            RecordKey::NationalId(national_id) => ("national_id", Value::Text(national_id.clone())),
            RecordKey::RecordId(id) => ("id", Value::Integer(*id)),
        };
        let sql = format!("SELECT {CITIZEN_COLUMNS} FROM citizens WHERE {column} = ?1");
        let citizen = conn
            .query_row(&sql, [value], Self::row_to_citizen)
            .optional()?;
        Ok(citizen)
    }

    /// Convert a database row to a Citizen struct.
    fn row_to_citizen(row: &rusqlite::Row) -> rusqlite::Result<Citizen> {
        let occupations_json: String = row.get(8)?;
        let occupations: Vec<String> = serde_json::from_str(&occupations_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

        Ok(Citizen {
            id: row.get(0)?,
            national_id: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            full_name: row.get(4)?,
            date_of_birth: row.get(5)?,
            email: row.get(6)?,
            phone: row.get(7)?,
            occupations,
            nationality: row.get(9)?,
            blood_group: row.get(10)?,
            created_at: parse_timestamp(row, 11)?,
            updated_at: parse_timestamp(row, 12)?,
        })
    }
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Whether an error is a UNIQUE constraint violation.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl CitizenStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create(&self, citizen: NewCitizen) -> Result<Citizen> {
        let conn = self.conn()?;
        let created_at = now();
        let timestamp = format_timestamp(created_at);
        let occupations = serde_json::to_string(&citizen.occupations)?;

        // The UNIQUE constraint on national_id is the duplicate check.
        let inserted = conn.execute(
            r"
            INSERT INTO citizens (
                national_id, first_name, last_name, full_name, date_of_birth,
                email, phone, occupations, nationality, blood_group,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            ",
            params![
                citizen.national_id,
                citizen.first_name,
                citizen.last_name,
                citizen.full_name,
                citizen.date_of_birth,
                citizen.email,
                citizen.phone,
                occupations,
                citizen.nationality,
                citizen.blood_group,
                timestamp,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!("Rejected duplicate national id {}", citizen.national_id);
                return Err(Error::conflict(citizen.national_id));
            }
            Err(err) => return Err(err.into()),
        }

        let id = conn.last_insert_rowid();
        debug!("Inserted citizen with id {}", id);
        Ok(Citizen::from_new(id, citizen, created_at))
    }

    fn list(&self, filter: &ListFilter) -> Result<Vec<Citizen>> {
        let conn = self.conn()?;
        let order = if filter.newest_first {
            "created_at DESC, id DESC"
        } else {
            "id ASC"
        };
        let sql = format!(
            r"
            SELECT {CITIZEN_COLUMNS} FROM citizens
            WHERE (?1 IS NULL OR national_id = ?1)
              AND (?2 IS NULL OR email = ?2)
            ORDER BY {order}
            "
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.national_id, filter.email],
            Self::row_to_citizen,
        )?;

        // SQLite's LIKE and lower() only fold ASCII, so the name match runs here.
        let mut citizens = Vec::new();
        for row in rows {
            let citizen = row?;
            if filter.matches(&citizen) {
                citizens.push(citizen);
            }
        }

        Ok(citizens)
    }

    fn get(&self, key: &RecordKey) -> Result<Citizen> {
        let conn = self.conn()?;
        Self::find(&conn, key)?.ok_or(Error::NotFound)
    }

    fn update(&self, key: &RecordKey, patch: &CitizenPatch) -> Result<Citizen> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut citizen = Self::find(&tx, key)?.ok_or(Error::NotFound)?;
        citizen.apply(patch, now());

        tx.execute(
            r"
            UPDATE citizens SET
                first_name = ?2, last_name = ?3, full_name = ?4, date_of_birth = ?5,
                email = ?6, phone = ?7, occupations = ?8, nationality = ?9,
                blood_group = ?10, updated_at = ?11
            WHERE id = ?1
            ",
            params![
                citizen.id,
                citizen.first_name,
                citizen.last_name,
                citizen.full_name,
                citizen.date_of_birth,
                citizen.email,
                citizen.phone,
                serde_json::to_string(&citizen.occupations)?,
                citizen.nationality,
                citizen.blood_group,
                format_timestamp(citizen.updated_at),
            ],
        )?;
        tx.commit()?;

        debug!("Updated citizen with id {}", citizen.id);
        Ok(citizen)
    }

    fn delete(&self, key: &RecordKey) -> Result<Citizen> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let citizen = Self::find(&tx, key)?.ok_or(Error::NotFound)?;
        tx.execute("DELETE FROM citizens WHERE id = ?1", [citizen.id])?;
        tx.commit()?;

        debug!("Deleted citizen with id {}", citizen.id);
        Ok(citizen)
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM citizens", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| Error::internal(format!("negative row count {count}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;

    fn create_test_store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("failed to create test store")
    }

    #[test]
    fn test_open_in_memory() {
        let store = SqliteStore::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_create_then_get_round_trips() {
        contract::create_then_get_round_trips(&create_test_store());
    }

    #[test]
    fn test_duplicate_national_id_conflicts() {
        contract::duplicate_national_id_conflicts(&create_test_store());
    }

    #[test]
    fn test_update_merges_partial_fields() {
        contract::update_merges_partial_fields(&create_test_store());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        contract::update_missing_is_not_found(&create_test_store());
    }

    #[test]
    fn test_delete_then_get_is_not_found() {
        contract::delete_then_get_is_not_found(&create_test_store());
    }

    #[test]
    fn test_list_filters() {
        contract::list_filters(&create_test_store());
    }

    #[test]
    fn test_list_orders() {
        contract::list_orders(&create_test_store());
    }

    #[test]
    fn test_unique_constraint_without_application_check() {
        let store = create_test_store();
        store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();

        let conn = store.conn().unwrap();
        let err = conn
            .execute(
                "INSERT INTO citizens (national_id, first_name, last_name, full_name, \
                 date_of_birth, email, phone, nationality, blood_group, created_at, updated_at) \
                 VALUES ('A1', 'x', 'x', 'x', 'x', 'x', 'x', 'x', 'x', 'x', 'x')",
                [],
            )
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn test_corrupt_occupations_surface_as_error() {
        let store = create_test_store();
        store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();
        store
            .conn()
            .unwrap()
            .execute("UPDATE citizens SET occupations = 'not json'", [])
            .unwrap();

        let err = store
            .get(&RecordKey::NationalId("A1".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::DatabaseQuery(_)));
    }

    #[test]
    fn test_underscore_in_name_matches_literally() {
        let store = create_test_store();
        store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();

        let results = store
            .list(&ListFilter {
                name: Some("J_ne".to_string()),
                ..ListFilter::default()
            })
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_count() {
        let store = create_test_store();
        assert_eq!(store.count().unwrap(), 0);

        store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();
        store
            .create(contract::new_citizen("B2", "John", "Smith"))
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_update_by_record_id_recomputes_full_name() {
        let store = create_test_store();
        let created = store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();

        let patch = CitizenPatch {
            first_name: Some("Janet".to_string()),
            ..CitizenPatch::default()
        };
        let updated = store
            .update(&RecordKey::RecordId(created.id), &patch)
            .unwrap();

        assert_eq!(updated.full_name, "Janet Doe");
        assert_eq!(updated.national_id, "A1");
    }

    #[test]
    fn test_delete_by_record_id() {
        let store = create_test_store();
        let created = store
            .create(contract::new_citizen("A1", "Jane", "Doe"))
            .unwrap();

        let deleted = store.delete(&RecordKey::RecordId(created.id)).unwrap();
        assert_eq!(deleted.national_id, "A1");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_unicode_fields() {
        let store = create_test_store();
        let mut new = contract::new_citizen("A1", "Jane", "Doe");
        new.full_name = "ජේන් ඩෝ".to_string();
        new.occupations = vec!["ගුරු".to_string()];

        store.create(new).unwrap();
        let fetched = store
            .get(&RecordKey::NationalId("A1".to_string()))
            .unwrap();
        assert_eq!(fetched.full_name, "ජේන් ඩෝ");
        assert_eq!(fetched.occupations, vec!["ගුරු".to_string()]);
    }

    #[test]
    fn test_path() {
        let store = create_test_store();
        assert_eq!(store.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_file_based_persists() {
        let db_path = std::env::temp_dir().join(format!(
            "citizen_registry_test_{}.db",
            std::process::id()
        ));

        {
            let store = SqliteStore::open(&db_path).unwrap();
            store
                .create(contract::new_citizen("A1", "Jane", "Doe"))
                .unwrap();
            assert_eq!(store.path(), db_path);
        }

        let reopened = SqliteStore::open(&db_path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);

        drop(reopened);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!(
            "citizen_registry_test_{}",
            std::process::id()
        ));
        let nested_path = root.join("nested/citizens.db");
        let _ = std::fs::remove_dir_all(&root);

        let store = SqliteStore::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(store);
        let _ = std::fs::remove_dir_all(&root);
    }
}
