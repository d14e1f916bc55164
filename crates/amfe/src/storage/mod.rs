//! Local storage for matrices.
//!
//! This module provides `SQLite`-based persistent storage used when working
//! offline. It mirrors the backend's matrix resources so the rest of the
//! crate can use either through [`MatrixStore`].

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::{Collection, MatrixPayload, MatrixRecord, MatrixStore, Page};

/// Timestamp format of the `created_at`/`updated_at` columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, data, created_by, created_at, updated_at FROM matrices";

/// Hash of a serialized document, stored to detect unchanged saves.
pub(crate) fn content_hash(data: &str) -> String {
    blake3::hash(data.as_bytes()).to_hex().to_string()
}

/// Storage engine for matrices.
///
/// The connection sits behind a mutex so the store can be shared across
/// tasks; every operation holds the lock for a single statement or
/// transaction.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
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
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

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

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a matrix and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert(&self, collection: Collection, payload: &MatrixPayload) -> Result<MatrixRecord> {
        let data = serde_json::to_string(&payload.data)?;
        let now = now();
        let conn = self.conn();
        conn.execute(
            r"
            INSERT INTO matrices
                (collection, name, description, data, content_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ",
            params![
                collection.name(),
                payload.name,
                payload.description,
                data,
                content_hash(&data),
                now,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(%collection, id, "inserted matrix");
        fetch(&conn, collection, id)?.ok_or(Error::NotFound { what: "matrix", id })
    }

    /// Get a matrix by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, collection: Collection, id: i64) -> Result<Option<MatrixRecord>> {
        fetch(&self.conn(), collection, id)
    }

    /// List matrices of a collection in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self, collection: Collection, page: Page) -> Result<Vec<MatrixRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE collection = ?1 ORDER BY id LIMIT ?2 OFFSET ?3"
        ))?;
        let records = stmt
            .query_map(
                params![collection.name(), page.limit, page.skip],
                row_to_record,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Replace a matrix's name, description and document.
    ///
    /// Returns `None` if no such matrix exists. Saving identical content
    /// leaves `updated_at` untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn replace(
        &self,
        collection: Collection,
        id: i64,
        payload: &MatrixPayload,
    ) -> Result<Option<MatrixRecord>> {
        let data = serde_json::to_string(&payload.data)?;
        let hash = content_hash(&data);
        let conn = self.conn();

        let stored: Option<(String, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT name, description, content_hash FROM matrices WHERE collection = ?1 AND id = ?2",
                params![collection.name(), id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((name, description, stored_hash)) = stored else {
            return Ok(None);
        };

        if name == payload.name
            && description == payload.description
            && stored_hash.as_deref() == Some(hash.as_str())
        {
            debug!(%collection, id, "matrix unchanged");
        } else {
            conn.execute(
                r"
                UPDATE matrices
                SET name = ?1, description = ?2, data = ?3, content_hash = ?4, updated_at = ?5
                WHERE collection = ?6 AND id = ?7
                ",
                params![
                    payload.name,
                    payload.description,
                    data,
                    hash,
                    now(),
                    collection.name(),
                    id,
                ],
            )?;
            debug!(%collection, id, "updated matrix");
        }
        fetch(&conn, collection, id)
    }

    /// Delete a matrix by ID.
    ///
    /// Returns `true` if a matrix was deleted, `false` if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn remove(&self, collection: Collection, id: i64) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM matrices WHERE collection = ?1 AND id = ?2",
            params![collection.name(), id],
        )?;
        if affected > 0 {
            info!(%collection, id, "deleted matrix");
        }
        Ok(affected > 0)
    }
}

#[async_trait]
impl MatrixStore for Storage {
    async fn list(&self, collection: Collection, page: Page) -> Result<Vec<MatrixRecord>> {
        Storage::list(self, collection, page)
    }

    async fn get(&self, collection: Collection, id: i64) -> Result<MatrixRecord> {
        Storage::get(self, collection, id)?.ok_or(Error::NotFound { what: "matrix", id })
    }

    async fn create(
        &self,
        collection: Collection,
        payload: &MatrixPayload,
    ) -> Result<MatrixRecord> {
        self.insert(collection, payload)
    }

    async fn update(
        &self,
        collection: Collection,
        id: i64,
        payload: &MatrixPayload,
    ) -> Result<MatrixRecord> {
        self.replace(collection, id, payload)?
            .ok_or(Error::NotFound { what: "matrix", id })
    }

    async fn delete(&self, collection: Collection, id: i64) -> Result<()> {
        if self.remove(collection, id)? {
            Ok(())
        } else {
            Err(Error::NotFound { what: "matrix", id })
        }
    }
}

fn now() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn fetch(conn: &Connection, collection: Collection, id: i64) -> Result<Option<MatrixRecord>> {
    let record = conn
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE collection = ?1 AND id = ?2"),
            params![collection.name(), id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Convert a database row to a record.
fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MatrixRecord> {
    let data: String = row.get(3)?;
    let data = serde_json::from_str(&data)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

    Ok(MatrixRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        data,
        created_by: row.get(4)?,
        created_at: parse_timestamp(row, 5)?,
        updated_at: parse_timestamp(row, 6)?,
    })
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FailurePath, MatrixDocument, ScoreField};
    use crate::legacy::LegacyAssessment;
    use crate::rpn::Score;
    use crate::store::{self, MatrixData};

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn payload(name: &str) -> MatrixPayload {
        MatrixPayload {
            name: name.to_string(),
            description: Some("test".to_string()),
            data: serde_json::to_value(MatrixDocument::default()).unwrap(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
        assert_eq!(storage.unwrap().path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_insert_and_get() {
        let storage = create_test_storage();
        let record = storage.insert(Collection::Modular, &payload("UCI")).unwrap();
        assert_eq!(record.name, "UCI");
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.created_by.is_none());

        let fetched = storage.get(Collection::Modular, record.id).unwrap().unwrap();
        assert_eq!(fetched, record);
    }

    #[test]
    fn test_collections_are_separate() {
        let storage = create_test_storage();
        let record = storage.insert(Collection::Modular, &payload("UCI")).unwrap();

        assert!(storage.get(Collection::Legacy, record.id).unwrap().is_none());
        assert_eq!(storage.list(Collection::Modular, Page::default()).unwrap().len(), 1);
        assert_eq!(storage.list(Collection::Legacy, Page::default()).unwrap().len(), 0);
        assert!(!storage.remove(Collection::Legacy, record.id).unwrap());
    }

    #[test]
    fn test_list_pages() {
        let storage = create_test_storage();
        for i in 0..5 {
            storage
                .insert(Collection::Modular, &payload(&format!("M{i}")))
                .unwrap();
        }

        let all = storage.list(Collection::Modular, Page::default()).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].name, "M0");

        let page = storage
            .list(Collection::Modular, Page { skip: 2, limit: 2 })
            .unwrap();
        let names: Vec<_> = page.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["M2", "M3"]);

        assert!(storage
            .list(Collection::Modular, Page::first(0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_replace() {
        let storage = create_test_storage();
        let record = storage.insert(Collection::Modular, &payload("UCI")).unwrap();

        let mut changed = payload("UCI Pediátrica");
        changed.description = None;
        let updated = storage
            .replace(Collection::Modular, record.id, &changed)
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "UCI Pediátrica");
        assert!(updated.description.is_none());
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= record.updated_at);

        assert!(storage
            .replace(Collection::Modular, 999, &changed)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_replace_unchanged_keeps_timestamp() {
        let storage = create_test_storage();
        let unchanged = payload("UCI");
        let record = storage.insert(Collection::Modular, &unchanged).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let again = storage
            .replace(Collection::Modular, record.id, &unchanged)
            .unwrap()
            .unwrap();
        assert_eq!(again.updated_at, record.updated_at);
        assert_eq!(again.data, unchanged.data);

        let renamed = MatrixPayload {
            name: "UCI norte".to_string(),
            ..unchanged
        };
        std::thread::sleep(std::time::Duration::from_millis(5));
        let moved = storage
            .replace(Collection::Modular, record.id, &renamed)
            .unwrap()
            .unwrap();
        assert!(moved.updated_at > record.updated_at);
    }

    #[test]
    fn test_remove() {
        let storage = create_test_storage();
        let record = storage.insert(Collection::Legacy, &payload("x")).unwrap();
        assert!(storage.remove(Collection::Legacy, record.id).unwrap());
        assert!(storage.get(Collection::Legacy, record.id).unwrap().is_none());
        assert!(!storage.remove(Collection::Legacy, record.id).unwrap());
    }

    #[tokio::test]
    async fn test_store_trait_not_found() {
        let storage = create_test_storage();
        let store: &dyn MatrixStore = &storage;

        assert!(matches!(
            store.get(Collection::Modular, 42).await,
            Err(Error::NotFound { id: 42, .. })
        ));
        assert!(matches!(
            store.update(Collection::Modular, 42, &payload("x")).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            store.delete(Collection::Modular, 42).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_document_round_trip() {
        let storage = create_test_storage();
        let mut doc = MatrixDocument::default();
        doc.header.service = "Urgencias".to_string();
        doc.header.equipment = "Desfibrilador".to_string();
        let (pid, sid, fid) = {
            let p = &doc.processes.processes()[0];
            let s = &p.subprocesses[0];
            (p.id.clone(), s.id.clone(), s.failures[0].id.clone())
        };
        let path = FailurePath::new(pid.as_str(), sid.as_str(), fid);
        doc.processes.rename_process(&pid, "Atención").unwrap();
        doc.processes
            .set_score(&path, ScoreField::Severity, Score::new(5).unwrap())
            .unwrap();
        doc.processes
            .set_score(&path, ScoreField::Detectability, Score::new(3).unwrap())
            .unwrap();
        doc.processes.add_subprocess(&pid).unwrap();

        let created = store::create(
            &storage,
            &MatrixPayload {
                name: "Urgencias".to_string(),
                description: None,
                data: doc.clone(),
            },
        )
        .await
        .unwrap();

        let loaded = store::load::<MatrixDocument>(&storage, created.id)
            .await
            .unwrap();
        assert_eq!(loaded.data, doc);
        assert_eq!(loaded.data.processes.failure(&path).unwrap().rpn(), 15);
    }

    #[tokio::test]
    async fn test_legacy_round_trip() {
        let storage = create_test_storage();
        let mut assessment = LegacyAssessment {
            equipment: "Bomba de infusión".to_string(),
            severity: 3,
            occurrence: 4,
            detection: 2,
            ..LegacyAssessment::default()
        };
        assessment.recompute();

        let created = store::create(
            &storage,
            &MatrixPayload {
                name: "Bomba".to_string(),
                description: Some("Sala 3".to_string()),
                data: assessment.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(storage.list(LegacyAssessment::COLLECTION, Page::default()).unwrap().len(), 1);

        let loaded = store::load::<LegacyAssessment>(&storage, created.id)
            .await
            .unwrap();
        assert_eq!(loaded.data, assessment);
        assert_eq!(loaded.data.rpn, 24);
    }

    #[test]
    fn test_open_file_based() {
        let db_path = std::env::temp_dir().join(format!("amfe_test_{}.db", std::process::id()));

        let storage = Storage::open(&db_path).unwrap();
        storage.insert(Collection::Modular, &payload("x")).unwrap();
        assert_eq!(storage.path(), db_path);
        drop(storage);

        // reopening keeps the data
        let storage = Storage::open(&db_path).unwrap();
        assert_eq!(storage.list(Collection::Modular, Page::default()).unwrap().len(), 1);

        drop(storage);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let root = std::env::temp_dir().join(format!("amfe_test_{}", std::process::id()));
        let nested_path = root.join("nested/db.sqlite");
        let _ = std::fs::remove_dir_all(&root);

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(storage);
        let _ = std::fs::remove_dir_all(&root);
    }
}
