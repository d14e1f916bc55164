//! Matrix records and the storage seam.
//!
//! [`MatrixStore`] is implemented by the HTTP client and by the local
//! `SQLite` store. It moves documents as raw JSON; the typed helpers at the
//! bottom of this module convert to and from the document types.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::MatrixDocument;
use crate::error::Result;
use crate::legacy::LegacyAssessment;

/// The two kinds of matrix the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Single-form assessments under `/matrices`.
    Legacy,
    /// Modular process trees under `/matrices/modular`.
    Modular,
}

impl Collection {
    /// REST path of the collection.
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Legacy => "/matrices",
            Self::Modular => "/matrices/modular",
        }
    }

    /// Short name used in the local database and in logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Modular => "modular",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Offset pagination for list calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Records to skip.
    pub skip: u32,
    /// Maximum records to return.
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
        }
    }
}

impl Page {
    /// The first `limit` records.
    #[must_use]
    pub fn first(limit: u32) -> Self {
        Self { skip: 0, limit }
    }
}

/// A stored matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord<D = Value> {
    /// Backend identifier.
    pub id: i64,
    /// Matrix name.
    pub name: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// The document.
    pub data: D,
    /// Account that created the matrix.
    #[serde(default)]
    pub created_by: Option<i64>,
    /// Creation time (UTC, no offset on the wire).
    pub created_at: NaiveDateTime,
    /// Last update time (UTC, no offset on the wire).
    pub updated_at: NaiveDateTime,
}

impl<D> MatrixRecord<D> {
    fn try_map<E>(self, f: impl FnOnce(D) -> Result<E>) -> Result<MatrixRecord<E>> {
        Ok(MatrixRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            data: f(self.data)?,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixPayload<D = Value> {
    /// Matrix name.
    pub name: String,
    /// Optional free-text description.
    pub description: Option<String>,
    /// The full document.
    pub data: D,
}

/// A document type stored in one of the collections.
pub trait MatrixData: Serialize + DeserializeOwned + Send + Sync {
    /// Collection holding documents of this type.
    const COLLECTION: Collection;

    /// Restore derived values after loading.
    fn normalize(&mut self) {}
}

impl MatrixData for MatrixDocument {
    const COLLECTION: Collection = Collection::Modular;
}

impl MatrixData for LegacyAssessment {
    const COLLECTION: Collection = Collection::Legacy;

    fn normalize(&mut self) {
        self.recompute();
    }
}

/// CRUD over matrix collections.
#[async_trait]
pub trait MatrixStore: Send + Sync {
    /// List the records of a collection.
    async fn list(&self, collection: Collection, page: Page) -> Result<Vec<MatrixRecord>>;

    /// Fetch one record.
    async fn get(&self, collection: Collection, id: i64) -> Result<MatrixRecord>;

    /// Create a record and return it as stored.
    async fn create(&self, collection: Collection, payload: &MatrixPayload)
        -> Result<MatrixRecord>;

    /// Replace a record and return it as stored.
    async fn update(
        &self,
        collection: Collection,
        id: i64,
        payload: &MatrixPayload,
    ) -> Result<MatrixRecord>;

    /// Delete a record.
    async fn delete(&self, collection: Collection, id: i64) -> Result<()>;
}

fn decode<D: MatrixData>(record: MatrixRecord) -> Result<MatrixRecord<D>> {
    record.try_map(|value| {
        let mut data: D = serde_json::from_value(value)?;
        data.normalize();
        Ok(data)
    })
}

fn encode<D: MatrixData>(payload: &MatrixPayload<D>) -> Result<MatrixPayload> {
    Ok(MatrixPayload {
        name: payload.name.clone(),
        description: payload.description.clone(),
        data: serde_json::to_value(&payload.data)?,
    })
}

/// List typed records.
///
/// # Errors
///
/// Returns the store's error, or a JSON error if a document does not parse.
pub async fn list<D: MatrixData>(
    store: &dyn MatrixStore,
    page: Page,
) -> Result<Vec<MatrixRecord<D>>> {
    store
        .list(D::COLLECTION, page)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

/// Load one typed record.
///
/// # Errors
///
/// Returns the store's error, or a JSON error if the document does not parse.
pub async fn load<D: MatrixData>(store: &dyn MatrixStore, id: i64) -> Result<MatrixRecord<D>> {
    decode(store.get(D::COLLECTION, id).await?)
}

/// Create a typed record.
///
/// # Errors
///
/// Returns the store's error.
pub async fn create<D: MatrixData>(
    store: &dyn MatrixStore,
    payload: &MatrixPayload<D>,
) -> Result<MatrixRecord<D>> {
    decode(store.create(D::COLLECTION, &encode(payload)?).await?)
}

/// Replace a typed record.
///
/// # Errors
///
/// Returns the store's error.
pub async fn update<D: MatrixData>(
    store: &dyn MatrixStore,
    id: i64,
    payload: &MatrixPayload<D>,
) -> Result<MatrixRecord<D>> {
    decode(store.update(D::COLLECTION, id, &encode(payload)?).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_paths() {
        assert_eq!(Collection::Legacy.path(), "/matrices");
        assert_eq!(Collection::Modular.path(), "/matrices/modular");
        assert_eq!(Collection::Modular.to_string(), "modular");
    }

    #[test]
    fn test_page_default() {
        let page = Page::default();
        assert_eq!(page.skip, 0);
        assert_eq!(page.limit, 100);
        assert_eq!(Page::first(5).limit, 5);
    }

    #[test]
    fn test_record_parses_backend_timestamps() {
        let json = r#"{
            "id": 7,
            "name": "UCI",
            "description": null,
            "data": {"header": {}, "procesos": []},
            "created_by": 1,
            "created_at": "2024-06-10T14:03:22.512000",
            "updated_at": "2024-06-10T14:03:22"
        }"#;
        let record: MatrixRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert!(record.description.is_none());

        let typed: MatrixRecord<MatrixDocument> = decode(record).unwrap();
        assert!(typed.data.processes.processes().is_empty());
        // Loads as-is; the form reports the empty list when validating.
        assert_eq!(typed.data.processes.empty_lists().len(), 1);
    }

    #[test]
    fn test_decode_normalizes_legacy_rpn() {
        let record = MatrixRecord {
            id: 1,
            name: "Monitor".to_string(),
            description: None,
            data: serde_json::json!({"severity": 4, "occurrence": 5, "detection": 2, "rpn": 1}),
            created_by: None,
            created_at: NaiveDateTime::default(),
            updated_at: NaiveDateTime::default(),
        };
        let typed: MatrixRecord<LegacyAssessment> = decode(record).unwrap();
        assert_eq!(typed.data.rpn, 40);
    }

    #[test]
    fn test_encode_keeps_wire_names() {
        let payload = MatrixPayload {
            name: "x".to_string(),
            description: Some("y".to_string()),
            data: MatrixDocument::default(),
        };
        let raw = encode(&payload).unwrap();
        assert!(raw.data.get("procesos").is_some());
        assert!(raw.data.get("header").is_some());
    }
}
