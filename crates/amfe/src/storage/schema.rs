//! `SQLite` schema definitions for the local matrix store.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the matrices table.
///
/// Both collections share the table; `data` holds the document as JSON.
pub const CREATE_MATRICES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS matrices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    data TEXT NOT NULL,
    created_by INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on collection for list queries.
pub const CREATE_COLLECTION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_matrices_collection ON matrices(collection, id)
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
    CREATE_MATRICES_TABLE,
    CREATE_COLLECTION_INDEX,
    CREATE_METADATA_TABLE,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statements_not_empty() {
        assert!(!SCHEMA_STATEMENTS.is_empty());
        for stmt in SCHEMA_STATEMENTS {
            assert!(!stmt.is_empty());
        }
    }

    #[test]
    fn test_create_matrices_table_contains_required_columns() {
        assert!(CREATE_MATRICES_TABLE.contains("id INTEGER PRIMARY KEY"));
        assert!(CREATE_MATRICES_TABLE.contains("collection TEXT NOT NULL"));
        assert!(CREATE_MATRICES_TABLE.contains("data TEXT NOT NULL"));
        assert!(CREATE_MATRICES_TABLE.contains("updated_at TEXT NOT NULL"));
    }

    #[test]
    fn test_create_metadata_table_structure() {
        assert!(CREATE_METADATA_TABLE.contains("key TEXT PRIMARY KEY"));
        assert!(CREATE_METADATA_TABLE.contains("value TEXT NOT NULL"));
    }
}
