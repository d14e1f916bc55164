//! Database migration system for the local matrix store.
//!
//! The base schema is created idempotently; each later version is a
//! function in [`MIGRATIONS`] run once, in order, with the reached version
//! recorded in the metadata table.

use rusqlite::Connection;
use tracing::info;

use crate::error::{Error, Result};

use super::schema::SCHEMA_STATEMENTS;

/// A schema upgrade step.
type Migration = fn(&Connection) -> Result<()>;

/// Upgrade steps; entry `n` brings the schema to version `n + 1`.
const MIGRATIONS: &[Migration] = &[migrate_v1, migrate_v2];

/// The current schema version.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub const CURRENT_VERSION: i32 = MIGRATIONS.len() as i32;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
///
/// Each step commits together with its version bump, so an interrupted
/// upgrade resumes where it stopped.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=CURRENT_VERSION {
        conn.execute_batch("BEGIN")?;
        let step = run_migration(conn, version).and_then(|()| set_schema_version(conn, version));
        match step {
            Ok(()) => conn.execute_batch("COMMIT")?,
            Err(e) => {
                conn.execute_batch("ROLLBACK")?;
                return Err(e);
            }
        }
        info!(version, "applied database migration");
    }
    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    let step = usize::try_from(version - 1)
        .ok()
        .and_then(|i| MIGRATIONS.get(i))
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;
    step(conn)
}

/// Version 1 is the base schema created by `SCHEMA_STATEMENTS`.
fn migrate_v1(_conn: &Connection) -> Result<()> {
    Ok(())
}

/// Version 2 records a hash of each document so unchanged saves can be
/// detected, and backfills it for existing rows.
fn migrate_v2(conn: &Connection) -> Result<()> {
    let has_column: bool = conn
        .prepare("SELECT 1 FROM pragma_table_info('matrices') WHERE name = 'content_hash'")?
        .exists([])?;
    if !has_column {
        conn.execute("ALTER TABLE matrices ADD COLUMN content_hash TEXT", [])?;
    }

    let rows: Vec<(i64, String)> = conn
        .prepare("SELECT id, data FROM matrices WHERE content_hash IS NULL")?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<_, _>>()?;
    for (id, data) in rows {
        conn.execute(
            "UPDATE matrices SET content_hash = ?1 WHERE id = ?2",
            (super::content_hash(&data), id),
        )?;
    }
    Ok(())
}
