//! Storage layer for ecorent.
//!
//! State lives as whole JSON documents keyed by logical name (`contracts`,
//! `catalog`, `settings`, `last_id`, `last_client`) in a `SQLite` file. Every
//! save overwrites full documents; there are no partial updates and no
//! transaction log.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::ledger::Ledger;
use crate::model::{Catalog, ClientProfile, Contract, Settings};

/// Logical names of the persisted documents.
pub mod keys {
    /// The contract list.
    pub const CONTRACTS: &str = "contracts";
    /// The product catalog.
    pub const CATALOG: &str = "catalog";
    /// User settings.
    pub const SETTINGS: &str = "settings";
    /// Last allocated contract sequence.
    pub const LAST_ID: &str = "last_id";
    /// Client block of the last submitted form.
    pub const LAST_CLIENT: &str = "last_client";
}

/// Document store backed by `SQLite`.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
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

        info!("Database opened at {}", path.display());
        Ok(Self { path, conn })
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
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and deserialize the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored JSON does not match `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(Error::from)
    }

    /// Rebuild the application state from the stored documents.
    ///
    /// Missing documents start empty, except the catalog (built-in default)
    /// and settings (pointing at `fallback_endpoint`).
    ///
    /// # Errors
    ///
    /// Returns an error if a stored document is malformed.
    pub fn load_ledger(&self, fallback_endpoint: &str) -> Result<Ledger> {
        let contracts: Vec<Contract> = self.load(keys::CONTRACTS)?.unwrap_or_default();
        let catalog: Catalog = self.load(keys::CATALOG)?.unwrap_or_default();
        let settings: Settings = self
            .load(keys::SETTINGS)?
            .unwrap_or_else(|| Settings::with_endpoint(fallback_endpoint));
        let last_id: u64 = self.load(keys::LAST_ID)?.unwrap_or_default();
        let last_client: Option<ClientProfile> = self.load(keys::LAST_CLIENT)?;

        debug!(
            "Loaded {} contracts, counter at {}",
            contracts.len(),
            last_id
        );
        Ok(Ledger::restore(
            contracts,
            catalog,
            settings,
            last_id,
            last_client,
        ))
    }

    /// Overwrite every ledger document in one transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any write fails; nothing is
    /// written in that case.
    pub fn save_ledger(&mut self, ledger: &Ledger) -> Result<()> {
        let contracts = serde_json::to_string(ledger.contracts())?;
        let catalog = serde_json::to_string(ledger.catalog())?;
        let settings = serde_json::to_string(ledger.settings())?;
        let last_id = serde_json::to_string(&ledger.last_id())?;
        let last_client = ledger
            .last_client()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.transaction()?;
        write_document(&tx, keys::CONTRACTS, &contracts)?;
        write_document(&tx, keys::CATALOG, &catalog)?;
        write_document(&tx, keys::SETTINGS, &settings)?;
        write_document(&tx, keys::LAST_ID, &last_id)?;
        match last_client {
            Some(json) => write_document(&tx, keys::LAST_CLIENT, &json)?,
            None => {
                tx.execute("DELETE FROM documents WHERE key = ?1", [keys::LAST_CLIENT])?;
            }
        }
        tx.commit()?;

        debug!("Saved {} contracts", ledger.contracts().len());
        Ok(())
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let documents: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let newest: Option<String> = self
            .conn
            .query_row("SELECT MAX(updated_at) FROM documents", [], |row| row.get(0))?;

        let last_saved = newest
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            documents,
            last_saved,
            db_size_bytes,
        })
    }
}

fn write_document(conn: &Connection, key: &str, json: &str) -> Result<()> {
    conn.execute(
        r"
        INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        ",
        params![key, json, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

/// Statistics about the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of stored documents.
    pub documents: i64,
    /// When a document was last written.
    pub last_saved: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
