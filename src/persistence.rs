//! Database persistence layer for coinledger
//!
//! The ledger treats storage as an opaque key/value store: one slot per
//! block keyed by its hash, plus a single checkpoint slot for the chain head.

use crate::error::ChainError;
use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

const CHECKPOINT_KEY: &str = "checkpoint";

/// Abstraction for persistence backends. Values are opaque encoded bytes.
pub trait Persistence: Send + Sync {
    fn block(&self, hash: &str) -> Result<Option<Vec<u8>>, ChainError>;
    fn save_block(&self, hash: &str, data: &[u8]) -> Result<(), ChainError>;
    fn checkpoint(&self) -> Result<Option<Vec<u8>>, ChainError>;
    fn save_checkpoint(&self, data: &[u8]) -> Result<(), ChainError>;
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    /// A database that lives only as long as the handle.
    pub fn open_in_memory() -> Result<Self, ChainError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ChainError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blocks (
                hash TEXT PRIMARY KEY,
                data BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create blocks table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            ChainError::DatabaseError(format!("Failed to create metadata table: {}", e))
        })?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ChainError> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }
}

impl Persistence for Database {
    fn block(&self, hash: &str) -> Result<Option<Vec<u8>>, ChainError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT data FROM blocks WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ChainError::DatabaseError(format!("Failed to load block: {}", e)))
    }

    fn save_block(&self, hash: &str, data: &[u8]) -> Result<(), ChainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO blocks (hash, data) VALUES (?1, ?2)",
            params![hash, data],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save block: {}", e)))?;
        Ok(())
    }

    fn checkpoint(&self) -> Result<Option<Vec<u8>>, ChainError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM metadata WHERE key = ?1",
            params![CHECKPOINT_KEY],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ChainError::DatabaseError(format!("Failed to load checkpoint: {}", e)))
    }

    fn save_checkpoint(&self, data: &[u8]) -> Result<(), ChainError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![CHECKPOINT_KEY, data],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to save checkpoint: {}", e)))?;
        Ok(())
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same underlying maps.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub blocks: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    pub checkpoint: Arc<RwLock<Option<Vec<u8>>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for InMemoryPersistence {
    fn block(&self, hash: &str) -> Result<Option<Vec<u8>>, ChainError> {
        Ok(self.blocks.read().get(hash).cloned())
    }

    fn save_block(&self, hash: &str, data: &[u8]) -> Result<(), ChainError> {
        self.blocks.write().insert(hash.to_string(), data.to_vec());
        Ok(())
    }

    fn checkpoint(&self) -> Result<Option<Vec<u8>>, ChainError> {
        Ok(self.checkpoint.read().clone())
    }

    fn save_checkpoint(&self, data: &[u8]) -> Result<(), ChainError> {
        *self.checkpoint.write() = Some(data.to_vec());
        Ok(())
    }
}
