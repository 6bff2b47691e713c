//! Storage layer for teamtask
//!
//! Manages persistent state under the workspace directory:
//!
//! ```text
//! .teamtask/                    # Workspace state
//!   actor                       # Persisted acting user id
//!   tasks.json                  # Task collection
//!   users.json                  # User profile collection
//!   notifications.json          # Notification collection
//!   <collection>.lock           # fs2 lock guarding each collection file
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::Result;
use crate::lock::{self, DocumentLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Name of the workspace state directory
pub const DATA_DIR: &str = ".teamtask";

const COLLECTION_SCHEMA_VERSION: &str = "teamtask.collection.v1";

/// On-disk form of one collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionFile {
    pub schema_version: String,
    pub updated_at: DateTime<Utc>,
    pub records: Vec<serde_json::Value>,
}

impl CollectionFile {
    pub fn empty() -> Self {
        Self {
            schema_version: COLLECTION_SCHEMA_VERSION.to_string(),
            updated_at: Utc::now(),
            records: Vec::new(),
        }
    }
}

/// Storage manager for teamtask state
#[derive(Debug, Clone)]
pub struct Storage {
    /// Workspace root (where `.teamtask.toml` and `.teamtask/` live)
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the `.teamtask/` directory
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Path to the persisted actor file
    pub fn actor_file(&self) -> PathBuf {
        self.data_dir().join("actor")
    }

    /// Path to a collection document
    pub fn collection_file(&self, collection: &str) -> PathBuf {
        self.data_dir().join(format!("{collection}.json"))
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.data_dir().exists()
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read a collection without taking the lock
    pub fn read_collection(&self, collection: &str) -> Result<CollectionFile> {
        let path = self.collection_file(collection);
        if !path.exists() {
            return Ok(CollectionFile::empty());
        }
        self.read_json(&path)
    }

    /// Read-modify-write a collection while holding its lock
    ///
    /// The file is rewritten only when `f` succeeds.
    pub fn update_collection<T, F>(&self, collection: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<serde_json::Value>) -> Result<T>,
    {
        let path = self.collection_file(collection);
        let _lock = DocumentLock::acquire(&path, DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut file = if path.exists() {
            self.read_json(&path)?
        } else {
            CollectionFile::empty()
        };

        let result = f(&mut file.records)?;
        file.updated_at = Utc::now();
        self.write_json(&path, &file)?;
        Ok(result)
    }

    // =========================================================================
    // Actor persistence
    // =========================================================================

    /// Read the persisted actor identity
    pub fn read_actor(&self) -> Option<String> {
        let raw = fs::read_to_string(self.actor_file()).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Persist the actor identity
    pub fn write_actor(&self, actor: &str) -> Result<()> {
        self.init()?;
        lock::write_atomic(self.actor_file(), format!("{actor}\n").as_bytes())
    }
}
