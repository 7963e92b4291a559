use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StorageError;
use crate::store::ChatStore;

/// String key/value persistence, shaped like browser `localStorage`.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

pub fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "GreenChat")?;
    Some(proj.data_dir().join("storage.sqlite"))
}

pub struct SqliteStorage {
    path: PathBuf,
}

impl SqliteStorage {
    pub fn open_default() -> Result<Self, StorageError> {
        Self::open(default_db_path().ok_or(StorageError::NoDataDir)?)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let storage = Self { path };
        storage.conn()?.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.path)
    }
}

impl LocalStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn()?.execute(
            r#"
            INSERT INTO local_storage (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn()?
            .execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

pub fn chats_key(instance_id: &str) -> String {
    format!("chats_{instance_id}")
}

pub fn active_chat_key(instance_id: &str) -> String {
    format!("activeChat_{instance_id}")
}

/// Loads the chat store for an instance. A value that no longer parses is
/// logged and replaced by an empty store.
pub fn load_chats(storage: &dyn LocalStorage, instance_id: &str) -> Result<ChatStore, StorageError> {
    let Some(raw) = storage.get(&chats_key(instance_id))? else {
        return Ok(ChatStore::new());
    };
    match serde_json::from_str(&raw) {
        Ok(chats) => Ok(chats),
        Err(e) => {
            warn!("discarding unreadable chat store for instance {instance_id}: {e}");
            Ok(ChatStore::new())
        }
    }
}

pub fn save_chats(
    storage: &dyn LocalStorage,
    instance_id: &str,
    chats: &ChatStore,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(chats)?;
    storage.set(&chats_key(instance_id), &json)
}

pub fn load_active_chat(
    storage: &dyn LocalStorage,
    instance_id: &str,
) -> Result<Option<String>, StorageError> {
    Ok(storage
        .get(&active_chat_key(instance_id))?
        .filter(|p| !p.is_empty()))
}

pub fn save_active_chat(
    storage: &dyn LocalStorage,
    instance_id: &str,
    active: Option<&str>,
) -> Result<(), StorageError> {
    storage.set(&active_chat_key(instance_id), active.unwrap_or_default())
}
