//! Versioned configuration persistence
//!
//! Configurations are stored per user as a JSON body plus the schema version
//! it was written with. Older rows are upgraded on load and written back.

use super::types::{upgrade, ConfigError, EnhancementConfig, CONFIG_VERSION};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Key used when no user id is given
const ANONYMOUS_KEY: &str = "__default__";

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for enhancement configurations.
pub trait ConfigStore: Send + Sync {
    /// Load the stored configuration, upgraded to the current version.
    fn load(&self, user_id: Option<&str>) -> StorageResult<Option<EnhancementConfig>>;

    /// Store a configuration, replacing any previous one.
    fn save(&self, config: &EnhancementConfig, user_id: Option<&str>) -> StorageResult<()>;

    /// Remove the stored configuration. Returns whether one existed.
    fn delete(&self, user_id: Option<&str>) -> StorageResult<bool>;
}

/// Stores that can be opened from a path or in memory
pub trait OpenStore: ConfigStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Open an in-memory store (for testing)
    fn open_in_memory() -> StorageResult<Self>;
}

/// SQLite-backed configuration store
///
/// Thread-safe via internal mutex on the connection.
pub struct SqliteConfigStore {
    conn: Mutex<Connection>,
}

impl SqliteConfigStore {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS enhancement_config (
                user_key TEXT PRIMARY KEY,
                schema_version INTEGER NOT NULL,
                config_json TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(user_id: Option<&str>) -> &str {
        user_id.unwrap_or(ANONYMOUS_KEY)
    }

    fn write(conn: &Connection, key: &str, config: &EnhancementConfig) -> StorageResult<()> {
        let json = serde_json::to_string(config)?;
        conn.execute(
            "INSERT INTO enhancement_config (user_key, schema_version, config_json, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_key) DO UPDATE SET
                schema_version = excluded.schema_version,
                config_json = excluded.config_json,
                updated_at = excluded.updated_at",
            params![key, CONFIG_VERSION, json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl OpenStore for SqliteConfigStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl ConfigStore for SqliteConfigStore {
    fn load(&self, user_id: Option<&str>) -> StorageResult<Option<EnhancementConfig>> {
        let key = Self::key(user_id);
        let conn = self.conn();
        let row: Option<(u32, String)> = conn
            .query_row(
                "SELECT schema_version, config_json FROM enhancement_config WHERE user_key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((stored_version, json)) = row else {
            return Ok(None);
        };
        if stored_version > CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion {
                found: stored_version,
                current: CONFIG_VERSION,
            }
            .into());
        }

        let mut value: serde_json::Value = serde_json::from_str(&json)?;
        if let Some(doc) = value.as_object_mut() {
            doc.insert("version".to_string(), stored_version.into());
        }
        let config = upgrade(value)?;

        if stored_version < CONFIG_VERSION {
            tracing::info!(
                user = key,
                from = stored_version,
                to = CONFIG_VERSION,
                "migrated stored configuration"
            );
            Self::write(&conn, key, &config)?;
        }
        Ok(Some(config))
    }

    fn save(&self, config: &EnhancementConfig, user_id: Option<&str>) -> StorageResult<()> {
        config.validate()?;
        let key = Self::key(user_id);
        Self::write(&self.conn(), key, config)?;
        tracing::debug!(user = key, "saved configuration");
        Ok(())
    }

    fn delete(&self, user_id: Option<&str>) -> StorageResult<bool> {
        let removed = self.conn().execute(
            "DELETE FROM enhancement_config WHERE user_key = ?1",
            params![Self::key(user_id)],
        )?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StageId;
    use crate::config::PerformanceMode;

    fn create_test_store() -> SqliteConfigStore {
        SqliteConfigStore::open_in_memory().unwrap()
    }

    #[test]
    fn load_missing_is_none() {
        let store = create_test_store();
        assert!(store.load(None).unwrap().is_none());
        assert!(store.load(Some("alice")).unwrap().is_none());
    }

    #[test]
    fn save_and_load_per_user() {
        let store = create_test_store();
        let speed = EnhancementConfig::for_mode(PerformanceMode::Speed);
        let quality = EnhancementConfig::for_mode(PerformanceMode::Quality);

        store.save(&speed, None).unwrap();
        store.save(&quality, Some("alice")).unwrap();

        assert_eq!(store.load(None).unwrap(), Some(speed));
        assert_eq!(store.load(Some("alice")).unwrap(), Some(quality.clone()));

        // Saving again replaces
        let tweaked = quality.with_stage(StageId::Accessibility, false);
        store.save(&tweaked, Some("alice")).unwrap();
        assert_eq!(store.load(Some("alice")).unwrap(), Some(tweaked));
    }

    #[test]
    fn save_rejects_invalid_config() {
        let store = create_test_store();
        let mut config = EnhancementConfig::default();
        config.stages.insert("bogus".into(), true);
        assert!(matches!(
            store.save(&config, None),
            Err(StorageError::Config(ConfigError::UnknownStage(_)))
        ));
    }

    #[test]
    fn delete_reports_existence() {
        let store = create_test_store();
        store.save(&EnhancementConfig::default(), None).unwrap();
        assert!(store.delete(None).unwrap());
        assert!(!store.delete(None).unwrap());
        assert!(store.load(None).unwrap().is_none());
    }

    #[test]
    fn migrates_version_one_rows() {
        let store = create_test_store();
        store
            .conn()
            .execute(
                "INSERT INTO enhancement_config VALUES ('__default__', 1, ?1, '2024-01-01T00:00:00Z')",
                params![r#"{"enabled": true, "stages": {"tacticalCombat": true}}"#],
            )
            .unwrap();

        let config = store.load(None).unwrap().unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.stages.get("tactical-combat"), Some(&true));

        // Written back at the current version
        let version: u32 = store
            .conn()
            .query_row(
                "SELECT schema_version FROM enhancement_config WHERE user_key = '__default__'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, CONFIG_VERSION);
    }

    #[test]
    fn newer_rows_are_refused() {
        let store = create_test_store();
        store
            .conn()
            .execute(
                "INSERT INTO enhancement_config VALUES ('__default__', 7, '{}', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.load(None),
            Err(StorageError::Config(ConfigError::UnsupportedVersion { found: 7, .. }))
        ));
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.db");
        let store = SqliteConfigStore::open(&path).unwrap();
        store.save(&EnhancementConfig::default(), Some("bob")).unwrap();
        drop(store);

        let reopened = SqliteConfigStore::open(&path).unwrap();
        assert!(reopened.load(Some("bob")).unwrap().is_some());
    }
}
