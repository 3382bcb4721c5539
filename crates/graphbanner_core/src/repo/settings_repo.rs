//! Key-value settings repository.
//!
//! # Responsibility
//! - Persist each `BannerSettings` field as one JSON-encoded row keyed by name.
//! - Rebuild settings from stored rows, filling missing keys with defaults.
//!
//! # Invariants
//! - `save` replaces all known keys atomically.
//! - `load` rejects blobs that fail decoding or validation instead of masking them.

use crate::db::DbError;
use crate::settings::{BannerSettings, ConfigError};
use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Settings persistence error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Stored values cannot be decoded into settings.
    InvalidData(String),
    /// Stored values decode but fail validation.
    Invalid(ConfigError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted settings: {message}"),
            Self::Invalid(err) => write!(f, "persisted settings rejected: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
            Self::Invalid(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for the settings blob.
pub trait SettingsRepository {
    /// Returns `None` when nothing was stored yet.
    fn load(&self) -> RepoResult<Option<BannerSettings>>;
    fn save(&mut self, settings: &BannerSettings) -> RepoResult<()>;
}

/// SQLite-backed settings repository owning its connection.
pub struct SqliteSettingsRepository {
    conn: Connection,
}

impl SqliteSettingsRepository {
    /// Wraps a connection returned by [`crate::db::open_db`] or
    /// [`crate::db::open_db_in_memory`].
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Raw stored JSON for one key, mainly for diagnostics.
    pub fn raw_value(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM settings_kv WHERE key = ?1;",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Writes one raw JSON value, bypassing schema encoding.
    pub fn put_raw(&mut self, key: &str, json: &str) -> RepoResult<()> {
        upsert(&self.conn, key, json)?;
        Ok(())
    }
}

impl SettingsRepository for SqliteSettingsRepository {
    fn load(&self) -> RepoResult<Option<BannerSettings>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM settings_kv ORDER BY key ASC;")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut blob = Map::new();
        for row in rows {
            let (key, raw) = row?;
            let value: Value = serde_json::from_str(&raw)
                .map_err(|err| RepoError::InvalidData(format!("key `{key}`: {err}")))?;
            blob.insert(key, value);
        }
        if blob.is_empty() {
            return Ok(None);
        }

        let key_count = blob.len();
        let settings: BannerSettings = serde_json::from_value(Value::Object(blob))
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;
        settings.validate().map_err(|err| {
            warn!(
                "event=settings_load module=repo status=error error_code=settings_invalid error={}",
                err
            );
            RepoError::Invalid(err)
        })?;

        info!(
            "event=settings_load module=repo status=ok keys={}",
            key_count
        );
        Ok(Some(settings))
    }

    fn save(&mut self, settings: &BannerSettings) -> RepoResult<()> {
        let Value::Object(fields) = serde_json::to_value(settings)
            .map_err(|err| RepoError::InvalidData(err.to_string()))?
        else {
            return Err(RepoError::InvalidData(
                "settings did not encode to an object".to_string(),
            ));
        };

        let tx = self.conn.transaction()?;
        for (key, value) in &fields {
            upsert(&tx, key, &value.to_string())?;
        }
        tx.commit()?;

        info!(
            "event=settings_save module=repo status=ok keys={}",
            fields.len()
        );
        Ok(())
    }
}

fn upsert(conn: &Connection, key: &str, json: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO settings_kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![key, json],
    )
}

#[cfg(test)]
mod tests {
    use super::{RepoError, SettingsRepository, SqliteSettingsRepository};
    use crate::db::open_db_in_memory;
    use crate::model::policy::EditModeBehavior;
    use crate::settings::BannerSettings;

    fn repo() -> SqliteSettingsRepository {
        SqliteSettingsRepository::new(open_db_in_memory().expect("in-memory db"))
    }

    #[test]
    fn empty_store_loads_none() {
        assert!(repo().load().expect("load").is_none());
    }

    #[test]
    fn saved_settings_load_back() {
        let mut repo = repo();
        let mut settings = BannerSettings::default();
        settings.capacity = 2;
        settings.edit_mode_behavior = EditModeBehavior::Compact;
        settings.ignore_patterns = vec!["Archive/*".to_string(), "!Archive/keep.md".to_string()];
        settings.disabled_notes.insert("daily/today.md".to_string());

        repo.save(&settings).expect("save");
        let loaded = repo.load().expect("load").expect("stored settings");
        assert_eq!(loaded, settings);
        assert_eq!(
            repo.raw_value("capacity").expect("raw").as_deref(),
            Some("2")
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let mut repo = repo();
        repo.put_raw("debounce_ms", "50").expect("put");
        let loaded = repo.load().expect("load").expect("stored settings");
        assert_eq!(loaded.debounce_ms, 50);
        assert_eq!(loaded.capacity, BannerSettings::default().capacity);
    }

    #[test]
    fn out_of_range_value_is_rejected() {
        let mut repo = repo();
        repo.put_raw("capacity", "0").expect("put");
        let err = repo.load().expect_err("zero capacity must be rejected");
        assert!(matches!(err, RepoError::Invalid(_)));
    }

    #[test]
    fn undecodable_value_is_rejected() {
        let mut repo = repo();
        repo.put_raw("capacity", "\"many\"").expect("put");
        let err = repo.load().expect_err("string capacity must be rejected");
        assert!(matches!(err, RepoError::InvalidData(_)));

        repo.put_raw("capacity", "{not json").expect("put");
        let err = repo.load().expect_err("broken json must be rejected");
        assert!(matches!(err, RepoError::InvalidData(_)));
    }
}
