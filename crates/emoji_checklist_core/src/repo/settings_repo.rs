//! Checklist settings repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the global glyphs and the ordered tag mapping list.
//! - Replace the whole settings snapshot atomically.
//!
//! # Invariants
//! - `checklist_settings` holds at most one row (`id = 1`).
//! - Mapping order is persisted through a dense `position` column.
//! - Saved and loaded snapshots both pass `ChecklistSettings::validate()`.

use crate::db::DbError;
use crate::model::settings::{ChecklistSettings, SettingsError, TagEmojiMapping};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for settings persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(SettingsError),
    Db(DbError),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted settings: {message}"),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<SettingsError> for RepoError {
    fn from(value: SettingsError) -> Self {
        Self::Validation(value)
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

/// Repository interface for the settings snapshot.
pub trait SettingsRepository {
    /// Loads the stored snapshot, or `None` when nothing was saved yet.
    fn load_settings(&self) -> RepoResult<Option<ChecklistSettings>>;
    /// Replaces the stored snapshot.
    fn save_settings(&mut self, settings: &ChecklistSettings) -> RepoResult<()>;
}

/// Non-persistent repository, used for read-only hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySettingsRepository {
    stored: Option<ChecklistSettings>,
}

impl InMemorySettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsRepository for InMemorySettingsRepository {
    fn load_settings(&self) -> RepoResult<Option<ChecklistSettings>> {
        Ok(self.stored.clone())
    }

    fn save_settings(&mut self, settings: &ChecklistSettings) -> RepoResult<()> {
        settings.validate()?;
        self.stored = Some(settings.clone());
        Ok(())
    }
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        for table in ["checklist_settings", "tag_emoji_mappings"] {
            if !table_exists(conn, table)? {
                return Err(RepoError::MissingRequiredTable(table));
            }
        }
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load_settings(&self) -> RepoResult<Option<ChecklistSettings>> {
        let globals = self
            .conn
            .query_row(
                "SELECT unchecked_emoji, checked_emoji
                 FROM checklist_settings
                 WHERE id = 1;",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        let Some((unchecked_emoji, checked_emoji)) = globals else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT tag, unchecked_emoji, checked_emoji
             FROM tag_emoji_mappings
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tag_mappings = Vec::new();
        while let Some(row) = rows.next()? {
            tag_mappings.push(TagEmojiMapping {
                tag: row.get("tag")?,
                unchecked_emoji: row.get("unchecked_emoji")?,
                checked_emoji: row.get("checked_emoji")?,
            });
        }

        let settings = ChecklistSettings {
            unchecked_emoji,
            checked_emoji,
            tag_mappings,
        };
        settings
            .validate()
            .map_err(|err| RepoError::InvalidData(err.to_string()))?;
        Ok(Some(settings))
    }

    fn save_settings(&mut self, settings: &ChecklistSettings) -> RepoResult<()> {
        settings.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO checklist_settings (id, unchecked_emoji, checked_emoji)
             VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                unchecked_emoji = excluded.unchecked_emoji,
                checked_emoji = excluded.checked_emoji,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![settings.unchecked_emoji, settings.checked_emoji],
        )?;
        tx.execute("DELETE FROM tag_emoji_mappings;", [])?;
        for (position, mapping) in settings.tag_mappings.iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| RepoError::InvalidData("too many tag mappings".to_string()))?;
            tx.execute(
                "INSERT INTO tag_emoji_mappings (position, tag, unchecked_emoji, checked_emoji)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    position,
                    mapping.tag,
                    mapping.unchecked_emoji,
                    mapping.checked_emoji
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
