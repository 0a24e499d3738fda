//! absence-store: SQLite persistence for Auto-Absence.
//!
//! All queries run on the `tokio-rusqlite` connection thread; every public
//! method on [`Store`] is async and cheap to call from request handlers.

mod attendance;
mod faces;
mod groups;
pub mod models;
pub mod password;
mod schema;
mod sessions;
mod users;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use models::{
    Attendance, AttendanceSource, AttendanceStatus, ClassSession, ExportRow, Group, NewSession,
    NewUser, PresenceStatus, Role, RosterEntry, StudentFace, User,
};

/// `$XDG_DATA_HOME/auto-absence/absence.db`, with `$HOME/.local/share`
/// standing in for an unset `XDG_DATA_HOME`.
pub fn default_db_path(var: impl Fn(&str) -> Option<String>) -> PathBuf {
    var("XDG_DATA_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("auto-absence")
        .join("absence.db")
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] tokio_rusqlite::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to the attendance database. Clones share one connection.
#[derive(Clone)]
pub struct Store {
    conn: tokio_rusqlite::Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = tokio_rusqlite::Connection::open(path).await?;
        let store = Self { conn };
        store.init().await?;
        tracing::info!(path = %path.display(), "database opened");
        Ok(store)
    }

    /// Open a private in-memory database (tests, dry runs).
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init().await?;
        Ok(store)
    }

    async fn init(&self) -> Result<(), StoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(schema::PRAGMAS)?;
                conn.execute_batch(schema::SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn test_default_db_path() {
        assert_eq!(
            default_db_path(lookup(&[("HOME", "/home/ana")])),
            PathBuf::from("/home/ana/.local/share/auto-absence/absence.db")
        );
        assert_eq!(
            default_db_path(lookup(&[("HOME", "/home/ana"), ("XDG_DATA_HOME", "/data")])),
            PathBuf::from("/data/auto-absence/absence.db")
        );
        assert_eq!(
            default_db_path(lookup(&[("XDG_DATA_HOME", "")])),
            PathBuf::from("/tmp/.local/share/auto-absence/absence.db")
        );
    }

    #[tokio::test]
    async fn test_open_creates_directory_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("absence.db");

        {
            let store = Store::open(&path).await.unwrap();
            store.create_group("persisted").await.unwrap();
        }
        assert!(path.exists());

        let store = Store::open(&path).await.unwrap();
        let groups = store.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "persisted");
    }
}
