use rusqlite::{params, OptionalExtension, Row};

use crate::models::{ClassSession, NewSession};
use crate::{Store, StoreError};

const SESSION_COLUMNS: &str = "id, group_id, teacher_id, start_time, end_time";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<ClassSession> {
    Ok(ClassSession {
        id: row.get(0)?,
        group_id: row.get(1)?,
        teacher_id: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
    })
}

impl Store {
    /// Insert a class session. Callers validate the group, teacher and times.
    pub async fn create_session(&self, new: NewSession) -> Result<ClassSession, StoreError> {
        let session = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (group_id, teacher_id, start_time, end_time)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![new.group_id, new.teacher_id, new.start_time, new.end_time],
                )?;
                Ok(ClassSession {
                    id: conn.last_insert_rowid(),
                    group_id: new.group_id,
                    teacher_id: new.teacher_id,
                    start_time: new.start_time,
                    end_time: new.end_time,
                })
            })
            .await?;
        tracing::info!(
            session_id = session.id,
            group_id = session.group_id,
            start = %session.start_time,
            "session created"
        );
        Ok(session)
    }

    /// All sessions, most recent start first.
    pub async fn list_sessions(&self) -> Result<Vec<ClassSession>, StoreError> {
        let sessions = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions ORDER BY start_time DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], session_from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(sessions)
    }

    pub async fn get_session(&self, id: i64) -> Result<Option<ClassSession>, StoreError> {
        let session = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                        [id],
                        session_from_row,
                    )
                    .optional()?)
            })
            .await?;
        Ok(session)
    }

    /// Sessions of one group, in chronological order.
    pub async fn group_sessions(&self, group_id: i64) -> Result<Vec<ClassSession>, StoreError> {
        let sessions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions WHERE group_id = ?1 ORDER BY start_time, id"
                ))?;
                let rows = stmt.query_map([group_id], session_from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(sessions)
    }

    pub async fn delete_session(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", [id])? > 0))
            .await?;
        if deleted {
            tracing::info!(session_id = id, "session deleted");
        }
        Ok(deleted)
    }
}
