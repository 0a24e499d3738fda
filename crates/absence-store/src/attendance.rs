use chrono::NaiveDateTime;
use rusqlite::{params, Row};

use crate::models::{
    Attendance, AttendanceSource, AttendanceStatus, ClassSession, ExportRow, PresenceStatus,
    RosterEntry,
};
use crate::{Store, StoreError};

fn attendance_from_row(row: &Row<'_>) -> rusqlite::Result<Attendance> {
    Ok(Attendance {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        status: row.get(3)?,
        source: row.get(4)?,
        timestamp: row.get(5)?,
    })
}

fn presence(marked: bool) -> PresenceStatus {
    if marked {
        PresenceStatus::Present
    } else {
        PresenceStatus::Absent
    }
}

impl Store {
    /// Record a student as present in a session.
    ///
    /// At most one row exists per (session, student). Returns the stored row
    /// and whether this call created it; an existing row is left untouched.
    pub async fn mark_present(
        &self,
        session_id: i64,
        user_id: i64,
        source: AttendanceSource,
        at: NaiveDateTime,
    ) -> Result<(Attendance, bool), StoreError> {
        let (row, inserted) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO attendance (session_id, user_id, status, source, timestamp)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![session_id, user_id, AttendanceStatus::Present, source, at],
                )? > 0;
                let row = tx.query_row(
                    "SELECT id, session_id, user_id, status, source, timestamp
                     FROM attendance WHERE session_id = ?1 AND user_id = ?2",
                    params![session_id, user_id],
                    attendance_from_row,
                )?;
                tx.commit()?;
                Ok((row, inserted))
            })
            .await?;

        if inserted {
            tracing::info!(session_id, user_id, source = %source, "attendance marked");
        } else {
            tracing::debug!(session_id, user_id, "attendance already marked");
        }
        Ok((row, inserted))
    }

    /// Remove a student's attendance row. Returns false if there was none.
    pub async fn unmark(&self, session_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM attendance WHERE session_id = ?1 AND user_id = ?2",
                    params![session_id, user_id],
                )? > 0)
            })
            .await?;
        if removed {
            tracing::info!(session_id, user_id, "attendance removed");
        }
        Ok(removed)
    }

    #[cfg(test)]
    pub(crate) async fn session_attendance(&self, session_id: i64) -> Result<Vec<Attendance>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, session_id, user_id, status, source, timestamp
                     FROM attendance WHERE session_id = ?1 ORDER BY user_id",
                )?;
                let rows = stmt.query_map([session_id], attendance_from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(rows)
    }

    /// Every student of the session's group with their presence.
    pub async fn roster(&self, session: &ClassSession) -> Result<Vec<RosterEntry>, StoreError> {
        let (session_id, group_id) = (session.id, session.group_id);
        let entries = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT u.id, u.first_name, u.last_name, u.email, a.timestamp, a.source
                     FROM users u
                     JOIN user_groups ug ON ug.user_id = u.id AND ug.group_id = ?2
                     LEFT JOIN attendance a ON a.user_id = u.id AND a.session_id = ?1
                     WHERE u.role = 'STUDENT'
                     ORDER BY u.id",
                )?;
                let rows = stmt.query_map(params![session_id, group_id], |row| {
                    let timestamp: Option<NaiveDateTime> = row.get(4)?;
                    Ok(RosterEntry {
                        user_id: row.get(0)?,
                        first_name: row.get(1)?,
                        last_name: row.get(2)?,
                        email: row.get(3)?,
                        status: presence(timestamp.is_some()),
                        timestamp,
                        source: row.get(5)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(entries)
    }

    /// Spreadsheet rows for the given sessions: one per (session, student of
    /// the session's group), in the order the sessions are given.
    pub async fn export_rows(&self, session_ids: Vec<i64>) -> Result<Vec<ExportRow>, StoreError> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT s.id, s.group_id, s.start_time, s.end_time,
                            u.id, u.first_name, u.last_name, u.email, a.id IS NOT NULL
                     FROM sessions s
                     JOIN user_groups ug ON ug.group_id = s.group_id
                     JOIN users u ON u.id = ug.user_id AND u.role = 'STUDENT'
                     LEFT JOIN attendance a ON a.session_id = s.id AND a.user_id = u.id
                     WHERE s.id = ?1
                     ORDER BY u.id",
                )?;

                let mut out = Vec::new();
                for id in session_ids {
                    let rows = stmt.query_map([id], |row| {
                        Ok(ExportRow {
                            session_id: row.get(0)?,
                            group_id: row.get(1)?,
                            start_time: row.get(2)?,
                            end_time: row.get(3)?,
                            student_id: row.get(4)?,
                            first_name: row.get(5)?,
                            last_name: row.get(6)?,
                            email: row.get(7)?,
                            status: presence(row.get(8)?),
                        })
                    })?;
                    for row in rows {
                        out.push(row?);
                    }
                }
                Ok(out)
            })
            .await?;
        Ok(rows)
    }
}
