use chrono::Utc;
use rusqlite::params;

use crate::models::StudentFace;
use crate::{Store, StoreError};

impl Store {
    /// Store (or replace) a student's face encoding.
    pub async fn upsert_face(&self, user_id: i64, encoding: String) -> Result<(), StoreError> {
        let now = Utc::now().naive_utc();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO student_faces (user_id, encoding, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT (user_id) DO UPDATE SET encoding = excluded.encoding,
                                                         updated_at = excluded.updated_at",
                    params![user_id, encoding, now],
                )?;
                Ok(())
            })
            .await?;
        tracing::info!(user_id, "face encoding stored");
        Ok(())
    }

    /// Forget a student's face. Returns false if none was stored.
    pub async fn delete_face(&self, user_id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM student_faces WHERE user_id = ?1", [user_id])? > 0))
            .await?;
        Ok(deleted)
    }

    /// Face encodings of the students in a group.
    pub async fn group_faces(&self, group_id: i64) -> Result<Vec<StudentFace>, StoreError> {
        let faces = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT f.user_id, f.encoding
                     FROM student_faces f
                     JOIN user_groups ug ON ug.user_id = f.user_id
                     WHERE ug.group_id = ?1
                     ORDER BY f.user_id",
                )?;
                let rows = stmt.query_map([group_id], |row| {
                    Ok(StudentFace {
                        user_id: row.get(0)?,
                        encoding: row.get(1)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(faces)
    }

    /// Ids of the users that have a stored face.
    pub async fn enrolled_user_ids(&self) -> Result<Vec<i64>, StoreError> {
        let ids = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT user_id FROM student_faces ORDER BY user_id")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok(rows.collect::<Result<Vec<i64>, _>>()?)
            })
            .await?;
        Ok(ids)
    }
}
