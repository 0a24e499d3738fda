use rusqlite::{params, OptionalExtension};

use crate::models::{Group, User};
use crate::users::{user_from_row, USER_COLUMNS_U};
use crate::{Store, StoreError};

impl Store {
    pub async fn create_group(&self, name: &str) -> Result<Group, StoreError> {
        let name = name.trim().to_string();
        let group = self
            .conn
            .call(move |conn| {
                conn.execute("INSERT INTO class_groups (name) VALUES (?1)", [&name])?;
                Ok(Group {
                    id: conn.last_insert_rowid(),
                    name,
                })
            })
            .await?;
        tracing::info!(group_id = group.id, name = %group.name, "group created");
        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, StoreError> {
        let groups = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM class_groups ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(groups)
    }

    pub async fn get_group(&self, id: i64) -> Result<Option<Group>, StoreError> {
        let group = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row("SELECT id, name FROM class_groups WHERE id = ?1", [id], |row| {
                        Ok(Group {
                            id: row.get(0)?,
                            name: row.get(1)?,
                        })
                    })
                    .optional()?)
            })
            .await?;
        Ok(group)
    }

    /// First group with exactly this name, if any.
    pub async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>, StoreError> {
        let name = name.trim().to_string();
        let group = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name FROM class_groups WHERE name = ?1 ORDER BY id LIMIT 1",
                        [name],
                        |row| {
                            Ok(Group {
                                id: row.get(0)?,
                                name: row.get(1)?,
                            })
                        },
                    )
                    .optional()?)
            })
            .await?;
        Ok(group)
    }

    /// Delete a group together with its memberships, sessions and their attendance.
    pub async fn delete_group(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM class_groups WHERE id = ?1", [id])? > 0))
            .await?;
        if deleted {
            tracing::info!(group_id = id, "group deleted");
        }
        Ok(deleted)
    }

    /// Add a user to a group. Returns false if they were already a member.
    ///
    /// Callers check that the group exists and the user is a student.
    pub async fn add_student(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let added = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "INSERT OR IGNORE INTO user_groups (user_id, group_id) VALUES (?1, ?2)",
                    params![user_id, group_id],
                )? > 0)
            })
            .await?;
        if added {
            tracing::info!(group_id, user_id, "student added to group");
        }
        Ok(added)
    }

    /// Remove a user from a group. Returns false if they were not a member.
    pub async fn remove_student(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "DELETE FROM user_groups WHERE user_id = ?1 AND group_id = ?2",
                    params![user_id, group_id],
                )? > 0)
            })
            .await?;
        Ok(removed)
    }

    pub async fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let member = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT 1 FROM user_groups WHERE user_id = ?1 AND group_id = ?2",
                        params![user_id, group_id],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some())
            })
            .await?;
        Ok(member)
    }

    /// Students enrolled in a group, ordered by id.
    pub async fn group_students(&self, group_id: i64) -> Result<Vec<User>, StoreError> {
        let students = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {USER_COLUMNS_U} FROM users u
                     JOIN user_groups ug ON ug.user_id = u.id
                     WHERE ug.group_id = ?1 AND u.role = 'STUDENT'
                     ORDER BY u.id"
                ))?;
                let rows = stmt.query_map([group_id], user_from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(students)
    }
}
