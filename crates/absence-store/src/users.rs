use rusqlite::{params, OptionalExtension, Row};

use crate::models::{NewUser, Role, User};
use crate::{Store, StoreError};

pub(crate) const USER_COLUMNS: &str =
    "id, first_name, last_name, email, role, is_active, hashed_password";

/// Same columns, qualified for queries that alias `users` as `u`.
pub(crate) const USER_COLUMNS_U: &str =
    "u.id, u.first_name, u.last_name, u.email, u.role, u.is_active, u.hashed_password";

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        role: row.get(4)?,
        is_active: row.get(5)?,
        hashed_password: row.get(6)?,
    })
}

impl Store {
    /// Insert a user. Returns `None` when the email is already taken.
    ///
    /// `new` is expected to be normalized already; `hashed_password` is the
    /// PHC string from [`crate::password::hash_password`].
    pub async fn create_user(
        &self,
        new: NewUser,
        hashed_password: Option<String>,
    ) -> Result<Option<User>, StoreError> {
        let created = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let taken = tx
                    .query_row("SELECT 1 FROM users WHERE email = ?1", [&new.email], |_| Ok(()))
                    .optional()?
                    .is_some();
                if taken {
                    return Ok(None);
                }

                tx.execute(
                    "INSERT INTO users (first_name, last_name, email, hashed_password, role, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                    params![new.first_name, new.last_name, new.email, hashed_password, new.role],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;

                Ok(Some(User {
                    id,
                    first_name: new.first_name,
                    last_name: new.last_name,
                    email: new.email,
                    role: new.role,
                    is_active: true,
                    hashed_password,
                }))
            })
            .await?;

        if let Some(user) = &created {
            tracing::info!(user_id = user.id, role = %user.role, "user created");
        }
        Ok(created)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
                let rows = stmt.query_map([], user_from_row)?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;
        Ok(users)
    }

    pub async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                        [id],
                        user_from_row,
                    )
                    .optional()?)
            })
            .await?;
        Ok(user)
    }

    /// Look a user up by email (case-insensitive).
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.trim().to_lowercase();
        let user = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(
                        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                        [email],
                        user_from_row,
                    )
                    .optional()?)
            })
            .await?;
        Ok(user)
    }

    /// Fetch a user only if they have the given role.
    pub async fn get_user_with_role(&self, id: i64, role: Role) -> Result<Option<User>, StoreError> {
        Ok(self.get_user(id).await?.filter(|u| u.role == role))
    }

    /// Delete a user and everything hanging off them. Returns false if absent.
    pub async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let deleted = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM users WHERE id = ?1", [id])? > 0))
            .await?;
        if deleted {
            tracing::info!(user_id = id, "user deleted");
        }
        Ok(deleted)
    }

    pub async fn set_user_active(&self, id: i64, active: bool) -> Result<bool, StoreError> {
        let updated = self
            .conn
            .call(move |conn| {
                Ok(conn.execute("UPDATE users SET is_active = ?2 WHERE id = ?1", params![id, active])? > 0)
            })
            .await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str, role: Role) -> NewUser {
        NewUser {
            first_name: "First".into(),
            last_name: "Last".into(),
            email: email.into(),
            role,
            password: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let store = Store::open_in_memory().await.unwrap();
        let user = store
            .create_user(new_user("a@x.org", Role::Teacher), Some("hash".into()))
            .await
            .unwrap()
            .unwrap();

        assert!(user.is_active);
        assert_eq!(store.get_user(user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(store.find_user_by_email(" A@X.org ").await.unwrap(), Some(user.clone()));
        assert_eq!(store.get_user_with_role(user.id, Role::Student).await.unwrap(), None);
        assert!(store.get_user(user.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        assert!(store.create_user(new_user("a@x.org", Role::Student), None).await.unwrap().is_some());
        assert!(store.create_user(new_user("a@x.org", Role::Admin), None).await.unwrap().is_none());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_delete_and_deactivate() {
        let store = Store::open_in_memory().await.unwrap();
        let a = store.create_user(new_user("a@x.org", Role::Student), None).await.unwrap().unwrap();
        let b = store.create_user(new_user("b@x.org", Role::Student), None).await.unwrap().unwrap();

        let ids: Vec<i64> = store.list_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        assert!(store.set_user_active(b.id, false).await.unwrap());
        assert!(!store.get_user(b.id).await.unwrap().unwrap().is_active);

        assert!(store.delete_user(a.id).await.unwrap());
        assert!(!store.delete_user(a.id).await.unwrap());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }
}
