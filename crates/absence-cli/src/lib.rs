//! Commands behind the `absence` admin CLI.
//!
//! Each command writes its human-readable output to `out` so it can be
//! exercised without a terminal.

use std::io::Write;
use std::path::Path;

use absence_store::password::hash_password;
use absence_store::{AttendanceSource, NewSession, NewUser, Role, Store, User};
use anyhow::{anyhow, Context, Result};
use chrono::{Duration, Timelike, Utc};

pub const DEMO_GROUP: &str = "GI1-A";
const DEMO_STUDENTS: usize = 5;
const DEMO_PRESENT: usize = 2;

/// Account details for `create-admin`.
#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl Default for AdminAccount {
    fn default() -> Self {
        Self {
            email: "admin@example.com".into(),
            password: "admin123".into(),
            first_name: "Admin".into(),
            last_name: "User".into(),
        }
    }
}

/// The store applies the schema on open; this only reports where it lives.
pub async fn cmd_init(store: &Store, db: &Path, out: &mut impl Write) -> Result<()> {
    let users = store.list_users().await?.len();
    writeln!(out, "Database ready at {} ({users} users)", db.display())?;
    Ok(())
}

/// Find a user by email, creating them if absent. Returns the user and
/// whether it was created.
async fn ensure_user(
    store: &Store,
    first_name: &str,
    last_name: &str,
    email: &str,
    role: Role,
    password: &str,
) -> Result<(User, bool)> {
    if let Some(existing) = store.find_user_by_email(email).await? {
        return Ok((existing, false));
    }

    let new = NewUser {
        first_name: first_name.into(),
        last_name: last_name.into(),
        email: email.into(),
        role,
        password: Some(password.into()),
    }
    .normalized()
    .map_err(|e| anyhow!("invalid user {email}: {e}"))?;
    let hashed = hash_password(password)?;

    let user = store
        .create_user(new, Some(hashed))
        .await?
        .with_context(|| format!("user {email} appeared concurrently"))?;
    Ok((user, true))
}

pub async fn cmd_create_admin(store: &Store, account: AdminAccount, out: &mut impl Write) -> Result<()> {
    let (user, created) = ensure_user(
        store,
        &account.first_name,
        &account.last_name,
        &account.email,
        Role::Admin,
        &account.password,
    )
    .await?;

    if created {
        writeln!(out, "Admin created: {} (id {})", user.email, user.id)?;
    } else {
        writeln!(out, "Admin already exists: {} (id {}, role {})", user.email, user.id, user.role)?;
    }
    Ok(())
}

/// Admin, teacher, five students in one group, a session starting now and
/// two students marked present. Users and the group are reused if present.
pub async fn cmd_seed_demo(store: &Store, out: &mut impl Write) -> Result<()> {
    let admin = AdminAccount::default();
    let (admin, _) = ensure_user(
        store,
        &admin.first_name,
        &admin.last_name,
        &admin.email,
        Role::Admin,
        &admin.password,
    )
    .await?;
    let (teacher, _) = ensure_user(store, "Demo", "Teacher", "teacher@example.com", Role::Teacher, "teacher123").await?;

    let mut students = Vec::with_capacity(DEMO_STUDENTS);
    for i in 1..=DEMO_STUDENTS {
        let email = format!("student{i}@example.com");
        let (student, _) =
            ensure_user(store, &format!("Student{i}"), "Demo", &email, Role::Student, "student123").await?;
        students.push(student);
    }

    let group = match store.find_group_by_name(DEMO_GROUP).await? {
        Some(group) => group,
        None => store.create_group(DEMO_GROUP).await?,
    };
    for student in &students {
        store.add_student(group.id, student.id).await?;
    }

    let now = Utc::now().naive_utc();
    let start = now.with_nanosecond(0).unwrap_or(now);
    let session = store
        .create_session(NewSession {
            group_id: group.id,
            teacher_id: Some(teacher.id),
            start_time: start,
            end_time: start + Duration::hours(1),
        })
        .await?;

    for student in students.iter().take(DEMO_PRESENT) {
        store
            .mark_present(session.id, student.id, AttendanceSource::Manual, start)
            .await?;
    }

    writeln!(out, "Demo data ready:")?;
    writeln!(out, "  admin    {} / admin123", admin.email)?;
    writeln!(out, "  teacher  {} / teacher123", teacher.email)?;
    writeln!(out, "  group    {} (id {}) with {} students", group.name, group.id, students.len())?;
    writeln!(out, "  session  id {} starting {}", session.id, session.start_time)?;
    Ok(())
}

pub async fn cmd_users(store: &Store, out: &mut impl Write) -> Result<()> {
    let users = store.list_users().await?;
    if users.is_empty() {
        writeln!(out, "No users")?;
        return Ok(());
    }

    writeln!(out, "{:<5} {:<8} {:<32} {:<30} {}", "ID", "ROLE", "EMAIL", "NAME", "ACTIVE")?;
    for u in users {
        let name = format!("{} {}", u.first_name, u.last_name);
        writeln!(
            out,
            "{:<5} {:<8} {:<32} {:<30} {}",
            u.id,
            u.role.as_str(),
            u.email,
            name,
            if u.is_active { "yes" } else { "no" }
        )?;
    }
    Ok(())
}
