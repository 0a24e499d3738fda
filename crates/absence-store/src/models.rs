//! Domain records and their SQL/JSON representations.

use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 150;

/// Implements `as_str`/`parse` plus SQL conversions for a text-backed enum.
macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($ty::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                $ty::parse(value.as_str()?).ok_or(FromSqlError::InvalidType)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

text_enum!(Role { Admin => "ADMIN", Teacher => "TEACHER", Student => "STUDENT" });

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(skip)]
    pub hashed_password: Option<String>,
}

/// Payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub password: Option<String>,
}

impl NewUser {
    /// Trim fields and check lengths and email shape.
    ///
    /// An empty password is treated as no password.
    pub fn normalized(mut self) -> Result<Self, String> {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.password = self.password.filter(|p| !p.is_empty());

        for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
            if value.is_empty() {
                return Err(format!("{field} must not be empty"));
            }
            if value.chars().count() > MAX_NAME_LEN {
                return Err(format!("{field} is longer than {MAX_NAME_LEN} characters"));
            }
        }
        if self.email.chars().count() > MAX_EMAIL_LEN {
            return Err(format!("email is longer than {MAX_EMAIL_LEN} characters"));
        }
        if !is_plausible_email(&self.email) {
            return Err("value is not a valid email address".to_string());
        }
        Ok(self)
    }
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

/// A scheduled class meeting of one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSession {
    pub id: i64,
    pub group_id: i64,
    pub teacher_id: Option<i64>,
    #[serde(with = "datetime")]
    pub start_time: NaiveDateTime,
    #[serde(with = "datetime")]
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSession {
    pub group_id: i64,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    #[serde(with = "datetime")]
    pub start_time: NaiveDateTime,
    #[serde(with = "datetime")]
    pub end_time: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
}

text_enum!(AttendanceStatus { Present => "PRESENT" });

/// How an attendance row was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceSource {
    Manual,
    Face,
}

text_enum!(AttendanceSource { Manual => "MANUAL", Face => "FACE" });

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attendance {
    pub id: i64,
    pub session_id: i64,
    pub user_id: i64,
    pub status: AttendanceStatus,
    pub source: AttendanceSource,
    #[serde(with = "datetime")]
    pub timestamp: NaiveDateTime,
}

/// Whether a student attended, as shown on rosters and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresenceStatus {
    Present,
    Absent,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Present => "PRESENT",
            PresenceStatus::Absent => "ABSENT",
        }
    }
}

/// One student of a session's group with their attendance state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: PresenceStatus,
    #[serde(with = "datetime::option")]
    pub timestamp: Option<NaiveDateTime>,
    pub source: Option<AttendanceSource>,
}

/// One line of the attendance spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub session_id: i64,
    pub group_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: PresenceStatus,
}

/// A student's stored face embedding, still in its JSON form.
#[derive(Debug, Clone)]
pub struct StudentFace {
    pub user_id: i64,
    pub encoding: String,
}

/// Lenient datetime (de)serialization for naive UTC timestamps.
///
/// Accepts RFC 3339 (offset converted to UTC), and `YYYY-MM-DD[T ]HH:MM[:SS[.f]]`.
/// Always writes `YYYY-MM-DDTHH:MM:SS`.
pub mod datetime {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    const NAIVE_FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    }

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&dt.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid datetime: {raw}")))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(dt: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, s),
                None => s.serialize_none(),
            }
        }
    }
}
