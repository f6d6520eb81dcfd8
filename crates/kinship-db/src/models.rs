//! Database row types and the mapping from SQLite rows to the records in
//! `kinship-types`.

use std::fmt;

use chrono::{DateTime, Utc};
use kinship_types::{
    Connection, ConnectionStatus, Message, SearchHit, User, UserId, UserSummary,
};
use rusqlite::Row;
use rusqlite::types::Type;

/// Full user record as stored, including the credential hash. Only the
/// identity store hands this out; everything else returns [`UserSummary`].
#[derive(Clone)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub picture_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            picture_path: self.picture_path.clone(),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            picture_path: self.picture_path.clone(),
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            picture_path: row.picture_path,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("picture_path", &self.picture_path)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// Partial profile edit. `None` leaves a field untouched; `picture_path:
/// Some(None)` clears the picture.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub picture_path: Option<Option<String>>,
}

pub(crate) const USER_COLUMNS: &str =
    "id, username, email, password, picture_path, is_active, created_at, updated_at";

pub(crate) const CONNECTION_COLUMNS: &str =
    "id, from_user_id, to_user_id, status, created_at, updated_at";

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, from_user_id, to_user_id, body, is_read, is_checked, created_at, updated_at";

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        picture_path: row.get(4)?,
        is_active: row.get(5)?,
        created_at: from_millis(row.get(6)?),
        updated_at: from_millis(row.get(7)?),
    })
}

pub(crate) fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<UserSummary> {
    Ok(UserSummary {
        id: row.get(0)?,
        username: row.get(1)?,
        picture_path: row.get(2)?,
    })
}

pub(crate) fn connection_from_row(row: &Row<'_>) -> rusqlite::Result<Connection> {
    Ok(Connection {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        status: status_at(row, 3)?,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
    })
}

pub(crate) fn search_hit_from_row(row: &Row<'_>) -> rusqlite::Result<SearchHit> {
    Ok(SearchHit {
        id: row.get(0)?,
        username: row.get(1)?,
        picture_path: row.get(2)?,
        status_to_actor: optional_status_at(row, 3)?,
        status_from_actor: optional_status_at(row, 4)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        from_user_id: row.get(1)?,
        to_user_id: row.get(2)?,
        body: row.get(3)?,
        is_read: row.get(4)?,
        is_checked: row.get(5)?,
        created_at: from_millis(row.get(6)?),
        updated_at: from_millis(row.get(7)?),
    })
}

fn status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<ConnectionStatus> {
    decode_status(idx, row.get(idx)?)
}

fn optional_status_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<ConnectionStatus>> {
    row.get::<_, Option<i64>>(idx)?
        .map(|code| decode_status(idx, code))
        .transpose()
}

fn decode_status(idx: usize, code: i64) -> rusqlite::Result<ConnectionStatus> {
    ConnectionStatus::from_code(code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("unknown connection status {code}").into(),
        )
    })
}
