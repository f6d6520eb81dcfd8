//! Friend-request state machine.
//!
//! A friendship is one directed row: created as `Requested` by whoever asked,
//! flipped to `Accepted` by the recipient. It is never mirrored into a second
//! row and never deleted, so every "are these two friends" question has to
//! look at both orientations. That check lives here and nowhere else.

use kinship_types::{Connection, ConnectionStatus, UserId};
use rusqlite::{Connection as SqlConnection, OptionalExtension, params};
use tracing::{debug, warn};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{CONNECTION_COLUMNS, connection_from_row, from_millis, now_millis};
use crate::users::ensure_party;

impl Database {
    /// Record a friend request from `from` to `to`.
    ///
    /// Callers are expected to check [`Database::connection_between`] first;
    /// the store only refuses a second row for the pair when
    /// `ConnectionPolicy::unique_pair` is set.
    pub fn create_request(&self, from: UserId, to: UserId) -> Result<Connection> {
        let unique_pair = self.config.connection.unique_pair;

        self.with_tx(|conn| {
            ensure_party(conn, from)?;
            ensure_party(conn, to)?;

            if unique_pair && query_between(conn, from, to)?.is_some() {
                warn!(from, to, "Rejected duplicate connection request");
                return Err(StoreError::DuplicateConnection { a: from, b: to });
            }

            let now = now_millis();
            conn.execute(
                "INSERT INTO user_connects
                     (from_user_id, to_user_id, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![from, to, ConnectionStatus::Requested.code(), now],
            )?;
            let id = conn.last_insert_rowid();

            debug!(connection_id = id, from, to, "Friend request created");
            Ok(Connection {
                id,
                from_user_id: from,
                to_user_id: to,
                status: ConnectionStatus::Requested,
                created_at: from_millis(now),
                updated_at: from_millis(now),
            })
        })
    }

    /// The request `from` sent to `to`, if any. Direction matters: this is
    /// how a recipient finds the row they have to act on.
    pub fn find_incoming_request(&self, from: UserId, to: UserId) -> Result<Option<Connection>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {CONNECTION_COLUMNS} FROM user_connects
                 WHERE from_user_id = ?1 AND to_user_id = ?2
                 ORDER BY id
                 LIMIT 1"
            );
            let row = conn
                .query_row(&sql, params![from, to], connection_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Move a request to `Accepted`. Accepting an already accepted row
    /// changes nothing and returns it as stored.
    pub fn accept(&self, connection: &Connection) -> Result<Connection> {
        self.with_tx(|conn| {
            let current = query_connection(conn, connection.id)?
                .ok_or_else(|| StoreError::not_found("connection", connection.id))?;

            if current.is_accepted() {
                return Ok(current);
            }

            let now = now_millis();
            conn.execute(
                "UPDATE user_connects SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![ConnectionStatus::Accepted.code(), now, current.id],
            )?;

            debug!(
                connection_id = current.id,
                from = current.from_user_id,
                to = current.to_user_id,
                "Friend request accepted"
            );
            Ok(Connection {
                status: ConnectionStatus::Accepted,
                updated_at: from_millis(now),
                ..current
            })
        })
    }

    /// True iff an accepted row joins `a` and `b` in either direction.
    pub fn is_friend(&self, a: UserId, b: UserId) -> Result<bool> {
        self.with_conn(|conn| query_is_friend(conn, a, b))
    }

    /// The oldest row joining the unordered pair, whatever its status.
    pub fn connection_between(&self, a: UserId, b: UserId) -> Result<Option<Connection>> {
        self.with_conn(|conn| query_between(conn, a, b))
    }
}

fn query_connection(conn: &SqlConnection, id: i64) -> Result<Option<Connection>> {
    let sql = format!("SELECT {CONNECTION_COLUMNS} FROM user_connects WHERE id = ?1");
    let row = conn.query_row(&sql, [id], connection_from_row).optional()?;
    Ok(row)
}

fn query_between(conn: &SqlConnection, a: UserId, b: UserId) -> Result<Option<Connection>> {
    let sql = format!(
        "SELECT {CONNECTION_COLUMNS} FROM user_connects
         WHERE (from_user_id = ?1 AND to_user_id = ?2)
            OR (from_user_id = ?2 AND to_user_id = ?1)
         ORDER BY id
         LIMIT 1"
    );
    let row = conn
        .query_row(&sql, params![a, b], connection_from_row)
        .optional()?;
    Ok(row)
}

pub(crate) fn query_is_friend(conn: &SqlConnection, a: UserId, b: UserId) -> Result<bool> {
    let friends = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM user_connects
            WHERE status = ?3
              AND ((from_user_id = ?1 AND to_user_id = ?2)
                OR (from_user_id = ?2 AND to_user_id = ?1))
        )",
        params![a, b, ConnectionStatus::Accepted.code()],
        |r| r.get(0),
    )?;
    Ok(friends)
}
