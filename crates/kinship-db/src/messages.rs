//! Direct messages and their read / read-receipt flags.

use kinship_types::{Message, MessageId, UserId};
use rusqlite::{Connection, params, params_from_iter};
use tracing::{debug, warn};

use crate::Database;
use crate::connections::query_is_friend;
use crate::error::{Result, StoreError};
use crate::models::{MESSAGE_COLUMNS, from_millis, message_from_row, now_millis};
use crate::users::ensure_party;

/// Upper bound on ids bound into one `IN (...)` list.
const ID_CHUNK: usize = 500;

impl Database {
    /// Store a message from `from` to `to`. Messaging is not gated on
    /// friendship unless `MessagingPolicy::require_friendship` is set.
    pub fn send(&self, from: UserId, to: UserId, body: &str) -> Result<Message> {
        let require_friendship = self.config.messaging.require_friendship;

        self.with_tx(|conn| {
            ensure_party(conn, from)?;
            ensure_party(conn, to)?;

            if require_friendship && !query_is_friend(conn, from, to)? {
                warn!(from, to, "Rejected message between non-friends");
                return Err(StoreError::NotFriends { from, to });
            }

            let now = now_millis();
            conn.execute(
                "INSERT INTO messages
                     (from_user_id, to_user_id, body, is_read, is_checked, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, 0, ?4, ?4)",
                params![from, to, body, now],
            )?;
            let id = conn.last_insert_rowid();

            debug!(message_id = id, from, to, "Message stored");
            Ok(Message {
                id,
                from_user_id: from,
                to_user_id: to,
                body: body.to_string(),
                is_read: false,
                is_checked: false,
                created_at: from_millis(now),
                updated_at: from_millis(now),
            })
        })
    }

    /// The most recent page of the thread with the configured page size.
    pub fn get_latest_thread(&self, a: UserId, b: UserId) -> Result<Vec<Message>> {
        self.get_thread(a, b, 0, self.config.defaults.thread_page_size)
    }

    /// Messages between `a` and `b` in either direction, newest first.
    ///
    /// Pagination is anchored at the newest message: `offset` skips that
    /// many recent messages. Reverse the result for oldest-first display.
    pub fn get_thread(
        &self,
        a: UserId,
        b: UserId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE (from_user_id = ?1 AND to_user_id = ?2)
                    OR (from_user_id = ?2 AND to_user_id = ?1)
                 ORDER BY id DESC
                 LIMIT ?3 OFFSET ?4"
            ))?;

            let rows = stmt
                .query_map(params![a, b, limit, offset], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Mark the given messages read. Returns how many changed state.
    ///
    /// No ownership filtering happens here; the caller decides which ids the
    /// actor may touch. All ids are updated in one transaction.
    pub fn mark_read(&self, ids: &[MessageId]) -> Result<usize> {
        let changed = self.update_by_ids("is_read = 1", "is_read = 0", ids)?;
        debug!(requested = ids.len(), changed, "Marked messages read");
        Ok(changed)
    }

    /// Mark the given messages' read receipts as seen by the sender.
    ///
    /// Unread messages are skipped, so `is_checked` never runs ahead of
    /// `is_read`. `is_read` itself is never touched.
    pub fn mark_checked(&self, ids: &[MessageId]) -> Result<usize> {
        let changed = self.update_by_ids("is_checked = 1", "is_read = 1 AND is_checked = 0", ids)?;
        debug!(requested = ids.len(), changed, "Marked read receipts checked");
        Ok(changed)
    }

    /// Unread messages from `from` to `to`, oldest first.
    pub fn list_unread(&self, from: UserId, to: UserId) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_directed(conn, from, to, "is_read = 0"))
    }

    /// Messages from `from` to `to` that were read but whose receipt the
    /// sender has not acknowledged yet, oldest first.
    pub fn list_unchecked_read(&self, from: UserId, to: UserId) -> Result<Vec<Message>> {
        self.with_conn(|conn| query_directed(conn, from, to, "is_read = 1 AND is_checked = 0"))
    }

    fn update_by_ids(&self, set: &str, guard: &str, ids: &[MessageId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_tx(|conn| {
            let now = now_millis();
            let mut changed = 0;

            for chunk in ids.chunks(ID_CHUNK) {
                let placeholders: Vec<String> =
                    (2..chunk.len() + 2).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "UPDATE messages SET {set}, updated_at = ?1
                     WHERE {guard} AND id IN ({})",
                    placeholders.join(", ")
                );

                let params = std::iter::once(now).chain(chunk.iter().copied());
                changed += conn.execute(&sql, params_from_iter(params))?;
            }

            Ok(changed)
        })
    }
}

fn query_directed(
    conn: &Connection,
    from: UserId,
    to: UserId,
    filter: &str,
) -> Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages
         WHERE from_user_id = ?1 AND to_user_id = ?2 AND {filter}
         ORDER BY id"
    ))?;

    let rows = stmt
        .query_map(params![from, to], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}
