//! Read-side views over the social graph, always from the point of view of
//! an explicit actor.

use kinship_types::{ConnectionStatus, Page, SearchHit, UserId, UserSummary};
use rusqlite::{Connection, params};

use crate::Database;
use crate::error::Result;
use crate::models::{search_hit_from_row, summary_from_row};

impl Database {
    /// Name search with the configured default page size.
    pub fn search_by_name(
        &self,
        actor: UserId,
        pattern: &str,
        page: u32,
    ) -> Result<Page<SearchHit>> {
        self.search_by_name_sized(
            actor,
            pattern,
            page,
            self.config.defaults.search_page_size,
        )
    }

    /// Substring search over active users' names, excluding the actor.
    ///
    /// Each hit carries the status of a request in each direction between the
    /// actor and the candidate, so callers can tell "I asked them" from "they
    /// asked me" from "no relation". Results are ordered by username. Page
    /// numbers start at 1; a page past the end (or page 0) is empty.
    pub fn search_by_name_sized(
        &self,
        actor: UserId,
        pattern: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SearchHit>> {
        let (predicate, needle) = if self.config.search.case_sensitive {
            ("instr(u.username, ?2) > 0", pattern.to_string())
        } else {
            ("u.username LIKE ?2 ESCAPE '\\'", like_contains(pattern))
        };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM users u
                     WHERE u.id != ?1 AND u.is_active = 1 AND {predicate}"
                ),
                params![actor, needle],
                |r| r.get(0),
            )?;
            let total = u64::try_from(total).unwrap_or_default();

            if page == 0 || page_size == 0 {
                return Ok(Page::empty(page, page_size, total));
            }

            let offset = match i64::from(page - 1).checked_mul(i64::from(page_size)) {
                Some(offset) if u64::try_from(offset).is_ok_and(|o| o < total) => offset,
                _ => return Ok(Page::empty(page, page_size, total)),
            };

            // MAX() collapses duplicate rows for a pair; Accepted outranks Requested.
            let mut stmt = conn.prepare(&format!(
                "SELECT u.id, u.username, u.picture_path,
                        (SELECT MAX(c.status) FROM user_connects c
                          WHERE c.from_user_id = u.id AND c.to_user_id = ?1),
                        (SELECT MAX(c.status) FROM user_connects c
                          WHERE c.from_user_id = ?1 AND c.to_user_id = u.id)
                 FROM users u
                 WHERE u.id != ?1 AND u.is_active = 1 AND {predicate}
                 ORDER BY u.username, u.id
                 LIMIT ?3 OFFSET ?4"
            ))?;

            let items = stmt
                .query_map(
                    params![actor, needle, i64::from(page_size), offset],
                    search_hit_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Page {
                items,
                page,
                page_size,
                total,
            })
        })
    }

    /// Everyone the actor is friends with, whichever side sent the request.
    pub fn list_friends(&self, actor: UserId) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT to_user_id FROM user_connects WHERE from_user_id = ?1 AND status = ?2
                 UNION
                 SELECT from_user_id FROM user_connects WHERE to_user_id = ?1 AND status = ?2",
                actor,
                ConnectionStatus::Accepted,
            )
        })
    }

    /// Users waiting on the actor to accept their request.
    pub fn list_incoming_requests(&self, actor: UserId) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT from_user_id FROM user_connects WHERE to_user_id = ?1 AND status = ?2",
                actor,
                ConnectionStatus::Requested,
            )
        })
    }

    /// Users the actor has asked and who have not accepted yet.
    pub fn list_outgoing_requests(&self, actor: UserId) -> Result<Vec<UserSummary>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT to_user_id FROM user_connects WHERE from_user_id = ?1 AND status = ?2",
                actor,
                ConnectionStatus::Requested,
            )
        })
    }
}

/// Project the users whose ids `id_subquery` selects. The `IN` keeps each
/// user to a single row even when duplicate connection rows exist.
fn query_summaries(
    conn: &Connection,
    id_subquery: &str,
    actor: UserId,
    status: ConnectionStatus,
) -> Result<Vec<UserSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT u.id, u.username, u.picture_path FROM users u
         WHERE u.id IN ({id_subquery})
         ORDER BY u.username, u.id"
    ))?;

    let rows = stmt
        .query_map(params![actor, status.code()], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// `%pattern%` with LIKE metacharacters escaped so they match literally.
fn like_contains(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('%');
    for ch in pattern.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}
