//! Single-use, time-bounded password-reset tokens.
//!
//! Validity is never stored: a token is good while `expire_at > now`.
//! Resolution reports missing and expired tokens identically.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use kinship_types::UserId;
use rand::RngCore;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::users::{ensure_party, store_credential};

/// 256 bits of randomness per token.
const TOKEN_BYTES: usize = 32;

impl Database {
    /// Issue a fresh token for `user_id`, valid for the configured TTL.
    /// The returned string is meant for out-of-band delivery.
    pub fn issue_reset_token(&self, user_id: UserId) -> Result<String> {
        self.issue_reset_token_at(user_id, Utc::now())
    }

    pub fn issue_reset_token_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String> {
        let expire_at = now
            .checked_add_signed(self.config.tokens.ttl)
            .ok_or(StoreError::InvalidConfig("reset token TTL overflows the expiry time"))?;
        let token = generate_token();

        self.with_tx(|conn| {
            ensure_party(conn, user_id)?;
            conn.execute(
                "INSERT INTO password_reset_tokens
                     (token, user_id, expire_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![
                    token,
                    user_id,
                    expire_at.timestamp_millis(),
                    now.timestamp_millis()
                ],
            )?;
            Ok(())
        })?;

        debug!(user_id, %expire_at, "Issued password reset token");
        Ok(token)
    }

    /// The user a live token belongs to, or `InvalidToken`.
    pub fn resolve_reset_token(&self, token: &str) -> Result<UserId> {
        self.resolve_reset_token_at(token, Utc::now())
    }

    pub fn resolve_reset_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<UserId> {
        self.with_conn(|conn| query_live_token(conn, token, now))?
            .ok_or(StoreError::InvalidToken)
    }

    /// Delete every row carrying `token`. Returns how many were removed.
    pub fn consume_reset_token(&self, token: &str) -> Result<usize> {
        let removed = self.with_tx(|conn| delete_token(conn, token))?;
        debug!(removed, "Consumed password reset token");
        Ok(removed)
    }

    /// Redeem a token: set the new password (activating the account) and
    /// burn the token, all in one transaction.
    pub fn complete_password_reset(&self, token: &str, new_password: &str) -> Result<UserId> {
        // Hashed up front so valid and invalid tokens cost the same.
        let hash = self.verifier.hash(new_password)?;
        let now = Utc::now();

        let user_id = self.with_tx(|conn| {
            let user_id = query_live_token(conn, token, now)?.ok_or(StoreError::InvalidToken)?;
            store_credential(conn, user_id, &hash)?;
            delete_token(conn, token)?;
            Ok(user_id)
        })?;

        info!(user_id, "Password reset completed");
        Ok(user_id)
    }

    /// Drop tokens that can no longer resolve. Purely housekeeping: lookups
    /// already ignore expired rows.
    pub fn prune_expired_reset_tokens(&self) -> Result<usize> {
        self.prune_expired_reset_tokens_at(Utc::now())
    }

    pub fn prune_expired_reset_tokens_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_tx(|conn| {
            let removed = conn.execute(
                "DELETE FROM password_reset_tokens WHERE expire_at <= ?1",
                [now.timestamp_millis()],
            )?;
            Ok(removed)
        })
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn query_live_token(conn: &Connection, token: &str, now: DateTime<Utc>) -> Result<Option<UserId>> {
    let user_id = conn
        .query_row(
            "SELECT user_id FROM password_reset_tokens
             WHERE token = ?1 AND expire_at > ?2
             ORDER BY id DESC
             LIMIT 1",
            params![token, now.timestamp_millis()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(user_id)
}

fn delete_token(conn: &Connection, token: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM password_reset_tokens WHERE token = ?1", [token])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;
    use crate::config::TokenPolicy;
    use crate::test_support::{memory_db, memory_db_with};
    use chrono::Duration;

    #[test]
    fn issue_then_resolve() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        let token = db.issue_reset_token(alice.id).unwrap();
        assert_eq!(db.resolve_reset_token(&token).unwrap(), alice.id);
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        let a = db.issue_reset_token(alice.id).unwrap();
        let b = db.issue_reset_token(alice.id).unwrap();
        assert_ne!(a, b);
        // 32 bytes, unpadded base64
        assert_eq!(a.len(), 43);
        assert!(!a.contains('+') && !a.contains('/') && !a.contains('='));
    }

    #[test]
    fn expiry_is_exclusive() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let issued_at = Utc::now();

        let token = db.issue_reset_token_at(alice.id, issued_at).unwrap();

        let just_before = issued_at + Duration::hours(24) - Duration::milliseconds(1);
        let at_expiry = issued_at + Duration::hours(24);
        assert_eq!(db.resolve_reset_token_at(&token, just_before).unwrap(), alice.id);
        assert!(matches!(
            db.resolve_reset_token_at(&token, at_expiry).unwrap_err(),
            StoreError::InvalidToken
        ));
    }

    #[test]
    fn expired_and_unknown_tokens_look_the_same() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let token = db
            .issue_reset_token_at(alice.id, Utc::now() - Duration::days(2))
            .unwrap();

        let expired = db.resolve_reset_token(&token).unwrap_err();
        let unknown = db.resolve_reset_token("no-such-token").unwrap_err();
        assert_eq!(expired.to_string(), unknown.to_string());
        assert!(matches!(expired, StoreError::InvalidToken));
        assert!(matches!(unknown, StoreError::InvalidToken));
    }

    #[test]
    fn ttl_follows_policy() {
        let db = memory_db_with(StoreConfig {
            tokens: TokenPolicy {
                ttl: Duration::minutes(15),
            },
            ..Default::default()
        });
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let now = Utc::now();
        let token = db.issue_reset_token_at(alice.id, now).unwrap();

        assert!(db.resolve_reset_token_at(&token, now + Duration::minutes(14)).is_ok());
        assert!(db.resolve_reset_token_at(&token, now + Duration::minutes(16)).is_err());
    }

    #[test]
    fn oversized_ttl_is_an_error_not_a_panic() {
        let db = memory_db_with(StoreConfig {
            tokens: TokenPolicy {
                ttl: Duration::hours(10_000_000_000),
            },
            ..Default::default()
        });
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        assert!(matches!(
            db.issue_reset_token(alice.id).unwrap_err(),
            StoreError::InvalidConfig(_)
        ));
        let stored: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM password_reset_tokens", [], |r| {
                    r.get(0)
                })?)
            })
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[test]
    fn consume_invalidates() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let token = db.issue_reset_token(alice.id).unwrap();

        assert_eq!(db.consume_reset_token(&token).unwrap(), 1);
        assert!(matches!(
            db.resolve_reset_token(&token).unwrap_err(),
            StoreError::InvalidToken
        ));
        assert_eq!(db.consume_reset_token(&token).unwrap(), 0);
    }

    #[test]
    fn issuing_for_unknown_user_fails() {
        let db = memory_db();
        assert!(matches!(
            db.issue_reset_token(12).unwrap_err(),
            StoreError::InvalidParty { user_id: 12 }
        ));
    }

    #[test]
    fn complete_reset_activates_and_burns_token() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let token = db.issue_reset_token(alice.id).unwrap();

        assert_eq!(db.complete_password_reset(&token, "n3w-pass").unwrap(), alice.id);

        let alice = db.find_by_id(alice.id).unwrap();
        assert!(alice.is_active);
        assert!(db.verify_credential(&alice, "n3w-pass"));
        assert!(db.resolve_reset_token(&token).is_err());
        assert!(matches!(
            db.complete_password_reset(&token, "again").unwrap_err(),
            StoreError::InvalidToken
        ));
    }

    #[test]
    fn failed_reset_changes_nothing() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        db.issue_reset_token_at(alice.id, Utc::now() - Duration::days(2))
            .unwrap();

        assert!(db.complete_password_reset("bogus", "pw").is_err());
        let alice = db.find_by_id(alice.id).unwrap();
        assert!(!alice.is_active);
    }

    #[test]
    fn prune_removes_only_expired() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let now = Utc::now();

        let stale = db
            .issue_reset_token_at(alice.id, now - Duration::days(3))
            .unwrap();
        let live = db.issue_reset_token_at(alice.id, now).unwrap();

        assert_eq!(db.prune_expired_reset_tokens_at(now).unwrap(), 1);
        assert_eq!(db.consume_reset_token(&stale).unwrap(), 0);
        assert_eq!(db.resolve_reset_token_at(&live, now).unwrap(), alice.id);
    }
}
