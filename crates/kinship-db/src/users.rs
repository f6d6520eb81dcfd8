//! Identity store: user records and credential checks.

use kinship_types::UserId;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, warn};

use crate::Database;
use crate::credentials::UNUSABLE_HASH;
use crate::error::{Result, StoreError};
use crate::models::{ProfileUpdate, USER_COLUMNS, UserRow, now_millis, user_from_row};

impl Database {
    /// Register a new, inactive user. The account has no usable password
    /// until its first password reset completes.
    pub fn create_user(&self, username: &str, email: &str) -> Result<UserRow> {
        self.with_tx(|conn| {
            if query_user_by_email(conn, email)?.is_some() {
                return Err(StoreError::EmailTaken {
                    email: email.to_string(),
                });
            }

            let now = now_millis();
            conn.execute(
                "INSERT INTO users (username, email, password, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![username, email, UNUSABLE_HASH, now],
            )?;
            let id = conn.last_insert_rowid();

            info!(user_id = id, "Registered user");
            query_user_by_id(conn, id)?.ok_or_else(|| StoreError::not_found("user", id))
        })
    }

    pub fn find_by_email(&self, email: &str) -> Result<UserRow> {
        self.with_conn(|conn| query_user_by_email(conn, email))?
            .ok_or_else(|| StoreError::not_found("user", email))
    }

    pub fn find_by_id(&self, id: UserId) -> Result<UserRow> {
        self.with_conn(|conn| query_user_by_id(conn, id))?
            .ok_or_else(|| StoreError::not_found("user", id))
    }

    pub fn verify_credential(&self, user: &UserRow, plaintext: &str) -> bool {
        self.verifier.verify(&user.password_hash, plaintext)
    }

    /// Replace the user's password and mark the account active. Activation
    /// rides on the password change: a never-activated account becomes
    /// usable the moment its first reset completes.
    pub fn set_new_credential(&self, user_id: UserId, plaintext: &str) -> Result<()> {
        // Hash outside the lock; Argon2 is deliberately slow.
        let hash = self.verifier.hash(plaintext)?;

        self.with_tx(|conn| store_credential(conn, user_id, &hash))
    }

    pub fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> Result<UserRow> {
        self.with_tx(|conn| {
            let mut user = query_user_by_id(conn, user_id)?
                .ok_or_else(|| StoreError::not_found("user", user_id))?;

            if let Some(email) = &update.email {
                if *email != user.email && query_user_by_email(conn, email)?.is_some() {
                    return Err(StoreError::EmailTaken {
                        email: email.clone(),
                    });
                }
                user.email = email.clone();
            }
            if let Some(username) = &update.username {
                user.username = username.clone();
            }
            if let Some(picture_path) = &update.picture_path {
                user.picture_path = picture_path.clone();
            }

            conn.execute(
                "UPDATE users SET username = ?1, email = ?2, picture_path = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![user.username, user.email, user.picture_path, now_millis(), user_id],
            )?;

            debug!(user_id, "Updated profile");
            query_user_by_id(conn, user_id)?.ok_or_else(|| StoreError::not_found("user", user_id))
        })
    }
}

pub(crate) fn query_user_by_id(conn: &Connection, id: UserId) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let row = conn.query_row(&sql, [id], user_from_row).optional()?;
    Ok(row)
}

pub(crate) fn query_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    let row = conn.query_row(&sql, [email], user_from_row).optional()?;
    Ok(row)
}

/// Fails with `InvalidParty` unless `user_id` names an existing user.
pub(crate) fn ensure_party(conn: &Connection, user_id: UserId) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
        [user_id],
        |r| r.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        warn!(user_id, "Unknown user referenced");
        Err(StoreError::InvalidParty { user_id })
    }
}

pub(crate) fn store_credential(conn: &Connection, user_id: UserId, hash: &str) -> Result<()> {
    let changed = conn.execute(
        "UPDATE users SET password = ?1, is_active = 1, updated_at = ?2 WHERE id = ?3",
        params![hash, now_millis(), user_id],
    )?;

    if changed == 0 {
        return Err(StoreError::not_found("user", user_id));
    }

    debug!(user_id, "Stored new credential and activated account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{activate, memory_db};

    #[test]
    fn ensure_party_rejects_unknown_users() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        db.with_conn(|conn| ensure_party(conn, alice.id)).unwrap();
        let err = db.with_conn(|conn| ensure_party(conn, 404)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidParty { user_id: 404 }));
    }

    #[test]
    fn create_and_find_user() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        assert!(!alice.is_active);
        assert_eq!(alice.password_hash, UNUSABLE_HASH);

        let by_email = db.find_by_email("alice@example.com").unwrap();
        let by_id = db.find_by_id(alice.id).unwrap();
        assert_eq!(by_email.id, alice.id);
        assert_eq!(by_id.username, "alice");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = memory_db();
        db.create_user("alice", "alice@example.com").unwrap();

        let err = db.create_user("alice2", "alice@example.com").unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken { .. }));
    }

    #[test]
    fn missing_user_is_not_found() {
        let db = memory_db();
        assert!(matches!(
            db.find_by_id(42).unwrap_err(),
            StoreError::NotFound { entity: "user", .. }
        ));
        assert!(matches!(
            db.find_by_email("nobody@example.com").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn new_account_has_no_usable_password() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        assert!(!db.verify_credential(&alice, ""));
        assert!(!db.verify_credential(&alice, UNUSABLE_HASH));
    }

    #[test]
    fn set_new_credential_activates_account() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();

        db.set_new_credential(alice.id, "hunter22").unwrap();

        let alice = db.find_by_id(alice.id).unwrap();
        assert!(alice.is_active);
        assert_ne!(alice.password_hash, "hunter22");
        assert!(db.verify_credential(&alice, "hunter22"));
        assert!(!db.verify_credential(&alice, "hunter23"));
    }

    #[test]
    fn set_new_credential_for_missing_user() {
        let db = memory_db();
        assert!(matches!(
            db.set_new_credential(7, "pw").unwrap_err(),
            StoreError::NotFound { .. }
        ));
    }

    #[test]
    fn update_profile_edits_only_given_fields() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        activate(&db, alice.id);

        let updated = db
            .update_profile(
                alice.id,
                &ProfileUpdate {
                    picture_path: Some(Some("user_image/alice.png".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.email, "alice@example.com");
        assert_eq!(updated.picture_path.as_deref(), Some("user_image/alice.png"));
        assert!(updated.is_active);
    }

    #[test]
    fn update_profile_keeps_email_unique() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        db.create_user("bob", "bob@example.com").unwrap();

        let err = db
            .update_profile(
                alice.id,
                &ProfileUpdate {
                    email: Some("bob@example.com".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::EmailTaken { .. }));

        // Re-saving your own address is fine.
        db.update_profile(
            alice.id,
            &ProfileUpdate {
                email: Some("alice@example.com".into()),
                username: Some("alice_l".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(db.find_by_id(alice.id).unwrap().username, "alice_l");
    }

    #[test]
    fn to_user_omits_hash() {
        let db = memory_db();
        let alice = db.create_user("alice", "alice@example.com").unwrap();
        let user = alice.to_user();
        assert_eq!(user.id, alice.id);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(alice.summary().username, "alice");
    }
}
