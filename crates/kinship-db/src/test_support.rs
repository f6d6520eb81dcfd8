use kinship_types::UserId;
use rusqlite::params;

use crate::{Argon2Verifier, Database, StoreConfig};

pub(crate) fn memory_db() -> Database {
    Database::open_in_memory().unwrap()
}

pub(crate) fn memory_db_with(config: StoreConfig) -> Database {
    Database::open_in_memory_with(config, Box::new(Argon2Verifier::default())).unwrap()
}

/// Flip the active flag without paying for an Argon2 hash.
pub(crate) fn activate(db: &Database, user_id: UserId) {
    db.with_conn(|conn| {
        conn.execute("UPDATE users SET is_active = 1 WHERE id = ?1", params![user_id])?;
        Ok(())
    })
    .unwrap();
}

/// Create an active user whose email is derived from the name.
pub(crate) fn active_user(db: &Database, username: &str) -> UserId {
    let user = db
        .create_user(username, &format!("{username}@example.com"))
        .unwrap();
    activate(db, user.id);
    user.id
}
