//! Relational state layer for the kinship social graph: users, friend
//! connections, direct messages and password-reset tokens, all backed by a
//! single SQLite database.
//!
//! Every operation is a method on [`Database`]. Queries take the acting user
//! as an explicit argument; nothing is resolved from ambient session state.

pub mod config;
pub mod connections;
pub mod credentials;
pub mod error;
pub mod graph;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reset_tokens;
pub mod users;

#[cfg(test)]
mod test_support;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use config::{
    ConnectionPolicy, MessagingPolicy, QueryDefaults, SearchPolicy, StoreConfig, TokenPolicy,
};
pub use credentials::{Argon2Verifier, CredentialVerifier};
pub use error::{Result, StoreError};
pub use kinship_types as types;
pub use models::{ProfileUpdate, UserRow};

pub struct Database {
    conn: Mutex<Connection>,
    config: StoreConfig,
    verifier: Box<dyn CredentialVerifier>,
}

impl Database {
    /// Open (or create) the database at `path` with the default policies and
    /// Argon2 credentials.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, StoreConfig::default(), Box::new(Argon2Verifier::default()))
    }

    pub fn open_with(
        path: &Path,
        config: StoreConfig,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers from other processes
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn, config, verifier)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Private in-memory database, used by tests and throwaway tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(StoreConfig::default(), Box::new(Argon2Verifier::default()))
    }

    pub fn open_in_memory_with(
        config: StoreConfig,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, config, verifier)
    }

    fn init(
        conn: Connection,
        config: StoreConfig,
        verifier: Box<dyn CredentialVerifier>,
    ) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            config,
            verifier,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run a read against the connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside a transaction. It commits only if `f` returns `Ok`;
    /// on error the transaction is dropped and rolled back, so a failed
    /// operation leaves no partial state behind.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}
