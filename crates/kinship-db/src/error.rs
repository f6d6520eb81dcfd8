//! Error types for the kinship store.

use kinship_types::UserId;

/// Every failure a store operation can report.
///
/// Operations are side-effect free when they return an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Lookup by id, email or connection yielded nothing.
    #[error("{entity} not found: {key}")]
    NotFound {
        entity: &'static str,
        key: String,
    },

    /// The operation names a user that does not exist.
    #[error("user {user_id} does not exist")]
    InvalidParty { user_id: UserId },

    /// A reset token did not resolve. Missing and expired tokens are
    /// reported identically.
    #[error("reset token is invalid or expired")]
    InvalidToken,

    #[error("email already registered: {email}")]
    EmailTaken { email: String },

    /// Only raised when `ConnectionPolicy::unique_pair` is enabled.
    #[error("a connection already exists between users {a} and {b}")]
    DuplicateConnection { a: UserId, b: UserId },

    /// Only raised when `MessagingPolicy::require_friendship` is enabled.
    #[error("users {from} and {to} are not friends")]
    NotFriends { from: UserId, to: UserId },

    /// A configured policy value cannot be applied, such as a token TTL
    /// that pushes the expiry past the representable time range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The credential verifier could not produce a hash.
    #[error("credential error: {0}")]
    Credential(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
