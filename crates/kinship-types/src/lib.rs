//! Plain records handed back to callers of the kinship core.
//!
//! Nothing in here carries credential material: the password hash stays
//! inside `kinship-db`.

pub mod models;

pub use models::{
    Connection, ConnectionId, ConnectionStatus, Message, MessageId, Page, Relation, SearchHit,
    User, UserId, UserSummary,
};
