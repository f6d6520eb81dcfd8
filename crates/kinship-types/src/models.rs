use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ConnectionId = i64;
pub type MessageId = i64;

/// Public view of a user. The credential hash is deliberately absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub picture_path: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lightweight projection used by every social-graph listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub picture_path: Option<String>,
}

/// Status of a directed friend request. Persisted as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Requested,
    Accepted,
}

impl ConnectionStatus {
    pub fn code(self) -> i64 {
        match self {
            ConnectionStatus::Requested => 1,
            ConnectionStatus::Accepted => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(ConnectionStatus::Requested),
            2 => Some(ConnectionStatus::Accepted),
            _ => None,
        }
    }
}

/// A directed edge: `from_user_id` asked `to_user_id` to be friends.
///
/// One row per logical friendship. It keeps its original direction after
/// being accepted, so "are A and B friends" must look at both orientations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub status: ConnectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn is_accepted(&self) -> bool {
        self.status == ConnectionStatus::Accepted
    }

    /// The party on the other end of this edge, seen from `user_id`.
    pub fn other_party(&self, user_id: UserId) -> Option<UserId> {
        if self.from_user_id == user_id {
            Some(self.to_user_id)
        } else if self.to_user_id == user_id {
            Some(self.from_user_id)
        } else {
            None
        }
    }
}

/// One row of a name search, annotated with the connection state in both
/// directions between the actor and the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: UserId,
    pub username: String,
    pub picture_path: Option<String>,
    /// Status of a request candidate -> actor, if one exists.
    pub status_to_actor: Option<ConnectionStatus>,
    /// Status of a request actor -> candidate, if one exists.
    pub status_from_actor: Option<ConnectionStatus>,
}

/// How a search candidate relates to the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    None,
    /// The actor asked the candidate and is waiting.
    Requesting,
    /// The candidate asked the actor and is waiting.
    Requested,
    Friends,
}

impl SearchHit {
    pub fn relation(&self) -> Relation {
        use ConnectionStatus::{Accepted, Requested};

        match (self.status_from_actor, self.status_to_actor) {
            (Some(Accepted), _) | (_, Some(Accepted)) => Relation::Friends,
            (Some(Requested), _) => Relation::Requesting,
            (_, Some(Requested)) => Relation::Requested,
            (None, None) => Relation::None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub body: String,
    pub is_read: bool,
    /// The sender has seen the read receipt. Only ever true when `is_read` is.
    pub is_checked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Offset-paginated result. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty(page: u32, page_size: u32, total: u64) -> Self {
        Self {
            items: Vec::new(),
            page,
            page_size,
            total,
        }
    }

    pub fn page_count(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.page_count()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}
