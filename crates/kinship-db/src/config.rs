//! Policy knobs for the store. Every default reproduces the permissive
//! behaviour of the original social app.

use chrono::Duration;

#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub connection: ConnectionPolicy,
    pub messaging: MessagingPolicy,
    pub search: SearchPolicy,
    pub tokens: TokenPolicy,
    pub defaults: QueryDefaults,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionPolicy {
    /// Reject a second connection row for the same unordered pair.
    /// Off by default: duplicate prevention is left to the caller.
    pub unique_pair: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MessagingPolicy {
    /// Only allow sending to accepted friends.
    pub require_friendship: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPolicy {
    /// Case-sensitive username matching. The default uses SQLite `LIKE`,
    /// which folds ASCII case only.
    pub case_sensitive: bool,
}

#[derive(Debug, Clone)]
pub struct TokenPolicy {
    /// Lifetime of a password-reset token.
    pub ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryDefaults {
    pub search_page_size: u32,
    pub thread_page_size: u32,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            search_page_size: 50,
            thread_page_size: 100,
        }
    }
}
