use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use kinship_db::{
    ConnectionPolicy, MessagingPolicy, QueryDefaults, SearchPolicy, StoreConfig, TokenPolicy,
};

/// Everything the maintenance binary reads from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub store: StoreConfig,
    /// `None` means prune once and exit.
    pub prune_interval: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path: PathBuf = lookup("KINSHIP_DB_PATH")
            .unwrap_or_else(|| "kinship.db".into())
            .into();

        let ttl_hours: i64 = parse_or(&lookup, "KINSHIP_RESET_TOKEN_TTL_HOURS", 24)?;
        let interval_secs: u64 = parse_or(&lookup, "KINSHIP_PRUNE_INTERVAL_SECS", 3600)?;

        if ttl_hours <= 0 {
            anyhow::bail!("KINSHIP_RESET_TOKEN_TTL_HOURS must be positive, got {ttl_hours}");
        }
        let ttl = chrono::Duration::try_hours(ttl_hours).with_context(|| {
            format!("KINSHIP_RESET_TOKEN_TTL_HOURS is out of range: {ttl_hours}")
        })?;

        let store = StoreConfig {
            connection: ConnectionPolicy {
                unique_pair: flag(&lookup, "KINSHIP_UNIQUE_CONNECTIONS")?,
            },
            messaging: MessagingPolicy {
                require_friendship: flag(&lookup, "KINSHIP_REQUIRE_FRIENDSHIP")?,
            },
            search: SearchPolicy {
                case_sensitive: flag(&lookup, "KINSHIP_CASE_SENSITIVE_SEARCH")?,
            },
            tokens: TokenPolicy { ttl },
            defaults: QueryDefaults::default(),
        };

        Ok(Self {
            db_path,
            store,
            prune_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is not a valid number: {raw:?}")),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("{key} must be a boolean, got {other:?}"),
    }
}
