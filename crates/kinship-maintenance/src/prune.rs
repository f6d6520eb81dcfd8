use std::sync::Arc;
use std::time::Duration;

use kinship_db::Database;
use tracing::{info, warn};

/// Prune expired reset tokens on an interval, forever.
pub async fn run_prune_loop(db: Arc<Database>, every: Duration) {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        match prune_once(db.clone()).await {
            Ok(count) => {
                if count > 0 {
                    info!("Pruned {} expired reset tokens", count);
                }
            }
            Err(e) => {
                warn!("Prune error: {}", e);
            }
        }
    }
}

/// One prune pass, run off the async runtime.
pub async fn prune_once(db: Arc<Database>) -> anyhow::Result<usize> {
    let count = tokio::task::spawn_blocking(move || db.prune_expired_reset_tokens()).await??;
    Ok(count)
}
