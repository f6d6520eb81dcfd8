mod config;
mod prune;

use std::sync::Arc;

use kinship_db::{Argon2Verifier, Database};
use tracing::info;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinship_maintenance=debug,kinship_db=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Opening runs any pending migrations
    let db = Arc::new(Database::open_with(
        &config.db_path,
        config.store.clone(),
        Box::new(Argon2Verifier::default()),
    )?);

    match config.prune_interval {
        Some(every) => {
            info!("Pruning expired reset tokens every {:?}", every);
            prune::run_prune_loop(db, every).await;
        }
        None => {
            let count = prune::prune_once(db).await?;
            info!("Pruned {} expired reset tokens", count);
        }
    }

    Ok(())
}
