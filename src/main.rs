mod bot;
mod config;
mod data;
mod error;
mod leveling;
mod model;
mod music;
mod scheduler;
mod startup;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigStore};
use crate::error::AppError;
use crate::leveling::XpCache;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = startup::connect_to_database(&config).await?;
    let leveling_config = ConfigStore::load(&config.leveling_config_path)?;
    let xp_cache = Arc::new(XpCache::new());

    let client = bot::init_bot(&config, db.clone(), leveling_config, xp_cache.clone()).await?;

    // On ctrl-c, flush whatever XP is still cached before closing the gateway
    // connection. Level-ups found during this final flush are persisted but
    // not announced.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        info!("Shutting down, flushing pending XP");
        leveling::flush_cycle(&db, &xp_cache).await;
        shard_manager.shutdown_all().await;
    });

    bot::start_bot(client).await
}
