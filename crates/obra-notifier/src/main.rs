//! Obra notifier - scheduled reminder delivery.
//!
//! Runs one tick per interval: scans today's events in the configured
//! timezone, multicasts reminders at the fixed lead times, and prunes
//! registrations whose endpoints are permanently gone. Each invocation is
//! stateless, so overlapping or restarted runs are safe: re-sends are cut
//! off by the `dismissed` flag and registration writes are idempotent.

mod config;
mod push;
mod run;

use config::NotifierConfig;
use obra_core::db::{Database, SyncConfig};
use push::HttpPushGateway;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("obra_notifier=info".parse().expect("valid directive")),
        )
        .init();

    let config = NotifierConfig::from_env()?;
    tracing::info!("Starting obra-notifier with config: {:?}", config);

    let db = match (&config.turso_url, &config.turso_auth_token) {
        (Some(url), Some(token)) => {
            let sync = SyncConfig::new(url.clone(), token.clone()).without_auto_sync();
            Database::open_with_sync(&config.db_path, sync).await?
        }
        _ => Database::open(&config.db_path).await?,
    };

    let gateway = HttpPushGateway::new(&config.push_endpoint, &config.push_api_key)?;

    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        match run::tick(&db, &gateway, &config).await {
            Ok(outcome) if outcome.notified > 0 || outcome.pruned > 0 => {
                tracing::info!(
                    notified = outcome.notified,
                    pruned = outcome.pruned,
                    "tick completed"
                );
            }
            Ok(_) => {}
            Err(error) => tracing::error!(%error, "tick failed"),
        }
    }
}
