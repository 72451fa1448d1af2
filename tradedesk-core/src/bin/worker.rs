use std::sync::Arc;

use dotenv::dotenv;
use tokio::signal;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tradedesk_core::config::Config;
use tradedesk_core::db;
use tradedesk_core::notify::{spawn_notifier, EventPublisher, LogSink};
use tradedesk_core::store::PgStore;
use tradedesk_core::worker::OverdueSweeper;

/// Background worker that flags overdue invoices and sends payment
/// reminders.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(LevelFilter::INFO.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!("Starting Tradedesk Overdue Worker...");

    let config = Config::from_env()?;
    let pool = db::create_pool(&config).await?;

    let (events, receiver) = EventPublisher::channel();
    let notifier = spawn_notifier(receiver, LogSink);

    let sweeper = OverdueSweeper::new(
        Arc::new(PgStore::new(pool)),
        events,
        Some(config.worker_poll_interval_seconds),
    );

    let runner = sweeper.clone();
    let mut sweeper_handle = tokio::spawn(async move { runner.start().await });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
            sweeper.stop().await;
            // Lets the sweep in progress finish its batch.
            if let Err(e) = (&mut sweeper_handle).await {
                error!("Sweeper task failed: {}", e);
            }
        }
        _ = &mut sweeper_handle => {
            info!("Sweeper task completed");
        }
    }

    // The notifier drains queued reminders once the last publisher is gone.
    drop(sweeper);
    if let Err(e) = notifier.await {
        error!("Notifier task failed: {}", e);
    }

    info!("Tradedesk Overdue Worker stopped");
    Ok(())
}
