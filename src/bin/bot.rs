use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use concierge::core::Config;
use concierge::database::open_store;
use concierge::features::messaging::HttpPushChannel;
use concierge::features::reminders::{DeliveryClient, QuotaTracker, ReminderScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting Concierge reminder service...");
    info!("Reminder store: {:?}", config.store);

    let store = open_store(&config.store).await?;

    match QuotaTracker::new(store.clone()).is_saturated().await {
        Ok(true) => warn!("⚠️ Monthly push quota already reached, reminders may fail until it resets"),
        Ok(false) => info!("📬 Push quota available"),
        Err(e) => error!("Could not check push quota: {e}"),
    }

    let channel = HttpPushChannel::new(
        config.push.endpoint.clone(),
        config.push.channel_token.clone(),
        config.push.timeout,
    )?;
    let delivery = DeliveryClient::new(Arc::new(channel));

    // Start the reminder scheduler
    let shutdown = CancellationToken::new();
    let scheduler = ReminderScheduler::new(store, delivery, config.scheduler.clone());
    let handle = scheduler.spawn(shutdown.clone());

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!("Shutting down...");
    shutdown.cancel();
    if let Err(e) = handle.await {
        error!("Reminder scheduler task failed: {e}");
    }

    Ok(())
}
