mod config;
mod platform;
mod relay;
mod routing;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::relay::Relay;
use crate::routing::source_to_target_channels;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,linkrelay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yaml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let routes = source_to_target_channels(&config.channel_mappings);
    info!("Configuration loaded successfully");
    info!("  Channel mappings: {}", config.channel_mappings.len());
    info!("  Source channels: {}", routes.len());
    if routes.is_empty() {
        warn!("No channel mappings configured; nothing will be forwarded");
    }

    let (bot_user_id, bot_name) = platform::discord::current_user(&config.token).await?;
    info!("Relaying as {} ({})", bot_name, bot_user_id);

    let relay = Relay::new(routes, bot_user_id, config.embed_color);

    info!("Bot is starting...");
    platform::discord::run(&config.token, relay).await?;

    Ok(())
}
