use anyhow::Result;
use affirmly::config::Config;
use affirmly::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Prints help/version or the parse error and exits
    let config = Config::from_env().unwrap_or_else(|e| e.exit());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("affirmly={},tower_http=info", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    affirmly::health::mark_started();

    tracing::info!("Starting affirmly service");
    tracing::info!(
        bind_addr = %config.bind_addr,
        model = %config.openai_model,
        max_requests = config.rate_limit_max_requests,
        window_secs = config.rate_limit_window_seconds,
        origins = ?config.origins(),
        "Configuration loaded"
    );

    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
