//! Poll Hub - Entry Point
//!
//! Loads configuration, initializes logging and runs the server.

use tracing_subscriber::EnvFilter;

use poll_hub::{server, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=poll_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("poll_hub=info")),
        )
        .init();

    let config = Config::from_env();
    server::run(config).await?;

    Ok(())
}
