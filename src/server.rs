//! Server runtime
//!
//! Accept loop plus the periodic expiry sweeper. Both share one `Arc<Hub>`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::hub::Hub;

/// Bind, start the sweeper and serve connections forever
pub async fn run(config: Config) -> Result<(), AppError> {
    let listener = TcpListener::bind(&config.addr).await?;
    info!("Poll hub listening on {}", config.addr);

    let hub = Arc::new(Hub::with_session_ttl(config.session_ttl));
    spawn_sweeper(Arc::clone(&hub), config.sweep_interval);
    info!(
        "Sweeper started (ttl {:?}, every {:?})",
        config.session_ttl, config.sweep_interval
    );

    serve(listener, hub).await
}

/// Accept connections on `listener`, one task per connection
pub async fn serve(listener: TcpListener, hub: Arc<Hub>) -> Result<(), AppError> {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("New connection from {}", addr);
                let hub = Arc::clone(&hub);

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, hub).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Periodically expire idle sessions
pub fn spawn_sweeper(hub: Arc<Hub>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = hub.sweep(Instant::now());
            if removed > 0 {
                info!("Expired {} idle sessions", removed);
            }
        }
    })
}
