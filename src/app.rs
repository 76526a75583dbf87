use crate::config::Config;
use crate::error::AppError;
use crate::server::Server;
use crate::service::FeedService;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// Run the server flow.
///
/// - Builds the service and binds the listener
/// - Starts the per-kind schedules unless disabled; their first tick
///   populates the cache
/// - Serves until Ctrl-C, then stops the accept loop and the schedules
pub async fn run_server(config: &Config, schedule: bool) -> Result<(), AppError> {
    let service = Arc::new(FeedService::from_config(config).await?);
    let server = Server::bind(&config.bind_address, Arc::clone(&service)).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let schedules = if schedule {
        service.spawn_schedules(shutdown_rx.clone())
    } else {
        info!("Periodic refresh disabled, feeds refresh on demand only");
        Vec::new()
    };

    let mut server_task = tokio::spawn(server.run(shutdown_rx));

    let server_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Shutting down");
            let _ = shutdown_tx.send(true);
            (&mut server_task).await
        }
        finished = &mut server_task => {
            let _ = shutdown_tx.send(true);
            finished
        }
    };

    for handle in schedules {
        if let Err(e) = handle.await {
            warn!("Schedule task ended abnormally: {e}");
        }
    }

    server_result.map_err(|e| AppError::server_error(e.to_string()))?
}
