//! Idle-room sweeper background task.
//!
//! Rooms are deleted the moment their last participant leaves, but a room
//! created and never joined would otherwise live forever. This task
//! periodically removes empty rooms older than a threshold.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is cancelled.

use crate::engine::Coordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Minimum age of an empty room before it is swept.
    pub max_idle: Duration,
}

#[instrument(skip_all, name = "rendezvous.task.room_sweeper")]
pub async fn start_room_sweeper(
    coordinator: Arc<Coordinator>,
    config: SweeperConfig,
    cancel_token: CancellationToken,
) {
    info!(
        interval_seconds = config.interval.as_secs(),
        max_idle_seconds = config.max_idle.as_secs(),
        "Starting room sweeper"
    );

    let mut interval = tokio::time::interval(config.interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_sweep(&coordinator, &config).await;
            }
            _ = cancel_token.cancelled() => {
                info!("Room sweeper received shutdown signal, exiting");
                break;
            }
        }
    }

    info!("Room sweeper stopped");
}

pub(crate) async fn run_sweep(coordinator: &Coordinator, config: &SweeperConfig) {
    match coordinator.sweep_idle_rooms(config.max_idle).await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Swept idle rooms"),
        Err(e) => error!(error = %e, "Idle room sweep failed"),
    }
}
