use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::shutdown::broadcast_shutdown;
use crate::core::state::AppState;
use crate::tasks::maintenance;

pub(crate) async fn run(state: AppState) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep = tokio::spawn(expire_attempts_loop(state, shutdown_rx));
    broadcast_shutdown(shutdown_tx).await;

    if let Err(err) = sweep.await {
        tracing::error!(error = %err, "Background task join failed");
    }

    Ok(())
}

async fn expire_attempts_loop(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let period = Duration::from_secs(state.settings().exam().attempt_sweep_interval_seconds);
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(interval_seconds = period.as_secs(), "Attempt sweep started");
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                if let Err(err) = maintenance::expire_overdue_attempts(&state).await {
                    tracing::error!(error = %err, "expire_overdue_attempts failed");
                }
            }
        }
    }
    tracing::info!("Attempt sweep stopped");
}
