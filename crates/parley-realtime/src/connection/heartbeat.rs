//! Heartbeat watchdog for silent connections.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use super::handle::ConnectionHandle;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between checks
    pub check_interval: Duration,
    /// Silence after which the connection is closed
    pub timeout: Duration,
}

/// Run the watchdog for a connection.
///
/// Closes the connection when no inbound frame has arrived within the
/// timeout. Ends as soon as the connection closes for any other reason.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let cancel = handle.cancellation();
    let mut interval = time::interval(config.check_interval);
    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let idle = handle.idle_for().await;
                if idle > config.timeout {
                    tracing::warn!(
                        conn_id = %handle.id,
                        user_id = %handle.user_id(),
                        idle_secs = idle.as_secs(),
                        "Heartbeat timeout, closing connection"
                    );
                    handle.close();
                    break;
                }
            }
        }
    }

    tracing::debug!(conn_id = %handle.id, "Heartbeat watchdog ended");
}
