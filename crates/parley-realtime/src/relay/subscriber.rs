//! Bus subscriber: one task per process delivering envelopes addressed
//! to this instance.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use parley_core::traits::{BusStream, MessageBus};

use super::router::DeliveryRouter;

const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Doubling delay between resubscription attempts.
#[derive(Debug)]
struct RetryBackoff {
    next: Duration,
}

impl RetryBackoff {
    fn new() -> Self {
        Self {
            next: INITIAL_RETRY_DELAY,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_RETRY_DELAY);
        delay
    }

    fn reset(&mut self) {
        self.next = INITIAL_RETRY_DELAY;
    }
}

/// Consumes this instance's inbox until shutdown.
///
/// When the stream ends the inbox is subscribed again after a growing
/// delay. Only the shutdown signal stops the task.
pub async fn run_subscriber(
    stream: BusStream,
    bus: Arc<dyn MessageBus>,
    router: Arc<DeliveryRouter>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let topic = router.inbox_topic();
    info!(topic = %topic, "Bus subscriber started");

    let mut backoff = RetryBackoff::new();
    let mut current = Some(stream);

    loop {
        let Some(stream) = current.as_mut() else {
            let delay = backoff.next_delay();
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                _ = shutdown.recv() => break,
                result = bus.subscribe(&topic) => match result {
                    Ok(stream) => {
                        info!(topic = %topic, "Bus subscription restored");
                        current = Some(stream);
                    }
                    Err(e) => {
                        warn!(topic = %topic, error = %e, "Bus resubscribe failed");
                    }
                },
            }
            continue;
        };

        tokio::select! {
            _ = shutdown.recv() => break,
            next = stream.next() => match next {
                Some(payload) => {
                    backoff.reset();
                    router.accept(&payload);
                }
                None => {
                    warn!(topic = %topic, "Bus stream ended, resubscribing");
                    current = None;
                }
            },
        }
    }

    info!(topic = %topic, "Bus subscriber stopping");
}
