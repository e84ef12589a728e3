//! Presence broadcaster: tells a user's friends about a status change.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use parley_database::store::UserStore;
use parley_entity::user::PresenceStatus;

use crate::message::types::{OutboundEvent, StatusChange};
use crate::relay::router::{Delivery, DeliveryRouter};
use crate::timeout::with_timeout;

use super::reachability::ReachabilityDirectory;

/// Tally of one announce pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnounceReport {
    /// Distinct friends considered.
    pub friends: usize,
    /// Friends the event was handed to.
    pub notified: usize,
    /// Friends without a live connection.
    pub unreachable: usize,
    /// Friends skipped because of a directory or bus error.
    pub failed: usize,
}

/// Fans status changes out to the announcing user's friends.
#[derive(Debug)]
pub struct PresenceBroadcaster {
    /// Source of the friend graph.
    users: Arc<dyn UserStore>,
    /// Reachability records.
    reachability: ReachabilityDirectory,
    /// Delivery routing.
    router: Arc<DeliveryRouter>,
    /// Deadline for store calls.
    op_timeout: Duration,
}

impl PresenceBroadcaster {
    /// Creates a new broadcaster.
    pub fn new(
        users: Arc<dyn UserStore>,
        reachability: ReachabilityDirectory,
        router: Arc<DeliveryRouter>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            users,
            reachability,
            router,
            op_timeout,
        }
    }

    /// Announces `status` for `user_id` to every reachable friend.
    ///
    /// The friend set is read fresh on every call. Failures never
    /// propagate: a failed friend lookup aborts the pass, a failed
    /// per-friend lookup or delivery skips only that friend.
    pub async fn announce(
        &self,
        user_id: Uuid,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> AnnounceReport {
        let mut report = AnnounceReport::default();

        let friend_ids = match with_timeout(
            self.op_timeout,
            "friend lookup",
            self.users.friend_ids(user_id),
        )
        .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(user_id = %user_id, status = %status, error = %e, "Presence announce aborted");
                return report;
            }
        };

        let mut seen = HashSet::new();
        let friends: Vec<Uuid> = friend_ids
            .into_iter()
            .filter(|id| *id != user_id && seen.insert(*id))
            .collect();
        report.friends = friends.len();

        let event = OutboundEvent::UserStatusChange(StatusChange {
            user_id,
            status,
            last_seen: at,
        });

        for friend_id in friends {
            let record = match self.reachability.lookup(friend_id).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    report.unreachable += 1;
                    continue;
                }
                Err(e) => {
                    warn!(friend_id = %friend_id, error = %e, "Friend reachability lookup failed");
                    report.failed += 1;
                    continue;
                }
            };

            match self.router.route(friend_id, &record, event.clone()).await {
                Ok(Delivery::Local) | Ok(Delivery::Published) => report.notified += 1,
                Ok(Delivery::StoredOnly) => report.unreachable += 1,
                Err(e) => {
                    warn!(friend_id = %friend_id, error = %e, "Status change delivery failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            user_id = %user_id,
            status = %status,
            friends = report.friends,
            notified = report.notified,
            "Presence announced"
        );
        report
    }
}
