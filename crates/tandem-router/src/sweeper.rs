// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn eviction of idle connections.
//!
//! The sweep runs inside the turn that triggers it, before that turn is
//! routed. A connection is only evicted by a turn from a third party: a turn
//! from one of its own legs refreshes it through the relay instead.
//!
//! Eviction is a conditional delete (`evict_if_idle`) followed by notices to
//! both legs. If a concurrent relay refreshed the connection after the sweep
//! read it, the delete does nothing and no notice goes out. Notice failures
//! are logged and never undo the eviction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tandem_core::{Connection, ConversationReference, Payload, TandemError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::router::MessageRouter;

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections inspected.
    pub examined: usize,
    pub evicted: Vec<Connection>,
    /// Idle connections left alone because the sender is one of their legs.
    pub skipped_own: usize,
    /// Timeout notices or end-of-conversation signals that failed to deliver.
    pub failed_notices: usize,
}

pub struct TimeoutSweeper {
    router: Arc<MessageRouter>,
    timeout: TimeDelta,
}

impl TimeoutSweeper {
    pub fn new(router: Arc<MessageRouter>, timeout: Duration) -> Self {
        Self {
            router,
            timeout: TimeDelta::from_std(timeout).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn timeout(&self) -> TimeDelta {
        self.timeout
    }

    /// Text sent to each leg of an evicted connection.
    pub fn timeout_notice(&self) -> String {
        let minutes = self.timeout.num_seconds() as f64 / 60.0;
        format!("Conversation disconnected for inactivity of more than {minutes} minutes.")
    }

    /// Evict every connection idle for at least the timeout, except those
    /// `sender` belongs to.
    ///
    /// Only listing the connections can fail the sweep; a store error on a
    /// single eviction is logged and the sweep moves on.
    pub async fn sweep(
        &self,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<SweepReport, TandemError> {
        let store = self.router.store();
        let now = self.router.clock().now();
        let cutoff = now
            .checked_sub_signed(self.timeout)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let connections = store.list_connections().await?;

        let mut report = SweepReport {
            examined: connections.len(),
            ..SweepReport::default()
        };

        for connection in connections {
            if connection.idle_for(now) < self.timeout {
                continue;
            }
            if connection.involves(sender) {
                debug!(
                    connection = %connection.id,
                    sender = %sender,
                    "idle connection belongs to sender, not evicting"
                );
                report.skipped_own += 1;
                continue;
            }

            match store.evict_if_idle(&connection, cutoff).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(connection = %connection.id, "connection refreshed before eviction");
                    continue;
                }
                Err(e) => {
                    warn!(connection = %connection.id, error = %e, "failed to evict idle connection");
                    continue;
                }
            }

            info!(
                connection = %connection.id,
                reference1 = %connection.reference1,
                reference2 = %connection.reference2,
                idle_secs = connection.idle_for(now).num_seconds(),
                "evicted idle connection"
            );
            report.failed_notices += self.notify_legs(&connection, cancel).await;
            report.evicted.push(connection);
        }

        debug!(
            examined = report.examined,
            evicted = report.evicted.len(),
            "sweep complete"
        );
        Ok(report)
    }

    /// Send the timeout notice and end-of-conversation signal to both legs.
    /// Returns the number of failed deliveries.
    async fn notify_legs(&self, connection: &Connection, cancel: &CancellationToken) -> usize {
        let notice = Payload::text(self.timeout_notice());
        let mut failed = 0;
        for leg in connection.legs() {
            for payload in [&notice, &Payload::EndOfConversation] {
                if let Err(e) = self.router.send_message(leg, payload, cancel).await {
                    warn!(
                        connection = %connection.id,
                        recipient = %leg,
                        error = %e,
                        "failed to deliver eviction notice"
                    );
                    failed += 1;
                }
            }
        }
        failed
    }
}
