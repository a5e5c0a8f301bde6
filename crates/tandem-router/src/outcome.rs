// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Results of routing a turn.

use strum::Display;
use tandem_core::{Connection, ConnectionRequest};

/// Why a connection request was not created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    /// No aggregation channel is registered and the request asked to be
    /// rejected in that case.
    NoAggregationChannel,
    /// The requestor's channel is on the no-direct-conversations list.
    ChannelNotAllowed,
    /// The requestor already has an open request.
    AlreadyPending,
    /// The requestor is already connected.
    AlreadyConnected,
}

/// What the router did with a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// The sender is not connected; nothing was relayed.
    NoActionTaken,
    /// The message was delivered to the other leg of `connection`.
    MessageRouted { connection: Connection },
    /// A new request was opened.
    ConnectionRequested(ConnectionRequest),
    Rejected(RejectReason),
}

impl RoutingOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RoutingOutcome::Rejected(_))
    }
}

/// Result of registering an aggregation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationChange {
    Added,
    AlreadyRegistered,
    /// The channel is not on the permitted aggregation channel list.
    NotPermitted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_reason_displays_snake_case() {
        assert_eq!(
            RejectReason::NoAggregationChannel.to_string(),
            "no_aggregation_channel"
        );
        assert_eq!(RejectReason::AlreadyPending.to_string(), "already_pending");
    }

    #[test]
    fn only_rejections_are_rejected() {
        assert!(RoutingOutcome::Rejected(RejectReason::ChannelNotAllowed).is_rejected());
        assert!(!RoutingOutcome::NoActionTaken.is_rejected());
    }
}
