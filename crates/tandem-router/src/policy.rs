// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection request policy.
//!
//! Pure decisions over configuration snapshotted at startup: no store access,
//! no locking, same inputs give the same answer.

use tandem_config::{ChannelList, HandoffConfig};
use tandem_core::ConversationReference;

use crate::outcome::RejectReason;

/// Result of evaluating a connection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Approve,
    Reject(RejectReason),
}

/// Channel lists that gate hand-off.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRequestPolicy {
    permitted_aggregation_channels: ChannelList,
    no_direct_conversations_with: ChannelList,
}

impl ConnectionRequestPolicy {
    pub fn new(
        permitted_aggregation_channels: ChannelList,
        no_direct_conversations_with: ChannelList,
    ) -> Self {
        Self {
            permitted_aggregation_channels,
            no_direct_conversations_with,
        }
    }

    pub fn from_config(config: &HandoffConfig) -> Self {
        Self::new(
            config.permitted_aggregation_channels.clone(),
            config.no_direct_conversations_with_channels.clone(),
        )
    }

    /// Decide whether `requestor` may open a request.
    ///
    /// Checked in order: missing aggregation channel (only when
    /// `reject_if_no_aggregation_channel` is set), then the requestor's
    /// channel against the deny list.
    pub fn evaluate(
        &self,
        requestor: &ConversationReference,
        aggregation_channels: &[ConversationReference],
        reject_if_no_aggregation_channel: bool,
    ) -> PolicyDecision {
        if reject_if_no_aggregation_channel && aggregation_channels.is_empty() {
            return PolicyDecision::Reject(RejectReason::NoAggregationChannel);
        }
        if self
            .no_direct_conversations_with
            .contains(&requestor.channel_id)
        {
            return PolicyDecision::Reject(RejectReason::ChannelNotAllowed);
        }
        PolicyDecision::Approve
    }

    /// Whether conversations on `channel_id` may register as aggregation
    /// channels. An empty permitted list allows every channel.
    pub fn permits_aggregation(&self, channel_id: &str) -> bool {
        self.permitted_aggregation_channels.is_empty()
            || self.permitted_aggregation_channels.contains(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requestor(channel: &str) -> ConversationReference {
        ConversationReference::new(channel, "u1", "c1")
    }

    fn agents() -> Vec<ConversationReference> {
        vec![ConversationReference::new("msteams", "a1", "agents")]
    }

    #[test]
    fn no_aggregation_channel_rejects_only_when_flag_set() {
        let policy = ConnectionRequestPolicy::default();
        assert_eq!(
            policy.evaluate(&requestor("webchat"), &[], true),
            PolicyDecision::Reject(RejectReason::NoAggregationChannel)
        );
        assert_eq!(
            policy.evaluate(&requestor("webchat"), &[], false),
            PolicyDecision::Approve
        );
    }

    #[test]
    fn deny_listed_channel_is_rejected() {
        let policy = ConnectionRequestPolicy::new(
            ChannelList::default(),
            ChannelList::parse("facebook, sms"),
        );
        assert_eq!(
            policy.evaluate(&requestor("SMS"), &agents(), true),
            PolicyDecision::Reject(RejectReason::ChannelNotAllowed)
        );
        assert_eq!(
            policy.evaluate(&requestor("webchat"), &agents(), true),
            PolicyDecision::Approve
        );
    }

    #[test]
    fn missing_aggregation_channel_is_reported_first() {
        let policy =
            ConnectionRequestPolicy::new(ChannelList::default(), ChannelList::parse("sms"));
        assert_eq!(
            policy.evaluate(&requestor("sms"), &[], true),
            PolicyDecision::Reject(RejectReason::NoAggregationChannel)
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let policy = ConnectionRequestPolicy::new(
            ChannelList::parse("msteams"),
            ChannelList::parse("sms"),
        );
        let first = policy.evaluate(&requestor("webchat"), &agents(), true);
        for _ in 0..10 {
            assert_eq!(policy.evaluate(&requestor("webchat"), &agents(), true), first);
        }
    }

    #[test]
    fn empty_permitted_list_allows_any_aggregation_channel() {
        let open = ConnectionRequestPolicy::default();
        assert!(open.permits_aggregation("slack"));

        let restricted =
            ConnectionRequestPolicy::new(ChannelList::parse("msteams"), ChannelList::default());
        assert!(restricted.permits_aggregation("MSTeams"));
        assert!(!restricted.permits_aggregation("slack"));
    }
}
