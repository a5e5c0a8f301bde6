// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User-facing notices for routing outcomes.
//!
//! Every notice is best effort: a failed delivery is logged and the turn
//! carries on.

use std::sync::Arc;

use tandem_core::{Connection, ConnectionRequest, ConversationReference, Payload};
use tandem_router::{MessageRouter, RejectReason, RoutingOutcome};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Sends notices about requests and connections.
pub struct Notifier {
    router: Arc<MessageRouter>,
    command_prefix: String,
}

impl Notifier {
    pub fn new(router: Arc<MessageRouter>, command_prefix: impl Into<String>) -> Self {
        Self {
            router,
            command_prefix: command_prefix.into(),
        }
    }

    /// Send `text` to `recipient`. Returns whether it was delivered.
    pub async fn notify(
        &self,
        recipient: &ConversationReference,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> bool {
        match self
            .router
            .send_message(recipient, &Payload::text(text), cancel)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(recipient = %recipient, error = %e, "failed to deliver notice");
                false
            }
        }
    }

    /// Tell the requestor (and, for a new request, every aggregation
    /// channel) what came of a connection request.
    pub async fn request_outcome(
        &self,
        requestor: &ConversationReference,
        outcome: &RoutingOutcome,
        cancel: &CancellationToken,
    ) {
        match outcome {
            RoutingOutcome::ConnectionRequested(request) => {
                self.notify(
                    requestor,
                    "Please wait while we connect you with a human agent.",
                    cancel,
                )
                .await;
                self.announce_request(request, cancel).await;
            }
            RoutingOutcome::Rejected(reason) => {
                if let Some(text) = rejection_notice(*reason) {
                    self.notify(requestor, text, cancel).await;
                }
            }
            RoutingOutcome::NoActionTaken | RoutingOutcome::MessageRouted { .. } => {}
        }
    }

    /// Post a new request to every aggregation channel.
    async fn announce_request(&self, request: &ConnectionRequest, cancel: &CancellationToken) {
        let channels = match self.router.aggregation_channels().await {
            Ok(channels) => channels,
            Err(e) => {
                warn!(error = %e, "could not list aggregation channels for request notice");
                return;
            }
        };
        let requestor = &request.requestor;
        let handle = format!("{}:{}", requestor.channel_id, requestor.user_id);
        let text = format!(
            "{name} ({handle}) is waiting for a human agent. \
             Type \"{p}accept {handle}\" to accept or \"{p}reject {handle}\" to reject.",
            name = requestor.display_name(),
            p = self.command_prefix,
        );
        for channel in &channels {
            self.notify(channel, text.as_str(), cancel).await;
        }
    }

    /// Tell both legs of a new connection who they are talking to.
    pub async fn connected(&self, connection: &Connection, cancel: &CancellationToken) {
        let user = &connection.reference1;
        let agent = &connection.reference2;
        self.notify(
            user,
            format!("You are now connected with {}.", agent.display_name()),
            cancel,
        )
        .await;
        self.notify(
            agent,
            format!(
                "You are now connected with {}. Type \"{}disconnect\" to end the conversation.",
                user.display_name(),
                self.command_prefix
            ),
            cancel,
        )
        .await;
    }

    /// Tell both former legs that the conversation is over.
    pub async fn disconnected(&self, connection: &Connection, cancel: &CancellationToken) {
        for leg in connection.legs() {
            let other = connection
                .counterpart(leg)
                .map(|r| r.display_name().to_owned())
                .unwrap_or_default();
            self.notify(
                leg,
                format!("Your conversation with {other} has ended."),
                cancel,
            )
            .await;
        }
    }

    /// Tell a requestor an agent turned their request down.
    pub async fn request_rejected(&self, request: &ConnectionRequest, cancel: &CancellationToken) {
        self.notify(
            &request.requestor,
            "Sorry, no human agent could take your request right now.",
            cancel,
        )
        .await;
    }
}

fn rejection_notice(reason: RejectReason) -> Option<&'static str> {
    match reason {
        RejectReason::NoAggregationChannel => {
            Some("Sorry, no human agents are available right now.")
        }
        RejectReason::ChannelNotAllowed => {
            Some("Sorry, talking to a human agent is not available on this channel.")
        }
        RejectReason::AlreadyPending => {
            Some("Your request is still pending. A human agent will be with you shortly.")
        }
        RejectReason::AlreadyConnected => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_connected_has_no_notice() {
        assert!(rejection_notice(RejectReason::AlreadyConnected).is_none());
        assert!(rejection_notice(RejectReason::NoAggregationChannel).is_some());
        assert!(rejection_notice(RejectReason::ChannelNotAllowed).is_some());
        assert!(rejection_notice(RejectReason::AlreadyPending).is_some());
    }
}
