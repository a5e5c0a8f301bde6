// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message routing between connected conversations.
//!
//! The router owns the request and connection lifecycle: it relays messages
//! across an established connection, opens policy-gated requests, accepts
//! and rejects them, and tears connections down. The store underneath only
//! stores; every decision is made here.
//!
//! All reference lookups are loose (channel + user id). Relays go to the
//! stored reference of the other leg, which carries the conversation
//! instance that leg last registered from.

use std::sync::Arc;

use tandem_core::{
    Activity, Clock, Connection, ConnectionRequest, ConversationReference, DeliveryChannel,
    Payload, RoutingStore, TandemError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::outcome::{AggregationChange, RejectReason, RoutingOutcome};
use crate::policy::{ConnectionRequestPolicy, PolicyDecision};

/// Routes turns between users and human agents.
pub struct MessageRouter {
    store: Arc<dyn RoutingStore>,
    delivery: Arc<dyn DeliveryChannel>,
    clock: Arc<dyn Clock>,
    policy: ConnectionRequestPolicy,
}

impl MessageRouter {
    pub fn new(
        store: Arc<dyn RoutingStore>,
        delivery: Arc<dyn DeliveryChannel>,
        clock: Arc<dyn Clock>,
        policy: ConnectionRequestPolicy,
    ) -> Self {
        Self {
            store,
            delivery,
            clock,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn RoutingStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn policy(&self) -> &ConnectionRequestPolicy {
        &self.policy
    }

    /// Record the sender and recipient of `activity` as known references.
    ///
    /// Failures are logged; the turn goes on.
    pub async fn register_turn(&self, activity: &Activity) {
        for reference in [activity.sender_reference(), activity.recipient_reference()] {
            if let Err(e) = self.store.upsert_reference(&reference).await {
                warn!(reference = %reference, error = %e, "failed to register reference");
            }
        }
    }

    /// Relay `activity` to the other leg if its sender is connected.
    ///
    /// On a successful relay the connection's last activity moves to now.
    /// A failed delivery is returned as [`TandemError::DeliveryFailed`] and
    /// leaves the connection untouched.
    pub async fn route_if_connected(
        &self,
        activity: &Activity,
        cancel: &CancellationToken,
    ) -> Result<RoutingOutcome, TandemError> {
        let sender = activity.sender_reference();
        let Some(connection) = self.store.find_connection(&sender).await? else {
            return Ok(RoutingOutcome::NoActionTaken);
        };
        let Some(recipient) = connection.counterpart(&sender).cloned() else {
            return Ok(RoutingOutcome::NoActionTaken);
        };

        self.send_message(&recipient, &Payload::text(activity.text()), cancel)
            .await?;

        let connection = self
            .store
            .touch_connection(&connection, self.clock.now())
            .await?
            .unwrap_or(connection);
        debug!(
            from = %sender,
            to = %recipient,
            connection = %connection.id,
            "message relayed"
        );
        Ok(RoutingOutcome::MessageRouted { connection })
    }

    /// Open a connection request for `requestor` if policy allows.
    ///
    /// Policy rejections and duplicate requests come back as
    /// [`RoutingOutcome::Rejected`]; only store failures are errors.
    pub async fn create_connection_request(
        &self,
        requestor: &ConversationReference,
        reject_if_no_aggregation_channel: bool,
    ) -> Result<RoutingOutcome, TandemError> {
        let aggregation_channels = self.store.list_aggregation_channels().await?;
        if let PolicyDecision::Reject(reason) = self.policy.evaluate(
            requestor,
            &aggregation_channels,
            reject_if_no_aggregation_channel,
        ) {
            info!(requestor = %requestor, %reason, "connection request rejected by policy");
            return Ok(RoutingOutcome::Rejected(reason));
        }

        match self
            .store
            .create_request(requestor, reject_if_no_aggregation_channel, self.clock.now())
            .await
        {
            Ok(request) => {
                info!(requestor = %requestor, "connection request created");
                Ok(RoutingOutcome::ConnectionRequested(request))
            }
            Err(TandemError::AlreadyRequested { .. }) => {
                debug!(requestor = %requestor, "connection request already pending");
                Ok(RoutingOutcome::Rejected(RejectReason::AlreadyPending))
            }
            Err(TandemError::AlreadyConnected { .. }) => {
                debug!(requestor = %requestor, "requestor already connected");
                Ok(RoutingOutcome::Rejected(RejectReason::AlreadyConnected))
            }
            Err(e) => Err(e),
        }
    }

    /// Turn the open request of `requestor` into a connection with `acceptor`.
    pub async fn accept_request(
        &self,
        requestor: &ConversationReference,
        acceptor: &ConversationReference,
    ) -> Result<Connection, TandemError> {
        let connection = self
            .store
            .accept_request(requestor, acceptor, self.clock.now())
            .await?;
        info!(
            requestor = %connection.reference1,
            acceptor = %connection.reference2,
            connection = %connection.id,
            "connection established"
        );
        Ok(connection)
    }

    /// Drop the open request of `requestor`, returning it if there was one.
    pub async fn reject_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<Option<ConnectionRequest>, TandemError> {
        let Some(request) = self.store.find_request(requestor).await? else {
            return Ok(None);
        };
        if !self.store.remove_request(requestor).await? {
            return Ok(None);
        }
        info!(requestor = %request.requestor, "connection request rejected");
        Ok(Some(request))
    }

    /// Pending requests, oldest first.
    pub async fn pending_requests(&self) -> Result<Vec<ConnectionRequest>, TandemError> {
        let mut requests = self.store.list_requests().await?;
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    /// Remove the connection `reference` is part of. Returns whether one existed.
    ///
    /// Neither party is notified.
    pub async fn disconnect(&self, reference: &ConversationReference) -> Result<bool, TandemError> {
        Ok(self.take_connection(reference).await?.is_some())
    }

    /// Like [`disconnect`](Self::disconnect), returning the removed connection.
    pub async fn take_connection(
        &self,
        reference: &ConversationReference,
    ) -> Result<Option<Connection>, TandemError> {
        let Some(connection) = self.store.find_connection(reference).await? else {
            return Ok(None);
        };
        if !self.store.remove_connection(&connection).await? {
            return Ok(None);
        }
        info!(by = %reference, connection = %connection.id, "connection closed");
        Ok(Some(connection))
    }

    /// Deliver `payload` to `recipient` once.
    ///
    /// Not retried. Cancellation reports the delivery as failed.
    pub async fn send_message(
        &self,
        recipient: &ConversationReference,
        payload: &Payload,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(TandemError::DeliveryFailed {
                recipient: recipient.to_string(),
                message: "delivery cancelled".into(),
                source: None,
            }),
            result = self.delivery.deliver(recipient, payload) => result.map_err(|e| match e {
                failed @ TandemError::DeliveryFailed { .. } => failed,
                other => TandemError::DeliveryFailed {
                    recipient: recipient.to_string(),
                    message: other.to_string(),
                    source: Some(Box::new(other)),
                },
            }),
        }
    }

    // --- Aggregation channels ---

    /// Register the conversation of `reference` as an aggregation channel.
    pub async fn add_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<AggregationChange, TandemError> {
        if !self.policy.permits_aggregation(&reference.channel_id) {
            return Ok(AggregationChange::NotPermitted);
        }
        if self.store.add_aggregation_channel(reference).await? {
            info!(channel = %reference, "aggregation channel registered");
            Ok(AggregationChange::Added)
        } else {
            Ok(AggregationChange::AlreadyRegistered)
        }
    }

    /// Unregister every registration made from the conversation of `reference`.
    pub async fn remove_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        let mut removed = false;
        for channel in self.store.list_aggregation_channels().await? {
            if channel.shares_conversation(reference) {
                removed |= self.store.remove_aggregation_channel(&channel).await?;
            }
        }
        if removed {
            info!(channel = %reference, "aggregation channel unregistered");
        }
        Ok(removed)
    }

    /// Whether `reference` writes from a registered aggregation channel.
    pub async fn is_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        Ok(self
            .store
            .list_aggregation_channels()
            .await?
            .iter()
            .any(|c| c.shares_conversation(reference)))
    }

    pub async fn aggregation_channels(&self) -> Result<Vec<ConversationReference>, TandemError> {
        self.store.list_aggregation_channels().await
    }
}
