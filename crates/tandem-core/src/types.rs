// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the routing engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::identity::ConversationReference;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    RoutingStore,
    MessageLog,
    Delivery,
}

// --- Inbound ---

/// Kind of an inbound or outbound activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityKind {
    Message,
    EndOfConversation,
    ConversationUpdate,
    Typing,
    Event,
}

/// A participant as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// One inbound turn delivered by the hosting transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub kind: ActivityKind,
    pub channel_id: String,
    pub conversation_id: String,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Activity {
    /// Create a message activity stamped with a fresh id and the current time.
    pub fn message(
        channel_id: impl Into<String>,
        conversation_id: impl Into<String>,
        from: ChannelAccount,
        recipient: ChannelAccount,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ActivityKind::Message,
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            from,
            recipient,
            text: Some(text.into()),
            service_url: None,
            timestamp: Utc::now(),
        }
    }

    pub fn is_message(&self) -> bool {
        self.kind == ActivityKind::Message
    }

    /// Message text, empty when the activity carries none.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Reference of the sender, captured fresh for this turn.
    pub fn sender_reference(&self) -> ConversationReference {
        self.reference_for(&self.from)
    }

    /// Reference of the recipient (normally the bot itself).
    pub fn recipient_reference(&self) -> ConversationReference {
        self.reference_for(&self.recipient)
    }

    fn reference_for(&self, account: &ChannelAccount) -> ConversationReference {
        ConversationReference {
            channel_id: self.channel_id.clone(),
            user_id: account.id.clone(),
            user_name: account.name.clone(),
            conversation_id: self.conversation_id.clone(),
            service_url: self.service_url.clone(),
        }
    }
}

// --- Outbound ---

/// What gets delivered to a conversation reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "text", rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    EndOfConversation,
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }
}

// --- Routing state ---

/// A pending ask to connect a requestor with a human agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    pub requestor: ConversationReference,
    pub created_at: DateTime<Utc>,
    /// Value of the reject-if-no-aggregation-channel flag when the request was made.
    pub reject_if_no_aggregation_channel: bool,
}

/// An established pairing of two conversation references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub reference1: ConversationReference,
    pub reference2: ConversationReference,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        reference1: ConversationReference,
        reference2: ConversationReference,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reference1,
            reference2,
            started_at: now,
            last_activity: now,
        }
    }

    /// Whether `reference` is one of the legs (loose match).
    pub fn involves(&self, reference: &ConversationReference) -> bool {
        self.reference1.matches_loose(reference) || self.reference2.matches_loose(reference)
    }

    /// The leg on the other side of `reference`, if `reference` is a leg.
    pub fn counterpart(&self, reference: &ConversationReference) -> Option<&ConversationReference> {
        if self.reference1.matches_loose(reference) {
            Some(&self.reference2)
        } else if self.reference2.matches_loose(reference) {
            Some(&self.reference1)
        } else {
            None
        }
    }

    /// Time since the last relay through this connection.
    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity
    }

    pub fn legs(&self) -> [&ConversationReference; 2] {
        [&self.reference1, &self.reference2]
    }
}

/// One user's logged activities, ordered by arrival.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageLogEntry {
    pub user: ConversationReference,
    pub messages: Vec<Activity>,
}

impl MessageLogEntry {
    pub fn new(user: ConversationReference) -> Self {
        Self {
            user,
            messages: Vec::new(),
        }
    }
}
