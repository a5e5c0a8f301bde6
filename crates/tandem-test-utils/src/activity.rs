// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for inbound activities.

use chrono::{DateTime, Utc};
use tandem_core::{Activity, ActivityKind, ChannelAccount, ConversationReference};

/// Builds an inbound [`Activity`] from a sender.
///
/// ```ignore
/// let activity = ActivityBuilder::sender("webchat", "u1", "c1")
///     .named("Alice")
///     .text("I need a human")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ActivityBuilder {
    channel_id: String,
    conversation_id: String,
    from: ChannelAccount,
    recipient: ChannelAccount,
    kind: ActivityKind,
    text: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl ActivityBuilder {
    pub fn sender(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            conversation_id: conversation_id.into(),
            from: ChannelAccount::new(user_id),
            recipient: ChannelAccount::named("bot", "Tandem"),
            kind: ActivityKind::Message,
            text: None,
            timestamp: None,
        }
    }

    /// Start from the identity of an existing reference.
    pub fn from_reference(reference: &ConversationReference) -> Self {
        let mut builder = Self::sender(
            reference.channel_id.clone(),
            reference.user_id.clone(),
            reference.conversation_id.clone(),
        );
        builder.from.name = reference.user_name.clone();
        builder
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.from.name = Some(name.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn kind(mut self, kind: ActivityKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> Activity {
        let mut activity = Activity::message(
            self.channel_id,
            self.conversation_id,
            self.from,
            self.recipient,
            self.text.unwrap_or_default(),
        );
        activity.kind = self.kind;
        if let Some(timestamp) = self.timestamp {
            activity.timestamp = timestamp;
        }
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_message_from_sender() {
        let activity = ActivityBuilder::sender("webchat", "u1", "c1")
            .named("Alice")
            .text("hi")
            .build();
        assert!(activity.is_message());
        assert_eq!(activity.text(), "hi");
        let sender = activity.sender_reference();
        assert_eq!(sender.display_name(), "Alice");
        assert_eq!(sender.conversation_id, "c1");
    }

    #[test]
    fn keeps_reference_identity() {
        let reference = ConversationReference::new("msteams", "a1", "agents").with_user_name("Ann");
        let activity = ActivityBuilder::from_reference(&reference)
            .kind(ActivityKind::Typing)
            .build();
        assert!(!activity.is_message());
        assert!(activity.sender_reference().matches_strict(&reference));
    }
}
