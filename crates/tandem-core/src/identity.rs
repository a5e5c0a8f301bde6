// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation references and the two identity granularities.
//!
//! A [`ConversationReference`] identifies one endpoint of a conversation.
//! Lookups compare references in one of two ways:
//!
//! - **strict**: channel, user id, and conversation id all match. Used when a
//!   specific conversation instance matters, e.g. de-duplicating stored
//!   references or an aggregation channel registration.
//! - **loose**: channel and user id match, conversation id ignored. Used for
//!   every routing lookup (requests, connections, message logs) so that a
//!   user is found regardless of which thread they write from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator used when flattening a reference into a storage key.
const KEY_SEPARATOR: char = '|';

/// Escape character for separators occurring inside a key field.
const KEY_ESCAPE: char = '\\';

/// Append `field` to `key`, escaping the separator and the escape itself so
/// distinct field tuples never flatten to the same key.
fn push_key_field(key: &mut String, field: &str) {
    for c in field.chars() {
        if c == KEY_SEPARATOR || c == KEY_ESCAPE {
            key.push(KEY_ESCAPE);
        }
        key.push(c);
    }
}

fn join_key_fields(fields: &[&str]) -> String {
    let mut key = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        push_key_field(&mut key, field);
    }
    key
}

/// Identity of one conversational endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationReference {
    /// Transport channel identifier (e.g. `webchat`, `msteams`).
    pub channel_id: String,
    /// User id, unique within the channel.
    pub user_id: String,
    /// Display name reported by the transport, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Conversation instance the user is writing from.
    pub conversation_id: String,
    /// Service endpoint the transport uses to reach this conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

impl ConversationReference {
    pub fn new(
        channel_id: impl Into<String>,
        user_id: impl Into<String>,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            user_name: None,
            conversation_id: conversation_id.into(),
            service_url: None,
        }
    }

    pub fn with_user_name(mut self, name: impl Into<String>) -> Self {
        self.user_name = Some(name.into());
        self
    }

    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = Some(url.into());
        self
    }

    /// Channel, user id, and conversation id all equal.
    pub fn matches_strict(&self, other: &ConversationReference) -> bool {
        self.matches_loose(other) && self.conversation_id == other.conversation_id
    }

    /// Channel and user id equal, regardless of conversation instance.
    pub fn matches_loose(&self, other: &ConversationReference) -> bool {
        self.channel_id == other.channel_id && self.user_id == other.user_id
    }

    /// Both references point at the same conversation instance, whoever the user is.
    ///
    /// Aggregation channels are conversations shared by many agents, so
    /// membership is decided on channel + conversation id.
    pub fn shares_conversation(&self, other: &ConversationReference) -> bool {
        self.channel_id == other.channel_id && self.conversation_id == other.conversation_id
    }

    /// Storage key for strict identity.
    pub fn strict_key(&self) -> String {
        join_key_fields(&[&self.channel_id, &self.user_id, &self.conversation_id])
    }

    /// Storage key for loose identity.
    pub fn loose_key(&self) -> String {
        join_key_fields(&[&self.channel_id, &self.user_id])
    }

    /// Name to show other participants: display name, falling back to the user id.
    pub fn display_name(&self) -> &str {
        self.user_name.as_deref().unwrap_or(&self.user_id)
    }
}

impl fmt::Display for ConversationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}",
            self.channel_id, self.user_id, self.conversation_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reference(channel: &str, user: &str, conversation: &str) -> ConversationReference {
        ConversationReference::new(channel, user, conversation)
    }

    #[test]
    fn loose_match_ignores_conversation() {
        let a = reference("webchat", "u1", "c1");
        let b = reference("webchat", "u1", "c2");
        assert!(a.matches_loose(&b));
        assert!(!a.matches_strict(&b));
    }

    #[test]
    fn different_channel_never_matches() {
        let a = reference("webchat", "u1", "c1");
        let b = reference("msteams", "u1", "c1");
        assert!(!a.matches_loose(&b));
        assert!(!a.matches_strict(&b));
    }

    #[test]
    fn display_name_and_url_do_not_affect_identity() {
        let a = reference("webchat", "u1", "c1").with_user_name("Alice");
        let b = reference("webchat", "u1", "c1").with_service_url("https://example.test");
        assert!(a.matches_strict(&b));
        assert_eq!(a.strict_key(), b.strict_key());
    }

    #[test]
    fn shares_conversation_ignores_user() {
        let agent_a = reference("msteams", "agent-a", "support-room");
        let agent_b = reference("msteams", "agent-b", "support-room");
        assert!(agent_a.shares_conversation(&agent_b));
        assert!(!agent_a.matches_loose(&agent_b));
    }

    #[test]
    fn display_name_falls_back_to_user_id() {
        assert_eq!(reference("webchat", "u1", "c1").display_name(), "u1");
        assert_eq!(
            reference("webchat", "u1", "c1")
                .with_user_name("Alice")
                .display_name(),
            "Alice"
        );
    }

    #[test]
    fn separator_inside_a_field_does_not_collide() {
        let a = reference("a|b", "c", "x");
        let b = reference("a", "b|c", "y");
        assert!(!a.matches_loose(&b));
        assert_ne!(a.loose_key(), b.loose_key());
        assert_ne!(
            reference("a|b", "c", "d").strict_key(),
            reference("a", "b", "c|d").strict_key()
        );
        assert_ne!(
            reference("a\\", "b", "c").loose_key(),
            reference("a", "\\b", "c").loose_key()
        );
    }

    fn arb_reference() -> impl Strategy<Value = ConversationReference> {
        ("[ab|\\\\]{1,3}", "[ab|\\\\]{1,3}", "[ab|\\\\]{1,3}")
            .prop_map(|(ch, user, conv)| ConversationReference::new(ch, user, conv))
    }

    proptest! {
        #[test]
        fn strict_implies_loose(a in arb_reference(), b in arb_reference()) {
            if a.matches_strict(&b) {
                prop_assert!(a.matches_loose(&b));
            }
        }

        #[test]
        fn matching_is_symmetric(a in arb_reference(), b in arb_reference()) {
            prop_assert_eq!(a.matches_loose(&b), b.matches_loose(&a));
            prop_assert_eq!(a.matches_strict(&b), b.matches_strict(&a));
        }

        #[test]
        fn keys_agree_with_matching(a in arb_reference(), b in arb_reference()) {
            prop_assert_eq!(a.loose_key() == b.loose_key(), a.matches_loose(&b));
            prop_assert_eq!(a.strict_key() == b.strict_key(), a.matches_strict(&b));
        }
    }
}
