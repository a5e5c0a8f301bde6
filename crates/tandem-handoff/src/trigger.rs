// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Decides when an unconnected message asks for a human.

use async_trait::async_trait;
use tandem_core::Activity;

/// Decides whether a message from an unconnected sender should open a
/// connection request.
#[async_trait]
pub trait HandoffTrigger: Send + Sync + 'static {
    async fn should_hand_off(&self, activity: &Activity) -> bool;
}

/// Fires when the message text contains a keyword, ignoring case.
#[derive(Debug, Clone)]
pub struct KeywordTrigger {
    keyword: String,
}

impl KeywordTrigger {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into().to_lowercase(),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn matches(&self, text: &str) -> bool {
        !self.keyword.is_empty() && text.to_lowercase().contains(&self.keyword)
    }
}

impl Default for KeywordTrigger {
    fn default() -> Self {
        Self::new("human")
    }
}

#[async_trait]
impl HandoffTrigger for KeywordTrigger {
    async fn should_hand_off(&self, activity: &Activity) -> bool {
        self.matches(activity.text())
    }
}
