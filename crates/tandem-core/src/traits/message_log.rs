// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user audit log of relayed activities.

use async_trait::async_trait;

use crate::error::TandemError;
use crate::identity::ConversationReference;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Activity, MessageLogEntry};

/// Append-only record of relayed activities, keyed by user (loose match).
///
/// Independent of live routing state: evicting or disconnecting a
/// connection never touches the log.
#[async_trait]
pub trait MessageLogStore: PluginAdapter {
    /// Finds or creates the entry for `user` and appends `activity`.
    async fn append(
        &self,
        user: &ConversationReference,
        activity: &Activity,
    ) -> Result<(), TandemError>;

    /// Returns the entry whose user loosely matches `user`.
    async fn get(&self, user: &ConversationReference)
    -> Result<Option<MessageLogEntry>, TandemError>;

    /// Returns every entry.
    async fn list(&self) -> Result<Vec<MessageLogEntry>, TandemError>;

    /// Removes the entries of `user`. Succeeds when there is nothing to remove.
    async fn delete(&self, user: &ConversationReference) -> Result<(), TandemError>;
}
