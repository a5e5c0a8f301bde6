// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound delivery adapter for the hosting transport.

use async_trait::async_trait;

use crate::error::TandemError;
use crate::identity::ConversationReference;
use crate::traits::adapter::PluginAdapter;
use crate::types::Payload;

/// Delivers payloads to a conversation reference.
///
/// Implementations report failures as [`TandemError::DeliveryFailed`] and
/// never retry on their own; retry policy belongs to the transport.
#[async_trait]
pub trait DeliveryChannel: PluginAdapter {
    /// Sends `payload` to `recipient`, resolving once the transport acknowledges it.
    async fn deliver(
        &self,
        recipient: &ConversationReference,
        payload: &Payload,
    ) -> Result<(), TandemError>;
}
