// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock delivery channel for deterministic testing.
//!
//! `MockDelivery` captures every payload instead of sending it, and can be
//! told to fail or hang for chosen recipients.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tandem_core::{
    AdapterType, ConversationReference, DeliveryChannel, HealthStatus, Payload, PluginAdapter,
    TandemError,
};

/// One captured delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: ConversationReference,
    pub payload: Payload,
}

/// A delivery channel that records instead of sending.
///
/// Recipients are matched loosely (channel + user id) for both failure
/// injection and assertions. Clones share state.
#[derive(Clone, Default)]
pub struct MockDelivery {
    sent: Arc<Mutex<Vec<Delivery>>>,
    failing: Arc<Mutex<Vec<ConversationReference>>>,
    hanging: Arc<Mutex<Vec<ConversationReference>>>,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery to `recipient` fail with `DeliveryFailed`.
    pub async fn fail_for(&self, recipient: &ConversationReference) {
        self.failing.lock().await.push(recipient.clone());
    }

    /// Make every delivery to `recipient` wait forever (until cancelled).
    pub async fn hang_for(&self, recipient: &ConversationReference) {
        self.hanging.lock().await.push(recipient.clone());
    }

    /// Remove all injected failures and hangs.
    pub async fn heal(&self) {
        self.failing.lock().await.clear();
        self.hanging.lock().await.clear();
    }

    /// Every successful delivery, in order.
    pub async fn sent(&self) -> Vec<Delivery> {
        self.sent.lock().await.clone()
    }

    /// Payloads delivered to `recipient`, in order.
    pub async fn sent_to(&self, recipient: &ConversationReference) -> Vec<Payload> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|d| d.recipient.matches_loose(recipient))
            .map(|d| d.payload.clone())
            .collect()
    }

    /// Texts delivered to `recipient`, skipping non-text payloads.
    pub async fn texts_to(&self, recipient: &ConversationReference) -> Vec<String> {
        self.sent_to(recipient)
            .await
            .into_iter()
            .filter_map(|p| match p {
                Payload::Text(text) => Some(text),
                Payload::EndOfConversation => None,
            })
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl PluginAdapter for MockDelivery {
    fn name(&self) -> &str {
        "mock-delivery"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl DeliveryChannel for MockDelivery {
    async fn deliver(
        &self,
        recipient: &ConversationReference,
        payload: &Payload,
    ) -> Result<(), TandemError> {
        let hangs = self
            .hanging
            .lock()
            .await
            .iter()
            .any(|r| r.matches_loose(recipient));
        if hangs {
            std::future::pending::<()>().await;
        }

        let fails = self
            .failing
            .lock()
            .await
            .iter()
            .any(|r| r.matches_loose(recipient));
        if fails {
            return Err(TandemError::DeliveryFailed {
                recipient: recipient.to_string(),
                message: "mock transport refused the delivery".into(),
                source: None,
            });
        }

        self.sent.lock().await.push(Delivery {
            recipient: recipient.clone(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> ConversationReference {
        ConversationReference::new("webchat", "u1", "c1")
    }

    #[tokio::test]
    async fn captures_deliveries_per_recipient() {
        let delivery = MockDelivery::new();
        delivery.deliver(&user(), &Payload::text("hi")).await.unwrap();
        delivery
            .deliver(&user(), &Payload::EndOfConversation)
            .await
            .unwrap();
        delivery
            .deliver(
                &ConversationReference::new("msteams", "a1", "agents"),
                &Payload::text("other"),
            )
            .await
            .unwrap();

        let other_thread = ConversationReference::new("webchat", "u1", "c2");
        assert_eq!(delivery.sent_to(&other_thread).await.len(), 2);
        assert_eq!(delivery.texts_to(&user()).await, vec!["hi".to_string()]);
        assert_eq!(delivery.sent_count().await, 3);
    }

    #[tokio::test]
    async fn injected_failure_is_not_recorded() {
        let delivery = MockDelivery::new();
        delivery.fail_for(&user()).await;
        let err = delivery
            .deliver(&user(), &Payload::text("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, TandemError::DeliveryFailed { .. }));
        assert_eq!(delivery.sent_count().await, 0);

        delivery.heal().await;
        delivery.deliver(&user(), &Payload::text("hi")).await.unwrap();
        assert_eq!(delivery.sent_count().await, 1);
    }
}
