// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end routing tests.
//!
//! `TestHarness` assembles the full hand-off pipeline over a mock delivery
//! channel and a manual clock, on either the in-memory backend or a SQLite
//! file in a temp directory.

use std::sync::Arc;

use tandem_config::{ChannelList, HandoffConfig, StorageConfig};
use tandem_core::{Activity, Clock, ConversationReference, TandemError};
use tandem_handoff::{Disposition, HandoffMiddleware};
use tandem_router::{ConnectionRequestPolicy, MessageRouter};
use tandem_storage::{Backends, open_backends};
use tokio_util::sync::CancellationToken;

use crate::activity::ActivityBuilder;
use crate::clock::ManualClock;
use crate::mock_delivery::MockDelivery;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    handoff: HandoffConfig,
    durable: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            handoff: HandoffConfig::default(),
            durable: false,
        }
    }

    /// Use a SQLite file in a temp directory instead of memory.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Pick the backend by flag; handy for running one test over both.
    pub fn with_durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    pub fn with_handoff_config(mut self, config: HandoffConfig) -> Self {
        self.handoff = config;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.handoff.conversation_timeout_secs = secs;
        self
    }

    pub fn reject_if_no_aggregation_channel(mut self, reject: bool) -> Self {
        self.handoff.reject_connection_request_if_no_aggregation_channel = reject;
        self
    }

    pub fn with_permitted_aggregation_channels(mut self, csv: &str) -> Self {
        self.handoff.permitted_aggregation_channels = ChannelList::parse(csv);
        self
    }

    pub fn with_no_direct_conversations(mut self, csv: &str) -> Self {
        self.handoff.no_direct_conversations_with_channels = ChannelList::parse(csv);
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, TandemError> {
        let (backends, temp_dir) = if self.durable {
            let temp_dir = tempfile::TempDir::new().map_err(TandemError::store)?;
            let path = temp_dir.path().join("tandem.db");
            let storage = StorageConfig {
                connection_string: Some(path.to_string_lossy().into_owned()),
                ..StorageConfig::default()
            };
            (open_backends(&storage).await?, Some(temp_dir))
        } else {
            (Backends::in_memory(), None)
        };

        let delivery = Arc::new(MockDelivery::new());
        let clock = Arc::new(ManualClock::default());
        let router = Arc::new(MessageRouter::new(
            backends.routing.clone(),
            delivery.clone(),
            clock.clone(),
            ConnectionRequestPolicy::from_config(&self.handoff),
        ));
        let middleware =
            HandoffMiddleware::new(router.clone(), backends.message_log.clone(), &self.handoff);

        Ok(TestHarness {
            delivery,
            clock,
            backends,
            router,
            middleware,
            config: self.handoff,
            cancel: CancellationToken::new(),
            _temp_dir: temp_dir,
        })
    }
}

/// A complete routing environment with a mock transport.
pub struct TestHarness {
    /// Captures everything the router sends.
    pub delivery: Arc<MockDelivery>,
    pub clock: Arc<ManualClock>,
    pub backends: Backends,
    pub router: Arc<MessageRouter>,
    pub middleware: HandoffMiddleware,
    pub config: HandoffConfig,
    cancel: CancellationToken,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Run `activity` through the middleware.
    pub async fn send(&self, activity: &Activity) -> Result<Disposition, TandemError> {
        self.middleware.on_turn(activity, &self.cancel).await
    }

    /// Send `text` as `from`, from the conversation `from` carries.
    pub async fn say(
        &self,
        from: &ConversationReference,
        text: &str,
    ) -> Result<Disposition, TandemError> {
        let activity = ActivityBuilder::from_reference(from)
            .text(text)
            .at(self.clock.now())
            .build();
        self.send(&activity).await
    }

    /// Texts delivered to `recipient` so far.
    pub async fn texts_to(&self, recipient: &ConversationReference) -> Vec<String> {
        self.delivery.texts_to(recipient).await
    }

    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance_secs(secs);
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
