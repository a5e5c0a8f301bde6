// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles the routing pipeline from configuration.

use std::sync::Arc;

use tandem_config::TandemConfig;
use tandem_core::{DeliveryChannel, PluginAdapter, SystemClock, TandemError};
use tandem_handoff::HandoffMiddleware;
use tandem_router::{ConnectionRequestPolicy, MessageRouter};
use tandem_storage::{Backends, open_backends};
use tracing::info;

/// Everything a transport needs to drive turns.
pub struct Pipeline {
    pub backends: Backends,
    pub middleware: HandoffMiddleware,
}

/// Open the configured backends and build the middleware over `delivery`.
pub async fn build(
    config: &TandemConfig,
    delivery: Arc<dyn DeliveryChannel>,
) -> Result<Pipeline, TandemError> {
    let backends = open_backends(&config.storage).await?;
    let router = Arc::new(MessageRouter::new(
        backends.routing.clone(),
        delivery,
        Arc::new(SystemClock),
        ConnectionRequestPolicy::from_config(&config.handoff),
    ));
    let middleware =
        HandoffMiddleware::new(router, backends.message_log.clone(), &config.handoff);
    info!(
        store = backends.routing.name(),
        timeout_secs = config.handoff.conversation_timeout_secs,
        "routing pipeline ready"
    );
    Ok(Pipeline {
        backends,
        middleware,
    })
}
