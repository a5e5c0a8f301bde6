// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn hand-off pipeline.
//!
//! Order for message turns: sweep idle connections, register references,
//! commands, relay, hand-off trigger. Each stage either consumes the turn or
//! passes it on; a turn nobody consumed propagates to the bot.

use std::sync::Arc;

use strum::Display;
use tandem_config::HandoffConfig;
use tandem_core::{Activity, MessageLogStore, TandemError};
use tandem_router::{MessageRouter, RoutingOutcome, TimeoutSweeper};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::commands::CommandHandler;
use crate::notify::Notifier;
use crate::trigger::{HandoffTrigger, KeywordTrigger};

/// What the middleware did with a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Disposition {
    /// Consumed: relayed, a command, or a hand-off request.
    Handled,
    /// Not for the router; the bot should answer it.
    Propagate,
}

pub struct HandoffMiddleware {
    router: Arc<MessageRouter>,
    sweeper: TimeoutSweeper,
    message_log: Arc<dyn MessageLogStore>,
    notifier: Arc<Notifier>,
    commands: CommandHandler,
    trigger: Box<dyn HandoffTrigger>,
    reject_if_no_aggregation_channel: bool,
    log_messages: bool,
}

impl HandoffMiddleware {
    /// Build the pipeline over `router`, with a [`KeywordTrigger`] on the
    /// configured keyword.
    pub fn new(
        router: Arc<MessageRouter>,
        message_log: Arc<dyn MessageLogStore>,
        config: &HandoffConfig,
    ) -> Self {
        let notifier = Arc::new(Notifier::new(router.clone(), config.command_prefix.clone()));
        Self {
            sweeper: TimeoutSweeper::new(router.clone(), config.conversation_timeout()),
            commands: CommandHandler::new(
                router.clone(),
                notifier.clone(),
                config.command_prefix.clone(),
            ),
            trigger: Box::new(KeywordTrigger::new(config.trigger_keyword.clone())),
            reject_if_no_aggregation_channel: config
                .reject_connection_request_if_no_aggregation_channel,
            log_messages: config.log_messages,
            router,
            message_log,
            notifier,
        }
    }

    /// Replace the hand-off trigger.
    pub fn with_trigger(mut self, trigger: impl HandoffTrigger) -> Self {
        self.trigger = Box::new(trigger);
        self
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn message_log(&self) -> &Arc<dyn MessageLogStore> {
        &self.message_log
    }

    /// Run one inbound turn through the pipeline.
    ///
    /// Errors are store failures and relay delivery failures. A failed
    /// sweep or notice is logged and does not fail the turn.
    pub async fn on_turn(
        &self,
        activity: &Activity,
        cancel: &CancellationToken,
    ) -> Result<Disposition, TandemError> {
        if !activity.is_message() {
            return Ok(Disposition::Propagate);
        }
        let sender = activity.sender_reference();

        if let Err(e) = self.sweeper.sweep(&sender, cancel).await {
            warn!(sender = %sender, error = %e, "timeout sweep failed");
        }

        self.router.register_turn(activity).await;

        if let Some(command) = self.commands.parse(activity.text()) {
            self.commands.execute(command, &sender, cancel).await?;
            return Ok(Disposition::Handled);
        }

        if let RoutingOutcome::MessageRouted { .. } =
            self.router.route_if_connected(activity, cancel).await?
        {
            if self.log_messages {
                if let Err(e) = self.message_log.append(&sender, activity).await {
                    warn!(sender = %sender, error = %e, "failed to log relayed message");
                }
            }
            return Ok(Disposition::Handled);
        }

        if self.trigger.should_hand_off(activity).await {
            let outcome = self
                .router
                .create_connection_request(&sender, self.reject_if_no_aggregation_channel)
                .await?;
            debug!(sender = %sender, ?outcome, "hand-off requested");
            self.notifier.request_outcome(&sender, &outcome, cancel).await;
            return Ok(Disposition::Handled);
        }

        Ok(Disposition::Propagate)
    }
}
