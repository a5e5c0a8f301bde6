// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tandem shell` command implementation.
//!
//! An interactive console transport. Each input line plays one inbound turn
//! from any participant:
//!
//! ```text
//! webchat:u1 I need a human
//! msteams:a1@agents /watch
//! ```
//!
//! Deliveries are printed as they happen. Turns the router does not consume
//! get a canned bot reply.

use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tandem_config::TandemConfig;
use tandem_core::{
    Activity, AdapterType, ChannelAccount, ConversationReference, DeliveryChannel, HealthStatus,
    Payload, PluginAdapter, TandemError,
};
use tandem_handoff::{Disposition, HandoffMiddleware};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::pipeline;

const BOT_ID: &str = "bot";
const BOT_NAME: &str = "Tandem";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellLine {
    pub channel_id: String,
    pub user_id: String,
    pub conversation_id: String,
    pub text: String,
}

impl ShellLine {
    /// Parse `<channel>:<user>[@<conversation>] <text>`.
    ///
    /// Without an explicit conversation the user id doubles as one, so
    /// every user gets a private conversation by default.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (address, text) = line
            .split_once(char::is_whitespace)
            .map(|(a, t)| (a, t.trim()))
            .unwrap_or((line, ""));
        let (channel_id, rest) = address
            .split_once(':')
            .ok_or_else(|| format!("expected <channel>:<user>, got `{address}`"))?;
        let (user_id, conversation_id) = match rest.split_once('@') {
            Some((user, conversation)) => (user, conversation),
            None => (rest, rest),
        };
        if channel_id.is_empty() || user_id.is_empty() || conversation_id.is_empty() {
            return Err(format!("incomplete address `{address}`"));
        }
        if text.is_empty() {
            return Err("nothing to send".into());
        }
        Ok(Self {
            channel_id: channel_id.to_owned(),
            user_id: user_id.to_owned(),
            conversation_id: conversation_id.to_owned(),
            text: text.to_owned(),
        })
    }

    pub fn into_activity(self) -> Activity {
        Activity::message(
            self.channel_id,
            self.conversation_id,
            ChannelAccount::new(self.user_id),
            ChannelAccount::named(BOT_ID, BOT_NAME),
            self.text,
        )
    }
}

/// Delivery channel that prints to the terminal.
pub struct ConsoleDelivery;

#[async_trait]
impl PluginAdapter for ConsoleDelivery {
    fn name(&self) -> &str {
        "console"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Delivery
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl DeliveryChannel for ConsoleDelivery {
    async fn deliver(
        &self,
        recipient: &ConversationReference,
        payload: &Payload,
    ) -> Result<(), TandemError> {
        println!("{}", render_delivery(recipient, payload));
        Ok(())
    }
}

fn render_delivery(recipient: &ConversationReference, payload: &Payload) -> String {
    let to = format!("-> {recipient}").cyan();
    match payload {
        Payload::Text(text) => format!("{to} {text}"),
        Payload::EndOfConversation => format!("{to} {}", "[end of conversation]".dimmed()),
    }
}

/// Reply for turns the router passed on.
pub fn bot_reply(text: &str, keyword: &str) -> String {
    format!("You said \"{text}\". Say \"{keyword}\" to talk to a person.")
}

/// Run one line through the middleware, printing the result.
pub async fn handle_line(
    middleware: &HandoffMiddleware,
    keyword: &str,
    line: &str,
    cancel: &CancellationToken,
) -> Result<Disposition, TandemError> {
    let parsed = ShellLine::parse(line).map_err(TandemError::Internal)?;
    let activity = parsed.into_activity();
    let disposition = middleware.on_turn(&activity, cancel).await?;
    debug!(%disposition, from = %activity.sender_reference(), "turn processed");

    if disposition == Disposition::Propagate {
        let reply = Payload::text(bot_reply(activity.text(), keyword));
        println!("{}", render_delivery(&activity.sender_reference(), &reply));
    }
    Ok(disposition)
}

/// Runs the `tandem shell` interactive REPL.
pub async fn run_shell(config: TandemConfig) -> Result<(), TandemError> {
    let pipeline = pipeline::build(&config, Arc::new(ConsoleDelivery)).await?;
    let cancel = CancellationToken::new();

    let mut rl = DefaultEditor::new()
        .map_err(|e| TandemError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "tandem shell".bold().green());
    println!(
        "Each line is a turn: {}. Type {} to exit.\n",
        "<channel>:<user>[@<conversation>] <text>".yellow(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", "tandem".green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed == "/quit" || trimmed == "/exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Err(e) =
                    handle_line(&pipeline.middleware, &config.handoff.trigger_keyword, trimmed, &cancel)
                        .await
                {
                    eprintln!("{}: {e}", "error".red());
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    cancel.cancel();
    pipeline.backends.shutdown().await
}
