// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent commands typed into a conversation.
//!
//! A message is a command when its text starts with the configured prefix.
//! Commands are always consumed by the middleware.

use std::sync::Arc;

use strum::{Display, EnumString};
use tandem_core::{ConnectionRequest, ConversationReference, TandemError};
use tandem_router::{AggregationChange, MessageRouter};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::notify::Notifier;

/// Command names, as typed after the prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CommandName {
    Watch,
    Unwatch,
    Requests,
    Accept,
    Reject,
    Disconnect,
    Help,
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watch,
    Unwatch,
    Requests,
    /// Accept the request of the named user (`user` or `channel:user`).
    Accept(String),
    Reject(String),
    Disconnect,
    Help,
    /// Known command with a missing argument.
    Usage(CommandName),
    Unknown(String),
}

impl Command {
    /// Parse `text` if it starts with `prefix`. Returns `None` for plain messages.
    pub fn parse(text: &str, prefix: &str) -> Option<Command> {
        if prefix.is_empty() {
            return None;
        }
        let rest = text.trim_start().strip_prefix(prefix)?;
        let mut words = rest.split_whitespace();
        let word = words.next().unwrap_or_default();
        let argument = words.next().map(str::to_owned);

        let Ok(name) = word.parse::<CommandName>() else {
            return Some(Command::Unknown(word.to_owned()));
        };
        Some(match (name, argument) {
            (CommandName::Watch, _) => Command::Watch,
            (CommandName::Unwatch, _) => Command::Unwatch,
            (CommandName::Requests, _) => Command::Requests,
            (CommandName::Accept, Some(user)) => Command::Accept(user),
            (CommandName::Reject, Some(user)) => Command::Reject(user),
            (CommandName::Accept | CommandName::Reject, None) => Command::Usage(name),
            (CommandName::Disconnect, _) => Command::Disconnect,
            (CommandName::Help, _) => Command::Help,
        })
    }

    /// Whether the command may only be issued from an aggregation channel.
    pub fn requires_aggregation_channel(&self) -> bool {
        matches!(
            self,
            Command::Requests | Command::Accept(_) | Command::Reject(_)
        )
    }
}

/// Runs commands on behalf of the sender.
pub struct CommandHandler {
    router: Arc<MessageRouter>,
    notifier: Arc<Notifier>,
    prefix: String,
}

impl CommandHandler {
    pub fn new(router: Arc<MessageRouter>, notifier: Arc<Notifier>, prefix: impl Into<String>) -> Self {
        Self {
            router,
            notifier,
            prefix: prefix.into(),
        }
    }

    pub fn parse(&self, text: &str) -> Option<Command> {
        Command::parse(text, &self.prefix)
    }

    /// Execute `command` for `sender`.
    ///
    /// Outcomes the sender should hear about are replied to in the
    /// conversation; only store failures are returned.
    pub async fn execute(
        &self,
        command: Command,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        debug!(sender = %sender, ?command, "executing command");

        if command.requires_aggregation_channel()
            && !self.router.is_aggregation_channel(sender).await?
        {
            self.reply(
                sender,
                format!(
                    "This command only works in an aggregation channel. Type \"{}watch\" to make this conversation one.",
                    self.prefix
                ),
                cancel,
            )
            .await;
            return Ok(());
        }

        match command {
            Command::Watch => self.watch(sender, cancel).await,
            Command::Unwatch => {
                let text = if self.router.remove_aggregation_channel(sender).await? {
                    "This conversation is no longer an aggregation channel."
                } else {
                    "This conversation is not an aggregation channel."
                };
                self.reply(sender, text, cancel).await;
                Ok(())
            }
            Command::Requests => self.list_requests(sender, cancel).await,
            Command::Accept(user) => self.accept(&user, sender, cancel).await,
            Command::Reject(user) => self.reject(&user, sender, cancel).await,
            Command::Disconnect => {
                match self.router.take_connection(sender).await? {
                    Some(connection) => self.notifier.disconnected(&connection, cancel).await,
                    None => self.reply(sender, "You are not connected.", cancel).await,
                }
                Ok(())
            }
            Command::Help => {
                self.reply(sender, self.help_text(), cancel).await;
                Ok(())
            }
            Command::Usage(name) => {
                self.reply(
                    sender,
                    format!("Usage: {}{name} <user> or {}{name} <channel>:<user>", self.prefix, self.prefix),
                    cancel,
                )
                .await;
                Ok(())
            }
            Command::Unknown(word) => {
                self.reply(
                    sender,
                    format!(
                        "Unknown command \"{word}\". Type \"{}help\" for the list of commands.",
                        self.prefix
                    ),
                    cancel,
                )
                .await;
                Ok(())
            }
        }
    }

    pub fn help_text(&self) -> String {
        let p = &self.prefix;
        format!(
            "Commands:\n\
             {p}watch - receive requests for a human agent in this conversation\n\
             {p}unwatch - stop receiving requests here\n\
             {p}requests - list pending requests\n\
             {p}accept <user> - connect with the user who asked for an agent\n\
             {p}reject <user> - turn a pending request down\n\
             {p}disconnect - end the current conversation\n\
             {p}help - show this list"
        )
    }

    async fn reply(
        &self,
        sender: &ConversationReference,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) {
        self.notifier.notify(sender, text, cancel).await;
    }

    async fn watch(
        &self,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        let text = match self.router.add_aggregation_channel(sender).await? {
            AggregationChange::Added => {
                "This conversation is now an aggregation channel. New requests for a human agent will be posted here.".to_owned()
            }
            AggregationChange::AlreadyRegistered => {
                "This conversation is already an aggregation channel.".to_owned()
            }
            AggregationChange::NotPermitted => format!(
                "Channel \"{}\" cannot be used as an aggregation channel.",
                sender.channel_id
            ),
        };
        self.reply(sender, text, cancel).await;
        Ok(())
    }

    async fn list_requests(
        &self,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        let requests = self.router.pending_requests().await?;
        let text = if requests.is_empty() {
            "No pending requests.".to_owned()
        } else {
            let lines: Vec<String> = requests
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    format!(
                        "{}. {} ({}:{}) waiting since {}",
                        i + 1,
                        r.requestor.display_name(),
                        r.requestor.channel_id,
                        r.requestor.user_id,
                        r.created_at.format("%H:%M:%S UTC")
                    )
                })
                .collect();
            format!("Pending requests:\n{}", lines.join("\n"))
        };
        self.reply(sender, text, cancel).await;
        Ok(())
    }

    async fn accept(
        &self,
        user: &str,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        let request = match self.resolve_request(user).await? {
            Resolved::One(request) => request,
            other => {
                self.reply(sender, other.explain(user, &self.prefix), cancel).await;
                return Ok(());
            }
        };

        match self.router.accept_request(&request.requestor, sender).await {
            Ok(connection) => {
                self.notifier.connected(&connection, cancel).await;
                Ok(())
            }
            Err(TandemError::RequestNotFound { .. }) => {
                self.reply(sender, format!("No pending request from {user}."), cancel)
                    .await;
                Ok(())
            }
            Err(TandemError::SelfConnection { .. }) => {
                self.reply(sender, "You cannot accept your own request.", cancel)
                    .await;
                Ok(())
            }
            Err(TandemError::AlreadyConnected { .. }) => {
                self.reply(
                    sender,
                    format!(
                        "You or {} are already in a conversation. Type \"{}disconnect\" first.",
                        request.requestor.display_name(),
                        self.prefix
                    ),
                    cancel,
                )
                .await;
                Ok(())
            }
            Err(TandemError::AlreadyRequested { .. }) => {
                self.reply(
                    sender,
                    "You have a pending request of your own and cannot accept one.",
                    cancel,
                )
                .await;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn reject(
        &self,
        user: &str,
        sender: &ConversationReference,
        cancel: &CancellationToken,
    ) -> Result<(), TandemError> {
        let request = match self.resolve_request(user).await? {
            Resolved::One(request) => request,
            other => {
                self.reply(sender, other.explain(user, &self.prefix), cancel).await;
                return Ok(());
            }
        };

        match self.router.reject_request(&request.requestor).await? {
            Some(rejected) => {
                self.notifier.request_rejected(&rejected, cancel).await;
                self.reply(
                    sender,
                    format!("Rejected the request from {}.", rejected.requestor.display_name()),
                    cancel,
                )
                .await;
            }
            None => {
                self.reply(sender, format!("No pending request from {user}."), cancel)
                    .await;
            }
        }
        Ok(())
    }

    /// Find the pending request named by `user`, either a user id or a
    /// `channel:user` handle. The name must match exactly one request.
    async fn resolve_request(&self, user: &str) -> Result<Resolved, TandemError> {
        let mut matches: Vec<ConnectionRequest> = self
            .router
            .pending_requests()
            .await?
            .into_iter()
            .filter(|r| names_requestor(user, &r.requestor))
            .collect();
        Ok(match matches.len() {
            0 => Resolved::None,
            1 => Resolved::One(matches.remove(0)),
            _ => Resolved::Ambiguous,
        })
    }
}

/// Whether `handle` names `requestor`.
///
/// User ids may contain `:` themselves (msteams ids look like `29:1abc`), so
/// the whole handle is first tried as a user id. Channel ids compare
/// case-insensitively, as in the channel lists.
fn names_requestor(handle: &str, requestor: &ConversationReference) -> bool {
    requestor.user_id == handle
        || handle.split_once(':').is_some_and(|(channel, user_id)| {
            requestor.channel_id.eq_ignore_ascii_case(channel) && requestor.user_id == user_id
        })
}

enum Resolved {
    None,
    One(ConnectionRequest),
    Ambiguous,
}

impl Resolved {
    fn explain(&self, user: &str, prefix: &str) -> String {
        match self {
            Resolved::Ambiguous => format!(
                "More than one pending request from {user}. Use <channel>:<user>, see \"{prefix}requests\"."
            ),
            _ => format!("No pending request from {user}."),
        }
    }
}
