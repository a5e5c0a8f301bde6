// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tandem hand-off router.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level sections of `tandem.toml`.
pub const SECTIONS: &[&str] = &["log", "storage", "handoff"];

/// Keys of `[handoff]` that hold a [`ChannelList`].
pub const CHANNEL_LIST_KEYS: &[&str] = &[
    "permitted_aggregation_channels",
    "no_direct_conversations_with_channels",
];

/// Top-level Tandem configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TandemConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Routing store and message log backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Hand-off policy, timeout, and command settings.
    #[serde(default)]
    pub handoff: HandoffConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path of the SQLite database. `None` selects the in-memory backend,
    /// which loses all routing state on restart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<String>,

    /// Partition key shared by every record of this deployment.
    #[serde(default = "default_partition_key")]
    pub partition_key: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            partition_key: default_partition_key(),
            wal_mode: default_wal_mode(),
        }
    }
}

impl StorageConfig {
    /// Whether the durable backend is selected.
    pub fn is_durable(&self) -> bool {
        self.connection_string
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

fn default_partition_key() -> String {
    "tandem".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Hand-off configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Idle time after which a connection is evicted.
    #[serde(default = "default_conversation_timeout_secs")]
    pub conversation_timeout_secs: u64,

    /// Channels allowed to register as aggregation channels. Empty permits all.
    #[serde(default)]
    pub permitted_aggregation_channels: ChannelList,

    /// Channels whose users may never be handed off to a human.
    #[serde(default)]
    pub no_direct_conversations_with_channels: ChannelList,

    /// Reject new connection requests while no aggregation channel is registered.
    #[serde(default)]
    pub reject_connection_request_if_no_aggregation_channel: bool,

    /// Word that, when present in a message, asks for a human.
    #[serde(default = "default_trigger_keyword")]
    pub trigger_keyword: String,

    /// Prefix marking a message as an agent command.
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,

    /// Append relayed messages to the message log.
    #[serde(default = "default_log_messages")]
    pub log_messages: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            conversation_timeout_secs: default_conversation_timeout_secs(),
            permitted_aggregation_channels: ChannelList::default(),
            no_direct_conversations_with_channels: ChannelList::default(),
            reject_connection_request_if_no_aggregation_channel: false,
            trigger_keyword: default_trigger_keyword(),
            command_prefix: default_command_prefix(),
            log_messages: default_log_messages(),
        }
    }
}

impl HandoffConfig {
    pub fn conversation_timeout(&self) -> Duration {
        Duration::from_secs(self.conversation_timeout_secs)
    }
}

fn default_conversation_timeout_secs() -> u64 {
    3600
}

fn default_trigger_keyword() -> String {
    "human".to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

fn default_log_messages() -> bool {
    true
}

/// A list of channel ids.
///
/// Accepts either a TOML array or a comma-separated string, which is the
/// only form an environment variable can carry. Entries are trimmed and
/// empty entries dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "RawChannelList", into = "Vec<String>")]
pub struct ChannelList(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChannelList {
    Csv(String),
    List(Vec<String>),
}

impl From<RawChannelList> for ChannelList {
    fn from(raw: RawChannelList) -> Self {
        match raw {
            RawChannelList::Csv(s) => ChannelList::parse(&s),
            RawChannelList::List(items) => ChannelList::from_iter(items),
        }
    }
}

impl From<ChannelList> for Vec<String> {
    fn from(list: ChannelList) -> Self {
        list.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for ChannelList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        ChannelList(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl ChannelList {
    /// Parse a comma-separated list.
    pub fn parse(csv: &str) -> Self {
        csv.split(',').collect()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, channel_id: &str) -> bool {
        self.0.iter().any(|c| c.eq_ignore_ascii_case(channel_id))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_list_parses_csv_with_whitespace() {
        let list = ChannelList::parse(" msteams, slack ,,webchat ");
        assert_eq!(list.as_slice(), ["msteams", "slack", "webchat"]);
    }

    #[test]
    fn channel_list_contains_ignores_case() {
        let list = ChannelList::parse("MSTeams");
        assert!(list.contains("msteams"));
        assert!(!list.contains("slack"));
    }

    #[test]
    fn channel_list_accepts_string_or_array() {
        let csv: HandoffConfig =
            toml::from_str(r#"permitted_aggregation_channels = "msteams, slack""#).unwrap();
        let array: HandoffConfig =
            toml::from_str(r#"permitted_aggregation_channels = ["msteams", " slack"]"#).unwrap();
        assert_eq!(
            csv.permitted_aggregation_channels,
            array.permitted_aggregation_channels
        );
    }

    #[test]
    fn blank_connection_string_is_not_durable() {
        let mut storage = StorageConfig::default();
        assert!(!storage.is_durable());
        storage.connection_string = Some("   ".into());
        assert!(!storage.is_durable());
        storage.connection_string = Some("/tmp/tandem.db".into());
        assert!(storage.is_durable());
    }

    #[test]
    fn timeout_defaults_to_one_hour() {
        assert_eq!(
            HandoffConfig::default().conversation_timeout(),
            Duration::from_secs(3600)
        );
    }
}
