// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::TandemConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &TandemConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.partition_key.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.partition_key must not be empty",
        ));
    }

    let handoff = &config.handoff;
    if handoff.conversation_timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "handoff.conversation_timeout_secs must be greater than 0",
        ));
    }

    if handoff.trigger_keyword.trim().is_empty() {
        errors.push(ConfigError::validation(
            "handoff.trigger_keyword must not be empty",
        ));
    }

    if handoff.command_prefix.trim().is_empty() {
        errors.push(ConfigError::validation(
            "handoff.command_prefix must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChannelList;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&TandemConfig::default()).is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = TandemConfig::default();
        config.handoff.conversation_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("conversation_timeout_secs"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TandemConfig::default();
        config.log.level = "loud".into();
        config.storage.partition_key = " ".into();
        config.handoff.trigger_keyword = String::new();
        config.handoff.command_prefix = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn channel_lists_are_independent() {
        // Agents may work in msteams while msteams users never get handed off.
        let mut config = TandemConfig::default();
        config.handoff.permitted_aggregation_channels = ChannelList::parse("msteams,slack");
        config.handoff.no_direct_conversations_with_channels = ChannelList::parse("MSTEAMS");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = TandemConfig::default();
        config.log.level = "DEBUG".into();
        assert!(validate_config(&config).is_ok());
    }
}
