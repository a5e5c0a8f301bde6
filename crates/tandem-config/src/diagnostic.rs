// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment errors are turned into miette diagnostics that name the section
//! they occurred in, point at the offending key when it came from a file,
//! and explain what `tandem.toml` expects there: the keys of the section,
//! an example value, or the two accepted channel list forms.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::{CHANNEL_LIST_KEYS, SECTIONS};

/// Minimum Jaro-Winkler similarity score to suggest a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key `tandem.toml` does not know, in a section or at the top level.
    #[error("unknown configuration key `{key}` in {}", section_label(section))]
    #[diagnostic(
        code(tandem::config::unknown_key),
        help("{}", unknown_key_help(section, suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Section the key was found in; empty at the top level.
        section: String,
        suggestion: Option<String>,
        /// Comma-separated keys valid in the same section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A scalar value of the wrong type.
    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(tandem::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        /// What the key takes, with an example value where one is known.
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A channel list that is neither a string nor an array of strings.
    #[error("`{key}` is not a channel list")]
    #[diagnostic(
        code(tandem::config::channel_list),
        help(
            "use a comma-separated string such as \"msteams, slack\" \
             or an array such as [\"msteams\", \"slack\"]"
        )
    )]
    InvalidChannelList {
        key: String,
        #[label("expected a string or an array of strings")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value deserialized but breaks a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(tandem::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tandem::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ConfigError::Validation {
            message: message.into(),
        }
    }
}

fn section_label(section: &str) -> String {
    if section.is_empty() {
        "the top level".to_string()
    } else {
        format!("[{section}]")
    }
}

fn unknown_key_help(section: &str, suggestion: Option<&str>, valid_keys: &str) -> String {
    let listing = if section.is_empty() {
        format!("tandem.toml has the sections {valid_keys}")
    } else {
        format!("[{section}] accepts {valid_keys}")
    };
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {listing}"),
        None => listing,
    }
}

/// What a known key takes, phrased for the help line.
fn expected_value(key: &str, fallback: &str) -> String {
    match key {
        "log.level" => "one of trace, debug, info, warn, error".to_string(),
        "storage.connection_string" => "a path such as \"/var/lib/tandem/routing.db\"".to_string(),
        "storage.partition_key" | "handoff.trigger_keyword" | "handoff.command_prefix" => {
            format!("a string ({fallback})")
        }
        "storage.wal_mode"
        | "handoff.log_messages"
        | "handoff.reject_connection_request_if_no_aggregation_channel" => {
            "true or false".to_string()
        }
        "handoff.conversation_timeout_secs" => {
            "a whole number of seconds greater than 0, such as 3600".to_string()
        }
        _ => fallback.to_string(),
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// `toml_sources` holds `(path, content)` pairs used to point at the
/// offending line when the error came from a file.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
            let dotted = path.join(".");
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let section = path.first().cloned().unwrap_or_default();
                    let valid: Vec<&str> = if section.is_empty() {
                        SECTIONS.to_vec()
                    } else {
                        expected.to_vec()
                    };
                    let (span, src) = locate(&error, &path, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        section,
                        suggestion: suggest_key(field, &valid),
                        valid_keys: valid.join(", "),
                        span,
                        src,
                    }
                }
                _ if is_channel_list(&path) => {
                    let (span, src) = locate_value(&error, &path, toml_sources);
                    ConfigError::InvalidChannelList {
                        key: dotted,
                        span,
                        src,
                    }
                }
                Kind::InvalidType(actual, expected) => {
                    let (span, src) = locate_value(&error, &path, toml_sources);
                    ConfigError::InvalidType {
                        expected: expected_value(&dotted, expected),
                        key: dotted,
                        found: actual.to_string(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn is_channel_list(path: &[String]) -> bool {
    path.len() == 2 && path[0] == "handoff" && CHANNEL_LIST_KEYS.contains(&path[1].as_str())
}

/// Span of the key a value error belongs to: the last path segment, searched
/// under the section named by the rest.
fn locate_value(
    error: &figment::error::Error,
    path: &[String],
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    match path.split_last() {
        Some((field, section)) => locate(error, section, field, toml_sources),
        None => (None, None),
    }
}

fn locate(
    error: &figment::error::Error,
    section: &[String],
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let source_path = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let Some((path, content)) = source_path.as_ref().and_then(|path| {
        toml_sources
            .iter()
            .find(|(p, _)| p == path)
            .map(|(p, content)| (p.as_str(), content.as_str()))
    }) else {
        return (None, None);
    };

    match find_key_offset(content, section.first().map(String::as_str), field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.to_string())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside `[section]`, or before the first header
/// when `section` is `None`.
pub fn find_key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let header = section.map(|s| format!("[{s}]"));
    let mut in_section = header.is_none();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') {
            in_section = header
                .as_deref()
                .is_some_and(|h| trimmed.trim_end().starts_with(h));
        } else if in_section {
            if let Some(after) = trimmed.strip_prefix(field) {
                if after.starts_with([' ', '=', '\t']) {
                    return Some(offset + (line.len() - trimmed.len()));
                }
            }
        }
        offset += line.len();
    }

    None
}

/// Suggest the closest valid key above the similarity threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render a list of `ConfigError`s to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}
