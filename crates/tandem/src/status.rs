// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tandem status` command implementation.
//!
//! Reads the configured routing store and message log and prints the
//! aggregation channels, pending requests, active connections, and message
//! logs it finds. With the in-memory backend there is nothing to show
//! outside a running process.

use std::io::IsTerminal;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tandem_config::TandemConfig;
use tandem_core::{MessageLogStore, PluginAdapter, RoutingStore, TandemError};
use tandem_storage::{Backends, open_backends};

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub store: String,
    pub durable: bool,
    pub aggregation_channels: Vec<String>,
    pub pending_requests: Vec<RequestSummary>,
    pub connections: Vec<ConnectionSummary>,
    pub message_logs: Vec<LogSummary>,
}

#[derive(Debug, Serialize)]
pub struct RequestSummary {
    pub requestor: String,
    pub created_at: DateTime<Utc>,
    pub waiting_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct ConnectionSummary {
    pub id: String,
    pub reference1: String,
    pub reference2: String,
    pub started_at: DateTime<Utc>,
    pub idle_secs: i64,
}

#[derive(Debug, Serialize)]
pub struct LogSummary {
    pub user: String,
    pub messages: usize,
}

/// Collect a status snapshot from `backends` as of `now`.
pub async fn gather(backends: &Backends, now: DateTime<Utc>) -> Result<StatusReport, TandemError> {
    let routing = &backends.routing;

    let aggregation_channels = routing
        .list_aggregation_channels()
        .await?
        .iter()
        .map(ToString::to_string)
        .collect();

    let mut requests = routing.list_requests().await?;
    requests.sort_by_key(|r| r.created_at);
    let pending_requests = requests
        .into_iter()
        .map(|r| RequestSummary {
            requestor: r.requestor.to_string(),
            created_at: r.created_at,
            waiting_secs: (now - r.created_at).num_seconds(),
        })
        .collect();

    let connections = routing
        .list_connections()
        .await?
        .into_iter()
        .map(|c| ConnectionSummary {
            idle_secs: c.idle_for(now).num_seconds(),
            id: c.id,
            reference1: c.reference1.to_string(),
            reference2: c.reference2.to_string(),
            started_at: c.started_at,
        })
        .collect();

    let message_logs = backends
        .message_log
        .list()
        .await?
        .into_iter()
        .map(|entry| LogSummary {
            user: entry.user.to_string(),
            messages: entry.messages.len(),
        })
        .collect();

    Ok(StatusReport {
        store: routing.name().to_string(),
        durable: routing.name() != "memory",
        aggregation_channels,
        pending_requests,
        connections,
        message_logs,
    })
}

/// Format seconds into a human-readable duration string.
fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Run the `tandem status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &TandemConfig, json: bool, plain: bool) -> Result<(), TandemError> {
    let backends = open_backends(&config.storage).await?;
    let report = gather(&backends, Utc::now()).await?;
    backends.shutdown().await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| TandemError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    println!();
    println!("  tandem status");
    println!("  {}", "-".repeat(35));
    println!("    Store:        {}", report.store);
    if !report.durable {
        if use_color {
            use colored::Colorize;
            println!("    {}", "in-memory store: state lives only inside a running shell".yellow());
        } else {
            println!("    [WARN] in-memory store: state lives only inside a running shell");
        }
    }

    section("Aggregation channels", report.aggregation_channels.len());
    for channel in &report.aggregation_channels {
        println!("      {channel}");
    }

    section("Pending requests", report.pending_requests.len());
    for request in &report.pending_requests {
        println!(
            "      {} (waiting {})",
            request.requestor,
            format_duration(request.waiting_secs)
        );
    }

    section("Connections", report.connections.len());
    for connection in &report.connections {
        println!(
            "      {} <-> {} (idle {})",
            connection.reference1,
            connection.reference2,
            format_duration(connection.idle_secs)
        );
    }

    section("Message logs", report.message_logs.len());
    for log in &report.message_logs {
        println!("      {} ({} messages)", log.user, log.messages);
    }
    println!();
}

fn section(title: &str, count: usize) {
    println!("    {title}: {count}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::ConversationReference;

    #[test]
    fn format_duration_seconds() {
        assert_eq!(format_duration(42), "42s");
    }

    #[test]
    fn format_duration_minutes() {
        assert_eq!(format_duration(125), "2m 5s");
    }

    #[test]
    fn format_duration_hours() {
        assert_eq!(format_duration(3720), "1h 2m");
        assert_eq!(format_duration(-5), "0s");
    }

    #[tokio::test]
    async fn gather_reports_routing_state() {
        let backends = Backends::in_memory();
        let user = ConversationReference::new("webchat", "u1", "c1");
        let agent = ConversationReference::new("msteams", "a1", "agents");
        let start = Utc::now();

        backends.routing.add_aggregation_channel(&agent).await.unwrap();
        backends
            .routing
            .create_request(&user, false, start)
            .await
            .unwrap();
        backends
            .routing
            .create_request(&ConversationReference::new("sms", "u2", "+1"), false, start)
            .await
            .unwrap();
        backends
            .routing
            .accept_request(&user, &agent, start)
            .await
            .unwrap();

        let report = gather(&backends, start + chrono::TimeDelta::seconds(90))
            .await
            .unwrap();
        assert_eq!(report.store, "memory");
        assert!(!report.durable);
        assert_eq!(report.aggregation_channels, vec![agent.to_string()]);
        assert_eq!(report.pending_requests.len(), 1);
        assert_eq!(report.pending_requests[0].waiting_secs, 90);
        assert_eq!(report.connections.len(), 1);
        assert_eq!(report.connections[0].idle_secs, 90);
        assert!(report.message_logs.is_empty());

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"store\":\"memory\""));
    }
}
