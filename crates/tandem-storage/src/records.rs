// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed-record primitives shared by every table.
//!
//! Each table maps `(partition_key, row_key)` to a JSON `body`. These helpers
//! run on the writer thread and take a plain `rusqlite::Connection` so they
//! can be used both directly and inside a transaction.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tandem_core::TandemError;

/// The tables of the routing schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    References,
    AggregationChannels,
    Requests,
    Connections,
    MessageLogs,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::References => "conversation_references",
            Table::AggregationChannels => "aggregation_channels",
            Table::Requests => "connection_requests",
            Table::Connections => "connections",
            Table::MessageLogs => "message_logs",
        }
    }
}

/// A raw record as stored.
#[derive(Debug, Clone)]
pub struct Record {
    pub row_key: String,
    pub body: String,
}

impl Record {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, TandemError> {
        decode(&self.row_key, &self.body)
    }
}

/// Fixed-width timestamp so `updated_at` sorts lexicographically.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, TandemError> {
    serde_json::to_string(value).map_err(|source| TandemError::Serialization {
        key: key.to_string(),
        source,
    })
}

pub fn decode<T: DeserializeOwned>(key: &str, body: &str) -> Result<T, TandemError> {
    serde_json::from_str(body).map_err(|source| TandemError::Serialization {
        key: key.to_string(),
        source,
    })
}

/// Decode every record, stopping at the first malformed body.
pub fn decode_all<T: DeserializeOwned>(records: &[Record]) -> Result<Vec<T>, TandemError> {
    records.iter().map(Record::decode).collect()
}

/// All records of a partition, oldest write first.
pub fn load_all(
    conn: &rusqlite::Connection,
    table: Table,
    partition: &str,
) -> Result<Vec<Record>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT row_key, body FROM {} WHERE partition_key = ?1 ORDER BY updated_at, row_key",
        table.name()
    ))?;
    let rows = stmt.query_map(params![partition], |row| {
        Ok(Record {
            row_key: row.get(0)?,
            body: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn load_one(
    conn: &rusqlite::Connection,
    table: Table,
    partition: &str,
    row_key: &str,
) -> Result<Option<Record>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT row_key, body FROM {} WHERE partition_key = ?1 AND row_key = ?2",
            table.name()
        ),
        params![partition, row_key],
        |row| {
            Ok(Record {
                row_key: row.get(0)?,
                body: row.get(1)?,
            })
        },
    )
    .optional()
}

/// Insert or replace the record at `row_key`.
pub fn put(
    conn: &rusqlite::Connection,
    table: Table,
    partition: &str,
    row_key: &str,
    body: &str,
    updated_at: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!(
            "INSERT INTO {} (partition_key, row_key, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (partition_key, row_key)
             DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            table.name()
        ),
        params![partition, row_key, body, stamp(updated_at)],
    )?;
    Ok(())
}

/// Insert only if `row_key` is free. Returns whether a row was written.
pub fn insert_new(
    conn: &rusqlite::Connection,
    table: Table,
    partition: &str,
    row_key: &str,
    body: &str,
    updated_at: DateTime<Utc>,
) -> Result<bool, rusqlite::Error> {
    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (partition_key, row_key, body, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            table.name()
        ),
        params![partition, row_key, body, stamp(updated_at)],
    )?;
    Ok(inserted > 0)
}

/// Delete the record at `row_key`. Returns whether a row existed.
pub fn delete(
    conn: &rusqlite::Connection,
    table: Table,
    partition: &str,
    row_key: &str,
) -> Result<bool, rusqlite::Error> {
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {} WHERE partition_key = ?1 AND row_key = ?2",
            table.name()
        ),
        params![partition, row_key],
    )?;
    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn memory_conn() -> rusqlite::Connection {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        crate::migrations::run_migrations(&mut conn).unwrap();
        conn
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn put_replaces_existing_body() {
        let conn = memory_conn();
        put(&conn, Table::MessageLogs, "p", "conv-1", "first", at(0)).unwrap();
        put(&conn, Table::MessageLogs, "p", "conv-1", "second", at(1)).unwrap();
        let record = load_one(&conn, Table::MessageLogs, "p", "conv-1")
            .unwrap()
            .unwrap();
        assert_eq!(record.body, "second");
        assert_eq!(load_all(&conn, Table::MessageLogs, "p").unwrap().len(), 1);
    }

    #[test]
    fn insert_new_refuses_duplicates() {
        let conn = memory_conn();
        assert!(insert_new(&conn, Table::Requests, "p", "k", "a", at(0)).unwrap());
        assert!(!insert_new(&conn, Table::Requests, "p", "k", "b", at(1)).unwrap());
        let record = load_one(&conn, Table::Requests, "p", "k").unwrap().unwrap();
        assert_eq!(record.body, "a");
    }

    #[test]
    fn partitions_are_isolated() {
        let conn = memory_conn();
        put(&conn, Table::References, "one", "k", "a", at(0)).unwrap();
        put(&conn, Table::References, "two", "k", "b", at(0)).unwrap();
        assert_eq!(load_all(&conn, Table::References, "one").unwrap().len(), 1);
        assert!(delete(&conn, Table::References, "one", "k").unwrap());
        assert!(!delete(&conn, Table::References, "one", "k").unwrap());
        assert_eq!(load_all(&conn, Table::References, "two").unwrap().len(), 1);
    }

    #[test]
    fn malformed_body_reports_its_key() {
        let record = Record {
            row_key: "webchat|u1".into(),
            body: "{not json".into(),
        };
        let err = record.decode::<serde_json::Value>().unwrap_err();
        match err {
            TandemError::Serialization { key, .. } => assert_eq!(key, "webchat|u1"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
