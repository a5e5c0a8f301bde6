// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregation channel registrations, keyed by strict identity.

use chrono::Utc;
use tandem_core::{ConversationReference, TandemError};

use crate::database::{Database, map_tr_err};
use crate::records::{self, Table, decode_all, encode};

/// Register a channel. Returns `false` if it was already registered.
pub async fn add(
    db: &Database,
    partition: &str,
    reference: &ConversationReference,
) -> Result<bool, TandemError> {
    let key = reference.strict_key();
    let body = encode(&key, reference)?;
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| {
            records::insert_new(
                conn,
                Table::AggregationChannels,
                &partition,
                &key,
                &body,
                Utc::now(),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Unregister a channel. Returns `false` if it was not registered.
pub async fn remove(
    db: &Database,
    partition: &str,
    reference: &ConversationReference,
) -> Result<bool, TandemError> {
    let key = reference.strict_key();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| records::delete(conn, Table::AggregationChannels, &partition, &key))
        .await
        .map_err(map_tr_err)
}

pub async fn list(
    db: &Database,
    partition: &str,
) -> Result<Vec<ConversationReference>, TandemError> {
    let partition = partition.to_string();
    let rows = db
        .connection()
        .call(move |conn| records::load_all(conn, Table::AggregationChannels, &partition))
        .await
        .map_err(map_tr_err)?;
    decode_all(&rows)
}
