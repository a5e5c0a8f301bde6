// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Known conversation references, keyed by strict identity.

use chrono::Utc;
use tandem_core::{ConversationReference, TandemError};

use crate::database::{Database, map_tr_err};
use crate::records::{self, Table, decode_all, encode};

/// Record or refresh a reference. A later turn's metadata wins.
pub async fn upsert(
    db: &Database,
    partition: &str,
    reference: &ConversationReference,
) -> Result<(), TandemError> {
    let key = reference.strict_key();
    let body = encode(&key, reference)?;
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| {
            records::put(conn, Table::References, &partition, &key, &body, Utc::now())
        })
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
        .call(move |conn| records::load_all(conn, Table::References, &partition))
        .await
        .map_err(map_tr_err)?;
    decode_all(&rows)
}
