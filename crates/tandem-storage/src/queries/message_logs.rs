// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log records, keyed by the user's conversation id.
//!
//! An append writes a record holding only the new activity, replacing any
//! earlier record for the same conversation id. Readers therefore see the
//! most recent activity per conversation, not the full history.

use chrono::Utc;
use tandem_core::{Activity, ConversationReference, MessageLogEntry, TandemError};

use crate::database::{Database, TxResult, domain_try, map_tr_err};
use crate::records::{self, Table, decode_all, encode};

pub async fn append(
    db: &Database,
    partition: &str,
    user: &ConversationReference,
    activity: &Activity,
) -> Result<(), TandemError> {
    let key = user.conversation_id.clone();
    let entry = MessageLogEntry {
        user: user.clone(),
        messages: vec![activity.clone()],
    };
    let body = encode(&key, &entry)?;
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| {
            records::put(conn, Table::MessageLogs, &partition, &key, &body, Utc::now())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list(db: &Database, partition: &str) -> Result<Vec<MessageLogEntry>, TandemError> {
    let partition = partition.to_string();
    let rows = db
        .connection()
        .call(move |conn| records::load_all(conn, Table::MessageLogs, &partition))
        .await
        .map_err(map_tr_err)?;
    decode_all(&rows)
}

/// The most recently written entry whose user loosely matches `user`.
pub async fn get(
    db: &Database,
    partition: &str,
    user: &ConversationReference,
) -> Result<Option<MessageLogEntry>, TandemError> {
    let entries = list(db, partition).await?;
    Ok(entries
        .into_iter()
        .rev()
        .find(|entry| entry.user.matches_loose(user)))
}

/// Delete every entry of `user`. Returns whether anything was removed.
pub async fn delete(
    db: &Database,
    partition: &str,
    user: &ConversationReference,
) -> Result<bool, TandemError> {
    let user = user.clone();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| -> TxResult<bool> {
            let tx = conn.transaction()?;
            let rows = records::load_all(&tx, Table::MessageLogs, &partition)?;
            let mut removed = false;
            for row in &rows {
                let entry: MessageLogEntry = domain_try!(row.decode());
                if entry.user.matches_loose(&user) {
                    removed |= records::delete(&tx, Table::MessageLogs, &partition, &row.row_key)?;
                }
            }
            tx.commit()?;
            Ok(Ok(removed))
        })
        .await
        .map_err(map_tr_err)?
}
