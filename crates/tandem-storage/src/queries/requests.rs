// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending connection requests, keyed by the requestor's loose identity.

use chrono::{DateTime, Utc};
use tandem_core::{ConnectionRequest, ConversationReference, TandemError};

use crate::database::{Database, TxResult, domain_try, map_tr_err};
use crate::queries::connections;
use crate::records::{self, Table, decode_all, encode};

/// Open a request for `requestor` unless it already has one or is connected.
///
/// The checks and the insert share one transaction on the writer thread.
pub async fn create(
    db: &Database,
    partition: &str,
    requestor: &ConversationReference,
    reject_if_no_aggregation_channel: bool,
    now: DateTime<Utc>,
) -> Result<ConnectionRequest, TandemError> {
    let request = ConnectionRequest {
        requestor: requestor.clone(),
        created_at: now,
        reject_if_no_aggregation_channel,
    };
    let key = requestor.loose_key();
    let body = encode(&key, &request)?;
    let partition = partition.to_string();

    db.connection()
        .call(move |conn| -> TxResult<ConnectionRequest> {
            let tx = conn.transaction()?;
            if records::load_one(&tx, Table::Requests, &partition, &key)?.is_some() {
                return Ok(Err(TandemError::AlreadyRequested { key }));
            }
            let active = domain_try!(connections::load_all_in(&tx, &partition)?);
            if active.iter().any(|c| c.involves(&request.requestor)) {
                return Ok(Err(TandemError::AlreadyConnected { key }));
            }
            records::insert_new(&tx, Table::Requests, &partition, &key, &body, now)?;
            tx.commit()?;
            Ok(Ok(request))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn list(db: &Database, partition: &str) -> Result<Vec<ConnectionRequest>, TandemError> {
    let partition = partition.to_string();
    let rows = db
        .connection()
        .call(move |conn| records::load_all(conn, Table::Requests, &partition))
        .await
        .map_err(map_tr_err)?;
    decode_all(&rows)
}

pub async fn find(
    db: &Database,
    partition: &str,
    requestor: &ConversationReference,
) -> Result<Option<ConnectionRequest>, TandemError> {
    let key = requestor.loose_key();
    let partition = partition.to_string();
    let row = db
        .connection()
        .call(move |conn| records::load_one(conn, Table::Requests, &partition, &key))
        .await
        .map_err(map_tr_err)?;
    row.map(|r| r.decode()).transpose()
}

/// Remove the request of `requestor`. Returns whether one existed.
pub async fn remove(
    db: &Database,
    partition: &str,
    requestor: &ConversationReference,
) -> Result<bool, TandemError> {
    let key = requestor.loose_key();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| records::delete(conn, Table::Requests, &partition, &key))
        .await
        .map_err(map_tr_err)
}
