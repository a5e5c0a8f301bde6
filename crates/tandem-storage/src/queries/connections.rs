// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Active connections, keyed by connection id.
//!
//! Legs are matched loosely, so membership checks decode every connection of
//! the partition. Connection counts are bounded by the number of agents.

use chrono::{DateTime, Utc};
use tandem_core::{Connection, ConversationReference, TandemError};

use crate::database::{Database, TxResult, domain_try, map_tr_err};
use crate::records::{self, Table, decode_all, encode};

/// Decode all connections of a partition on the writer thread.
pub(crate) fn load_all_in(conn: &rusqlite::Connection, partition: &str) -> TxResult<Vec<Connection>> {
    let rows = records::load_all(conn, Table::Connections, partition)?;
    Ok(decode_all(&rows))
}

/// Fail if any leg is connected or has an open request.
fn check_free(
    conn: &rusqlite::Connection,
    partition: &str,
    legs: &[&ConversationReference],
) -> TxResult<()> {
    let active = domain_try!(load_all_in(conn, partition)?);
    for leg in legs {
        if active.iter().any(|c| c.involves(leg)) {
            return Ok(Err(TandemError::AlreadyConnected {
                key: leg.loose_key(),
            }));
        }
    }
    for leg in legs {
        let key = leg.loose_key();
        if records::load_one(conn, Table::Requests, partition, &key)?.is_some() {
            return Ok(Err(TandemError::AlreadyRequested { key }));
        }
    }
    Ok(Ok(()))
}

fn insert(conn: &rusqlite::Connection, partition: &str, connection: &Connection) -> TxResult<()> {
    let body = domain_try!(encode(&connection.id, connection));
    records::put(
        conn,
        Table::Connections,
        partition,
        &connection.id,
        &body,
        connection.last_activity,
    )?;
    Ok(Ok(()))
}

/// Pair two references in one transaction.
pub async fn create(
    db: &Database,
    partition: &str,
    reference1: &ConversationReference,
    reference2: &ConversationReference,
    now: DateTime<Utc>,
) -> Result<Connection, TandemError> {
    if reference1.matches_loose(reference2) {
        return Err(TandemError::SelfConnection {
            key: reference1.loose_key(),
        });
    }
    let connection = Connection::new(reference1.clone(), reference2.clone(), now);
    let partition = partition.to_string();

    db.connection()
        .call(move |conn| -> TxResult<Connection> {
            let tx = conn.transaction()?;
            domain_try!(check_free(
                &tx,
                &partition,
                &[&connection.reference1, &connection.reference2]
            )?);
            domain_try!(insert(&tx, &partition, &connection)?);
            tx.commit()?;
            Ok(Ok(connection))
        })
        .await
        .map_err(map_tr_err)?
}

/// Promote the open request of `requestor` to a connection with `acceptor`.
///
/// The stored request's reference becomes leg one, so replies reach the
/// conversation the requestor asked from.
pub async fn accept(
    db: &Database,
    partition: &str,
    requestor: &ConversationReference,
    acceptor: &ConversationReference,
    now: DateTime<Utc>,
) -> Result<Connection, TandemError> {
    let requestor_key = requestor.loose_key();
    let acceptor = acceptor.clone();
    let partition = partition.to_string();

    db.connection()
        .call(move |conn| -> TxResult<Connection> {
            let tx = conn.transaction()?;
            let Some(row) = records::load_one(&tx, Table::Requests, &partition, &requestor_key)?
            else {
                return Ok(Err(TandemError::RequestNotFound { key: requestor_key }));
            };
            let request: tandem_core::ConnectionRequest = domain_try!(row.decode());
            if acceptor.matches_loose(&request.requestor) {
                return Ok(Err(TandemError::SelfConnection {
                    key: acceptor.loose_key(),
                }));
            }

            let active = domain_try!(load_all_in(&tx, &partition)?);
            for leg in [&acceptor, &request.requestor] {
                if active.iter().any(|c| c.involves(leg)) {
                    return Ok(Err(TandemError::AlreadyConnected {
                        key: leg.loose_key(),
                    }));
                }
            }
            let acceptor_key = acceptor.loose_key();
            if records::load_one(&tx, Table::Requests, &partition, &acceptor_key)?.is_some() {
                return Ok(Err(TandemError::AlreadyRequested { key: acceptor_key }));
            }

            records::delete(&tx, Table::Requests, &partition, &requestor_key)?;
            let connection = Connection::new(request.requestor, acceptor, now);
            domain_try!(insert(&tx, &partition, &connection)?);
            tx.commit()?;
            Ok(Ok(connection))
        })
        .await
        .map_err(map_tr_err)?
}

pub async fn list(db: &Database, partition: &str) -> Result<Vec<Connection>, TandemError> {
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| load_all_in(conn, &partition))
        .await
        .map_err(map_tr_err)?
}

/// The connection with `reference` on either leg (loose match).
pub async fn find(
    db: &Database,
    partition: &str,
    reference: &ConversationReference,
) -> Result<Option<Connection>, TandemError> {
    let all = list(db, partition).await?;
    Ok(all.into_iter().find(|c| c.involves(reference)))
}

pub async fn remove(db: &Database, partition: &str, id: &str) -> Result<bool, TandemError> {
    let id = id.to_string();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| records::delete(conn, Table::Connections, &partition, &id))
        .await
        .map_err(map_tr_err)
}

/// Move `last_activity` forward to `now`; never backwards.
pub async fn touch(
    db: &Database,
    partition: &str,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Connection>, TandemError> {
    let id = id.to_string();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| -> TxResult<Option<Connection>> {
            let tx = conn.transaction()?;
            let Some(row) = records::load_one(&tx, Table::Connections, &partition, &id)? else {
                return Ok(Ok(None));
            };
            let mut connection: Connection = domain_try!(row.decode());
            if now > connection.last_activity {
                connection.last_activity = now;
                domain_try!(insert(&tx, &partition, &connection)?);
                tx.commit()?;
            }
            Ok(Ok(Some(connection)))
        })
        .await
        .map_err(map_tr_err)?
}

/// Delete the connection only if its stored last activity is at or before `cutoff`.
pub async fn evict_if_idle(
    db: &Database,
    partition: &str,
    id: &str,
    cutoff: DateTime<Utc>,
) -> Result<bool, TandemError> {
    let id = id.to_string();
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| -> TxResult<bool> {
            let tx = conn.transaction()?;
            let Some(row) = records::load_one(&tx, Table::Connections, &partition, &id)? else {
                return Ok(Ok(false));
            };
            let connection: Connection = domain_try!(row.decode());
            if connection.last_activity > cutoff {
                return Ok(Ok(false));
            }
            records::delete(&tx, Table::Connections, &partition, &id)?;
            tx.commit()?;
            Ok(Ok(true))
        })
        .await
        .map_err(map_tr_err)?
}
