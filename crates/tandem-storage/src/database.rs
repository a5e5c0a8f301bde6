// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes: the atomic
//! check-then-act operations of the routing store rely on it.

use std::path::Path;

use tandem_core::TandemError;
use tracing::{debug, warn};

use crate::migrations;

/// Result of a closure run on the writer thread.
///
/// SQL failures travel in the outer `Result` (and end up as
/// [`TandemError::StoreUnavailable`]); routing failures such as
/// `AlreadyConnected` travel in the inner one so the closure can abort its
/// transaction and still report them verbatim.
pub(crate) type TxResult<T> = Result<Result<T, TandemError>, rusqlite::Error>;

/// Unwrap an inner routing result, returning early from a [`TxResult`] closure.
///
/// Returning drops any open transaction, which rolls it back.
macro_rules! domain_try {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => return Ok(Err(err)),
        }
    };
}
pub(crate) use domain_try;

/// Handle to the SQLite database shared by the routing store and message log.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
    wal_mode: bool,
}

impl Database {
    /// Open (creating if needed) the database at `path` and run migrations.
    ///
    /// A migration failure caused by tables that already exist is logged and
    /// ignored; any other failure is fatal.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, TandemError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(TandemError::store)?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(TandemError::store)?;

        let migrated = conn
            .call(move |conn| -> Result<Result<(), String>, rusqlite::Error> {
                let journal = if wal_mode { "WAL" } else { "DELETE" };
                conn.execute_batch(&format!(
                    "PRAGMA journal_mode = {journal};
                     PRAGMA synchronous = NORMAL;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA foreign_keys = ON;"
                ))?;
                Ok(migrations::run_migrations(conn).map_err(|e| e.to_string()))
            })
            .await
            .map_err(map_tr_err)?;

        if let Err(message) = migrated {
            if message.contains("already exists") {
                warn!(path, error = %message, "storage tables already exist, continuing");
            } else {
                return Err(TandemError::StoreUnavailable {
                    source: format!("migration failed: {message}").into(),
                });
            }
        }

        debug!(path, wal_mode, "database opened");
        Ok(Self {
            conn,
            path: path.to_string(),
            wal_mode,
        })
    }

    /// The tokio-rusqlite connection. All queries go through it.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), TandemError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Checkpoint the WAL so the database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), TandemError> {
        if !self.wal_mode {
            return Ok(());
        }
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(path = %self.path, "WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite failure to the retryable store error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TandemError {
    TandemError::store(e)
}
