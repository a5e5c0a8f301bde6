// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing store and message log backends for the Tandem hand-off router.
//!
//! Two backends implement the same traits:
//!
//! - **memory**: a mutex-guarded snapshot of all routing state. Selected when
//!   no connection string is configured; state is lost on restart.
//! - **sqlite**: keyed JSON records in WAL-mode SQLite, with embedded
//!   migrations and a single-writer model via `tokio-rusqlite`. Compound
//!   operations run in one transaction on the writer thread.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod queries;
pub mod records;

use std::sync::Arc;

use tandem_config::StorageConfig;
use tandem_core::{MessageLogStore, RoutingStore, TandemError};
use tracing::{info, warn};

pub use adapter::{SqliteMessageLog, SqliteRoutingStore};
pub use database::Database;
pub use memory::{InMemoryMessageLog, InMemoryRoutingStore};

/// The routing store and message log selected by configuration.
#[derive(Clone)]
pub struct Backends {
    pub routing: Arc<dyn RoutingStore>,
    pub message_log: Arc<dyn MessageLogStore>,
}

impl Backends {
    /// Fresh in-memory backends.
    pub fn in_memory() -> Self {
        Self {
            routing: Arc::new(InMemoryRoutingStore::new()),
            message_log: Arc::new(InMemoryMessageLog::new()),
        }
    }

    /// Shut down both adapters, returning the first error.
    pub async fn shutdown(&self) -> Result<(), TandemError> {
        let routing = self.routing.shutdown().await;
        let log = self.message_log.shutdown().await;
        routing.and(log)
    }
}

/// Open the backends named by `config`.
///
/// A configured connection string selects SQLite; otherwise the in-memory
/// backend is used and a warning is logged.
pub async fn open_backends(config: &StorageConfig) -> Result<Backends, TandemError> {
    let path = match config.connection_string.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => path,
        _ => {
            warn!("no storage connection string configured, using in-memory routing store");
            return Ok(Backends::in_memory());
        }
    };

    let db = Database::open(path, config.wal_mode).await?;
    info!(
        path,
        partition = %config.partition_key,
        "using sqlite routing store"
    );
    Ok(Backends {
        routing: Arc::new(SqliteRoutingStore::new(
            db.clone(),
            config.partition_key.clone(),
        )),
        message_log: Arc::new(SqliteMessageLog::new(db, config.partition_key.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_connection_string_selects_memory() {
        let backends = open_backends(&StorageConfig::default()).await.unwrap();
        assert_eq!(backends.routing.name(), "memory");
        assert_eq!(backends.message_log.name(), "memory");
    }

    #[tokio::test]
    async fn connection_string_selects_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            connection_string: Some(dir.path().join("t.db").display().to_string()),
            ..StorageConfig::default()
        };
        let backends = open_backends(&config).await.unwrap();
        assert_eq!(backends.routing.name(), "sqlite");
        assert_eq!(backends.message_log.name(), "sqlite");
        backends.shutdown().await.unwrap();
    }
}
