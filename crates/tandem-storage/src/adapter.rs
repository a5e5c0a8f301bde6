// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of the routing store and message log traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use tandem_core::{
    Activity, AdapterType, Connection, ConnectionRequest, ConversationReference, HealthStatus,
    MessageLogEntry, MessageLogStore, PluginAdapter, RoutingStore, TandemError,
};

use crate::database::Database;
use crate::queries;

/// Durable routing store over keyed SQLite records.
///
/// Every record lives under one partition key, so several deployments can
/// share a database file.
pub struct SqliteRoutingStore {
    db: Database,
    partition: String,
}

impl SqliteRoutingStore {
    pub fn new(db: Database, partition: impl Into<String>) -> Self {
        Self {
            db,
            partition: partition.into(),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl PluginAdapter for SqliteRoutingStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::RoutingStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), TandemError> {
        self.db.checkpoint().await?;
        debug!(path = %self.db.path(), "sqlite routing store shut down");
        Ok(())
    }
}

#[async_trait]
impl RoutingStore for SqliteRoutingStore {
    async fn upsert_reference(
        &self,
        reference: &ConversationReference,
    ) -> Result<(), TandemError> {
        queries::references::upsert(&self.db, &self.partition, reference).await
    }

    async fn list_references(&self) -> Result<Vec<ConversationReference>, TandemError> {
        queries::references::list(&self.db, &self.partition).await
    }

    // --- Aggregation channels ---

    async fn add_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        queries::aggregation_channels::add(&self.db, &self.partition, reference).await
    }

    async fn remove_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        queries::aggregation_channels::remove(&self.db, &self.partition, reference).await
    }

    async fn list_aggregation_channels(&self) -> Result<Vec<ConversationReference>, TandemError> {
        queries::aggregation_channels::list(&self.db, &self.partition).await
    }

    // --- Connection requests ---

    async fn create_request(
        &self,
        requestor: &ConversationReference,
        reject_if_no_aggregation_channel: bool,
        now: DateTime<Utc>,
    ) -> Result<ConnectionRequest, TandemError> {
        queries::requests::create(
            &self.db,
            &self.partition,
            requestor,
            reject_if_no_aggregation_channel,
            now,
        )
        .await
    }

    async fn list_requests(&self) -> Result<Vec<ConnectionRequest>, TandemError> {
        queries::requests::list(&self.db, &self.partition).await
    }

    async fn find_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<Option<ConnectionRequest>, TandemError> {
        queries::requests::find(&self.db, &self.partition, requestor).await
    }

    async fn remove_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<bool, TandemError> {
        queries::requests::remove(&self.db, &self.partition, requestor).await
    }

    // --- Connections ---

    async fn create_connection(
        &self,
        reference1: &ConversationReference,
        reference2: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError> {
        queries::connections::create(&self.db, &self.partition, reference1, reference2, now).await
    }

    async fn accept_request(
        &self,
        requestor: &ConversationReference,
        acceptor: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError> {
        queries::connections::accept(&self.db, &self.partition, requestor, acceptor, now).await
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, TandemError> {
        queries::connections::list(&self.db, &self.partition).await
    }

    async fn find_connection(
        &self,
        reference: &ConversationReference,
    ) -> Result<Option<Connection>, TandemError> {
        queries::connections::find(&self.db, &self.partition, reference).await
    }

    async fn remove_connection(&self, connection: &Connection) -> Result<bool, TandemError> {
        queries::connections::remove(&self.db, &self.partition, &connection.id).await
    }

    async fn touch_connection(
        &self,
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Option<Connection>, TandemError> {
        queries::connections::touch(&self.db, &self.partition, &connection.id, now).await
    }

    async fn evict_if_idle(
        &self,
        connection: &Connection,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, TandemError> {
        queries::connections::evict_if_idle(&self.db, &self.partition, &connection.id, cutoff)
            .await
    }
}

/// Durable message log. See [`queries::message_logs`] for append semantics.
pub struct SqliteMessageLog {
    db: Database,
    partition: String,
}

impl SqliteMessageLog {
    pub fn new(db: Database, partition: impl Into<String>) -> Self {
        Self {
            db,
            partition: partition.into(),
        }
    }
}

#[async_trait]
impl PluginAdapter for SqliteMessageLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MessageLog
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        match self.db.ping().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl MessageLogStore for SqliteMessageLog {
    async fn append(
        &self,
        user: &ConversationReference,
        activity: &Activity,
    ) -> Result<(), TandemError> {
        queries::message_logs::append(&self.db, &self.partition, user, activity).await
    }

    async fn get(
        &self,
        user: &ConversationReference,
    ) -> Result<Option<MessageLogEntry>, TandemError> {
        queries::message_logs::get(&self.db, &self.partition, user).await
    }

    async fn list(&self) -> Result<Vec<MessageLogEntry>, TandemError> {
        queries::message_logs::list(&self.db, &self.partition).await
    }

    async fn delete(&self, user: &ConversationReference) -> Result<(), TandemError> {
        let removed = queries::message_logs::delete(&self.db, &self.partition, user).await?;
        debug!(user = %user, removed, "message log delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tandem_core::ChannelAccount;
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn user() -> ConversationReference {
        ConversationReference::new("webchat", "u1", "c1")
    }

    fn agent() -> ConversationReference {
        ConversationReference::new("msteams", "a1", "agents")
    }

    async fn open(dir: &tempfile::TempDir) -> Database {
        let path = dir.path().join("routing.db");
        Database::open(path.to_str().unwrap(), true).await.unwrap()
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = SqliteRoutingStore::new(open(&dir).await, "tandem");
            store.create_request(&user(), false, at(0)).await.unwrap();
            store.add_aggregation_channel(&agent()).await.unwrap();
            store.shutdown().await.unwrap();
        }

        let store = SqliteRoutingStore::new(open(&dir).await, "tandem");
        let requests = store.list_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].requestor, user());
        assert_eq!(requests[0].created_at, at(0));
        assert_eq!(store.list_aggregation_channels().await.unwrap(), vec![agent()]);
    }

    #[tokio::test]
    async fn partitions_do_not_see_each_other() {
        let dir = tempdir().unwrap();
        let db = open(&dir).await;
        let blue = SqliteRoutingStore::new(db.clone(), "blue");
        let green = SqliteRoutingStore::new(db, "green");

        blue.create_connection(&user(), &agent(), at(0)).await.unwrap();
        assert!(green.find_connection(&user()).await.unwrap().is_none());
        green.create_request(&user(), false, at(1)).await.unwrap();
    }

    #[tokio::test]
    async fn durable_append_replaces_per_conversation() {
        let dir = tempdir().unwrap();
        let log = SqliteMessageLog::new(open(&dir).await, "tandem");
        let message = |text: &str| {
            Activity::message(
                "webchat",
                "c1",
                ChannelAccount::new("u1"),
                ChannelAccount::new("bot"),
                text,
            )
        };

        log.append(&user(), &message("first")).await.unwrap();
        log.append(&user(), &message("second")).await.unwrap();

        let entry = log.get(&user()).await.unwrap().unwrap();
        assert_eq!(entry.messages.len(), 1);
        assert_eq!(entry.messages[0].text(), "second");
        assert_eq!(log.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn durable_delete_removes_all_conversations_of_user() {
        let dir = tempdir().unwrap();
        let log = SqliteMessageLog::new(open(&dir).await, "tandem");
        let other_thread = ConversationReference::new("webchat", "u1", "c2");
        let activity = Activity::message(
            "webchat",
            "c1",
            ChannelAccount::new("u1"),
            ChannelAccount::new("bot"),
            "hi",
        );
        log.append(&user(), &activity).await.unwrap();
        log.append(&other_thread, &activity).await.unwrap();
        assert_eq!(log.list().await.unwrap().len(), 2);

        log.delete(&user()).await.unwrap();
        assert!(log.list().await.unwrap().is_empty());
        log.delete(&user()).await.unwrap();
    }

    #[tokio::test]
    async fn health_check_reports_healthy() {
        let dir = tempdir().unwrap();
        let store = SqliteRoutingStore::new(open(&dir).await, "tandem");
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }
}
