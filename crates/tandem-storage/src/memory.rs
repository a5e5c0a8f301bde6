// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory routing store and message log.
//!
//! All routing state sits behind one mutex, so each operation, including the
//! compound check-then-act ones, observes and mutates a consistent snapshot.
//! Nothing survives a restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use tandem_core::{
    Activity, AdapterType, Connection, ConnectionRequest, ConversationReference, HealthStatus,
    MessageLogEntry, MessageLogStore, PluginAdapter, RoutingStore, TandemError,
};

#[derive(Debug, Default)]
struct RoutingState {
    references: Vec<ConversationReference>,
    aggregation_channels: Vec<ConversationReference>,
    requests: Vec<ConnectionRequest>,
    connections: Vec<Connection>,
}

impl RoutingState {
    fn request_of(&self, reference: &ConversationReference) -> Option<usize> {
        self.requests
            .iter()
            .position(|r| r.requestor.matches_loose(reference))
    }

    fn connection_of(&self, reference: &ConversationReference) -> Option<usize> {
        self.connections.iter().position(|c| c.involves(reference))
    }

    fn connection_by_id(&self, id: &str) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    fn ensure_free(&self, legs: &[&ConversationReference]) -> Result<(), TandemError> {
        if let Some(leg) = legs.iter().find(|leg| self.connection_of(leg).is_some()) {
            return Err(TandemError::AlreadyConnected {
                key: leg.loose_key(),
            });
        }
        if let Some(leg) = legs.iter().find(|leg| self.request_of(leg).is_some()) {
            return Err(TandemError::AlreadyRequested {
                key: leg.loose_key(),
            });
        }
        Ok(())
    }
}

/// Routing store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRoutingStore {
    state: Mutex<RoutingState>,
}

impl InMemoryRoutingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryRoutingStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::RoutingStore
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(HealthStatus::Degraded(
            "in-memory store, routing state is lost on restart".into(),
        ))
    }
}

#[async_trait]
impl RoutingStore for InMemoryRoutingStore {
    async fn upsert_reference(
        &self,
        reference: &ConversationReference,
    ) -> Result<(), TandemError> {
        let mut state = self.state.lock().await;
        match state
            .references
            .iter_mut()
            .find(|known| known.matches_strict(reference))
        {
            Some(known) => *known = reference.clone(),
            None => state.references.push(reference.clone()),
        }
        Ok(())
    }

    async fn list_references(&self) -> Result<Vec<ConversationReference>, TandemError> {
        Ok(self.state.lock().await.references.clone())
    }

    async fn add_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        let mut state = self.state.lock().await;
        if state
            .aggregation_channels
            .iter()
            .any(|c| c.matches_strict(reference))
        {
            return Ok(false);
        }
        state.aggregation_channels.push(reference.clone());
        Ok(true)
    }

    async fn remove_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError> {
        let mut state = self.state.lock().await;
        let before = state.aggregation_channels.len();
        state
            .aggregation_channels
            .retain(|c| !c.matches_strict(reference));
        Ok(state.aggregation_channels.len() != before)
    }

    async fn list_aggregation_channels(&self) -> Result<Vec<ConversationReference>, TandemError> {
        Ok(self.state.lock().await.aggregation_channels.clone())
    }

    async fn create_request(
        &self,
        requestor: &ConversationReference,
        reject_if_no_aggregation_channel: bool,
        now: DateTime<Utc>,
    ) -> Result<ConnectionRequest, TandemError> {
        let mut state = self.state.lock().await;
        if state.request_of(requestor).is_some() {
            return Err(TandemError::AlreadyRequested {
                key: requestor.loose_key(),
            });
        }
        if state.connection_of(requestor).is_some() {
            return Err(TandemError::AlreadyConnected {
                key: requestor.loose_key(),
            });
        }
        let request = ConnectionRequest {
            requestor: requestor.clone(),
            created_at: now,
            reject_if_no_aggregation_channel,
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn list_requests(&self) -> Result<Vec<ConnectionRequest>, TandemError> {
        Ok(self.state.lock().await.requests.clone())
    }

    async fn find_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<Option<ConnectionRequest>, TandemError> {
        let state = self.state.lock().await;
        Ok(state.request_of(requestor).map(|i| state.requests[i].clone()))
    }

    async fn remove_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<bool, TandemError> {
        let mut state = self.state.lock().await;
        match state.request_of(requestor) {
            Some(i) => {
                state.requests.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_connection(
        &self,
        reference1: &ConversationReference,
        reference2: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError> {
        if reference1.matches_loose(reference2) {
            return Err(TandemError::SelfConnection {
                key: reference1.loose_key(),
            });
        }
        let mut state = self.state.lock().await;
        state.ensure_free(&[reference1, reference2])?;
        let connection = Connection::new(reference1.clone(), reference2.clone(), now);
        state.connections.push(connection.clone());
        Ok(connection)
    }

    async fn accept_request(
        &self,
        requestor: &ConversationReference,
        acceptor: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError> {
        let mut state = self.state.lock().await;
        let Some(index) = state.request_of(requestor) else {
            return Err(TandemError::RequestNotFound {
                key: requestor.loose_key(),
            });
        };
        let stored = state.requests[index].requestor.clone();
        if acceptor.matches_loose(&stored) {
            return Err(TandemError::SelfConnection {
                key: acceptor.loose_key(),
            });
        }
        for leg in [acceptor, &stored] {
            if state.connection_of(leg).is_some() {
                return Err(TandemError::AlreadyConnected {
                    key: leg.loose_key(),
                });
            }
        }
        if state.request_of(acceptor).is_some() {
            return Err(TandemError::AlreadyRequested {
                key: acceptor.loose_key(),
            });
        }

        state.requests.remove(index);
        let connection = Connection::new(stored, acceptor.clone(), now);
        state.connections.push(connection.clone());
        Ok(connection)
    }

    async fn list_connections(&self) -> Result<Vec<Connection>, TandemError> {
        Ok(self.state.lock().await.connections.clone())
    }

    async fn find_connection(
        &self,
        reference: &ConversationReference,
    ) -> Result<Option<Connection>, TandemError> {
        let state = self.state.lock().await;
        Ok(state
            .connection_of(reference)
            .map(|i| state.connections[i].clone()))
    }

    async fn remove_connection(&self, connection: &Connection) -> Result<bool, TandemError> {
        let mut state = self.state.lock().await;
        match state.connection_by_id(&connection.id) {
            Some(i) => {
                state.connections.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn touch_connection(
        &self,
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Option<Connection>, TandemError> {
        let mut state = self.state.lock().await;
        Ok(state.connection_by_id(&connection.id).map(|i| {
            let stored = &mut state.connections[i];
            stored.last_activity = stored.last_activity.max(now);
            stored.clone()
        }))
    }

    async fn evict_if_idle(
        &self,
        connection: &Connection,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, TandemError> {
        let mut state = self.state.lock().await;
        match state.connection_by_id(&connection.id) {
            Some(i) if state.connections[i].last_activity <= cutoff => {
                state.connections.remove(i);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Message log that appends in process memory.
///
/// Unlike the durable log, appends accumulate: one entry per user (loose
/// match) holding every logged activity in arrival order.
#[derive(Debug, Default)]
pub struct InMemoryMessageLog {
    entries: Mutex<Vec<MessageLogEntry>>,
}

impl InMemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PluginAdapter for InMemoryMessageLog {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::MessageLog
    }

    async fn health_check(&self) -> Result<HealthStatus, TandemError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl MessageLogStore for InMemoryMessageLog {
    async fn append(
        &self,
        user: &ConversationReference,
        activity: &Activity,
    ) -> Result<(), TandemError> {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|e| e.user.matches_loose(user)) {
            Some(entry) => entry.messages.push(activity.clone()),
            None => {
                let mut entry = MessageLogEntry::new(user.clone());
                entry.messages.push(activity.clone());
                entries.push(entry);
            }
        }
        Ok(())
    }

    async fn get(
        &self,
        user: &ConversationReference,
    ) -> Result<Option<MessageLogEntry>, TandemError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().find(|e| e.user.matches_loose(user)).cloned())
    }

    async fn list(&self) -> Result<Vec<MessageLogEntry>, TandemError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn delete(&self, user: &ConversationReference) -> Result<(), TandemError> {
        self.entries
            .lock()
            .await
            .retain(|e| !e.user.matches_loose(user));
        Ok(())
    }
}
