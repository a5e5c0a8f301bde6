// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing data store trait for in-memory and durable backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TandemError;
use crate::identity::ConversationReference;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Connection, ConnectionRequest};

/// Persistence for known references, aggregation channels, pending
/// connection requests, and active connections.
///
/// The store only stores and queries; policy lives in the router. All
/// lookups by reference use loose identity unless stated otherwise.
///
/// Invariant upheld by every implementation: a reference (loose match)
/// appears in at most one open request or at most one connection, never
/// both. The compound check-then-act operations ([`create_request`],
/// [`create_connection`], [`accept_request`]) are atomic with respect to
/// concurrent callers.
///
/// [`create_request`]: RoutingStore::create_request
/// [`create_connection`]: RoutingStore::create_connection
/// [`accept_request`]: RoutingStore::accept_request
#[async_trait]
pub trait RoutingStore: PluginAdapter {
    /// Records or refreshes a known reference (strict match). Idempotent.
    async fn upsert_reference(&self, reference: &ConversationReference)
    -> Result<(), TandemError>;

    /// Returns all known references.
    async fn list_references(&self) -> Result<Vec<ConversationReference>, TandemError>;

    // --- Aggregation channels ---

    /// Registers an aggregation channel. Returns `false` if already registered (strict match).
    async fn add_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError>;

    /// Unregisters an aggregation channel. Returns `false` if it was not registered.
    async fn remove_aggregation_channel(
        &self,
        reference: &ConversationReference,
    ) -> Result<bool, TandemError>;

    /// Returns all registered aggregation channels.
    async fn list_aggregation_channels(&self) -> Result<Vec<ConversationReference>, TandemError>;

    // --- Connection requests ---

    /// Opens a request for `requestor`.
    ///
    /// Fails with [`TandemError::AlreadyRequested`] if the requestor already
    /// has an open request, or [`TandemError::AlreadyConnected`] if it is
    /// part of a connection.
    async fn create_request(
        &self,
        requestor: &ConversationReference,
        reject_if_no_aggregation_channel: bool,
        now: DateTime<Utc>,
    ) -> Result<ConnectionRequest, TandemError>;

    /// Returns all open requests in no particular order.
    async fn list_requests(&self) -> Result<Vec<ConnectionRequest>, TandemError>;

    /// Returns the open request of `requestor`, if any.
    async fn find_request(
        &self,
        requestor: &ConversationReference,
    ) -> Result<Option<ConnectionRequest>, TandemError>;

    /// Removes the open request of `requestor`. Returns whether one existed.
    async fn remove_request(&self, requestor: &ConversationReference)
    -> Result<bool, TandemError>;

    // --- Connections ---

    /// Pairs two references.
    ///
    /// Fails with [`TandemError::SelfConnection`] if both legs are the same
    /// user (loose match), [`TandemError::AlreadyConnected`] if either leg is
    /// already connected, or [`TandemError::AlreadyRequested`] if either leg
    /// has an open request.
    async fn create_connection(
        &self,
        reference1: &ConversationReference,
        reference2: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError>;

    /// Removes the request of `requestor` and connects it with `acceptor` in one step.
    ///
    /// On failure the store is unchanged. Errors:
    /// [`TandemError::RequestNotFound`], [`TandemError::SelfConnection`],
    /// [`TandemError::AlreadyConnected`],
    /// [`TandemError::AlreadyRequested`] (the acceptor has its own open request).
    async fn accept_request(
        &self,
        requestor: &ConversationReference,
        acceptor: &ConversationReference,
        now: DateTime<Utc>,
    ) -> Result<Connection, TandemError>;

    /// Returns all active connections.
    async fn list_connections(&self) -> Result<Vec<Connection>, TandemError>;

    /// Returns the connection with `reference` on either leg.
    async fn find_connection(
        &self,
        reference: &ConversationReference,
    ) -> Result<Option<Connection>, TandemError>;

    /// Removes a connection by id. Returns whether it existed.
    async fn remove_connection(&self, connection: &Connection) -> Result<bool, TandemError>;

    /// Moves the last-activity timestamp forward to `now`.
    ///
    /// The stored value never decreases. Returns the updated connection, or
    /// `None` if the connection no longer exists.
    async fn touch_connection(
        &self,
        connection: &Connection,
        now: DateTime<Utc>,
    ) -> Result<Option<Connection>, TandemError>;

    /// Removes the connection only if its stored last activity is at or
    /// before `cutoff`. Returns whether it was removed.
    async fn evict_if_idle(
        &self,
        connection: &Connection,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, TandemError>;
}
