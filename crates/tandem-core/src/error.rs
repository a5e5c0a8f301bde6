// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tandem hand-off router.

use thiserror::Error;

/// The primary error type used across all Tandem adapter traits and routing operations.
#[derive(Debug, Error)]
pub enum TandemError {
    /// The requestor already has an open connection request.
    #[error("connection already requested by {key}")]
    AlreadyRequested { key: String },

    /// One of the references is already part of an active connection.
    #[error("{key} is already connected")]
    AlreadyConnected { key: String },

    /// Both legs of a connection would be the same user.
    #[error("{key} cannot be connected to itself")]
    SelfConnection { key: String },

    /// No pending connection request matches the given requestor.
    #[error("no pending connection request from {key}")]
    RequestNotFound { key: String },

    /// No aggregation channel is registered to receive connection requests.
    #[error("no aggregation channel available")]
    NoAggregationChannel,

    /// The requestor's channel is configured to never hand off to a human.
    #[error("channel `{channel}` does not allow direct conversations")]
    ChannelNotAllowed { channel: String },

    /// Storage backend failure (connection, I/O, locked database). Retryable.
    #[error("store unavailable: {source}")]
    StoreUnavailable {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Outbound delivery to a conversation reference failed or was cancelled.
    #[error("delivery to {recipient} failed: {message}")]
    DeliveryFailed {
        recipient: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored record body could not be encoded or decoded.
    #[error("record `{key}` could not be (de)serialized: {source}")]
    Serialization {
        key: String,
        source: serde_json::Error,
    },

    /// Configuration errors detected after loading.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TandemError {
    /// Whether the caller may retry the failed operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TandemError::StoreUnavailable { .. })
    }

    /// Build a [`TandemError::StoreUnavailable`] from any backend error.
    pub fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TandemError::StoreUnavailable {
            source: Box::new(err),
        }
    }
}
