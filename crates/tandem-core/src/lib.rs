// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tandem hand-off router.
//!
//! This crate provides the error taxonomy, the identity model, the activity
//! and routing-state types, and the adapter traits that storage backends
//! and transports implement.

pub mod error;
pub mod identity;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TandemError;
pub use identity::ConversationReference;
pub use types::{
    Activity, ActivityKind, AdapterType, ChannelAccount, Connection, ConnectionRequest,
    HealthStatus, MessageLogEntry, Payload,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    Clock, DeliveryChannel, MessageLogStore, PluginAdapter, RoutingStore, SystemClock,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tandem_error_has_routing_taxonomy() {
        let _requested = TandemError::AlreadyRequested { key: "webchat|u1".into() };
        let _connected = TandemError::AlreadyConnected { key: "webchat|u1".into() };
        let _self = TandemError::SelfConnection { key: "webchat|u1".into() };
        let _not_found = TandemError::RequestNotFound { key: "webchat|u1".into() };
        let _no_agg = TandemError::NoAggregationChannel;
        let _not_allowed = TandemError::ChannelNotAllowed { channel: "sms".into() };
        let _delivery = TandemError::DeliveryFailed {
            recipient: "webchat:u1@c1".into(),
            message: "test".into(),
            source: None,
        };
        let _config = TandemError::Config("test".into());
        let _internal = TandemError::Internal("test".into());
    }

    #[test]
    fn only_store_failures_are_retryable() {
        let store = TandemError::store(std::io::Error::other("disk"));
        assert!(store.is_retryable());
        assert!(!TandemError::NoAggregationChannel.is_retryable());
        assert!(
            !TandemError::DeliveryFailed {
                recipient: "x".into(),
                message: "y".into(),
                source: None,
            }
            .is_retryable()
        );
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        for variant in [
            AdapterType::RoutingStore,
            AdapterType::MessageLog,
            AdapterType::Delivery,
        ] {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(variant, parsed);
        }
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_routing_store<T: RoutingStore>() {}
        fn _assert_message_log<T: MessageLogStore>() {}
        fn _assert_delivery<T: DeliveryChannel>() {}
        fn _assert_clock<T: Clock>() {}
    }
}
