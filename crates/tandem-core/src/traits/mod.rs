// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Tandem routing engine.
//!
//! Backends extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod clock;
pub mod message_log;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::DeliveryChannel;
pub use clock::{Clock, SystemClock};
pub use message_log::MessageLogStore;
pub use storage::RoutingStore;
