// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tandem integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic tests without a real transport.
//!
//! # Components
//!
//! - [`MockDelivery`] - Delivery channel that captures payloads and can fail on demand
//! - [`ManualClock`] - Clock that only moves when a test advances it
//! - [`ActivityBuilder`] - Inbound activity construction
//! - [`TestHarness`] - The full hand-off pipeline over either backend

pub mod activity;
pub mod clock;
pub mod harness;
pub mod mock_delivery;

pub use activity::ActivityBuilder;
pub use clock::ManualClock;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_delivery::{Delivery, MockDelivery};
