// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing engine for the Tandem hand-off router.
//!
//! - [`MessageRouter`]: relays between connected conversations and owns the
//!   request/connection lifecycle.
//! - [`ConnectionRequestPolicy`]: pure gate deciding whether a request may be opened.
//! - [`TimeoutSweeper`]: evicts idle connections once per inbound turn.

pub mod outcome;
pub mod policy;
pub mod router;
pub mod sweeper;

pub use outcome::{AggregationChange, RejectReason, RoutingOutcome};
pub use policy::{ConnectionRequestPolicy, PolicyDecision};
pub use router::MessageRouter;
pub use sweeper::{SweepReport, TimeoutSweeper};
