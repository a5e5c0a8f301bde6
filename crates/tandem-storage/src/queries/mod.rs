// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the routing tables and the message log.
//!
//! Each function takes the shared [`Database`](crate::Database) and the
//! partition key of the deployment.

pub mod aggregation_channels;
pub mod connections;
pub mod message_logs;
pub mod references;
pub mod requests;
