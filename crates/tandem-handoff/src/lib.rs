// SPDX-FileCopyrightText: 2026 Tandem Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hand-off middleware for the Tandem router.
//!
//! [`HandoffMiddleware`] sits in front of a bot and decides, per turn,
//! whether the router consumes it (relay, agent command, hand-off request)
//! or the bot should answer it.

pub mod commands;
pub mod middleware;
pub mod notify;
pub mod trigger;

pub use commands::{Command, CommandHandler, CommandName};
pub use middleware::{Disposition, HandoffMiddleware};
pub use notify::Notifier;
pub use trigger::{HandoffTrigger, KeywordTrigger};
