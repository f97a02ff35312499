// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rollcall-core: Shared library for the rollcall live attendance client
//!
//! This crate provides the data model, wire protocol and the state
//! reconciler that merges REST snapshots with push events into one view.
//! Nothing in here performs I/O.

pub mod clock;
pub mod error;
pub mod event;
pub mod listeners;
pub mod merge;
pub mod protocol;
pub mod reconciler;
pub mod status;
pub mod view;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use event::{AttendanceEvent, EventId, EventKind};
pub use listeners::{Listeners, SubscriptionHandle};
pub use protocol::PushMessage;
pub use reconciler::StateReconciler;
pub use status::{HealthReport, StatusSummary};
pub use view::LiveView;
