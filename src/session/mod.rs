// SPDX-License-Identifier: GPL-3.0-only

//! Capture session state
//!
//! - [`orchestrator`]: The countdown state machine deciding when to capture

pub mod orchestrator;

pub use orchestrator::{CaptureOrchestrator, CaptureState, TickOutcome};
