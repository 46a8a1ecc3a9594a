// SPDX-License-Identifier: GPL-3.0-only

//! Countdown state machine
//!
//! ```text
//!          start               tick (n > 1)
//!  Idle ─────────▶ CountingDown(n) ─────────▶ CountingDown(n-1)
//!   ▲  ▲                 │
//!   │  │ cancel*         │ tick (n == 1)
//!   │  └─────────────────┤
//!   │                    ▼
//!   │   failure     Capturing ──────▶ Captured(id)
//!   ├───────────────────┘    finish         │
//!   └───────────────────────────────────────┘
//!                  retake (deletes the photo)
//! ```
//!
//! `*` only when cancellation is enabled. The orchestrator owns no timers and
//! no I/O; the booth drives it with one `tick` per second.

use crate::errors::SessionError;
use crate::storage::{PhotoId, PhotoRegistry};
use tracing::{debug, info, warn};

/// Where the capture session is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    /// Counting down; `remaining` is the value on display
    CountingDown { remaining: u32 },
    /// Final tick fired, compositing in progress
    Capturing,
    /// Photo registered under `photo_id`
    Captured { photo_id: PhotoId },
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::CountingDown { .. } => "counting down",
            CaptureState::Capturing => "capturing",
            CaptureState::Captured { .. } => "showing a photo",
        }
    }
}

/// What the caller should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Keep ticking; display `remaining`
    Continue { remaining: u32 },
    /// Run the compositor now, exactly once
    Capture,
    /// No countdown active
    Ignored,
}

/// Countdown and capture lifecycle for one kiosk page
#[derive(Debug)]
pub struct CaptureOrchestrator {
    state: CaptureState,
    countdown_seconds: u32,
    allow_cancel: bool,
    torn_down: bool,
}

impl CaptureOrchestrator {
    pub fn new(countdown_seconds: u32, allow_cancel: bool) -> Self {
        Self {
            state: CaptureState::Idle,
            countdown_seconds: countdown_seconds.max(1),
            allow_cancel,
            torn_down: false,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn countdown_seconds(&self) -> u32 {
        self.countdown_seconds
    }

    /// Seconds left on the display, if counting down
    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            CaptureState::CountingDown { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Photo currently on display
    pub fn current_photo(&self) -> Option<PhotoId> {
        match self.state {
            CaptureState::Captured { photo_id } => Some(photo_id),
            _ => None,
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Idle → CountingDown(N0)
    pub fn start_countdown(&mut self) -> Result<u32, SessionError> {
        if self.torn_down {
            return Err(SessionError::TornDown);
        }
        if self.state != CaptureState::Idle {
            return Err(SessionError::NotIdle(self.state.name()));
        }

        let seconds = self.countdown_seconds;
        info!(seconds, "Starting photo countdown");
        self.state = CaptureState::CountingDown { remaining: seconds };
        Ok(seconds)
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> TickOutcome {
        if self.torn_down {
            return TickOutcome::Ignored;
        }

        match self.state {
            CaptureState::CountingDown { remaining } if remaining <= 1 => {
                info!("Countdown complete - capturing");
                self.state = CaptureState::Capturing;
                TickOutcome::Capture
            }
            CaptureState::CountingDown { remaining } => {
                let remaining = remaining - 1;
                debug!(remaining, "Countdown tick");
                self.state = CaptureState::CountingDown { remaining };
                TickOutcome::Continue { remaining }
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// Capturing → Captured(id)
    ///
    /// Fails after teardown; the caller then owns the orphaned photo and must
    /// delete it.
    pub fn finish_capture(&mut self, photo_id: PhotoId) -> Result<(), SessionError> {
        if self.torn_down {
            return Err(SessionError::TornDown);
        }
        if self.state != CaptureState::Capturing {
            return Err(SessionError::NotIdle(self.state.name()));
        }

        info!(%photo_id, "Photo captured");
        self.state = CaptureState::Captured { photo_id };
        Ok(())
    }

    /// Capturing → Idle when compositing failed
    pub fn capture_failed(&mut self) {
        if self.state == CaptureState::Capturing {
            warn!("Capture failed, back to idle");
            self.state = CaptureState::Idle;
        }
    }

    /// Captured → Idle, deleting the photo first
    pub fn retake(&mut self, registry: &PhotoRegistry) -> Result<PhotoId, SessionError> {
        let CaptureState::Captured { photo_id } = self.state else {
            return Err(SessionError::NothingToRetake);
        };

        registry.delete(&photo_id);
        self.state = CaptureState::Idle;
        info!(%photo_id, "Retake - photo discarded");
        Ok(photo_id)
    }

    /// CountingDown → Idle, if allowed
    pub fn cancel(&mut self) -> Result<(), SessionError> {
        if !self.allow_cancel {
            return Err(SessionError::CancelDisabled);
        }
        if !matches!(self.state, CaptureState::CountingDown { .. }) {
            return Err(SessionError::NoCountdown);
        }

        info!("Photo countdown aborted");
        self.state = CaptureState::Idle;
        Ok(())
    }

    /// Page is going away: discard the photo and ignore further input
    pub fn teardown(&mut self, registry: &PhotoRegistry) -> Option<PhotoId> {
        let discarded = self.current_photo();
        if let Some(id) = discarded {
            registry.delete(&id);
        }
        if !self.torn_down {
            info!(state = self.state.name(), "Capture session torn down");
        }
        self.state = CaptureState::Idle;
        self.torn_down = true;
        discarded
    }
}

impl Default for CaptureOrchestrator {
    fn default() -> Self {
        Self::new(crate::constants::countdown::DEFAULT_SECONDS, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ImageData;

    fn tick_n(orchestrator: &mut CaptureOrchestrator, n: usize) -> usize {
        (0..n)
            .filter(|_| orchestrator.tick() == TickOutcome::Capture)
            .count()
    }

    #[test]
    fn test_ten_ticks_capture_exactly_once() {
        let mut orchestrator = CaptureOrchestrator::default();
        assert_eq!(orchestrator.start_countdown(), Ok(10));
        assert_eq!(tick_n(&mut orchestrator, 10), 1);
        assert_eq!(orchestrator.state(), CaptureState::Capturing);

        // Extra ticks while compositing do nothing
        assert_eq!(tick_n(&mut orchestrator, 5), 0);
    }

    #[test]
    fn test_nine_ticks_never_capture() {
        let mut orchestrator = CaptureOrchestrator::default();
        orchestrator.start_countdown().unwrap();
        assert_eq!(tick_n(&mut orchestrator, 9), 0);
        assert_eq!(orchestrator.remaining(), Some(1));
    }

    #[test]
    fn test_countdown_displays_every_second() {
        let mut orchestrator = CaptureOrchestrator::new(3, false);
        orchestrator.start_countdown().unwrap();
        assert_eq!(orchestrator.tick(), TickOutcome::Continue { remaining: 2 });
        assert_eq!(orchestrator.tick(), TickOutcome::Continue { remaining: 1 });
        assert_eq!(orchestrator.tick(), TickOutcome::Capture);
    }

    #[test]
    fn test_start_rejected_unless_idle() {
        let mut orchestrator = CaptureOrchestrator::new(2, false);
        orchestrator.start_countdown().unwrap();
        assert_eq!(
            orchestrator.start_countdown(),
            Err(SessionError::NotIdle("counting down"))
        );

        orchestrator.tick();
        orchestrator.tick();
        assert_eq!(
            orchestrator.start_countdown(),
            Err(SessionError::NotIdle("capturing"))
        );
    }

    #[test]
    fn test_failed_capture_returns_to_idle() {
        let mut orchestrator = CaptureOrchestrator::new(1, false);
        orchestrator.start_countdown().unwrap();
        assert_eq!(orchestrator.tick(), TickOutcome::Capture);
        orchestrator.capture_failed();
        assert_eq!(orchestrator.state(), CaptureState::Idle);
        assert!(orchestrator.start_countdown().is_ok());
    }

    #[test]
    fn test_retake_keeps_registry_bounded() {
        let registry = PhotoRegistry::new();
        let mut orchestrator = CaptureOrchestrator::new(1, false);

        for _ in 0..25 {
            orchestrator.start_countdown().unwrap();
            assert_eq!(orchestrator.tick(), TickOutcome::Capture);
            let id = PhotoId::new();
            registry.put(id, ImageData::from_encoded(&[1, 2, 3], "image/jpeg", 1, 1));
            orchestrator.finish_capture(id).unwrap();
            assert_eq!(registry.len(), 1);

            assert_eq!(orchestrator.retake(&registry), Ok(id));
            assert!(registry.get(&id).is_none());
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_retake_requires_photo() {
        let mut orchestrator = CaptureOrchestrator::default();
        assert_eq!(
            orchestrator.retake(&PhotoRegistry::new()),
            Err(SessionError::NothingToRetake)
        );
    }

    #[test]
    fn test_cancel_disabled_by_default() {
        let mut orchestrator = CaptureOrchestrator::default();
        orchestrator.start_countdown().unwrap();
        assert_eq!(orchestrator.cancel(), Err(SessionError::CancelDisabled));
        assert_eq!(orchestrator.remaining(), Some(10));
    }

    #[test]
    fn test_cancel_when_enabled() {
        let mut orchestrator = CaptureOrchestrator::new(5, true);
        assert_eq!(orchestrator.cancel(), Err(SessionError::NoCountdown));
        orchestrator.start_countdown().unwrap();
        orchestrator.tick();
        assert_eq!(orchestrator.cancel(), Ok(()));
        assert_eq!(orchestrator.state(), CaptureState::Idle);
        assert_eq!(orchestrator.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn test_teardown_stops_countdown_and_discards_photo() {
        let registry = PhotoRegistry::new();
        let mut orchestrator = CaptureOrchestrator::new(1, false);
        orchestrator.start_countdown().unwrap();
        orchestrator.tick();
        let id = PhotoId::new();
        registry.put(id, ImageData::from_encoded(&[9], "image/jpeg", 1, 1));
        orchestrator.finish_capture(id).unwrap();

        assert_eq!(orchestrator.teardown(&registry), Some(id));
        assert!(registry.is_empty());
        assert_eq!(orchestrator.start_countdown(), Err(SessionError::TornDown));
        assert_eq!(orchestrator.tick(), TickOutcome::Ignored);
    }

    #[test]
    fn test_finish_after_teardown_is_rejected() {
        let mut orchestrator = CaptureOrchestrator::new(1, false);
        orchestrator.start_countdown().unwrap();
        orchestrator.tick();
        orchestrator.teardown(&PhotoRegistry::new());
        assert_eq!(
            orchestrator.finish_capture(PhotoId::new()),
            Err(SessionError::TornDown)
        );
    }
}
