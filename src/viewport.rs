//! Camera focus state machine.
//!
//! `Idle` → `Focusing` on any selection, `Focusing` → `Settled` when the
//! running transition is acknowledged, and back to `Idle` when the selection
//! is cleared. A selection arriving mid-flight replaces the running
//! transition; the new one starts from wherever the camera currently is.
//!
//! Time is passed in by the caller so the controller stays deterministic.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::correlate::Selection;
use crate::models::{Coordinates, Viewport};

/// Duration of a pan/zoom transition.
pub const TRANSITION_DURATION: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewportState {
    Idle,
    Focusing,
    Settled,
}

/// A bounded camera move from one viewport to another.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransition {
    pub generation: u64,
    pub from: Viewport,
    pub to: Viewport,
    pub started_at: Instant,
    pub duration: Duration,
}

impl CameraTransition {
    /// Linear interpolation between `from` and `to`, clamped to the end
    /// points outside the transition window.
    pub fn position_at(&self, now: Instant) -> Viewport {
        let t = self.progress(now);
        let lerp = |a: f64, b: f64| a + (b - a) * t;

        Viewport::new(
            Coordinates::new(
                lerp(self.from.center.latitude, self.to.center.latitude),
                lerp(self.from.center.longitude, self.to.center.longitude),
            ),
            lerp(self.from.zoom, self.to.zoom),
        )
    }

    pub fn progress(&self, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        self.progress(now) >= 1.0
    }
}

#[derive(Debug)]
pub struct ViewportController {
    state: ViewportState,
    home: Viewport,
    current: Viewport,
    transition: Option<CameraTransition>,
    selection: Option<Selection>,
    generation: u64,
    duration: Duration,
    // Set by the first seed, selection or clear; later positions are ignored.
    camera_moved: bool,
}

impl ViewportController {
    pub fn new(home: Viewport) -> Self {
        Self::with_duration(home, TRANSITION_DURATION)
    }

    pub fn with_duration(home: Viewport, duration: Duration) -> Self {
        Self {
            state: ViewportState::Idle,
            home,
            current: home,
            transition: None,
            selection: None,
            generation: 0,
            duration,
            camera_moved: false,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn transition(&self) -> Option<&CameraTransition> {
        self.transition.as_ref()
    }

    /// Where the camera is at `now`, mid-transition or at rest.
    pub fn viewport_at(&self, now: Instant) -> Viewport {
        match (&self.state, &self.transition) {
            (ViewportState::Focusing, Some(t)) => t.position_at(now),
            _ => self.current,
        }
    }

    /// Starts a transition toward the selection, pre-empting any running one.
    pub fn select(&mut self, selection: Selection, now: Instant) -> &CameraTransition {
        let from = self.viewport_at(now);
        self.generation += 1;

        debug!(
            generation = self.generation,
            preempted = self.state == ViewportState::Focusing,
            point_id = %selection.point.id,
            "Starting camera transition"
        );

        let transition = CameraTransition {
            generation: self.generation,
            from,
            to: selection.target,
            started_at: now,
            duration: self.duration,
        };
        self.current = from;
        self.camera_moved = true;
        self.selection = Some(selection);
        self.state = ViewportState::Focusing;
        self.transition.insert(transition)
    }

    /// Acknowledges the end of a transition. Completions for a pre-empted
    /// transition are ignored and return `false`.
    pub fn complete(&mut self, generation: u64) -> bool {
        let Some(transition) = self.transition.as_ref() else {
            return false;
        };
        if self.state != ViewportState::Focusing || transition.generation != generation {
            debug!(generation, "Ignoring stale transition completion");
            return false;
        }

        self.current = transition.to;
        self.transition = None;
        self.state = ViewportState::Settled;
        true
    }

    /// Completes the running transition if its window has elapsed.
    pub fn advance(&mut self, now: Instant) -> bool {
        let finished = match &self.transition {
            Some(t) if self.state == ViewportState::Focusing && t.is_finished(now) => {
                Some(t.generation)
            }
            _ => None,
        };
        finished.is_some_and(|generation| self.complete(generation))
    }

    /// Drops the selection and returns to the configured home viewport.
    pub fn clear(&mut self) -> Viewport {
        self.state = ViewportState::Idle;
        self.selection = None;
        self.transition = None;
        self.current = self.home;
        self.camera_moved = true;
        self.current
    }

    /// Seeds the initial idle camera with a device position. Only the first
    /// position counts, and only before any selection or clear; `None`
    /// keeps the configured center.
    pub fn seed_geolocation(&mut self, position: Option<Coordinates>) -> bool {
        let Some(center) = position else {
            return false;
        };
        if self.camera_moved {
            debug!("Geolocation arrived after the camera moved; ignoring");
            return false;
        }

        self.current = Viewport::new(center, self.home.zoom);
        self.camera_moved = true;
        true
    }
}
