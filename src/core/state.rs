// src/core/state.rs

use crate::SurfaceHit;

/// Logical tracking state of the reticle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TrackingState {
    /// No usable surface; the reticle floats in front of the camera.
    #[default]
    Uninitialized,
    /// A surface hit is available this frame.
    Detecting(SurfaceHit),
}

/// Visual mode the reticle is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    /// Billboard facing the camera.
    Uninitialized,
    /// Tracking a surface that is not a confirmed plane.
    Open,
    /// Tracking a confirmed plane anchor.
    Closed,
}

impl TrackingState {
    pub fn display_mode(&self) -> DisplayMode {
        match self {
            Self::Uninitialized => DisplayMode::Uninitialized,
            Self::Detecting(hit) if hit.is_recognized_plane() => DisplayMode::Closed,
            Self::Detecting(_) => DisplayMode::Open,
        }
    }

    pub fn hit(&self) -> Option<&SurfaceHit> {
        match self {
            Self::Uninitialized => None,
            Self::Detecting(hit) => Some(hit),
        }
    }
}

/// Outcome of a single state update.
///
/// # Fields
/// * `previous` - State before the update.
/// * `current` - State after the update.
/// * `display_change` - New display mode if it differs from the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub previous: TrackingState,
    pub current: TrackingState,
    pub display_change: Option<DisplayMode>,
}

/// Holds the current [`TrackingState`] and computes transitions explicitly.
#[derive(Debug, Clone, Default)]
pub struct TrackingStateMachine {
    state: TrackingState,
}

impl TrackingStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TrackingState {
        &self.state
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.state.display_mode()
    }

    /// Replaces the state with `next`.
    ///
    /// A display change is reported only when the display mode differs,
    /// so a stream of hits with the same plane flag reports it once.
    pub fn advance(&mut self, next: TrackingState) -> Transition {
        let previous = std::mem::replace(&mut self.state, next);
        let from = previous.display_mode();
        let to = next.display_mode();
        Transition {
            previous,
            current: next,
            display_change: (from != to).then_some(to),
        }
    }

    /// Convenience over [`advance`](Self::advance) from an optional hit.
    pub fn observe(&mut self, hit: Option<SurfaceHit>) -> Transition {
        self.advance(hit.map_or(TrackingState::Uninitialized, TrackingState::Detecting))
    }
}
