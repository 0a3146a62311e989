// src/core/fade.rs

use crate::config::Rgba;

/// Length of a show/hide ramp, in seconds.
pub const FADE_DURATION: f64 = 0.2;

/// Hide progress past which the material becomes fully occluding.
pub const OCCLUSION_THRESHOLD: f32 = 0.9;

/// Surface material of the reticle plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Material {
    /// Unlit color; alpha carries the fade opacity.
    Color(Rgba),
    /// Writes depth only, rendering nothing visible.
    Occlusion,
}

/// Visibility flags.
///
/// # Fields
/// * `is_hidden` - Last requested visibility, set when a ramp starts.
/// * `is_animating` - A ramp is in progress; new requests are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FadeState {
    pub is_hidden: bool,
    pub is_animating: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    Hide,
    Unhide,
}

/// Whether a ramp needs further samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeProgress {
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    direction: FadeDirection,
    started_at: f64,
}

/// Drives opacity ramps for showing and hiding the reticle.
///
/// The controller does not own a timer: the caller samples it with
/// [`step`](FadeController::step) on a fixed tick until it reports
/// [`FadeProgress::Finished`].
#[derive(Debug, Clone)]
pub struct FadeController {
    base: Rgba,
    opacity: f32,
    occluded: bool,
    state: FadeState,
    ramp: Option<Ramp>,
}

impl FadeController {
    pub fn new(base: Rgba) -> Self {
        Self {
            base,
            opacity: 1.0,
            occluded: false,
            state: FadeState::default(),
            ramp: None,
        }
    }

    pub fn state(&self) -> FadeState {
        self.state
    }

    pub fn is_hidden(&self) -> bool {
        self.state.is_hidden
    }

    pub fn is_animating(&self) -> bool {
        self.state.is_animating
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn base_color(&self) -> Rgba {
        self.base
    }

    /// Material to render right now.
    pub fn material(&self) -> Material {
        if self.occluded {
            Material::Occlusion
        } else {
            Material::Color(self.base.with_alpha(self.opacity))
        }
    }

    /// Swaps the color being faded, keeping the current opacity.
    pub fn set_base_color(&mut self, color: Rgba) {
        self.base = color;
    }

    /// Starts a fade-out. Returns false if hidden already or mid-ramp.
    pub fn hide(&mut self, now: f64) -> bool {
        if self.state.is_animating || self.state.is_hidden {
            return false;
        }
        self.start(FadeDirection::Hide, now);
        self.state.is_hidden = true;
        true
    }

    /// Starts a fade-in. Returns false if visible already or mid-ramp.
    pub fn unhide(&mut self, now: f64) -> bool {
        if self.state.is_animating || !self.state.is_hidden {
            return false;
        }
        self.start(FadeDirection::Unhide, now);
        self.state.is_hidden = false;
        true
    }

    fn start(&mut self, direction: FadeDirection, now: f64) {
        self.state.is_animating = true;
        self.ramp = Some(Ramp {
            direction,
            started_at: now,
        });
    }

    /// Samples the active ramp at `now`.
    ///
    /// Once `now` is past the end of the ramp the end state is applied
    /// exactly and the animating flag is cleared.
    pub fn step(&mut self, now: f64) -> FadeProgress {
        let Some(ramp) = self.ramp else {
            return FadeProgress::Finished;
        };

        if now > ramp.started_at + FADE_DURATION {
            self.apply(ramp.direction, 1.0);
            self.ramp = None;
            self.state.is_animating = false;
            tracing::trace!(direction = ?ramp.direction, "fade finished");
            return FadeProgress::Finished;
        }

        let percentage = ((now - ramp.started_at) / FADE_DURATION).clamp(0.0, 1.0) as f32;
        self.apply(ramp.direction, percentage);
        FadeProgress::Running
    }

    fn apply(&mut self, direction: FadeDirection, percentage: f32) {
        match direction {
            FadeDirection::Hide => {
                self.opacity = 1.0 - percentage;
                self.occluded = percentage >= OCCLUSION_THRESHOLD;
            }
            FadeDirection::Unhide => {
                self.opacity = percentage;
                self.occluded = false;
            }
        }
    }
}
