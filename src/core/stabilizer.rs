// src/core/stabilizer.rs

use crate::{Matrix4f, Point3f, Quatf, SurfaceHit, Vector3f};
use nalgebra::Vector3;
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_2;

/// Number of recent positions averaged for the output position.
pub const POSITION_HISTORY_LEN: usize = 10;

/// Distance (m) below which the reticle shrinks linearly toward the camera.
pub const NEAR_SCALE_DISTANCE: f32 = 0.7;
pub const FAR_SCALE_SLOPE: f32 = 0.25;
pub const FAR_SCALE_OFFSET: f32 = 0.825;

/// Fraction of a right angle above which the camera counts as pointing down.
pub const DOWNWARD_TILT_FACTOR: f32 = 0.75;

/// Stabilized ticks between two raw orientation commits.
pub const ORIENTATION_UPDATE_INTERVAL: u32 = 15;

/// Bounded history of the most recent input positions.
#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    positions: VecDeque<Point3f>,
}

impl PositionHistory {
    pub fn new() -> Self {
        Self {
            positions: VecDeque::with_capacity(POSITION_HISTORY_LEN + 1),
        }
    }

    /// Appends `position`, evicting the oldest sample past capacity,
    /// and returns the mean of the retained samples.
    pub fn push(&mut self, position: Point3f) -> Point3f {
        self.positions.push_back(position);
        while self.positions.len() > POSITION_HISTORY_LEN {
            self.positions.pop_front();
        }
        // Never empty right after a push.
        self.mean().unwrap_or(position)
    }

    /// Arithmetic mean of the retained samples, `None` while empty.
    pub fn mean(&self) -> Option<Point3f> {
        if self.positions.is_empty() {
            return None;
        }
        let sum = self
            .positions
            .iter()
            .fold(Vector3f::zeros(), |acc, p| acc + p.coords);
        Some(Point3f::from(sum / self.positions.len() as f32))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point3f> {
        self.positions.iter()
    }
}

/// Uniform scale that keeps the reticle at a similar apparent size.
///
/// Linear up to [`NEAR_SCALE_DISTANCE`] (1.0x at 0.7 m), then
/// `0.25 * d + 0.825` (1.2x at 1.5 m).
pub fn scale_for_distance(distance: f32) -> f32 {
    if distance < NEAR_SCALE_DISTANCE {
        distance / NEAR_SCALE_DISTANCE
    } else {
        FAR_SCALE_SLOPE * distance + FAR_SCALE_OFFSET
    }
}

/// Tilt magnitude above which the raw hit orientation is replaced by a yaw.
pub fn downward_tilt_threshold() -> f32 {
    FRAC_PI_2 * DOWNWARD_TILT_FACTOR
}

/// Yaw-only rotation derived from the camera transform.
pub fn downward_yaw(camera_transform: &Matrix4f) -> Quatf {
    let yaw = camera_transform[(0, 0)].atan2(camera_transform[(0, 1)]);
    Quatf::from_axis_angle(&Vector3::y_axis(), yaw)
}

/// Result of stabilizing one surface hit.
///
/// # Fields
/// * `position` - Mean of the retained recent positions.
/// * `scale` - Distance-compensated uniform scale.
/// * `orientation` - Orientation to commit this tick, if any.
/// * `pointing_downward` - Whether the camera tilt exceeded the downward threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stabilized {
    pub position: Point3f,
    pub scale: f32,
    pub orientation: Option<Quatf>,
    pub pointing_downward: bool,
}

/// Smooths raw hits into a jitter-free position, scale and orientation.
#[derive(Debug, Clone)]
pub struct TransformStabilizer {
    history: PositionHistory,
    ticks_since_commit: u32,
    pointing_downward: bool,
}

impl Default for TransformStabilizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStabilizer {
    pub fn new() -> Self {
        Self {
            history: PositionHistory::new(),
            ticks_since_commit: 0,
            // Forces an orientation resync on the first level tick.
            pointing_downward: true,
        }
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    /// Ticks skipped since the last raw orientation commit.
    pub fn ticks_since_commit(&self) -> u32 {
        self.ticks_since_commit
    }

    pub fn is_pointing_downward(&self) -> bool {
        self.pointing_downward
    }

    /// Stabilizes one hit. Position and scale are always produced; the
    /// orientation only when it should be committed this tick.
    pub fn stabilize(&mut self, hit: &SurfaceHit) -> Stabilized {
        let position = self.history.push(hit.position);
        let distance = (position - hit.camera_position()).norm();
        let scale = scale_for_distance(distance);

        let tilt = hit.camera_tilt.abs();
        let orientation = if tilt > downward_tilt_threshold() {
            self.pointing_downward = true;
            Some(downward_yaw(&hit.camera_transform))
        } else {
            let was_downward = std::mem::replace(&mut self.pointing_downward, false);
            self.ticks_since_commit += 1;
            if self.ticks_since_commit >= ORIENTATION_UPDATE_INTERVAL || was_downward {
                self.ticks_since_commit = 0;
                Some(hit.orientation)
            } else {
                None
            }
        };

        tracing::trace!(
            x = position.x,
            y = position.y,
            z = position.z,
            distance,
            scale,
            tilt,
            samples = self.history.len(),
            ticks_since_commit = self.ticks_since_commit,
            commit = orientation.is_some(),
            "stabilized surface hit"
        );

        Stabilized {
            position,
            scale,
            orientation,
            pointing_downward: self.pointing_downward,
        }
    }
}
