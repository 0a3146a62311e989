// Copyright (c) 2026 kalwalt and AR.js-org contributors
//
// This software is released under the MIT License.
// https://opensource.org/licenses/MIT
// See https://github.com/AR-js-org/aruco-rs/blob/main/LICENSE
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};

/// 3D point in world space (f32 to match render-side buffers)
pub type Point3f = Point3<f32>;

/// 3D direction or offset
pub type Vector3f = Vector3<f32>;

/// Unit rotation
pub type Quatf = UnitQuaternion<f32>;

/// Homogeneous 4x4 transform, column-major like the host camera matrices
pub type Matrix4f = Matrix4<f32>;

/// Opaque identifier of a plane anchor reported by the host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneAnchorId(pub u64);

/// Camera tracking quality reported by the host for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingQuality {
    Normal,
    Limited,
    NotAvailable,
}

/// Best raycast result from the view center for a single frame.
///
/// # Fields
/// * `position` - World-space hit point.
/// * `orientation` - World-space orientation of the hit surface.
/// * `plane_anchor` - The plane anchor the hit belongs to, if it struck a recognized planar region.
/// * `camera_tilt` - Camera pitch (euler x) in radians at the time of the hit.
/// * `camera_transform` - Camera-to-world transform at the time of the hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub position: Point3f,
    pub orientation: Quatf,
    pub plane_anchor: Option<PlaneAnchorId>,
    pub camera_tilt: f32,
    pub camera_transform: Matrix4f,
}

impl SurfaceHit {
    /// Whether the hit landed on a plane the session has confirmed as an anchor.
    pub fn is_recognized_plane(&self) -> bool {
        self.plane_anchor.is_some()
    }

    /// World-space camera position (translation column of `camera_transform`).
    pub fn camera_position(&self) -> Point3f {
        Point3f::new(
            self.camera_transform[(0, 3)],
            self.camera_transform[(1, 3)],
            self.camera_transform[(2, 3)],
        )
    }
}

/// Possible errors while configuring a reticle
#[derive(Debug, Clone, PartialEq)]
pub enum ReticleError {
    /// A color channel is non-finite or outside `[0, 1]`.
    InvalidColor { channel: &'static str, value: f32 },
    /// A serialized configuration could not be parsed.
    InvalidConfig(String),
}

impl std::fmt::Display for ReticleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidColor { channel, value } => {
                write!(f, "color channel {channel} out of range: {value}")
            }
            Self::InvalidConfig(msg) => write!(f, "invalid reticle config: {msg}"),
        }
    }
}

impl std::error::Error for ReticleError {}

pub type Result<T> = std::result::Result<T, ReticleError>;

pub mod config;
pub mod core;
pub mod host;
pub mod reticle;

#[cfg(feature = "wasm")]
pub mod wasm_bridge;

pub use config::{ReticleConfig, Rgba};
pub use host::{ArSession, SceneSubscription};
pub use reticle::{Attachment, Reticle, ReticleTransform};
