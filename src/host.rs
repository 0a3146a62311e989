// src/host.rs

use crate::{SurfaceHit, TrackingQuality};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The host AR session, queried once per frame.
///
/// Implemented by the integration layer (native AR session, WASM bridge, tests).
/// The reticle never stores a session; it is passed in on every call.
pub trait ArSession {
    /// Camera tracking quality for the current frame.
    fn tracking_quality(&self) -> TrackingQuality;

    /// Best surface hit for a ray through the view center, if any.
    fn raycast_from_view_center(&self) -> Option<SurfaceHit>;

    /// Timestamp of the current frame in seconds.
    fn timestamp(&self) -> f64;

    /// Opens a subscription to per-frame scene update events.
    ///
    /// The host keeps a clone of the returned token and stops dispatching
    /// to the subscriber once it is cancelled.
    fn subscribe_scene_updates(&self) -> SceneSubscription {
        SceneSubscription::new()
    }
}

/// Cancellable handle shared between the host event stream and a subscriber.
#[derive(Debug, Clone)]
pub struct SceneSubscription {
    active: Arc<AtomicBool>,
}

impl SceneSubscription {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Cancels the subscription for every clone of this handle.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Default for SceneSubscription {
    fn default() -> Self {
        Self::new()
    }
}
