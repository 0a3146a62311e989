// src/reticle.rs

use crate::config::{ReticleConfig, Rgba, CLOSED_COLOR};
use crate::core::animation::{OrientationTransition, ORIENTATION_TRANSITION_DURATION};
use crate::core::fade::{FadeController, FadeProgress, FadeState, Material};
use crate::core::scheduler::{Scheduler, ANIMATION_TICK};
use crate::core::stabilizer::TransformStabilizer;
use crate::core::state::{DisplayMode, TrackingState, TrackingStateMachine, Transition};
use crate::host::{ArSession, SceneSubscription};
use crate::{PlaneAnchorId, Point3f, Quatf, Result, SurfaceHit, TrackingQuality};
use nalgebra::Vector3;
use std::collections::HashSet;
use std::f32::consts::FRAC_PI_2;

/// Distance (m) in front of the camera at which the billboard floats.
pub const BILLBOARD_DISTANCE: f32 = 0.5;

/// Pose snapshot for rendering.
///
/// # Fields
/// * `position` - World position, or camera-relative while billboarded.
/// * `orientation` - Current (possibly mid-transition) rotation.
/// * `scale` - Uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReticleTransform {
    pub position: Point3f,
    pub orientation: Quatf,
    pub scale: f32,
}

impl ReticleTransform {
    /// Fixed pose facing the camera: lying in the camera plane, half a meter ahead.
    pub fn billboard() -> Self {
        Self {
            position: Point3f::new(0.0, 0.0, -BILLBOARD_DISTANCE),
            orientation: Quatf::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            scale: 1.0,
        }
    }
}

/// Space the [`ReticleTransform`] is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    World,
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnimationTask {
    FadeStep,
    OrientationStep,
}

/// Surface-tracking focus reticle.
///
/// Call [`on_frame_tick`](Reticle::on_frame_tick) once per rendered frame,
/// or enable auto-update and forward scene update events to
/// [`handle_scene_update`](Reticle::handle_scene_update).
#[derive(Debug)]
pub struct Reticle {
    config: ReticleConfig,
    machine: TrackingStateMachine,
    stabilizer: TransformStabilizer,
    fade: FadeController,
    scheduler: Scheduler<AnimationTask>,
    transform: ReticleTransform,
    orientation_transition: Option<OrientationTransition>,
    visited_planes: HashSet<PlaneAnchorId>,
    subscription: Option<SceneSubscription>,
    clock: f64,
}

impl Default for Reticle {
    fn default() -> Self {
        Self::build(ReticleConfig::default())
    }
}

impl Reticle {
    pub fn new(config: ReticleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ReticleConfig) -> Self {
        let fade = FadeController::new(config.color);
        Self {
            config,
            machine: TrackingStateMachine::new(),
            stabilizer: TransformStabilizer::new(),
            fade,
            scheduler: Scheduler::new(),
            transform: ReticleTransform::billboard(),
            orientation_transition: None,
            visited_planes: HashSet::new(),
            subscription: None,
            clock: 0.0,
        }
    }

    pub fn config(&self) -> &ReticleConfig {
        &self.config
    }

    /// Changes the open/default color.
    pub fn set_color(&mut self, color: Rgba) -> Result<()> {
        color.validate()?;
        self.config.color = color;
        if self.current_display_mode() != DisplayMode::Closed {
            self.fade.set_base_color(color);
        }
        Ok(())
    }

    pub fn current_transform(&self) -> ReticleTransform {
        self.transform
    }

    pub fn current_display_mode(&self) -> DisplayMode {
        self.machine.display_mode()
    }

    pub fn tracking_state(&self) -> &TrackingState {
        self.machine.state()
    }

    pub fn attachment(&self) -> Attachment {
        match self.machine.state() {
            TrackingState::Uninitialized => Attachment::Camera,
            TrackingState::Detecting(_) => Attachment::World,
        }
    }

    pub fn material(&self) -> Material {
        self.fade.material()
    }

    pub fn opacity(&self) -> f32 {
        self.fade.opacity()
    }

    pub fn fade_state(&self) -> FadeState {
        self.fade.state()
    }

    /// Plane anchors seen while in the closed display mode.
    pub fn visited_planes(&self) -> &HashSet<PlaneAnchorId> {
        &self.visited_planes
    }

    pub fn is_changing_orientation(&self) -> bool {
        self.orientation_transition.is_some()
    }

    pub fn is_auto_updating(&self) -> bool {
        self.subscription.as_ref().is_some_and(|s| s.is_active())
    }

    /// Subscribes to or unsubscribes from the session's scene update events.
    ///
    /// Disabling cancels the subscription immediately and leaves the pose as is.
    pub fn set_auto_update<S: ArSession + ?Sized>(&mut self, session: &S, enabled: bool) {
        if enabled {
            if !self.is_auto_updating() {
                self.subscription = Some(session.subscribe_scene_updates());
            }
        } else if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
        }
        tracing::info!(enabled, "reticle auto-update");
    }

    /// Scene update event entry point. Ignored unless auto-update is on.
    pub fn handle_scene_update<S: ArSession + ?Sized>(&mut self, session: &S) -> Option<Transition> {
        if !self.is_auto_updating() {
            return None;
        }
        Some(self.on_frame_tick(session))
    }

    /// Runs one frame: animations, then tracking state, then transform.
    pub fn on_frame_tick<S: ArSession + ?Sized>(&mut self, session: &S) -> Transition {
        self.advance_animations(session.timestamp());

        let hit = match session.tracking_quality() {
            TrackingQuality::Normal => session.raycast_from_view_center(),
            TrackingQuality::Limited | TrackingQuality::NotAvailable => None,
        };

        let transition = self.machine.observe(hit);
        if let Some(mode) = transition.display_change {
            self.apply_display_mode(mode);
        }

        if let Some(hit) = hit {
            if let (DisplayMode::Closed, Some(anchor)) =
                (self.current_display_mode(), hit.plane_anchor)
            {
                self.visited_planes.insert(anchor);
            }
            self.update_transform(&hit);
        }

        transition
    }

    /// Runs every animation callback due at or before `now`.
    pub fn advance_animations(&mut self, now: f64) {
        if now > self.clock {
            self.clock = now;
        }

        while let Some((due, task)) = self.scheduler.pop_due(now) {
            match task {
                AnimationTask::FadeStep => {
                    if self.fade.step(due) == FadeProgress::Running {
                        self.scheduler.schedule(due + ANIMATION_TICK, AnimationTask::FadeStep);
                    }
                }
                AnimationTask::OrientationStep => {
                    let Some(transition) = self.orientation_transition else {
                        continue;
                    };
                    self.transform.orientation = transition.sample(due);
                    if transition.is_finished(due) {
                        self.orientation_transition = None;
                    } else {
                        self.scheduler
                            .schedule(due + ANIMATION_TICK, AnimationTask::OrientationStep);
                    }
                }
            }
        }
    }

    /// Fades the reticle out. Returns false if hidden already or mid-fade.
    pub fn hide(&mut self) -> bool {
        let started = self.fade.hide(self.clock);
        if started {
            self.scheduler
                .schedule(self.clock + ANIMATION_TICK, AnimationTask::FadeStep);
        }
        started
    }

    /// Fades the reticle in. Returns false if visible already or mid-fade.
    pub fn unhide(&mut self) -> bool {
        let started = self.fade.unhide(self.clock);
        if started {
            self.scheduler
                .schedule(self.clock + ANIMATION_TICK, AnimationTask::FadeStep);
        }
        started
    }

    fn apply_display_mode(&mut self, mode: DisplayMode) {
        tracing::debug!(?mode, "reticle display mode changed");
        match mode {
            DisplayMode::Uninitialized => self.display_as_billboard(),
            DisplayMode::Open => self.fade.set_base_color(self.config.color),
            DisplayMode::Closed => self.fade.set_base_color(CLOSED_COLOR),
        }
    }

    fn display_as_billboard(&mut self) {
        // A late orientation step would overwrite the billboard rotation.
        self.orientation_transition = None;
        self.scheduler
            .retain(|task| *task != AnimationTask::OrientationStep);

        self.transform = ReticleTransform::billboard();
        self.fade.set_base_color(self.config.color);
        self.unhide();
    }

    fn update_transform(&mut self, hit: &SurfaceHit) {
        let stabilized = self.stabilizer.stabilize(hit);
        self.transform.position = stabilized.position;
        self.transform.scale = stabilized.scale;
        if let Some(orientation) = stabilized.orientation {
            self.change_orientation(orientation);
        }
    }

    fn change_orientation(&mut self, target: Quatf) {
        if self.orientation_transition.is_some() {
            tracing::trace!("orientation change in flight, commit ignored");
            return;
        }
        self.orientation_transition = Some(OrientationTransition::new(
            self.transform.orientation,
            target,
            self.clock,
            ORIENTATION_TRANSITION_DURATION,
        ));
        self.scheduler
            .schedule(self.clock + ANIMATION_TICK, AnimationTask::OrientationStep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_COLOR;
    use crate::core::stabilizer::ORIENTATION_UPDATE_INTERVAL;
    use crate::{Matrix4f, ReticleError};
    use approx::assert_abs_diff_eq;
    use nalgebra::Translation3;
    use std::cell::{Cell, RefCell};

    // A mock host session for driving the reticle frame by frame
    struct MockSession {
        quality: TrackingQuality,
        hit: Option<SurfaceHit>,
        time: f64,
        raycasts: Cell<usize>,
        subscription: RefCell<Option<SceneSubscription>>,
    }

    impl MockSession {
        fn new() -> Self {
            Self {
                quality: TrackingQuality::Normal,
                hit: None,
                time: 0.0,
                raycasts: Cell::new(0),
                subscription: RefCell::new(None),
            }
        }

        /// Advances the frame clock by one animation tick.
        fn next_frame(&mut self, hit: Option<SurfaceHit>) -> &Self {
            self.time += ANIMATION_TICK;
            self.hit = hit;
            self
        }
    }

    impl ArSession for MockSession {
        fn tracking_quality(&self) -> TrackingQuality {
            self.quality
        }

        fn raycast_from_view_center(&self) -> Option<SurfaceHit> {
            self.raycasts.set(self.raycasts.get() + 1);
            self.hit
        }

        fn timestamp(&self) -> f64 {
            self.time
        }

        fn subscribe_scene_updates(&self) -> SceneSubscription {
            let sub = SceneSubscription::new();
            *self.subscription.borrow_mut() = Some(sub.clone());
            sub
        }
    }

    fn hit_at(x: f32, plane: Option<u64>) -> SurfaceHit {
        SurfaceHit {
            position: Point3f::new(x, 0.0, -1.5),
            orientation: Quatf::from_axis_angle(&Vector3::y_axis(), 0.8),
            plane_anchor: plane.map(PlaneAnchorId),
            camera_tilt: 0.0,
            camera_transform: Translation3::new(0.0, 0.0, 0.0).to_homogeneous(),
        }
    }

    fn tick(reticle: &mut Reticle, session: &mut MockSession, hit: Option<SurfaceHit>) -> Transition {
        let session = session.next_frame(hit);
        reticle.on_frame_tick(session)
    }

    #[test]
    fn test_starts_as_visible_billboard() {
        let reticle = Reticle::default();
        assert_eq!(reticle.current_display_mode(), DisplayMode::Uninitialized);
        assert_eq!(reticle.current_transform(), ReticleTransform::billboard());
        assert_eq!(reticle.attachment(), Attachment::Camera);
        assert_eq!(reticle.material(), Material::Color(DEFAULT_COLOR));
        assert!(!reticle.fade_state().is_hidden);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReticleConfig {
            color: Rgba::new(0.0, 0.0, 2.0, 1.0),
        };
        assert!(matches!(
            Reticle::new(config),
            Err(ReticleError::InvalidColor { channel: "b", .. })
        ));
    }

    #[test]
    fn test_open_hit_positions_reticle() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();

        let t = tick(&mut reticle, &mut session, Some(hit_at(0.0, None)));
        assert_eq!(t.display_change, Some(DisplayMode::Open));
        assert_eq!(reticle.current_display_mode(), DisplayMode::Open);
        assert_eq!(reticle.attachment(), Attachment::World);
        assert_eq!(reticle.material(), Material::Color(DEFAULT_COLOR));

        let transform = reticle.current_transform();
        assert_eq!(transform.position, Point3f::new(0.0, 0.0, -1.5));
        assert_abs_diff_eq!(transform.scale, 1.2, epsilon = 1e-5);
        assert!(reticle.visited_planes().is_empty());
    }

    #[test]
    fn test_closed_hit_uses_plane_color_and_records_anchor() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();

        tick(&mut reticle, &mut session, Some(hit_at(0.0, Some(4))));
        assert_eq!(reticle.current_display_mode(), DisplayMode::Closed);
        assert_eq!(reticle.material(), Material::Color(CLOSED_COLOR));

        tick(&mut reticle, &mut session, Some(hit_at(0.0, Some(9))));
        let mut planes: Vec<_> = reticle.visited_planes().iter().copied().collect();
        planes.sort();
        assert_eq!(planes, vec![PlaneAnchorId(4), PlaneAnchorId(9)]);
    }

    #[test]
    fn test_same_flag_hits_update_transform_without_mode_switch() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();

        tick(&mut reticle, &mut session, Some(hit_at(0.0, None)));
        let material = reticle.material();

        let t = tick(&mut reticle, &mut session, Some(hit_at(1.0, None)));
        assert_eq!(t.display_change, None);
        assert_eq!(reticle.material(), material);
        // Mean of the two samples
        assert_abs_diff_eq!(reticle.current_transform().position.x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_tracking_loss_restores_billboard_immediately() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();

        tick(&mut reticle, &mut session, Some(hit_at(2.0, None)));
        let t = tick(&mut reticle, &mut session, None);
        assert_eq!(t.display_change, Some(DisplayMode::Uninitialized));
        assert_eq!(reticle.current_transform(), ReticleTransform::billboard());
        assert_eq!(reticle.attachment(), Attachment::Camera);
        assert!(!reticle.is_changing_orientation());

        // History survives the loss
        tick(&mut reticle, &mut session, Some(hit_at(4.0, None)));
        assert_abs_diff_eq!(reticle.current_transform().position.x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_limited_tracking_skips_raycast() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        tick(&mut reticle, &mut session, Some(hit_at(0.0, None)));
        assert_eq!(session.raycasts.get(), 1);

        session.quality = TrackingQuality::Limited;
        tick(&mut reticle, &mut session, Some(hit_at(0.0, None)));
        assert_eq!(session.raycasts.get(), 1);
        assert_eq!(reticle.current_display_mode(), DisplayMode::Uninitialized);
    }

    #[test]
    fn test_orientation_eases_to_committed_target() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        let hit = hit_at(0.0, None);

        tick(&mut reticle, &mut session, Some(hit));
        assert!(reticle.is_changing_orientation());
        assert_eq!(
            reticle.current_transform().orientation,
            ReticleTransform::billboard().orientation
        );

        tick(&mut reticle, &mut session, Some(hit));
        let mid = reticle.current_transform().orientation;
        assert_ne!(mid, hit.orientation);
        assert_ne!(mid, ReticleTransform::billboard().orientation);

        // Well before the next throttled commit
        for _ in 2..(ORIENTATION_UPDATE_INTERVAL - 1) {
            tick(&mut reticle, &mut session, Some(hit));
        }
        assert!(!reticle.is_changing_orientation());
        assert_eq!(reticle.current_transform().orientation, hit.orientation);
    }

    #[test]
    fn test_commit_during_transition_is_ignored() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        let level = hit_at(0.0, None);
        let mut down = level;
        down.camera_tilt = 1.4;
        down.camera_transform = Matrix4f::identity();

        tick(&mut reticle, &mut session, Some(level));
        tick(&mut reticle, &mut session, Some(down));
        assert!(reticle.is_changing_orientation());

        reticle.advance_animations(session.time + 1.0);
        assert!(!reticle.is_changing_orientation());
        assert_eq!(reticle.current_transform().orientation, level.orientation);

        // The next downward tick starts a fresh transition toward the yaw
        session.time += 1.0;
        tick(&mut reticle, &mut session, Some(down));
        assert!(reticle.is_changing_orientation());
        reticle.advance_animations(session.time + 1.0);
        assert_eq!(
            reticle.current_transform().orientation,
            crate::core::stabilizer::downward_yaw(&down.camera_transform)
        );
    }

    #[test]
    fn test_auto_update_subscription() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        session.next_frame(Some(hit_at(1.0, None)));

        assert!(reticle.handle_scene_update(&session).is_none());
        assert_eq!(reticle.current_display_mode(), DisplayMode::Uninitialized);

        reticle.set_auto_update(&session, true);
        assert!(reticle.is_auto_updating());
        assert!(reticle.handle_scene_update(&session).is_some());
        assert_eq!(reticle.current_display_mode(), DisplayMode::Open);
        let pose = reticle.current_transform();

        reticle.set_auto_update(&session, false);
        assert!(!reticle.is_auto_updating());
        let host_side = session.subscription.borrow().clone();
        assert!(host_side.is_some_and(|s| !s.is_active()));

        // Events after cancellation leave the last pose in place
        session.next_frame(None);
        assert!(reticle.handle_scene_update(&session).is_none());
        assert_eq!(reticle.current_transform(), pose);
        assert_eq!(reticle.current_display_mode(), DisplayMode::Open);
    }

    #[test]
    fn test_hide_then_tracking_loss_unhides() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        let hit = hit_at(0.0, None);

        tick(&mut reticle, &mut session, Some(hit));
        assert!(reticle.hide());
        assert!(!reticle.hide());
        for _ in 0..15 {
            tick(&mut reticle, &mut session, Some(hit));
        }
        assert!(reticle.fade_state().is_hidden);
        assert!(!reticle.fade_state().is_animating);
        assert_eq!(reticle.material(), Material::Occlusion);

        tick(&mut reticle, &mut session, None);
        assert!(reticle.fade_state().is_animating);
        assert!(!reticle.fade_state().is_hidden);
        for _ in 0..15 {
            tick(&mut reticle, &mut session, None);
        }
        assert!(!reticle.fade_state().is_animating);
        assert_abs_diff_eq!(reticle.opacity(), 1.0);
        assert_eq!(reticle.material(), Material::Color(DEFAULT_COLOR));
    }

    #[test]
    fn test_hide_while_animating_has_no_effect() {
        let mut reticle = Reticle::default();
        let mut session = MockSession::new();
        tick(&mut reticle, &mut session, None);

        assert!(reticle.hide());
        tick(&mut reticle, &mut session, None);
        tick(&mut reticle, &mut session, None);
        let opacity = reticle.opacity();
        assert!(opacity < 1.0);

        assert!(!reticle.unhide());
        assert!(!reticle.hide());
        assert_eq!(reticle.opacity(), opacity);
    }

    #[test]
    fn test_set_color_applies_outside_closed_mode() {
        let mut reticle = Reticle::default();
        let green = Rgba::new(0.0, 1.0, 0.0, 1.0);
        reticle.set_color(green).unwrap();
        assert_eq!(reticle.material(), Material::Color(green));

        let mut session = MockSession::new();
        tick(&mut reticle, &mut session, Some(hit_at(0.0, Some(1))));
        reticle.set_color(DEFAULT_COLOR).unwrap();
        assert_eq!(reticle.material(), Material::Color(CLOSED_COLOR));

        assert!(reticle.set_color(Rgba::new(-0.1, 0.0, 0.0, 1.0)).is_err());
        assert_eq!(reticle.config().color, DEFAULT_COLOR);
    }
}
