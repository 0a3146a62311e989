// src/wasm_bridge.rs
#![cfg(feature = "wasm")]

use crate::core::fade::Material;
use crate::core::state::DisplayMode;
use crate::host::ArSession;
use crate::{
    Matrix4f, PlaneAnchorId, Point3f, Quatf, Reticle, ReticleConfig, Rgba, SurfaceHit,
    TrackingQuality,
};
use nalgebra::Quaternion;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

#[derive(Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub enum WasmTracking {
    Normal,
    Limited,
    NotAvailable,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmHit {
    pub position: [f32; 3],
    /// `[x, y, z, w]`, as produced by three.js / WebXR
    pub orientation: [f32; 4],
    pub plane_id: Option<u64>,
    pub camera_tilt: f32,
    /// Column-major, as in `XRRigidTransform.matrix`
    pub camera_transform: [f32; 16],
}

/// One frame of host data pushed from JS.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmFrame {
    pub timestamp: f64,
    pub tracking: WasmTracking,
    pub hit: Option<WasmHit>,
}

impl From<&WasmHit> for SurfaceHit {
    fn from(hit: &WasmHit) -> Self {
        let [x, y, z, w] = hit.orientation;
        SurfaceHit {
            position: Point3f::new(hit.position[0], hit.position[1], hit.position[2]),
            orientation: Quatf::from_quaternion(Quaternion::new(w, x, y, z)),
            plane_anchor: hit.plane_id.map(PlaneAnchorId),
            camera_tilt: hit.camera_tilt,
            camera_transform: Matrix4f::from_column_slice(&hit.camera_transform),
        }
    }
}

impl ArSession for WasmFrame {
    fn tracking_quality(&self) -> TrackingQuality {
        match self.tracking {
            WasmTracking::Normal => TrackingQuality::Normal,
            WasmTracking::Limited => TrackingQuality::Limited,
            WasmTracking::NotAvailable => TrackingQuality::NotAvailable,
        }
    }

    fn raycast_from_view_center(&self) -> Option<SurfaceHit> {
        self.hit.as_ref().map(SurfaceHit::from)
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasmSnapshot {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub scale: f32,
    pub mode: &'static str,
    pub opacity: f32,
    pub occluded: bool,
    /// `None` while the occlusion material is active
    pub color: Option<[f32; 4]>,
    pub camera_relative: bool,
}

impl From<&Reticle> for WasmSnapshot {
    fn from(reticle: &Reticle) -> Self {
        let t = reticle.current_transform();
        let q = t.orientation.quaternion();
        let (color, occluded) = match reticle.material() {
            Material::Color(c) => (Some([c.r, c.g, c.b, c.a]), false),
            Material::Occlusion => (None, true),
        };
        WasmSnapshot {
            position: [t.position.x, t.position.y, t.position.z],
            orientation: [q.i, q.j, q.k, q.w],
            scale: t.scale,
            mode: match reticle.current_display_mode() {
                DisplayMode::Uninitialized => "uninitialized",
                DisplayMode::Open => "open",
                DisplayMode::Closed => "closed",
            },
            opacity: reticle.opacity(),
            occluded,
            color,
            camera_relative: reticle.attachment() == crate::Attachment::Camera,
        }
    }
}

/// JS-facing reticle
#[wasm_bindgen]
pub struct WasmReticle {
    reticle: Reticle,
}

#[wasm_bindgen]
impl WasmReticle {
    /// `color` is an optional `[r, g, b, a]` array in `[0, 1]`.
    #[wasm_bindgen(constructor)]
    pub fn new(color: Option<Vec<f32>>) -> Result<WasmReticle, JsValue> {
        let mut config = ReticleConfig::default();
        if let Some(c) = color {
            if c.len() != 4 {
                return Err(JsValue::from_str("color must have 4 channels"));
            }
            config.color = Rgba::new(c[0], c[1], c[2], c[3]);
        }
        let reticle = Reticle::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(WasmReticle { reticle })
    }

    /// Advances one frame. `frame` is `{ timestamp, tracking, hit? }`.
    pub fn tick(&mut self, frame: JsValue) -> Result<JsValue, JsValue> {
        let frame: WasmFrame = serde_wasm_bindgen::from_value(frame)
            .map_err(|e| JsValue::from_str(&format!("Invalid frame: {}", e)))?;
        self.reticle.on_frame_tick(&frame);
        self.snapshot()
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&WasmSnapshot::from(&self.reticle))
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn hide(&mut self) -> bool {
        self.reticle.hide()
    }

    pub fn unhide(&mut self) -> bool {
        self.reticle.unhide()
    }
}
