//! Damped orbit controls around a target point.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

use crate::camera::Camera;

/// Radians of rotation per pixel of mouse drag.
const ROTATE_SPEED: f32 = 0.005;
/// Zoom factor per wheel line.
const ZOOM_STEP: f32 = 0.95;
/// Pending motion below this is considered settled.
const SETTLE_EPSILON: f32 = 1e-4;
const MIN_DISTANCE: f32 = 0.01;
/// Zoom-out stops at this share of the camera's far plane.
const MAX_DISTANCE_FRACTION: f32 = 0.5;
/// Smallest polar angle; at exactly 0 the view direction lines up with +Y.
const MIN_POLAR: f32 = 1e-4;

/// Rotates the camera on a sphere around `target`.
///
/// Angles follow the usual convention: `theta` is the azimuth around +Y measured
/// from +Z, `phi` the polar angle from +Y. `phi` is limited to `[MIN_POLAR, max_polar]`
/// so the camera cannot dive below the ground plane.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    radius: f32,
    theta: f32,
    phi: f32,
    pending_theta: f32,
    pending_phi: f32,
    pending_zoom: f32,
    pub damping: f32,
    pub max_polar: f32,
    dragging: bool,
    last_cursor: Option<(f64, f64)>,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            radius: 5.0,
            theta: 0.0,
            phi: FRAC_PI_2,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_zoom: 1.0,
            damping: 0.25,
            max_polar: FRAC_PI_2,
            dragging: false,
            last_cursor: None,
        }
    }
}

impl OrbitController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derive the orbit from the camera's current placement and drop any
    /// motion still in flight.
    pub fn retarget(&mut self, camera: &Camera) {
        self.target = camera.target;
        let offset = camera.position - camera.target;
        self.radius = offset.length();
        if self.radius > 0.0 {
            self.theta = offset.x.atan2(offset.z);
            self.phi = (offset.y / self.radius).clamp(-1.0, 1.0).acos().clamp(MIN_POLAR, self.max_polar);
        } else {
            self.theta = 0.0;
            self.phi = FRAC_PI_2;
        }
        self.pending_theta = 0.0;
        self.pending_phi = 0.0;
        self.pending_zoom = 1.0;
    }

    pub fn set_dragging(&mut self, dragging: bool) {
        self.dragging = dragging;
        if !dragging {
            self.last_cursor = None;
        }
    }

    /// Feed a cursor position; while dragging the delta turns into rotation.
    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        if self.dragging {
            if let Some((last_x, last_y)) = self.last_cursor {
                self.rotate((x - last_x) as f32 * ROTATE_SPEED, (y - last_y) as f32 * ROTATE_SPEED);
            }
        }
        self.last_cursor = Some((x, y));
    }

    /// Queue a rotation. Positive `d_theta` swings the camera left around the target.
    pub fn rotate(&mut self, d_theta: f32, d_phi: f32) {
        self.pending_theta -= d_theta;
        self.pending_phi -= d_phi;
    }

    /// Queue a zoom in wheel lines; positive values move closer.
    pub fn zoom(&mut self, lines: f32) {
        self.pending_zoom *= ZOOM_STEP.powf(lines);
    }

    pub fn is_moving(&self) -> bool {
        self.pending_theta.abs() > SETTLE_EPSILON
            || self.pending_phi.abs() > SETTLE_EPSILON
            || (self.pending_zoom - 1.0).abs() > SETTLE_EPSILON
    }

    pub fn polar_angle(&self) -> f32 {
        self.phi
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    /// Apply one damped step of pending motion to the camera.
    ///
    /// Returns `true` when the camera moved. Without pending motion the camera
    /// is left untouched.
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        if !self.is_moving() {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
            self.pending_zoom = 1.0;
            return false;
        }

        self.theta += self.pending_theta * self.damping;
        self.phi = (self.phi + self.pending_phi * self.damping).clamp(MIN_POLAR, self.max_polar);
        let zoom_now = self.pending_zoom.powf(self.damping);
        let max_distance = (camera.far * MAX_DISTANCE_FRACTION).max(MIN_DISTANCE);
        self.radius = (self.radius * zoom_now).clamp(MIN_DISTANCE, max_distance);

        self.pending_theta *= 1.0 - self.damping;
        self.pending_phi *= 1.0 - self.damping;
        self.pending_zoom /= zoom_now;

        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let offset = Vec3::new(sin_phi * sin_theta, cos_phi, sin_phi * cos_theta) * self.radius;
        camera.position = self.target + offset;
        camera.target = self.target;
        true
    }
}
