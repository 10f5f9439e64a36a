//! Perspective camera and bounding-box framing.

use glam::{Mat4, Vec3};

use crate::math::Aabb;

/// Extra distance applied on top of the exact fit so the model never touches
/// the viewport edges.
pub const FRAMING_MARGIN: f32 = 1.5;

/// Where the camera sits and what it looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Framing {
    pub position: Vec3,
    pub target: Vec3,
}

/// Compute a framing that keeps the whole box in view.
///
/// The camera looks down `-Z` from `center + (0, 0, d)` where `d` is the distance at
/// which the largest box dimension fills the vertical field of view, times
/// [`FRAMING_MARGIN`]. A zero-extent box yields `d = 0`.
pub fn fit_to_bounds(bounds: &Aabb, fov_y: f32) -> Framing {
    let center = bounds.center();
    let max_dim = bounds.max_dimension();
    let distance = max_dim / (2.0 * (fov_y / 2.0).tan()) * FRAMING_MARGIN;

    Framing {
        position: center + Vec3::new(0.0, 0.0, distance),
        target: center,
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            fov_y: 75.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_y,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    /// Update the aspect ratio from a viewport size. Zero-sized viewports are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn apply_framing(&mut self, framing: Framing) {
        self.position = framing.position;
        self.target = framing.target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Projection with wgpu's `[0, 1]` depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn unit_cube_at_75_degrees() {
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let framing = fit_to_bounds(&bounds, 75.0_f32.to_radians());

        let expected = 1.0 / 37.5_f32.to_radians().tan() * 1.5;
        assert_relative_eq!(framing.position.z, expected, epsilon = 1e-5);
        assert_eq!(framing.position.x, 0.0);
        assert_eq!(framing.position.y, 0.0);
        assert_eq!(framing.target, Vec3::ZERO);
    }

    #[test]
    fn framing_follows_the_box_center() {
        let bounds = Aabb::new(Vec3::new(2.0, 0.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        let framing = fit_to_bounds(&bounds, 60.0_f32.to_radians());

        assert_eq!(framing.target, Vec3::new(4.0, 0.5, 0.0));
        assert_relative_eq!(framing.position.x, 4.0);
        assert_relative_eq!(framing.position.y, 0.5);
        // 4 wide: 4 / (2 tan 30°) * 1.5
        let expected = 4.0 / (2.0 * 30.0_f32.to_radians().tan()) * 1.5;
        assert_relative_eq!(framing.position.z, expected, epsilon = 1e-4);
    }

    #[test]
    fn empty_box_stays_finite() {
        let bounds = Aabb::point(Vec3::new(1.0, 2.0, 3.0));
        let framing = fit_to_bounds(&bounds, 75.0_f32.to_radians());
        assert!(framing.position.is_finite());
        assert!(framing.target.is_finite());
        assert_eq!(framing.position, framing.target);
    }

    #[test]
    fn viewport_updates_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_relative_eq!(camera.aspect, 2.0);
        camera.set_viewport(0, 400);
        assert_relative_eq!(camera.aspect, 2.0);
    }
}
