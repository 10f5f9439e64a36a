//! Directional light steered by spherical angles.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::Vec3;

use crate::color::Color;

/// Angle applied per key event, in radians.
pub const DEFAULT_STEP: f32 = 0.1;
/// Distance of the light from the origin.
pub const DEFAULT_RADIUS: f32 = 10.0;

/// One discrete steering event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightStep {
    Up,
    Down,
    Left,
    Right,
}

/// Directional light positioned on a sphere around the world origin.
///
/// Pitch stays within `[-π/2, π/2]`, yaw wraps freely. The light always aims at
/// the origin, so only the position changes as the angles move.
#[derive(Debug, Clone)]
pub struct SphericalLight {
    pitch: f32,
    yaw: f32,
    radius: f32,
    step: f32,
    pub color: Color,
    pub intensity: f32,
}

impl Default for SphericalLight {
    fn default() -> Self {
        Self::new(DEFAULT_RADIUS, DEFAULT_STEP)
    }
}

impl SphericalLight {
    /// Light on the `(1, 1, 1)` diagonal at the given radius.
    pub fn new(radius: f32, step: f32) -> Self {
        Self {
            // elevation of the diagonal: sin(pitch) = 1/sqrt(3)
            pitch: 3.0f32.sqrt().recip().asin(),
            yaw: FRAC_PI_4,
            radius,
            step,
            color: Color::WHITE,
            intensity: 0.5,
        }
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn apply(&mut self, step: LightStep) {
        match step {
            LightStep::Up => self.pitch = (self.pitch + self.step).min(FRAC_PI_2),
            LightStep::Down => self.pitch = (self.pitch - self.step).max(-FRAC_PI_2),
            LightStep::Left => self.yaw += self.step,
            LightStep::Right => self.yaw -= self.step,
        }
    }

    /// Cartesian position of the light.
    pub fn position(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(
            self.radius * sin_yaw * cos_pitch,
            self.radius * sin_pitch,
            self.radius * cos_yaw * cos_pitch,
        )
    }

    pub fn target(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        (self.position() - self.target()).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pitch_is_clamped_after_long_sequences() {
        let mut light = SphericalLight::default();
        for _ in 0..100 {
            light.apply(LightStep::Up);
            assert!(light.pitch() <= FRAC_PI_2);
        }
        assert_relative_eq!(light.pitch(), FRAC_PI_2);

        for _ in 0..100 {
            light.apply(LightStep::Down);
            assert!(light.pitch() >= -FRAC_PI_2);
        }
        assert_relative_eq!(light.pitch(), -FRAC_PI_2);

        let mut mixed = SphericalLight::default();
        for i in 0..500 {
            let step = if i % 7 < 4 { LightStep::Up } else { LightStep::Down };
            mixed.apply(step);
            assert!((-FRAC_PI_2..=FRAC_PI_2).contains(&mixed.pitch()));
        }
    }

    #[test]
    fn yaw_is_unbounded() {
        let mut light = SphericalLight::new(DEFAULT_RADIUS, 0.1);
        let start = light.yaw();
        for _ in 0..200 {
            light.apply(LightStep::Left);
        }
        assert_relative_eq!(light.yaw(), start + 20.0, epsilon = 1e-2);

        for _ in 0..400 {
            light.apply(LightStep::Right);
        }
        assert_relative_eq!(light.yaw(), start - 20.0, epsilon = 1e-2);
    }

    #[test]
    fn position_lies_on_the_sphere() {
        let r = DEFAULT_RADIUS;
        let mut light = SphericalLight::new(r, 0.1);
        let sequence = [
            LightStep::Up,
            LightStep::Left,
            LightStep::Left,
            LightStep::Down,
            LightStep::Right,
            LightStep::Up,
        ];
        for step in sequence.iter().cycle().take(120) {
            light.apply(*step);
            let p = light.position();
            let cos_pitch = light.pitch().cos();
            assert_relative_eq!(p.x * p.x + p.z * p.z, r * r * cos_pitch * cos_pitch, epsilon = 1e-2);
            assert_relative_eq!(p.y, r * light.pitch().sin(), epsilon = 1e-5);
        }
    }

    #[test]
    fn starts_on_the_diagonal_and_aims_at_origin() {
        let light = SphericalLight::default();
        let p = light.position();
        assert_relative_eq!(p.x, p.z, epsilon = 1e-5);
        assert_eq!(light.target(), Vec3::ZERO);
        assert_relative_eq!(light.direction_to_light().length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn default_direction_is_the_unit_diagonal() {
        let light = SphericalLight::default();
        let expected = Vec3::ONE.normalize();
        let dir = light.direction_to_light();
        assert_relative_eq!(dir.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(dir.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(dir.z, expected.z, epsilon = 1e-5);
        let p = light.position();
        assert_relative_eq!(p.x, p.y, epsilon = 1e-4);
        assert_relative_eq!(p.y, p.z, epsilon = 1e-4);
    }

    #[test]
    fn straight_up_at_the_pole() {
        let mut light = SphericalLight::default();
        for _ in 0..30 {
            light.apply(LightStep::Up);
        }
        assert_relative_eq!(light.pitch(), FRAC_PI_2);
        let p = light.position();
        assert_relative_eq!(p.y, DEFAULT_RADIUS, epsilon = 1e-5);
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-5);
    }
}
