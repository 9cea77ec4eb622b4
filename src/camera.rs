//! A yaw/pitch free-flying camera.
//!
//! [`Camera`] stores its orientation as Euler angles in degrees and derives an
//! orthonormal `front`/`right`/`up` basis from them. Every method that writes
//! an angle rebuilds the basis, so the three vectors are always unit length and
//! mutually orthogonal.
//!
//! Yaw is kept in `[0, 360)` and pitch is clamped to `[-89, 89]` so the basis
//! never degenerates at the poles.
//!
//! # Example
//!
//! ```
//! use lumen::{Camera, Movement};
//! use glam::Vec3;
//!
//! let mut camera = Camera::new(Vec3::new(4.0, 1.5, -2.0), -195.0, -15.0);
//! camera.process_keyboard(Movement::Forward, 0.016);
//! camera.process_mouse_movement(12.0, -4.0);
//!
//! camera.update_look_at(Vec3::ZERO);
//! let view = camera.view_matrix();
//! ```

use glam::{Mat4, Vec3};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 4.0;
pub const DEFAULT_SENSITIVITY: f32 = 0.03;
/// Scroll zoom range in degrees. The default sits at the top of the range.
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;
/// Largest pitch magnitude, in degrees.
pub const PITCH_LIMIT: f32 = 89.0;

/// Direction for keyboard-driven movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Free-flying perspective camera.
#[derive(Clone, Debug)]
pub struct Camera {
    pub position: Vec3,
    world_up: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
    /// Vertical field of view in degrees at full zoom-out.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, DEFAULT_YAW, DEFAULT_PITCH)
    }
}

impl Camera {
    /// Creates a camera at `position` with the given angles in degrees.
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            world_up: Vec3::Y,
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            yaw: wrap_yaw(yaw, DEFAULT_YAW),
            pitch: clamp_pitch(pitch, DEFAULT_PITCH),
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: MAX_ZOOM,
            fov: 72.0,
            near: 0.01,
            far: 100.0,
        };
        camera.update_vectors();
        camera
    }

    /// Sets the base field of view in degrees.
    pub fn with_fov(mut self, fov: f32) -> Self {
        self.fov = fov;
        self
    }

    /// Sets the near and far clip planes.
    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Moves the camera along its own basis.
    pub fn process_keyboard(&mut self, direction: Movement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            Movement::Forward => self.position += self.front * velocity,
            Movement::Backward => self.position -= self.front * velocity,
            Movement::Left => self.position -= self.right * velocity,
            Movement::Right => self.position += self.right * velocity,
            Movement::Up => self.position += self.up * velocity,
            Movement::Down => self.position -= self.up * velocity,
        }
    }

    /// Applies a mouse delta in pixels. Positive `dy` looks up.
    pub fn process_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw = wrap_yaw(self.yaw + dx * self.mouse_sensitivity, self.yaw);
        self.pitch = clamp_pitch(self.pitch + dy * self.mouse_sensitivity, self.pitch);
        self.update_vectors();
    }

    /// Scroll up narrows the field of view.
    pub fn process_mouse_scroll(&mut self, dy: f32) {
        self.zoom = (self.zoom - dy).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Sets both angles (degrees) and rebuilds the basis.
    pub fn set_direction(&mut self, yaw: f32, pitch: f32) {
        self.yaw = wrap_yaw(yaw, self.yaw);
        self.pitch = clamp_pitch(pitch, self.pitch);
        self.update_vectors();
    }

    /// Turns the camera to face `target`.
    ///
    /// Afterwards `position + front` lies on the ray from `position` through
    /// `target`, unless the target is steeper than the pitch limit, in which
    /// case pitch saturates. A target equal to the position leaves the
    /// orientation unchanged.
    pub fn update_look_at(&mut self, target: Vec3) {
        let Some(direction) = (target - self.position).try_normalize() else {
            return;
        };
        let pitch = direction.y.clamp(-1.0, 1.0).asin().to_degrees();
        let yaw = direction.z.atan2(direction.x).to_degrees();
        self.set_direction(yaw, pitch);
    }

    /// The point one unit in front of the camera.
    pub fn look_at(&self) -> Vec3 {
        self.position + self.front
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Effective vertical field of view in degrees after scroll zoom.
    pub fn effective_fov(&self) -> f32 {
        self.fov * self.zoom / MAX_ZOOM
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.effective_fov().to_radians(), aspect, self.near, self.far)
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        let front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos());
        self.front = front.normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

/// Non-finite input is replaced by `fallback` before wrapping.
fn wrap_yaw(yaw: f32, fallback: f32) -> f32 {
    let yaw = if yaw.is_finite() { yaw } else { fallback };
    let wrapped = yaw.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

fn clamp_pitch(pitch: f32, fallback: f32) -> f32 {
    if pitch.is_nan() {
        return fallback;
    }
    pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_orthonormal(camera: &Camera) {
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        assert!((f.length() - 1.0).abs() < EPS);
        assert!((r.length() - 1.0).abs() < EPS);
        assert!((u.length() - 1.0).abs() < EPS);
        assert!(f.dot(r).abs() < EPS);
        assert!(f.dot(u).abs() < EPS);
        assert!(r.dot(u).abs() < EPS);
    }

    #[test]
    fn default_faces_negative_z() {
        let camera = Camera::default();
        assert!((camera.front() - Vec3::NEG_Z).length() < EPS);
        assert!((camera.right() - Vec3::X).length() < EPS);
        assert!((camera.up() - Vec3::Y).length() < EPS);
        assert_eq!(camera.yaw(), 270.0);
    }

    #[test]
    fn yaw_wraps_into_range() {
        let camera = Camera::new(Vec3::ZERO, -195.0, -15.0);
        assert!((camera.yaw() - 165.0).abs() < EPS);

        let mut camera = Camera::default();
        camera.process_mouse_movement(20_000.0, 0.0);
        assert!((0.0..360.0).contains(&camera.yaw()));
    }

    #[test]
    fn pitch_never_exceeds_limit() {
        let mut camera = Camera::default();
        for step in -200..=200 {
            let dy = step as f32 * 97.0;
            camera.process_mouse_movement(13.0, dy);
            assert!(camera.pitch().abs() <= PITCH_LIMIT);
            let front_pitch = camera.front().y.asin().to_degrees();
            assert!(front_pitch.abs() <= PITCH_LIMIT + EPS);
            assert_orthonormal(&camera);
        }

        for pitch in [-1e9, -90.0, -89.5, 89.5, 90.0, 1e9, f32::INFINITY] {
            camera.set_direction(0.0, pitch);
            assert!(camera.pitch().abs() <= PITCH_LIMIT);
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn look_at_is_colinear_with_target() {
        let mut camera = Camera::new(Vec3::new(4.0, 1.5, -2.0), -195.0, -15.0);
        let targets = [
            Vec3::ZERO,
            Vec3::new(0.542, -0.141, -0.422),
            Vec3::new(-3.0, 2.0, 7.0),
            Vec3::new(10.0, 1.5, -2.0),
            Vec3::new(4.0, 0.0, -10.0),
        ];
        for target in targets {
            camera.update_look_at(target);
            let expected = (target - camera.position).normalize();
            let actual = (camera.look_at() - camera.position).normalize();
            assert!(
                expected.cross(actual).length() < EPS && expected.dot(actual) > 0.0,
                "target {target:?}: expected {expected:?}, got {actual:?}"
            );
            assert_orthonormal(&camera);

            let view = camera.view_matrix();
            let in_view = view.transform_point3(target);
            assert!(in_view.x.abs() < 1e-3 && in_view.y.abs() < 1e-3);
            assert!(in_view.z < 0.0);
        }
    }

    #[test]
    fn look_at_self_is_ignored() {
        let mut camera = Camera::new(Vec3::ONE, 30.0, 10.0);
        let before = camera.front();
        camera.update_look_at(Vec3::ONE);
        assert_eq!(camera.front(), before);
    }

    #[test]
    fn non_finite_look_keeps_orientation() {
        let mut camera = Camera::new(Vec3::ZERO, -90.0, 10.0);
        let (yaw, pitch) = (camera.yaw(), camera.pitch());

        camera.process_mouse_movement(f32::INFINITY, 0.0);
        camera.process_mouse_movement(f32::NAN, f32::NAN);
        camera.set_direction(f32::NEG_INFINITY, f32::NAN);

        assert_eq!((camera.yaw(), camera.pitch()), (yaw, pitch));
        assert!(camera.front().is_finite());
        assert_orthonormal(&camera);

        let fresh = Camera::new(Vec3::ZERO, f32::NAN, f32::NAN);
        assert!(fresh.front().is_finite());
        assert_orthonormal(&fresh);
    }

    #[test]
    fn movement_follows_basis() {
        let mut camera = Camera::default();
        camera.process_keyboard(Movement::Forward, 0.5);
        assert!((camera.position - Vec3::new(0.0, 0.0, -2.0)).length() < EPS);
        camera.process_keyboard(Movement::Right, 0.25);
        camera.process_keyboard(Movement::Up, 0.25);
        assert!((camera.position - Vec3::new(1.0, 1.0, -2.0)).length() < EPS);
    }

    #[test]
    fn scroll_zoom_is_clamped() {
        let mut camera = Camera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
        assert_eq!(camera.effective_fov(), camera.fov);
    }
}
