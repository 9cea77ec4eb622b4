use std::collections::HashSet;

use glam::{Vec2, Vec3};
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::{Camera, Movement};
use crate::config::RenderConfig;

/// Units per second the point light moves while an arrow key is held.
pub const LIGHT_NUDGE_SPEED: f32 = 1.5;

/// Which events feed mouse look while the cursor is captured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LookSource {
    /// Window cursor positions, as with a confined cursor.
    #[default]
    Cursor,
    /// Raw device motion. A locked cursor sends no cursor positions.
    Device,
}

/// Keyboard and mouse state for one window.
///
/// Mouse look only accumulates while the cursor is captured, and only from
/// the active [`LookSource`]. The first cursor event after a capture
/// re-seeds the last position so the camera does not jump.
#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    pressed: HashSet<KeyCode>,
    last_cursor: Option<Vec2>,
    look_delta: Vec2,
    look_source: LookSource,
    scroll: f32,
    captured: bool,
    capture_changed: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears edge-triggered state. Call once per frame after consuming it.
    pub fn begin_frame(&mut self) {
        self.pressed.clear();
        self.look_delta = Vec2::ZERO;
        self.scroll = 0.0;
        self.capture_changed = false;
    }

    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.on_key(key, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => self.on_mouse_button(*button, *state),
            WindowEvent::CursorMoved { position, .. } => {
                self.on_cursor_moved(Vec2::new(position.x as f32, position.y as f32))
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 120.0,
                };
                self.on_scroll(dy);
            }
            WindowEvent::Focused(false) => self.held.clear(),
            _ => {}
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.on_mouse_motion(delta.0, delta.1);
        }
    }

    pub fn set_look_source(&mut self, source: LookSource) {
        self.look_source = source;
        self.last_cursor = None;
    }

    pub fn look_source(&self) -> LookSource {
        self.look_source
    }

    pub fn on_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if self.held.insert(key) {
                    self.pressed.insert(key);
                }
            }
            ElementState::Released => {
                self.held.remove(&key);
            }
        }
    }

    /// A left click toggles cursor capture.
    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left && state == ElementState::Pressed {
            self.captured = !self.captured;
            self.capture_changed = true;
            self.last_cursor = None;
        }
    }

    pub fn on_cursor_moved(&mut self, position: Vec2) {
        if let Some(last) = self.last_cursor {
            if self.captured && self.look_source == LookSource::Cursor {
                // Window y grows downward; looking up is positive.
                self.look_delta += Vec2::new(position.x - last.x, last.y - position.y);
            }
        }
        self.last_cursor = Some(position);
    }

    /// Raw device motion in device units; positive `dy` moves down.
    pub fn on_mouse_motion(&mut self, dx: f64, dy: f64) {
        if self.captured && self.look_source == LookSource::Device {
            self.look_delta += Vec2::new(dx as f32, -dy as f32);
        }
    }

    pub fn on_scroll(&mut self, dy: f32) {
        self.scroll += dy;
    }

    pub fn key_down(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    pub fn captured(&self) -> bool {
        self.captured
    }

    /// True on the frame the capture state flipped.
    pub fn capture_changed(&self) -> bool {
        self.capture_changed
    }

    pub fn look_delta(&self) -> Vec2 {
        self.look_delta
    }

    /// Movement directions for every held WASD/Space/Ctrl key.
    pub fn movements(&self) -> Vec<Movement> {
        [
            (KeyCode::KeyW, Movement::Forward),
            (KeyCode::KeyS, Movement::Backward),
            (KeyCode::KeyA, Movement::Left),
            (KeyCode::KeyD, Movement::Right),
            (KeyCode::Space, Movement::Up),
            (KeyCode::ControlLeft, Movement::Down),
            (KeyCode::ControlRight, Movement::Down),
        ]
        .into_iter()
        .filter(|(key, _)| self.key_down(*key))
        .map(|(_, movement)| movement)
        .collect()
    }

    /// Feeds this frame's movement, look and scroll into the camera.
    pub fn apply_to_camera(&self, camera: &mut Camera, dt: f32) {
        for movement in self.movements() {
            camera.process_keyboard(movement, dt);
        }
        if self.look_delta != Vec2::ZERO {
            camera.process_mouse_movement(self.look_delta.x, self.look_delta.y);
        }
        if self.scroll != 0.0 {
            camera.process_mouse_scroll(self.scroll);
        }
    }

    /// Flips technique toggles for keys pressed this frame.
    ///
    /// F1 Blinn-Phong, F2 directional shadow, F3 point shadow, F4 deferred,
    /// F5 normal mapping, F6 bloom, F7 SSAO, F8 stylized, G cycles the
    /// G-buffer view. Returns true if anything changed.
    pub fn apply_to_config(&self, config: &mut RenderConfig) -> bool {
        let before = *config;
        for key in &self.pressed {
            match key {
                KeyCode::F1 => config.blinn_phong = !config.blinn_phong,
                KeyCode::F2 => config.directional_shadow = !config.directional_shadow,
                KeyCode::F3 => config.point_shadow = !config.point_shadow,
                KeyCode::F4 => config.deferred_shading = !config.deferred_shading,
                KeyCode::F5 => config.normal_mapping = !config.normal_mapping,
                KeyCode::F6 => config.bloom = !config.bloom,
                KeyCode::F7 => config.ssao = !config.ssao,
                KeyCode::F8 => config.stylized = !config.stylized,
                KeyCode::KeyG => config.gbuffer_view = config.gbuffer_view.next(),
                _ => {}
            }
        }
        *config != before
    }

    /// Point-light displacement for this frame from the arrow and page keys.
    pub fn light_nudge(&self, dt: f32) -> Vec3 {
        let mut direction = Vec3::ZERO;
        for (key, axis) in [
            (KeyCode::ArrowLeft, Vec3::NEG_X),
            (KeyCode::ArrowRight, Vec3::X),
            (KeyCode::ArrowUp, Vec3::NEG_Z),
            (KeyCode::ArrowDown, Vec3::Z),
            (KeyCode::PageUp, Vec3::Y),
            (KeyCode::PageDown, Vec3::NEG_Y),
        ] {
            if self.key_down(key) {
                direction += axis;
            }
        }
        direction * LIGHT_NUDGE_SPEED * dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_requires_capture_and_skips_first_event() {
        let mut input = InputState::new();
        input.on_cursor_moved(Vec2::new(10.0, 10.0));
        input.on_cursor_moved(Vec2::new(20.0, 20.0));
        assert_eq!(input.look_delta(), Vec2::ZERO);

        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert!(input.captured());
        input.on_cursor_moved(Vec2::new(500.0, 500.0));
        assert_eq!(input.look_delta(), Vec2::ZERO);
        input.on_cursor_moved(Vec2::new(505.0, 497.0));
        assert_eq!(input.look_delta(), Vec2::new(5.0, 3.0));
    }

    #[test]
    fn locked_cursor_looks_with_device_motion() {
        let mut input = InputState::new();
        input.set_look_source(LookSource::Device);
        let motion = DeviceEvent::MouseMotion { delta: (4.0, 2.0) };

        input.handle_device_event(&motion);
        assert_eq!(input.look_delta(), Vec2::ZERO, "not captured yet");

        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.handle_device_event(&motion);
        assert_eq!(input.look_delta(), Vec2::new(4.0, -2.0));

        // Cursor positions are ignored so motion is not counted twice.
        input.on_cursor_moved(Vec2::new(100.0, 100.0));
        input.on_cursor_moved(Vec2::new(110.0, 90.0));
        assert_eq!(input.look_delta(), Vec2::new(4.0, -2.0));

        let mut camera = Camera::new(Vec3::ZERO, -90.0, 0.0);
        let before = camera.yaw();
        input.apply_to_camera(&mut camera, 0.016);
        assert!(camera.yaw() > before);
        assert!(camera.pitch() < 0.0);
    }

    #[test]
    fn confined_cursor_ignores_device_motion() {
        let mut input = InputState::new();
        input.on_mouse_button(MouseButton::Left, ElementState::Pressed);
        input.on_mouse_motion(4.0, 2.0);
        assert_eq!(input.look_delta(), Vec2::ZERO);
        assert_eq!(input.look_source(), LookSource::Cursor);
    }

    #[test]
    fn held_keys_map_to_movement() {
        let mut input = InputState::new();
        input.on_key(KeyCode::KeyW, ElementState::Pressed);
        input.on_key(KeyCode::ControlLeft, ElementState::Pressed);
        assert_eq!(input.movements(), vec![Movement::Forward, Movement::Down]);

        input.on_key(KeyCode::KeyW, ElementState::Released);
        assert_eq!(input.movements(), vec![Movement::Down]);
    }

    #[test]
    fn function_keys_toggle_once_per_press() {
        let mut input = InputState::new();
        let mut config = RenderConfig::default();

        input.on_key(KeyCode::F7, ElementState::Pressed);
        assert!(input.apply_to_config(&mut config));
        assert!(config.ssao);

        // Key repeat while held is not a new press.
        input.begin_frame();
        input.on_key(KeyCode::F7, ElementState::Pressed);
        assert!(!input.apply_to_config(&mut config));
        assert!(config.ssao);
    }

    #[test]
    fn arrows_move_light() {
        let mut input = InputState::new();
        input.on_key(KeyCode::ArrowRight, ElementState::Pressed);
        input.on_key(KeyCode::PageUp, ElementState::Pressed);
        let nudge = input.light_nudge(1.0);
        assert_eq!(nudge, Vec3::new(LIGHT_NUDGE_SPEED, LIGHT_NUDGE_SPEED, 0.0));
    }
}
