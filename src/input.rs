use winit::event::{ElementState, MouseButton, VirtualKeyCode};
use spheres_shared::RaytracerConfig;

use crate::scene::OrbitCamera;

/// What a key press asks the application to do
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyAction {
    Move { forward: f32, right: f32 },
    Restart,
    Exit,
}

impl KeyAction {
    pub fn from_key(key: VirtualKeyCode) -> Option<Self> {
        match key {
            VirtualKeyCode::W => Some(KeyAction::Move { forward: 1.0, right: 0.0 }),
            VirtualKeyCode::S => Some(KeyAction::Move { forward: -1.0, right: 0.0 }),
            VirtualKeyCode::A => Some(KeyAction::Move { forward: 0.0, right: -1.0 }),
            VirtualKeyCode::D => Some(KeyAction::Move { forward: 0.0, right: 1.0 }),
            VirtualKeyCode::Space => Some(KeyAction::Restart),
            VirtualKeyCode::Escape => Some(KeyAction::Exit),
            _ => None,
        }
    }
}

/// Input handling state
pub struct InputState {
    mouse_pressed: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            mouse_pressed: false,
            last_mouse_pos: None,
        }
    }

    pub fn handle_mouse_input(&mut self, button: MouseButton, button_state: ElementState) {
        if button == MouseButton::Left {
            self.mouse_pressed = button_state == ElementState::Pressed;
        }
    }

    /// Track the cursor and return the drag delta while the left button is held
    pub fn handle_cursor_moved(&mut self, position: winit::dpi::PhysicalPosition<f64>) -> Option<(f64, f64)> {
        let mut delta = None;

        if self.mouse_pressed {
            if let Some(last_pos) = self.last_mouse_pos {
                delta = Some((position.x - last_pos.0, position.y - last_pos.1));
            }
        }

        self.last_mouse_pos = Some((position.x, position.y));
        delta
    }
}

/// Camera movement and rotation
pub struct CameraController;

impl CameraController {
    /// Orbit around the focus by a mouse drag in pixels. Dragging up raises the eye.
    pub fn rotate_camera(camera: &mut OrbitCamera, delta_x: f64, delta_y: f64) {
        let sensitivity = RaytracerConfig::CAMERA_ROTATE_SENSITIVITY;
        camera.orbit(delta_x as f32 * sensitivity, -delta_y as f32 * sensitivity);
    }

    pub fn move_camera(camera: &mut OrbitCamera, forward: f32, right: f32) {
        let speed = RaytracerConfig::CAMERA_MOVE_SPEED;
        camera.translate(forward * speed, right * speed);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn test_drag_reports_delta_only_while_pressed() {
        let mut input = InputState::new();

        assert_eq!(input.handle_cursor_moved(PhysicalPosition::new(10.0, 10.0)), None);

        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.handle_cursor_moved(PhysicalPosition::new(15.0, 8.0)), Some((5.0, -2.0)));

        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        assert_eq!(input.handle_cursor_moved(PhysicalPosition::new(30.0, 30.0)), None);
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(
            KeyAction::from_key(VirtualKeyCode::W),
            Some(KeyAction::Move { forward: 1.0, right: 0.0 })
        );
        assert_eq!(KeyAction::from_key(VirtualKeyCode::Space), Some(KeyAction::Restart));
        assert_eq!(KeyAction::from_key(VirtualKeyCode::Escape), Some(KeyAction::Exit));
        assert_eq!(KeyAction::from_key(VirtualKeyCode::Q), None);
    }

    #[test]
    fn test_forward_move_approaches_focus() {
        let mut camera = OrbitCamera::new();
        let before = camera.eye;

        CameraController::move_camera(&mut camera, 1.0, 0.0);

        let step = camera.eye - before;
        assert!((step.length() - RaytracerConfig::CAMERA_MOVE_SPEED).abs() < 1e-5);
        assert!(step.dot(camera.forward()) > 0.0);
    }
}
