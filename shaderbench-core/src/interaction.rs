//! Pointer driven navigation of the preview.
//!
//! The controller is pure state: it never renders, it only rewrites a [`TransformState`].
//! Left button rotates the model, middle button moves the camera along the depth axis and right
//! button moves it in the screen plane. Plane 2D mode turns all of it off.

use glam::{Vec2, Vec3};

use crate::transform::TransformState;

/// Rotation per pixel of drag, applied to the drag distance in degrees.
pub const ROTATION_INTENSITY: f32 = 0.5;
/// Camera depth change per pixel of vertical zoom drag.
pub const ZOOM_INTENSITY: f32 = 0.05;
/// Camera movement per pixel of shift drag.
pub const SHIFT_INTENSITY: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Middle,
    Right,
}

/// What a held pointer button is currently doing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerMode {
    Idle,
    Drag { start: Vec2, rotation: Vec3 },
    Zoom { start: Vec2, depth: f32 },
    Shift { start: Vec2, camera: Vec3 },
}

/// Maps pointer input to pose changes.
#[derive(Debug, Clone)]
pub struct InteractionController {
    mode: PointerMode,
    plane_2d: bool,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self {
            mode: PointerMode::Idle,
            plane_2d: false,
        }
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PointerMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.mode != PointerMode::Idle
    }

    /// Enables or disables navigation. Entering plane 2D ends any active mode.
    pub fn set_plane_2d(&mut self, plane_2d: bool) {
        self.plane_2d = plane_2d;
        if plane_2d {
            self.mode = PointerMode::Idle;
        }
    }

    /// Starts the mode bound to `button`, recording `position` and the current pose as reference.
    /// Ignored while another mode is active or in plane 2D mode.
    pub fn press(&mut self, button: PointerButton, position: Vec2, transform: &TransformState) {
        if self.plane_2d || self.is_active() {
            return;
        }
        self.mode = match button {
            PointerButton::Left => PointerMode::Drag {
                start: position,
                rotation: transform.model_rotation,
            },
            PointerButton::Middle => PointerMode::Zoom {
                start: position,
                depth: transform.camera_position.z,
            },
            PointerButton::Right => PointerMode::Shift {
                start: position,
                camera: transform.camera_position,
            },
        };
    }

    /// Applies the active mode for a pointer at `position`. Returns whether the pose changed.
    pub fn move_to(&mut self, position: Vec2, transform: &mut TransformState) -> bool {
        match self.mode {
            PointerMode::Idle => false,
            PointerMode::Drag { start, rotation } => {
                let delta = position - start;
                transform.model_rotation = rotation
                    + Vec3::new(
                        delta.y.to_radians() * ROTATION_INTENSITY,
                        delta.x.to_radians() * ROTATION_INTENSITY,
                        0.0,
                    );
                true
            }
            PointerMode::Zoom { start, depth } => {
                let delta = position.y - start.y;
                transform.camera_position.z = depth + delta * ZOOM_INTENSITY;
                true
            }
            PointerMode::Shift { start, camera } => {
                let delta = Vec2::new(position.x - start.x, start.y - position.y);
                transform.camera_position =
                    camera + Vec3::new(delta.x * SHIFT_INTENSITY, delta.y * SHIFT_INTENSITY, 0.0);
                true
            }
        }
    }

    /// Ends whichever mode is active. Returns whether one was.
    pub fn release(&mut self) -> bool {
        let was_active = self.is_active();
        self.mode = PointerMode::Idle;
        was_active
    }

    /// Resets the pose to its defaults. Ignored in plane 2D mode.
    pub fn double_click(&mut self, transform: &mut TransformState) -> bool {
        if self.plane_2d {
            return false;
        }
        transform.reset();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{DEFAULT_CAMERA_POSITION, DEFAULT_MODEL_ROTATION};

    #[test]
    fn test_drag_rotates_from_start_pose() {
        let mut controller = InteractionController::new();
        let mut transform = TransformState::default();
        controller.press(PointerButton::Left, Vec2::new(100.0, 100.0), &transform);
        assert!(controller.move_to(Vec2::new(120.0, 90.0), &mut transform));

        let expected = Vec3::new(
            (-10.0f32).to_radians() * ROTATION_INTENSITY,
            20.0f32.to_radians() * ROTATION_INTENSITY,
            0.0,
        );
        assert!((transform.model_rotation - expected).length() < 1e-6);

        // Deltas are measured from the press point, not accumulated per move.
        controller.move_to(Vec2::new(120.0, 90.0), &mut transform);
        assert!((transform.model_rotation - expected).length() < 1e-6);
    }

    #[test]
    fn test_zoom_and_shift_move_camera() {
        let mut controller = InteractionController::new();
        let mut transform = TransformState::default();

        controller.press(PointerButton::Middle, Vec2::new(0.0, 0.0), &transform);
        controller.move_to(Vec2::new(50.0, 40.0), &mut transform);
        assert_eq!(transform.camera_position.z, -5.0 + 40.0 * ZOOM_INTENSITY);
        assert_eq!(transform.camera_position.x, 0.0);
        controller.release();

        let before = transform.camera_position;
        controller.press(PointerButton::Right, Vec2::new(10.0, 10.0), &transform);
        controller.move_to(Vec2::new(30.0, 0.0), &mut transform);
        assert_eq!(
            transform.camera_position,
            before + Vec3::new(20.0 * SHIFT_INTENSITY, 10.0 * SHIFT_INTENSITY, 0.0)
        );
    }

    #[test]
    fn test_modes_are_exclusive() {
        let mut controller = InteractionController::new();
        let transform = TransformState::default();
        controller.press(PointerButton::Left, Vec2::ZERO, &transform);
        controller.press(PointerButton::Right, Vec2::ZERO, &transform);
        assert!(matches!(controller.mode(), PointerMode::Drag { .. }));
        assert!(controller.release());
        assert!(!controller.release());
    }

    #[test]
    fn test_plane_2d_disables_navigation() {
        let mut controller = InteractionController::new();
        let mut transform = TransformState::new(Vec3::ONE, Vec3::ONE);
        controller.set_plane_2d(true);
        controller.press(PointerButton::Left, Vec2::ZERO, &transform);
        assert!(!controller.move_to(Vec2::new(10.0, 10.0), &mut transform));
        assert!(!controller.double_click(&mut transform));
        assert_eq!(transform.model_rotation, Vec3::ONE);
    }

    #[test]
    fn test_double_click_resets_pose() {
        let mut controller = InteractionController::new();
        let mut transform = TransformState::new(Vec3::ONE, Vec3::ONE);
        assert!(controller.double_click(&mut transform));
        assert_eq!(transform.model_rotation, DEFAULT_MODEL_ROTATION);
        assert_eq!(transform.camera_position, DEFAULT_CAMERA_POSITION);
    }
}
