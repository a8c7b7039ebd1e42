//! Model and camera pose, and the matrices derived from it.
//!
//! Only the rotation and camera position are state; every matrix is recomputed from them (and the
//! viewport) on demand. The projection is never persisted.

use glam::{Mat4, Vec3};

/// Rotation a fresh or reset model starts with.
pub const DEFAULT_MODEL_ROTATION: Vec3 = Vec3::ZERO;

/// Camera position a fresh or reset view starts with.
pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, -5.0);

const FIELD_OF_VIEW_DEGREES: f32 = 60.0;
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// The three matrices uploaded every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrices {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Matrices {
    /// Passthrough matrices used for plane 2D rendering.
    pub const IDENTITY: Matrices = Matrices {
        model: Mat4::IDENTITY,
        view: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
    };
}

/// Model rotation (Euler radians), camera position and viewport size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub model_rotation: Vec3,
    pub camera_position: Vec3,
    viewport: (u32, u32),
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            model_rotation: DEFAULT_MODEL_ROTATION,
            camera_position: DEFAULT_CAMERA_POSITION,
            viewport: (1280, 720),
        }
    }
}

impl TransformState {
    pub fn new(model_rotation: Vec3, camera_position: Vec3) -> Self {
        Self {
            model_rotation,
            camera_position,
            ..Default::default()
        }
    }

    /// Puts rotation and camera back to their defaults.
    pub fn reset(&mut self) {
        self.model_rotation = DEFAULT_MODEL_ROTATION;
        self.camera_position = DEFAULT_CAMERA_POSITION;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.viewport.0 as f32 / self.viewport.1.max(1) as f32
    }

    /// Rotation about X, then Y, then Z.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_x(self.model_rotation.x)
            * Mat4::from_rotation_y(self.model_rotation.y)
            * Mat4::from_rotation_z(self.model_rotation.z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.camera_position)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(
            FIELD_OF_VIEW_DEGREES.to_radians(),
            self.aspect_ratio(),
            NEAR_PLANE,
            FAR_PLANE,
        )
    }

    /// The matrices for this frame. In plane 2D mode all three collapse to identity.
    pub fn matrices(&self, plane_2d: bool) -> Matrices {
        if plane_2d {
            return Matrices::IDENTITY;
        }
        Matrices {
            model: self.model_matrix(),
            view: self.view_matrix(),
            projection: self.projection_matrix(),
        }
    }
}
