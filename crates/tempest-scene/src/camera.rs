//! First-person camera: view and projection matrices plus keyboard-style
//! movement.

use glam::{Mat4, Quat, Vec3};
use tempest_particles::ViewPoint;

/// Movement directions relative to where the camera looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Perspective camera.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
    /// Near clip plane distance.
    pub near: f32,
    /// Far clip plane distance (> near).
    pub far: f32,
    /// Movement speed in units per second.
    pub speed: f32,
    /// Speed multiplier while running.
    pub run_multiplier: f32,
    /// Whether the run boost is on.
    pub running: bool,
}

impl Camera {
    /// Camera at `position` looking down -Z.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Turns the camera to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.position).try_normalize() else {
            return;
        };
        self.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, dir);
    }

    /// Compute the view matrix (inverse of camera transform).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position).inverse()
    }

    /// OpenGL-style perspective projection.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect_ratio, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// The up direction vector (+Y in camera space).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// The right direction vector (+X in camera space).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn set_aspect_ratio(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect_ratio = width / height;
        }
    }

    pub fn toggle_running(&mut self) {
        self.running = !self.running;
    }

    /// Moves the camera for `dt` seconds in `direction`.
    pub fn process_movement(&mut self, direction: CameraMovement, dt: f32) {
        let boost = if self.running { self.run_multiplier } else { 1.0 };
        let step = self.speed * boost * dt;
        let axis = match direction {
            CameraMovement::Forward => self.forward(),
            CameraMovement::Backward => -self.forward(),
            CameraMovement::Left => -self.right(),
            CameraMovement::Right => self.right(),
            CameraMovement::Up => Vec3::Y,
            CameraMovement::Down => Vec3::NEG_Y,
        };
        self.position += axis * step;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 7.0),
            rotation: Quat::IDENTITY,
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            aspect_ratio: 16.0 / 9.0,
            near: 0.1,
            far: 10000.0,
            speed: 3.0,
            run_multiplier: 3.0,
            running: false,
        }
    }
}

impl ViewPoint for Camera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn view_matrix(&self) -> Mat4 {
        Camera::view_matrix(self)
    }
}
