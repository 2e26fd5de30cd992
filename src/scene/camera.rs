//! Per-pass camera declarations

use glam::{Mat4, Vec3};

/// Camera projection type
///
/// The aspect ratio is not part of the declaration; it follows the size of the
/// targets the pass renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov_y: f32, near: f32, far: f32 },
    Orthographic { height: f32, near: f32, far: f32 },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4, // 45 degrees
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            near,
            far,
        }
    }

    pub fn orthographic(height: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic { height, near, far }
    }

    pub fn matrix(&self, aspect: f32) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }
            Projection::Orthographic { height, near, far } => {
                let half_h = height / 2.0;
                let half_w = half_h * aspect;
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, near, far)
            }
        }
    }
}

/// Camera bound to a pass
#[derive(Debug, Clone, PartialEq)]
pub struct CameraDecl {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for CameraDecl {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl CameraDecl {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection matrix for targets of `width` x `height`
    pub fn projection_matrix(&self, width: u32, height: u32) -> Mat4 {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.projection.matrix(aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_follows_target_aspect() {
        let camera = CameraDecl::default();
        let wide = camera.projection_matrix(200, 100);
        let square = camera.projection_matrix(100, 100);
        // x scale shrinks as the aspect widens
        assert!((wide.x_axis.x * 2.0 - square.x_axis.x).abs() < 1e-5);
        assert_eq!(wide.y_axis.y, square.y_axis.y);
    }
}
