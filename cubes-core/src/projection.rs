//! Perspective camera and projection utilities

use nalgebra::{Matrix4, Point3, Vector3};

/// Perspective camera looking down -Z at `target`.
///
/// The projection matrix is cached: changing `fov`, `aspect`, `near` or
/// `far` has no effect until [`PerspectiveCamera::update_projection_matrix`]
/// is called.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

/// A point projected into normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub ndc_x: f32,
    pub ndc_y: f32,
    /// NDC depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
}

impl Projected {
    /// Map into a `width` x `height` raster, y growing downward
    pub fn to_screen(&self, width: u32, height: u32) -> (f32, f32) {
        (
            (self.ndc_x + 1.0) * 0.5 * width as f32,
            (1.0 - self.ndc_y) * 0.5 * height as f32,
        )
    }
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            up: Vector3::y(),
            fov,
            aspect,
            near,
            far,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the cached projection from the current parameters
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Matrix4::new_perspective(self.aspect, self.fov.to_radians(), self.near, self.far);
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// World-to-camera transform
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Project a model-space point. Returns `None` for points on or behind
    /// the camera plane.
    pub fn project(&self, point: &Point3<f32>, model: &Matrix4<f32>) -> Option<Projected> {
        let clip = self.projection * self.view_matrix() * model * point.to_homogeneous();
        if clip.w <= 1e-6 {
            return None;
        }

        Some(Projected {
            ndc_x: clip.x / clip.w,
            ndc_y: clip.y / clip.w,
            depth: clip.z / clip.w,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(75.0, 2.0, 0.1, 10.0);
        camera.position.z = 3.0;
        camera
    }

    #[test]
    fn test_projection_is_cached() {
        let mut camera = camera();
        let before = *camera.projection_matrix();

        camera.aspect = 1.0;
        assert_eq!(*camera.projection_matrix(), before);

        camera.update_projection_matrix();
        assert_ne!(*camera.projection_matrix(), before);
        let expected = Matrix4::new_perspective(1.0, 75.0_f32.to_radians(), 0.1, 10.0);
        assert_relative_eq!(*camera.projection_matrix(), expected);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let projected = camera()
            .project(&Point3::origin(), &Matrix4::identity())
            .expect("origin is in front of the camera");
        assert_relative_eq!(projected.ndc_x, 0.0);
        assert_relative_eq!(projected.ndc_y, 0.0);
        assert!(projected.depth > -1.0 && projected.depth < 1.0);
        assert_eq!(projected.to_screen(200, 100), (100.0, 50.0));
    }

    #[test]
    fn test_behind_camera_is_rejected() {
        let behind = Point3::new(0.0, 0.0, 5.0);
        assert!(camera().project(&behind, &Matrix4::identity()).is_none());
    }

    #[test]
    fn test_left_cube_projects_left() {
        let projected = camera()
            .project(&Point3::new(-2.0, 0.0, 0.0), &Matrix4::identity())
            .expect("visible");
        assert!(projected.ndc_x < 0.0);
    }
}
