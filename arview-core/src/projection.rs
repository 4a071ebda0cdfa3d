/// Camera and projection utilities
use nalgebra::{Matrix4, Point3, Vector3};

/// Perspective camera kept in sync with the output surface
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self::perspective(70.0, width, height, 0.01, 20.0)
    }

    pub fn perspective(fov_degrees: f32, width: u32, height: u32, near: f32, far: f32) -> Self {
        Self {
            position: Point3::origin(),
            target: Point3::new(0.0, 0.0, -1.0),
            up: Vector3::y(),
            fov: fov_degrees.to_radians(),
            aspect: aspect_ratio(width, height).unwrap_or(1.0),
            near,
            far,
        }
    }

    /// Update the aspect ratio after the surface changed size.
    /// Returns false and leaves the camera untouched for zero-sized surfaces.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        match aspect_ratio(width, height) {
            Some(aspect) => {
                self.aspect = aspect;
                true
            }
            None => false,
        }
    }

    /// Place the eye and look along `forward`
    pub fn look_from(&mut self, eye: Point3<f32>, forward: Vector3<f32>) {
        self.position = eye;
        self.target = eye + forward;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    /// Project a 3D point to 2D screen space, returning (x, y, depth)
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix() * self.view_matrix() * model_matrix;
        let clip = mvp * point.to_homogeneous();

        // Behind the eye or degenerate
        if clip.w <= 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;
        let depth = clip.z / clip.w;

        if !(-1.0..=1.0).contains(&depth) {
            return None;
        }

        let screen_x = (ndc_x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc_y) * 0.5 * height as f32;

        Some((screen_x, screen_y, depth))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn aspect_ratio(width: u32, height: u32) -> Option<f32> {
    if width == 0 || height == 0 {
        None
    } else {
        Some(width as f32 / height as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!((camera.fov - 70f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_resize_ignores_zero_height() {
        let mut camera = Camera::new(800, 600);
        assert!(!camera.resize(1024, 0));
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
        assert!(camera.resize(1000, 500));
        assert!((camera.aspect - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_ahead_projects_to_centre() {
        let camera = Camera::new(100, 100);
        let projected = camera
            .project_to_screen(&Point3::new(0.0, 0.0, -2.0), &Matrix4::identity(), 100, 100)
            .unwrap();
        assert!((projected.0 - 50.0).abs() < 1e-3);
        assert!((projected.1 - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_point_behind_is_clipped() {
        let camera = Camera::new(100, 100);
        assert!(camera
            .project_to_screen(&Point3::new(0.0, 0.0, 2.0), &Matrix4::identity(), 100, 100)
            .is_none());
    }
}
