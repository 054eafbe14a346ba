use super::math::{Ray, Vec3};

pub const DEFAULT_FOV: f64 = 75.0;

/// Pinhole camera. Stateless: rays are generated on demand from pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub look_direction: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f64,
}

impl Default for Camera {
    /// Positioned at zero looking toward the z axis.
    fn default() -> Self {
        Camera::new(Vec3::zero(), Vec3::z_axis(), Vec3::y_axis(), DEFAULT_FOV)
    }
}

impl Camera {
    pub fn new(position: Vec3, look_direction: Vec3, up: Vec3, fov: f64) -> Self {
        Self {
            position,
            look_direction,
            up,
            fov,
        }
    }

    /// Creates a camera that looks at a specific point from a specific position.
    /// The point ends up in the center of the screen.
    pub fn look_at(position: Vec3, point: Vec3) -> Self {
        let mut camera = Camera {
            position,
            ..Camera::default()
        };
        camera.point_at(point);
        camera
    }

    pub fn point_at(&mut self, point: Vec3) {
        self.look_direction = point - self.position;
    }

    /// Orthonormal (forward, right, up) basis of the view.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let forward = self.look_direction.normalize();
        let mut right = forward.cross(self.up).normalize();
        if right == Vec3::zero() {
            // looking along the up vector: any perpendicular will do
            let fallback = if forward.x.abs() < 0.9 {
                Vec3::x_axis()
            } else {
                Vec3::z_axis()
            };
            right = forward.cross(fallback).normalize();
        }
        let up = right.cross(forward);
        (forward, right, up)
    }

    /// Ray through the continuous image position `(x, y)`, where pixel `(i, j)`
    /// covers `[i, i + 1) x [j, j + 1)` and `y` grows downward.
    pub fn ray_through(&self, x: f64, y: f64, width: u32, height: u32) -> Ray {
        let (forward, right, up) = self.basis();
        let width = width.max(1) as f64;
        let height = height.max(1) as f64;
        let aspect_ratio = width / height;
        let scale = (self.fov.to_radians() * 0.5).tan();
        let ndc_x = (2.0 * (x / width) - 1.0) * scale * aspect_ratio;
        let ndc_y = (1.0 - 2.0 * (y / height)) * scale;
        let direction = forward + right * -ndc_x + up * ndc_y;
        Ray::new(self.position, direction.normalize())
    }

    /// Ray through the center of pixel `(x, y)`.
    pub fn ray_for_pixel(&self, x: u32, y: u32, width: u32, height: u32) -> Ray {
        self.ray_through(x as f64 + 0.5, y as f64 + 0.5, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_pixel_looks_forward() {
        let camera = Camera::look_at(Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 2.0, 10.0));
        let ray = camera.ray_for_pixel(2, 1, 5, 3);
        assert_eq!(ray.origin, Vec3::new(1.0, 2.0, 3.0));
        assert!(ray.direction.approx_eq(Vec3::z_axis(), 1e-9));
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let camera = Camera::look_at(Vec3::new(3.0, 4.0, -2.0), Vec3::new(0.0, 1.0, 5.0));
        let (forward, right, up) = camera.basis();
        for v in [forward, right, up] {
            assert!((v.len() - 1.0).abs() < 1e-9);
        }
        assert!(forward.dot(right).abs() < 1e-9);
        assert!(forward.dot(up).abs() < 1e-9);
        assert!(right.dot(up).abs() < 1e-9);
        assert!(up.y > 0.0);
    }

    #[test]
    fn test_image_orientation() {
        let camera = Camera::default();
        let top_left = camera.ray_for_pixel(0, 0, 100, 100);
        let bottom_right = camera.ray_for_pixel(99, 99, 100, 100);
        // looking down +z with +y up, the left of the image is -x
        assert!(top_left.direction.x < 0.0 && top_left.direction.y > 0.0);
        assert!(bottom_right.direction.x > 0.0 && bottom_right.direction.y < 0.0);
    }

    #[test]
    fn test_fov_sets_edge_angle() {
        let camera = Camera::new(Vec3::zero(), Vec3::z_axis(), Vec3::y_axis(), 90.0);
        let top = camera.ray_through(50.0, 0.0, 100, 100);
        // half of 90 degrees above the axis
        assert!((top.direction.dot(Vec3::z_axis()) - 45f64.to_radians().cos()).abs() < 1e-9);
    }

    #[test]
    fn test_looking_straight_up_still_produces_rays() {
        let camera = Camera::new(Vec3::zero(), Vec3::y_axis(), Vec3::y_axis(), 60.0);
        let ray = camera.ray_for_pixel(0, 0, 4, 4);
        assert!((ray.direction.len() - 1.0).abs() < 1e-9);
        assert!(ray.direction.y > 0.0);
    }
}
