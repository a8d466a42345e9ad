//! Camera for the orbit plot

use glam::{Mat4, Vec2, Vec3, Vec4};

/// Orbital camera that looks at a target point
#[derive(Debug, Clone)]
pub struct Camera {
    /// Target point the camera looks at (usually Earth center)
    pub target: Vec3,
    /// Distance from target
    pub distance: f32,
    /// Azimuth angle (rotation around Y axis) in radians
    pub azimuth: f32,
    /// Elevation angle (rotation above/below XZ plane) in radians
    pub elevation: f32,
    /// Field of view in radians
    pub fov: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 4.0, // About 4 Earth radii out
            azimuth: 0.6,
            elevation: 0.4, // Above the equator so orbits read as ellipses
            fov: 45.0_f32.to_radians(),
            near: 0.01,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Get camera position in world space
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.elevation.cos() * self.azimuth.sin();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.elevation.cos() * self.azimuth.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect_ratio, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        self.projection_matrix(aspect_ratio) * self.view_matrix()
    }

    /// Move back until a sphere of `radius` around the target fits the view
    pub fn frame(&mut self, radius: f32) {
        let half_fov = self.fov * 0.5;
        self.distance = (radius / half_fov.sin()) * 1.05;
        self.far = self.distance + radius * 2.0;
    }

    /// World point to pixel coordinates, `None` if behind the camera
    pub fn project(&self, point: Vec3, width: u32, height: u32) -> Option<Vec2> {
        let aspect = width as f32 / height as f32;
        let clip = self.view_projection_matrix(aspect) * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }

        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * width as f32,
            (1.0 - ndc.y) * 0.5 * height as f32,
        ))
    }

    /// World-space ray direction through a pixel center
    pub fn ray_direction(&self, px: f32, py: f32, width: u32, height: u32) -> Vec3 {
        let aspect = width as f32 / height as f32;
        let inverse = self.view_projection_matrix(aspect).inverse();
        let ndc_x = px / width as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - py / height as f32 * 2.0;

        let near = inverse * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        (far - near).normalize_or_zero()
    }
}
