// src/engine_lib/camera.rs

use glam::Mat4;

use crate::engine_lib::scene_types::CameraLens;

// Projection parameters live here; the camera's pose is a scene node. The
// view matrix is simply the inverse of that node's world transform.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub fov_y_rad: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

const MIN_NEAR: f32 = 1e-3;

impl Camera {
    pub fn new(fov_y_deg: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            fov_y_rad: fov_y_deg.to_radians(),
            aspect,
            znear,
            zfar,
        }
    }

    pub fn from_lens(lens: &CameraLens, aspect: f32) -> Self {
        Self {
            fov_y_rad: lens.fov_y_rad,
            aspect,
            znear: lens.znear,
            zfar: lens.zfar,
        }
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_rad, self.aspect.max(1e-4), self.znear, self.zfar)
    }

    // Same frustum with the near plane pushed out to `near`; used for portal
    // views, where the near plane sits at the destination portal's surface.
    pub fn clipped_projection(&self, near: f32) -> Mat4 {
        let near = near.max(MIN_NEAR);
        Mat4::perspective_rh(self.fov_y_rad, self.aspect.max(1e-4), near, self.zfar.max(near + MIN_NEAR))
    }

    pub fn view_matrix(camera_world_transform: &Mat4) -> Mat4 {
        camera_world_transform.inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    #[test]
    fn clipped_projection_moves_near_plane() {
        let camera = Camera::new(75.0, 16.0 / 9.0, 0.1, 100.0);
        let clipped = camera.clipped_projection(5.0);

        // A point at exactly the clipped near distance projects to NDC z=0
        // (wgpu depth range), a point closer falls outside [0, 1].
        let on_plane = clipped * Vec4::new(0.0, 0.0, -5.0, 1.0);
        assert!((on_plane.z / on_plane.w).abs() < 1e-4);
        let closer = clipped * Vec4::new(0.0, 0.0, -1.0, 1.0);
        assert!(closer.z / closer.w < 0.0);
    }

    #[test]
    fn view_matrix_inverts_camera_pose() {
        let pose = Mat4::from_translation(Vec3::new(3.0, 1.0, -2.0));
        let view = Camera::view_matrix(&pose);
        let p = view.transform_point3(Vec3::new(3.0, 1.0, -2.0));
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn degenerate_near_is_clamped_not_nan() {
        let camera = Camera::new(75.0, 1.0, 0.1, 100.0);
        let clipped = camera.clipped_projection(0.0);
        assert!(clipped.to_cols_array().iter().all(|v| v.is_finite()));
    }
}
