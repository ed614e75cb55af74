use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Pointer displacement from the viewport center, in hundreds of logical pixels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerOffset {
    pub x: f32,
    pub y: f32,
}

impl PointerOffset {
    const PIXELS_PER_UNIT: f32 = 100.0;

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Map a cursor position to an offset from the viewport center.
    pub fn from_cursor(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x: (x - width / 2.0) / Self::PIXELS_PER_UNIT,
            y: (y - height / 2.0) / Self::PIXELS_PER_UNIT,
        }
    }
}

/// Perspective camera that always looks at the world origin
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    /// Parallax parameters
    smoothing: f32,
    pointer_gain: [f32; 2],
    height_offset: f32,
}

impl CameraState {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            target: Vec3::ZERO,
            fov: config.fov_degrees.to_radians(),
            aspect: 16.0 / 9.0,
            near: config.near,
            far: config.far,
            smoothing: config.smoothing,
            pointer_gain: config.pointer_gain,
            height_offset: config.height_offset,
        }
    }

    /// Where the camera settles if the pointer stays at `pointer`.
    pub fn rest_position(&self, pointer: PointerOffset) -> (f32, f32) {
        (
            pointer.x * self.pointer_gain[0],
            -pointer.y * self.pointer_gain[1] + self.height_offset,
        )
    }

    /// One step of exponential smoothing toward the pointer-derived target.
    /// Depth is left alone and the camera is re-aimed at the origin.
    pub fn follow_pointer(&mut self, pointer: PointerOffset) {
        let (tx, ty) = self.rest_position(pointer);
        self.position.x += (tx - self.position.x) * self.smoothing;
        self.position.y += (ty - self.position.y) * self.smoothing;
        self.target = Vec3::ZERO;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn proj_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_proj_matrix(&self) -> Mat4 {
        self.proj_matrix() * self.view_matrix()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_at_center_is_zero_offset() {
        let offset = PointerOffset::from_cursor(800.0, 450.0, 1600.0, 900.0);
        assert_eq!(offset, PointerOffset::default());

        let corner = PointerOffset::from_cursor(0.0, 900.0, 1600.0, 900.0);
        assert_eq!(corner, PointerOffset::new(-8.0, 4.5));
    }

    #[test]
    fn starts_at_configured_position() {
        let cam = CameraState::new(&CameraConfig::default());
        assert_eq!(cam.position, Vec3::new(0.0, 30.0, 120.0));
        assert_eq!(cam.target, Vec3::ZERO);
    }

    #[test]
    fn single_step_moves_two_percent() {
        let mut cam = CameraState::new(&CameraConfig::default());
        cam.follow_pointer(PointerOffset::new(10.0, 0.0));
        // target x = 5, start 0
        assert!((cam.position.x - 0.1).abs() < 1e-6);
        // y already at rest for a centered pointer
        assert!((cam.position.y - 30.0).abs() < 1e-6);
        assert_eq!(cam.position.z, 120.0);
    }

    #[test]
    fn smoothing_converges_without_overshoot() {
        let mut cam = CameraState::new(&CameraConfig::default());
        let pointer = PointerOffset::new(-7.5, 4.0);
        let (tx, ty) = cam.rest_position(pointer);
        assert!((tx - -3.75).abs() < 1e-6);
        assert!((ty - 28.8).abs() < 1e-5);

        let mut prev_dx = (tx - cam.position.x).abs();
        let mut prev_dy = (ty - cam.position.y).abs();
        let sign_x = (tx - cam.position.x).signum();
        let sign_y = (ty - cam.position.y).signum();

        for _ in 0..1000 {
            cam.follow_pointer(pointer);
            let ex = tx - cam.position.x;
            let ey = ty - cam.position.y;

            assert!(ex.abs() <= prev_dx);
            assert!(ey.abs() <= prev_dy);
            // Never crosses the target
            assert!(ex == 0.0 || ex.signum() == sign_x);
            assert!(ey == 0.0 || ey.signum() == sign_y);

            prev_dx = ex.abs();
            prev_dy = ey.abs();
        }

        assert!(prev_dx < 1e-3);
        assert!(prev_dy < 1e-3);
        assert_eq!(cam.position.z, 120.0);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut cam = CameraState::new(&CameraConfig::default());
        cam.resize(1920, 1080);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        cam.resize(100, 0);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }
}
