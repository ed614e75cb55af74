use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::animation::{BodyPose, Frame};
use crate::bodies::OrbitingBody;
use crate::config::LightingConfig;

/// Camera uniform data - must match WGSL `Camera`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub eye_pos: [f32; 4],
    pub screen: [f32; 4], // x = width, y = height, z = time, w = pixel ratio
}

impl CameraUniform {
    pub fn from_frame(frame: &Frame<'_>, width: u32, height: u32, pixel_ratio: f32) -> Self {
        let camera = frame.camera;
        let eye = camera.position;
        Self {
            view_proj: camera.view_proj_matrix().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            proj: camera.proj_matrix().to_cols_array_2d(),
            eye_pos: [eye.x, eye.y, eye.z, 1.0],
            screen: [width as f32, height as f32, frame.time as f32, pixel_ratio],
        }
    }
}

/// Point cloud transform and shading - must match WGSL `Field`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FieldUniform {
    pub model: [[f32; 4]; 4],
    pub params: [f32; 4], // x = point scale in pixels, yzw unused
    pub tint: [f32; 4],   // rgb multiplier, a = opacity
}

impl FieldUniform {
    pub fn new(rotation_y: f32, point_scale: f32, tint: [f32; 3], opacity: f32) -> Self {
        Self {
            model: Mat4::from_rotation_y(rotation_y).to_cols_array_2d(),
            params: [point_scale, 0.0, 0.0, 0.0],
            tint: [tint[0], tint[1], tint[2], opacity],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct PointLightUniform {
    pub position_range: [f32; 4],
    pub color_intensity: [f32; 4],
}

/// Scene lights - must match WGSL `Lighting`
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct LightingUniform {
    pub ambient: [f32; 4], // rgb * intensity, w = light weight
    pub points: [PointLightUniform; 2],
}

impl From<&LightingConfig> for LightingUniform {
    fn from(config: &LightingConfig) -> Self {
        let a = config.ambient;
        let i = config.ambient_intensity;
        let points = config.points.map(|p| PointLightUniform {
            position_range: [p.position[0], p.position[1], p.position[2], p.range],
            color_intensity: [p.color[0], p.color[1], p.color[2], p.intensity],
        });
        Self {
            ambient: [a[0] * i, a[1] * i, a[2] * i, config.weight],
            points,
        }
    }
}

/// Per-instance sphere data - must match the body vertex layout
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BodyInstance {
    pub center_radius: [f32; 4], // xyz = world position, w = radius
    pub spin: [f32; 4],          // x = rotation about Y
    pub color_a: [f32; 4],
    pub color_b: [f32; 4],
}

impl BodyInstance {
    pub fn new(body: &OrbitingBody, pose: &BodyPose) -> Self {
        let p = pose.position;
        let [a, b] = body.colors;
        Self {
            center_radius: [p.x, p.y, p.z, body.radius],
            spin: [pose.spin, 0.0, 0.0, 0.0],
            color_a: [a[0], a[1], a[2], 1.0],
            color_b: [b[0], b[1], b[2], 1.0],
        }
    }
}

/// Maximum orbiting bodies the instance buffer holds
pub const MAX_BODIES: usize = 32;
