use glam::Vec3;

use crate::config::OrbitingBodyConfig;

/// A sphere circling the origin in the XZ plane
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitingBody {
    pub radius: f32,
    pub colors: [[f32; 3]; 2],
    /// Radians of orbit per unit of simulation time; the sign picks the direction.
    pub speed: f32,
    /// Planar distance of the configured start from the origin.
    pub orbit_radius: f32,
    /// Configured start. Only `y` is used after setup: it is the orbit height.
    pub start_position: Vec3,
}

impl OrbitingBody {
    /// Position after `time` units of simulation time.
    ///
    /// Computed from scratch rather than integrated, so the orbit is exactly
    /// periodic and cannot drift. The phase is reduced in `f64` before the
    /// `f32` trig so long-running time keeps full angular precision.
    pub fn position_at(&self, time: f64) -> Vec3 {
        let angle = phase(time, self.speed);
        Vec3::new(
            angle.cos() * self.orbit_radius,
            self.start_position.y,
            angle.sin() * self.orbit_radius,
        )
    }
}

/// `time * rate` wrapped into `[0, TAU)`.
pub fn phase(time: f64, rate: f32) -> f32 {
    (time * f64::from(rate)).rem_euclid(std::f64::consts::TAU) as f32
}

/// Derive the orbiting bodies from their configuration
pub fn generate_bodies(configs: &[OrbitingBodyConfig]) -> Vec<OrbitingBody> {
    configs
        .iter()
        .map(|config| {
            let [x, y, z] = config.position;
            OrbitingBody {
                radius: config.radius,
                colors: config.colors,
                speed: config.speed,
                orbit_radius: x.hypot(z),
                start_position: Vec3::new(x, y, z),
            }
        })
        .collect()
}

/// Indexed unit UV sphere shared by every body; scaled per instance on the GPU
#[derive(Debug, Clone)]
pub struct SphereMesh {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl SphereMesh {
    pub fn uv(width_segments: u32, height_segments: u32) -> Self {
        let width_segments = width_segments.max(3);
        let height_segments = height_segments.max(2);

        let mut vertices =
            Vec::with_capacity(((width_segments + 1) * (height_segments + 1)) as usize);
        for iy in 0..=height_segments {
            let v = iy as f32 / height_segments as f32;
            let theta = v * std::f32::consts::PI;
            for ix in 0..=width_segments {
                let u = ix as f32 / width_segments as f32;
                let phi = u * std::f32::consts::TAU;
                vertices.push([
                    -phi.cos() * theta.sin(),
                    theta.cos(),
                    phi.sin() * theta.sin(),
                ]);
            }
        }

        let row = width_segments + 1;
        let mut indices = Vec::new();
        for iy in 0..height_segments {
            for ix in 0..width_segments {
                let a = iy * row + ix + 1;
                let b = iy * row + ix;
                let c = (iy + 1) * row + ix;
                let d = (iy + 1) * row + ix + 1;

                // Skip the degenerate triangles at the poles
                if iy != 0 {
                    indices.extend_from_slice(&[a, b, d]);
                }
                if iy != height_segments - 1 {
                    indices.extend_from_slice(&[b, c, d]);
                }
            }
        }

        Self { vertices, indices }
    }
}
