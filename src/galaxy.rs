use std::f32::consts::TAU;

use rand::Rng;

use crate::config::{GalaxyConfig, StarFieldConfig};

/// Per-axis jitter scale (x, y, z) around the spiral arms
pub const JITTER_SCALE: [f32; 3] = [15.0, 5.0, 15.0];

/// Radial exponent; below 1 concentrates particles toward the core
const RADIUS_EXPONENT: f32 = 0.6;
const JITTER_EXPONENT: i32 = 3;
const MIN_SIZE: f32 = 1.0;
const MAX_SIZE: f32 = 5.0;

/// Galaxy point cloud stored as parallel arrays, ready for vertex buffers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticleField {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub sizes: Vec<f32>,
}

impl ParticleField {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Unlit background stars; they share a single tint so only positions vary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StarField {
    pub positions: Vec<[f32; 3]>,
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// `u^3 * scale` with a random sign; mostly near zero, with rare outliers.
fn jitter<R: Rng + ?Sized>(rng: &mut R, scale: f32) -> f32 {
    let magnitude = rng.gen::<f32>().powi(JITTER_EXPONENT);
    let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
    magnitude * sign * scale
}

/// Radial color: inner -> middle linearly, then toward outer by sqrt of the radius fraction.
pub fn radial_color(config: &GalaxyConfig, radius: f32) -> [f32; 3] {
    let t = if config.max_radius > 0.0 {
        (radius / config.max_radius).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let mixed = lerp3(config.inner, config.middle, t);
    lerp3(mixed, config.outer, t.sqrt())
}

/// Build the spiral point cloud.
///
/// Particle `i` belongs to arm `i % branches`; its radius is drawn with a
/// center-heavy falloff and twisted by `radius * spin` before the jitter is
/// added. `branches` of zero is treated as a single arm.
pub fn generate_galaxy<R: Rng + ?Sized>(config: &GalaxyConfig, rng: &mut R) -> ParticleField {
    let count = config.particle_count;
    let branches = config.branches.max(1);

    let mut field = ParticleField {
        positions: Vec::with_capacity(count),
        colors: Vec::with_capacity(count),
        sizes: Vec::with_capacity(count),
    };

    for i in 0..count {
        let radius = rng.gen::<f32>().powf(RADIUS_EXPONENT) * config.max_radius;
        let spin_angle = radius * config.spin;
        let branch_angle = (i as u32 % branches) as f32 * TAU / branches as f32;

        let jx = jitter(rng, JITTER_SCALE[0]);
        let jy = jitter(rng, JITTER_SCALE[1]);
        let jz = jitter(rng, JITTER_SCALE[2]);

        let angle = branch_angle + spin_angle;
        field.positions.push([
            angle.cos() * radius + jx,
            jy,
            angle.sin() * radius + jz,
        ]);
        field.colors.push(radial_color(config, radius));
        field.sizes.push(rng.gen_range(MIN_SIZE..MAX_SIZE));
    }

    log::debug!(
        "Generated galaxy: {} particles across {} arms",
        field.len(),
        branches
    );
    field
}

/// Scatter stars uniformly through a cube centered on the origin.
pub fn generate_stars<R: Rng + ?Sized>(config: &StarFieldConfig, rng: &mut R) -> StarField {
    let extent = config.half_extent * 2.0;
    let positions = (0..config.count)
        .map(|_| {
            [
                (rng.gen::<f32>() - 0.5) * extent,
                (rng.gen::<f32>() - 0.5) * extent,
                (rng.gen::<f32>() - 0.5) * extent,
            ]
        })
        .collect();

    StarField { positions }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> GalaxyConfig {
        GalaxyConfig {
            particle_count: 2000,
            ..GalaxyConfig::default()
        }
    }

    #[test]
    fn produces_requested_particle_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for count in [0, 1, 17, 2000] {
            let config = GalaxyConfig {
                particle_count: count,
                ..GalaxyConfig::default()
            };
            let field = generate_galaxy(&config, &mut rng);
            assert_eq!(field.positions.len(), count);
            assert_eq!(field.colors.len(), count);
            assert_eq!(field.sizes.len(), count);
        }
    }

    #[test]
    fn particles_stay_inside_spiral_envelope() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let field = generate_galaxy(&config, &mut rng);

        let planar_jitter = JITTER_SCALE[0].hypot(JITTER_SCALE[2]);
        for p in &field.positions {
            let planar = p[0].hypot(p[2]);
            assert!(planar <= config.max_radius + planar_jitter + 1e-3, "{:?}", p);
            assert!(p[1].abs() <= JITTER_SCALE[1], "{:?}", p);
        }
    }

    #[test]
    fn colors_are_normalized() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let field = generate_galaxy(&small_config(), &mut rng);
        for c in &field.colors {
            for channel in c {
                assert!((0.0..=1.0).contains(channel), "{:?}", c);
            }
        }
    }

    #[test]
    fn sizes_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let field = generate_galaxy(&small_config(), &mut rng);
        assert!(field.sizes.iter().all(|s| (MIN_SIZE..MAX_SIZE).contains(s)));
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let config = small_config();
        let a = generate_galaxy(&config, &mut ChaCha8Rng::seed_from_u64(99));
        let b = generate_galaxy(&config, &mut ChaCha8Rng::seed_from_u64(99));

        let bytes = |f: &ParticleField| {
            let mut out = Vec::new();
            out.extend_from_slice(bytemuck::cast_slice::<[f32; 3], u8>(&f.positions));
            out.extend_from_slice(bytemuck::cast_slice::<[f32; 3], u8>(&f.colors));
            out.extend_from_slice(bytemuck::cast_slice::<f32, u8>(&f.sizes));
            out
        };
        assert_eq!(bytes(&a), bytes(&b));

        let c = generate_galaxy(&config, &mut ChaCha8Rng::seed_from_u64(100));
        assert_ne!(a.positions, c.positions);
    }

    #[test]
    fn radial_color_hits_anchors() {
        let config = GalaxyConfig::default();
        assert_eq!(radial_color(&config, 0.0), config.inner);

        // At the rim both blends are complete.
        let rim = radial_color(&config, config.max_radius);
        for (got, want) in rim.iter().zip(config.outer.iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn radial_color_blends_outer_by_sqrt() {
        let config = GalaxyConfig {
            inner: [1.0, 0.0, 0.0],
            middle: [0.0, 1.0, 0.0],
            outer: [0.0, 0.0, 1.0],
            ..GalaxyConfig::default()
        };

        // t = 0.25: inner/middle mix at 0.25, then toward outer at sqrt(0.25)
        let quarter = radial_color(&config, config.max_radius * 0.25);
        for (got, want) in quarter.iter().zip([0.375, 0.125, 0.5]) {
            assert!((got - want).abs() < 1e-6, "{:?}", quarter);
        }

        let half = radial_color(&config, config.max_radius * 0.5);
        let s = 0.5f32.sqrt();
        for (got, want) in half.iter().zip([0.5 * (1.0 - s), 0.5 * (1.0 - s), s]) {
            assert!((got - want).abs() < 1e-6, "{:?}", half);
        }
    }

    #[test]
    fn single_arm_without_spin_lies_on_positive_x() {
        let config = GalaxyConfig {
            particle_count: 500,
            branches: 1,
            spin: 0.0,
            ..GalaxyConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let field = generate_galaxy(&config, &mut rng);
        for p in &field.positions {
            assert!(p[0] >= -JITTER_SCALE[0]);
            assert!(p[2].abs() <= JITTER_SCALE[2]);
        }
    }

    #[test]
    fn zero_branches_does_not_panic() {
        let config = GalaxyConfig {
            particle_count: 10,
            branches: 0,
            ..GalaxyConfig::default()
        };
        let field = generate_galaxy(&config, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(field.len(), 10);
    }

    #[test]
    fn stars_fill_the_cube() {
        let config = StarFieldConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let stars = generate_stars(&config, &mut rng);
        assert_eq!(stars.positions.len(), config.count);
        for p in &stars.positions {
            for axis in p {
                assert!(axis.abs() <= config.half_extent);
            }
        }
    }
}
