use std::f32::consts::TAU;

/// Convert a packed `0xRRGGBB` color to normalized RGB.
pub fn hex(rgb: u32) -> [f32; 3] {
    [
        ((rgb >> 16) & 0xff) as f32 / 255.0,
        ((rgb >> 8) & 0xff) as f32 / 255.0,
        (rgb & 0xff) as f32 / 255.0,
    ]
}

/// Spiral galaxy point cloud parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GalaxyConfig {
    pub particle_count: usize,
    pub max_radius: f32,
    pub branches: u32,
    pub spin: f32,
    pub inner: [f32; 3],
    pub middle: [f32; 3],
    pub outer: [f32; 3],
}

impl Default for GalaxyConfig {
    fn default() -> Self {
        Self {
            particle_count: 8000,
            max_radius: 300.0,
            branches: 4,
            spin: 0.01,
            inner: hex(0x8B5CF6),  // violet
            middle: hex(0x06B6D4), // cyan
            outer: hex(0xEC4899),  // pink
        }
    }
}

/// Background star cube
#[derive(Debug, Clone, PartialEq)]
pub struct StarFieldConfig {
    pub count: usize,
    pub half_extent: f32,
    pub point_size: f32,
    pub color: [f32; 3],
    pub opacity: f32,
}

impl Default for StarFieldConfig {
    fn default() -> Self {
        Self {
            count: 3000,
            half_extent: 1000.0,
            point_size: 2.0,
            color: [1.0, 1.0, 1.0],
            opacity: 0.8,
        }
    }
}

/// One orbiting sphere as described in the scene config
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitingBodyConfig {
    pub radius: f32,
    pub position: [f32; 3],
    pub colors: [[f32; 3]; 2],
    pub speed: f32,
}

impl OrbitingBodyConfig {
    /// Simulation time needed for one full revolution.
    pub fn period(&self) -> f32 {
        TAU / self.speed.abs()
    }
}

pub fn default_bodies() -> Vec<OrbitingBodyConfig> {
    vec![
        OrbitingBodyConfig {
            radius: 20.0,
            position: [180.0, 80.0, -60.0],
            colors: [hex(0x8B5CF6), hex(0x06B6D4)],
            speed: 0.002,
        },
        OrbitingBodyConfig {
            radius: 15.0,
            position: [-150.0, 100.0, -50.0],
            colors: [hex(0xEC4899), hex(0x8B5CF6)],
            speed: 0.003,
        },
        OrbitingBodyConfig {
            radius: 12.0,
            position: [120.0, -80.0, -55.0],
            colors: [hex(0x06B6D4), hex(0x10B981)],
            speed: 0.0015,
        },
        OrbitingBodyConfig {
            radius: 18.0,
            position: [-100.0, -60.0, -70.0],
            colors: [hex(0xF59E0B), hex(0xEC4899)],
            speed: 0.004,
        },
    ]
}

/// Perspective camera and pointer parallax parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Fraction of the remaining distance covered each frame.
    pub smoothing: f32,
    pub pointer_gain: [f32; 2],
    pub height_offset: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 30.0, 120.0],
            fov_degrees: 75.0,
            near: 0.1,
            far: 2000.0,
            smoothing: 0.02,
            pointer_gain: [0.5, 0.3],
            height_offset: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light has fully faded out.
    pub range: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingConfig {
    pub ambient: [f32; 3],
    pub ambient_intensity: f32,
    pub points: [PointLightConfig; 2],
    /// How much the lights brighten the body colors on top of their own shading.
    pub weight: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: hex(0x404040),
            ambient_intensity: 0.4,
            points: [
                PointLightConfig {
                    position: [0.0, 0.0, 0.0],
                    color: hex(0x8B5CF6),
                    intensity: 1.0,
                    range: 1000.0,
                },
                PointLightConfig {
                    position: [200.0, 100.0, -100.0],
                    color: hex(0x06B6D4),
                    intensity: 0.5,
                    range: 800.0,
                },
            ],
            weight: 0.15,
        }
    }
}

/// How simulation time moves forward on each frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeStep {
    /// Constant increment per rendered frame; motion speed follows the refresh rate.
    Fixed(f64),
    /// Wall-clock seconds (clamped) scaled by `rate`.
    Elapsed { rate: f64 },
}

impl TimeStep {
    pub const MAX_FRAME_SECONDS: f32 = 0.05;

    /// Simulation time to add for a frame that took `dt` seconds.
    pub fn increment(&self, dt: f32) -> f64 {
        match *self {
            TimeStep::Fixed(step) => step,
            TimeStep::Elapsed { rate } => {
                f64::from(dt.clamp(0.0, Self::MAX_FRAME_SECONDS)) * rate
            }
        }
    }
}

impl Default for TimeStep {
    fn default() -> Self {
        TimeStep::Fixed(0.01)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    pub time_step: TimeStep,
    /// Galaxy rotation angle per unit of simulation time.
    pub rotation_rate: f32,
    /// Body self-rotation per frame, as a multiple of its orbital speed.
    pub spin_factor: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            time_step: TimeStep::default(),
            rotation_rate: 0.1,
            spin_factor: 2.0,
        }
    }
}

/// Everything needed to build and animate the scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    pub galaxy: GalaxyConfig,
    pub stars: StarFieldConfig,
    pub bodies: Vec<OrbitingBodyConfig>,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub motion: MotionConfig,
    /// Galaxy point size multiplier before pixel ratio.
    pub point_scale: f32,
    pub sphere_segments: u32,
    pub clear_color: [f32; 3],
    pub seed: Option<u64>,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            galaxy: GalaxyConfig::default(),
            stars: StarFieldConfig::default(),
            bodies: default_bodies(),
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            motion: MotionConfig::default(),
            point_scale: 30.0,
            sphere_segments: 32,
            clear_color: hex(0x010409),
            seed: None,
        }
    }
}

pub const SEED_VAR: &str = "GALAXY_SEED";
pub const TIME_STEP_VAR: &str = "GALAXY_TIME_STEP";

impl SceneConfig {
    /// Defaults with overrides taken from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `GALAXY_SEED` / `GALAXY_TIME_STEP` overrides from `lookup`.
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(SEED_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(seed) => {
                    log::info!("Using galaxy seed {}", seed);
                    self.seed = Some(seed);
                }
                Err(e) => log::warn!("Ignoring {}={:?}: {}", SEED_VAR, raw, e),
            }
        }

        if let Some(raw) = lookup(TIME_STEP_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "fixed" => self.motion.time_step = TimeStep::default(),
                "elapsed" => self.motion.time_step = TimeStep::Elapsed { rate: 0.6 },
                other => log::warn!(
                    "Ignoring {}={:?}: expected \"fixed\" or \"elapsed\"",
                    TIME_STEP_VAR,
                    other
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_splits_channels() {
        assert_eq!(hex(0xFF0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex(0x000000), [0.0, 0.0, 0.0]);
        let c = hex(0x8B5CF6);
        assert!((c[0] - 139.0 / 255.0).abs() < 1e-6);
        assert!((c[1] - 92.0 / 255.0).abs() < 1e-6);
        assert!((c[2] - 246.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn fixed_step_ignores_frame_duration() {
        let step = TimeStep::Fixed(0.01);
        assert_eq!(step.increment(0.0), 0.01);
        assert_eq!(step.increment(1.0), 0.01);
    }

    #[test]
    fn elapsed_step_clamps_long_frames() {
        let step = TimeStep::Elapsed { rate: 0.6 };
        assert!((step.increment(1.0 / 60.0) - 0.01).abs() < 1e-6);
        assert!((step.increment(2.0) - 0.05 * 0.6).abs() < 1e-6);
        assert_eq!(step.increment(-1.0), 0.0);
    }

    #[test]
    fn overrides_parse_seed_and_time_step() {
        let mut config = SceneConfig::default();
        config.apply_overrides(|key| match key {
            SEED_VAR => Some(" 42 ".to_string()),
            TIME_STEP_VAR => Some("Elapsed".to_string()),
            _ => None,
        });
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.motion.time_step, TimeStep::Elapsed { rate: 0.6 });
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = SceneConfig::default();
        config.apply_overrides(|key| match key {
            SEED_VAR => Some("not-a-number".to_string()),
            TIME_STEP_VAR => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config, SceneConfig::default());
    }

    #[test]
    fn default_bodies_match_landing_page() {
        let bodies = default_bodies();
        assert_eq!(bodies.len(), 4);
        assert_eq!(bodies[0].position, [180.0, 80.0, -60.0]);
        assert!((bodies[3].period() - TAU / 0.004).abs() < 1e-2);
    }
}
