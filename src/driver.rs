use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::animation::{AnimationState, Frame};
use crate::bodies::{generate_bodies, SphereMesh};
use crate::camera::{CameraState, PointerOffset};
use crate::config::SceneConfig;
use crate::galaxy::{generate_galaxy, generate_stars, ParticleField, StarField};

/// Narrow contract between the animation core and whatever draws it
pub trait RenderAdapter {
    fn render(&mut self, frame: &Frame<'_>);
    fn resize(&mut self, width: u32, height: u32);
}

/// Static scene data produced once at startup and handed to the renderer
pub struct SceneData {
    pub config: SceneConfig,
    pub galaxy: ParticleField,
    pub stars: StarField,
    pub sphere: SphereMesh,
}

impl SceneData {
    pub fn generate(config: SceneConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let galaxy = generate_galaxy(&config.galaxy, &mut rng);
        let stars = generate_stars(&config.stars, &mut rng);
        let sphere = SphereMesh::uv(config.sphere_segments, config.sphere_segments);

        log::info!(
            "Scene: {} galaxy particles, {} stars, {} bodies",
            galaxy.len(),
            stars.positions.len(),
            config.bodies.len()
        );

        Self {
            config,
            galaxy,
            stars,
            sphere,
        }
    }
}

/// Cloneable handle that halts the frame loop
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    Running,
    /// Renderer failed to initialize; permanent until restart.
    Disabled,
    Stopped,
}

/// Owns the animation state and the renderer; the host forwards events here
pub struct GalaxyDriver<R> {
    renderer: Option<R>,
    animation: AnimationState,
    pointer: PointerOffset,
    stop: StopHandle,
    frames: u64,
}

impl<R: RenderAdapter> GalaxyDriver<R> {
    /// Generate the scene and bring up the renderer with `init`.
    ///
    /// An `init` error is logged and leaves the driver disabled: no frame is
    /// ever advanced or rendered afterwards.
    pub fn start<F, E>(config: SceneConfig, init: F) -> Self
    where
        F: FnOnce(&SceneData) -> Result<R, E>,
        E: Display,
    {
        let scene = SceneData::generate(config);

        let bodies = generate_bodies(&scene.config.bodies);
        let camera = CameraState::new(&scene.config.camera);
        let animation = AnimationState::new(bodies, camera, &scene.config.motion);
        log::info!("Time step: {:?}", animation.time_step());
        for (i, body) in scene.config.bodies.iter().enumerate() {
            log::debug!(
                "Body {}: radius {} orbit period {:.0}",
                i,
                body.radius,
                body.period()
            );
        }

        let renderer = match init(&scene) {
            Ok(renderer) => Some(renderer),
            Err(e) => {
                log::error!("Galaxy initialization failed: {}", e);
                log::warn!("3D galaxy disabled");
                None
            }
        };

        Self {
            renderer,
            animation,
            pointer: PointerOffset::default(),
            stop: StopHandle::default(),
            frames: 0,
        }
    }

    pub fn status(&self) -> DriverStatus {
        if self.renderer.is_none() {
            DriverStatus::Disabled
        } else if self.stop.is_stopped() {
            DriverStatus::Stopped
        } else {
            DriverStatus::Running
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.status() == DriverStatus::Disabled
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of frames advanced so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn animation(&self) -> &AnimationState {
        &self.animation
    }

    pub fn set_pointer(&mut self, pointer: PointerOffset) {
        self.pointer = pointer;
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        self.animation.camera.resize(width, height);
        renderer.resize(width, height);
    }

    /// Advance one display refresh and render it.
    ///
    /// Returns `false` without touching any state when disabled or stopped.
    pub fn frame(&mut self, dt: f32) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };

        let frame = self.animation.advance(dt, self.pointer);
        renderer.render(&frame);
        self.frames += 1;

        log::trace!(
            "frame {} t={:.2} rotation={:.3}",
            self.frames,
            frame.time,
            frame.galaxy_rotation
        );
        true
    }
}
