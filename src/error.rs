//! Errors raised while bringing up the renderer

use thiserror::Error;

/// Renderer initialization failures. Any of these leaves the galaxy disabled.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("failed to create render surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("pipeline validation failed: {0}")]
    Validation(String),
}
