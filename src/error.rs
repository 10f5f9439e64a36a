// Error types for the car viewer

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while bringing up the viewer or loading its model.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// The event loop could not be created or exited abnormally.
    #[error("event loop error: {0}")]
    EventLoop(String),

    /// The window could not be created.
    #[error("window error: {0}")]
    Window(String),

    /// The drawing surface could not be created for the window.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    /// No GPU adapter is compatible with the window surface.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// The GPU device could not be opened.
    #[error("device error: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// The model file could not be read or decoded.
    #[error("failed to load model '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    /// The background load task died before delivering a model.
    #[error("model load task failed: {0}")]
    LoadTask(String),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
