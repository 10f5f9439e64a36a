//! Car Viewer: loads a glTF car model, lights it with a steerable directional
//! light, and recolors named parts on demand.

pub mod camera;
pub mod color;
pub mod commands;
pub mod config;
pub mod error;
pub mod input;
pub mod light;
pub mod loader;
pub mod math;
pub mod orbit;
pub mod presenter;
pub mod renderer;
pub mod scene;
pub mod tasks;

pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use presenter::ScenePresenter;
pub use renderer::{Renderer, ViewerEvent};
