//! Command-line configuration.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use thiserror::Error;

use crate::color::{Color, ParseColorError};
use crate::light;

/// Colors bound to keys 1 through 9.
pub const DEFAULT_PALETTE: [&str; 9] = [
    "#b71c1c", "#0d47a1", "#1b5e20", "#f9a825", "#ffffff", "#212121", "#9e9e9e", "#e65100",
    "#4a148c",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaintSpecError {
    #[error("expected PART=COLOR, got '{0}'")]
    MissingSeparator(String),
    #[error("part name is empty in '{0}'")]
    EmptyPart(String),
    #[error(transparent)]
    Color(#[from] ParseColorError),
}

/// `PART=COLOR` pair given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintSpec {
    pub part: String,
    pub color: Color,
}

impl FromStr for PaintSpec {
    type Err = PaintSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (part, color) = s
            .split_once('=')
            .ok_or_else(|| PaintSpecError::MissingSeparator(s.to_string()))?;
        let part = part.trim();
        if part.is_empty() {
            return Err(PaintSpecError::EmptyPart(s.to_string()));
        }
        Ok(Self {
            part: part.to_string(),
            color: color.parse()?,
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "car-viewer")]
#[command(author, version, about = "Interactive glTF car viewer with part recoloring")]
pub struct ViewerConfig {
    /// Model file to display (.glb or .gltf)
    #[arg(default_value = "assets/car.glb")]
    pub model: PathBuf,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Vertical field of view in degrees
    #[arg(long, default_value_t = 75.0, value_parser = parse_fov)]
    pub fov: f32,

    /// Near clip plane distance
    #[arg(long, default_value_t = 0.1)]
    pub near: f32,

    /// Far clip plane distance
    #[arg(long, default_value_t = 1000.0)]
    pub far: f32,

    /// Clear color behind the model
    #[arg(long, default_value = "#cccccc")]
    pub background: Color,

    /// Ambient light color
    #[arg(long, default_value = "#404040")]
    pub ambient: Color,

    /// Directional light intensity
    #[arg(long, default_value_t = 0.5)]
    pub light_intensity: f32,

    /// Distance of the directional light from the origin
    #[arg(long, default_value_t = light::DEFAULT_RADIUS)]
    pub light_radius: f32,

    /// Radians the light moves per arrow key press
    #[arg(long, default_value_t = light::DEFAULT_STEP)]
    pub light_step: f32,

    /// Paint a part once the model is ready (repeatable), e.g. --paint body=#ff0000
    #[arg(long = "paint", value_name = "PART=COLOR")]
    pub paints: Vec<PaintSpec>,

    /// Colors for keys 1-9, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PALETTE.map(String::from))]
    pub palette: Vec<String>,

    /// Read viewer commands from stdin
    #[arg(long)]
    pub commands: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::parse_from(["car-viewer"])
    }
}

impl ViewerConfig {
    pub fn fov_radians(&self) -> f32 {
        self.fov.to_radians()
    }

    /// Palette entries that parse; broken ones are reported and skipped.
    pub fn palette_colors(&self) -> Vec<Color> {
        self.palette
            .iter()
            .filter_map(|entry| match entry.parse() {
                Ok(color) => Some(color),
                Err(e) => {
                    log::warn!("ignoring palette entry: {e}");
                    None
                }
            })
            .take(9)
            .collect()
    }
}

fn parse_fov(s: &str) -> Result<f32, String> {
    let fov: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if fov > 0.0 && fov < 180.0 {
        Ok(fov)
    } else {
        Err(format!("field of view must be between 0 and 180 degrees, got {fov}"))
    }
}
