//! Colors as typed by the user (sRGB) and as consumed by the shader (linear).

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Names accepted in addition to hex notation.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xffffff),
    ("silver", 0xc0c0c0),
    ("gray", 0x808080),
    ("red", 0xff0000),
    ("orange", 0xffa500),
    ("yellow", 0xffff00),
    ("green", 0x008000),
    ("blue", 0x0000ff),
    ("navy", 0x000080),
    ("purple", 0x800080),
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseColorError {
    #[error("empty color")]
    Empty,
    #[error("invalid color '{0}': expected #rrggbb, #rgb, 0xrrggbb or a color name")]
    Invalid(String),
}

/// Linear-space RGBA color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build a linear color from a packed `0xRRGGBB` sRGB value.
    pub fn from_srgb_hex(hex: u32) -> Self {
        let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
        Self::rgb(channel(16), channel(8), channel(0))
    }

    /// Copy of `self` carrying the RGB of `other` and the alpha of `self`.
    pub fn with_rgb_of(self, other: Color) -> Self {
        Self {
            r: other.r,
            g: other.g,
            b: other.b,
            a: self.a,
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a,
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }

    /// Packed `0xRRGGBB` sRGB value, rounded to the nearest step.
    pub fn to_srgb_hex(self) -> u32 {
        let channel = |c: f32| (linear_to_srgb(c).clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self {
            r: c[0],
            g: c[1],
            b: c[2],
            a: c[3],
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.to_srgb_hex())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseColorError::Empty);
        }

        let lower = s.to_ascii_lowercase();
        if let Some(&(_, hex)) = NAMED_COLORS.iter().find(|(name, _)| *name == lower) {
            return Ok(Color::from_srgb_hex(hex));
        }

        let digits = lower
            .strip_prefix('#')
            .or_else(|| lower.strip_prefix("0x"))
            .unwrap_or(&lower);
        let invalid = || ParseColorError::Invalid(s.to_string());

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let hex = match digits.len() {
            6 => u32::from_str_radix(digits, 16).map_err(|_| invalid())?,
            3 => {
                // #rgb expands each nibble: #f80 -> #ff8800
                let short = u32::from_str_radix(digits, 16).map_err(|_| invalid())?;
                let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
                (r * 0x11) << 16 | (g * 0x11) << 8 | (b * 0x11)
            }
            _ => return Err(invalid()),
        };

        Ok(Color::from_srgb_hex(hex))
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_hex_forms() {
        let red: Color = "#ff0000".parse().unwrap();
        assert_relative_eq!(red.r, 1.0);
        assert_relative_eq!(red.g, 0.0);
        assert_relative_eq!(red.b, 0.0);
        assert_relative_eq!(red.a, 1.0);

        assert_eq!("0x00ff00".parse::<Color>().unwrap().to_srgb_hex(), 0x00ff00);
        assert_eq!("0000FF".parse::<Color>().unwrap().to_srgb_hex(), 0x0000ff);
        assert_eq!("#f80".parse::<Color>().unwrap().to_srgb_hex(), 0xff8800);
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Navy".parse::<Color>().unwrap().to_srgb_hex(), 0x000080);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Color>(), Err(ParseColorError::Empty));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn srgb_mid_gray_is_darker_in_linear_space() {
        let gray = Color::from_srgb_hex(0x808080);
        assert_relative_eq!(gray.r, 0.2158, epsilon = 1e-3);
        assert_eq!(gray.to_string(), "#808080");
    }

    #[test]
    fn with_rgb_of_keeps_alpha() {
        let glass = Color {
            r: 0.1,
            g: 0.1,
            b: 0.1,
            a: 0.4,
        };
        let tinted = glass.with_rgb_of(Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(tinted.to_array(), [1.0, 0.0, 0.0, 0.4]);
    }
}
