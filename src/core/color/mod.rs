//! Marker colors
//!
//! Two disjoint encodings are used. High-precision colors are full 8-bit RGB
//! triples drawn from a precomputed palette and applied per token with
//! `\color[RGB]`. Low-precision colors are quantized to tenths per channel and
//! applied with `\colorbox[rgb]`, which survives being overdrawn by figures and
//! drawings.

mod allocator;
mod palette;

pub use allocator::ColorAllocator;
pub use palette::{hsv_to_rgb, Palette, PaletteConfig, DEFAULT_PALETTE};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{Error, Result};

/// Number of levels per channel in the low-precision scheme (0.0 ..= 1.0).
pub const TENTH_LEVELS: u8 = 11;

/// Hard cap of distinct low-precision colors.
pub const LOW_PRECISION_CAPACITY: u16 = 11 * 11 * 11;

/// Which encoding a color belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scheme {
    /// Palette RGB, per token
    High,
    /// Tenths per channel, per whole-span colorbox
    Low,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::High => write!(f, "high-precision"),
            Scheme::Low => write!(f, "low-precision"),
        }
    }
}

/// A marker color.
///
/// Serialized as `#rrggbb` for [`Color::Rgb`] and `0.1,0.2,1` for
/// [`Color::Tenths`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Color {
    Rgb([u8; 3]),
    Tenths([u8; 3]),
}

impl Color {
    pub fn scheme(&self) -> Scheme {
        match self {
            Color::Rgb(_) => Scheme::High,
            Color::Tenths(_) => Scheme::Low,
        }
    }

    /// Low-precision color for a palette index in `0..1331`.
    pub fn tenths_from_index(index: u16) -> Option<Color> {
        if index >= LOW_PRECISION_CAPACITY {
            return None;
        }
        let levels = TENTH_LEVELS as u16;
        Some(Color::Tenths([
            (index / (levels * levels)) as u8,
            (index % (levels * levels) / levels) as u8,
            (index % levels) as u8,
        ]))
    }

    /// Quantize a unit-range RGB triple (as reported for PDF stroking colors)
    /// to the low-precision scheme. Out-of-range channels yield `None`.
    pub fn from_unit_rgb(r: f32, g: f32, b: f32) -> Option<Color> {
        let mut out = [0u8; 3];
        for (slot, value) in out.iter_mut().zip([r, g, b]) {
            if !(0.0..=1.0).contains(&value) {
                return None;
            }
            *slot = (value * 10.0).round() as u8;
        }
        Some(Color::Tenths(out))
    }

    /// Parse `#rrggbb`.
    pub fn from_hex(value: &str) -> Result<Color> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::invalid_color(value));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| Error::invalid_color(value))
        };
        Ok(Color::Rgb([channel(0)?, channel(2)?, channel(4)?]))
    }

    /// Channel list as it appears inside the LaTeX color specification.
    pub fn tex_spec(&self) -> String {
        match self {
            Color::Rgb([r, g, b]) => format!("{}, {}, {}", r, g, b),
            Color::Tenths(channels) => channels
                .iter()
                .map(|&c| tenth_str(c))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

fn tenth_str(level: u8) -> String {
    if level >= 10 {
        "1".to_string()
    } else {
        format!("0.{}", level)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Rgb([r, g, b]) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            Color::Tenths(_) => write!(f, "{}", self.tex_spec()),
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.starts_with('#') {
            return Color::from_hex(s);
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(Error::invalid_color(s));
        }
        let mut channels = [0f32; 3];
        for (slot, part) in channels.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| Error::invalid_color(s))?;
        }
        Color::from_unit_rgb(channels[0], channels[1], channels[2])
            .ok_or_else(|| Error::invalid_color(s))
    }
}

impl TryFrom<String> for Color {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}
