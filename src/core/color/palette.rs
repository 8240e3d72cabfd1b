//! High-precision palette generation and persistence.

use fxhash::FxHashSet;
use lazy_static::lazy_static;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::utils::error::{Error, Result};

const CACHE_MAGIC: &[u8; 8] = b"TXRBPAL1";

/// Parameters of the HSV sweep that produces the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteConfig {
    /// Hues are `i / hue_steps` for `i in 0..hue_steps`
    pub hue_steps: u16,
    /// Number of interleaved hue buckets (`i mod buckets`)
    pub hue_buckets: u16,
    /// Saturation/value numerators, divided by 256, walked from `sv_start`
    /// down to `sv_stop` (inclusive)
    pub sv_start: u16,
    pub sv_stop: u16,
    pub sv_step: u16,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            hue_steps: 359,
            hue_buckets: 5,
            sv_start: 256,
            sv_stop: 51,
            sv_step: 4,
        }
    }
}

impl PaletteConfig {
    fn sv_levels(&self) -> Vec<f64> {
        let step = self.sv_step.max(1) as usize;
        (self.sv_stop..=self.sv_start)
            .rev()
            .step_by(step)
            .map(|n| n as f64 / 256.0)
            .collect()
    }

    fn header(&self) -> [u16; 5] {
        [
            self.hue_steps,
            self.hue_buckets,
            self.sv_start,
            self.sv_stop,
            self.sv_step,
        ]
    }
}

lazy_static! {
    /// Palette for the default configuration, computed on first use.
    pub static ref DEFAULT_PALETTE: Palette = Palette::generate(&PaletteConfig::default());
}

/// Deduplicated, perceptually ordered RGB sequence.
///
/// Every prefix cycles through all hue buckets before lowering saturation or
/// value, so even the first few hundred colors are spread around the wheel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    config: PaletteConfig,
    colors: Vec<[u8; 3]>,
}

impl Palette {
    pub fn generate(config: &PaletteConfig) -> Self {
        let steps = config.hue_steps.max(1);
        let buckets = config.hue_buckets.clamp(1, steps);
        let hues: Vec<Vec<f64>> = (0..buckets)
            .map(|b| {
                (b..steps)
                    .step_by(buckets as usize)
                    .map(|i| i as f64 / steps as f64)
                    .collect()
            })
            .collect();
        let levels = config.sv_levels();

        let mut seen = FxHashSet::default();
        let mut colors = Vec::new();
        for &s in &levels {
            for &v in &levels {
                for bucket in &hues {
                    for &h in bucket {
                        let rgb = hsv_to_rgb(h, s, v);
                        if seen.insert(rgb) {
                            colors.push(rgb);
                        }
                    }
                }
            }
        }
        log::debug!(
            "generated palette of {} colors from {} candidates",
            colors.len(),
            levels.len() * levels.len() * steps as usize
        );
        Self {
            config: *config,
            colors,
        }
    }

    /// Load the palette from `path` if it was written for the same
    /// configuration, otherwise generate it and write the cache.
    pub fn load_or_generate(path: &Path, config: &PaletteConfig) -> Result<Self> {
        if path.is_file() {
            match Self::load(path) {
                Ok(palette) if palette.config == *config => return Ok(palette),
                Ok(_) => log::debug!("palette cache {} is stale", path.display()),
                Err(e) => log::warn!("ignoring palette cache {}: {}", path.display(), e),
            }
        }
        let palette = Self::generate(config);
        palette.save(path)?;
        Ok(palette)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let header_len = CACHE_MAGIC.len() + 5 * 2 + 4;
        if bytes.len() < header_len || &bytes[..CACHE_MAGIC.len()] != CACHE_MAGIC {
            return Err(Error::invalid_manifest("not a palette cache"));
        }
        let mut fields = [0u16; 5];
        for (i, field) in fields.iter_mut().enumerate() {
            let at = CACHE_MAGIC.len() + i * 2;
            *field = u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        }
        let at = CACHE_MAGIC.len() + 10;
        let count =
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize;
        let body = &bytes[header_len..];
        if body.len() != count * 3 {
            return Err(Error::invalid_manifest("truncated palette cache"));
        }
        let colors = body.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        let config = PaletteConfig {
            hue_steps: fields[0],
            hue_buckets: fields[1],
            sv_start: fields[2],
            sv_stop: fields[3],
            sv_step: fields[4],
        };
        Ok(Self { config, colors })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(CACHE_MAGIC)?;
        for field in self.config.header() {
            file.write_all(&field.to_le_bytes())?;
        }
        file.write_all(&(self.colors.len() as u32).to_le_bytes())?;
        let body: Vec<u8> = self.colors.iter().flatten().copied().collect();
        file.write_all(&body)?;
        Ok(())
    }

    pub fn config(&self) -> &PaletteConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<[u8; 3]> {
        self.colors.get(index).copied()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }
}

/// HSV → 8-bit RGB with truncation, channel values in `0.0..=1.0`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> [u8; 3] {
    let (r, g, b) = if s == 0.0 {
        (v, v, v)
    } else {
        let i = (h * 6.0).floor();
        let f = h * 6.0 - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        match (i as i64).rem_euclid(6) {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        }
    };
    let byte = |x: f64| (x * 255.0).clamp(0.0, 255.0) as u8;
    [byte(r), byte(g), byte(b)]
}
