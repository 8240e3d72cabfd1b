//! Session-scoped color issuing.

use fxhash::FxHashSet;
use std::sync::Arc;

use super::{Color, Palette, Scheme, DEFAULT_PALETTE, LOW_PRECISION_CAPACITY};
use crate::utils::error::{Error, Result};

/// Hands out never-repeating marker colors for one document.
///
/// Colors already present in the document (reported by extracting the
/// pristine compile) are registered up front and skipped.
#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: PaletteRef,
    next_high: usize,
    next_low: u16,
    reserved: FxHashSet<Color>,
}

#[derive(Debug, Clone)]
enum PaletteRef {
    Default,
    Owned(Arc<Palette>),
}

impl PaletteRef {
    fn get(&self) -> &Palette {
        match self {
            PaletteRef::Default => &DEFAULT_PALETTE,
            PaletteRef::Owned(palette) => palette,
        }
    }
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorAllocator {
    /// Allocator over the process-wide default palette.
    pub fn new() -> Self {
        Self::from_ref(PaletteRef::Default)
    }

    /// Allocator over a custom (or cache-loaded) palette.
    pub fn with_palette(palette: Arc<Palette>) -> Self {
        Self::from_ref(PaletteRef::Owned(palette))
    }

    fn from_ref(palette: PaletteRef) -> Self {
        let mut reserved = FxHashSet::default();
        // default text and page colors
        reserved.insert(Color::Tenths([0, 0, 0]));
        reserved.insert(Color::Tenths([10, 10, 10]));
        Self {
            palette,
            next_high: 0,
            next_low: 0,
            reserved,
        }
    }

    /// Reserve a color so it is never issued.
    pub fn register_existing(&mut self, color: Color) {
        self.reserved.insert(color);
    }

    pub fn is_reserved(&self, color: &Color) -> bool {
        self.reserved.contains(color)
    }

    /// Next unused color of `scheme`.
    pub fn next_color(&mut self, scheme: Scheme) -> Result<Color> {
        loop {
            let candidate = match scheme {
                Scheme::High => {
                    let rgb = self
                        .palette
                        .get()
                        .get(self.next_high)
                        .ok_or(Error::PaletteExhausted { scheme })?;
                    self.next_high += 1;
                    Color::Rgb(rgb)
                }
                Scheme::Low => {
                    let color = Color::tenths_from_index(self.next_low)
                        .ok_or(Error::PaletteExhausted { scheme })?;
                    self.next_low += 1;
                    color
                }
            };
            // issued colors are reserved too, so a palette with duplicates
            // still never repeats
            if self.reserved.insert(candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Colors of `scheme` that can still be issued, ignoring reservations.
    pub fn remaining(&self, scheme: Scheme) -> usize {
        match scheme {
            Scheme::High => self.palette.get().len().saturating_sub(self.next_high),
            Scheme::Low => (LOW_PRECISION_CAPACITY - self.next_low.min(LOW_PRECISION_CAPACITY)) as usize,
        }
    }
}
