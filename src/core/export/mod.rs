//! Decoding rendered colors back into labelled records
//!
//! The extraction of the colorized PDF reports, per word and per filled
//! rectangle, the color it was drawn with. [`export`] looks every color up in
//! the [`SpanRegistry`], infers labels for words whose color was lost (ligatures,
//! hyphenation, overdrawn text) from their neighbors on the same line, and
//! returns the TOC table plus the record table sorted in reading order.

pub mod decode;
pub mod diffusion;
pub mod table;

pub use table::TocRow;

use serde::{Deserialize, Serialize};

use crate::core::registry::SpanRegistry;
use crate::core::toc::TableOfContents;
use crate::model::{Extraction, OutputRecord};

/// Options for the decode/export step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// How many list positions to look at on each side of an undecoded word
    /// Default: 20
    pub diffusion_window: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            diffusion_window: 20,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diffusion_window(mut self, window: usize) -> Self {
        self.diffusion_window = window;
        self
    }
}

/// Structured output of one document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Export {
    pub toc: Vec<TocRow>,
    pub records: Vec<OutputRecord>,
}

impl Export {
    /// Records that were decoded or inferred.
    pub fn resolved(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.iter().filter(|r| r.is_resolved())
    }
}

/// Decode an extraction against the spans allocated while annotating.
pub fn export(
    extraction: &Extraction,
    registry: &SpanRegistry,
    toc: &TableOfContents,
    options: &ExportOptions,
) -> Export {
    let mut records: Vec<OutputRecord> = extraction
        .shapes
        .iter()
        .map(|shape| decode::decode_shape(shape, registry))
        .collect();

    let mut words: Vec<OutputRecord> = extraction
        .tokens
        .iter()
        .map(|token| decode::decode_token(token, registry))
        .collect();
    let direct = words.iter().filter(|r| r.is_resolved()).count();
    let lines: Vec<(u32, u32)> = extraction
        .tokens
        .iter()
        .map(|t| (t.page, t.line_no))
        .collect();
    let inferred = diffusion::diffuse(&lines, &mut words, options.diffusion_window);

    let unresolved = words.len() - direct - inferred;
    if unresolved > 0 {
        log::warn!(
            "{} of {} words carry no known color",
            unresolved,
            words.len()
        );
    }
    log::debug!(
        "decoded {} words directly, {} by diffusion",
        direct,
        inferred
    );

    records.append(&mut words);
    sort_records(&mut records);
    Export {
        toc: table::toc_rows(toc),
        records,
    }
}

/// Order by `(reading_order, order_offset)`; unresolved records keep their
/// extraction order at the end.
pub fn sort_records(records: &mut [OutputRecord]) {
    records.sort_by(|a, b| {
        (!a.is_resolved(), a.reading_order, a.order_offset).cmp(&(
            !b.is_resolved(),
            b.reading_order,
            b.order_offset,
        ))
    });
}
