//! Core annotation and decoding machinery
//!
//! Leaves first: marker colors, the table of contents, the span registry,
//! the source annotator and the decoder/exporter.

pub mod annotate;
pub mod color;
pub mod export;
pub mod registry;
pub mod toc;
