//! # texrainbow
//!
//! Token-level semantic layout recovery for LaTeX documents.
//!
//! Every classified span of the source (title, author, section heading,
//! paragraph words, captions, equations, figures, ...) is wrapped with a
//! unique color. The document is recompiled by an ordinary TeX compiler and
//! the colors observed in the resulting PDF are decoded back into labels,
//! reading order, block ids and a table of contents.
//!
//! ## Example
//!
//! ```rust
//! use texrainbow::{strip_color_markers, AnnotationSession, NoopFileResolver};
//!
//! let source = r"\section{A} Hello world.";
//! let mut session = AnnotationSession::default();
//! let annotated = session
//!     .annotate_source("main.tex", source, &NoopFileResolver)
//!     .unwrap();
//! assert_eq!(strip_color_markers(&annotated), source);
//! assert_eq!(session.toc().export(), vec![(1, 0)]);
//! ```

pub mod core;
pub mod data;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod preamble;
pub mod utils;

pub use crate::core::annotate::{strip_color_markers, AnnotateOptions, AnnotationSession};
pub use crate::core::color::{Color, ColorAllocator, Palette, PaletteConfig, Scheme};
pub use crate::core::export::{export, Export, ExportOptions, TocRow};
pub use crate::core::registry::{SpanManifest, SpanRecord, SpanRegistry};
pub use crate::core::toc::TableOfContents;
pub use crate::model::{
    decompose_font_flags, BBox, ExtractedShape, ExtractedToken, Extraction, Label, OutputRecord,
};
pub use crate::pipeline::{
    CommandCompiler, CommandExtractor, DocumentReport, OutputFormat, PdfExtractor, Pipeline,
    PipelineOptions, TexCompiler,
};
pub use crate::utils::error::{AnnotationWarning, Error, Result, WarningKind};
pub use crate::utils::files::{FileResolver, MemoryFileResolver, NoopFileResolver, StdFileResolver};
