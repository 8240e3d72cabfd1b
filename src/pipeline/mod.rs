//! Per-document pipeline
//!
//! One document goes through three compiles, each in its own sandbox:
//!
//! 1. the pristine sources, to learn which colors the document already uses;
//! 2. the colorized sources, whose extraction is decoded into records;
//! 3. optionally, the plain-mode sources, giving a clean PDF with the same
//!    layout as the colorized one.
//!
//! The compiler and extractor are collaborators behind [`TexCompiler`] and
//! [`PdfExtractor`].

pub mod batch;
pub mod compiler;
pub mod extractor;
pub mod sandbox;

pub use batch::{write_reports, DocumentReport};
pub use compiler::{CommandCompiler, CompiledPdf, TexCompiler};
pub use extractor::{existing_colors, CommandExtractor, PdfExtractor};
pub use sandbox::{find_main_file, Sandbox};

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::annotate::{AnnotateOptions, AnnotationSession};
use crate::core::color::{Color, ColorAllocator, Palette, PaletteConfig};
use crate::core::export::{export, table::JSON_FILE, ExportOptions};
use crate::preamble::{inject_color_preamble, prepend_pdf_header, remove_mismatched_braces};
use crate::utils::error::{Error, Result};
use crate::utils::files::StdFileResolver;

/// Span manifest written next to the exported tables.
pub const MANIFEST_FILE: &str = "spans.json";

/// Record table format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Tsv,
    Json,
}

/// Options for [`Pipeline`]
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Each document writes into `output_dir/<document name>/`
    pub output_dir: PathBuf,

    /// Wall-clock limit per compiler run
    /// Default: 10 minutes
    pub compile_timeout: Duration,

    /// Where the generated palette is cached between runs
    /// Default: none (generated in memory)
    pub palette_cache: Option<PathBuf>,

    pub annotate: AnnotateOptions,
    pub export: ExportOptions,
    pub format: OutputFormat,

    /// Also compile the plain-mode sources and keep that PDF
    /// Default: true
    pub render_plain: bool,

    /// Keep a copy of the annotated sources under `annotated/`
    /// Default: false
    pub keep_annotated: bool,

    /// Drop unbalanced braces from the root sources before every compile
    /// Default: false
    pub repair_braces: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            compile_timeout: Duration::from_secs(600),
            palette_cache: None,
            annotate: AnnotateOptions::default(),
            export: ExportOptions::default(),
            format: OutputFormat::default(),
            render_plain: true,
            keep_annotated: false,
            repair_braces: false,
        }
    }
}

impl PipelineOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}

/// Outcome of one successfully processed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub name: String,
    pub spans: usize,
    pub records: usize,
    pub resolved: usize,
    pub warnings: usize,
}

/// Directory name used for a document's outputs.
pub fn document_name(source: &Path) -> String {
    source
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Annotate the tree at `source` into `target` (a copy of the tree), adding
/// the color preamble to the main file. `existing` colors are never issued.
pub fn annotate_directory(
    source: &Path,
    target: &Path,
    main: &Path,
    options: &AnnotateOptions,
    allocator: ColorAllocator,
    existing: &[Color],
) -> Result<AnnotationSession> {
    let mut session = AnnotationSession::with_allocator(options.clone(), allocator);
    for color in existing {
        session.register_existing(*color);
    }
    session.annotate_document(&main.to_string_lossy(), &StdFileResolver::new(source))?;
    session.write_outputs(target)?;

    let main_path = target.join(main);
    let bytes = fs::read(&main_path)?;
    fs::write(
        &main_path,
        inject_color_preamble(&String::from_utf8_lossy(&bytes)),
    )?;
    for warning in session.warnings() {
        log::debug!("{}: {}", main.display(), warning);
    }
    Ok(session)
}

pub struct Pipeline<C, E> {
    compiler: C,
    extractor: E,
    options: PipelineOptions,
    palette: Option<Arc<Palette>>,
}

impl<C: TexCompiler, E: PdfExtractor> Pipeline<C, E> {
    /// Build a pipeline, loading (or generating and caching) the palette.
    pub fn new(compiler: C, extractor: E, options: PipelineOptions) -> Result<Self> {
        let palette = match &options.palette_cache {
            Some(path) => Some(Arc::new(Palette::load_or_generate(
                path,
                &PaletteConfig::default(),
            )?)),
            None => None,
        };
        Ok(Self {
            compiler,
            extractor,
            options,
            palette,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    fn allocator(&self) -> ColorAllocator {
        match &self.palette {
            Some(palette) => ColorAllocator::with_palette(Arc::clone(palette)),
            None => ColorAllocator::new(),
        }
    }

    /// Run the full pipeline on one source directory.
    pub fn process_document(&self, source: &Path) -> Result<DocumentSummary> {
        let name = document_name(source);
        let out_dir = self.options.output_dir.join(&name);
        log::info!("processing {}", name);

        let pristine = self.sandbox(source)?;
        pristine.rewrite_root_sources(prepend_pdf_header)?;
        let compiled = self.compiler.compile(pristine.path())?;
        let existing = existing_colors(&self.extractor.extract(&compiled.pdf)?);
        let main = compiled.main_file;
        drop(pristine);

        let options = AnnotateOptions {
            plain: false,
            ..self.options.annotate.clone()
        };
        let (colored, session) = self.annotate_in_sandbox(source, &main, &options, &existing)?;
        let compiled = self.compiler.compile(colored.path())?;
        let extraction = self.extractor.extract(&compiled.pdf)?;
        let exported = export(
            &extraction,
            session.registry(),
            session.toc(),
            &self.options.export,
        );

        fs::create_dir_all(&out_dir)?;
        match self.options.format {
            OutputFormat::Tsv => exported.write_tsv(&out_dir)?,
            OutputFormat::Json => exported.write_json(&out_dir.join(JSON_FILE))?,
        }
        session.manifest().write(&out_dir.join(MANIFEST_FILE))?;
        if self.options.keep_annotated {
            session.write_outputs(&out_dir.join("annotated"))?;
        }
        drop(colored);

        if self.options.render_plain {
            let plain = AnnotateOptions {
                plain: true,
                ..self.options.annotate.clone()
            };
            let (sandbox, _) = self.annotate_in_sandbox(source, &main, &plain, &[])?;
            let compiled = self.compiler.compile(sandbox.path())?;
            fs::copy(&compiled.pdf, out_dir.join(format!("{}.pdf", name)))?;
        }

        let summary = DocumentSummary {
            name,
            spans: session.registry().len(),
            records: exported.records.len(),
            resolved: exported.resolved().count(),
            warnings: session.warnings().len(),
        };
        log::info!(
            "{}: {} spans, {}/{} records resolved",
            summary.name,
            summary.spans,
            summary.resolved,
            summary.records
        );
        Ok(summary)
    }

    fn sandbox(&self, source: &Path) -> Result<Sandbox> {
        let sandbox = Sandbox::copy_from(source)?;
        if self.options.repair_braces {
            sandbox.rewrite_root_sources(remove_mismatched_braces)?;
        }
        Ok(sandbox)
    }

    fn annotate_in_sandbox(
        &self,
        source: &Path,
        main: &Path,
        options: &AnnotateOptions,
        existing: &[Color],
    ) -> Result<(Sandbox, AnnotationSession)> {
        let sandbox = self.sandbox(source)?;
        let session = annotate_directory(
            sandbox.path(),
            sandbox.path(),
            main,
            options,
            self.allocator(),
            existing,
        )?;
        Ok((sandbox, session))
    }
}

/// Main file of an uncompiled source tree.
pub fn require_main_file(dir: &Path) -> Result<PathBuf> {
    find_main_file(dir)?.ok_or_else(|| Error::MissingMainFile(dir.to_path_buf()))
}
