//! Per-document annotation state

use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::markers::{plain_spec, wrap, wrap_spec};
use super::resolver::Resolver;
use super::AnnotateOptions;
use crate::core::color::{Color, ColorAllocator, Scheme};
use crate::core::registry::{SpanManifest, SpanRecord, SpanRegistry};
use crate::core::toc::TableOfContents;
use crate::data::macros::MacroDb;
use crate::model::Label;
use crate::parser;
use crate::utils::error::{AnnotationWarning, Error, Result, WarningKind};
use crate::utils::files::FileResolver;

/// Everything that must stay consistent across the files of one document.
#[derive(Debug)]
pub struct AnnotationSession {
    pub(crate) options: AnnotateOptions,
    allocator: ColorAllocator,
    registry: SpanRegistry,
    toc: TableOfContents,
    macros: MacroDb,
    reading_order: u32,
    block_id: u32,
    warnings: Vec<AnnotationWarning>,
    /// Annotated text per file, in completion order
    outputs: IndexMap<PathBuf, String>,
    include_stack: Vec<PathBuf>,
}

impl Default for AnnotationSession {
    fn default() -> Self {
        Self::new(AnnotateOptions::default())
    }
}

impl AnnotationSession {
    pub fn new(options: AnnotateOptions) -> Self {
        Self::with_allocator(options, ColorAllocator::new())
    }

    pub fn with_allocator(options: AnnotateOptions, allocator: ColorAllocator) -> Self {
        Self {
            options,
            allocator,
            registry: SpanRegistry::new(),
            toc: TableOfContents::new(),
            macros: MacroDb::new(),
            reading_order: 0,
            block_id: 0,
            warnings: Vec::new(),
            outputs: IndexMap::new(),
            include_stack: Vec::new(),
        }
    }

    pub fn options(&self) -> &AnnotateOptions {
        &self.options
    }

    /// Reserve a color found in the unmodified document.
    pub fn register_existing(&mut self, color: Color) {
        self.allocator.register_existing(color);
    }

    /// Annotate the document whose main file is `main`.
    pub fn annotate_document(&mut self, main: &str, files: &dyn FileResolver) -> Result<()> {
        let file = files
            .resolve(main)
            .map_err(|_| Error::MissingMainFile(PathBuf::from(main)))?;
        self.annotate_file(file.path, &file.content, None, files)
    }

    /// Annotate a single in-memory source and return its annotated text.
    pub fn annotate_source(
        &mut self,
        path: impl Into<PathBuf>,
        source: &str,
        files: &dyn FileResolver,
    ) -> Result<String> {
        let path = path.into();
        self.annotate_file(path.clone(), source, None, files)?;
        Ok(self.outputs.get(&path).cloned().unwrap_or_default())
    }

    /// Annotate one file under `context`, recursing into its includes.
    pub(crate) fn annotate_file(
        &mut self,
        path: PathBuf,
        source: &str,
        context: Option<Label>,
        files: &dyn FileResolver,
    ) -> Result<()> {
        if self.include_stack.contains(&path) {
            return Err(Error::CyclicInclude { path });
        }
        if self.outputs.contains_key(&path) {
            self.warn(
                AnnotationWarning::new(
                    WarningKind::RepeatedInclude,
                    "file already annotated, invocation copied",
                )
                .with_location(path.display().to_string()),
            );
            return Ok(());
        }

        log::debug!("start annotating {}", path.display());
        self.include_stack.push(path.clone());
        let nodes = parser::parse(source, &mut self.macros);
        let mut resolver = Resolver::new(self, files, source);
        let result = resolver.resolve_all(&nodes, context);
        let output = resolver.finish();
        self.include_stack.pop();
        result?;

        log::debug!("finish annotating {}", path.display());
        self.outputs.insert(path, output);
        Ok(())
    }

    /// Allocate a color for `text`, record it, and return the wrapped text.
    pub fn annotate_span(&mut self, text: &str, label: Label, scheme: Scheme) -> Result<String> {
        let marked = if self.options.plain {
            wrap_spec(scheme, plain_spec(scheme), text)
        } else {
            let color = self.allocator.next_color(scheme)?;
            self.registry.insert(
                color,
                SpanRecord {
                    label,
                    reading_order: self.reading_order,
                    section_id: self.toc.current_section_id(),
                    block_id: self.block_id,
                    source_text: text.to_string(),
                },
            );
            wrap(&color, text)
        };
        self.reading_order += 1;
        Ok(marked)
    }

    /// Advance the block counter when a context is active.
    pub(crate) fn end_block(&mut self, context: Option<Label>) {
        if context.is_some() {
            self.block_id += 1;
        }
    }

    /// Push a heading, warning when `kind` is not a heading kind.
    pub(crate) fn add_heading(&mut self, kind: &str) -> Option<u32> {
        let id = self.toc.add_node(kind);
        if id.is_none() {
            self.warn(
                AnnotationWarning::new(WarningKind::InvalidHeading, "not a heading kind")
                    .with_location(format!("\\{}", kind)),
            );
        }
        id
    }

    pub(crate) fn warn(&mut self, warning: AnnotationWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub(crate) fn macros(&self) -> &MacroDb {
        &self.macros
    }

    pub fn registry(&self) -> &SpanRegistry {
        &self.registry
    }

    pub fn toc(&self) -> &TableOfContents {
        &self.toc
    }

    pub fn warnings(&self) -> &[AnnotationWarning] {
        &self.warnings
    }

    /// Number of spans annotated so far (plain mode included).
    pub fn span_count(&self) -> u32 {
        self.reading_order
    }

    pub fn block_id(&self) -> u32 {
        self.block_id
    }

    pub fn outputs(&self) -> &IndexMap<PathBuf, String> {
        &self.outputs
    }

    pub fn output(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.outputs.get(path.as_ref()).map(String::as_str)
    }

    pub fn manifest(&self) -> SpanManifest {
        SpanManifest::new(&self.registry, &self.toc)
    }

    /// Write every annotated file below `root`, replacing the originals.
    pub fn write_outputs(&self, root: &Path) -> Result<()> {
        for (path, text) in &self.outputs {
            let target = root.join(path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, text)?;
        }
        Ok(())
    }

    pub fn into_parts(self) -> (SpanRegistry, TableOfContents) {
        (self.registry, self.toc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::files::{MemoryFileResolver, NoopFileResolver};

    #[test]
    fn test_annotate_span_records() {
        let mut session = AnnotationSession::default();
        session.add_heading("section");
        let marked = session
            .annotate_span("Intro", Label::Section, Scheme::High)
            .unwrap();
        assert!(marked.starts_with(r"{\color[RGB]{"));
        assert!(marked.ends_with("Intro}"));
        let (_, record) = session.registry().iter().next().unwrap();
        assert_eq!(record.section_id, 1);
        assert_eq!(record.reading_order, 0);
        assert_eq!(record.source_text, "Intro");
    }

    #[test]
    fn test_plain_mode_records_nothing() {
        let mut session = AnnotationSession::new(AnnotateOptions::plain());
        let marked = session
            .annotate_span("cat", Label::Paragraph, Scheme::High)
            .unwrap();
        assert_eq!(marked, r"{\color[RGB]{0, 0, 0}cat}");
        assert!(session.registry().is_empty());
        assert_eq!(session.span_count(), 1);
    }

    #[test]
    fn test_cyclic_include_fails() {
        let files = MemoryFileResolver::new()
            .with_file("main.tex", "\\begin{document}\\input{a}\\end{document}")
            .with_file("a.tex", "A \\input{b}")
            .with_file("b.tex", "B \\input{a}");
        let mut session = AnnotationSession::default();
        let err = session.annotate_document("main.tex", &files).unwrap_err();
        assert!(matches!(err, Error::CyclicInclude { ref path } if path == Path::new("a.tex")));
    }

    #[test]
    fn test_repeated_include_is_copied_once() {
        let files = MemoryFileResolver::new()
            .with_file("main.tex", "\\input{a}\n\\input{a}")
            .with_file("a.tex", "\\section{A}");
        let mut session = AnnotationSession::default();
        session.annotate_document("main.tex", &files).unwrap();
        assert_eq!(session.toc().len(), 1);
        assert!(session
            .warnings()
            .iter()
            .any(|w| w.kind == WarningKind::RepeatedInclude));
    }

    #[test]
    fn test_missing_main_file() {
        let mut session = AnnotationSession::default();
        assert!(matches!(
            session.annotate_document("main.tex", &NoopFileResolver),
            Err(Error::MissingMainFile(_))
        ));
    }
}
