//! Pipeline tests with an in-process compiler and extractor.
//!
//! The fake compiler "renders" the main file by copying its text to
//! `<main>.pdf`; the fake extractor reads the color markers back out of that
//! text, one line per source line.

use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use texrainbow::core::color::DEFAULT_PALETTE;
use texrainbow::core::export::table::JSON_FILE;
use texrainbow::pipeline::{
    find_main_file, CompiledPdf, DocumentReport, OutputFormat, PdfExtractor, Pipeline,
    PipelineOptions, TexCompiler, MANIFEST_FILE,
};
use texrainbow::{
    BBox, Color, Error, Export, ExtractedShape, ExtractedToken, Extraction, Label, SpanManifest,
};

lazy_static! {
    static ref HIGH_MARKER: Regex =
        Regex::new(r"\{\\color\[RGB\]\{(\d+), (\d+), (\d+)\}([^{}\s]+)\}").unwrap();
    static ref LOW_MARKER: Regex =
        Regex::new(r"\\colorbox\[rgb\]\{([\d.]+),([\d.]+),([\d.]+)\}\{").unwrap();
}

#[derive(Default)]
struct CopyCompiler {
    runs: AtomicUsize,
}

impl TexCompiler for CopyCompiler {
    fn compile(&self, dir: &Path) -> texrainbow::Result<CompiledPdf> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let main_file = find_main_file(dir)?.ok_or_else(|| Error::MissingMainFile(dir.into()))?;
        let text = fs::read_to_string(dir.join(&main_file))?;
        if text.contains("\\broken") {
            return Err(Error::CompilationFailed {
                log: "! Undefined control sequence.".to_string(),
            });
        }
        let pdf = dir.join(main_file.with_extension("pdf"));
        fs::write(&pdf, &text)?;
        Ok(CompiledPdf {
            pdf,
            main_file,
            log: String::new(),
        })
    }
}

struct MarkerExtractor;

impl PdfExtractor for MarkerExtractor {
    fn extract(&self, pdf: &Path) -> texrainbow::Result<Extraction> {
        let text = fs::read_to_string(pdf)?;
        let mut extraction = Extraction::default();
        for (line_no, line) in text.lines().enumerate() {
            for cap in HIGH_MARKER.captures_iter(line) {
                let channel = |i: usize| cap[i].parse::<u8>().unwrap_or(0);
                extraction.tokens.push(ExtractedToken {
                    text: cap[4].to_string(),
                    page: 1,
                    bbox: BBox::default(),
                    color: Color::Rgb([channel(1), channel(2), channel(3)]).to_string(),
                    font: "CMR10".to_string(),
                    font_size: 10.0,
                    flags: 4,
                    line_no: line_no as u32,
                });
            }
            for cap in LOW_MARKER.captures_iter(line) {
                let channel = |i: usize| cap[i].parse::<f32>().unwrap_or(0.0);
                extraction.shapes.push(ExtractedShape {
                    page: 1,
                    bbox: BBox::default(),
                    stroking_color: vec![channel(1), channel(2), channel(3)],
                });
            }
        }
        Ok(extraction)
    }
}

fn write_document(root: &Path, name: &str, body: &str) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("main.tex"),
        format!(
            "\\documentclass{{article}}\n\\usepackage{{amsmath}}\n\\begin{{document}}\n{}\n\\end{{document}}\n",
            body
        ),
    )
    .unwrap();
    dir
}

fn options(output: &Path) -> PipelineOptions {
    PipelineOptions {
        format: OutputFormat::Json,
        ..PipelineOptions::new(output)
    }
}

#[test]
fn test_process_document_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let source = write_document(
        root.path(),
        "paper",
        "\\section{Intro}\nThe cat sat.\n\\includegraphics{cat.png}",
    );
    let output = root.path().join("out");
    let pipeline = Pipeline::new(CopyCompiler::default(), MarkerExtractor, options(&output)).unwrap();

    let summary = pipeline.process_document(&source).unwrap();
    assert_eq!(summary.name, "paper");
    assert_eq!(summary.spans, 5);
    assert_eq!(summary.resolved, 5);
    // pristine, colorized, plain
    assert_eq!(pipeline_runs(&pipeline), 3);

    let doc_dir = output.join("paper");
    assert!(doc_dir.join("paper.pdf").is_file());
    let exported = Export::read_json(&doc_dir.join(JSON_FILE)).unwrap();
    let got: Vec<(Option<&str>, Option<Label>)> = exported
        .records
        .iter()
        .map(|r| (r.text.as_deref(), r.label))
        .collect();
    assert_eq!(
        got,
        vec![
            (Some("Intro"), Some(Label::Section)),
            (Some("The"), Some(Label::Paragraph)),
            (Some("cat"), Some(Label::Paragraph)),
            (Some("sat."), Some(Label::Paragraph)),
            (None, Some(Label::Figure)),
        ]
    );
    assert_eq!(exported.toc.len(), 2);
    assert_ne!(exported.records[0].block_id, exported.records[1].block_id);

    let (registry, toc) = SpanManifest::read(&doc_dir.join(MANIFEST_FILE))
        .unwrap()
        .into_parts()
        .unwrap();
    assert_eq!(registry.len(), 5);
    assert_eq!(toc.export(), vec![(1, 0)]);

    // the source tree itself is never modified
    let original = fs::read_to_string(source.join("main.tex")).unwrap();
    assert!(!original.contains("\\color"));
}

fn pipeline_runs(pipeline: &Pipeline<CopyCompiler, MarkerExtractor>) -> usize {
    pipeline.compiler().runs.load(Ordering::SeqCst)
}

#[test]
fn test_existing_document_colors_are_not_reused() {
    let root = tempfile::tempdir().unwrap();
    let [r, g, b] = DEFAULT_PALETTE.get(0).unwrap();
    let source = write_document(
        root.path(),
        "colored",
        &format!("{{\\color[RGB]{{{}, {}, {}}}Warn}}\n\nSome text", r, g, b),
    );
    let output = root.path().join("out");
    let mut opts = options(&output);
    opts.render_plain = false;
    let pipeline = Pipeline::new(CopyCompiler::default(), MarkerExtractor, opts).unwrap();
    pipeline.process_document(&source).unwrap();

    let doc_dir = output.join("colored");
    let (registry, _) = SpanManifest::read(&doc_dir.join(MANIFEST_FILE))
        .unwrap()
        .into_parts()
        .unwrap();
    assert!(registry.get(&Color::Rgb([r, g, b])).is_none());
    assert_eq!(registry.len(), 2);

    let exported = Export::read_json(&doc_dir.join(JSON_FILE)).unwrap();
    let warn = exported
        .records
        .iter()
        .find(|r| r.text.as_deref() == Some("Warn"))
        .unwrap();
    assert!(!warn.is_resolved());
    assert_eq!(exported.records.last().unwrap().text.as_deref(), Some("Warn"));
}

#[test]
fn test_batch_isolates_failures() {
    let root = tempfile::tempdir().unwrap();
    let good = write_document(root.path(), "good", "Fine words.");
    let bad = write_document(root.path(), "bad", "\\broken");
    let output = root.path().join("out");
    let mut opts = options(&output);
    opts.render_plain = false;
    let pipeline = Pipeline::new(CopyCompiler::default(), MarkerExtractor, opts).unwrap();

    let reports = pipeline.process_batch(&[good, bad]);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].name, "good");
    assert!(reports[0].is_ok());
    assert_eq!(
        reports[1],
        DocumentReport {
            name: "bad".to_string(),
            status: "compile-error".to_string(),
            message: "LaTeX compilation failed: ! Undefined control sequence.".to_string(),
        }
    );
    assert!(output.join("good").join(JSON_FILE).is_file());
    assert!(!output.join("bad").exists());
}

#[test]
fn test_palette_cache_is_created() {
    let root = tempfile::tempdir().unwrap();
    let cache = root.path().join("palette.bin");
    let mut opts = options(&root.path().join("out"));
    opts.palette_cache = Some(cache.clone());
    Pipeline::new(CopyCompiler::default(), MarkerExtractor, opts).unwrap();
    assert!(cache.is_file());
}

#[test]
fn test_repair_braces_before_annotating() {
    let root = tempfile::tempdir().unwrap();
    let source = write_document(root.path(), "stray", "Closing } too early.");
    let output = root.path().join("out");
    let mut opts = options(&output);
    opts.render_plain = false;
    opts.keep_annotated = true;
    opts.repair_braces = true;
    let pipeline = Pipeline::new(CopyCompiler::default(), MarkerExtractor, opts).unwrap();
    let summary = pipeline.process_document(&source).unwrap();
    assert_eq!(summary.spans, 3);

    let annotated =
        fs::read_to_string(output.join("stray").join("annotated").join("main.tex")).unwrap();
    assert!(!annotated.contains("Closing } too"));
    assert!(fs::read_to_string(source.join("main.tex"))
        .unwrap()
        .contains("Closing } too early."));
}
