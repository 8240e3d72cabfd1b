//! texrainbow CLI - color-coded layout annotation for LaTeX documents

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use std::fs::{self, File};
#[cfg(feature = "cli")]
use std::io::BufWriter;
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::process::ExitCode;
#[cfg(feature = "cli")]
use std::sync::Arc;
#[cfg(feature = "cli")]
use std::time::Duration;
#[cfg(feature = "cli")]
use texrainbow::{
    core::export::table::JSON_FILE,
    export,
    pipeline::{self, sandbox::copy_tree, MANIFEST_FILE},
    AnnotateOptions, ColorAllocator, CommandCompiler, CommandExtractor, ExportOptions, Extraction,
    OutputFormat, Palette, PaletteConfig, Pipeline, PipelineOptions, SpanManifest,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "texrainbow")]
#[command(version)]
#[command(about = "Token-level layout annotation for LaTeX via color-coded recompilation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Annotate a source tree without compiling it
    Annotate {
        /// Source directory
        source: PathBuf,

        /// Output directory (receives a copy of the tree)
        #[arg(short, long)]
        output: PathBuf,

        /// Main file relative to the source directory (detected if omitted)
        #[arg(long)]
        main: Option<PathBuf>,

        #[command(flatten)]
        annotate: AnnotateArgs,

        /// Palette cache file
        #[arg(long)]
        palette_cache: Option<PathBuf>,
    },

    /// Decode an extraction JSON against a span manifest
    Export {
        /// Span manifest written by `annotate`
        #[arg(long)]
        manifest: PathBuf,

        /// Extraction JSON (`{"tokens": [...], "shapes": [...]}`)
        #[arg(long)]
        extraction: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Run the full pipeline on one document
    Run {
        /// Source directory
        source: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Run the full pipeline on many documents in parallel
    Batch {
        /// Source directories
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Generate the high-precision palette and cache it
    Palette {
        /// Cache file to write
        output: PathBuf,

        /// Hue steps around the circle
        #[arg(long, default_value_t = 359)]
        hue_steps: u16,

        /// Interleaved hue buckets
        #[arg(long, default_value_t = 5)]
        hue_buckets: u16,
    },
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct AnnotateArgs {
    /// Neutral colors, no span records
    #[arg(long)]
    plain: bool,

    /// Minimum size of a brace group worth descending into
    #[arg(long, default_value_t = 200)]
    group_min_bytes: usize,

    /// Do not follow \input / \include
    #[arg(long)]
    no_includes: bool,
}

#[cfg(feature = "cli")]
impl AnnotateArgs {
    fn options(&self) -> AnnotateOptions {
        AnnotateOptions {
            plain: self.plain,
            ..AnnotateOptions::new()
        }
        .with_group_descend_min_bytes(self.group_min_bytes)
        .with_follow_includes(!self.no_includes)
    }
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Tsv,
    Json,
}

#[cfg(feature = "cli")]
impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Tsv => OutputFormat::Tsv,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ExportArgs {
    /// Output format of the record table
    #[arg(short, long, value_enum, default_value_t = Format::Tsv)]
    format: Format,

    /// Neighbor positions searched on each side of an undecoded word
    #[arg(long, default_value_t = 20)]
    window: usize,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct PipelineArgs {
    /// Output directory
    #[arg(short, long, default_value = "outputs")]
    output: PathBuf,

    /// Compiler program, run in the source directory with the main file appended
    #[arg(long, default_value = "latexmk")]
    compiler: String,

    /// Extra compiler argument (repeatable; replaces the latexmk defaults)
    #[arg(long = "compiler-arg", allow_hyphen_values = true)]
    compiler_args: Vec<String>,

    /// Extraction program, run with the PDF path appended, printing JSON
    #[arg(long)]
    extractor: String,

    /// Extra extractor argument (repeatable)
    #[arg(long = "extractor-arg", allow_hyphen_values = true)]
    extractor_args: Vec<String>,

    /// Per-compile timeout in seconds
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Palette cache file
    #[arg(long)]
    palette_cache: Option<PathBuf>,

    /// Skip the plain-mode rendering
    #[arg(long)]
    no_plain: bool,

    /// Keep the annotated sources next to the outputs
    #[arg(long)]
    keep_annotated: bool,

    /// Drop unbalanced braces from the sources before compiling
    #[arg(long)]
    repair_braces: bool,

    #[command(flatten)]
    annotate: AnnotateArgs,

    #[command(flatten)]
    export: ExportArgs,
}

#[cfg(feature = "cli")]
impl PipelineArgs {
    fn build(&self) -> texrainbow::Result<Pipeline<CommandCompiler, CommandExtractor>> {
        let timeout = Duration::from_secs(self.timeout);
        let compiler = if self.compiler == "latexmk" && self.compiler_args.is_empty() {
            CommandCompiler::latexmk(timeout)
        } else {
            CommandCompiler::new(&self.compiler, self.compiler_args.clone(), timeout)
        };
        let extractor = CommandExtractor::new(&self.extractor, self.extractor_args.clone());
        let options = PipelineOptions {
            output_dir: self.output.clone(),
            compile_timeout: timeout,
            palette_cache: self.palette_cache.clone(),
            annotate: self.annotate.options(),
            export: ExportOptions::new().with_diffusion_window(self.export.window),
            format: self.export.format.into(),
            render_plain: !self.no_plain,
            keep_annotated: self.keep_annotated,
            repair_braces: self.repair_braces,
        };
        Pipeline::new(compiler, extractor, options)
    }
}

#[cfg(feature = "cli")]
fn allocator(palette_cache: Option<&Path>) -> texrainbow::Result<ColorAllocator> {
    Ok(match palette_cache {
        Some(path) => ColorAllocator::with_palette(Arc::new(Palette::load_or_generate(
            path,
            &PaletteConfig::default(),
        )?)),
        None => ColorAllocator::new(),
    })
}

#[cfg(feature = "cli")]
fn run(command: Commands) -> texrainbow::Result<bool> {
    match command {
        Commands::Annotate {
            source,
            output,
            main,
            annotate,
            palette_cache,
        } => {
            let main = match main {
                Some(main) => main,
                None => pipeline::require_main_file(&source)?,
            };
            fs::create_dir_all(&output)?;
            copy_tree(&source, &output)?;
            let session = pipeline::annotate_directory(
                &output,
                &output,
                &main,
                &annotate.options(),
                allocator(palette_cache.as_deref())?,
                &[],
            )?;
            for warning in session.warnings() {
                eprintln!("warning: {}", warning);
            }
            if !annotate.plain {
                session.manifest().write(&output.join(MANIFEST_FILE))?;
            }
            println!(
                "annotated {} file(s), {} span(s), {} heading(s)",
                session.outputs().len(),
                session.span_count(),
                session.toc().len()
            );
            Ok(true)
        }

        Commands::Export {
            manifest,
            extraction,
            output,
            export: args,
        } => {
            let (registry, toc) = SpanManifest::read(&manifest)?.into_parts()?;
            let text = fs::read_to_string(&extraction)?;
            let extraction: Extraction = serde_json::from_str(&text)?;
            let options = ExportOptions::new().with_diffusion_window(args.window);
            let exported = export(&extraction, &registry, &toc, &options);
            match OutputFormat::from(args.format) {
                OutputFormat::Tsv => exported.write_tsv(&output)?,
                OutputFormat::Json => exported.write_json(&output.join(JSON_FILE))?,
            }
            println!(
                "{} record(s), {} resolved",
                exported.records.len(),
                exported.resolved().count()
            );
            Ok(true)
        }

        Commands::Run {
            source,
            pipeline: args,
        } => {
            let summary = args.build()?.process_document(&source)?;
            println!(
                "{}: {} span(s), {}/{} record(s) resolved",
                summary.name, summary.spans, summary.resolved, summary.records
            );
            Ok(true)
        }

        Commands::Batch {
            sources,
            jobs,
            pipeline: args,
        } => {
            if let Some(jobs) = jobs {
                if let Err(e) = rayon::ThreadPoolBuilder::new()
                    .num_threads(jobs)
                    .build_global()
                {
                    log::warn!("cannot size the worker pool: {}", e);
                }
            }
            let runner = args.build()?;
            let reports = runner.process_batch(&sources);
            fs::create_dir_all(&args.output)?;
            let report_path = args.output.join("report.tsv");
            pipeline::write_reports(&reports, BufWriter::new(File::create(&report_path)?))?;

            let failed = reports.iter().filter(|r| !r.is_ok()).count();
            println!(
                "{} document(s), {} failed, report in {}",
                reports.len(),
                failed,
                report_path.display()
            );
            Ok(failed == 0)
        }

        Commands::Palette {
            output,
            hue_steps,
            hue_buckets,
        } => {
            let config = PaletteConfig {
                hue_steps,
                hue_buckets,
                ..PaletteConfig::default()
            };
            let palette = Palette::generate(&config);
            palette.save(&output)?;
            println!("{} colors written to {}", palette.len(), output.display());
            Ok(true)
        }
    }
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
}
