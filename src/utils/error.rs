//! Error handling for texrainbow
//!
//! One error type covers every fatal, per-document failure. Recoverable
//! issues (malformed source, unknown macros, undecodable colors) never become
//! errors; they are recorded as [`AnnotationWarning`]s or resolved by label
//! diffusion.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::color::Scheme;

/// Result type alias for texrainbow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Per-document failure.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing sources and outputs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Every color of the requested scheme has been issued or reserved.
    #[error("color palette exhausted for the {scheme} scheme")]
    PaletteExhausted { scheme: Scheme },

    /// An `\input`/`\include` chain loops back to a file that is still being annotated.
    #[error("cyclic include of '{}'", .path.display())]
    CyclicInclude { path: PathBuf },

    /// The TeX compiler reported failure and produced no usable output.
    #[error("LaTeX compilation failed: {}", tail(.log))]
    CompilationFailed { log: String },

    /// The TeX compiler did not finish in time and was killed.
    #[error("LaTeX compilation timed out after {seconds}s")]
    CompileTimeout { seconds: u64 },

    /// The PDF extraction collaborator failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A span manifest or palette cache could not be read back.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// No main `.tex` file could be found in a source tree.
    #[error("no main TeX file found in '{}'", .0.display())]
    MissingMainFile(PathBuf),
}

impl Error {
    pub fn extraction(message: impl Into<String>) -> Self {
        Error::Extraction(message.into())
    }

    pub fn invalid_color(value: impl Into<String>) -> Self {
        Error::InvalidColor(value.into())
    }

    pub fn invalid_manifest(message: impl Into<String>) -> Self {
        Error::InvalidManifest(message.into())
    }

    /// Short status word used in batch reports.
    pub fn status(&self) -> &'static str {
        match self {
            Error::CompilationFailed { .. } => "compile-error",
            Error::CompileTimeout { .. } => "timeout",
            Error::PaletteExhausted { .. } => "palette-exhausted",
            Error::CyclicInclude { .. } => "cyclic-include",
            Error::Extraction(_) => "extraction-error",
            _ => "error",
        }
    }
}

fn tail(log: &str) -> &str {
    const KEEP: usize = 400;
    if log.len() <= KEEP {
        return log;
    }
    let mut start = log.len() - KEEP;
    while !log.is_char_boundary(start) {
        start += 1;
    }
    &log[start..]
}

// =============================================================================
// Non-fatal diagnostics
// =============================================================================

/// Kind of non-fatal issue met while annotating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A heading macro did not map to a known table-of-contents level
    InvalidHeading,
    /// A classified macro lacked the brace argument it was expected to carry
    MissingArgument,
    /// An `\input`/`\include` target could not be found
    MissingInclude,
    /// An already annotated file was included a second time
    RepeatedInclude,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::InvalidHeading => write!(f, "invalid heading"),
            WarningKind::MissingArgument => write!(f, "missing argument"),
            WarningKind::MissingInclude => write!(f, "missing include"),
            WarningKind::RepeatedInclude => write!(f, "repeated include"),
        }
    }
}

/// A warning generated during annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationWarning {
    pub kind: WarningKind,
    pub message: String,
    /// Location context (e.g. "\\section" or "chapter1.tex")
    pub location: Option<String>,
}

impl AnnotationWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        AnnotationWarning {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for AnnotationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref loc) = self.location {
            write!(f, "[{}] {}: {}", self.kind, loc, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_exhausted_display() {
        let err = Error::PaletteExhausted {
            scheme: Scheme::Low,
        };
        assert!(err.to_string().contains("exhausted"));
        assert!(err.to_string().contains("low-precision"));
        assert_eq!(err.status(), "palette-exhausted");
    }

    #[test]
    fn test_compilation_failed_keeps_log_tail() {
        let log = format!("{}! Undefined control sequence.", "x".repeat(1000));
        let msg = Error::CompilationFailed { log }.to_string();
        assert!(msg.ends_with("! Undefined control sequence."));
        assert!(msg.len() < 500);
    }

    #[test]
    fn test_warning_display() {
        let warn = AnnotationWarning::new(WarningKind::InvalidHeading, "not a heading kind")
            .with_location("\\sectionmark");
        assert_eq!(
            warn.to_string(),
            "[invalid heading] \\sectionmark: not a heading kind"
        );
    }
}
