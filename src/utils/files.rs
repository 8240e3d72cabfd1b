//! File resolution for multi-file documents
//!
//! `\input{intro}` may refer to `intro`, `intro.tex` or `intro.latex`
//! relative to the project root. The resolver abstracts where sources live so
//! the annotator can run against a directory on disk or an in-memory project.

use fxhash::FxHashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Extensions the annotator is willing to rewrite.
pub const TEX_EXTENSIONS: &[&str] = &["tex", "latex", "cls", "sty"];

/// Error returned when an include target cannot be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResolveError {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for FileResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot resolve '{}': {}", self.name, self.reason)
    }
}

impl std::error::Error for FileResolveError {}

/// A resolved source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root, as used for output keys
    pub path: PathBuf,
    pub content: String,
}

/// Locates and reads the files named by `\input`/`\include`.
pub trait FileResolver {
    fn resolve(&self, name: &str) -> Result<SourceFile, FileResolveError>;
}

/// Whether an include target should be followed at all.
///
/// `\input{figure.pdf_tex}` and friends are left alone.
pub fn is_annotatable(name: &str) -> bool {
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        None => true,
        Some(ext) => TEX_EXTENSIONS.contains(&ext),
    }
}

/// Candidate relative paths for an include name, in lookup order.
pub fn candidates(name: &str) -> Vec<PathBuf> {
    let trimmed = name.trim();
    let base = PathBuf::from(trimmed);
    vec![
        base.clone(),
        PathBuf::from(format!("{}.tex", trimmed)),
        PathBuf::from(format!("{}.latex", trimmed)),
    ]
}

/// Resolves includes against a directory on disk.
#[derive(Debug, Clone)]
pub struct StdFileResolver {
    root: PathBuf,
}

impl StdFileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileResolver for StdFileResolver {
    fn resolve(&self, name: &str) -> Result<SourceFile, FileResolveError> {
        for rel in candidates(name) {
            let full = self.root.join(&rel);
            if full.is_file() {
                let bytes = std::fs::read(&full).map_err(|e| FileResolveError {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
                return Ok(SourceFile {
                    path: rel,
                    content: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
        }
        Err(FileResolveError {
            name: name.to_string(),
            reason: format!("no such file under {}", self.root.display()),
        })
    }
}

/// Resolves includes from an in-memory map (tests, embedding).
#[derive(Debug, Clone, Default)]
pub struct MemoryFileResolver {
    files: FxHashMap<PathBuf, String>,
}

impl MemoryFileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

impl FileResolver for MemoryFileResolver {
    fn resolve(&self, name: &str) -> Result<SourceFile, FileResolveError> {
        for rel in candidates(name) {
            if let Some(content) = self.files.get(&rel) {
                return Ok(SourceFile {
                    path: rel,
                    content: content.clone(),
                });
            }
        }
        Err(FileResolveError {
            name: name.to_string(),
            reason: "not in memory project".to_string(),
        })
    }
}

/// Resolver that never finds anything; includes are copied but not followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFileResolver;

impl FileResolver for NoopFileResolver {
    fn resolve(&self, name: &str) -> Result<SourceFile, FileResolveError> {
        Err(FileResolveError {
            name: name.to_string(),
            reason: "include resolution disabled".to_string(),
        })
    }
}
