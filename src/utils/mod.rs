//! Utility modules
//!
//! - Error types and non-fatal warnings
//! - File resolution for multi-file documents

pub mod error;
pub mod files;

pub use error::{AnnotationWarning, Error, Result, WarningKind};
pub use files::{
    FileResolveError, FileResolver, MemoryFileResolver, NoopFileResolver, SourceFile,
    StdFileResolver,
};
