//! LaTeX color annotation
//!
//! The [`AnnotationSession`] owns all per-document state (color allocator,
//! span registry, table of contents, macro database). The [`Resolver`] walks
//! the parsed nodes of one file and appends either the original bytes or
//! color-wrapped bytes to its output buffer.

pub mod markers;
pub mod resolver;
pub mod rules;
pub mod session;

pub use markers::strip_color_markers;
pub use resolver::Resolver;
pub use session::AnnotationSession;

// =============================================================================
// Annotation Options
// =============================================================================

/// Options for source annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotateOptions {
    /// Emit neutral black/white markers and record nothing, producing a
    /// rendering with the annotated layout but no visible colors
    /// Default: false
    pub plain: bool,

    /// Descend into brace groups of at least this many bytes when a context
    /// is active; shorter groups are copied untouched
    /// Default: 200
    pub group_descend_min_bytes: usize,

    /// Follow `\input` / `\include` into the included files
    /// Default: true
    pub follow_includes: bool,
}

impl Default for AnnotateOptions {
    fn default() -> Self {
        Self {
            plain: false,
            group_descend_min_bytes: 200,
            follow_includes: true,
        }
    }
}

impl AnnotateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options for the neutral rendering pass
    pub fn plain() -> Self {
        Self {
            plain: true,
            ..Self::default()
        }
    }

    pub fn with_group_descend_min_bytes(mut self, bytes: usize) -> Self {
        self.group_descend_min_bytes = bytes;
        self
    }

    pub fn with_follow_includes(mut self, follow: bool) -> Self {
        self.follow_includes = follow;
        self
    }
}
