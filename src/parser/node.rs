//! Lowered LaTeX AST
//!
//! Every node carries the byte range it was parsed from, so the annotator can
//! copy untouched source verbatim.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A run of ordinary text, possibly containing whitespace
    Chars,
    /// `{ ... }`; `inner` excludes the braces
    Group { inner: Range<usize>, body: Vec<Node> },
    /// A known macro together with its bound arguments. `name` has no
    /// leading backslash (`\\` is stored as `"\\"`).
    Macro { name: String, args: Vec<Argument> },
    Environment {
        name: String,
        args: Vec<Argument>,
        /// Source between the header (with its arguments) and `\end{..}`
        body_range: Range<usize>,
        body: Vec<Node>,
    },
    /// Inline or display math outside an environment
    Math,
    Comment,
    Specials(Special),
    /// An unknown macro with the arguments it absorbed, or a parse error
    Unknown { name: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    /// Whitespace containing a blank line
    ParagraphBreak,
    /// Active characters and control symbols (`&`, `~`, `\%`, ...)
    Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delim {
    Star,
    Bracket,
    Brace,
}

/// A bound macro or environment argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub delim: Delim,
    /// Including the delimiters
    pub range: Range<usize>,
    /// Excluding the delimiters
    pub inner: Range<usize>,
    pub body: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, range: Range<usize>) -> Self {
        Self { kind, range }
    }

    pub fn chars(range: Range<usize>) -> Self {
        Self::new(NodeKind::Chars, range)
    }

    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.range.clone()).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_chars(&self) -> bool {
        matches!(self.kind, NodeKind::Chars)
    }

    pub fn is_whitespace(&self, source: &str) -> bool {
        self.is_chars() && self.text(source).chars().all(char::is_whitespace)
    }

    pub fn macro_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Macro { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn env_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Environment { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl Argument {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.inner.clone()).unwrap_or("")
    }
}
