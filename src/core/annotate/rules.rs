//! Classification rules
//!
//! Ordered keyword tables: the first rule whose keyword occurs in the
//! lowercased name wins.

use crate::model::Label;

/// Name keywords → label, used for environments and derived contexts.
pub static LABEL_RULES: &[(&[&str], Label)] = &[
    (&["title"], Label::Title),
    (&["author", "address"], Label::Author),
    (&["abstract"], Label::Abstract),
    (&["section"], Label::Section),
    (&["footnote"], Label::Footer),
    (&["caption"], Label::Caption),
    (&["enumerate", "itemize", "list", "description"], Label::List),
    (&["bibliography"], Label::Reference),
    (&["figure"], Label::Figure),
    (&["table"], Label::Table),
];

/// Label of a context named `name`, `Paragraph` when nothing matches.
pub fn classify(name: &str) -> Label {
    let lower = name.to_lowercase();
    LABEL_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, label)| *label)
        .unwrap_or(Label::Paragraph)
}

/// Macros copied verbatim whatever the context.
pub const SKIP_MACROS: &[&str] = &[
    "maketitle",
    "\\",
    "item",
    "label",
    "linewidth",
    "textwidth",
    "columnwidth",
    "bibliographystyle",
    "and",
    "vspace",
    "hspace",
    "vfill",
    "hfill",
    "smallskip",
    "medskip",
    "bigskip",
    "newpage",
    "clearpage",
    "cleardoublepage",
    "pagebreak",
    "nopagebreak",
    "linebreak",
    "newline",
    "noindent",
];

/// Formatting wrappers that keep the surrounding label.
pub const INHERIT_MACROS: &[&str] = &[
    "textbf",
    "textit",
    "texttt",
    "textsc",
    "text",
    "underline",
    "emph",
    "scalebox",
    "resizebox",
];

/// Macro names that are headings besides anything containing `section`.
const HEADING_MACROS: &[&str] = &["chapter", "part", "paragraph", "subparagraph"];

/// How a macro invocation is annotated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroRule {
    /// `\newcommand` and friends
    Definition,
    /// `\input`, `\include`
    Include,
    Skip,
    /// `\par`
    ParagraphBreak,
    /// `\includegraphics`: low-precision Figure
    Graphics,
    /// `\lstinputlisting`: Equation
    Listing,
    /// `\titlearea{title}{authors}`
    TitleArea,
    /// `\twocolumn[..]`
    TwoColumn,
    /// `\bibliography`, `\printbibliography`
    Bibliography,
    /// Recurse into the last brace argument under `label`; push a heading
    /// named after the macro when `heading` is set
    Keyword { label: Label, heading: bool },
    /// Recurse into the last brace argument under the current label
    Inherit,
    /// Wrap whole if the macro renders text and a context is active
    Other,
}

pub fn classify_macro(name: &str) -> MacroRule {
    if crate::data::macros::is_definition(name) {
        return MacroRule::Definition;
    }
    match name {
        "input" | "include" => return MacroRule::Include,
        "par" => return MacroRule::ParagraphBreak,
        "includegraphics" => return MacroRule::Graphics,
        "lstinputlisting" => return MacroRule::Listing,
        "titlearea" => return MacroRule::TitleArea,
        "twocolumn" => return MacroRule::TwoColumn,
        _ => {}
    }
    if SKIP_MACROS.contains(&name) {
        return MacroRule::Skip;
    }

    let lower = name.to_lowercase();
    if lower.contains("bibliography") {
        return MacroRule::Bibliography;
    }
    let keyword = |label, heading| MacroRule::Keyword { label, heading };
    if lower.contains("title") {
        keyword(Label::Title, true)
    } else if lower.contains("author") || lower.contains("address") {
        keyword(Label::Author, false)
    } else if lower.contains("abstract") || lower.contains("keyword") {
        keyword(Label::Abstract, false)
    } else if lower.contains("footnote") {
        keyword(Label::Footer, false)
    } else if lower == "caption" {
        keyword(Label::Caption, false)
    } else if lower.contains("section") || HEADING_MACROS.contains(&lower.as_str()) {
        keyword(Label::Section, true)
    } else if INHERIT_MACROS.contains(&lower.as_str()) {
        MacroRule::Inherit
    } else {
        MacroRule::Other
    }
}

/// How an environment is annotated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvRule {
    /// Whole environment as Equation
    Math,
    /// Whole environment as Reference
    Bibliography,
    /// Whole environment as low-precision Figure
    Drawing,
    /// Whole environment as Table
    Tabular,
    /// Whole environment as Equation
    Verbatim,
    /// Copied untouched
    Comment,
    /// Column argument and body resolved separately
    MultiColumn,
    /// Body resolved under a derived context
    Body,
}

const DRAWING_ENVS: &[&str] = &["tikzpicture", "forest", "pspicture"];
const VERBATIM_ENVS: &[&str] = &["verbatim", "lstlisting", "minted"];

pub fn classify_environment(name: &str, is_math: bool) -> EnvRule {
    let base = name.trim_end_matches('*');
    if is_math {
        EnvRule::Math
    } else if name.contains("bibliography") {
        EnvRule::Bibliography
    } else if DRAWING_ENVS.iter().any(|d| name.contains(d)) {
        EnvRule::Drawing
    } else if name.contains("tabular") || base == "longtable" || base == "array" {
        EnvRule::Tabular
    } else if VERBATIM_ENVS.contains(&base) || base.eq_ignore_ascii_case("verbatim") {
        EnvRule::Verbatim
    } else if base == "comment" {
        EnvRule::Comment
    } else if base == "multicols" {
        EnvRule::MultiColumn
    } else {
        EnvRule::Body
    }
}
