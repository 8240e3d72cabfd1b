//! Macro and environment database
//!
//! Argument specs use one letter per argument: `*` an optional star,
//! `[` an optional bracket argument, `{` a mandatory brace argument.
//! Builtins cover the LaTeX kernel and the common article-class packages;
//! definitions found in the document itself are learnt while binding.

use fxhash::FxHashMap;
use phf::phf_map;

/// Builtin macro entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacroSpec {
    pub args: &'static str,
    /// Whether the macro typesets visible text of its own
    pub renders_text: bool,
}

/// Builtin environment entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvSpec {
    pub args: &'static str,
    pub math: bool,
}

const fn text(args: &'static str) -> MacroSpec {
    MacroSpec {
        args,
        renders_text: true,
    }
}

const fn silent(args: &'static str) -> MacroSpec {
    MacroSpec {
        args,
        renders_text: false,
    }
}

const fn env(args: &'static str) -> EnvSpec {
    EnvSpec { args, math: false }
}

const fn math_env(args: &'static str) -> EnvSpec {
    EnvSpec { args, math: true }
}

pub static BUILTIN_MACROS: phf::Map<&'static str, MacroSpec> = phf_map! {
    // Document structure
    "documentclass" => silent("[{["),
    "usepackage" => silent("[{["),
    "RequirePackage" => silent("[{["),
    "input" => silent("{"),
    "include" => silent("{"),
    "includeonly" => silent("{"),
    "maketitle" => silent(""),
    "tableofcontents" => silent(""),
    "listoffigures" => silent(""),
    "listoftables" => silent(""),
    "appendix" => silent(""),
    "frontmatter" => silent(""),
    "mainmatter" => silent(""),
    "backmatter" => silent(""),
    "twocolumn" => silent("["),
    "onecolumn" => silent(""),
    "titlearea" => silent("{{"),

    // Sectioning
    "part" => text("*[{"),
    "chapter" => text("*[{"),
    "section" => text("*[{"),
    "subsection" => text("*[{"),
    "subsubsection" => text("*[{"),
    "paragraph" => text("*[{"),
    "subparagraph" => text("*[{"),

    // Front matter
    "title" => text("[{"),
    "author" => text("[{"),
    "address" => text("{"),
    "affiliation" => text("[{"),
    "institute" => text("{"),
    "email" => text("{"),
    "date" => text("{"),
    "thanks" => text("{"),
    "and" => silent(""),
    "abstract" => text("{"),
    "keywords" => text("{"),

    // Notes, captions, references
    "footnote" => text("[{"),
    "footnotemark" => silent("["),
    "footnotetext" => text("[{"),
    "caption" => text("*[{"),
    "label" => silent("{"),
    "ref" => text("*{"),
    "eqref" => text("{"),
    "pageref" => text("*{"),
    "autoref" => text("*{"),
    "cref" => text("*{"),
    "Cref" => text("*{"),
    "cite" => text("*[[{"),
    "citep" => text("*[[{"),
    "citet" => text("*[[{"),
    "citealp" => text("*[[{"),
    "nocite" => silent("{"),
    "url" => text("{"),
    "href" => text("[{{"),
    "bibliography" => text("{"),
    "bibliographystyle" => silent("{"),
    "printbibliography" => text("["),
    "bibitem" => silent("[{"),

    // Text formatting
    "emph" => text("{"),
    "textbf" => text("{"),
    "textit" => text("{"),
    "texttt" => text("{"),
    "textsc" => text("{"),
    "textrm" => text("{"),
    "textsf" => text("{"),
    "textsl" => text("{"),
    "textup" => text("{"),
    "textmd" => text("{"),
    "textnormal" => text("{"),
    "text" => text("{"),
    "underline" => text("{"),
    "mbox" => text("{"),
    "hbox" => text("{"),
    "fbox" => text("{"),
    "makebox" => text("[[{"),
    "framebox" => text("[[{"),
    "parbox" => text("[[[{{"),
    "textcolor" => text("[{{"),
    "colorbox" => text("[{{"),
    "color" => silent("[{"),
    "scalebox" => silent("{[{"),
    "resizebox" => silent("*{{{"),
    "rotatebox" => silent("[{{"),
    "textsuperscript" => text("{"),
    "textsubscript" => text("{"),
    "LaTeX" => text(""),
    "TeX" => text(""),
    "today" => text(""),
    "ldots" => text(""),
    "dots" => text(""),
    "textbackslash" => text(""),

    // Declarations without visible output
    "bf" => silent(""),
    "it" => silent(""),
    "rm" => silent(""),
    "sf" => silent(""),
    "tt" => silent(""),
    "sc" => silent(""),
    "em" => silent(""),
    "bfseries" => silent(""),
    "itshape" => silent(""),
    "ttfamily" => silent(""),
    "normalfont" => silent(""),
    "tiny" => silent(""),
    "scriptsize" => silent(""),
    "footnotesize" => silent(""),
    "small" => silent(""),
    "normalsize" => silent(""),
    "large" => silent(""),
    "Large" => silent(""),
    "LARGE" => silent(""),
    "huge" => silent(""),
    "Huge" => silent(""),
    "centering" => silent(""),
    "raggedright" => silent(""),
    "raggedleft" => silent(""),
    "noindent" => silent(""),
    "indent" => silent(""),

    // Spacing and page breaking
    "\\" => silent("*["),
    "newline" => silent(""),
    "linebreak" => silent("["),
    "par" => silent(""),
    "item" => silent("["),
    "linewidth" => silent(""),
    "textwidth" => silent(""),
    "columnwidth" => silent(""),
    "vspace" => silent("*{"),
    "hspace" => silent("*{"),
    "vfill" => silent(""),
    "hfill" => silent(""),
    "smallskip" => silent(""),
    "medskip" => silent(""),
    "bigskip" => silent(""),
    "newpage" => silent(""),
    "clearpage" => silent(""),
    "cleardoublepage" => silent(""),
    "pagebreak" => silent("["),
    "nopagebreak" => silent("["),
    "setlength" => silent("{{"),
    "addtolength" => silent("{{"),
    "setcounter" => silent("{{"),
    "addtocounter" => silent("{{"),
    "thispagestyle" => silent("{"),
    "pagestyle" => silent("{"),
    "addcontentsline" => silent("{{{"),
    "hyphenation" => silent("{"),

    // Graphics and listings
    "includegraphics" => silent("*[[{"),
    "lstinputlisting" => silent("[{"),

    // Definitions
    "newcommand" => silent("*{[[{"),
    "renewcommand" => silent("*{[[{"),
    "providecommand" => silent("*{[[{"),
    "CheckCommand" => silent("*{[[{"),
    "newenvironment" => silent("*{[[{{"),
    "renewenvironment" => silent("*{[[{{"),
    "def" => silent(""),
    "gdef" => silent(""),
    "edef" => silent(""),
    "xdef" => silent(""),
    "let" => silent(""),
    "DeclareMathOperator" => silent("*{{"),
    "newtheorem" => silent("{[{["),
};

pub static BUILTIN_ENVIRONMENTS: phf::Map<&'static str, EnvSpec> = phf_map! {
    "document" => env(""),
    "abstract" => env(""),
    "titlepage" => env(""),
    "figure" => env("["),
    "figure*" => env("["),
    "table" => env("["),
    "table*" => env("["),
    "tabular" => env("[{"),
    "tabular*" => env("{[{"),
    "tabularx" => env("{[{"),
    "longtable" => env("[{"),
    "itemize" => env("["),
    "enumerate" => env("["),
    "description" => env("["),
    "list" => env("{{"),
    "center" => env(""),
    "flushleft" => env(""),
    "flushright" => env(""),
    "minipage" => env("[[[{"),
    "quote" => env(""),
    "quotation" => env(""),
    "verse" => env(""),
    "multicols" => env("{["),
    "multicols*" => env("{["),
    "thebibliography" => env("{"),
    "tikzpicture" => env("["),
    "forest" => env(""),
    "pspicture" => env(""),
    "verbatim" => env(""),
    "lstlisting" => env("["),
    "minted" => env("[{"),
    "comment" => env(""),
    "proof" => env("["),
    "theorem" => env("["),
    "lemma" => env("["),
    "definition" => env("["),
    "equation" => math_env(""),
    "equation*" => math_env(""),
    "align" => math_env(""),
    "align*" => math_env(""),
    "alignat" => math_env("{"),
    "alignat*" => math_env("{"),
    "flalign" => math_env(""),
    "flalign*" => math_env(""),
    "gather" => math_env(""),
    "gather*" => math_env(""),
    "multline" => math_env(""),
    "multline*" => math_env(""),
    "eqnarray" => math_env(""),
    "eqnarray*" => math_env(""),
    "displaymath" => math_env(""),
    "math" => math_env(""),
    "array" => env("[{"),
};

/// Names whose definitions are learnt from the document.
pub const COMMAND_DEFINITIONS: &[&str] = &[
    "newcommand",
    "renewcommand",
    "providecommand",
    "CheckCommand",
    "DeclareMathOperator",
];

pub const ENVIRONMENT_DEFINITIONS: &[&str] = &["newenvironment", "renewenvironment"];

/// Plain TeX definitions, `\def\name#1#2{...}`.
pub const TEX_DEFINITIONS: &[&str] = &["def", "gdef", "edef", "xdef"];

/// Every macro that only defines something and is never annotated.
pub fn is_definition(name: &str) -> bool {
    COMMAND_DEFINITIONS.contains(&name)
        || ENVIRONMENT_DEFINITIONS.contains(&name)
        || TEX_DEFINITIONS.contains(&name)
        || name == "let"
}

/// Builtin tables plus definitions learnt from the document.
#[derive(Debug, Clone, Default)]
pub struct MacroDb {
    macros: FxHashMap<String, String>,
    environments: FxHashMap<String, String>,
}

impl MacroDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Argument spec of a macro, `None` when the macro is unknown.
    pub fn macro_args(&self, name: &str) -> Option<&str> {
        if let Some(args) = self.macros.get(name) {
            return Some(args.as_str());
        }
        BUILTIN_MACROS.get(name).map(|spec| spec.args)
    }

    pub fn is_known_macro(&self, name: &str) -> bool {
        self.macro_args(name).is_some()
    }

    /// Whether the macro typesets text. Learnt macros never count, since
    /// their expansion is not known.
    pub fn renders_text(&self, name: &str) -> bool {
        !self.macros.contains_key(name)
            && BUILTIN_MACROS
                .get(name)
                .map(|spec| spec.renders_text)
                .unwrap_or(false)
    }

    /// Argument spec of an environment, `None` when unknown.
    pub fn env_args(&self, name: &str) -> Option<&str> {
        if let Some(args) = self.environments.get(name) {
            return Some(args.as_str());
        }
        BUILTIN_ENVIRONMENTS.get(name).map(|spec| spec.args)
    }

    pub fn is_math_env(&self, name: &str) -> bool {
        !self.environments.contains_key(name)
            && BUILTIN_ENVIRONMENTS
                .get(name)
                .map(|spec| spec.math)
                .unwrap_or(false)
    }

    /// Learn `\newcommand{\name}[count][default]{...}`.
    pub fn define_macro(&mut self, name: &str, arg_count: usize, has_default: bool) {
        let spec = argspec(arg_count, has_default);
        log::debug!("learnt macro \\{} with args '{}'", name, spec);
        self.macros.insert(name.to_string(), spec);
    }

    /// Learn `\newenvironment{name}[count][default]{...}{...}`.
    pub fn define_environment(&mut self, name: &str, arg_count: usize, has_default: bool) {
        let spec = argspec(arg_count, has_default);
        log::debug!("learnt environment {} with args '{}'", name, spec);
        self.environments.insert(name.to_string(), spec);
    }

    pub fn learnt_count(&self) -> usize {
        self.macros.len() + self.environments.len()
    }
}

fn argspec(count: usize, has_default: bool) -> String {
    let mut spec = String::with_capacity(count);
    for i in 0..count {
        spec.push(if i == 0 && has_default { '[' } else { '{' });
    }
    spec
}
