//! Source preparation for colorized compiles
//!
//! Annotated sources need `xcolor` (for `\color[RGB]`) and `tcolorbox`
//! with zeroed frame metrics (for `\colorbox` around figures) plus a PDF
//! output header that keeps the compiler in non-interactive mode.

use lazy_static::lazy_static;
use regex::Regex;

pub const PDF_HEADER: &str = "\\pdfoutput=1\n\\interactionmode=1\n";

pub const COLOR_PACKAGES: &str = "\n\\usepackage{xcolor}\n\\usepackage{tcolorbox}\n\\setlength{\\fboxsep}{0pt}\n\\setlength{\\fboxrule}{0pt}\n";

lazy_static! {
    /// A line holding exactly one simple `\usepackage[opt]{name}`
    static ref SIMPLE_USEPACKAGE: Regex =
        Regex::new(r"(?m)^\\usepackage(\[\w+\])?\{\w+\}\r?$").expect("valid usepackage regex");
    static ref DOCUMENTCLASS: Regex =
        Regex::new(r"(?m)^[ \t]*\\documentclass").expect("valid documentclass regex");
}

/// Header for the pristine compile.
pub fn prepend_pdf_header(text: &str) -> String {
    let mut out = String::with_capacity(PDF_HEADER.len() + text.len());
    out.push_str(PDF_HEADER);
    out.push_str(text);
    out
}

/// Header plus the color packages, inserted after the last simple
/// `\usepackage` line of the preamble, else after `\documentclass`, else at
/// the top.
pub fn inject_color_preamble(text: &str) -> String {
    let preamble_end = text.find("\\begin{document}").unwrap_or(text.len());
    let preamble = &text[..preamble_end];
    let at = SIMPLE_USEPACKAGE
        .find_iter(preamble)
        .last()
        .map(|m| m.end())
        .or_else(|| documentclass_end(preamble))
        .unwrap_or(0);

    let mut out = String::with_capacity(PDF_HEADER.len() + COLOR_PACKAGES.len() + text.len());
    out.push_str(PDF_HEADER);
    out.push_str(&text[..at]);
    out.push_str(COLOR_PACKAGES);
    out.push_str(&text[at..]);
    out
}

/// Byte offset just past `\documentclass[options]{class}`, whose options
/// may span several lines.
fn documentclass_end(preamble: &str) -> Option<usize> {
    let bytes = preamble.as_bytes();
    let skip_whitespace = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        i
    };
    let mut i = skip_whitespace(DOCUMENTCLASS.find(preamble)?.end());
    if bytes.get(i) == Some(&b'[') {
        i = skip_whitespace(i + preamble[i..].find(']')? + 1);
    }
    if bytes.get(i) != Some(&b'{') {
        return None;
    }
    Some(i + preamble[i..].find('}')? + 1)
}

/// Drop `}` without an opener and `{` that are never closed.
///
/// Escaped braces (`\{`, `\}`) are left alone.
pub fn remove_mismatched_braces(text: &str) -> String {
    let mut open: Vec<usize> = Vec::new();
    let mut drop: Vec<usize> = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => open.push(i),
            b'}' => {
                if open.pop().is_none() {
                    drop.push(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    drop.extend(open);
    if drop.is_empty() {
        return text.to_string();
    }
    drop.sort_unstable();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for index in drop {
        out.push_str(&text[cursor..index]);
        cursor = index + 1;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_inject_after_last_simple_usepackage() {
        let src = "\\documentclass{article}\n\\usepackage{amsmath}\n\\usepackage[utf8]{inputenc}\n\\usepackage{a,b}\n\\begin{document}\nx\n\\usepackage{late}\n\\end{document}\n";
        let out = inject_color_preamble(src);
        assert_eq!(
            out,
            format!(
                "{}\\documentclass{{article}}\n\\usepackage{{amsmath}}\n\\usepackage[utf8]{{inputenc}}{}\n\\usepackage{{a,b}}\n\\begin{{document}}\nx\n\\usepackage{{late}}\n\\end{{document}}\n",
                PDF_HEADER, COLOR_PACKAGES
            )
        );
    }

    #[test]
    fn test_inject_falls_back_to_documentclass_then_top() {
        let src = "\\documentclass[11pt]{article}\n\\begin{document}x\\end{document}";
        let out = inject_color_preamble(src);
        assert!(out.starts_with(&format!(
            "{}\\documentclass[11pt]{{article}}{}",
            PDF_HEADER, COLOR_PACKAGES
        )));

        let out = inject_color_preamble("Body only");
        assert_eq!(out, format!("{}{}Body only", PDF_HEADER, COLOR_PACKAGES));
    }

    #[test]
    fn test_inject_after_multiline_documentclass() {
        let src = "\\documentclass[\n  11pt,\n  twocolumn\n]{article}\n\\begin{document}x\\end{document}";
        let out = inject_color_preamble(src);
        assert_eq!(
            out,
            format!(
                "{}\\documentclass[\n  11pt,\n  twocolumn\n]{{article}}{}\n\\begin{{document}}x\\end{{document}}",
                PDF_HEADER, COLOR_PACKAGES
            )
        );
    }

    #[test]
    fn test_prepend_header() {
        assert_eq!(
            prepend_pdf_header("\\documentclass{article}"),
            "\\pdfoutput=1\n\\interactionmode=1\n\\documentclass{article}"
        );
    }

    #[test]
    fn test_remove_mismatched_braces() {
        let src = r"a \{with }}{ some {nested} b}{ tail {";
        assert_eq!(remove_mismatched_braces(src), r"a \{with { some {nested} b} tail ");
        assert_eq!(remove_mismatched_braces("{ok}"), "{ok}");
    }
}
