//! Shared data types: semantic labels, extraction input and output records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Semantic class of an annotated span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Title,
    Author,
    Abstract,
    Section,
    Footer,
    Caption,
    List,
    Table,
    Equation,
    Figure,
    Reference,
    Paragraph,
}

impl Label {
    pub const ALL: [Label; 12] = [
        Label::Title,
        Label::Author,
        Label::Abstract,
        Label::Section,
        Label::Footer,
        Label::Caption,
        Label::List,
        Label::Table,
        Label::Equation,
        Label::Figure,
        Label::Reference,
        Label::Paragraph,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Title => "Title",
            Label::Author => "Author",
            Label::Abstract => "Abstract",
            Label::Section => "Section",
            Label::Footer => "Footer",
            Label::Caption => "Caption",
            Label::List => "List",
            Label::Table => "Table",
            Label::Equation => "Equation",
            Label::Figure => "Figure",
            Label::Reference => "Reference",
            Label::Paragraph => "Paragraph",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown label '{}'", s))
    }
}

// =============================================================================
// Extraction input
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// A word extracted from the compiled PDF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedToken {
    pub text: String,
    /// 1-based page number
    pub page: u32,
    pub bbox: BBox,
    /// Fill color as `#rrggbb`
    pub color: String,
    #[serde(default)]
    pub font: String,
    #[serde(default)]
    pub font_size: f32,
    /// Font flag bits, see [`decompose_font_flags`]
    #[serde(default)]
    pub flags: u32,
    /// Index of the text line the word belongs to, unique per page
    pub line_no: u32,
}

/// A filled or stroked rectangle extracted from the compiled PDF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedShape {
    pub page: u32,
    pub bbox: BBox,
    /// Unit-range RGB, empty when the shape has no usable color
    #[serde(default)]
    pub stroking_color: Vec<f32>,
}

/// Everything the PDF extraction collaborator reports for one PDF
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    #[serde(default)]
    pub tokens: Vec<ExtractedToken>,
    #[serde(default)]
    pub shapes: Vec<ExtractedShape>,
}

// =============================================================================
// Output
// =============================================================================

/// One row of the exported record table.
///
/// `reading_order == -1` together with `label == None` marks a token whose
/// color could neither be decoded nor inferred from its neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub reading_order: i64,
    pub order_offset: u32,
    pub label: Option<Label>,
    pub block_id: i64,
    pub section_id: i64,
    pub text: Option<String>,
    pub page: u32,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub flags: String,
    pub source_text: Option<String>,
}

impl OutputRecord {
    pub fn is_resolved(&self) -> bool {
        self.reading_order >= 0
    }
}

/// Human readable font flags, in the order superscript, italic,
/// serifed/sans, monospaced/proportional, bold.
pub fn decompose_font_flags(bits: u32) -> Vec<&'static str> {
    let mut out = Vec::with_capacity(5);
    if bits & 1 != 0 {
        out.push("superscript");
    }
    if bits & (1 << 1) != 0 {
        out.push("italic");
    }
    out.push(if bits & (1 << 2) != 0 { "serifed" } else { "sans" });
    out.push(if bits & (1 << 3) != 0 {
        "monospaced"
    } else {
        "proportional"
    });
    if bits & (1 << 4) != 0 {
        out.push("bold");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_flags() {
        assert_eq!(decompose_font_flags(0), vec!["sans", "proportional"]);
        assert_eq!(
            decompose_font_flags(0b10110),
            vec!["italic", "serifed", "proportional", "bold"]
        );
        assert_eq!(
            decompose_font_flags(0b01001),
            vec!["superscript", "sans", "monospaced"]
        );
    }

    #[test]
    fn test_label_parse() {
        assert_eq!("section".parse::<Label>(), Ok(Label::Section));
        assert!("Heading".parse::<Label>().is_err());
    }

    #[test]
    fn test_extraction_json_defaults() {
        let json = r##"{"tokens": [{"text": "cat", "page": 1,
            "bbox": {"x0": 1.0, "y0": 2.0, "x1": 3.0, "y1": 4.0},
            "color": "#ff0000", "line_no": 0}]}"##;
        let extraction: Extraction = serde_json::from_str(json).unwrap();
        assert_eq!(extraction.tokens[0].flags, 0);
        assert!(extraction.shapes.is_empty());
    }
}
