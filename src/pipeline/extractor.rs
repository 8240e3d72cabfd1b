//! PDF extraction collaborator

use std::path::Path;
use std::process::Command;

use crate::core::color::Color;
use crate::model::Extraction;
use crate::utils::error::{Error, Result};

/// Reports words and colored rectangles of a PDF.
pub trait PdfExtractor {
    fn extract(&self, pdf: &Path) -> Result<Extraction>;
}

/// Runs an external program with the PDF path appended and reads
/// `{"tokens": [...], "shapes": [...]}` from its stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl PdfExtractor for CommandExtractor {
    fn extract(&self, pdf: &Path) -> Result<Extraction> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(pdf)
            .output()
            .map_err(|e| Error::extraction(format!("cannot run {}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(Error::extraction(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        let extraction: Extraction = serde_json::from_slice(&output.stdout)?;
        log::debug!(
            "extracted {} words and {} shapes from {}",
            extraction.tokens.len(),
            extraction.shapes.len(),
            pdf.display()
        );
        Ok(extraction)
    }
}

/// Every color drawn in `extraction` that parses as a marker color.
pub fn existing_colors(extraction: &Extraction) -> Vec<Color> {
    let words = extraction
        .tokens
        .iter()
        .filter_map(|t| Color::from_hex(&t.color).ok());
    let shapes = extraction
        .shapes
        .iter()
        .filter_map(|s| match s.stroking_color.as_slice() {
            &[r, g, b] => Color::from_unit_rgb(r, g, b),
            _ => None,
        });
    words.chain(shapes).collect()
}
