//! Parallel processing of many documents

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;

use super::{document_name, DocumentSummary, PdfExtractor, Pipeline, TexCompiler};
use crate::utils::error::{Error, Result};

/// Outcome of one document in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub name: String,
    /// `ok`, or the error's status word
    pub status: String,
    pub message: String,
}

impl DocumentReport {
    pub fn succeeded(summary: &DocumentSummary) -> Self {
        Self {
            name: summary.name.clone(),
            status: "ok".to_string(),
            message: format!(
                "{} spans, {}/{} records resolved, {} warnings",
                summary.spans, summary.resolved, summary.records, summary.warnings
            ),
        }
    }

    pub fn failed(name: impl Into<String>, error: &Error) -> Self {
        Self {
            name: name.into(),
            status: error.status().to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

impl<C, E> Pipeline<C, E>
where
    C: TexCompiler + Sync,
    E: PdfExtractor + Sync,
{
    /// Process every document independently; one failure never stops the
    /// others. Reports come back in input order.
    pub fn process_batch(&self, sources: &[PathBuf]) -> Vec<DocumentReport> {
        sources
            .par_iter()
            .map(|source| match self.process_document(source) {
                Ok(summary) => DocumentReport::succeeded(&summary),
                Err(e) => {
                    let name = document_name(source);
                    log::error!("{}: {}", name, e);
                    DocumentReport::failed(name, &e)
                }
            })
            .collect()
    }
}

/// Write reports as TSV.
pub fn write_reports<W: Write>(reports: &[DocumentReport], writer: W) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for report in reports {
        out.serialize(report)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reports() {
        let ok = DocumentReport::succeeded(&DocumentSummary {
            name: "2303.10142".to_string(),
            spans: 10,
            records: 12,
            resolved: 11,
            warnings: 0,
        });
        let failed = DocumentReport::failed("broken", &Error::CompileTimeout { seconds: 60 });
        assert!(ok.is_ok());
        assert_eq!(failed.status, "timeout");

        let mut buf = Vec::new();
        write_reports(&[ok, failed], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "name\tstatus\tmessage\n2303.10142\tok\t10 spans, 11/12 records resolved, 0 warnings\nbroken\ttimeout\tLaTeX compilation timed out after 60s\n"
        );
    }
}
