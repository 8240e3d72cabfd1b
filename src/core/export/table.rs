//! TSV / JSON output of an [`Export`]

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::Export;
use crate::core::toc::TableOfContents;
use crate::model::OutputRecord;
use crate::utils::error::Result;

pub const TOC_FILE: &str = "toc.tsv";
pub const RECORDS_FILE: &str = "records.tsv";
pub const JSON_FILE: &str = "export.json";

/// One row of the TOC table; the root has `parent_id == -1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocRow {
    pub section_id: u32,
    pub parent_id: i64,
}

/// Root row followed by every heading in document order.
pub fn toc_rows(toc: &TableOfContents) -> Vec<TocRow> {
    std::iter::once(TocRow {
        section_id: 0,
        parent_id: -1,
    })
    .chain(toc.export().into_iter().map(|(section_id, parent)| TocRow {
        section_id,
        parent_id: parent as i64,
    }))
    .collect()
}

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_writer(writer)
}

pub fn write_toc_tsv<W: Write>(rows: &[TocRow], writer: W) -> Result<()> {
    let mut out = tsv_writer(writer);
    for row in rows {
        out.serialize(row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_records_tsv<W: Write>(records: &[OutputRecord], writer: W) -> Result<()> {
    let mut out = tsv_writer(writer);
    for record in records {
        out.serialize(record)?;
    }
    out.flush()?;
    Ok(())
}

impl Export {
    /// Write `toc.tsv` and `records.tsv` into `dir`.
    pub fn write_tsv(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        write_toc_tsv(&self.toc, BufWriter::new(File::create(dir.join(TOC_FILE))?))?;
        write_records_tsv(
            &self.records,
            BufWriter::new(File::create(dir.join(RECORDS_FILE))?),
        )?;
        Ok(())
    }

    /// Write both tables as one JSON document.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Label;
    use pretty_assertions::assert_eq;

    fn record() -> OutputRecord {
        OutputRecord {
            reading_order: 3,
            order_offset: 0,
            label: Some(Label::Section),
            block_id: 1,
            section_id: 1,
            text: Some("Intro".to_string()),
            page: 1,
            x0: 10.0,
            y0: 20.0,
            x1: 30.5,
            y1: 28.0,
            font: Some("CMBX12".to_string()),
            font_size: Some(14.0),
            flags: "serifed,proportional,bold".to_string(),
            source_text: Some("Intro".to_string()),
        }
    }

    #[test]
    fn test_toc_tsv() {
        let mut toc = TableOfContents::new();
        toc.add_node("section");
        toc.add_node("subsection");
        let mut buf = Vec::new();
        write_toc_tsv(&toc_rows(&toc), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "section_id\tparent_id\n0\t-1\n1\t0\n2\t1\n"
        );
    }

    #[test]
    fn test_records_tsv_columns() {
        let mut unresolved = record();
        unresolved.reading_order = -1;
        unresolved.label = None;
        unresolved.source_text = None;
        let mut buf = Vec::new();
        write_records_tsv(&[record(), unresolved], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "reading_order\torder_offset\tlabel\tblock_id\tsection_id\ttext\tpage\tx0\ty0\tx1\ty1\tfont\tfont_size\tflags\tsource_text"
        );
        assert!(lines[1].starts_with("3\t0\tSection\t1\t1\tIntro\t1\t"));
        assert!(lines[2].starts_with("-1\t0\t\t"));
    }

    #[test]
    fn test_json_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let export = Export {
            toc: vec![TocRow {
                section_id: 0,
                parent_id: -1,
            }],
            records: vec![record()],
        };
        let path = dir.path().join("out").join(JSON_FILE);
        export.write_json(&path).unwrap();
        assert_eq!(Export::read_json(&path).unwrap(), export);

        export.write_tsv(dir.path()).unwrap();
        assert!(dir.path().join(RECORDS_FILE).is_file());
    }
}
