//! Span registry: marker color → what was annotated with it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::color::Color;
use super::toc::TableOfContents;
use crate::model::Label;
use crate::utils::error::{Error, Result};

/// Everything recorded for one allocated color
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub label: Label,
    pub reading_order: u32,
    pub section_id: u32,
    pub block_id: u32,
    /// The LaTeX source that was wrapped
    pub source_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanRegistry {
    spans: IndexMap<Color, SpanRecord>,
}

impl SpanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly allocated color. Returns `false` (and keeps the first
    /// record) if the color was already registered.
    pub fn insert(&mut self, color: Color, record: SpanRecord) -> bool {
        if self.spans.contains_key(&color) {
            log::warn!("color {} registered twice, keeping the first span", color);
            return false;
        }
        self.spans.insert(color, record);
        true
    }

    pub fn get(&self, color: &Color) -> Option<&SpanRecord> {
        self.spans.get(color)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (&Color, &SpanRecord)> {
        self.spans.iter()
    }
}

/// Serialized form of a registry and its table of contents, written next to
/// the annotated sources so export can run in a later process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanManifest {
    pub spans: Vec<SpanEntry>,
    pub toc: TableOfContents,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEntry {
    pub color: Color,
    #[serde(flatten)]
    pub record: SpanRecord,
}

impl SpanManifest {
    pub fn new(registry: &SpanRegistry, toc: &TableOfContents) -> Self {
        Self {
            spans: registry
                .iter()
                .map(|(color, record)| SpanEntry {
                    color: *color,
                    record: record.clone(),
                })
                .collect(),
            toc: toc.clone(),
        }
    }

    pub fn into_parts(self) -> Result<(SpanRegistry, TableOfContents)> {
        let mut registry = SpanRegistry::new();
        for entry in self.spans {
            if !registry.insert(entry.color, entry.record) {
                return Err(Error::invalid_manifest(format!(
                    "duplicate color {}",
                    entry.color
                )));
            }
        }
        Ok((registry, self.toc))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
