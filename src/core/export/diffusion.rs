//! Label diffusion
//!
//! A word whose color could not be decoded borrows its label from directly
//! decoded words on the same line. Inferred records reuse the reading order
//! of a neighbor and get a fresh `order_offset` from a per-document counter
//! starting at 1, so `(reading_order, order_offset)` stays unique.

use indexmap::IndexMap;

use crate::model::{Label, OutputRecord};

/// Fill unresolved `records` from their resolved neighbors.
///
/// `lines[i]` is the `(page, line_no)` of `records[i]`. Only records within
/// `window` list positions that sit on the same line and were resolved before
/// diffusion started are consulted. Returns the number of records inferred.
pub fn diffuse(lines: &[(u32, u32)], records: &mut [OutputRecord], window: usize) -> usize {
    let direct: Vec<bool> = records.iter().map(OutputRecord::is_resolved).collect();
    let mut offset = 0u32;
    let mut inferred = 0;

    for i in 0..records.len() {
        if direct[i] {
            continue;
        }
        let line = lines.get(i).copied();
        let neighbor = |j: &usize| direct[*j] && lines.get(*j).copied() == line;
        let left: Vec<usize> = (i.saturating_sub(window)..i).rev().filter(neighbor).collect();
        let right: Vec<usize> = (i + 1..records.len().min(i + 1 + window))
            .filter(neighbor)
            .collect();

        let (source, label) = match (left.first(), right.first()) {
            (None, None) => continue,
            (Some(&j), None) | (None, Some(&j)) => (j, records[j].label),
            (Some(&j), Some(_)) => {
                let votes = left
                    .iter()
                    .chain(right.iter())
                    .filter_map(|&k| records[k].label);
                (j, majority(votes))
            }
        };

        offset += 1;
        let (reading_order, section_id, block_id) = {
            let from = &records[source];
            (from.reading_order, from.section_id, from.block_id)
        };
        let record = &mut records[i];
        record.reading_order = reading_order;
        record.order_offset = offset;
        record.label = label;
        record.section_id = section_id;
        record.block_id = block_id;
        inferred += 1;
    }
    inferred
}

/// Most frequent label; ties go to the one seen first.
fn majority(labels: impl Iterator<Item = Label>) -> Option<Label> {
    let mut counts: IndexMap<Label, usize> = IndexMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut best: Option<(Label, usize)> = None;
    for (label, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((label, count));
        }
    }
    best.map(|(label, _)| label)
}
