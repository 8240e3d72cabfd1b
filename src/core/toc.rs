//! Table-of-contents state machine
//!
//! Headings are pushed in document order; each new node is attached under the
//! nearest preceding node with a strictly smaller level. Nodes live in an
//! arena indexed by section id, so id `n` is at index `n` and the root at 0.

use serde::{Deserialize, Serialize};

/// Heading kinds in level order (`title` is 0, `subparagraph` is 7).
pub const HEADING_KINDS: [&str; 8] = [
    "title",
    "part",
    "chapter",
    "section",
    "subsection",
    "subsubsection",
    "paragraph",
    "subparagraph",
];

/// Level of a heading kind, `None` for anything that is not a heading.
pub fn heading_level(kind: &str) -> Option<i8> {
    HEADING_KINDS
        .iter()
        .position(|k| *k == kind)
        .map(|p| p as i8)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocNode {
    pub section_id: u32,
    /// -1 for the root
    pub level: i8,
    pub parent: Option<u32>,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOfContents {
    nodes: Vec<TocNode>,
    cursor: u32,
}

impl Default for TableOfContents {
    fn default() -> Self {
        Self::new()
    }
}

impl TableOfContents {
    pub fn new() -> Self {
        Self {
            nodes: vec![TocNode {
                section_id: 0,
                level: -1,
                parent: None,
                children: Vec::new(),
            }],
            cursor: 0,
        }
    }

    /// Attach a heading of `kind` and make it current.
    ///
    /// Returns the new section id, or `None` (with a warning) when `kind` is
    /// not a heading kind.
    pub fn add_node(&mut self, kind: &str) -> Option<u32> {
        let Some(level) = heading_level(kind) else {
            log::warn!(
                "invalid heading kind '{}', expected one of {}",
                kind,
                HEADING_KINDS.join(", ")
            );
            return None;
        };

        let mut parent = self.cursor;
        while self.nodes[parent as usize].level >= level {
            match self.nodes[parent as usize].parent {
                Some(up) => parent = up,
                None => break,
            }
        }

        let id = self.nodes.len() as u32;
        self.nodes.push(TocNode {
            section_id: id,
            level,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent as usize].children.push(id);
        self.cursor = id;
        Some(id)
    }

    /// Id of the most recently attached heading, 0 before any.
    pub fn current_section_id(&self) -> u32 {
        self.cursor
    }

    pub fn node(&self, id: u32) -> Option<&TocNode> {
        self.nodes.get(id as usize)
    }

    pub fn parent_of(&self, id: u32) -> Option<u32> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Number of headings, root excluded.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(section_id, parent_id)` pairs in document order, root excluded.
    pub fn export(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(self.len());
        let mut stack: Vec<u32> = self.nodes[0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            out.push((id, node.parent.unwrap_or(0)));
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }
}
