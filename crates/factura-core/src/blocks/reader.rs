//! Flattening of the block graph into lines, key/value pairs and tables.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::{Block, BlockGraph, BlockType, EntityType, RelationshipType, Table};

/// Everything the field extractors and line-item interpreter read from a graph.
#[derive(Debug, Clone, Default)]
pub struct ReadDocument {
    /// LINE texts in document order.
    pub lines: Vec<String>,
    /// Lower-cased key text to value text.
    pub key_values: BTreeMap<String, String>,
    /// Tables in document order.
    pub tables: Vec<Table>,
}

impl ReadDocument {
    /// The table with the most rows (first one on ties).
    pub fn largest_table(&self) -> Option<&Table> {
        self.tables
            .iter()
            .fold(None, |best: Option<&Table>, t| match best {
                Some(b) if b.row_count >= t.row_count => Some(b),
                _ => Some(t),
            })
    }
}

impl BlockGraph {
    /// Read lines, key/values and tables in one pass.
    pub fn read(&self, min_line_confidence: f32) -> ReadDocument {
        let doc = ReadDocument {
            lines: self.text_lines_above(min_line_confidence),
            key_values: self.key_values(),
            tables: self.tables(),
        };
        debug!(
            "Read {} lines, {} key/values, {} tables from {} blocks",
            doc.lines.len(),
            doc.key_values.len(),
            doc.tables.len(),
            self.len()
        );
        doc
    }

    /// Trimmed LINE texts in document order; empty lines dropped.
    pub fn text_lines(&self) -> Vec<String> {
        self.text_lines_above(0.0)
    }

    /// Like [`Self::text_lines`], dropping lines whose confidence is below `min_confidence`.
    pub fn text_lines_above(&self, min_confidence: f32) -> Vec<String> {
        self.of_type(BlockType::Line)
            .filter(|b| b.confidence.is_none_or(|c| c >= min_confidence))
            .filter_map(|b| b.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Key/value pairs from KEY_VALUE_SET blocks.
    ///
    /// Keys are lower-cased; on duplicate keys the last pair wins.
    pub fn key_values(&self) -> BTreeMap<String, String> {
        let mut pairs = BTreeMap::new();

        for key_block in self
            .of_type(BlockType::KeyValueSet)
            .filter(|b| b.has_entity(EntityType::Key))
        {
            let key_text = self.block_text(key_block);
            if key_text.is_empty() {
                continue;
            }

            for value_id in key_block.related(RelationshipType::Value) {
                let Some(value_block) = self.get(value_id) else {
                    continue;
                };
                let value_text = self.block_text(value_block);
                if !value_text.is_empty() {
                    pairs.insert(key_text.to_lowercase(), value_text);
                }
            }
        }

        pairs
    }

    /// Dense grids for every TABLE block.
    pub fn tables(&self) -> Vec<Table> {
        self.of_type(BlockType::Table)
            .map(|table_block| {
                let cells = table_block
                    .related(RelationshipType::Child)
                    .filter_map(|id| self.get(id))
                    .filter(|b| b.block_type == BlockType::Cell)
                    .filter_map(|cell| {
                        let row = cell.row_index?;
                        let col = cell.column_index?;
                        Some((row, col, self.block_text(cell)))
                    });
                Table::from_cells(cells)
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Space-joined WORD texts reachable from `block` through CHILD edges.
    ///
    /// Unresolved ids are skipped and each block is visited at most once, so
    /// dangling or cyclic relationships cannot fail or loop.
    pub fn block_text(&self, block: &Block) -> String {
        let mut words = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(block.id.as_str());
        self.collect_words(block, &mut words, &mut visited);
        words.join(" ")
    }

    fn collect_words<'a>(
        &'a self,
        block: &'a Block,
        words: &mut Vec<&'a str>,
        visited: &mut HashSet<&'a str>,
    ) {
        for child_id in block.related(RelationshipType::Child) {
            let Some(child) = self.get(child_id) else {
                continue;
            };
            if !visited.insert(child.id.as_str()) {
                continue;
            }
            match child.block_type {
                BlockType::Word => {
                    if let Some(text) = child.text.as_deref().map(str::trim) {
                        if !text.is_empty() {
                            words.push(text);
                        }
                    }
                }
                _ => self.collect_words(child, words, visited),
            }
        }
    }
}
