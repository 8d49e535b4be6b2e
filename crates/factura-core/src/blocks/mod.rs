//! OCR block graph model and reader.
//!
//! The document-analysis engine returns a flat list of typed blocks linked by
//! `CHILD` and `VALUE` relationships. This module deserializes that list verbatim
//! and flattens it into text lines, key/value pairs and dense table grids.

mod reader;
mod table;

pub use reader::ReadDocument;
pub use table::Table;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Type of a block in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockType {
    Page,
    Line,
    Word,
    KeyValueSet,
    Table,
    Cell,
    /// Any block type this reader does not interpret (SELECTION_ELEMENT, MERGED_CELL, ...).
    #[serde(other)]
    Other,
}

/// Entity tag carried by KEY_VALUE_SET blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Key,
    Value,
    #[serde(other)]
    Other,
}

/// Kind of edge between two blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    Child,
    Value,
    #[serde(other)]
    Other,
}

/// An edge list from one block to others, referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "Type")]
    pub kind: RelationshipType,

    #[serde(rename = "Ids", default)]
    pub ids: Vec<String>,
}

/// A single node of the block graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub id: String,

    pub block_type: BlockType,

    /// Text payload (LINE and WORD blocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Engine confidence, 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityType>,

    /// 1-based row index (CELL blocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,

    /// 1-based column index (CELL blocks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Block {
    /// Ids referenced by relationships of the given kind.
    pub fn related(&self, kind: RelationshipType) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(move |r| r.kind == kind)
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Check whether this block carries the given entity tag.
    pub fn has_entity(&self, entity: EntityType) -> bool {
        self.entity_types.contains(&entity)
    }
}

/// Top-level shapes accepted when loading a graph from JSON.
#[derive(Deserialize)]
#[serde(untagged)]
enum GraphDocument {
    Response {
        #[serde(rename = "Blocks")]
        blocks: Vec<Block>,
    },
    Bare(Vec<Block>),
}

/// The OCR engine's block graph, indexed by block id.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    blocks: Vec<Block>,
    index: HashMap<String, usize>,
}

impl BlockGraph {
    /// Build a graph from blocks in document order.
    pub fn new(blocks: Vec<Block>) -> Self {
        let index = blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();
        Self { blocks, index }
    }

    /// Parse either a full analysis response (`{"Blocks": [...]}`) or a bare block array.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let doc: GraphDocument = serde_json::from_str(json)?;
        let blocks = match doc {
            GraphDocument::Response { blocks } => blocks,
            GraphDocument::Bare(blocks) => blocks,
        };
        Ok(Self::new(blocks))
    }

    /// All blocks in document order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check whether the graph holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Look up a block by id. Dangling ids resolve to `None`.
    pub fn get(&self, id: &str) -> Option<&Block> {
        self.index.get(id).map(|&i| &self.blocks[i])
    }

    /// Blocks of one type, in document order.
    pub fn of_type(&self, block_type: BlockType) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.block_type == block_type)
    }

    /// Check that the graph can be read at all.
    ///
    /// Dangling relationship ids are tolerated; only a graph without blocks or
    /// without any PAGE root is rejected.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.blocks.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        if self.of_type(BlockType::Page).next().is_none() {
            return Err(ExtractionError::MalformedGraph(
                "no PAGE block found".to_string(),
            ));
        }
        Ok(())
    }

    /// Mean block confidence scaled to 0.0 - 1.0.
    pub fn average_confidence(&self) -> f32 {
        let scores: Vec<f32> = self.blocks.iter().filter_map(|b| b.confidence).collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f32>() / scores.len() as f32 / 100.0
    }
}
