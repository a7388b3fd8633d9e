//! In-memory view of a chunk's tiles and their adjacency.

use crate::error::Result;
use crate::stores::Stores;
use std::collections::HashMap;
use tilecraft_model::{Chunk, Direction, Tile, TileType};
use tilecraft_storage::{Address, Error as StoreError};

/// Arena of a chunk's tiles. Each node carries a 4-slot table of arena
/// indices, one per [`Direction`].
pub struct TileGraph {
    chunk: Chunk,
    nodes: Vec<Tile>,
    edges: Vec<[Option<usize>; 4]>,
    index: HashMap<String, usize>,
}

impl TileGraph {
    /// Read the chunk and every member tile.
    ///
    /// An adjacency entry pointing at a tile that is not a member fails with
    /// not-found.
    pub async fn load(stores: &Stores, chunk: &Address) -> Result<Self> {
        let record = stores.chunks.get(chunk).await?.data;

        let mut nodes = Vec::with_capacity(record.tiles.len());
        let mut index = HashMap::with_capacity(record.tiles.len());
        for id in &record.tiles {
            let tile = stores.tiles.get(&chunk.with_tile(id)).await?.data;
            index.insert(tile.id.clone(), nodes.len());
            nodes.push(tile);
        }

        let mut edges = Vec::with_capacity(nodes.len());
        for tile in &nodes {
            let mut slots = [None; 4];
            for (direction, id) in tile.next.iter() {
                let Some(&target) = index.get(id) else {
                    return Err(StoreError::NotFound(chunk.with_tile(id)).into());
                };
                slots[direction.index()] = Some(target);
            }
            edges.push(slots);
        }

        log::debug!("Loaded {} tiles of {chunk}", nodes.len());
        Ok(Self {
            chunk: record,
            nodes,
            edges,
            index,
        })
    }

    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &Tile {
        &self.nodes[index]
    }

    pub fn find(&self, tile_id: &str) -> Option<usize> {
        self.index.get(tile_id).copied()
    }

    pub fn neighbor(&self, index: usize, direction: Direction) -> Option<usize> {
        self.edges[index][direction.index()]
    }

    pub fn neighbor_types(&self, index: usize) -> Vec<TileType> {
        self.edges[index]
            .iter()
            .flatten()
            .map(|&n| self.nodes[n].tile_type)
            .collect()
    }

    pub fn count(&self, tile_type: TileType) -> usize {
        self.nodes.iter().filter(|t| t.tile_type == tile_type).count()
    }

    /// Every edge has its mirror: if A points RIGHT at B, B points LEFT at A.
    pub fn is_reciprocal(&self) -> bool {
        self.edges.iter().enumerate().all(|(from, slots)| {
            Direction::ALL.into_iter().all(|direction| match slots[direction.index()] {
                Some(to) => self.neighbor(to, direction.opposite()) == Some(from),
                None => true,
            })
        })
    }

    /// Arena indices row by row, walking right then down from the origin.
    ///
    /// The walk stops at the chunk's dimensions, so edges that loop back on
    /// themselves cannot make it run forever.
    pub fn rows(&self) -> Vec<Vec<usize>> {
        let width = self.chunk.dimensions.width as usize;
        let height = self.chunk.dimensions.height as usize;
        let mut rows = Vec::new();
        let mut start = self.chunk.origin.as_deref().and_then(|id| self.find(id));
        while let Some(first) = start {
            if rows.len() == height {
                break;
            }
            let mut row = vec![first];
            let mut cursor = first;
            while row.len() < width {
                let Some(next) = self.neighbor(cursor, Direction::Right) else {
                    break;
                };
                row.push(next);
                cursor = next;
            }
            rows.push(row);
            start = self.neighbor(first, Direction::Down);
        }
        rows
    }

    /// One glyph per tile, one line per row.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() + self.nodes.len() / 4);
        for row in self.rows() {
            out.extend(row.into_iter().map(|i| self.nodes[i].tile_type.glyph()));
            out.push('\n');
        }
        out
    }
}
