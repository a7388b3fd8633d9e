use crate::tile::TileType;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tilecraft_storage::{Document, DocumentKind};

/// Top-level container of chunks.
///
/// Members are kept as an object keyed by chunk id so that concurrent
/// registrations can each patch in their own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chunks: BTreeMap<String, bool>,
}

impl World {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            chunks: BTreeMap::new(),
        }
    }

    /// Ids of the registered chunks.
    pub fn chunk_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.chunks
            .iter()
            .filter(|(_, registered)| **registered)
            .map(|(id, _)| id.as_str())
    }
}

impl Document for World {
    const KIND: DocumentKind = DocumentKind::World;
}

/// Width and height of a chunk, in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn tile_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One generated rectangular landmass.
///
/// `origin` is the tile at grid position (0, 0); every other tile is reachable
/// from it by following `right` and `down` adjacency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub dimensions: Dimensions,
    pub biome: TileType,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub tiles: BTreeSet<String>,
    #[serde(default)]
    pub seed: u64,
}

impl Chunk {
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        dimensions: Dimensions,
        biome: TileType,
        seed: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name,
            dimensions,
            biome,
            origin: None,
            tiles: BTreeSet::new(),
            seed,
        }
    }
}

impl Document for Chunk {
    const KIND: DocumentKind = DocumentKind::Chunk;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        assert_eq!(Dimensions::new(5, 4).tile_count(), 20);
        assert!(Dimensions::new(0, 4).is_empty());
        assert_eq!(Dimensions::new(5, 4).to_string(), "5x4");
    }

    #[test]
    fn test_world_chunk_ids() {
        let world: World = serde_json::from_value(serde_json::json!({
            "id": "w",
            "name": "w",
            "chunks": { "b": true, "a": true, "gone": false }
        }))
        .unwrap();
        assert_eq!(world.chunk_ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(World::new("w", "w").chunk_ids().count(), 0);
    }

    #[test]
    fn test_chunk_defaults_on_read() {
        let chunk: Chunk = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "dimensions": { "width": 3, "height": 3 },
            "biome": "dirt"
        }))
        .unwrap();
        assert_eq!(chunk.name, None);
        assert!(chunk.tiles.is_empty());
        assert_eq!(chunk.biome, TileType::Dirt);
    }
}
