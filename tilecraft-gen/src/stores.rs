use crate::error::Result;
use crate::rules::Rule;
use serde_json::json;
use std::sync::Arc;
use tilecraft_model::{Chunk, Entity, Tile, TileType, World};
use tilecraft_storage::{Address, DocumentStore, FileBackend};

/// One store per document kind, constructed once and handed to everything
/// that reads or writes the world.
#[derive(Clone)]
pub struct Stores {
    pub worlds: Arc<dyn DocumentStore<World>>,
    pub chunks: Arc<dyn DocumentStore<Chunk>>,
    pub tiles: Arc<dyn DocumentStore<Tile>>,
    pub entities: Arc<dyn DocumentStore<Entity>>,
}

impl Stores {
    /// Stores for every kind backed by the same directory tree.
    pub fn file(backend: &Arc<FileBackend>) -> Self {
        Self {
            worlds: Arc::new(backend.store::<World>()),
            chunks: Arc::new(backend.store::<Chunk>()),
            tiles: Arc::new(backend.store::<Tile>()),
            entities: Arc::new(backend.store::<Entity>()),
        }
    }

    /// Current persisted types of every bound neighbor of `tile`.
    ///
    /// `address` is the tile's own address; neighbors share its chunk.
    pub async fn neighbor_types(&self, address: &Address, tile: &Tile) -> Result<Vec<TileType>> {
        let mut types = Vec::with_capacity(4);
        for (_, id) in tile.next.iter() {
            let neighbor = self.tiles.get(&address.with_tile(id)).await?;
            types.push(neighbor.data.tile_type);
        }
        Ok(types)
    }

    /// Read the tile and its neighbors, apply `rule`, and patch the tile's
    /// type when the rule fires. Returns the new type.
    pub async fn apply_rule(&self, address: &Address, rule: Rule) -> Result<Option<TileType>> {
        let tile = self.tiles.get(address).await?.data;
        let neighbors = self.neighbor_types(address, &tile).await?;
        match rule(tile.tile_type, &neighbors) {
            Some(next) if next != tile.tile_type => {
                self.set_tile_type(address, next).await?;
                Ok(Some(next))
            }
            _ => Ok(None),
        }
    }

    pub async fn set_tile_type(&self, address: &Address, tile_type: TileType) -> Result<()> {
        self.tiles.patch(address, json!({ "tile_type": tile_type })).await?;
        Ok(())
    }
}
