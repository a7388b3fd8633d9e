//! Documents of the tile world: worlds, chunks, tiles and the entities living
//! on tiles, plus the coordinate grid used while a chunk is generated.

pub mod entity;
pub mod grid;
pub mod tile;
pub mod world;

pub use entity::{Entity, EntityType, Stage};
pub use grid::{Cell, Grid};
pub use tile::{Direction, Neighbors, ParseError, Tile, TileType};
pub use world::{Chunk, Dimensions, World};

/// Fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
