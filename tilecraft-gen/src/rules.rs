//! Tile transition rules.
//!
//! Each rule looks at a tile's current type and the types of its bound
//! neighbors and returns the type it converts to, or `None` to leave it.

use tilecraft_model::TileType;

/// Signature shared by the neighbor-driven phases.
pub type Rule = fn(TileType, &[TileType]) -> Option<TileType>;

fn has(neighbors: &[TileType], wanted: TileType) -> bool {
    neighbors.contains(&wanted)
}

/// Ocean cut off from all other ocean becomes inland water.
pub fn brackish(current: TileType, neighbors: &[TileType]) -> Option<TileType> {
    (current == TileType::Ocean && !has(neighbors, TileType::Ocean)).then_some(TileType::Water)
}

/// Land touching the ocean becomes shore.
pub fn erosion(current: TileType, neighbors: &[TileType]) -> Option<TileType> {
    let erodible = !matches!(
        current,
        TileType::Unknown | TileType::Ocean | TileType::Water | TileType::Shore
    );
    (erodible && has(neighbors, TileType::Ocean)).then_some(TileType::Shore)
}

/// Dirt by fresh water grows grass; grass with mixed wet surroundings grows
/// forest. Only ever moves dirt -> grass -> forest.
pub fn growth(current: TileType, neighbors: &[TileType]) -> Option<TileType> {
    match current {
        TileType::Dirt => {
            (has(neighbors, TileType::Water) && !has(neighbors, TileType::Ocean))
                .then_some(TileType::Grass)
        }
        TileType::Grass if has(neighbors, TileType::Ocean) => None,
        TileType::Grass => {
            let distinct = [TileType::Water, TileType::Grass, TileType::Ocean]
                .into_iter()
                .filter(|t| has(neighbors, *t))
                .count();
            (distinct >= 2).then_some(TileType::Forest)
        }
        _ => None,
    }
}
