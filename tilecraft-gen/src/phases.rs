//! The terrain phases run after the flood.
//!
//! A phase visits each of its target cells independently; the generator drains
//! the targets concurrently and never starts a phase before the previous one
//! has finished. Every visit reads the current persisted state.

use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::rules::{self, Rule};
use crate::stores::Stores;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use std::sync::Arc;
use tilecraft_benchmark::Phase;
use tilecraft_model::{Cell, Direction, Grid, Tile, TileType};
use tilecraft_storage::Address;

/// Everything a phase needs to visit one cell of the chunk being generated.
pub struct GenContext {
    pub stores: Stores,
    pub chunk: Address,
    pub grid: Grid,
    pub biome: TileType,
    pub seed: u64,
    pub config: GeneratorConfig,
}

impl GenContext {
    pub fn tile_address(&self, cell: &Cell) -> Address {
        self.chunk.with_tile(self.grid.id(cell))
    }

    /// Per-cell random stream, independent of visit order.
    pub fn rng(&self, cell: &Cell, salt: u64) -> StdRng {
        let mixed = (cell.index as u64)
            .wrapping_add(1)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ salt.rotate_left(32);
        StdRng::seed_from_u64(self.seed ^ mixed)
    }
}

#[async_trait]
pub trait TerrainPhase: Send + Sync {
    fn phase(&self) -> Phase;

    /// Whether `cell` is visited at all.
    fn targets(&self, _ctx: &GenContext, _cell: &Cell) -> bool {
        true
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()>;
}

/// Posts an ocean tile for every cell.
pub struct Flood;

#[async_trait]
impl TerrainPhase for Flood {
    fn phase(&self) -> Phase {
        Phase::Flood
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()> {
        let tile = Tile::new(ctx.grid.id(&cell), TileType::Ocean);
        ctx.stores.tiles.post(&ctx.tile_address(&cell), tile).await?;
        Ok(())
    }
}

/// Points each tile at its in-grid neighbors.
///
/// Only the visited tile is written; the reverse edge comes from the
/// neighbor's own visit.
pub struct Bind;

#[async_trait]
impl TerrainPhase for Bind {
    fn phase(&self) -> Phase {
        Phase::Bind
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()> {
        let mut next = Map::new();
        for direction in Direction::ALL {
            if let Some(neighbor) = ctx.grid.neighbor(&cell, direction) {
                next.insert(
                    direction.as_str().to_string(),
                    Value::String(ctx.grid.id(&neighbor).to_string()),
                );
            }
        }
        if next.is_empty() {
            return Ok(());
        }
        let mut partial = Map::new();
        partial.insert("next".to_string(), Value::Object(next));
        ctx.stores
            .tiles
            .patch(&ctx.tile_address(&cell), Value::Object(partial))
            .await?;
        Ok(())
    }
}

/// Turns interior ocean into the chunk biome with probability `p_biome`.
pub struct SeedBiome;

#[async_trait]
impl TerrainPhase for SeedBiome {
    fn phase(&self) -> Phase {
        Phase::SeedBiome
    }

    fn targets(&self, ctx: &GenContext, cell: &Cell) -> bool {
        !ctx.grid.is_border(cell)
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()> {
        if !ctx.rng(&cell, 1).gen_bool(ctx.config.p_biome) {
            return Ok(());
        }
        let address = ctx.tile_address(&cell);
        let current = ctx.stores.tiles.get(&address).await?.data.tile_type;
        if current == TileType::Ocean {
            ctx.stores.set_tile_type(&address, ctx.biome).await?;
        }
        Ok(())
    }
}

/// Turns any tile into rock with probability `p_rock`.
pub struct SeedRock;

#[async_trait]
impl TerrainPhase for SeedRock {
    fn phase(&self) -> Phase {
        Phase::SeedRock
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()> {
        if ctx.rng(&cell, 2).gen_bool(ctx.config.p_rock) {
            ctx.stores
                .set_tile_type(&ctx.tile_address(&cell), TileType::Rock)
                .await?;
        }
        Ok(())
    }
}

/// Applies a neighbor-driven [`Rule`] to every tile.
pub struct RulePhase {
    phase: Phase,
    rule: Rule,
}

impl RulePhase {
    pub fn brackish() -> Self {
        Self {
            phase: Phase::Brackish,
            rule: rules::brackish,
        }
    }

    pub fn erosion() -> Self {
        Self {
            phase: Phase::Erosion,
            rule: rules::erosion,
        }
    }

    pub fn growth() -> Self {
        Self {
            phase: Phase::Growth,
            rule: rules::growth,
        }
    }
}

#[async_trait]
impl TerrainPhase for RulePhase {
    fn phase(&self) -> Phase {
        self.phase
    }

    async fn visit(&self, ctx: &GenContext, cell: Cell) -> Result<()> {
        let address = ctx.tile_address(&cell);
        if let Some(next) = ctx.stores.apply_rule(&address, self.rule).await? {
            log::trace!("{} turned {address} into {next}", self.phase.name());
        }
        Ok(())
    }
}

/// Phases 2 through 7, in order.
pub fn default_pipeline() -> Vec<Arc<dyn TerrainPhase>> {
    vec![
        Arc::new(Bind),
        Arc::new(SeedBiome),
        Arc::new(SeedRock),
        Arc::new(RulePhase::brackish()),
        Arc::new(RulePhase::erosion()),
        Arc::new(RulePhase::growth()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecraft_model::Dimensions;

    async fn context(seed: u64) -> GenContext {
        let root = std::env::temp_dir().join(format!("tilecraft-phase-{}", uuid::Uuid::new_v4()));
        let backend = tilecraft_storage::FileBackend::open(root).await.unwrap();
        GenContext {
            stores: Stores::file(&backend),
            chunk: Address::chunk("w", "c"),
            grid: Grid::allocate(Dimensions::new(4, 4)),
            biome: TileType::Dirt,
            seed,
            config: GeneratorConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_rng_is_stable_per_cell() {
        let ctx = context(42).await;
        let cell = ctx.grid.cell(1, 2).unwrap();
        let a: u64 = ctx.rng(&cell, 1).r#gen();
        let b: u64 = ctx.rng(&cell, 1).r#gen();
        assert_eq!(a, b);

        let other: u64 = ctx.rng(&cell, 2).r#gen();
        assert_ne!(a, other);
        let neighbor: u64 = ctx.rng(&ctx.grid.cell(2, 2).unwrap(), 1).r#gen();
        assert_ne!(a, neighbor);
    }

    #[tokio::test]
    async fn test_seed_biome_skips_border() {
        let ctx = context(1).await;
        let targeted = ctx.grid.cells().filter(|c| SeedBiome.targets(&ctx, c)).count();
        assert_eq!(targeted, 4);
        assert_eq!(ctx.grid.cells().filter(|c| SeedRock.targets(&ctx, c)).count(), 16);
    }

    #[test]
    fn test_pipeline_order() {
        let phases: Vec<_> = default_pipeline().iter().map(|p| p.phase()).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Bind,
                Phase::SeedBiome,
                Phase::SeedRock,
                Phase::Brackish,
                Phase::Erosion,
                Phase::Growth
            ]
        );
    }
}
