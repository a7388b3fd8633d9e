//! Entities living on tiles: what spawns where, and how each species grows.

use crate::error::{Error, Result};
use crate::stores::Stores;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tilecraft_benchmark::BenchmarkMetrics;
use tilecraft_model::{new_id, Entity, EntityType, Stage, TileType};
use tilecraft_storage::Address;

/// A species and its stage machine.
pub trait EntitySpecies: Send + Sync {
    fn entity_type(&self) -> EntityType;

    /// Stages in growth order. The last one is terminal.
    fn stages(&self) -> &'static [Stage];

    fn first_stage(&self) -> Stage {
        self.stages().first().copied().unwrap_or(Stage::Mature)
    }

    /// The stage after `stage`, or `None` if `stage` is not one of ours.
    /// A terminal stage advances to itself.
    fn advance(&self, stage: Stage) -> Option<Stage> {
        let stages = self.stages();
        let at = stages.iter().position(|s| *s == stage)?;
        Some(stages[(at + 1).min(stages.len() - 1)])
    }
}

/// Species whose stage machine is a fixed linear sequence.
pub struct StagedSpecies {
    entity_type: EntityType,
    stages: &'static [Stage],
}

impl StagedSpecies {
    pub const fn new(entity_type: EntityType, stages: &'static [Stage]) -> Self {
        Self { entity_type, stages }
    }

    pub const fn tree() -> Self {
        Self::new(
            EntityType::Tree,
            &[Stage::Seed, Stage::Sapling, Stage::Fruit, Stage::Mature],
        )
    }

    pub const fn grass() -> Self {
        Self::new(EntityType::Grass, &[Stage::Seed, Stage::Sprout, Stage::Mature])
    }

    pub const fn mycelium() -> Self {
        Self::new(
            EntityType::Mycelium,
            &[Stage::Spore, Stage::Hyphae, Stage::Mature],
        )
    }

    pub const fn fish() -> Self {
        Self::new(EntityType::Fish, &[Stage::Egg, Stage::Fry, Stage::Mature])
    }
}

impl EntitySpecies for StagedSpecies {
    fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    fn stages(&self) -> &'static [Stage] {
        self.stages
    }
}

/// Species spawned on a freshly populated tile of the given type.
pub fn spawns_for(tile_type: TileType) -> &'static [EntityType] {
    match tile_type {
        TileType::Grass => &[EntityType::Grass],
        TileType::Forest => &[EntityType::Tree, EntityType::Mycelium],
        TileType::Ocean => &[EntityType::Fish],
        _ => &[],
    }
}

/// Spawns, advances and removes entities.
pub struct EntityLifecycle {
    stores: Stores,
    species: HashMap<EntityType, Arc<dyn EntitySpecies>>,
    metrics: Arc<BenchmarkMetrics>,
}

impl EntityLifecycle {
    /// Lifecycle with the four built-in species registered.
    pub fn new(stores: Stores, metrics: Arc<BenchmarkMetrics>) -> Self {
        let mut lifecycle = Self {
            stores,
            species: HashMap::new(),
            metrics,
        };
        lifecycle.register(Arc::new(StagedSpecies::tree()));
        lifecycle.register(Arc::new(StagedSpecies::grass()));
        lifecycle.register(Arc::new(StagedSpecies::mycelium()));
        lifecycle.register(Arc::new(StagedSpecies::fish()));
        lifecycle
    }

    /// Register or replace the stage machine for a species.
    pub fn register(&mut self, species: Arc<dyn EntitySpecies>) {
        self.species.insert(species.entity_type(), species);
    }

    fn species(&self, entity_type: EntityType) -> Result<&Arc<dyn EntitySpecies>> {
        self.species
            .get(&entity_type)
            .ok_or_else(|| Error::Factory(format!("no species registered for {entity_type}")))
    }

    /// Spawn the entities a tile's type calls for and link them to the tile.
    ///
    /// Fails if the tile already has entities. A tile type that spawns
    /// nothing returns an empty list and writes nothing.
    pub async fn populate(&self, tile: &Address) -> Result<Vec<String>> {
        let mut wrapped = self.stores.tiles.get(tile).await?;
        if !wrapped.data.entities.is_empty() {
            return Err(Error::Factory(format!(
                "tile {tile} already has {} entities",
                wrapped.data.entities.len()
            )));
        }

        let mut spawned = Vec::new();
        for &entity_type in spawns_for(wrapped.data.tile_type) {
            let stage = self.species(entity_type)?.first_stage();
            let id = new_id();
            self.stores
                .entities
                .post(&tile.with_entity(&id), Entity::new(&id, entity_type, stage))
                .await?;
            spawned.push(id);
        }
        if spawned.is_empty() {
            return Ok(spawned);
        }

        wrapped.data.entities.extend(spawned.iter().cloned());
        self.stores.tiles.put(tile, wrapped).await?;
        self.metrics.record_spawn(spawned.len());
        log::debug!("Populated {tile} with {} entities", spawned.len());
        Ok(spawned)
    }

    /// Move an entity at most one stage forward and refresh its timestamp.
    pub async fn advance(&self, entity: &Address) -> Result<Entity> {
        let current = self.stores.entities.get(entity).await?.data;
        let species = self.species(current.entity_type)?;
        let next = species.advance(current.stage).ok_or_else(|| {
            Error::Factory(format!(
                "{:?} is not a stage of {}",
                current.stage, current.entity_type
            ))
        })?;
        let updated = self
            .stores
            .entities
            .patch(entity, json!({ "stage": next, "last_updated": Utc::now() }))
            .await?;
        self.metrics.record_advance();
        Ok(updated.data)
    }

    /// Delete an entity and unlink it from its tile.
    pub async fn remove(&self, entity: &Address) -> Result<()> {
        self.stores.entities.delete(entity).await?;
        let Some(tile) = entity.parent() else {
            return Ok(());
        };
        let mut wrapped = self.stores.tiles.get(&tile).await?;
        if wrapped.data.entities.remove(entity.id()) {
            self.stores.tiles.put(&tile, wrapped).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecraft_model::{Chunk, Dimensions, Tile, World};
    use tilecraft_storage::FileBackend;

    async fn lifecycle() -> (EntityLifecycle, Stores, Address) {
        let root = std::env::temp_dir().join(format!("tilecraft-entity-{}", uuid::Uuid::new_v4()));
        let stores = Stores::file(&FileBackend::open(root).await.unwrap());
        stores.worlds.post(&Address::world("w"), World::new("w", "w")).await.unwrap();
        let chunk = Address::chunk("w", "c");
        stores
            .chunks
            .post(&chunk, Chunk::new("c", None, Dimensions::new(1, 1), TileType::Dirt, 0))
            .await
            .unwrap();
        let metrics = Arc::new(BenchmarkMetrics::default());
        (EntityLifecycle::new(stores.clone(), metrics), stores, chunk)
    }

    async fn tile(stores: &Stores, chunk: &Address, id: &str, tile_type: TileType) -> Address {
        let address = chunk.with_tile(id);
        stores.tiles.post(&address, Tile::new(id, tile_type)).await.unwrap();
        address
    }

    #[test]
    fn test_stage_machines() {
        let tree = StagedSpecies::tree();
        assert_eq!(tree.first_stage(), Stage::Seed);
        assert_eq!(tree.advance(Stage::Seed), Some(Stage::Sapling));
        assert_eq!(tree.advance(Stage::Sapling), Some(Stage::Fruit));
        assert_eq!(tree.advance(Stage::Fruit), Some(Stage::Mature));
        assert_eq!(tree.advance(Stage::Mature), Some(Stage::Mature));
        assert_eq!(tree.advance(Stage::Egg), None);

        assert_eq!(StagedSpecies::mycelium().first_stage(), Stage::Spore);
        assert_eq!(StagedSpecies::grass().advance(Stage::Seed), Some(Stage::Sprout));
    }

    #[test]
    fn test_spawn_table() {
        assert_eq!(spawns_for(TileType::Grass), &[EntityType::Grass]);
        assert_eq!(
            spawns_for(TileType::Forest),
            &[EntityType::Tree, EntityType::Mycelium]
        );
        assert_eq!(spawns_for(TileType::Ocean), &[EntityType::Fish]);
        for t in [TileType::Dirt, TileType::Rock, TileType::Shore, TileType::Water] {
            assert!(spawns_for(t).is_empty());
        }
    }

    #[tokio::test]
    async fn test_populate_forest() {
        let (lifecycle, stores, chunk) = lifecycle().await;
        let address = tile(&stores, &chunk, "t", TileType::Forest).await;

        let spawned = lifecycle.populate(&address).await.unwrap();
        assert_eq!(spawned.len(), 2);

        let stored = stores.tiles.get(&address).await.unwrap().data;
        assert_eq!(stored.entities.len(), 2);
        let mut types = Vec::new();
        for id in &spawned {
            let entity = stores.entities.get(&address.with_entity(id)).await.unwrap().data;
            types.push(entity.entity_type);
        }
        types.sort_by_key(|t| t.as_str());
        assert_eq!(types, vec![EntityType::Mycelium, EntityType::Tree]);
    }

    #[tokio::test]
    async fn test_populate_twice_is_rejected() {
        let (lifecycle, stores, chunk) = lifecycle().await;
        let address = tile(&stores, &chunk, "t", TileType::Grass).await;
        lifecycle.populate(&address).await.unwrap();

        let err = lifecycle.populate(&address).await.unwrap_err();
        assert!(matches!(err, Error::Factory(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_populate_barren_tile_is_noop() {
        let (lifecycle, stores, chunk) = lifecycle().await;
        let address = tile(&stores, &chunk, "t", TileType::Rock).await;
        let before = stores.tiles.get(&address).await.unwrap().nonce;

        assert!(lifecycle.populate(&address).await.unwrap().is_empty());
        assert!(lifecycle.populate(&address).await.unwrap().is_empty());
        assert_eq!(stores.tiles.get(&address).await.unwrap().nonce, before);
    }

    #[tokio::test]
    async fn test_fish_grows_up() {
        let (lifecycle, stores, chunk) = lifecycle().await;
        let address = tile(&stores, &chunk, "t", TileType::Ocean).await;
        let fish = address.with_entity(&lifecycle.populate(&address).await.unwrap()[0]);

        let egg = stores.entities.get(&fish).await.unwrap().data;
        assert_eq!(egg.stage, Stage::Egg);
        let fry = lifecycle.advance(&fish).await.unwrap();
        assert_eq!(fry.stage, Stage::Fry);
        assert!(fry.last_updated >= egg.last_updated);
        assert_eq!(lifecycle.advance(&fish).await.unwrap().stage, Stage::Mature);
        assert_eq!(lifecycle.advance(&fish).await.unwrap().stage, Stage::Mature);
    }

    #[tokio::test]
    async fn test_patch_missing_tile_is_not_found() {
        let (_, stores, chunk) = lifecycle().await;
        let err = stores
            .tiles
            .patch(&chunk.with_tile("missing"), json!({ "tile_type": "shore" }))
            .await
            .unwrap_err();
        assert!(matches!(err, tilecraft_storage::Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_unlinks_from_tile() {
        let (lifecycle, stores, chunk) = lifecycle().await;
        let address = tile(&stores, &chunk, "t", TileType::Forest).await;
        let spawned = lifecycle.populate(&address).await.unwrap();

        let gone = address.with_entity(&spawned[0]);
        lifecycle.remove(&gone).await.unwrap();
        assert!(stores.entities.get(&gone).await.is_err());
        let stored = stores.tiles.get(&address).await.unwrap().data;
        assert_eq!(stored.entities.len(), 1);
        assert!(stored.entities.contains(&spawned[1]));
    }
}
