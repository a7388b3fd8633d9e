use crate::config::GeneratorConfig;
use crate::entity::EntityLifecycle;
use crate::error::Result;
use crate::scheduler::{QuantumScheduler, TickSummary};
use crate::stores::Stores;
use crate::terrain::TerrainGenerator;
use std::sync::Arc;
use tilecraft_benchmark::BenchmarkMetrics;
use tilecraft_model::{Dimensions, TileType};
use tilecraft_storage::Address;

/// The generator, lifecycle and scheduler wired to one set of stores.
///
/// This is the surface an outer layer (the CLI, or an HTTP front end) talks
/// to; the raw stores stay reachable through [`Engine::stores`].
pub struct Engine {
    stores: Stores,
    generator: TerrainGenerator,
    lifecycle: Arc<EntityLifecycle>,
    scheduler: QuantumScheduler,
    metrics: Arc<BenchmarkMetrics>,
}

impl Engine {
    pub fn new(stores: Stores, config: GeneratorConfig, metrics: Arc<BenchmarkMetrics>) -> Self {
        let config = config.normalized();
        let lifecycle = Arc::new(EntityLifecycle::new(stores.clone(), Arc::clone(&metrics)));
        let scheduler = QuantumScheduler::new(
            stores.clone(),
            Arc::clone(&lifecycle),
            config.workers,
            Arc::clone(&metrics),
        );
        let generator = TerrainGenerator::new(stores.clone(), config, Arc::clone(&metrics));
        Self {
            stores,
            generator,
            lifecycle,
            scheduler,
            metrics,
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    pub fn lifecycle(&self) -> &EntityLifecycle {
        &self.lifecycle
    }

    pub fn scheduler(&self) -> &QuantumScheduler {
        &self.scheduler
    }

    pub fn metrics(&self) -> &Arc<BenchmarkMetrics> {
        &self.metrics
    }

    pub async fn create_world(&self, name: &str) -> Result<String> {
        self.generator.create_world(name).await
    }

    pub async fn create_chunk(
        &self,
        world_id: &str,
        name: Option<String>,
        dimensions: Dimensions,
        biome: Option<TileType>,
    ) -> Result<String> {
        self.generator.create(world_id, name, dimensions, biome).await
    }

    pub async fn quantum(&self, world_id: &str, chunk_id: &str) -> Result<TickSummary> {
        self.scheduler
            .quantum(&Address::chunk(world_id, chunk_id))
            .await
    }

    pub async fn populate(&self, tile: &Address) -> Result<Vec<String>> {
        self.lifecycle.populate(tile).await
    }

    pub async fn tick(&self) -> Result<TickSummary> {
        self.scheduler.tick().await
    }
}
