use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::phases::{default_pipeline, Flood, GenContext, TerrainPhase};
use crate::pool;
use crate::stores::Stores;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tilecraft_benchmark::{BenchmarkMetrics, Phase};
use tilecraft_model::{new_id, Cell, Chunk, Dimensions, Grid, TileType, World};
use tilecraft_storage::Address;

/// Builds chunks: a skeleton record, a flood of ocean tiles, then the
/// post-flood phases one after another.
pub struct TerrainGenerator {
    stores: Stores,
    config: GeneratorConfig,
    metrics: Arc<BenchmarkMetrics>,
}

impl TerrainGenerator {
    pub fn new(stores: Stores, config: GeneratorConfig, metrics: Arc<BenchmarkMetrics>) -> Self {
        Self {
            stores,
            config: config.normalized(),
            metrics,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Create an empty world and return its id.
    pub async fn create_world(&self, name: &str) -> Result<String> {
        let id = new_id();
        self.stores
            .worlds
            .post(&Address::world(&id), World::new(&id, name))
            .await?;
        log::info!("Created world {id} ({name})");
        Ok(id)
    }

    /// Generate a chunk in `world_id` with the full phase pipeline.
    ///
    /// `biome` defaults to dirt.
    pub async fn create(
        &self,
        world_id: &str,
        name: Option<String>,
        dimensions: Dimensions,
        biome: Option<TileType>,
    ) -> Result<String> {
        self.generate(world_id, name, dimensions, biome, &default_pipeline())
            .await
    }

    /// Generate a chunk running the skeleton and flood, then `phases` in
    /// order. Nothing is rolled back on failure; delete the chunk and start
    /// over.
    pub async fn generate(
        &self,
        world_id: &str,
        name: Option<String>,
        dimensions: Dimensions,
        biome: Option<TileType>,
        phases: &[Arc<dyn TerrainPhase>],
    ) -> Result<String> {
        if dimensions.is_empty() {
            return Err(Error::Factory(format!(
                "chunk dimensions must be positive, got {dimensions}"
            )));
        }
        let started = Instant::now();
        let biome = biome.unwrap_or(TileType::Dirt);
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let chunk_id = new_id();
        let chunk = Address::chunk(world_id, &chunk_id);

        // Phase 0
        let skeleton = Instant::now();
        self.stores
            .chunks
            .post(&chunk, Chunk::new(&chunk_id, name, dimensions, biome, seed))
            .await?;
        self.register_chunk(world_id, &chunk_id).await?;
        self.metrics.record_phase(Phase::Skeleton, skeleton.elapsed());

        let ctx = Arc::new(GenContext {
            stores: self.stores.clone(),
            chunk: chunk.clone(),
            grid: Grid::allocate(dimensions),
            biome,
            seed,
            config: self.config.clone(),
        });

        self.run_phase(&ctx, Arc::new(Flood)).await?;
        // Membership is written once, by this task alone, after every flood
        // worker has finished posting.
        self.stores
            .chunks
            .patch(
                &chunk,
                json!({
                    "tiles": ctx.grid.ids(),
                    "origin": ctx.grid.id_at(0, 0),
                }),
            )
            .await?;

        for phase in phases {
            self.run_phase(&ctx, Arc::clone(phase)).await?;
        }

        self.metrics.record_generation(started.elapsed(), ctx.grid.len());
        log::info!(
            "Generated chunk {chunk} ({dimensions}, biome {biome}, seed {seed}) in {:.2?}",
            started.elapsed()
        );
        Ok(chunk_id)
    }

    async fn run_phase(&self, ctx: &Arc<GenContext>, phase: Arc<dyn TerrainPhase>) -> Result<()> {
        let started = Instant::now();
        let cells: Vec<Cell> = ctx.grid.cells().filter(|c| phase.targets(ctx, c)).collect();
        let visited = cells.len();

        let (job_ctx, job_phase) = (Arc::clone(ctx), Arc::clone(&phase));
        pool::drain(cells, self.config.workers, move |cell| {
            let ctx = Arc::clone(&job_ctx);
            let phase = Arc::clone(&job_phase);
            async move { phase.visit(&ctx, cell).await }
        })
        .await?;

        self.metrics.record_phase(phase.phase(), started.elapsed());
        log::debug!(
            "Phase {} visited {visited} tiles of {} in {:.2?}",
            phase.phase().name(),
            ctx.chunk,
            started.elapsed()
        );
        Ok(())
    }

    /// Add `chunk_id` to the world's members. Each registration patches in
    /// its own key, so concurrent creates in one world all land.
    async fn register_chunk(&self, world_id: &str, chunk_id: &str) -> Result<()> {
        self.stores
            .worlds
            .patch(&Address::world(world_id), json!({ "chunks": { chunk_id: true } }))
            .await?;
        Ok(())
    }

    /// Delete a chunk with all its tiles and entities, and unlink it from its
    /// world.
    pub async fn delete_chunk(&self, chunk: &Address) -> Result<()> {
        self.stores.chunks.delete(chunk).await?;
        let id = chunk.id();
        self.stores
            .worlds
            .patch(&Address::world(&chunk.world_id), json!({ "chunks": { id: null } }))
            .await?;
        log::info!("Deleted chunk {chunk}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TileGraph;
    use crate::phases::Bind;
    use std::sync::atomic::Ordering;
    use tilecraft_storage::FileBackend;

    async fn generator(config: GeneratorConfig) -> (TerrainGenerator, Stores) {
        let root = std::env::temp_dir().join(format!("tilecraft-terrain-{}", uuid::Uuid::new_v4()));
        let backend = FileBackend::open(root).await.unwrap();
        let stores = Stores::file(&backend);
        let metrics = Arc::new(BenchmarkMetrics::default());
        (TerrainGenerator::new(stores.clone(), config, metrics), stores)
    }

    fn config(p_biome: f64, p_rock: f64, seed: u64) -> GeneratorConfig {
        GeneratorConfig::default()
            .with_probabilities(p_biome, p_rock)
            .with_workers(4)
            .with_seed(Some(seed))
    }

    fn border_types(graph: &TileGraph) -> Vec<TileType> {
        let rows = graph.rows();
        let (h, w) = (rows.len(), rows[0].len());
        let mut types = Vec::new();
        for (y, row) in rows.iter().enumerate() {
            for (x, &node) in row.iter().enumerate() {
                if x == 0 || y == 0 || x + 1 == w || y + 1 == h {
                    types.push(graph.node(node).tile_type);
                }
            }
        }
        types
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_five_by_five_chunk() {
        for seed in 0..4 {
            let (generator, stores) = generator(config(0.6, 0.2, seed)).await;
            let world = generator.create_world("w1").await.unwrap();
            let chunk_id = generator
                .create(&world, None, Dimensions::new(5, 5), Some(TileType::Dirt))
                .await
                .unwrap();

            let chunk = Address::chunk(&world, &chunk_id);
            let stored = stores.chunks.get(&chunk).await.unwrap().data;
            assert_eq!(stored.tiles.len(), 25);
            assert_eq!(stored.seed, seed);
            assert!(stored.origin.is_some());
            let owner = stores.worlds.get(&Address::world(&world)).await.unwrap().data;
            assert!(owner.chunk_ids().any(|id| id == chunk_id));

            let graph = TileGraph::load(&stores, &chunk).await.unwrap();
            let border = border_types(&graph);
            assert_eq!(border.len(), 16);
            for t in border {
                assert!(
                    matches!(t, TileType::Ocean | TileType::Water | TileType::Rock | TileType::Shore),
                    "border tile became {t}"
                );
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_after_bind_border_is_ocean_and_edges_reciprocal() {
        let (generator, stores) = generator(config(1.0, 0.0, 3)).await;
        let world = generator.create_world("w1").await.unwrap();
        let chunk_id = generator
            .generate(&world, None, Dimensions::new(6, 4), None, &[Arc::new(Bind) as Arc<dyn TerrainPhase>])
            .await
            .unwrap();

        let graph = TileGraph::load(&stores, &Address::chunk(&world, &chunk_id))
            .await
            .unwrap();
        assert_eq!(graph.len(), 24);
        assert!(graph.is_reciprocal());
        assert!(border_types(&graph).iter().all(|t| *t == TileType::Ocean));
        assert_eq!(graph.count(TileType::Ocean), 24);

        let rows = graph.rows();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|row| row.len() == 6));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_full_biome_erodes_ring_to_shore() {
        let (generator, stores) = generator(config(1.0, 0.0, 9)).await;
        let world = generator.create_world("w1").await.unwrap();
        let chunk_id = generator
            .create(&world, None, Dimensions::new(5, 5), None)
            .await
            .unwrap();

        let graph = TileGraph::load(&stores, &Address::chunk(&world, &chunk_id))
            .await
            .unwrap();
        assert_eq!(graph.count(TileType::Ocean), 16);
        assert_eq!(graph.count(TileType::Shore), 8);
        assert_eq!(graph.count(TileType::Dirt), 1);
        let rows = graph.rows();
        assert_eq!(graph.node(rows[2][2]).tile_type, TileType::Dirt);
    }

    #[tokio::test]
    async fn test_empty_biome_stays_ocean() {
        let (generator, stores) = generator(config(0.0, 0.0, 1)).await;
        let world = generator.create_world("w1").await.unwrap();
        let chunk_id = generator
            .create(&world, Some("sea".into()), Dimensions::new(4, 4), None)
            .await
            .unwrap();
        let graph = TileGraph::load(&stores, &Address::chunk(&world, &chunk_id))
            .await
            .unwrap();
        assert_eq!(graph.count(TileType::Ocean), 16);
        assert_eq!(graph.chunk().name.as_deref(), Some("sea"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_shore_touches_ocean() {
        for seed in 10..14 {
            let (generator, stores) = generator(config(0.7, 0.15, seed)).await;
            let world = generator.create_world("w1").await.unwrap();
            let chunk_id = generator
                .create(&world, None, Dimensions::new(8, 8), None)
                .await
                .unwrap();
            let graph = TileGraph::load(&stores, &Address::chunk(&world, &chunk_id))
                .await
                .unwrap();
            for index in 0..graph.len() {
                if graph.node(index).tile_type == TileType::Shore {
                    assert!(
                        graph
                            .neighbor_types(index)
                            .contains(&TileType::Ocean),
                        "shore without ocean neighbor (seed {seed})"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_missing_world_is_not_found() {
        let (generator, _) = generator(config(0.5, 0.0, 1)).await;
        let err = generator
            .create("nowhere", None, Dimensions::new(3, 3), None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_empty_dimensions_rejected() {
        let (generator, _) = generator(config(0.5, 0.0, 1)).await;
        let world = generator.create_world("w1").await.unwrap();
        let err = generator
            .create(&world, None, Dimensions::new(0, 3), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Factory(_)));
    }

    #[tokio::test]
    async fn test_delete_chunk_unlinks_world() {
        let (generator, stores) = generator(config(0.5, 0.1, 5)).await;
        let world = generator.create_world("w1").await.unwrap();
        let chunk_id = generator
            .create(&world, None, Dimensions::new(3, 3), None)
            .await
            .unwrap();
        let chunk = Address::chunk(&world, &chunk_id);
        let origin = stores.chunks.get(&chunk).await.unwrap().data.origin.unwrap();

        generator.delete_chunk(&chunk).await.unwrap();
        let owner = stores.worlds.get(&Address::world(&world)).await.unwrap().data;
        assert!(owner.chunks.is_empty());
        assert!(stores.tiles.get(&chunk.with_tile(origin)).await.is_err());
    }

    #[tokio::test]
    async fn test_generation_is_recorded() {
        let root = std::env::temp_dir().join(format!("tilecraft-terrain-{}", uuid::Uuid::new_v4()));
        let backend = FileBackend::open(root).await.unwrap();
        let metrics = Arc::new(BenchmarkMetrics::default());
        let generator =
            TerrainGenerator::new(Stores::file(&backend), config(0.5, 0.0, 2), Arc::clone(&metrics));
        let world = generator.create_world("w1").await.unwrap();
        generator
            .create(&world, None, Dimensions::new(3, 2), None)
            .await
            .unwrap();
        assert_eq!(metrics.total_chunks_generated.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_tiles_generated.load(Ordering::Relaxed), 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_all_register() {
        let (generator, stores) = generator(config(0.5, 0.1, 8)).await;
        let generator = Arc::new(generator);
        let world = generator.create_world("w1").await.unwrap();

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let (generator, world) = (Arc::clone(&generator), world.clone());
            set.spawn(async move {
                generator
                    .create(&world, None, Dimensions::new(3, 3), None)
                    .await
            });
        }
        let mut created = Vec::new();
        while let Some(joined) = set.join_next().await {
            created.push(joined.unwrap().unwrap());
        }
        created.sort();

        let owner = stores.worlds.get(&Address::world(&world)).await.unwrap().data;
        let registered: Vec<_> = owner.chunk_ids().map(String::from).collect();
        assert_eq!(registered, created);
        let on_disk = stores.chunks.list(Some(&Address::world(&world))).await.unwrap();
        assert_eq!(on_disk.len(), 8);
    }
}
