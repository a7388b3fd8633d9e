//! Periodic simulation ticks.
//!
//! A tick walks every world, every member chunk and every member tile. Each
//! tile gets the growth rule re-applied and all of its entities advanced one
//! stage. Seeding never re-runs, so repeated ticks converge.

use crate::error::{Error, Result};
use crate::entity::EntityLifecycle;
use crate::pool;
use crate::rules;
use crate::stores::Stores;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tilecraft_benchmark::BenchmarkMetrics;
use tilecraft_storage::{Address, Error as StoreError};
use tokio::time::{interval, MissedTickBehavior};

/// What one tick (or one quantum) touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub chunks: usize,
    pub tiles: usize,
    pub converted: usize,
    pub advanced: usize,
}

impl TickSummary {
    fn absorb(&mut self, other: TickSummary) {
        self.chunks += other.chunks;
        self.tiles += other.tiles;
        self.converted += other.converted;
        self.advanced += other.advanced;
    }
}

pub struct QuantumScheduler {
    stores: Stores,
    lifecycle: Arc<EntityLifecycle>,
    workers: usize,
    metrics: Arc<BenchmarkMetrics>,
}

impl QuantumScheduler {
    pub fn new(
        stores: Stores,
        lifecycle: Arc<EntityLifecycle>,
        workers: usize,
        metrics: Arc<BenchmarkMetrics>,
    ) -> Self {
        Self {
            stores,
            lifecycle,
            workers: workers.max(1),
            metrics,
        }
    }

    /// One quantum over every chunk of every world.
    pub async fn tick(&self) -> Result<TickSummary> {
        let started = Instant::now();
        let mut summary = TickSummary::default();
        for world in self.stores.worlds.list(None).await? {
            let members = self.stores.worlds.get(&world).await?.data;
            for chunk_id in members.chunk_ids() {
                let chunk = world.with_chunk(chunk_id);
                match self.quantum(&chunk).await {
                    Ok(visited) => summary.absorb(visited),
                    // Deleted without being unlinked from its world.
                    Err(Error::Store(StoreError::NotFound(missing))) if missing == chunk => {
                        log::warn!("Skipping {chunk}: registered but missing");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        self.metrics.record_tick(started.elapsed(), summary.tiles);
        log::info!(
            "Tick: {} chunks, {} tiles, {} converted, {} entities advanced in {:.2?}",
            summary.chunks,
            summary.tiles,
            summary.converted,
            summary.advanced,
            started.elapsed()
        );
        Ok(summary)
    }

    /// One quantum over a single chunk. Tiles are visited concurrently in no
    /// particular order.
    pub async fn quantum(&self, chunk: &Address) -> Result<TickSummary> {
        let tiles: Vec<Address> = self
            .stores
            .chunks
            .get(chunk)
            .await?
            .data
            .tiles
            .into_iter()
            .map(|id| chunk.with_tile(id))
            .collect();
        let visited = tiles.len();

        let converted = Arc::new(AtomicUsize::new(0));
        let advanced = Arc::new(AtomicUsize::new(0));
        let stores = self.stores.clone();
        let lifecycle = Arc::clone(&self.lifecycle);
        let (c, a) = (Arc::clone(&converted), Arc::clone(&advanced));
        pool::drain(tiles, self.workers, move |tile| {
            let (stores, lifecycle) = (stores.clone(), Arc::clone(&lifecycle));
            let (converted, advanced) = (Arc::clone(&c), Arc::clone(&a));
            async move {
                if stores.apply_rule(&tile, rules::growth).await?.is_some() {
                    converted.fetch_add(1, Ordering::Relaxed);
                }
                let entities = stores.tiles.get(&tile).await?.data.entities;
                for id in entities {
                    lifecycle.advance(&tile.with_entity(id)).await?;
                    advanced.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            }
        })
        .await?;

        let summary = TickSummary {
            chunks: 1,
            tiles: visited,
            converted: converted.load(Ordering::Relaxed),
            advanced: advanced.load(Ordering::Relaxed),
        };
        log::debug!("Quantum over {chunk}: {summary:?}");
        Ok(summary)
    }

    /// Tick every `period` until `max_ticks` ticks have run, or forever.
    /// Returns the number of ticks run.
    pub async fn run(&self, period: Duration, max_ticks: Option<u64>) -> Result<u64> {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0;
        while max_ticks.is_none_or(|max| ticks < max) {
            timer.tick().await;
            self.tick().await?;
            ticks += 1;
        }
        Ok(ticks)
    }
}
