use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Generation phases tracked individually in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Skeleton,
    Flood,
    Bind,
    SeedBiome,
    SeedRock,
    Brackish,
    Erosion,
    Growth,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Skeleton,
        Phase::Flood,
        Phase::Bind,
        Phase::SeedBiome,
        Phase::SeedRock,
        Phase::Brackish,
        Phase::Erosion,
        Phase::Growth,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Skeleton => "skeleton",
            Phase::Flood => "flood",
            Phase::Bind => "bind",
            Phase::SeedBiome => "seed-biome",
            Phase::SeedRock => "seed-rock",
            Phase::Brackish => "brackish",
            Phase::Erosion => "erosion",
            Phase::Growth => "growth",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
pub struct BenchmarkMetrics {
    // Generation Stats
    pub total_chunks_generated: AtomicUsize,
    pub total_generation_time_us: AtomicU64,
    pub max_generation_time_us: AtomicU64,
    pub total_tiles_generated: AtomicUsize,

    // Per-phase breakdown, indexed by `Phase`
    pub phase_time_us: [AtomicU64; 8],

    // Simulation
    pub total_ticks: AtomicUsize,
    pub total_tick_time_us: AtomicU64,
    pub total_tiles_ticked: AtomicUsize,
    pub total_entities_spawned: AtomicUsize,
    pub total_entities_advanced: AtomicUsize,

    // Storage Stats
    pub total_documents_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub total_documents_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub total_inconsistencies: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
    pub config_summary: String,
}

impl BenchmarkMetrics {
    pub fn new(config_summary: String) -> Self {
        Self {
            start_time: Some(Instant::now()),
            config_summary,
            ..Default::default()
        }
    }

    pub fn record_generation(&self, duration: Duration, tiles: usize) {
        self.total_chunks_generated.fetch_add(1, Ordering::Relaxed);
        self.total_tiles_generated.fetch_add(tiles, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_generation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_phase(&self, phase: Phase, duration: Duration) {
        self.phase_time_us[phase.slot()].fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_tick(&self, duration: Duration, tiles: usize) {
        self.total_ticks.fetch_add(1, Ordering::Relaxed);
        self.total_tiles_ticked.fetch_add(tiles, Ordering::Relaxed);
        self.total_tick_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_spawn(&self, count: usize) {
        self.total_entities_spawned.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_advance(&self) {
        self.total_entities_advanced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_documents_loaded.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_documents_saved.fetch_add(1, Ordering::Relaxed);
        self.total_save_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_inconsistency(&self) {
        self.total_inconsistencies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let generated = self.total_chunks_generated.load(Ordering::Relaxed);
        let tiles = self.total_tiles_generated.load(Ordering::Relaxed);
        let gen_time_total = self.total_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let gen_max = self.max_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let gen_avg = average(gen_time_total, generated);

        let mut phases = String::new();
        for phase in Phase::ALL {
            let total = self.phase_time_us[phase.slot()].load(Ordering::Relaxed) as f64 / 1000.0;
            phases.push_str(&format!(
                "    * {:<10} {:.2} ms/chunk\n",
                phase.name(),
                average(total, generated)
            ));
        }

        let ticks = self.total_ticks.load(Ordering::Relaxed);
        let tick_time = self.total_tick_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let ticked = self.total_tiles_ticked.load(Ordering::Relaxed);
        let spawned = self.total_entities_spawned.load(Ordering::Relaxed);
        let advanced = self.total_entities_advanced.load(Ordering::Relaxed);

        let loaded = self.total_documents_loaded.load(Ordering::Relaxed);
        let load_time = self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let saved = self.total_documents_saved.load(Ordering::Relaxed);
        let save_time = self.total_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let inconsistencies = self.total_inconsistencies.load(Ordering::Relaxed);

        format!(
            "Tilecraft Benchmark Report\n\
             ==========================\n\
             Configuration: {}\n\
             Session Duration: {:.2?}\n\n\
             [Generation]\n\
             Chunks Generated: {}\n\
             Tiles Generated: {}\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\
             \x20 - Phase Breakdown:\n\
             {}\n\
             [Simulation]\n\
             Ticks: {}\n\
             Avg Tick: {:.2} ms\n\
             Tiles Ticked: {}\n\
             Entities Spawned: {}\n\
             Entities Advanced: {}\n\n\
             [Storage]\n\
             Documents Loaded: {} (avg {:.3} ms)\n\
             Documents Saved: {} (avg {:.3} ms)\n\
             Inconsistencies: {}\n",
            self.config_summary,
            uptime,
            generated,
            tiles,
            gen_avg,
            gen_max,
            phases,
            ticks,
            average(tick_time, ticks),
            ticked,
            spawned,
            advanced,
            loaded,
            average(load_time, loaded),
            saved,
            average(save_time, saved),
            inconsistencies,
        )
    }
}

fn average(total: f64, count: usize) -> f64 {
    if count > 0 { total / count as f64 } else { 0.0 }
}
