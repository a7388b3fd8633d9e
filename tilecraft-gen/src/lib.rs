//! Terrain generation, entity lifecycle and the simulation scheduler, all
//! working through the document stores.

pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod graph;
pub mod phases;
pub mod pool;
pub mod rules;
pub mod scheduler;
pub mod stores;
pub mod terrain;

pub use config::GeneratorConfig;
pub use engine::Engine;
pub use entity::{spawns_for, EntityLifecycle, EntitySpecies, StagedSpecies};
pub use error::{Error, Result};
pub use graph::TileGraph;
pub use phases::{default_pipeline, GenContext, TerrainPhase};
pub use scheduler::{QuantumScheduler, TickSummary};
pub use stores::Stores;
pub use terrain::TerrainGenerator;
