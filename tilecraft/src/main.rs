use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tilecraft_benchmark::BenchmarkMetrics;
use tilecraft_gen::{Engine, GeneratorConfig, Stores, TileGraph};
use tilecraft_model::{Dimensions, TileType};
use tilecraft_storage::{Address, DocumentKind, FileBackend};

#[derive(Parser)]
#[command(name = "tilecraft", about = "Tile world generator and simulator over a document store")]
pub struct Args {
    /// Root directory of the document store
    #[arg(short, long, env = "TILECRAFT_DATA", default_value = "./world-data")]
    pub data_dir: PathBuf,

    /// Worker tasks per phase or tick (defaults to the CPU count)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Seed for the stochastic phases (random if unset)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Chance that an interior tile takes the chunk's biome
    #[arg(long)]
    pub p_biome: Option<f64>,

    /// Chance that any tile becomes rock
    #[arg(long)]
    pub p_rock: Option<f64>,

    /// Print the benchmark report on exit
    #[arg(long)]
    pub report: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty world
    CreateWorld { name: String },
    /// Generate a chunk inside a world
    CreateChunk {
        world: String,
        #[arg(long, default_value_t = 16)]
        width: u32,
        #[arg(long, default_value_t = 16)]
        height: u32,
        #[arg(long)]
        name: Option<String>,
        /// Land type seeded into the interior: dirt, grass, rock, ...
        #[arg(long)]
        biome: Option<TileType>,
    },
    /// Print a chunk as a glyph map
    Show { world: String, chunk: String },
    /// Spawn entities on a tile
    Populate {
        world: String,
        chunk: String,
        tile: String,
    },
    /// Run one quantum over a chunk
    Quantum { world: String, chunk: String },
    /// Tick every world on a fixed period
    Simulate {
        /// Stop after this many ticks (runs forever if unset)
        #[arg(long)]
        ticks: Option<u64>,
        #[arg(long, default_value_t = 1000)]
        period_ms: u64,
    },
    /// Print the raw document at a path like worlds/{w}/chunks/{c}
    Get { address: Address },
    /// Delete the document at a path and everything beneath it
    Delete { address: Address },
}

impl Args {
    fn config(&self) -> GeneratorConfig {
        let defaults = GeneratorConfig::default();
        let mut config = defaults
            .clone()
            .with_probabilities(
                self.p_biome.unwrap_or(defaults.p_biome),
                self.p_rock.unwrap_or(defaults.p_rock),
            )
            .with_seed(self.seed);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = args.config();

    let metrics = Arc::new(BenchmarkMetrics::new(config.summary()));
    let backend = FileBackend::open_with_metrics(args.data_dir.clone(), Arc::clone(&metrics))
        .await
        .with_context(|| format!("opening store at {}", args.data_dir.display()))?;
    log::info!("Using store at {:?} ({})", args.data_dir, config.summary());
    let engine = Engine::new(Stores::file(&backend), config, Arc::clone(&metrics));

    run(&engine, args.command).await?;

    if args.report {
        println!("{}", metrics.generate_report());
    }
    Ok(())
}

async fn run(engine: &Engine, command: Command) -> Result<()> {
    match command {
        Command::CreateWorld { name } => {
            let id = engine.create_world(&name).await.context("creating world")?;
            println!("{id}");
        }
        Command::CreateChunk {
            world,
            width,
            height,
            name,
            biome,
        } => {
            let id = engine
                .create_chunk(&world, name, Dimensions::new(width, height), biome)
                .await
                .with_context(|| format!("generating chunk in world {world}"))?;
            println!("{id}");
        }
        Command::Show { world, chunk } => {
            let address = Address::chunk(world, chunk);
            let graph = TileGraph::load(engine.stores(), &address)
                .await
                .with_context(|| format!("loading {address}"))?;
            let record = graph.chunk();
            println!(
                "{} {} biome={} seed={}",
                record.name.as_deref().unwrap_or(&record.id),
                record.dimensions,
                record.biome,
                record.seed
            );
            print!("{}", graph.render());
            for tile_type in TileType::ALL {
                let count = graph.count(tile_type);
                if count > 0 {
                    println!("  {} {:<7} {}", tile_type.glyph(), tile_type.as_str(), count);
                }
            }
        }
        Command::Populate { world, chunk, tile } => {
            let address = Address::tile(world, chunk, tile);
            let spawned = engine
                .populate(&address)
                .await
                .with_context(|| format!("populating {address}"))?;
            for id in spawned {
                println!("{id}");
            }
        }
        Command::Quantum { world, chunk } => {
            let summary = engine
                .quantum(&world, &chunk)
                .await
                .with_context(|| format!("running quantum over chunk {chunk}"))?;
            println!(
                "{} tiles, {} converted, {} entities advanced",
                summary.tiles, summary.converted, summary.advanced
            );
        }
        Command::Simulate { ticks, period_ms } => {
            let ran = engine
                .scheduler()
                .run(Duration::from_millis(period_ms), ticks)
                .await
                .context("simulation stopped")?;
            println!("Ran {ran} ticks");
        }
        Command::Get { address } => {
            let stores = engine.stores();
            let json = match address.kind()? {
                DocumentKind::World => serde_json::to_string_pretty(&stores.worlds.get(&address).await?)?,
                DocumentKind::Chunk => serde_json::to_string_pretty(&stores.chunks.get(&address).await?)?,
                DocumentKind::Tile => serde_json::to_string_pretty(&stores.tiles.get(&address).await?)?,
                DocumentKind::Entity => {
                    serde_json::to_string_pretty(&stores.entities.get(&address).await?)?
                }
            };
            println!("{json}");
        }
        Command::Delete { address } => {
            match address.kind()? {
                DocumentKind::World => engine.stores().worlds.delete(&address).await?,
                DocumentKind::Chunk => engine.generator().delete_chunk(&address).await?,
                DocumentKind::Entity => engine.lifecycle().remove(&address).await?,
                DocumentKind::Tile => bail!("tiles are only removed with their chunk"),
            }
            println!("Deleted {address}");
        }
    }
    Ok(())
}
