use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use strata::{Session, StrataConfig};
use strata_core::world::WorldGenConfig;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// World seed (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Client view radius in chunks
    #[arg(long)]
    radius: Option<i32>,

    /// Number of ticks to run
    #[arg(long)]
    ticks: Option<u32>,

    /// Save file; loaded on start when it exists, written on shutdown
    #[arg(long)]
    save: Option<PathBuf>,

    /// Ignore an existing save and generate fresh
    #[arg(long)]
    regenerate: bool,

    /// Generation preset: default, cave-heavy, solid (overrides config)
    #[arg(long)]
    preset: Option<String>,

    /// Generation parameters from a RON file (overrides --preset)
    #[arg(long)]
    worldgen: Option<PathBuf>,

    /// Print the selected generation parameters as RON and exit
    #[arg(long)]
    dump_worldgen: bool,
}

/// Generation parameters selected on the command line, if any
fn worldgen_from_args(args: &Args) -> anyhow::Result<Option<WorldGenConfig>> {
    if let Some(path) = &args.worldgen {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let worldgen = WorldGenConfig::from_ron(&text)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        return Ok(Some(worldgen));
    }

    let Some(preset) = args.preset.as_deref() else {
        return Ok(None);
    };
    Ok(Some(match preset {
        "default" => WorldGenConfig::default(),
        "cave-heavy" => WorldGenConfig::preset_cave_heavy(),
        "solid" => WorldGenConfig::preset_solid(),
        other => bail!("Unknown preset '{}' (expected default, cave-heavy or solid)", other),
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();
    let mut config = StrataConfig::load()?;

    // CLI flags win over file and environment
    if let Some(worldgen) = worldgen_from_args(&args)? {
        config.server.worldgen = worldgen;
    }
    if let Some(seed) = args.seed {
        config.server.seed = seed;
    }
    if let Some(radius) = args.radius {
        config.client.view_radius = radius;
    }
    if let Some(ticks) = args.ticks {
        config.session.ticks = ticks;
    }
    if let Some(save) = &args.save {
        config.server.save_path = Some(save.clone());
    }

    if args.dump_worldgen {
        let ron = config
            .server
            .worldgen
            .to_ron()
            .context("Failed to serialize generation parameters")?;
        println!("{}", ron);
        return Ok(());
    }

    let existing = config
        .server
        .save_path
        .clone()
        .filter(|path| path.exists());

    let mut session = match existing {
        Some(path) if !args.regenerate => {
            log::info!("Loading world from {}", path.display());
            Session::load(config, &path)?
        }
        Some(path) => {
            log::info!("--regenerate flag detected, ignoring {}", path.display());
            Session::new(config)
        }
        None => Session::new(config),
    };

    log::info!("Starting Strata");
    let summary = session.run();
    println!(
        "{} ticks in {:.2?}: {} chunks loaded ({} on server), {} live entities, viewer at ({:.1}, {:.1})",
        summary.ticks,
        summary.elapsed,
        summary.loaded_chunks,
        summary.server_chunks,
        summary.live_entities,
        summary.position.x,
        summary.position.y
    );

    session.shutdown()
}
