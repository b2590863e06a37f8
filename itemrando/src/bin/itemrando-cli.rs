use anyhow::{bail, Result};
use clap::Parser;
use itemrando::randomize::Randomizer;
use itemrando::settings::{RandomizerSettings, TraversalMode};
use itemrando::spoiler_log::{get_spoiler_log, SpoilerLog};
use itemrando_game::World;
use log::info;
use rand::{RngCore, SeedableRng};
use std::path::{Path, PathBuf};

#[derive(Parser)]
struct Args {
    #[arg(long)]
    world: PathBuf,

    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    random_seed: Option<usize>,

    #[arg(long)]
    max_attempts: Option<usize>,

    #[arg(long)]
    traversal_mode: Option<String>,

    /// Only check whether the vanilla item placement is completable.
    #[arg(long)]
    vanilla: bool,

    #[arg(long)]
    output_spoiler_log: Option<PathBuf>,
}

fn write_spoiler_log(path: &Path, spoiler_log: &SpoilerLog) -> Result<()> {
    println!("Writing spoiler log to {}", path.display());
    let spoiler_str = serde_json::to_string_pretty(spoiler_log)?;
    std::fs::write(path, spoiler_str)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let world = World::load(&args.world)?;
    let mut settings = match &args.settings {
        Some(path) => RandomizerSettings::load(path)?,
        None => RandomizerSettings::default(),
    };
    if let Some(mode) = &args.traversal_mode {
        settings.traversal_mode = TraversalMode::parse(mode)?;
    }
    info!(
        "World {}: {} nodes, {} items, {} slots",
        args.world.display(),
        world.graph.len(),
        world.items.len(),
        world.slots.len()
    );
    let randomizer = Randomizer::new(&world, &settings)?;

    if args.vanilla {
        let result = randomizer.check(&world.vanilla_placement);
        println!(
            "Vanilla placement: {} of {} nodes reachable, beatable: {}",
            result.num_seen(),
            world.graph.len(),
            result.win
        );
        if let Some(path) = &args.output_spoiler_log {
            let spoiler_log = get_spoiler_log(&world, 0, &world.vanilla_placement, &result);
            write_spoiler_log(path, &spoiler_log)?;
        }
        if !result.win {
            bail!("Vanilla placement is not beatable");
        }
        return Ok(());
    }

    let root_seed = match args.random_seed {
        Some(s) => s,
        None => (rand::rngs::StdRng::from_entropy().next_u64() & 0xFFFFFFFF) as usize,
    };
    let max_attempts = args.max_attempts.unwrap_or(settings.max_attempts);
    let randomization = randomizer.randomize_with_retries(max_attempts, root_seed)?;
    println!(
        "Randomized with root seed {root_seed}, item placement seed {}",
        randomization.seed
    );
    for loc in &randomization.spoiler_log.all_items {
        println!("{}: {}", loc.slot, loc.item);
    }

    if let Some(path) = &args.output_spoiler_log {
        write_spoiler_log(path, &randomization.spoiler_log)?;
    }
    Ok(())
}
