use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tile_racer::{
    assets::{AssetLoader, DirAssetLoader, NullAssetLoader},
    config::SimConfig,
    data::*,
    input::Autopilot,
    layout::{LayoutLoader, TrackLayout},
    race::RaceSession,
    scoreboard::TracingScoreboard,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless tile track racer", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "./tile-racer.toml")]
    config: String,

    /// Track layout (JSON or YAML); the default loop when omitted
    #[arg(short = 'L', long)]
    layout: Option<String>,

    /// Laps to finish
    #[arg(long)]
    laps: Option<u32>,

    /// Number of cars, two per Start piece at most
    #[arg(long, default_value_t = 2)]
    cars: usize,

    /// Simulated race duration in seconds
    #[arg(long)]
    seconds: Option<f32>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Chance per frame that an autopilot holds its key
    #[arg(long, default_value_t = 0.9)]
    throttle: f64,

    /// Override log level (trace|debug|info|warn|error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration, CLI flags win
    let (mut config, config_error) = match SimConfig::load(&args.config) {
        Ok(config) => (config, None),
        Err(e) => (SimConfig::default(), Some(e)),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(laps) = args.laps {
        config.race.lap_target = laps;
    }
    if let Some(seconds) = args.seconds {
        config.simulation.race_seconds = seconds;
    }

    // Initialize tracing
    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));
    if config.logging.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting tile-racer v{}", env!("CARGO_PKG_VERSION"));
    match config_error {
        Some(e) => warn!("{}, using defaults", e),
        None => info!("Configuration loaded from: {}", args.config),
    }

    let assets: Box<dyn AssetLoader> = match &config.assets.root {
        Some(root) => Box::new(DirAssetLoader::new(root)),
        None => Box::new(NullAssetLoader),
    };
    let mut session = RaceSession::new(&config, Box::new(TracingScoreboard::new()), assets);

    // Build the track
    let layout = match &args.layout {
        Some(path) => {
            info!("Loading layout from {}", path);
            LayoutLoader::load_from_file(path)?
        }
        None => TrackLayout::default_loop(),
    };
    session.load_layout(&layout)?;

    // Two cars per Start piece, left lane first
    let start_tiles: Vec<TileId> = session
        .grid()
        .start_pieces()
        .into_iter()
        .filter_map(|id| session.grid().piece(id).map(|p| p.tile))
        .collect();
    if start_tiles.is_empty() {
        warn!("Layout has no Start piece, nothing will race");
    }
    'spawn: for tile in start_tiles {
        while session.cars().len() < args.cars {
            if session.spawn_car(tile).is_none() {
                continue 'spawn;
            }
        }
        break;
    }
    if session.cars().len() < args.cars {
        warn!(
            "Only {} of {} cars fit on the Start pieces",
            session.cars().len(),
            args.cars
        );
    }

    let mut ctx = SimContext::new(config.race.lap_target);
    session.start_race(&mut ctx, config.race.lap_target);

    // Fixed-step race loop
    let mut driver_rng = match config.simulation.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };
    let mut autopilot = Autopilot::new(args.throttle);
    let dt = config.tick_seconds();
    let ticks = (config.simulation.race_seconds.max(0.0) / dt).ceil() as u64;

    for _ in 0..ticks {
        let keys: Vec<char> = session.cars().iter().map(|c| c.button).collect();
        autopilot.roll(keys, &mut driver_rng);
        session.tick(&mut ctx, &autopilot, dt);

        let finished = ctx.mode == AppMode::Racing
            && !session.cars().is_empty()
            && session.cars().iter().all(|c| c.laps >= ctx.lap_target);
        if finished {
            info!("All cars finished after {:.1}s", session.now());
            break;
        }
    }

    info!("Standings:");
    for (i, car) in session.standings().into_iter().enumerate() {
        info!(
            "  {}. [{}] {} laps, place {}",
            i + 1,
            car.button,
            car.laps,
            car.place.as_deref().unwrap_or("-")
        );
    }
    session.stop_race(&mut ctx);

    Ok(())
}
