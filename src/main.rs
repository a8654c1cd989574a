use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rayon::prelude::*;

use city_generator::{generate_city, CityConfig, CitySeeds, CitySummary};

#[derive(Parser, Debug)]
#[command(name = "city_generator")]
#[command(about = "Generate procedural city road networks and landscapes")]
struct Args {
    /// Master seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of cities to generate; city i uses seed + i
    #[arg(short, long, default_value = "1")]
    count: u64,

    /// JSON configuration file (defaults are used if not specified)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print one JSON summary line per city
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match CityConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => CityConfig::default(),
    };

    let master = args.seed.unwrap_or_else(rand::random);
    log::info!(
        "Generating {} cities from seed {} on a {}x{} domain",
        args.count,
        master,
        config.world.width,
        config.world.height
    );

    let results: Vec<Result<CitySummary, String>> = (0..args.count)
        .into_par_iter()
        .map(|i| {
            let seeds = CitySeeds::from_master(master.wrapping_add(i));
            generate_city(&config, &seeds)
                .map(|city| city.summary())
                .map_err(|e| format!("seed {}: {}", seeds.master, e))
        })
        .collect();

    let mut failed = false;
    for result in results {
        match result {
            Ok(summary) => {
                log::info!(
                    "City {}: {} vertices, {} edges, river of {} points, {} region types",
                    summary.seed,
                    summary.vertices,
                    summary.edges,
                    summary.river_points,
                    summary.regions.len()
                );
                if args.json {
                    match serde_json::to_string(&summary) {
                        Ok(line) => println!("{}", line),
                        Err(e) => log::error!("Failed to serialize city {}: {}", summary.seed, e),
                    }
                }
            }
            Err(e) => {
                log::error!("Generation failed for {}", e);
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
