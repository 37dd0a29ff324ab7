use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use case2water::geometry::ViewCorrection;
use case2water::scene::Scene;
use case2water::{Config, WaterProcessor, utils};

/// MERIS Case-2 water constituent retrieval
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long, default_value = "./data/config/case2_config.json")]
    config: PathBuf,

    /// Overrides the configured output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of worker threads (all cores by default)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure the thread pool")?;
    }

    let mut config = Config::from_file(&cli.config)
        .with_context(|| format!("failed to read {}", cli.config.display()))?;
    if let Some(output_dir) = cli.output_dir {
        config.set_output_directory(output_dir);
    }

    log::debug!("{}", config.parameters());

    let processor = WaterProcessor::new(&config)?;
    log::info!("{}", processor);

    let scene = Scene::from_config(&config)?;
    let nadir_column = match config.nadir_column().or_else(|| scene.nadir_column()) {
        Some(column) => column,
        None => {
            log::warn!("No finite view zenith on the centre line, using the centre column");
            scene.width() / 2
        }
    };
    log::info!("Nadir column: {}", nadir_column);

    let correction = ViewCorrection {
        nadir_column,
        full_resolution: config.full_resolution(),
    };
    let output = processor.process_scene(&scene, &correction);

    utils::print_output_statistics(&output);
    output.write_all(config.output_directory())?;

    Ok(())
}
