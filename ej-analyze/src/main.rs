//! ej-analyze - Environmental-justice burden pipeline (command line)
//!
//! Reads the exposure, vulnerability, designation and crosswalk tables from
//! the input folder and writes the scored, clustered and mapping tables to
//! the output folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ej_common::config::{self, CONFIG_FILE_ENV, ROOT_FOLDER_ENV};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for ej-analyze
#[derive(Parser, Debug)]
#[command(name = "ej-analyze")]
#[command(about = "Environmental-justice burden scoring and clustering")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = CONFIG_FILE_ENV)]
    config: Option<PathBuf>,

    /// Project root containing input_data/ and output_data/
    #[arg(short, long, env = ROOT_FOLDER_ENV)]
    root_folder: Option<PathBuf>,

    /// Override the input folder
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Override the output folder
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Number of k-means clusters
    #[arg(short = 'k', long)]
    clusters: Option<usize>,

    /// k-means random seed
    #[arg(long)]
    seed: Option<u64>,
}

const DEFAULT_LOG_FILTER: &str = "ej_analyze=info,ej_common=info";

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing before anything logs; the TOML level is applied once the config is read
    let from_env = EnvFilter::try_from_default_env().ok();
    let env_filter_set = from_env.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(from_env.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let toml_config =
        config::load_or_default(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the TOML level
    if !env_filter_set {
        filter_handle
            .reload(EnvFilter::new(toml_config.logging.filter_directive()))
            .context("Failed to apply logging level")?;
    }

    info!(
        "Starting ej-analyze v{} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("EJ_GIT_HASH"),
        env!("EJ_BUILD_PROFILE")
    );

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    info!("Root folder: {}", root_folder.display());

    let mut pipeline = toml_config.pipeline.clone();
    if let Some(dir) = args.input_dir {
        pipeline.input_dir = Some(dir);
    }
    if let Some(dir) = args.output_dir {
        pipeline.output_dir = Some(dir);
    }
    if let Some(k) = args.clusters {
        pipeline.clusters = k;
    }
    if let Some(seed) = args.seed {
        pipeline.seed = seed;
    }

    let report = ej_analyze::run(&pipeline, &root_folder).context("Pipeline run failed")?;

    info!(
        tracts = report.merged_tracts,
        designated = report.designated_tracts,
        clusters = ?report.cluster_sizes,
        "Run complete"
    );
    Ok(())
}
