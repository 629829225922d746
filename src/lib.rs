pub mod aggregate;
pub mod analysis;
pub mod cli;
pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod inflation;
pub mod io_utils;
pub mod keys;
pub mod labels;
pub mod percentile;
pub mod pipeline;
pub mod sources;
pub mod unnest;

use std::{env, sync::OnceLock};

use anyhow::{Result, bail};
use clap::Parser;
use log::{LevelFilter, info, warn};

use crate::{
    cli::{Cli, Commands},
    config::PipelineConfig,
    sources::SourceKind,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("bechdel_insights", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => handle_run(&args),
        Commands::Schema(args) => handle_schema(&args),
    }
}

fn handle_run(args: &cli::RunArgs) -> Result<()> {
    let config = PipelineConfig::from_run_args(args)?;
    info!(
        "Restating money at {} prices (index {})",
        config.reference.year, config.reference.index
    );
    let written = pipeline::run(config)?;
    info!("Run complete: {} file(s) written", written.len());
    Ok(())
}

fn handle_schema(args: &cli::SchemaArgs) -> Result<()> {
    let config = PipelineConfig::from_input_args(&args.inputs)?;
    let encoding = io_utils::resolve_encoding(config.input_encoding.as_deref())?;
    let mut printed = 0usize;
    for kind in SourceKind::ALL {
        let Some(path) = config.inputs.get(kind) else {
            warn!("No path configured for the {kind} input; skipping (--{})", kind.flag());
            continue;
        };
        let loaded = sources::load(kind, path, encoding)?;
        println!("{}", loaded.schema);
        printed += 1;
    }
    if printed == 0 {
        bail!("No inputs configured; pass --config or at least one input flag");
    }
    Ok(())
}
