pub mod archive;
pub mod cli;
pub mod config;
pub mod distinct;
pub mod error;
pub mod io_utils;
pub mod pipeline;
pub mod preview;
pub mod rows;
pub mod schema;
pub mod table;
pub mod writer;

use std::{env, fs, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ConsolidateArgs},
    config::ConsolidateConfig,
    pipeline::CancelFlag,
};

pub use crate::{
    error::ConsolidateError,
    pipeline::{JobResult, consolidate, consolidate_file},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_consolidate", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Consolidate(args) => handle_consolidate(&args),
        Commands::Preview(args) => preview::execute(&args),
        Commands::Config => {
            print!("{}", ConsolidateConfig::default().to_yaml()?);
            Ok(())
        }
    }
}

fn handle_consolidate(args: &ConsolidateArgs) -> Result<()> {
    let config = build_config(args)?;
    info!(
        "Consolidating '{}' with delimiter '{}'",
        args.input.display(),
        io_utils::printable_delimiter(config.delimiter)
    );
    debug!("Drop columns: {:?}", config.drop_columns);

    let result = consolidate_file(&args.input, &args.output, &config, &CancelFlag::new())
        .with_context(|| format!("Consolidating {:?}", args.input))?;
    let json = serde_json::to_string_pretty(&result).context("Serializing job result")?;
    match &args.result {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Writing job result to {path:?}"))?;
            info!("Job result written to {path:?}");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn build_config(args: &ConsolidateArgs) -> Result<ConsolidateConfig> {
    let mut config = match &args.config {
        Some(path) => ConsolidateConfig::load(path)
            .with_context(|| format!("Loading config from {path:?}"))?,
        None => ConsolidateConfig::default(),
    };
    for column in args
        .drop_columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
    {
        if !config.drop_columns.iter().any(|existing| existing == column) {
            config.drop_columns.push(column.to_string());
        }
    }
    if let Some(rows) = args.preview_rows {
        config.preview_rows = rows;
    }
    if let Some(cap) = args.distinct_cap {
        config.distinct_cap = cap;
    }
    if let Some(delimiter) = args.delimiter {
        config.delimiter = delimiter;
    }
    if let Some(label) = &args.input_encoding {
        config.input_encoding = Some(label.clone());
    }
    if args.remove_archive {
        config.remove_source = true;
    }
    config.validate()?;
    Ok(config)
}
