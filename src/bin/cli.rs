// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! procgeo CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use procgeo::cli::{GeometryStats, Reporter};
use procgeo::config::{KernelConfig, OutputFormat, CONFIG_FILE};
use procgeo::processing::to_external;
use procgeo::sop::{create_operator, OPERATOR_KINDS};
use procgeo::{Pipeline, SourceShape};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "procgeo")]
#[command(about = "Procedural geometry kernel - operator pipelines over polygon meshes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Configuration file (defaults to ./procgeo.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Cook a pipeline file and print statistics of the result
    Run {
        /// Pipeline TOML file
        pipeline: PathBuf,

        /// Write the result as an indexed mesh (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print statistics of a generated source
    Info {
        /// box, grid, sphere or line
        #[arg(long, default_value = "box")]
        source: String,
    },

    /// List operator kinds and their parameters
    Ops {
        /// Only this operator
        kind: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write it to FILE instead (./procgeo.toml when FILE is omitted)
        #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = CONFIG_FILE)]
        write: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KernelConfig::from_file(path)?,
        None => KernelConfig::load()?,
    };
    if cli.json {
        config.output_format = OutputFormat::Json;
    }
    let filter = if cli.verbose { "debug".to_string() } else { config.log_filter.clone() };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let result = match &cli.command {
        Commands::Run { pipeline, output, no_progress } => {
            run_command(pipeline, output.as_ref(), !no_progress && config.progress, &config)
        }
        Commands::Info { source } => info_command(source, &config),
        Commands::Ops { kind } => ops_command(kind.as_deref(), &config),
        Commands::Config { write } => config_command(write.as_ref(), &config),
        Commands::Version => {
            println!("procgeo v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };

    if let Err(err) = result {
        Reporter::report_error(&format!("{err:#}"));
        std::process::exit(1);
    }
    Ok(())
}

fn print_stats(title: &str, stats: &GeometryStats, config: &KernelConfig, duration: Option<std::time::Duration>) -> Result<()> {
    match config.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Text => Reporter::report_stats(title, stats, duration),
    }
    Ok(())
}

fn run_command(path: &Path, output: Option<&PathBuf>, progress: bool, config: &KernelConfig) -> Result<()> {
    let mut pipeline = Pipeline::from_file(path, config)?;
    info!("cooking {} step(s) from {}", pipeline.len(), path.display());
    let text = config.output_format == OutputFormat::Text;

    let bar = if progress && text && !pipeline.is_empty() {
        let pb = ProgressBar::new(pipeline.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let geometry = pipeline.cook_with(|_, node| {
        if let Some(pb) = &bar {
            pb.set_message(node.name().to_string());
            pb.inc(1);
        }
    });
    if let Some(pb) = bar {
        pb.finish_and_clear();
    }
    let geometry = geometry?;
    let elapsed = start.elapsed();
    info!("pipeline cooked in {elapsed:.2?}");

    if text {
        println!("{} {}", "Pipeline:".bold(), path.display().to_string().cyan());
        for node in pipeline.nodes() {
            Reporter::report_node(node);
        }
    }
    print_stats(&path.display().to_string(), &GeometryStats::collect(&geometry), config, Some(elapsed))?;

    if let Some(out) = output {
        let mesh = to_external(&geometry)?;
        let json = serde_json::to_string(&mesh)?;
        std::fs::write(out, json).with_context(|| format!("Failed to write mesh: {:?}", out))?;
        if text {
            Reporter::success(&format!("Wrote {}", out.display()));
        }
    }
    Ok(())
}

fn info_command(shape: &str, config: &KernelConfig) -> Result<()> {
    let Some(source) = SourceShape::from_name(shape) else {
        bail!("unknown shape '{shape}' (expected box, grid, sphere or line)");
    };
    let geometry = source.build();
    print_stats(shape, &GeometryStats::collect(&geometry), config, None)
}

fn ops_command(kind: Option<&str>, config: &KernelConfig) -> Result<()> {
    let kinds: Vec<&str> = match kind {
        Some(k) if OPERATOR_KINDS.contains(&k) => vec![k],
        Some(k) => bail!("unknown operator kind '{k}'"),
        None => OPERATOR_KINDS.to_vec(),
    };
    let operators: Vec<_> = kinds.iter().filter_map(|k| create_operator(k)).collect();
    match config.output_format {
        OutputFormat::Json => {
            let listing: serde_json::Map<String, serde_json::Value> = operators
                .iter()
                .map(|op| Ok((op.kind().to_string(), serde_json::to_value(op.parameters())?)))
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
        OutputFormat::Text => {
            for op in &operators {
                Reporter::report_operator(op.as_ref());
            }
        }
    }
    Ok(())
}

fn config_command(write: Option<&PathBuf>, config: &KernelConfig) -> Result<()> {
    if let Some(path) = write {
        if path.exists() {
            Reporter::report_warning(&format!("{} already exists, overwriting", path.display()));
        }
        config.save(path)?;
        Reporter::success(&format!("Wrote {}", path.display()));
        return Ok(());
    }
    match config.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
