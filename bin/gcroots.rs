// Infer garbage-collector roots from a directory of program facts.

use std::path::PathBuf;

use clap::Parser;
use gcroots::back_end::{emit, Destination, OutputFormat};
use gcroots::front_end::load_dir;
use gcroots::middle_end::analysis;
use gcroots::{AnalysisConfig, Pipeline, Result};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// Command-line arguments.  Flags override the configuration file.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Directory holding `<relation>.facts`
    #[arg(short = 'F', long, default_value = ".")]
    fact_dir: PathBuf,
    /// Output directory, or `-` for standard output
    #[arg(short = 'D', long, default_value = ".")]
    output_dir: Destination,
    /// TOML analysis configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// call-graph, dataflow or alias-aware
    #[arg(long)]
    pipeline: Option<Pipeline>,
    #[arg(long)]
    collect_primitive: Option<String>,
    #[arg(long)]
    constructor_pattern: Option<String>,
    /// Keep the program graph and write it out
    #[arg(long)]
    retain_intermediates: bool,
    /// Evaluate rules on all cores
    #[arg(long)]
    parallel: bool,
    /// tsv or json
    #[arg(long, default_value = "tsv")]
    format: OutputFormat,
}

impl Args {
    fn config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(pipeline) = self.pipeline {
            config.pipeline = pipeline;
        }
        if let Some(name) = &self.collect_primitive {
            config.collect_primitive = name.clone();
        }
        if let Some(pattern) = &self.constructor_pattern {
            config.constructor_pattern = pattern.clone();
        }
        if self.retain_intermediates {
            config.prune_intermediates = false;
        }
        if self.parallel {
            config.parallel = true;
        }

        Ok(config)
    }
}

fn run(args: &Args) -> Result<()> {
    let config = args.config()?;
    debug!(?config, "configuration");

    let facts = load_dir(&args.fact_dir, config.pipeline)?;
    let analysis = analysis::run(&facts, &config)?;
    emit(&analysis, args.format, &args.output_dir)
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("gcroots: {e}");
        std::process::exit(1);
    }
}
