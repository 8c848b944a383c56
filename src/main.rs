//! `cutkit` command-line tool: stream a document into a G-code file.

use anyhow::{bail, Context};
use clap::Parser;
use cutkit::{
    init_logging, Config, Document, ExecutionReport, Executor, GcodeFileController,
    TravelOptimizer, BUILD_DATE, VERSION,
};
use cutkit::designer::travel_length;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line arguments for cutkit.
#[derive(Debug, Clone, Parser)]
#[command(name = "cutkit")]
#[command(about = "Turn a layered vector document into a multi-pass G-code program")]
#[command(version)]
struct CliArgs {
    /// Document to execute
    document: PathBuf,

    /// Write commands to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (.json or .toml)
    #[arg(short, long, env = "CUTKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Reorder shapes to shorten travel before executing
    #[arg(long)]
    optimize: bool,

    /// Drop redundant polyline vertices using the configured tolerances
    #[arg(long)]
    simplify: bool,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let args = CliArgs::parse();
    tracing::info!("cutkit {} (built {})", VERSION, BUILD_DATE);

    let config = load_config(&args)?;
    let mut document = Document::load(&args.document)?;

    if args.simplify {
        let removed = document.simplify_polylines(&config.geometry);
        tracing::info!("Simplified polylines: {} points removed", removed);
    }

    if args.optimize {
        let before = travel_length(document.root().children(), None);
        TravelOptimizer::new(config.geometry.optimize_recurse_groups)
            .optimize_group(document.root_mut(), None);
        let after = travel_length(document.root().children(), None);
        tracing::info!("Travel optimized: {:.3} -> {:.3}", before, after);
    }

    let report = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {}", path.display()))?;
            execute(BufWriter::new(file), document, &config)?
        }
        None => execute(std::io::stdout(), document, &config)?,
    };

    if let Some(error) = &report.error {
        bail!("Execution failed: {}", error);
    }
    eprintln!(
        "{} commands for {} shapes",
        report.commands_sent, report.shapes_executed
    );
    Ok(())
}

fn load_config(args: &CliArgs) -> anyhow::Result<Config> {
    if let Some(path) = &args.config {
        return Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }
    match Config::default_path() {
        Ok(path) => Ok(Config::load_or_default(&path)?),
        Err(e) => {
            tracing::debug!("No default config location: {}", e);
            Ok(Config::default())
        }
    }
}

fn execute<W: Write + Send + 'static>(
    sink: W,
    document: Document,
    config: &Config,
) -> anyhow::Result<ExecutionReport> {
    let controller = Arc::new(GcodeFileController::new(sink));
    let executor = Executor::new(controller.clone(), config.execution.clone());
    let report = executor.run(&document.into_shared());
    controller.flush().context("Failed to flush command output")?;
    Ok(report)
}
