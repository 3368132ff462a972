mod app;
mod lore;
mod util;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::lore::{BuildPaths, build_from_files, write_artifact};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Merge seed entities and extraction output into a graph artifact
    Build {
        /// Curated seed entities (JSON array)
        #[arg(long)]
        seeds: PathBuf,

        /// Extraction output, one or more files replayed in order
        #[arg(long, required = true, num_args = 1..)]
        extraction: Vec<PathBuf>,

        /// Corpus used to name evidence ids
        #[arg(long)]
        corpus: Option<PathBuf>,

        /// Display labels for faction hubs
        #[arg(long)]
        faction_glossary: Option<PathBuf>,

        /// Where to write the graph artifact
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Explore a graph artifact
    View {
        /// Graph artifact written by `build`
        graph: PathBuf,

        /// Display names for relation types
        #[arg(long)]
        relation_glossary: Option<PathBuf>,

        /// Start in research mode
        #[arg(long)]
        research: bool,

        /// Start with ambient drift disabled
        #[arg(long)]
        no_drift: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn build(paths: BuildPaths, output: &Path) -> anyhow::Result<()> {
    let (graph, report) = build_from_files(&paths)?;
    write_artifact(output, &graph)?;
    info!(
        output = %output.display(),
        nodes = graph.node_count(),
        links = graph.edge_count(),
        dropped = report.dropped_total(),
        "graph artifact written"
    );
    Ok(())
}

fn view(options: app::ViewerOptions) -> anyhow::Result<()> {
    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "lore-atlas",
        native_options,
        Box::new(move |cc| Ok(Box::new(app::LoreAtlasApp::new(cc, options)))),
    )
    .map_err(|error| anyhow::anyhow!("{error}"))
    .context("viewer exited with an error")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Build {
            seeds,
            extraction,
            corpus,
            faction_glossary,
            output,
        } => build(
            BuildPaths {
                seeds,
                extraction,
                corpus,
                faction_glossary,
            },
            &output,
        ),
        Command::View {
            graph,
            relation_glossary,
            research,
            no_drift,
        } => view(app::ViewerOptions {
            graph_path: graph,
            relation_glossary,
            research,
            no_drift,
        }),
    }
}
