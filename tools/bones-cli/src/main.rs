//! VideoBones CLI: compile and run timeline renders from the command line.
//!
//! Usage:
//!   bones compile <REQUEST>      Print the ffmpeg arguments for a request
//!   bones render <REQUEST>       Render a request to a file
//!   bones preview <REQUEST>      Stream a request as a DASH preview
//!   bones thumbnails <REQUEST>   Extract one thumbnail per second
//!   bones layout <KIND>          Show a layout template's regions

use std::path::PathBuf;

use bones_timeline_model::request::OutputMode;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "bones",
    about = "Compile video timelines into ffmpeg renders",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/videobones/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scratch directory ffmpeg runs in
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    /// ffmpeg binary to launch (takes precedence over FFMPEG_BIN)
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the ffmpeg arguments a request compiles to
    Compile {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,

        /// Override the request's output mode
        #[arg(long)]
        mode: Option<OutputMode>,

        /// Print the full compiled command as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a request to a single file
    Render {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,

        /// Output file (relative paths land in the scratch directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Stream a request as a low-latency DASH preview until interrupted
    Preview {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,
    },

    /// Extract one thumbnail per second of timeline
    Thumbnails {
        /// Request JSON file, or `-` for stdin
        request: PathBuf,
    },

    /// Show the regions of a layout template
    Layout {
        /// Layout name or screen-style glyph
        kind: String,

        /// Canvas width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Canvas height
        #[arg(long, default_value = "1080")]
        height: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => bones_common::config::AppConfig::load_from(path),
        None => bones_common::config::AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if let Some(scratch) = cli.scratch {
        config.scratch_dir = scratch;
    }
    bones_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Compile {
            request,
            mode,
            json,
        } => commands::compile::run(request, mode, json),
        Commands::Render { request, output } => {
            commands::render::run(commands::engine(config, cli.ffmpeg), request, output).await
        }
        Commands::Preview { request } => {
            commands::preview::run(commands::engine(config, cli.ffmpeg), request).await
        }
        Commands::Thumbnails { request } => {
            commands::thumbnails::run(commands::engine(config, cli.ffmpeg), request).await
        }
        Commands::Layout {
            kind,
            width,
            height,
        } => commands::layout::run(&kind, width, height),
    }
}
