use std::{io, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod export;
mod replay;
mod session;
mod sink;
mod store;
mod summary;
mod telemetry;
mod trajectory;

use session::Session;
use sink::{JsonLines, Sink, StatusLines};
use store::Source;

#[derive(Debug, Parser)]
#[command(about = "Replay a recorded vehicle trajectory")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replay, reading play/pause/reset/reload/quit from stdin and writing a frame per change
    Play {
        /// File path or http(s) URL; `.csv` files are read as CSV, anything else as JSON
        source: Option<Source>,
        /// Start playing as soon as the samples are loaded
        #[arg(long)]
        autoplay: bool,
        /// Human-readable status lines instead of JSON
        #[arg(long)]
        status: bool,
    },
    /// Print distance, duration and speeds of the whole trajectory
    Summary { source: Option<Source> },
    /// Write the route, the traversed part and the vehicle as GeoJSON
    Export {
        source: Option<Source>,
        /// Defaults to the final sample
        #[arg(long)]
        cursor: Option<usize>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::Play {
            source,
            autoplay,
            status,
        } => {
            let source = config.source(source)?;
            let mut sink: Box<dyn Sink> = if status {
                Box::new(StatusLines(io::stdout()))
            } else {
                Box::new(JsonLines(io::stdout()))
            };
            let mut session = Session::new(config.pacing(), config.display, autoplay);
            let commands = session::spawn_stdin_reader();

            info!(%source, "Starting replay");
            tokio::select! {
                result = session.run(|| store::load(&source), commands, sink.as_mut()) => result?,
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
            info!(cursor = session.replay().cursor(), "Replay finished");
        }
        Command::Summary { source } => summary::run(&config.source(source)?).await?,
        Command::Export {
            source,
            cursor,
            output,
        } => export::run(&config.source(source)?, cursor, output.as_deref()).await?,
    };

    Ok(())
}
