//! deepspeaker - speaker embeddings from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, EmbedCommand, InitCommand, ScoreCommand, SummaryCommand};

/// deepspeaker - Deep Speaker ResCNN speaker embeddings.
///
/// This tool works with ResCNN checkpoints:
///   - Print the layer summary of a model
///   - Initialize a new checkpoint
///   - Extract an embedding from PCM16 16kHz mono audio
///   - Score two recordings for same-speaker verification
///
/// Configuration is stored in ~/.deepspeaker/deepspeaker/ and supports multiple
/// contexts, similar to kubectl's context management.
#[derive(Parser)]
#[command(name = "deepspeaker")]
#[command(about = "Deep Speaker ResCNN CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.deepspeaker/deepspeaker/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// Checkpoint directory (overrides the context)
    #[arg(long, global = true)]
    pub checkpoint: Option<String>,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Print the model layer summary
    Summary(SummaryCommand),
    /// Write a freshly initialized checkpoint
    Init(InitCommand),
    /// Extract a speaker embedding from audio
    Embed(EmbedCommand),
    /// Compare the speakers of two recordings
    Score(ScoreCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Summary(cmd) => cmd.run(&cli).await,
        Commands::Init(cmd) => cmd.run(&cli).await,
        Commands::Embed(cmd) => cmd.run(&cli).await,
        Commands::Score(cmd) => cmd.run(&cli).await,
    }
}
