//! Configuration management commands.

use clap::{Args, Subcommand};

use deepspeaker_cli::config::Context as CliContext;

use super::{get_config, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Contexts allow you to manage multiple model setups,
/// similar to kubectl's context management.
///
/// Configuration is stored in ~/.deepspeaker/deepspeaker/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a new context
    #[command(name = "add-context")]
    AddContext {
        /// Context name
        name: String,
        /// Checkpoint directory (required)
        #[arg(long)]
        checkpoint: String,
        /// Same-speaker cosine threshold
        #[arg(long)]
        threshold: Option<f32>,
        /// Frames per inference segment
        #[arg(long)]
        segment_frames: Option<usize>,
        /// Hop between inference segments
        #[arg(long)]
        hop_frames: Option<usize>,
    },
    /// Delete a context
    #[command(name = "delete-context")]
    DeleteContext {
        /// Context name
        name: String,
    },
    /// Set the current context
    #[command(name = "use-context")]
    UseContext {
        /// Context name
        name: String,
    },
    /// Display the current context
    #[command(name = "get-context")]
    GetContext,
    /// List all contexts
    #[command(name = "list-contexts", alias = "get-contexts")]
    ListContexts,
    /// View the current configuration
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddContext {
                name,
                checkpoint,
                threshold,
                segment_frames,
                hop_frames,
            } => {
                if let Some(t) = threshold {
                    if !(*t > 0.0 && *t <= 1.0) {
                        anyhow::bail!("threshold must be within (0, 1], got {}", t);
                    }
                }

                let mut cfg = get_config(cli)?;
                let ctx = CliContext {
                    checkpoint: checkpoint.clone(),
                    threshold: threshold.unwrap_or(0.0),
                    segment_frames: segment_frames.unwrap_or(0),
                    hop_frames: hop_frames.unwrap_or(0),
                    ..Default::default()
                };

                cfg.add_context(name, ctx)?;
                print_success(&format!("Context \"{}\" added successfully", name));
                Ok(())
            }

            ConfigSubcommand::DeleteContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_context(name)?;
                print_success(&format!("Context \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseContext { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_context(name)?;
                print_success(&format!("Switched to context \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetContext => {
                let cfg = get_config(cli)?;
                if cfg.current_context.is_empty() {
                    println!("No current context set");
                } else {
                    println!("{}", cfg.current_context);
                }
                Ok(())
            }

            ConfigSubcommand::ListContexts => {
                let cfg = get_config(cli)?;

                if cfg.contexts.is_empty() {
                    println!("No contexts configured");
                    return Ok(());
                }

                // Print table header
                println!("{:<8} {:<20} {:<40} {}", "CURRENT", "NAME", "CHECKPOINT", "THRESHOLD");

                for name in cfg.list_contexts() {
                    let Some(ctx) = cfg.get_context(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_context { "*" } else { "" };
                    let threshold = if ctx.threshold > 0.0 {
                        ctx.threshold.to_string()
                    } else {
                        "(default)".to_string()
                    };
                    println!("{:<8} {:<20} {:<40} {}", current, name, ctx.checkpoint, threshold);
                }

                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;

                println!("Config file: {}", cfg.path().display());
                println!("Current context: {}", cfg.current_context);
                println!("Contexts: {}", cfg.contexts.len());

                if !cfg.contexts.is_empty() {
                    println!("\nContext details:");

                    for name in cfg.list_contexts() {
                        let Some(ctx) = cfg.get_context(name) else {
                            continue;
                        };
                        println!("\n  {}:", name);
                        println!("    Checkpoint: {}", ctx.checkpoint);
                        if ctx.threshold > 0.0 {
                            println!("    Threshold: {}", ctx.threshold);
                        }
                        if ctx.segment_frames > 0 {
                            println!("    Segment Frames: {}", ctx.segment_frames);
                        }
                        if ctx.hop_frames > 0 {
                            println!("    Hop Frames: {}", ctx.hop_frames);
                        }
                    }
                }

                Ok(())
            }
        }
    }
}
