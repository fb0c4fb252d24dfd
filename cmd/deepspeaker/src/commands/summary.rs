//! Model summary command.

use clap::Args;

use deepspeaker_rescnn::{Checkpoint, ModelSummary, ResCnnConfig};

use super::{checkpoint_dir, get_context, output_result, print_verbose};
use crate::Cli;

/// Print the layer table of the model.
///
/// Uses the checkpoint config from --checkpoint or the current context,
/// or the default ResCNN when neither is set.
#[derive(Args)]
pub struct SummaryCommand {
    /// Frames per segment (default: the model's num_frames)
    #[arg(long)]
    frames: Option<usize>,
}

impl SummaryCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let cfg = match checkpoint_dir(cli, ctx.as_ref()) {
            Some(dir) => {
                print_verbose(cli, &format!("Reading model config from {}", dir.display()));
                Checkpoint::new(dir).load_config()?
            }
            None => ResCnnConfig::new(),
        };
        cfg.validate()?;

        let frames = self.frames.unwrap_or(cfg.num_frames);
        if frames == 0 {
            anyhow::bail!("--frames must be positive");
        }
        let summary = ModelSummary::new(&cfg, frames);

        if cli.json || cli.output.is_some() {
            output_result(cli, &summary)
        } else {
            println!("{}", summary);
            Ok(())
        }
    }
}
