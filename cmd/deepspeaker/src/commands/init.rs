//! Checkpoint initialization command.

use burn::module::Module;
use burn::prelude::Backend;
use clap::Args;

use deepspeaker_rescnn::backend::Cpu;
use deepspeaker_rescnn::{Checkpoint, ResCnnConfig};

use super::{print_success, print_verbose};
use crate::Cli;

/// Write a freshly initialized checkpoint.
///
/// The directory receives config.json and model.mpk.gz. Weights are
/// Glorot-uniform; use --seed for reproducible output.
#[derive(Args)]
pub struct InitCommand {
    /// Checkpoint directory to create
    dir: String,

    /// Random seed for weight initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Filterbank channels per frame
    #[arg(long, default_value_t = 64)]
    num_mels: usize,

    /// Frames per segment
    #[arg(long, default_value_t = 160)]
    num_frames: usize,

    /// Embedding size
    #[arg(long, default_value_t = 512)]
    embedding_dim: usize,

    /// Overwrite an existing checkpoint
    #[arg(long)]
    force: bool,
}

impl InitCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ckpt = Checkpoint::new(&self.dir);
        if ckpt.exists() && !self.force {
            anyhow::bail!("checkpoint already exists in {}, use --force to overwrite", self.dir);
        }

        let cfg = ResCnnConfig::new()
            .with_num_mels(self.num_mels)
            .with_num_frames(self.num_frames)
            .with_embedding_dim(self.embedding_dim);
        cfg.validate()?;

        print_verbose(cli, &format!("Initializing ResCNN in {}", self.dir));
        let seed = self.seed;
        let params = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let device = Default::default();
            if let Some(seed) = seed {
                Cpu::seed(seed);
            }
            let model = cfg.init::<Cpu>(&device)?;
            ckpt.save(&cfg, &model)?;
            Ok(model.num_params())
        })
        .await??;

        print_success(&format!("Checkpoint written to {} ({} parameters)", self.dir, params));
        Ok(())
    }
}
