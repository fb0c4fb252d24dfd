//! Embedding extraction command.

use clap::Args;
use serde::Serialize;

use deepspeaker_voiceprint::VoiceprintModel;

use super::{
    format_duration, get_context, load_model, output_result, print_verbose, read_pcm,
    require_checkpoint,
};
use crate::Cli;

/// Extract a speaker embedding.
///
/// Input is raw PCM16 signed little-endian, 16kHz, mono.
#[derive(Args)]
pub struct EmbedCommand {
    /// Audio file (raw PCM16 16kHz mono)
    audio: String,
}

#[derive(Serialize)]
struct EmbedResult {
    file: String,
    duration: String,
    dimension: usize,
    embedding: Vec<f32>,
}

impl EmbedCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let dir = require_checkpoint(cli, ctx.as_ref())?;
        let audio = read_pcm(&self.audio)?;
        let duration = format_duration(audio.len());
        print_verbose(
            cli,
            &format!("Embedding {} ({}) with {}", self.audio, duration, dir.display()),
        );

        let embedding = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<f32>> {
            let model = load_model(&dir, ctx.as_ref())?;
            Ok(model.extract(&audio)?)
        })
        .await??;

        output_result(
            cli,
            &EmbedResult {
                file: self.audio.clone(),
                duration,
                dimension: embedding.len(),
                embedding,
            },
        )
    }
}
