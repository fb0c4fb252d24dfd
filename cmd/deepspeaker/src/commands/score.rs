//! Speaker verification command.

use clap::Args;
use serde::Serialize;

use deepspeaker_voiceprint::{Verifier, VoiceprintModel};

use super::{
    get_context, load_model, output_result, print_verbose, read_pcm, require_checkpoint, threshold,
};
use crate::Cli;

/// Compare the speakers of two recordings.
///
/// Both inputs are raw PCM16 signed little-endian, 16kHz, mono. The
/// threshold comes from --threshold, the context, or defaults to 0.75.
#[derive(Args)]
pub struct ScoreCommand {
    /// First audio file
    a: String,
    /// Second audio file
    b: String,
    /// Same-speaker cosine threshold
    #[arg(long)]
    threshold: Option<f32>,
}

#[derive(Serialize)]
struct ScoreResult {
    a: String,
    b: String,
    score: f32,
    threshold: f32,
    same_speaker: bool,
}

impl ScoreCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let dir = require_checkpoint(cli, ctx.as_ref())?;
        let verifier = Verifier::new(self.threshold.unwrap_or_else(|| threshold(ctx.as_ref())));

        let audio_a = read_pcm(&self.a)?;
        let audio_b = read_pcm(&self.b)?;
        print_verbose(cli, &format!("Scoring {} against {}", self.a, self.b));

        let verdict = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
            let model = load_model(&dir, ctx.as_ref())?;
            let emb_a = model.extract(&audio_a)?;
            let emb_b = model.extract(&audio_b)?;
            model.close();
            Ok(verifier.verify(&emb_a, &emb_b)?)
        })
        .await??;

        output_result(
            cli,
            &ScoreResult {
                a: self.a.clone(),
                b: self.b.clone(),
                score: verdict.score,
                threshold: verifier.threshold(),
                same_speaker: verdict.same_speaker,
            },
        )
    }
}
