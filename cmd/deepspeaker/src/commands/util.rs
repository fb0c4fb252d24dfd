//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};

use deepspeaker_cli::config::{load_config, Config, Context};
use deepspeaker_cli::{Output, OutputFormat};
use deepspeaker_rescnn::backend::Cpu;
use deepspeaker_rescnn::{Checkpoint, ResCnnConfig};
use deepspeaker_voiceprint::{FbankConfig, ResCnnModel, ResCnnModelConfig, DEFAULT_THRESHOLD};

use crate::Cli;

const APP_NAME: &str = "deepspeaker";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context to use, if any.
///
/// An explicit `-c` that names a missing context is an error; with no `-c`
/// and no current context this returns `None`.
pub fn get_context(cli: &Cli) -> anyhow::Result<Option<Context>> {
    let cfg = get_config(cli)?;
    match (cli.context.as_deref(), cfg.resolve_context(cli.context.as_deref())) {
        (_, Some(ctx)) => Ok(Some(ctx.clone())),
        (Some(name), None) if !name.is_empty() => anyhow::bail!("context '{}' not found", name),
        _ => Ok(None),
    }
}

/// Checkpoint directory from `--checkpoint`, else from the context.
pub fn checkpoint_dir(cli: &Cli, ctx: Option<&Context>) -> Option<PathBuf> {
    cli.checkpoint
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| ctx.and_then(Context::checkpoint_dir))
}

/// Like [`checkpoint_dir`] but fails with a hint when none is configured.
pub fn require_checkpoint(cli: &Cli, ctx: Option<&Context>) -> anyhow::Result<PathBuf> {
    checkpoint_dir(cli, ctx).ok_or_else(|| {
        anyhow::anyhow!(
            "no checkpoint configured. Use --checkpoint or set one with 'deepspeaker config add-context --checkpoint'"
        )
    })
}

/// Same-speaker threshold from the context, or the default.
pub fn threshold(ctx: Option<&Context>) -> f32 {
    ctx.map(|c| c.threshold)
        .filter(|t| *t > 0.0)
        .unwrap_or(DEFAULT_THRESHOLD)
}

/// Extractor settings for a checkpoint built from `net_cfg`.
///
/// Segment length defaults to the network's `num_frames`, hop to half of it;
/// non-zero context values override both.
pub fn model_config(net_cfg: &ResCnnConfig, ctx: Option<&Context>) -> ResCnnModelConfig {
    let segment_frames = ctx
        .map(|c| c.segment_frames)
        .filter(|n| *n > 0)
        .unwrap_or(net_cfg.num_frames);
    let hop_frames = ctx
        .map(|c| c.hop_frames)
        .filter(|n| *n > 0)
        .unwrap_or((segment_frames / 2).max(1));

    ResCnnModelConfig {
        fbank_cfg: FbankConfig {
            num_mels: net_cfg.num_mels,
            ..Default::default()
        },
        segment_frames,
        hop_frames,
        ..Default::default()
    }
}

/// Loads the checkpoint in `dir` as a voiceprint model.
pub fn load_model(dir: &Path, ctx: Option<&Context>) -> anyhow::Result<ResCnnModel> {
    let (net_cfg, net) = Checkpoint::new(dir).load::<Cpu>(&Default::default())?;
    Ok(ResCnnModel::new(net, model_config(&net_cfg, ctx))?)
}

/// Reads a raw PCM16 LE 16kHz mono file.
pub fn read_pcm(path: &str) -> anyhow::Result<Vec<u8>> {
    let audio = std::fs::read(path).map_err(|e| anyhow::anyhow!("read {}: {}", path, e))?;
    if audio.len() % 2 != 0 {
        print_warning(&format!("{}: odd byte count, last byte ignored", path));
    }
    Ok(audio)
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(cli: &Cli, result: &T) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.as_ref().map(PathBuf::from)).write(result)
}

/// Prints verbose output if enabled.
pub fn print_verbose(cli: &Cli, msg: &str) {
    deepspeaker_cli::print_verbose(cli.verbose, msg);
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}

/// Formats a duration of PCM16 16kHz audio.
pub fn format_duration(bytes: usize) -> String {
    format!("{:.2}s", bytes as f64 / 2.0 / 16000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use deepspeaker_cli::config::load_config as load_cli_config;
    use deepspeaker_voiceprint::VoiceprintModel;

    fn cli_for(config: &Path, extra: &[&str]) -> Cli {
        let mut args = vec!["deepspeaker", "--config", config.to_str().unwrap()];
        args.extend_from_slice(extra);
        args.push("summary");
        Cli::try_parse_from(args).unwrap()
    }

    fn save_tiny_checkpoint(dir: &Path) {
        let cfg = ResCnnConfig::new()
            .with_num_frames(16)
            .with_num_mels(16)
            .with_filters(vec![2, 4])
            .with_res_blocks(1)
            .with_embedding_dim(8);
        let net = cfg.init::<Cpu>(&Default::default()).unwrap();
        Checkpoint::new(dir).save(&cfg, &net).unwrap();
    }

    #[test]
    fn context_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let cli = cli_for(&path, &[]);
        assert!(get_context(&cli).unwrap().is_none());
        assert!(checkpoint_dir(&cli, None).is_none());
        assert!(require_checkpoint(&cli, None).is_err());

        let mut cfg = load_cli_config(APP_NAME, path.to_str()).unwrap();
        cfg.add_context(
            "lab",
            Context {
                checkpoint: "/ckpt/lab".into(),
                ..Default::default()
            },
        )
        .unwrap();
        cfg.use_context("lab").unwrap();

        let ctx = get_context(&cli).unwrap().unwrap();
        assert_eq!(ctx.name, "lab");
        assert_eq!(checkpoint_dir(&cli, Some(&ctx)), Some(PathBuf::from("/ckpt/lab")));

        let overridden = cli_for(&path, &["--checkpoint", "/ckpt/other"]);
        assert_eq!(
            checkpoint_dir(&overridden, Some(&ctx)),
            Some(PathBuf::from("/ckpt/other"))
        );

        let missing = cli_for(&path, &["-c", "nope"]);
        assert!(get_context(&missing).is_err());
    }

    #[test]
    fn load_model_follows_checkpoint_config() {
        let dir = tempfile::tempdir().unwrap();
        save_tiny_checkpoint(dir.path());

        let model = load_model(dir.path(), None).unwrap();
        assert_eq!(model.dimension(), 8);

        // 16 mels and 16-frame segments come from the stored config.
        let audio: Vec<u8> = (0..4000i32)
            .flat_map(|i| (((i * 37) % 2000 - 1000) as i16).to_le_bytes())
            .collect();
        assert_eq!(model.extract(&audio).unwrap().len(), 8);
    }

    #[test]
    fn load_model_missing_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model(dir.path(), None).is_err());
    }

    #[test]
    fn model_config_defaults_from_network() {
        let net = ResCnnConfig::new();
        let cfg = model_config(&net, None);
        assert_eq!(cfg.segment_frames, 160);
        assert_eq!(cfg.hop_frames, 80);
        assert_eq!(cfg.fbank_cfg.num_mels, 64);
    }

    #[test]
    fn model_config_context_overrides() {
        let net = ResCnnConfig::new().with_num_frames(200).with_num_mels(40);
        let ctx = Context {
            segment_frames: 100,
            ..Default::default()
        };
        let cfg = model_config(&net, Some(&ctx));
        assert_eq!(cfg.segment_frames, 100);
        assert_eq!(cfg.hop_frames, 50);
        assert_eq!(cfg.fbank_cfg.num_mels, 40);

        let ctx = Context {
            hop_frames: 30,
            ..Default::default()
        };
        let cfg = model_config(&net, Some(&ctx));
        assert_eq!(cfg.segment_frames, 200);
        assert_eq!(cfg.hop_frames, 30);
    }

    #[test]
    fn threshold_fallback() {
        assert_eq!(threshold(None), DEFAULT_THRESHOLD);
        let ctx = Context {
            threshold: 0.6,
            ..Default::default()
        };
        assert_eq!(threshold(Some(&ctx)), 0.6);
        assert_eq!(threshold(Some(&Context::default())), DEFAULT_THRESHOLD);
    }

    #[test]
    fn duration_format() {
        assert_eq!(format_duration(32000), "1.00s");
        assert_eq!(format_duration(8000), "0.25s");
    }
}
