//! Checkpoint directories: `config.json` plus `model.mpk.gz` weights.

use std::path::{Path, PathBuf};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkGzFileRecorder};

use crate::config::ResCnnConfig;
use crate::error::RescnnError;
use crate::model::ResCnn;

const CONFIG_FILE: &str = "config.json";
/// Weights file stem; the recorder appends `.mpk.gz`.
const WEIGHTS_STEM: &str = "model";
const WEIGHTS_FILE: &str = "model.mpk.gz";

/// Saves and restores a ResCNN together with the config that built it.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true if both the config and the weights are present.
    pub fn exists(&self) -> bool {
        self.dir.join(CONFIG_FILE).is_file() && self.dir.join(WEIGHTS_FILE).is_file()
    }

    /// Writes `config` and the weights of `model`, creating the directory.
    pub fn save<B: Backend>(&self, config: &ResCnnConfig, model: &ResCnn<B>) -> Result<(), RescnnError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| self.error(&self.dir, e))?;

        let config_path = self.dir.join(CONFIG_FILE);
        config
            .save(&config_path)
            .map_err(|e| self.error(&config_path, e))?;

        let weights = self.dir.join(WEIGHTS_STEM);
        model
            .clone()
            .save_file(weights.clone(), &recorder())
            .map_err(|e| self.error(&weights, e))?;

        tracing::info!(dir = %self.dir.display(), "rescnn: checkpoint saved");
        Ok(())
    }

    /// Reads the stored config.
    pub fn load_config(&self) -> Result<ResCnnConfig, RescnnError> {
        let path = self.dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Err(self.error(&path, "not found"));
        }
        ResCnnConfig::load(&path).map_err(|e| self.error(&path, e))
    }

    /// Rebuilds the network from the stored config and loads its weights.
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<(ResCnnConfig, ResCnn<B>), RescnnError> {
        let config = self.load_config()?;
        let weights_path = self.dir.join(WEIGHTS_FILE);
        if !weights_path.is_file() {
            return Err(self.error(&weights_path, "not found"));
        }

        let model = config
            .init::<B>(device)?
            .load_file(self.dir.join(WEIGHTS_STEM), &recorder(), device)
            .map_err(|e| self.error(&weights_path, e))?;

        tracing::info!(dir = %self.dir.display(), "rescnn: checkpoint loaded");
        Ok((config, model))
    }

    fn error(&self, path: &Path, reason: impl ToString) -> RescnnError {
        RescnnError::Checkpoint {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

fn recorder() -> NamedMpkGzFileRecorder<FullPrecisionSettings> {
    NamedMpkGzFileRecorder::<FullPrecisionSettings>::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cpu;

    fn small_config() -> ResCnnConfig {
        ResCnnConfig::new()
            .with_num_frames(8)
            .with_num_mels(8)
            .with_filters(vec![2, 4])
            .with_res_blocks(1)
            .with_embedding_dim(4)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpoint::new(dir.path().join("ckpt"));
        assert!(!ckpt.exists());

        let device = Default::default();
        let cfg = small_config();
        let model = cfg.init::<Cpu>(&device).unwrap();
        ckpt.save(&cfg, &model).unwrap();
        assert!(ckpt.exists());

        let (loaded_cfg, loaded) = ckpt.load::<Cpu>(&device).unwrap();
        assert_eq!(loaded_cfg.filters, vec![2, 4]);

        let x = Tensor::<Cpu, 4>::ones([1, 1, 8, 8], &device);
        let a = model.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.forward(x).into_data().to_vec::<f32>().unwrap();
        for (u, v) in a.iter().zip(b.iter()) {
            assert!((u - v).abs() < 1e-6, "{u} vs {v}");
        }
    }

    #[test]
    fn load_missing_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpoint::new(dir.path());
        let err = ckpt.load::<Cpu>(&Default::default()).unwrap_err();
        match err {
            RescnnError::Checkpoint { path, .. } => assert!(path.ends_with("config.json")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_without_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        small_config().save(dir.path().join("config.json")).unwrap();
        let ckpt = Checkpoint::new(dir.path());
        assert!(ckpt.load_config().is_ok());
        assert!(!ckpt.exists());
        assert!(ckpt.load::<Cpu>(&Default::default()).is_err());
    }
}
