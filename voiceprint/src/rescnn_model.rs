//! [`VoiceprintModel`] implementation backed by the ResCNN on the CPU backend.

use std::path::Path;

use burn::prelude::*;
use deepspeaker_rescnn::backend::{features_to_tensor, tensor_rows, Cpu};
use deepspeaker_rescnn::{Checkpoint, ResCnn};
use parking_lot::Mutex;

use crate::error::VoiceprintError;
use crate::fbank::{cmvn, l2_normalize, Extractor, FbankConfig};
use crate::model::VoiceprintModel;

/// Configuration for [`ResCnnModel`].
#[derive(Debug, Clone)]
pub struct ResCnnModelConfig {
    /// Filterbank configuration; `num_mels` must match the network.
    pub fbank_cfg: FbankConfig,
    /// Frames per inference segment (default: 160 = 1.6s at 10ms hop).
    pub segment_frames: usize,
    /// Hop between segment starts (default: 80).
    pub hop_frames: usize,
    /// Most segments per forward pass (default: 32).
    pub max_batch: usize,
}

impl Default for ResCnnModelConfig {
    fn default() -> Self {
        Self {
            fbank_cfg: FbankConfig::default(),
            segment_frames: 160,
            hop_frames: 80,
            max_batch: 32,
        }
    }
}

/// [`VoiceprintModel`] running a [`ResCnn`] network.
///
/// # Pipeline
///
/// 1. PCM16 audio -> [`Extractor::compute`] -> log mel filterbank frames
/// 2. Frames -> [`cmvn`] normalization
/// 3. Fixed-length segments (`segment_frames` long, `hop_frames` apart,
///    the last one aligned to the end of the audio) run in batches of at
///    most `max_batch`
/// 4. Average segment embeddings + L2 normalize
///
/// Audio shorter than one segment is padded by repeating its frames.
///
/// # Thread Safety
///
/// The network sits behind a mutex; concurrent `extract` calls compute
/// features in parallel and serialize on the forward pass.
pub struct ResCnnModel {
    net: Mutex<Option<ResCnn<Cpu>>>,
    device: <Cpu as Backend>::Device,
    dim: usize,
    extractor: Extractor,
    segment_frames: usize,
    hop_frames: usize,
    max_batch: usize,
}

impl ResCnnModel {
    /// Wraps an initialized network.
    pub fn new(net: ResCnn<Cpu>, cfg: ResCnnModelConfig) -> Result<Self, VoiceprintError> {
        if cfg.segment_frames == 0 || cfg.hop_frames == 0 || cfg.max_batch == 0 {
            return Err(VoiceprintError::InvalidConfig(format!(
                "segment_frames={} hop_frames={} max_batch={} must be positive",
                cfg.segment_frames, cfg.hop_frames, cfg.max_batch
            )));
        }
        if cfg.fbank_cfg.num_mels != net.num_mels() {
            return Err(VoiceprintError::DimensionMismatch {
                expected: net.num_mels(),
                got: cfg.fbank_cfg.num_mels,
            });
        }
        if net.in_channels() != 1 {
            return Err(VoiceprintError::InvalidConfig(format!(
                "network expects {} input channels, fbank provides 1",
                net.in_channels()
            )));
        }

        Ok(Self {
            dim: net.embedding_dim(),
            net: Mutex::new(Some(net)),
            device: Default::default(),
            extractor: Extractor::new(cfg.fbank_cfg),
            segment_frames: cfg.segment_frames,
            hop_frames: cfg.hop_frames,
            max_batch: cfg.max_batch,
        })
    }

    /// Loads a network from a checkpoint directory.
    pub fn from_checkpoint(dir: impl AsRef<Path>, cfg: ResCnnModelConfig) -> Result<Self, VoiceprintError> {
        let (_, net) = Checkpoint::new(dir.as_ref()).load::<Cpu>(&Default::default())?;
        Self::new(net, cfg)
    }

    /// Closes the model and releases the network.
    pub fn close(&self) {
        let mut net = self.net.lock();
        if net.take().is_some() {
            tracing::debug!("voiceprint: rescnn model closed");
        }
    }

    /// Returns true once [`ResCnnModel::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.net.lock().is_none()
    }

    fn too_short(&self, audio: &[u8]) -> VoiceprintError {
        VoiceprintError::AudioTooShort {
            min_bytes: self.extractor.config().min_bytes(),
            got_bytes: audio.len(),
        }
    }
}

impl VoiceprintModel for ResCnnModel {
    fn extract(&self, audio: &[u8]) -> Result<Vec<f32>, VoiceprintError> {
        if self.is_closed() {
            return Err(VoiceprintError::Closed);
        }

        let mut features = self
            .extractor
            .compute(audio)
            .ok_or_else(|| self.too_short(audio))?;
        if features.is_empty() {
            return Err(self.too_short(audio));
        }
        cmvn(&mut features);

        if features.len() < self.segment_frames {
            features = repeat_frames(&features, self.segment_frames);
        }
        let starts = segment_starts(features.len(), self.segment_frames, self.hop_frames);
        let segments: Vec<&[Vec<f32>]> = starts
            .iter()
            .map(|&s| &features[s..s + self.segment_frames])
            .collect();

        let mut emb = vec![0.0f32; self.dim];
        {
            let net = self.net.lock();
            let net = net.as_ref().ok_or(VoiceprintError::Closed)?;
            for chunk in segments.chunks(self.max_batch) {
                let batch = features_to_tensor::<Cpu>(chunk, &self.device)?;
                for row in tensor_rows(net.embed(batch)?)? {
                    if row.len() != self.dim {
                        return Err(VoiceprintError::DimensionMismatch {
                            expected: self.dim,
                            got: row.len(),
                        });
                    }
                    emb.iter_mut().zip(&row).for_each(|(acc, v)| *acc += v);
                }
            }
        }
        let n = segments.len() as f32;
        emb.iter_mut().for_each(|v| *v /= n);
        l2_normalize(&mut emb);

        tracing::debug!(
            frames = features.len(),
            segments = segments.len(),
            "voiceprint: embedding extracted"
        );
        Ok(emb)
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Repeats `features` cyclically until it is `len` frames long.
fn repeat_frames(features: &[Vec<f32>], len: usize) -> Vec<Vec<f32>> {
    features.iter().cycle().take(len).cloned().collect()
}

/// Start offsets of `seg`-frame windows over `n` frames, `hop` apart, with a
/// final window ending exactly at `n`. Requires `n >= seg`.
fn segment_starts(n: usize, seg: usize, hop: usize) -> Vec<usize> {
    let mut starts: Vec<usize> = (0..)
        .map(|i| i * hop)
        .take_while(|&s| s + seg <= n)
        .collect();
    let tail = n - seg;
    if starts.last().is_none_or(|&last| last < tail) {
        starts.push(tail);
    }
    starts
}
