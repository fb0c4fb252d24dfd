//! Speaker embeddings and verification from raw PCM audio.
//!
//! # Architecture
//!
//! The pipeline processes audio in three stages:
//!
//! 1. [`Extractor::compute`]: PCM16 16kHz mono audio -> log mel filterbank frames
//! 2. [`VoiceprintModel::extract`]: frames -> unit-length embedding, here via
//!    [`ResCnnModel`] running the Deep Speaker ResCNN
//! 3. [`Verifier::verify`]: two embeddings -> cosine score and a
//!    same-speaker [`Verdict`]
//!
//! # Segmentation
//!
//! Long utterances are cut into fixed-length segments that overlap by half:
//!
//! ```text
//! frames: |-------------------------------------|
//! seg 0:  |==========|
//! seg 1:       |==========|
//! seg 2:            |==========|
//! tail:                      |==========|
//! ```
//!
//! Segment embeddings are averaged and re-normalized.
//!
//! # Feature Extraction
//!
//! The [`fbank`] module provides Kaldi-style log mel filterbank extraction:
//! - Povey window (hamming^0.85)
//! - Pre-emphasis 0.97
//! - Radix-2 FFT
//! - Mel triangular filterbank (64 channels)
//! - CMVN normalization

mod error;
pub mod fbank;
mod model;
mod rescnn_model;
mod score;

pub use error::VoiceprintError;
pub use fbank::{cmvn, compute_fbank, l2_normalize, Extractor, FbankConfig};
pub use model::VoiceprintModel;
pub use rescnn_model::{ResCnnModel, ResCnnModelConfig};
pub use score::{cosine_similarity, Verdict, Verifier, DEFAULT_THRESHOLD};
