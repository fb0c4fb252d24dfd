//! Deep Speaker ResCNN: a residual convolutional network that maps filterbank
//! frames to unit-length speaker embeddings.
//!
//! # Topology
//!
//! ```text
//! input [b, 1, frames, 64]
//!   -> conv64-s  (5x5 /2, bn, clipped relu) -> 3 x identity block
//!   -> conv128-s (5x5 /2, bn, clipped relu) -> 3 x identity block
//!   -> conv256-s (5x5 /2, bn, clipped relu) -> 3 x identity block
//!   -> conv512-s (5x5 /2, bn, clipped relu) -> 3 x identity block
//!   -> reshape [b, frames/16, 2048] -> average over time
//!   -> affine (dense 512) -> ln (L2 normalize)
//! ```
//!
//! Every identity block is `1x1 -> 3x3 -> 1x1` convolutions with batch norm,
//! clipped ReLU (`min(max(x, 0), 20)`) in between and a residual add.
//!
//! Tensor math runs on [`burn`]; [`backend::Cpu`] is the ndarray backend used
//! for inference and [`backend::CpuTrain`] adds autodiff for [`Trainer`].
//!
//! # Example
//!
//! ```no_run
//! use burn::prelude::*;
//! use deepspeaker_rescnn::{backend::Cpu, ResCnnConfig};
//!
//! let device = Default::default();
//! let model = ResCnnConfig::new().init::<Cpu>(&device).unwrap();
//! let frames = Tensor::<Cpu, 4>::zeros([1, 1, 160, 64], &device);
//! let embedding = model.forward(frames); // [1, 512]
//! ```

pub mod backend;
mod block;
mod checkpoint;
mod config;
mod error;
pub mod loss;
mod model;
mod summary;
mod train;

pub use block::{clipped_relu, same_padding, ConvBn, ConvResStage, IdentityBlock};
pub use checkpoint::Checkpoint;
pub use config::ResCnnConfig;
pub use error::RescnnError;
pub use loss::{batch_cosine_similarity, triplet_loss};
pub use model::{l2_normalize, ResCnn};
pub use summary::{LayerSummary, ModelSummary};
pub use train::{StepStats, TrainConfig, Trainer};
