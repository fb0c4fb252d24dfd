//! Single-step training on triplet batches.

use burn::optim::{GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;

use crate::error::RescnnError;
use crate::loss::triplet_loss;
use crate::model::ResCnn;

/// Optimization settings for [`Trainer`].
#[derive(Config, Debug)]
pub struct TrainConfig {
    /// Optimizer learning rate (default: 1e-3).
    #[config(default = 1e-3)]
    pub learning_rate: f64,
    /// Triplet margin (default: 0.1).
    #[config(default = 0.1)]
    pub alpha: f32,
}

/// Loss values observed before an update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StepStats {
    pub step: usize,
    pub loss: f32,
    pub triplet: f32,
    pub regularization: f32,
}

/// Owns a model on an autodiff backend and applies optimizer steps to it.
pub struct Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ResCnn<B>, B>,
{
    model: ResCnn<B>,
    optim: O,
    config: TrainConfig,
    steps: usize,
}

impl<B, O> Trainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<ResCnn<B>, B>,
{
    pub fn new(model: ResCnn<B>, optim: O, config: TrainConfig) -> Self {
        Self {
            model,
            optim,
            config,
            steps: 0,
        }
    }

    /// Runs forward, triplet + L2 loss, backward and one optimizer update.
    ///
    /// `batch` is `[3k, channels, frames, mels]`: k anchors, then k positives,
    /// then k negatives.
    pub fn step(&mut self, batch: Tensor<B, 4>) -> Result<StepStats, RescnnError> {
        let dims = batch.dims();
        self.model.check_input(dims)?;
        if dims[0] % 3 != 0 {
            return Err(RescnnError::Shape(format!(
                "triplet batch size must be a multiple of 3, got {}",
                dims[0]
            )));
        }

        let embeddings = self.model.forward(batch);
        let triplet = triplet_loss(embeddings, self.config.alpha)?;
        let regularization = self.model.regularization();
        let loss = triplet.clone() + regularization.clone();

        let stats = StepStats {
            step: self.steps,
            loss: loss.clone().into_scalar().elem::<f32>(),
            triplet: triplet.into_scalar().elem::<f32>(),
            regularization: regularization.into_scalar().elem::<f32>(),
        };

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self
            .optim
            .step(self.config.learning_rate, self.model.clone(), grads);
        self.steps += 1;

        tracing::debug!(
            step = stats.step,
            loss = stats.loss,
            triplet = stats.triplet,
            "rescnn: train step"
        );
        Ok(stats)
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn model(&self) -> &ResCnn<B> {
        &self.model
    }

    pub fn into_model(self) -> ResCnn<B> {
        self.model
    }
}
