use burn::nn::Linear;
use burn::prelude::*;

use crate::block::ConvResStage;
use crate::error::RescnnError;

/// Floor under the squared norm in the final L2 normalization.
const L2_EPSILON: f32 = 1e-12;

/// Residual CNN producing unit-length speaker embeddings from filterbank frames.
///
/// Input layout is `[batch, channels, frames, mels]`. The frame count is not
/// fixed by the network; every segment in a batch must share it.
#[derive(Module, Debug)]
pub struct ResCnn<B: Backend> {
    pub stages: Vec<ConvResStage<B>>,
    pub affine: Linear<B>,
    in_channels: usize,
    num_mels: usize,
    clip: f32,
    l2_weight: f32,
}

impl<B: Backend> ResCnn<B> {
    pub(crate) fn new(
        stages: Vec<ConvResStage<B>>,
        affine: Linear<B>,
        in_channels: usize,
        num_mels: usize,
        clip: f32,
        l2_weight: f32,
    ) -> Self {
        Self {
            stages,
            affine,
            in_channels,
            num_mels,
            clip,
            l2_weight,
        }
    }

    /// Expected number of filterbank channels per frame.
    pub fn num_mels(&self) -> usize {
        self.num_mels
    }

    /// Expected number of input feature maps.
    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    /// Size of the output embedding.
    pub fn embedding_dim(&self) -> usize {
        self.affine.weight.val().dims()[1]
    }

    /// Ceiling of the clipped ReLU used throughout the network.
    pub fn clip(&self) -> f32 {
        self.clip
    }

    /// Verifies that `dims` is a valid `[batch, channels, frames, mels]` input.
    pub fn check_input(&self, dims: [usize; 4]) -> Result<(), RescnnError> {
        let [batch, channels, frames, mels] = dims;
        if batch == 0 || frames == 0 {
            return Err(RescnnError::Shape(format!(
                "empty input: batch={batch} frames={frames}"
            )));
        }
        if channels != self.in_channels {
            return Err(RescnnError::Shape(format!(
                "expected {} input channels, got {channels}",
                self.in_channels
            )));
        }
        if mels != self.num_mels {
            return Err(RescnnError::Shape(format!(
                "expected {} filterbank channels, got {mels}",
                self.num_mels
            )));
        }
        Ok(())
    }

    /// Runs the convolutional part: `[b, c, t, m] -> [b, filters, t', m']`.
    pub fn forward_features(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = input;
        for stage in &self.stages {
            x = stage.forward(x);
        }
        x
    }

    /// Computes embeddings: `[b, c, t, m] -> [b, embedding_dim]`, each row unit length.
    ///
    /// Panics inside the backend on malformed input; use [`ResCnn::embed`] for
    /// a checked variant.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.forward_features(input);
        let [batch, channels, height, width] = x.dims();

        // reshape: channel-last, then fold (width, channels) into one axis.
        let x = x
            .swap_dims(1, 2)
            .swap_dims(2, 3)
            .reshape([batch, height, width * channels]);

        // average over time
        let x = x.mean_dim(1).reshape([batch, width * channels]);

        let x = self.affine.forward(x);
        l2_normalize(x)
    }

    /// Shape-checked [`ResCnn::forward`].
    pub fn embed(&self, input: Tensor<B, 4>) -> Result<Tensor<B, 2>, RescnnError> {
        self.check_input(input.dims())?;
        Ok(self.forward(input))
    }

    /// L2 kernel penalty over every convolution, scaled by the configured weight.
    pub fn regularization(&self) -> Tensor<B, 1> {
        let mut stages = self.stages.iter();
        let first = match stages.next() {
            Some(stage) => stage.kernel_sq_norm(),
            None => return Tensor::zeros([1], &self.affine.weight.val().device()),
        };
        stages
            .fold(first, |acc, s| acc + s.kernel_sq_norm())
            .mul_scalar(self.l2_weight)
    }
}

/// Row-wise L2 normalization of a `[n, d]` tensor.
pub fn l2_normalize<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let norm = x
        .clone()
        .powf_scalar(2.0)
        .sum_dim(1)
        .clamp_min(L2_EPSILON)
        .sqrt();
    x.div(norm)
}
