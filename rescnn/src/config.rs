//! Hyper-parameters of the ResCNN topology.

use burn::nn::conv::Conv2dConfig;
use burn::nn::{BatchNormConfig, Initializer, LinearConfig, PaddingConfig2d};
use burn::prelude::*;

use crate::block::{ConvBn, ConvResStage, IdentityBlock};
use crate::error::RescnnError;
use crate::model::ResCnn;

/// Describes a ResCNN network.
///
/// Defaults reproduce the Deep Speaker layout: 160 frames of 64 filterbank
/// channels, four conv+res stages of 64/128/256/512 filters and a 512-d
/// embedding.
#[derive(Config, Debug)]
pub struct ResCnnConfig {
    /// Frames per segment (default: 160).
    #[config(default = 160)]
    pub num_frames: usize,
    /// Filterbank channels per frame (default: 64).
    #[config(default = 64)]
    pub num_mels: usize,
    /// Input feature maps (default: 1).
    #[config(default = 1)]
    pub in_channels: usize,
    /// Output channels of each conv+res stage.
    #[config(default = "vec![64, 128, 256, 512]")]
    pub filters: Vec<usize>,
    /// Identity blocks per stage (default: 3).
    #[config(default = 3)]
    pub res_blocks: usize,
    /// Kernel of the strided stage conv (default: 5).
    #[config(default = 5)]
    pub conv_kernel: usize,
    /// Stride of the stage conv (default: 2).
    #[config(default = 2)]
    pub conv_stride: usize,
    /// Kernel of the middle identity-block conv (default: 3).
    #[config(default = 3)]
    pub res_kernel: usize,
    /// Embedding size produced by the `affine` layer (default: 512).
    #[config(default = 512)]
    pub embedding_dim: usize,
    /// Ceiling of the clipped ReLU (default: 20).
    #[config(default = 20.0)]
    pub clip: f32,
    /// Batch norm epsilon (default: 1e-3).
    #[config(default = 1e-3)]
    pub bn_epsilon: f64,
    /// Weight of the current batch in the running statistics (default: 0.01).
    #[config(default = 0.01)]
    pub bn_momentum: f64,
    /// L2 penalty applied to every conv kernel (default: 1e-5).
    #[config(default = 1e-5)]
    pub l2_weight: f32,
}

impl ResCnnConfig {
    /// Checks that the configuration describes a buildable network.
    pub fn validate(&self) -> Result<(), RescnnError> {
        if self.filters.is_empty() {
            return Err(RescnnError::InvalidConfig("filters must not be empty".into()));
        }
        if let Some(i) = self.filters.iter().position(|&f| f == 0) {
            return Err(RescnnError::InvalidConfig(format!("filters[{i}] is zero")));
        }
        let sizes = [
            ("num_frames", self.num_frames),
            ("num_mels", self.num_mels),
            ("in_channels", self.in_channels),
            ("conv_stride", self.conv_stride),
            ("embedding_dim", self.embedding_dim),
        ];
        for (name, value) in sizes {
            if value == 0 {
                return Err(RescnnError::InvalidConfig(format!("{name} must be positive")));
            }
        }
        for (name, k) in [("conv_kernel", self.conv_kernel), ("res_kernel", self.res_kernel)] {
            if k % 2 == 0 {
                return Err(RescnnError::InvalidConfig(format!("{name} must be odd, got {k}")));
            }
        }
        if !(self.clip > 0.0) {
            return Err(RescnnError::InvalidConfig(format!(
                "clip must be positive, got {}",
                self.clip
            )));
        }
        Ok(())
    }

    /// Time steps left after all stages for an input of `frames` frames.
    pub fn reduced_height(&self, frames: usize) -> usize {
        self.reduce(frames)
    }

    /// Frequency bins left after all stages.
    pub fn reduced_width(&self) -> usize {
        self.reduce(self.num_mels)
    }

    /// Size of the per-time-step vector that is averaged over time.
    pub fn pooled_features(&self) -> usize {
        self.reduced_width() * self.filters.last().copied().unwrap_or(0)
    }

    fn reduce(&self, mut n: usize) -> usize {
        for _ in &self.filters {
            n = n.div_ceil(self.conv_stride);
        }
        n
    }

    /// Builds a freshly initialized network on `device`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ResCnn<B>, RescnnError> {
        self.validate()?;

        let mut stages = Vec::with_capacity(self.filters.len());
        let mut channels = self.in_channels;
        for &filters in &self.filters {
            stages.push(self.init_stage(channels, filters, device));
            channels = filters;
        }

        let affine = LinearConfig::new(self.pooled_features(), self.embedding_dim)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);

        Ok(ResCnn::new(
            stages,
            affine,
            self.in_channels,
            self.num_mels,
            self.clip,
            self.l2_weight,
        ))
    }

    fn init_stage<B: Backend>(
        &self,
        in_channels: usize,
        filters: usize,
        device: &B::Device,
    ) -> ConvResStage<B> {
        let conv = self.conv_bn(in_channels, filters, self.conv_kernel, self.conv_stride, device);
        let blocks = (0..self.res_blocks)
            .map(|_| IdentityBlock {
                conv1_1: self.conv_bn(filters, filters, 1, 1, device),
                conv3: self.conv_bn(filters, filters, self.res_kernel, 1, device),
                conv1_2: self.conv_bn(filters, filters, 1, 1, device),
                clip: self.clip,
            })
            .collect();
        ConvResStage {
            conv,
            blocks,
            clip: self.clip,
        }
    }

    pub(crate) fn conv_bn<B: Backend>(
        &self,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        stride: usize,
        device: &B::Device,
    ) -> ConvBn<B> {
        // Padding depends on the input size; ConvBn::forward applies it.
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel, kernel])
            .with_stride([stride, stride])
            .with_padding(PaddingConfig2d::Valid)
            .with_bias(true)
            .with_initializer(Initializer::XavierUniform { gain: 1.0 })
            .init(device);
        let bn = BatchNormConfig::new(out_channels)
            .with_epsilon(self.bn_epsilon)
            .with_momentum(self.bn_momentum)
            .init(device);
        ConvBn {
            conv,
            bn,
            kernel,
            stride,
        }
    }
}
