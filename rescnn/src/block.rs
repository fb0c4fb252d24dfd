//! Building blocks of the ResCNN: conv + batch norm, identity blocks and
//! conv+res stages.

use burn::nn::conv::Conv2d;
use burn::nn::BatchNorm;
use burn::prelude::*;

/// Clipped ReLU: `min(max(x, 0), clip)`.
pub fn clipped_relu<B: Backend, const D: usize>(x: Tensor<B, D>, clip: f32) -> Tensor<B, D> {
    x.clamp(0.0, clip)
}

/// Padding `(before, after)` that gives `ceil(n / stride)` outputs.
///
/// Odd totals put the extra zero after the input, matching TensorFlow's
/// "same" mode.
pub fn same_padding(n: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let out = n.div_ceil(stride);
    let total = (out.saturating_sub(1) * stride + kernel).saturating_sub(n);
    (total / 2, total - total / 2)
}

/// 2-D convolution followed by batch normalization, without activation.
///
/// The convolution itself is unpadded; [`ConvBn::forward`] zero-pads each
/// input with [`same_padding`] for its own frame and mel counts.
#[derive(Module, Debug)]
pub struct ConvBn<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub kernel: usize,
    pub stride: usize,
}

impl<B: Backend> ConvBn<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, height, width] = x.dims();
        let (top, bottom) = same_padding(height, self.kernel, self.stride);
        let (left, right) = same_padding(width, self.kernel, self.stride);
        let x = if top + bottom + left + right > 0 {
            x.pad((left, right, top, bottom), 0.0)
        } else {
            x
        };
        self.bn.forward(self.conv.forward(x))
    }

    /// Sum of squared kernel weights.
    pub fn kernel_sq_norm(&self) -> Tensor<B, 1> {
        self.conv.weight.val().powf_scalar(2.0).sum()
    }
}

/// Residual block whose output has the same shape as its input:
///
/// ```text
/// x -> 1x1 conv/bn -> crelu -> kxk conv/bn -> crelu -> 1x1 conv/bn -> (+x) -> crelu
/// ```
#[derive(Module, Debug)]
pub struct IdentityBlock<B: Backend> {
    pub conv1_1: ConvBn<B>,
    pub conv3: ConvBn<B>,
    pub conv1_2: ConvBn<B>,
    pub clip: f32,
}

impl<B: Backend> IdentityBlock<B> {
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = clipped_relu(self.conv1_1.forward(input.clone()), self.clip);
        let x = clipped_relu(self.conv3.forward(x), self.clip);
        let x = self.conv1_2.forward(x);
        clipped_relu(x + input, self.clip)
    }

    pub fn kernel_sq_norm(&self) -> Tensor<B, 1> {
        self.conv1_1.kernel_sq_norm() + self.conv3.kernel_sq_norm() + self.conv1_2.kernel_sq_norm()
    }
}

/// Strided conv/bn/crelu followed by a run of identity blocks.
#[derive(Module, Debug)]
pub struct ConvResStage<B: Backend> {
    pub conv: ConvBn<B>,
    pub blocks: Vec<IdentityBlock<B>>,
    pub clip: f32,
}

impl<B: Backend> ConvResStage<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = clipped_relu(self.conv.forward(x), self.clip);
        for block in &self.blocks {
            x = block.forward(x);
        }
        x
    }

    pub fn kernel_sq_norm(&self) -> Tensor<B, 1> {
        self.blocks
            .iter()
            .fold(self.conv.kernel_sq_norm(), |acc, b| acc + b.kernel_sq_norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Cpu;
    use crate::config::ResCnnConfig;
    use burn::module::Param;
    use burn::tensor::TensorData;

    #[test]
    fn clipped_relu_bounds() {
        let device = Default::default();
        let x = Tensor::<Cpu, 1>::from_data(
            TensorData::new(vec![-3.0f32, 0.0, 5.0, 20.0, 42.0], [5]),
            &device,
        );
        let y = clipped_relu(x, 20.0).into_data().to_vec::<f32>().unwrap();
        assert_eq!(y, vec![0.0, 0.0, 5.0, 20.0, 20.0]);
    }

    #[test]
    fn same_padding_values() {
        // stride 1, odd kernel: symmetric
        assert_eq!(same_padding(7, 3, 1), (1, 1));
        assert_eq!(same_padding(7, 1, 1), (0, 0));
        // stride 2, kernel 5: odd total puts the extra zero after
        assert_eq!(same_padding(4, 5, 2), (1, 2));
        assert_eq!(same_padding(64, 5, 2), (1, 2));
        assert_eq!(same_padding(11, 5, 2), (2, 2));
        assert_eq!(same_padding(1, 5, 2), (2, 2));
    }

    #[test]
    fn strided_conv_pads_more_after() {
        let device = Default::default();
        let cfg = ResCnnConfig::new();
        let mut conv_bn = cfg.conv_bn::<Cpu>(1, 1, 5, 2, &device);
        conv_bn.conv.weight = Param::from_tensor(Tensor::ones([1, 1, 5, 5], &device));
        conv_bn.conv.bias = Some(Param::from_tensor(Tensor::zeros([1], &device)));

        // Box sums over a 4x4 field of ones padded (1, 2) per axis. Windows
        // start at padded rows 0 and 2: 4 and 3 real rows.
        let y = conv_bn.forward(Tensor::<Cpu, 4>::ones([1, 1, 4, 4], &device));
        assert_eq!(y.dims(), [1, 1, 2, 2]);

        let scale = (1.0 + cfg.bn_epsilon).sqrt() as f32;
        let got: Vec<f32> = y
            .into_data()
            .to_vec::<f32>()
            .unwrap()
            .iter()
            .map(|v| v * scale)
            .collect();
        for (g, want) in got.iter().zip([16.0f32, 12.0, 12.0, 9.0]) {
            assert!((g - want).abs() < 1e-3, "{got:?}");
        }
    }

    #[test]
    fn identity_block_keeps_shape() {
        let device = Default::default();
        let cfg = ResCnnConfig::new()
            .with_filters(vec![4])
            .with_num_mels(8)
            .with_res_blocks(1)
            .with_embedding_dim(4);
        let model = cfg.init::<Cpu>(&device).unwrap();
        let block = &model.stages[0].blocks[0];

        let x = Tensor::<Cpu, 4>::ones([2, 4, 6, 5], &device);
        let y = block.forward(x);
        assert_eq!(y.dims(), [2, 4, 6, 5]);

        let values = y.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| (0.0..=20.0).contains(&v)));
    }

    #[test]
    fn stage_halves_spatial_dims() {
        let device = Default::default();
        let cfg = ResCnnConfig::new()
            .with_filters(vec![4])
            .with_num_mels(9)
            .with_res_blocks(2)
            .with_embedding_dim(4);
        let model = cfg.init::<Cpu>(&device).unwrap();

        let x = Tensor::<Cpu, 4>::ones([1, 1, 11, 9], &device);
        let y = model.stages[0].forward(x);
        // ceil(11 / 2) = 6, ceil(9 / 2) = 5
        assert_eq!(y.dims(), [1, 4, 6, 5]);
    }

    #[test]
    fn kernel_norm_is_positive() {
        let device = Default::default();
        let cfg = ResCnnConfig::new()
            .with_filters(vec![2])
            .with_num_mels(4)
            .with_res_blocks(1)
            .with_embedding_dim(2);
        let model = cfg.init::<Cpu>(&device).unwrap();
        let norm = model.stages[0].kernel_sq_norm().into_scalar();
        assert!(norm > 0.0);
    }
}
