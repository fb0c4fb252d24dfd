//! Layer-by-layer description of a ResCNN, in the familiar Keras table form.
//!
//! Shapes are reported channel-last with an unspecified batch dimension,
//! e.g. `(None, 80, 32, 64)`. Batch norm layers count their moving mean and
//! variance as non-trainable parameters.

use std::fmt;

use serde::Serialize;

use crate::config::ResCnnConfig;

/// One row of a [`ModelSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub kind: &'static str,
    pub output_shape: Vec<usize>,
    pub params: usize,
    pub trainable: bool,
}

/// Full table plus parameter totals.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub layers: Vec<LayerSummary>,
    pub total_params: usize,
    pub trainable_params: usize,
    pub non_trainable_params: usize,
}

impl ModelSummary {
    /// Describes the network built from `cfg` for segments of `frames` frames.
    pub fn new(cfg: &ResCnnConfig, frames: usize) -> Self {
        let mut b = Builder::default();
        let (mut h, mut w, mut c) = (frames, cfg.num_mels, cfg.in_channels);
        b.push("input", "InputLayer", vec![h, w, c], 0);

        for (i, &filters) in cfg.filters.iter().enumerate() {
            let stage = i + 1;
            h = h.div_ceil(cfg.conv_stride);
            w = w.div_ceil(cfg.conv_stride);
            let conv_name = format!("conv{filters}-s");
            b.conv(&conv_name, cfg.conv_kernel, c, filters, [h, w]);
            b.batch_norm(&format!("{conv_name}_bn"), filters, [h, w]);
            b.push(&format!("{conv_name}_relu"), "ClippedReLU", vec![h, w, filters], 0);
            c = filters;

            for block in 0..cfg.res_blocks {
                let base = format!("res{stage}_{block}_branch");
                b.conv(&format!("{base}_conv1_1"), 1, c, c, [h, w]);
                b.batch_norm(&format!("{base}_conv1.1_bn"), c, [h, w]);
                b.push(&format!("{base}_conv1_1_relu"), "ClippedReLU", vec![h, w, c], 0);
                b.conv(&format!("{base}_conv3"), cfg.res_kernel, c, c, [h, w]);
                b.batch_norm(&format!("{base}_conv3_bn"), c, [h, w]);
                b.push(&format!("{base}_conv3_relu"), "ClippedReLU", vec![h, w, c], 0);
                b.conv(&format!("{base}_conv1_2"), 1, c, c, [h, w]);
                b.batch_norm(&format!("{base}_conv1.2_bn"), c, [h, w]);
                b.push(&format!("{base}_add"), "Add", vec![h, w, c], 0);
                b.push(&format!("{base}_relu"), "ClippedReLU", vec![h, w, c], 0);
            }
        }

        let pooled = w * c;
        b.push("reshape", "Reshape", vec![h, pooled], 0);
        b.push("average", "TemporalAverage", vec![pooled], 0);
        b.push(
            "affine",
            "Dense",
            vec![cfg.embedding_dim],
            pooled * cfg.embedding_dim + cfg.embedding_dim,
        );
        b.push("ln", "L2Normalize", vec![cfg.embedding_dim], 0);

        b.finish("convolutional")
    }

    /// Looks up a layer by name.
    pub fn layer(&self, name: &str) -> Option<&LayerSummary> {
        self.layers.iter().find(|l| l.name == name)
    }
}

#[derive(Default)]
struct Builder {
    layers: Vec<LayerSummary>,
    non_trainable: usize,
}

impl Builder {
    fn push(&mut self, name: &str, kind: &'static str, output_shape: Vec<usize>, params: usize) {
        self.layers.push(LayerSummary {
            name: name.to_string(),
            kind,
            output_shape,
            params,
            trainable: true,
        });
    }

    fn conv(&mut self, name: &str, kernel: usize, c_in: usize, c_out: usize, hw: [usize; 2]) {
        let params = kernel * kernel * c_in * c_out + c_out;
        self.push(name, "Conv2D", vec![hw[0], hw[1], c_out], params);
    }

    fn batch_norm(&mut self, name: &str, channels: usize, hw: [usize; 2]) {
        // gamma, beta, moving mean, moving variance
        self.push(name, "BatchNormalization", vec![hw[0], hw[1], channels], 4 * channels);
        self.non_trainable += 2 * channels;
    }

    fn finish(self, name: &str) -> ModelSummary {
        let total_params = self.layers.iter().map(|l| l.params).sum::<usize>();
        ModelSummary {
            name: name.to_string(),
            layers: self.layers,
            total_params,
            trainable_params: total_params - self.non_trainable,
            non_trainable_params: self.non_trainable,
        }
    }
}

fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("(None, {})", dims.join(", "))
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "_".repeat(98);
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "{:<46} {:<22} {:<18} {:>10}",
            "Layer (name)", "Type", "Output Shape", "Param #"
        )?;
        writeln!(f, "{}", "=".repeat(98))?;
        for layer in &self.layers {
            writeln!(
                f,
                "{:<46} {:<22} {:<18} {:>10}",
                layer.name,
                layer.kind,
                format_shape(&layer.output_shape),
                layer.params
            )?;
        }
        writeln!(f, "{}", "=".repeat(98))?;
        writeln!(f, "Total params: {}", self.total_params)?;
        writeln!(f, "Trainable params: {}", self.trainable_params)?;
        writeln!(f, "Non-trainable params: {}", self.non_trainable_params)?;
        write!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_param_counts() {
        let summary = ModelSummary::new(&ResCnnConfig::new(), 160);
        assert_eq!(summary.total_params, 16_888_768);
        assert_eq!(summary.non_trainable_params, 19_200);
        assert_eq!(summary.trainable_params, 16_869_568);
    }

    #[test]
    fn non_trainable_is_batch_norm_moving_stats() {
        let summary = ModelSummary::new(&ResCnnConfig::new(), 160);
        let bn: Vec<&LayerSummary> = summary
            .layers
            .iter()
            .filter(|l| l.kind == "BatchNormalization")
            .collect();
        // 4 stages x (1 stage conv + 3 blocks x 3 convs)
        assert_eq!(bn.len(), 40);
        let channels: usize = bn.iter().map(|l| *l.output_shape.last().unwrap()).sum();
        assert_eq!(channels, 9_600);
        assert_eq!(summary.non_trainable_params, 2 * channels);
        assert_eq!(
            summary.trainable_params + summary.non_trainable_params,
            summary.total_params
        );
    }

    #[test]
    fn default_shapes() {
        let summary = ModelSummary::new(&ResCnnConfig::new(), 160);
        assert_eq!(summary.layer("input").unwrap().output_shape, vec![160, 64, 1]);
        assert_eq!(summary.layer("conv64-s").unwrap().output_shape, vec![80, 32, 64]);
        assert_eq!(summary.layer("conv512-s").unwrap().output_shape, vec![10, 4, 512]);
        assert_eq!(summary.layer("reshape").unwrap().output_shape, vec![10, 2048]);
        assert_eq!(summary.layer("average").unwrap().output_shape, vec![2048]);
        assert_eq!(summary.layer("ln").unwrap().output_shape, vec![512]);

        let affine = summary.layer("affine").unwrap();
        assert_eq!(affine.params, 2048 * 512 + 512);
    }

    #[test]
    fn identity_block_names() {
        let summary = ModelSummary::new(&ResCnnConfig::new(), 160);
        for name in [
            "res1_0_branch_conv1_1",
            "res1_0_branch_conv1.1_bn",
            "res2_1_branch_conv3",
            "res3_2_branch_conv3_bn",
            "res4_2_branch_conv1_2",
            "res4_2_branch_conv1.2_bn",
        ] {
            assert!(summary.layer(name).is_some(), "missing layer {name}");
        }
        assert!(summary.layer("res4_3_branch_conv3").is_none());

        let conv3 = summary.layer("res2_1_branch_conv3").unwrap();
        assert_eq!(conv3.params, 3 * 3 * 128 * 128 + 128);
    }

    #[test]
    fn odd_frame_count_rounds_up() {
        let summary = ModelSummary::new(&ResCnnConfig::new(), 100);
        assert_eq!(summary.layer("reshape").unwrap().output_shape, vec![7, 2048]);
    }

    #[test]
    fn display_contains_totals() {
        let cfg = ResCnnConfig::new().with_filters(vec![4]).with_res_blocks(1);
        let text = ModelSummary::new(&cfg, 8).to_string();
        assert!(text.starts_with("Model: \"convolutional\""));
        assert!(text.contains("conv4-s_bn"));
        assert!(text.contains("(None, 4, 32, 4)"));
        assert!(text.contains("Total params:"));
    }
}
