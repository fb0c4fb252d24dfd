//! Backend aliases and conversion of filterbank features into input tensors.

use burn::backend::{Autodiff, NdArray};
use burn::prelude::*;

use crate::error::RescnnError;

/// CPU inference backend.
pub type Cpu = NdArray<f32>;

/// CPU training backend with automatic differentiation.
pub type CpuTrain = Autodiff<Cpu>;

/// Stacks equal-length feature matrices (`[frames][mels]` each) into a
/// `[segments, 1, frames, mels]` input batch.
pub fn features_to_tensor<B: Backend>(
    segments: &[&[Vec<f32>]],
    device: &B::Device,
) -> Result<Tensor<B, 4>, RescnnError> {
    let first = segments
        .first()
        .ok_or_else(|| RescnnError::Shape("no segments".into()))?;
    let frames = first.len();
    let mels = first.first().map(Vec::len).unwrap_or(0);
    if frames == 0 || mels == 0 {
        return Err(RescnnError::Shape("empty segment".into()));
    }

    let mut flat = Vec::with_capacity(segments.len() * frames * mels);
    for (i, segment) in segments.iter().enumerate() {
        if segment.len() != frames {
            return Err(RescnnError::Shape(format!(
                "segment {i} has {} frames, expected {frames}",
                segment.len()
            )));
        }
        for (t, frame) in segment.iter().enumerate() {
            if frame.len() != mels {
                return Err(RescnnError::Shape(format!(
                    "segment {i} frame {t} has {} channels, expected {mels}",
                    frame.len()
                )));
            }
            flat.extend_from_slice(frame);
        }
    }

    let data = TensorData::new(flat, [segments.len(), 1, frames, mels]);
    Ok(Tensor::from_data(data, device))
}

/// Copies a `[n, d]` tensor into one `Vec` per row.
pub fn tensor_rows<B: Backend>(x: Tensor<B, 2>) -> Result<Vec<Vec<f32>>, RescnnError> {
    let [_, d] = x.dims();
    let values = x
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| RescnnError::Data(format!("{e:?}")))?;
    Ok(values.chunks(d.max(1)).map(<[f32]>::to_vec).collect())
}
