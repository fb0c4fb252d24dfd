//! Cosine triplet loss over unit-length embeddings.

use burn::prelude::*;

use crate::error::RescnnError;

/// Default triplet margin.
pub const DEFAULT_ALPHA: f32 = 0.1;

/// Row-wise cosine similarity of two `[n, d]` batches of unit vectors: `[n, 1]`.
pub fn batch_cosine_similarity<B: Backend>(a: Tensor<B, 2>, b: Tensor<B, 2>) -> Tensor<B, 2> {
    (a * b).sum_dim(1)
}

/// Triplet loss for a batch laid out as `[anchors; positives; negatives]`.
///
/// `mean(max(cos(a, n) - cos(a, p) + alpha, 0))`
pub fn triplet_loss<B: Backend>(
    embeddings: Tensor<B, 2>,
    alpha: f32,
) -> Result<Tensor<B, 1>, RescnnError> {
    let [n, d] = embeddings.dims();
    if n == 0 || n % 3 != 0 {
        return Err(RescnnError::Shape(format!(
            "triplet batch size must be a positive multiple of 3, got {n}"
        )));
    }
    let k = n / 3;
    let anchor = embeddings.clone().slice([0..k, 0..d]);
    let positive = embeddings.clone().slice([k..2 * k, 0..d]);
    let negative = embeddings.slice([2 * k..n, 0..d]);

    let sap = batch_cosine_similarity(anchor.clone(), positive);
    let san = batch_cosine_similarity(anchor, negative);
    let hinge = (san - sap).add_scalar(alpha).clamp_min(0.0);
    Ok(hinge.mean())
}
