//! Embedding comparison and same-speaker decisions.

use serde::Serialize;

use crate::error::VoiceprintError;

/// Default decision threshold on cosine similarity.
pub const DEFAULT_THRESHOLD: f32 = 0.75;

/// Cosine similarity of two embeddings in `[-1, 1]`.
///
/// Zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, VoiceprintError> {
    if a.len() != b.len() {
        return Err(VoiceprintError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        na += x as f64 * x as f64;
        nb += y as f64 * y as f64;
    }
    if na == 0.0 || nb == 0.0 {
        return Ok(0.0);
    }
    Ok((dot / (na.sqrt() * nb.sqrt())).clamp(-1.0, 1.0) as f32)
}

/// Outcome of comparing two embeddings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub score: f32,
    pub same_speaker: bool,
}

/// Decides whether two embeddings belong to the same speaker.
#[derive(Debug, Clone, Copy)]
pub struct Verifier {
    threshold: f32,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl Verifier {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Scores `a` against `b`; scores at or above the threshold match.
    pub fn verify(&self, a: &[f32], b: &[f32]) -> Result<Verdict, VoiceprintError> {
        let score = cosine_similarity(a, b)?;
        Ok(Verdict {
            score,
            same_speaker: score >= self.threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_basic() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 2.0], &[-2.0, -4.0]).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_ignores_scale() {
        let a = [0.3f32, -1.2, 4.0];
        let b = [0.6f32, -2.4, 8.0];
        assert!((cosine_similarity(&a, &b).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn cosine_dimension_mismatch() {
        assert!(matches!(
            cosine_similarity(&[1.0, 2.0], &[1.0]),
            Err(VoiceprintError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn verifier_threshold() {
        let v = Verifier::default();
        assert_eq!(v.threshold(), 0.75);

        let same = v.verify(&[1.0, 0.1], &[1.0, 0.0]).unwrap();
        assert!(same.same_speaker, "{same:?}");

        let diff = v.verify(&[1.0, 1.0], &[1.0, -1.0]).unwrap();
        assert!(!diff.same_speaker);
        assert!(diff.score.abs() < 1e-6);

        let strict = Verifier::new(0.999);
        assert!(!strict.verify(&[1.0, 0.1], &[1.0, 0.0]).unwrap().same_speaker);
    }

    #[test]
    fn verdict_serializes() {
        let v = Verdict {
            score: 0.5,
            same_speaker: false,
        };
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"score":0.5,"same_speaker":false}"#);
    }
}
