use serde::{Deserialize, Serialize};

use crate::matching::MatchError;

/// Cosine similarity `dot(a, b) / (|a| * |b|)`, in [-1, 1].
///
/// Zero when either vector has zero magnitude. Vectors of different length are
/// a `DimensionMismatch`, never truncated or padded.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    // Accumulate in f64: squaring f32 components above ~1.8e19 overflows to inf.
    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| (f64::from(x), f64::from(y)))
        .fold((0.0f64, 0.0f64, 0.0f64), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let denom = sq_a.sqrt() * sq_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return Ok(0.0);
    }

    let cos = dot / denom;
    if cos.is_nan() {
        return Ok(0.0);
    }
    // Rounding can push |cos| a hair past 1 for near-parallel vectors.
    Ok(cos.clamp(-1.0, 1.0) as f32)
}

/// Calibration bands for sentence-transformer similarities: related texts
/// typically land between 0.2 and 0.95. Each entry is (similarity, score);
/// scores are interpolated linearly between neighbouring anchors.
const ATS_ANCHORS: &[(f32, f32)] = &[
    (0.0, 0.0),
    (0.30, 30.0),
    (0.45, 50.0),
    (0.60, 70.0),
    (0.75, 85.0),
    (0.95, 100.0),
];

/// Maps a cosine similarity to a 0–100 ATS-style score, rounded to one decimal.
/// Monotonic non-decreasing; negative and non-finite similarities score 0.
pub fn ats_score(similarity: f32) -> f32 {
    if !similarity.is_finite() {
        return 0.0;
    }
    let raw = if similarity <= ATS_ANCHORS[0].0 {
        0.0
    } else {
        ATS_ANCHORS
            .windows(2)
            .find(|w| similarity <= w[1].0)
            .map(|w| {
                let (lo_sim, lo_score) = w[0];
                let (hi_sim, hi_score) = w[1];
                lo_score + (similarity - lo_sim) / (hi_sim - lo_sim) * (hi_score - lo_score)
            })
            .unwrap_or(100.0)
    };
    (raw.clamp(0.0, 100.0) * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "Very Poor")]
    VeryPoor,
}

impl MatchLevel {
    pub fn from_score(score: f32) -> Self {
        if score >= 80.0 {
            MatchLevel::Excellent
        } else if score >= 65.0 {
            MatchLevel::Good
        } else if score >= 50.0 {
            MatchLevel::Fair
        } else if score >= 35.0 {
            MatchLevel::Poor
        } else {
            MatchLevel::VeryPoor
        }
    }
}
