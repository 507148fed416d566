//! Normalization and fusion of the two vector families.
//!
//! Raw visual vectors (0..255 channel values) dwarf semantic embeddings in
//! magnitude; without per-row L2 normalization one modality would dominate
//! every distance computation. Each family is normalized independently,
//! then concatenated column-wise into the fused similarity matrix.

use crate::error::{CollageError, CollageResult};
use crate::vector::VectorFamily;

/// Rows with an L2 norm below this stay untouched instead of being divided.
const ZERO_NORM_EPSILON: f32 = 1e-8;

/// L2-normalize every row of a family in place.
///
/// Rows whose norm is numerically zero are left as zero rather than
/// divided; a degenerate input must not become NaN.
pub fn normalize_rows(family: &mut VectorFamily) {
    for row in family.rows_mut() {
        let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > ZERO_NORM_EPSILON {
            for value in row.iter_mut() {
                *value /= norm;
            }
        }
    }
}

/// Concatenate normalized semantic and visual families row by row.
///
/// Both families must carry one row per reference in the same order; a
/// count mismatch means an upstream bug, surfaced as DimensionMismatch.
/// Fused row length is always `semantic.dimension() + visual.dimension()`.
pub fn fuse(semantic: VectorFamily, visual: VectorFamily) -> CollageResult<Vec<Vec<f32>>> {
    if semantic.len() != visual.len() {
        return Err(CollageError::DimensionMismatch {
            expected: semantic.len(),
            actual: visual.len(),
        });
    }

    let fused = semantic
        .into_rows()
        .into_iter()
        .zip(visual.into_rows())
        .map(|(mut s, v)| {
            s.extend(v);
            s
        })
        .collect();
    Ok(fused)
}

/// Cosine similarity between two equal-length vectors.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= ZERO_NORM_EPSILON || norm_b <= ZERO_NORM_EPSILON {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
