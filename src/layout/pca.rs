//! Principal-component projection of fused vectors to 2D.
//!
//! Power iteration with deflation extracts the top two components without
//! ever materializing the D x D covariance matrix: the covariance operator
//! is applied as X^T(Xv) against the mean-centered rows, so cost stays
//! O(N * D) per iteration even for wide fused vectors.
//!
//! Determinism: iteration starts from a fixed-seed vector, so identical
//! input always yields identical coordinates. Ties (possible when N <= D)
//! are left for the grid assigner's stable sorts to break.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CollageError, CollageResult};

/// Maximum number of power iterations per component.
const MAX_ITERATIONS: usize = 200;

/// Convergence tolerance on the cosine between successive iterates.
const CONVERGENCE_TOLERANCE: f32 = 1e-6;

/// Epsilon below which a norm counts as zero.
const EPSILON: f32 = 1e-10;

/// Fixed seed for the iteration start vectors.
const POWER_SEED: u64 = 0x636f_6c6c;

/// Project an N x D matrix onto its top two principal components.
///
/// Returns N (x, y) pairs whose axes are the directions of greatest and
/// second-greatest variance. Requires N >= 2 rows of uniform dimension.
pub fn project_to_plane(rows: &[Vec<f32>]) -> CollageResult<Vec<(f32, f32)>> {
    if rows.len() < 2 {
        return Err(CollageError::DimensionMismatch {
            expected: 2,
            actual: rows.len(),
        });
    }
    let dimension = rows[0].len();
    if dimension == 0 {
        return Err(CollageError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }
    for row in rows {
        if row.len() != dimension {
            return Err(CollageError::DimensionMismatch {
                expected: dimension,
                actual: row.len(),
            });
        }
    }

    let centered = center_rows(rows, dimension);

    let first = principal_component(&centered, dimension, &[], 0);
    let second = principal_component(&centered, dimension, &[first.clone()], 1);

    Ok(centered
        .iter()
        .map(|row| (dot(row, &first), dot(row, &second)))
        .collect())
}

fn center_rows(rows: &[Vec<f32>], dimension: usize) -> Vec<Vec<f32>> {
    let n = rows.len() as f32;
    let mut mean = vec![0.0f32; dimension];
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    rows.iter()
        .map(|row| row.iter().zip(&mean).map(|(v, m)| v - m).collect())
        .collect()
}

/// Power-iterate one component, deflating out any previously found ones.
///
/// A degenerate direction (no variance left) converges to the zero vector;
/// the seeded start vector is returned instead so projections are all-zero
/// ties rather than NaN.
fn principal_component(
    centered: &[Vec<f32>],
    dimension: usize,
    previous: &[Vec<f32>],
    ordinal: u64,
) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(POWER_SEED + ordinal);
    let mut v: Vec<f32> = (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect();
    orthogonalize(&mut v, previous);
    if !normalize(&mut v) {
        return v;
    }

    for _ in 0..MAX_ITERATIONS {
        // w = X^T (X v), one pass over the rows
        let mut w = vec![0.0f32; dimension];
        for row in centered {
            let score = dot(row, &v);
            for (wi, ri) in w.iter_mut().zip(row) {
                *wi += score * ri;
            }
        }

        orthogonalize(&mut w, previous);
        if !normalize(&mut w) {
            // No variance along any remaining direction.
            return v;
        }

        let alignment = dot(&w, &v).abs();
        v = w;
        if (1.0 - alignment) < CONVERGENCE_TOLERANCE {
            break;
        }
    }

    v
}

/// Remove the projection of `v` onto each of `basis` (Gram-Schmidt step).
fn orthogonalize(v: &mut [f32], basis: &[Vec<f32>]) {
    for b in basis {
        let projection = dot(v, b);
        for (vi, bi) in v.iter_mut().zip(b) {
            *vi -= projection * bi;
        }
    }
}

/// Scale `v` to unit norm; returns false if the norm is numerically zero.
fn normalize(v: &mut [f32]) -> bool {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm < EPSILON {
        return false;
    }
    for x in v {
        *x /= norm;
    }
    true
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
