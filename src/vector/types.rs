//! Core types for the vector acquisition pipeline.
//!
//! Follows the crate's newtype discipline: references and vector families
//! get their own types so the pipeline stages cannot be handed the wrong
//! primitive.

use serde::{Deserialize, Serialize};

use crate::error::{CollageError, CollageResult};

/// Minimum number of references for a collage (2x2 grid).
pub const MIN_REFERENCES: usize = 4;

/// Opaque key identifying one input image: a URL or a filesystem path.
///
/// Used verbatim as the cache key, so equality is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ImageReference {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Grid side length for `count` references: floor(sqrt(count)).
///
/// Rejects counts below [`MIN_REFERENCES`]; anything past the largest
/// perfect square is dropped by the caller, never an error.
pub fn grid_size_for(count: usize) -> CollageResult<usize> {
    if count < MIN_REFERENCES {
        return Err(CollageError::InsufficientImages {
            count,
            minimum: MIN_REFERENCES,
        });
    }
    let mut side = (count as f64).sqrt().floor() as usize;
    // Guard against floating-point undershoot near perfect squares.
    while (side + 1) * (side + 1) <= count {
        side += 1;
    }
    Ok(side)
}

/// One family of per-reference vectors (all visual, or all semantic).
///
/// Rows align with the pipeline's reference order. All rows share one
/// dimension, checked at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFamily {
    rows: Vec<Vec<f32>>,
    dimension: usize,
}

impl VectorFamily {
    /// Build a family from row vectors, validating uniform dimension.
    pub fn new(rows: Vec<Vec<f32>>) -> CollageResult<Self> {
        let dimension = rows.first().map_or(0, Vec::len);
        for row in &rows {
            if row.len() != dimension {
                return Err(CollageError::DimensionMismatch {
                    expected: dimension,
                    actual: row.len(),
                });
            }
        }
        Ok(Self { rows, dimension })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<f32>> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_size_floor_of_sqrt() {
        assert_eq!(grid_size_for(4).unwrap(), 2);
        assert_eq!(grid_size_for(8).unwrap(), 2);
        assert_eq!(grid_size_for(9).unwrap(), 3);
        assert_eq!(grid_size_for(11).unwrap(), 3);
        assert_eq!(grid_size_for(16).unwrap(), 4);
        assert_eq!(grid_size_for(25).unwrap(), 5);
    }

    #[test]
    fn too_few_references_rejected() {
        for count in 0..4 {
            let err = grid_size_for(count).unwrap_err();
            assert_eq!(err.status_code(), "INSUFFICIENT_IMAGES");
        }
    }

    #[test]
    fn family_rejects_ragged_rows() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        let err = VectorFamily::new(rows).unwrap_err();
        assert_eq!(err.status_code(), "DIMENSION_MISMATCH");
    }

    #[test]
    fn family_reports_dimension() {
        let family = VectorFamily::new(vec![vec![0.0; 5]; 3]).unwrap();
        assert_eq!(family.len(), 3);
        assert_eq!(family.dimension(), 5);
    }
}
