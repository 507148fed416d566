//! Grid snapping: continuous 2D cloud onto an exact integer grid bijection.
//!
//! Two independent 1D passes instead of true 2D bin packing: a stable sort
//! by x fills columns left to right, then a stable sort by descending y
//! fills each column top to bottom. Each pass hands out exactly grid_size
//! slots per bucket, so the result is a bijection by construction, with no
//! backtracking and no post-hoc collision resolution. The price is only an
//! approximation of the true 2D neighborhood structure, which is fine for
//! a visual layout.

use serde::{Deserialize, Serialize};

use crate::error::{CollageError, CollageResult};

/// One cell of the collage grid, `col` and `row` in `[0, grid_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub col: u32,
    pub row: u32,
}

/// Snap `grid_size^2` coordinates onto the grid.
///
/// Stable sorts break coordinate ties by original index, so identical
/// points land in distinct cells and the whole mapping is deterministic.
/// Output is index-aligned with the input.
pub fn snap_to_grid(coords: &[(f32, f32)], grid_size: usize) -> CollageResult<Vec<GridCell>> {
    let n = coords.len();
    if grid_size < 2 || n != grid_size * grid_size {
        return Err(CollageError::DimensionMismatch {
            expected: grid_size * grid_size,
            actual: n,
        });
    }

    // Column pass: rank by x, bucket ranks into columns of grid_size.
    let mut by_x: Vec<usize> = (0..n).collect();
    by_x.sort_by(|&a, &b| coords[a].0.total_cmp(&coords[b].0));
    let mut columns = vec![0usize; n];
    for (rank, &index) in by_x.iter().enumerate() {
        columns[index] = rank / grid_size;
    }

    // Row pass: within each column, rank by descending y; the highest
    // point takes the highest row value (top of a y-up canvas).
    let mut cells = vec![GridCell { col: 0, row: 0 }; n];
    for col in 0..grid_size {
        let mut members: Vec<usize> = (0..n).filter(|&i| columns[i] == col).collect();
        members.sort_by(|&a, &b| coords[b].1.total_cmp(&coords[a].1));
        for (rank, &index) in members.iter().enumerate() {
            cells[index] = GridCell {
                col: col as u32,
                row: (grid_size - 1 - rank) as u32,
            };
        }
    }

    Ok(cells)
}
