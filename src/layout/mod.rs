//! Layout stage: fused vectors to grid positions.
//!
//! Pure functions over the in-memory batch; nothing here suspends or
//! touches the network. `compute_layout` composes the three passes:
//! principal-component projection to 2D, grid snapping to an exact
//! bijection, and optional bounded jitter of the final coordinates.

pub mod grid;
pub mod jitter;
pub mod pca;

pub use grid::{GridCell, snap_to_grid};
pub use jitter::apply_jitter;
pub use pca::project_to_plane;

use crate::config::JitterConfig;
use crate::error::CollageResult;

/// Final position of one image: its exact grid cell plus the (possibly
/// jittered) coordinate handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPosition {
    pub cell: GridCell,
    pub x: f32,
    pub y: f32,
}

/// Lay out `grid_size^2` fused vectors on the grid.
///
/// Output is index-aligned with the input rows. With jitter disabled the
/// result is fully deterministic.
pub fn compute_layout(
    fused: &[Vec<f32>],
    grid_size: usize,
    jitter: &JitterConfig,
) -> CollageResult<Vec<GridPosition>> {
    let coords = project_to_plane(fused)?;
    let cells = snap_to_grid(&coords, grid_size)?;

    let mut positions: Vec<(f32, f32)> = cells
        .iter()
        .map(|cell| (cell.col as f32, cell.row as f32))
        .collect();
    if jitter.enabled {
        apply_jitter(&mut positions, jitter.strength, &mut rand::rng());
    }

    Ok(cells
        .into_iter()
        .zip(positions)
        .map(|(cell, (x, y))| GridPosition { cell, x, y })
        .collect())
}
