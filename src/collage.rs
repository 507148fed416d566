//! End-to-end collage layout: references in, placements out.
//!
//! The engine truncates the input to the largest perfect square, runs the
//! acquisition pipeline, and lays the fused vectors out on the grid. The
//! placement list is the full renderer-facing contract; painting pixels is
//! a downstream concern.

use serde::Serialize;
use std::sync::Arc;

use crate::cache::VectorCache;
use crate::config::Settings;
use crate::error::CollageResult;
use crate::fetch::ImageFetcher;
use crate::layout::{GridCell, compute_layout};
use crate::vector::semantic::{DescriptionService, EmbeddingService};
use crate::vector::{ImageReference, VectorPipeline, grid_size_for};

/// One placed image, aligned with the truncated input order.
#[derive(Debug, Clone, Serialize)]
pub struct Placement {
    pub reference: ImageReference,
    pub cell: GridCell,
    pub x: f32,
    pub y: f32,
}

/// Complete layout for one collage request.
#[derive(Debug, Clone, Serialize)]
pub struct CollageLayout {
    pub grid_size: usize,
    pub placements: Vec<Placement>,
}

/// Orchestrates acquisition and layout against the configured seams.
pub struct CollageEngine<F, D, E> {
    pipeline: VectorPipeline<F, D, E>,
    settings: Settings,
}

impl<F, D, E> CollageEngine<F, D, E>
where
    F: ImageFetcher + 'static,
    D: DescriptionService,
    E: EmbeddingService,
{
    pub fn new(
        fetcher: F,
        descriptions: D,
        embeddings: E,
        cache: Arc<VectorCache>,
        settings: Settings,
    ) -> Self {
        let pipeline = VectorPipeline::new(fetcher, descriptions, embeddings, cache, &settings);
        Self { pipeline, settings }
    }

    /// Compute the layout for `references`.
    ///
    /// References beyond the largest perfect square are dropped, never an
    /// error; fewer than four references is rejected before any work.
    pub async fn layout(&self, references: &[ImageReference]) -> CollageResult<CollageLayout> {
        let grid_size = grid_size_for(references.len())?;
        let used = &references[..grid_size * grid_size];
        tracing::info!(
            total = references.len(),
            used = used.len(),
            grid_size,
            "computing collage layout"
        );

        let fused = self.pipeline.fused_vectors(used).await?;
        let positions = compute_layout(&fused, grid_size, &self.settings.jitter)?;

        let placements = used
            .iter()
            .zip(positions)
            .map(|(reference, position)| Placement {
                reference: reference.clone(),
                cell: position.cell,
                x: position.x,
                y: position.y,
            })
            .collect();

        Ok(CollageLayout {
            grid_size,
            placements,
        })
    }
}
