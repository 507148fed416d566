//! Vector acquisition pipeline.
//!
//! Contract: given an ordered list of references, return one fused vector
//! per reference, preserving input order and minimizing redundant network
//! and API work. Both modality caches are consulted before any network
//! call; a hit short-circuits that modality for that reference.
//!
//! Scheduling: visual fetches fan out over a bounded worker pool and are
//! gathered by original index, never by completion order. Description
//! calls are serialized per batch (the service is rate and quota
//! sensitive), and all missing descriptions join into one batched
//! embedding call. Any single-item failure fails the whole batch; a
//! missing vector cannot be interpolated without corrupting the
//! fixed-length fused-vector invariant.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::cache::{NS_DESCRIPTION, NS_SEMANTIC, NS_VISUAL, VectorCache};
use crate::config::Settings;
use crate::error::{CollageError, CollageResult};
use crate::fetch::ImageFetcher;
use crate::vector::fusion::{fuse, normalize_rows};
use crate::vector::semantic::{DescriptionService, EmbeddingService};
use crate::vector::visual::{visual_dimension, visual_vector};
use crate::vector::{ImageReference, VectorFamily};

/// Acquisition pipeline wired to its three external seams.
pub struct VectorPipeline<F, D, E> {
    fetcher: Arc<F>,
    descriptions: D,
    embeddings: E,
    cache: Arc<VectorCache>,
    visual_resolution: u32,
    parallelism: usize,
}

impl<F, D, E> VectorPipeline<F, D, E>
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
        settings: &Settings,
    ) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            descriptions,
            embeddings,
            cache,
            visual_resolution: settings.visual.resolution,
            parallelism: settings.fetch.parallelism,
        }
    }

    /// One fused vector per reference, in input order.
    ///
    /// The two modality paths run concurrently; fusion waits for both
    /// full families (the batched embedding call is a join barrier on the
    /// semantic side).
    pub async fn fused_vectors(
        &self,
        references: &[ImageReference],
    ) -> CollageResult<Vec<Vec<f32>>> {
        let (visual, semantic) = tokio::join!(
            self.visual_vectors(references),
            self.semantic_vectors(references)
        );
        let mut visual = VectorFamily::new(visual?)?;
        let mut semantic = VectorFamily::new(semantic?)?;

        normalize_rows(&mut semantic);
        normalize_rows(&mut visual);
        fuse(semantic, visual)
    }

    /// Visual path: cache hit, or fetch + downsample + flatten over a
    /// bounded worker pool. Results land in index-keyed slots.
    async fn visual_vectors(&self, references: &[ImageReference]) -> CollageResult<Vec<Vec<f32>>> {
        let expected_len = visual_dimension(self.visual_resolution);
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; references.len()];
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut workers: JoinSet<CollageResult<(usize, Vec<f32>)>> = JoinSet::new();

        for (index, reference) in references.iter().enumerate() {
            if let Some(cached) = self
                .cache
                .get::<Vec<f32>>(NS_VISUAL, reference.as_str())?
            {
                if cached.len() != expected_len {
                    // Stale entry from a different resolution config.
                    return Err(CollageError::DimensionMismatch {
                        expected: expected_len,
                        actual: cached.len(),
                    });
                }
                tracing::debug!(reference = reference.as_str(), "visual cache hit");
                slots[index] = Some(cached);
                continue;
            }

            let fetcher = Arc::clone(&self.fetcher);
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            let reference = reference.clone();
            let resolution = self.visual_resolution;
            workers.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    CollageError::Fetch {
                        reference: reference.as_str().to_string(),
                        reason: format!("worker pool closed: {e}"),
                    }
                })?;
                let image = fetcher.fetch(&reference).await?;
                let vector = visual_vector(&image, resolution);
                cache.insert(NS_VISUAL, reference.as_str(), &vector)?;
                Ok((index, vector))
            });
        }

        while let Some(joined) = workers.join_next().await {
            let (index, vector) = joined.map_err(|e| CollageError::Fetch {
                reference: references
                    .first()
                    .map(|r| r.as_str().to_string())
                    .unwrap_or_default(),
                reason: format!("fetch worker panicked: {e}"),
            })??;
            slots[index] = Some(vector);
        }

        collect_slots(slots)
    }

    /// Semantic path: embedding cache hit wins outright; otherwise the
    /// (cached or freshly requested) description joins the batch for one
    /// embedding call at the end.
    async fn semantic_vectors(
        &self,
        references: &[ImageReference],
    ) -> CollageResult<Vec<Vec<f32>>> {
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; references.len()];
        let mut pending: Vec<(usize, String)> = Vec::new();

        for (index, reference) in references.iter().enumerate() {
            if let Some(cached) = self
                .cache
                .get::<Vec<f32>>(NS_SEMANTIC, reference.as_str())?
            {
                tracing::debug!(reference = reference.as_str(), "semantic cache hit");
                slots[index] = Some(cached);
                continue;
            }

            let description = match self
                .cache
                .get::<String>(NS_DESCRIPTION, reference.as_str())?
            {
                Some(cached) => cached,
                None => {
                    let image = self.fetcher.fetch(reference).await?;
                    let description = self.descriptions.describe(reference, &image).await?;
                    self.cache
                        .insert(NS_DESCRIPTION, reference.as_str(), &description)?;
                    description
                }
            };
            pending.push((index, description));
        }

        if !pending.is_empty() {
            let texts: Vec<String> = pending.iter().map(|(_, d)| d.clone()).collect();
            // Join barrier: every missing description is in, one call out.
            let embeddings = self.embeddings.embed_batch(&texts).await?;
            if embeddings.len() != pending.len() {
                return Err(CollageError::DimensionMismatch {
                    expected: pending.len(),
                    actual: embeddings.len(),
                });
            }
            for ((index, _), embedding) in pending.into_iter().zip(embeddings) {
                self.cache
                    .insert(NS_SEMANTIC, references[index].as_str(), &embedding)?;
                slots[index] = Some(embedding);
            }
        }

        collect_slots(slots)
    }
}

/// Unwrap index-keyed slots into a dense, order-preserving matrix.
fn collect_slots(slots: Vec<Option<Vec<f32>>>) -> CollageResult<Vec<Vec<f32>>> {
    let total = slots.len();
    let filled: Vec<Vec<f32>> = slots.into_iter().flatten().collect();
    if filled.len() != total {
        return Err(CollageError::DimensionMismatch {
            expected: total,
            actual: filled.len(),
        });
    }
    Ok(filled)
}
