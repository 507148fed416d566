//! Vector acquisition for collage layout.
//!
//! This module turns each image reference into a fused similarity
//! fingerprint: a downsampled-pixel visual vector and a
//! description-derived semantic embedding, each L2-normalized and
//! concatenated. Both modalities sit behind a persistent cache so repeat
//! references never repeat network or API work.

pub mod fusion;
pub mod pipeline;
pub mod semantic;
pub mod types;
pub mod visual;

pub use fusion::{cosine_similarity, fuse, normalize_rows};
pub use pipeline::VectorPipeline;
pub use semantic::{
    ChatDescriptionClient, DescriptionService, EmbeddingService, PredictEmbeddingClient,
};
pub use types::{ImageReference, MIN_REFERENCES, VectorFamily, grid_size_for};
pub use visual::{visual_dimension, visual_vector};
