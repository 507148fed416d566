//! Similarity-driven image collage layout engine.
//!
//! Turns a list of image references into grid placements whose spatial
//! arrangement reflects similarity between the images: each image gets a
//! fused visual + semantic fingerprint, the fingerprints are projected to
//! 2D, and the 2D cloud is snapped onto an exact grid bijection.
//! Rendering the final picture is left to a downstream consumer of the
//! placement list.

pub mod cache;
pub mod collage;
pub mod config;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod vector;

// Explicit exports for better API clarity
pub use cache::VectorCache;
pub use collage::{CollageEngine, CollageLayout, Placement};
pub use config::Settings;
pub use error::{CollageError, CollageResult, ServiceKind};
pub use fetch::{HttpFetcher, ImageFetcher};
pub use layout::{GridCell, GridPosition, compute_layout};
pub use vector::{
    ChatDescriptionClient, DescriptionService, EmbeddingService, ImageReference,
    PredictEmbeddingClient, VectorPipeline, grid_size_for,
};
