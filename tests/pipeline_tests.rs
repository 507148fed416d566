//! Acquisition pipeline behavior against mock seams: cache discipline,
//! order preservation, fused-vector invariants, and batch failure modes.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use collagrid::vector::cosine_similarity;
use collagrid::{
    CollageEngine, CollageError, DescriptionService, EmbeddingService, ImageFetcher,
    ImageReference, Settings, VectorCache, VectorPipeline,
};

/// Fetcher that synthesizes a deterministic image per reference.
///
/// `aliases` lets two distinct references resolve to identical pixels, and
/// `fail_on` makes exactly one reference error out.
struct MockFetcher {
    calls: Arc<AtomicUsize>,
    aliases: HashMap<String, String>,
    fail_on: Option<String>,
}

impl MockFetcher {
    fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            aliases: HashMap::new(),
            fail_on: None,
        }
    }

    fn canonical<'a>(&'a self, reference: &'a str) -> &'a str {
        self.aliases
            .get(reference)
            .map(String::as_str)
            .unwrap_or(reference)
    }
}

fn synthetic_color(key: &str) -> Rgb<u8> {
    let sum: u32 = key.bytes().map(u32::from).sum();
    Rgb([
        (sum % 251) as u8,
        (sum / 3 % 241) as u8,
        (sum / 7 % 239) as u8,
    ])
}

impl ImageFetcher for MockFetcher {
    async fn fetch(&self, reference: &ImageReference) -> Result<DynamicImage, CollageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_on.as_deref() == Some(reference.as_str()) {
            return Err(CollageError::Fetch {
                reference: reference.as_str().to_string(),
                reason: "simulated network failure".to_string(),
            });
        }
        let color = synthetic_color(self.canonical(reference.as_str()));
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, color)))
    }
}

/// Description derived from the image content, so identical pixels get
/// identical sentences.
struct MockDescriptions {
    calls: Arc<AtomicUsize>,
}

impl DescriptionService for MockDescriptions {
    async fn describe(
        &self,
        _reference: &ImageReference,
        image: &DynamicImage,
    ) -> Result<String, CollageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let px = image.to_rgb8().get_pixel(0, 0).0;
        Ok(format!(
            "a plain cover with tone {}-{}-{}",
            px[0], px[1], px[2]
        ))
    }
}

/// Deterministic 8-dimensional embeddings derived from the text bytes.
struct MockEmbeddings {
    calls: Arc<AtomicUsize>,
}

impl EmbeddingService for MockEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CollageError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|text| {
                let seed: u32 = text.bytes().map(u32::from).sum();
                (0..8)
                    .map(|j| ((seed + j * 97) as f32 * 0.013).sin())
                    .collect()
            })
            .collect())
    }
}

struct Counters {
    fetches: Arc<AtomicUsize>,
    descriptions: Arc<AtomicUsize>,
    embed_batches: Arc<AtomicUsize>,
}

impl Counters {
    fn new() -> Self {
        Self {
            fetches: Arc::new(AtomicUsize::new(0)),
            descriptions: Arc::new(AtomicUsize::new(0)),
            embed_batches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

fn test_settings(cache_dir: &TempDir) -> Settings {
    let mut settings = Settings::default();
    settings.cache_dir = cache_dir.path().to_path_buf();
    settings.jitter.enabled = false;
    settings
}

fn references(names: &[&str]) -> Vec<ImageReference> {
    names.iter().map(|n| ImageReference::new(*n)).collect()
}

fn build_engine(
    cache_dir: &TempDir,
    counters: &Counters,
) -> CollageEngine<MockFetcher, MockDescriptions, MockEmbeddings> {
    let settings = test_settings(cache_dir);
    let cache = Arc::new(VectorCache::open(&settings.cache_dir).unwrap());
    CollageEngine::new(
        MockFetcher::new(Arc::clone(&counters.fetches)),
        MockDescriptions {
            calls: Arc::clone(&counters.descriptions),
        },
        MockEmbeddings {
            calls: Arc::clone(&counters.embed_batches),
        },
        cache,
        settings,
    )
}

#[tokio::test]
async fn second_run_is_served_entirely_from_cache() {
    let cache_dir = TempDir::new().unwrap();
    let refs = references(&[
        "img_a", "img_b", "img_c", "img_d", "img_e", "img_f", "img_g", "img_h", "img_i",
    ]);

    let first_counters = Counters::new();
    let engine = build_engine(&cache_dir, &first_counters);
    let first_layout = engine.layout(&refs).await.unwrap();

    // Both modalities miss: one fetch per reference per path, one
    // description per reference, one batched embedding call total.
    assert_eq!(first_counters.fetches.load(Ordering::Relaxed), 18);
    assert_eq!(first_counters.descriptions.load(Ordering::Relaxed), 9);
    assert_eq!(first_counters.embed_batches.load(Ordering::Relaxed), 1);

    let second_counters = Counters::new();
    let engine = build_engine(&cache_dir, &second_counters);
    let second_layout = engine.layout(&refs).await.unwrap();

    assert_eq!(second_counters.fetches.load(Ordering::Relaxed), 0);
    assert_eq!(second_counters.descriptions.load(Ordering::Relaxed), 0);
    assert_eq!(second_counters.embed_batches.load(Ordering::Relaxed), 0);

    // Cached values reproduce the exact same layout (jitter disabled).
    assert_eq!(first_layout.grid_size, second_layout.grid_size);
    for (a, b) in first_layout
        .placements
        .iter()
        .zip(&second_layout.placements)
    {
        assert_eq!(a.reference, b.reference);
        assert_eq!(a.cell, b.cell);
    }
}

#[tokio::test]
async fn fused_vectors_align_with_input_order() {
    let cache_dir = TempDir::new().unwrap();
    let settings = test_settings(&cache_dir);
    let cache = Arc::new(VectorCache::open(&settings.cache_dir).unwrap());
    let counters = Counters::new();
    let pipeline = VectorPipeline::new(
        MockFetcher::new(Arc::clone(&counters.fetches)),
        MockDescriptions {
            calls: Arc::clone(&counters.descriptions),
        },
        MockEmbeddings {
            calls: Arc::clone(&counters.embed_batches),
        },
        cache,
        &settings,
    );

    let forward = references(&["r1", "r2", "r3", "r4"]);
    let reversed = references(&["r4", "r3", "r2", "r1"]);

    let fused_forward = pipeline.fused_vectors(&forward).await.unwrap();
    let fused_reversed = pipeline.fused_vectors(&reversed).await.unwrap();

    // Per-row normalization makes a reference's fused vector independent
    // of batch order, so reversing the input must reverse the rows.
    assert_eq!(fused_forward.len(), 4);
    for i in 0..4 {
        assert_eq!(fused_forward[i], fused_reversed[3 - i]);
    }

    // Fused length = semantic_dim (mock: 8) + visual_dim (default 16x16).
    for row in &fused_forward {
        assert_eq!(row.len(), 8 + 768);
    }
}

#[tokio::test]
async fn duplicate_images_get_near_identical_vectors_but_distinct_cells() {
    let cache_dir = TempDir::new().unwrap();
    let settings = test_settings(&cache_dir);
    let cache = Arc::new(VectorCache::open(&settings.cache_dir).unwrap());
    let counters = Counters::new();

    let mut fetcher = MockFetcher::new(Arc::clone(&counters.fetches));
    fetcher
        .aliases
        .insert("img_twin".to_string(), "img_a".to_string());

    let refs = references(&[
        "img_a", "img_twin", "img_c", "img_d", "img_e", "img_f", "img_g", "img_h", "img_i",
    ]);

    let engine = CollageEngine::new(
        fetcher,
        MockDescriptions {
            calls: Arc::clone(&counters.descriptions),
        },
        MockEmbeddings {
            calls: Arc::clone(&counters.embed_batches),
        },
        Arc::clone(&cache),
        settings.clone(),
    );
    let layout = engine.layout(&refs).await.unwrap();

    // The twins were vectorized identically...
    let a: Vec<f32> = cache
        .get("visual", "img_a")
        .unwrap()
        .expect("visual vector cached");
    let twin: Vec<f32> = cache.get("visual", "img_twin").unwrap().unwrap();
    assert!(cosine_similarity(&a, &twin) > 0.9999);

    // ...yet never share a cell.
    let cell_a = layout
        .placements
        .iter()
        .find(|p| p.reference.as_str() == "img_a")
        .unwrap()
        .cell;
    let cell_twin = layout
        .placements
        .iter()
        .find(|p| p.reference.as_str() == "img_twin")
        .unwrap()
        .cell;
    assert_ne!(cell_a, cell_twin);
}

#[tokio::test]
async fn one_failing_fetch_fails_the_whole_batch() {
    let cache_dir = TempDir::new().unwrap();
    let counters = Counters::new();
    let settings = test_settings(&cache_dir);
    let cache = Arc::new(VectorCache::open(&settings.cache_dir).unwrap());

    let mut fetcher = MockFetcher::new(Arc::clone(&counters.fetches));
    fetcher.fail_on = Some("img_e".to_string());

    let engine = CollageEngine::new(
        fetcher,
        MockDescriptions {
            calls: Arc::clone(&counters.descriptions),
        },
        MockEmbeddings {
            calls: Arc::clone(&counters.embed_batches),
        },
        cache,
        settings,
    );

    let refs = references(&[
        "img_a", "img_b", "img_c", "img_d", "img_e", "img_f", "img_g", "img_h", "img_i",
    ]);
    let err = engine.layout(&refs).await.unwrap_err();
    assert_eq!(err.status_code(), "FETCH_ERROR");
    assert!(err.to_string().contains("img_e"));
}

#[tokio::test]
async fn extra_references_are_dropped_not_errored() {
    let cache_dir = TempDir::new().unwrap();
    let counters = Counters::new();
    let engine = build_engine(&cache_dir, &counters);

    // 11 references: grid 3x3, two dropped.
    let refs = references(&[
        "a", "b", "c", "d", "e", "f", "g", "h", "i", "dropped_1", "dropped_2",
    ]);
    let layout = engine.layout(&refs).await.unwrap();

    assert_eq!(layout.grid_size, 3);
    assert_eq!(layout.placements.len(), 9);
    assert!(
        !layout
            .placements
            .iter()
            .any(|p| p.reference.as_str().starts_with("dropped"))
    );
    // The dropped tail must not even be fetched.
    assert_eq!(counters.fetches.load(Ordering::Relaxed), 18);
}

#[tokio::test]
async fn too_few_references_rejected_before_any_work() {
    let cache_dir = TempDir::new().unwrap();
    let counters = Counters::new();
    let engine = build_engine(&cache_dir, &counters);

    let err = engine
        .layout(&references(&["a", "b", "c"]))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), "INSUFFICIENT_IMAGES");
    assert_eq!(counters.fetches.load(Ordering::Relaxed), 0);
}
