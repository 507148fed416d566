//! Image retrieval boundary.
//!
//! A reference is either an HTTP(S) URL or a local filesystem path; both
//! resolve to a decoded RGB image. Failures are isolated per item and carry
//! the offending reference, so the pipeline can surface exactly which input
//! killed the batch.

use image::DynamicImage;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::{CollageError, CollageResult};
use crate::vector::ImageReference;

/// Seam between the pipeline and the outside world.
///
/// Implementations must be thread-safe: the visual path fans fetches out
/// over a bounded worker pool.
pub trait ImageFetcher: Send + Sync {
    /// Retrieve and decode the image behind `reference`.
    fn fetch(
        &self,
        reference: &ImageReference,
    ) -> impl Future<Output = CollageResult<DynamicImage>> + Send;
}

/// Production fetcher: reqwest for URLs, tokio::fs for local paths.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> CollageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CollageError::Config {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    async fn read_bytes(&self, reference: &ImageReference) -> CollageResult<Vec<u8>> {
        let key = reference.as_str();
        if key.starts_with("http://") || key.starts_with("https://") {
            let response = self.client.get(key).send().await.map_err(|e| {
                CollageError::Fetch {
                    reference: key.to_string(),
                    reason: e.to_string(),
                }
            })?;
            if !response.status().is_success() {
                return Err(CollageError::Fetch {
                    reference: key.to_string(),
                    reason: format!("HTTP status {}", response.status()),
                });
            }
            let bytes = response.bytes().await.map_err(|e| CollageError::Fetch {
                reference: key.to_string(),
                reason: e.to_string(),
            })?;
            Ok(bytes.to_vec())
        } else {
            tokio::fs::read(key).await.map_err(|e| CollageError::Fetch {
                reference: key.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, reference: &ImageReference) -> CollageResult<DynamicImage> {
        let bytes = self.read_bytes(reference).await?;
        tracing::debug!(reference = reference.as_str(), len = bytes.len(), "fetched image bytes");
        image::load_from_memory(&bytes).map_err(|e| CollageError::Decode {
            reference: reference.as_str().to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    #[tokio::test]
    async fn fetches_local_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pixel.png");

        let img = RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        std::fs::write(&path, buf.into_inner()).unwrap();

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let reference = ImageReference::new(path.to_string_lossy());
        let decoded = fetcher.fetch(&reference).await.unwrap();
        assert_eq!(decoded.width(), 2);
        assert_eq!(decoded.height(), 2);
    }

    #[tokio::test]
    async fn missing_path_is_fetch_error() {
        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let reference = ImageReference::new("/nonexistent/cover.png");
        let err = fetcher.fetch(&reference).await.unwrap_err();
        assert_eq!(err.status_code(), "FETCH_ERROR");
    }

    #[tokio::test]
    async fn garbage_bytes_are_decode_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("not_an_image.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let fetcher = HttpFetcher::new(&FetchConfig::default()).unwrap();
        let reference = ImageReference::new(path.to_string_lossy());
        let err = fetcher.fetch(&reference).await.unwrap_err();
        assert_eq!(err.status_code(), "DECODE_ERROR");
    }
}
