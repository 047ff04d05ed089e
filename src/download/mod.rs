// src/download/mod.rs
// =============================================================================
// This module saves individual images to disk.
//
// Per image:
// 1. Work out a collision-safe filename (see filename.rs)
// 2. GET the image with the owning page as Referer
// 3. Make sure the output directory exists (created once, on first write)
// 4. Write the bytes, replacing any file of the same name
//
// A failed image NEVER fails the page or the run. Whatever goes wrong is
// folded into a DownloadOutcome with success = false and a reason string.
// =============================================================================

mod filename;

pub use filename::derive_filename;

use crate::error::DownloadError;
use crate::events::{EventSink, HarvestEvent};
use crate::fetch::HttpFetcher;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use url::Url;

// One image to fetch
#[derive(Debug, Clone)]
pub struct ImageJob {
    /// Absolute image URL
    pub url: String,
    /// The page the image was found on (sent as Referer)
    pub page_url: Url,
    /// 1-based page index
    pub page_index: usize,
    /// 1-based position of the image within its page
    pub seq_index: usize,
}

// What happened to one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub url: String,
    pub local_path: PathBuf,
    pub success: bool,
    pub error_reason: Option<String>,
}

// Saves images into one output directory
pub struct Downloader {
    fetcher: HttpFetcher,
    output_dir: PathBuf,
    dir_ready: OnceCell<()>,
    events: EventSink,
}

impl Downloader {
    pub fn new(fetcher: HttpFetcher, output_dir: impl Into<PathBuf>, events: EventSink) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            dir_ready: OnceCell::new(),
            events,
        }
    }

    // Downloads one image and reports the outcome
    //
    // Never returns an error: failures are part of the outcome.
    pub async fn download(&self, job: &ImageJob) -> DownloadOutcome {
        let filename = derive_filename(&job.url, job.page_index, job.seq_index);
        let local_path = self.output_dir.join(filename);

        match self.try_download(job, &local_path).await {
            Ok(()) => DownloadOutcome {
                url: job.url.clone(),
                local_path,
                success: true,
                error_reason: None,
            },
            Err(e) => {
                log::debug!("Image {} failed: {}", job.url, e);
                DownloadOutcome {
                    url: job.url.clone(),
                    local_path,
                    success: false,
                    error_reason: Some(e.to_string()),
                }
            }
        }
    }

    async fn try_download(&self, job: &ImageJob, local_path: &Path) -> Result<(), DownloadError> {
        let bytes = self.fetcher.fetch_asset(&job.url, &job.page_url).await?;

        self.ensure_output_dir().await?;

        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|source| DownloadError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;

        Ok(())
    }

    // Creates the output directory the first time it is needed
    //
    // If creation fails the cell stays empty, so the next image tries again.
    async fn ensure_output_dir(&self) -> Result<(), DownloadError> {
        self.dir_ready
            .get_or_try_init(|| async {
                if tokio::fs::metadata(&self.output_dir).await.is_err() {
                    tokio::fs::create_dir_all(&self.output_dir)
                        .await
                        .map_err(|source| DownloadError::Io {
                            path: self.output_dir.clone(),
                            source,
                        })?;
                    self.events.emit(HarvestEvent::DirectoryCreated {
                        path: self.output_dir.clone(),
                    });
                }
                Ok::<(), DownloadError>(())
            })
            .await?;
        Ok(())
    }
}
