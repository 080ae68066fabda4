//! Phase 1: rasterize, crop, read and match every page of a document.
//!
//! Pages are queued up front and drained by a fixed pool of workers. Results
//! arrive in completion order and are sorted once, after the last worker has
//! finished.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use image::DynamicImage;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::safe_file_component;
use super::types::{PageExtraction, ResultSet};
use crate::config::{DEFAULT_DPI, default_workers};
use crate::document::{CropArea, Rasterizer, crop_region, encode_png};
use crate::error::{DocumentError, PipelineError};
use crate::matching::{FuzzyMatcher, Registry};
use crate::oracle::{NameExtraction, NameExtractor};

/// Tunables for one coordinator.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub dpi: u32,
    /// Upper bound on pages processed at once.
    pub workers: usize,
    /// When set, every cropped region is also written here as a PNG.
    pub debug_crops_dir: Option<PathBuf>,
    /// Prefix for debug crop file names.
    pub company_id: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            workers: default_workers(),
            debug_crops_dir: None,
            company_id: "main".to_string(),
        }
    }
}

pub struct ExtractionCoordinator {
    rasterizer: Arc<dyn Rasterizer>,
    extractor: Arc<NameExtractor>,
    matcher: FuzzyMatcher,
    settings: ExtractionSettings,
}

/// Everything a worker needs to turn one page image into a [`PageExtraction`].
struct PageJob {
    extractor: Arc<NameExtractor>,
    matcher: FuzzyMatcher,
    registry: Registry,
    crop: CropArea,
    debug_crops: Option<DebugCrops>,
}

#[derive(Clone)]
struct DebugCrops {
    dir: PathBuf,
    company_id: String,
}

type PageQueue = Arc<Mutex<VecDeque<(u32, DynamicImage)>>>;

impl ExtractionCoordinator {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        extractor: Arc<NameExtractor>,
        settings: ExtractionSettings,
    ) -> Self {
        Self {
            rasterizer,
            extractor,
            matcher: FuzzyMatcher::default(),
            settings,
        }
    }

    /// Produce one [`PageExtraction`] per page, ordered by page number.
    ///
    /// Only a document that cannot be rasterized fails the call. The batch
    /// runs on its own task, so dropping the returned future does not cancel
    /// pages already queued.
    pub async fn extract(
        &self,
        document: &[u8],
        crop: &CropArea,
        registry: &Registry,
    ) -> Result<ResultSet, PipelineError> {
        let images = self.rasterizer.rasterize(document, self.settings.dpi).await?;
        let page_count = images.len();
        if page_count == 0 {
            info!("Document has no pages");
            return Ok(ResultSet::default());
        }

        let queue: PageQueue = Arc::new(Mutex::new(
            images
                .into_iter()
                .enumerate()
                .map(|(i, image)| (i as u32 + 1, image))
                .collect(),
        ));

        let job = Arc::new(PageJob {
            extractor: Arc::clone(&self.extractor),
            matcher: self.matcher,
            registry: registry.clone(),
            crop: *crop,
            debug_crops: self.settings.debug_crops_dir.clone().map(|dir| DebugCrops {
                dir,
                company_id: self.settings.company_id.clone(),
            }),
        });

        let workers = self.settings.workers.clamp(1, page_count);
        info!(pages = page_count, workers, "Starting page extraction");

        let batch = tokio::spawn(run_batch(queue, job, workers, page_count as u32));
        let pages = batch
            .await
            .map_err(|e| PipelineError::Batch(format!("extraction batch aborted: {e}")))?;

        let results = ResultSet::from_unordered(pages);
        info!(
            pages = results.len(),
            matched = results.matched_count(),
            failed = results.failed_count(),
            "Page extraction complete"
        );
        Ok(results)
    }
}

async fn run_batch(
    queue: PageQueue,
    job: Arc<PageJob>,
    workers: usize,
    page_count: u32,
) -> Vec<PageExtraction> {
    let mut pool = JoinSet::new();
    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let job = Arc::clone(&job);
        pool.spawn(async move {
            let mut done = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some((page, image)) = next else {
                    break;
                };
                debug!(worker, page, "Processing page");
                done.push(job.process_page(page, image).await);
            }
            done
        });
    }

    let mut results = Vec::with_capacity(page_count as usize);
    while let Some(joined) = pool.join_next().await {
        match joined {
            Ok(pages) => results.extend(pages),
            Err(e) => error!(error = %e, "Page worker panicked"),
        }
    }

    // A panicked worker loses the page it was holding.
    let seen: HashSet<u32> = results.iter().map(|p| p.page_number).collect();
    for page in (1..=page_count).filter(|p| !seen.contains(p)) {
        results.push(PageExtraction::failed(page, "page task aborted"));
    }
    results
}

impl PageJob {
    async fn process_page(&self, page: u32, image: DynamicImage) -> PageExtraction {
        let crop = self.crop;
        let debug_crops = self.debug_crops.clone();
        let encoded = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, DocumentError> {
            let region = crop_region(&image, &crop);
            let png = encode_png(&region)?;
            if let Some(debug_crops) = debug_crops {
                debug_crops.save(page, &png);
            }
            Ok(png)
        })
        .await;

        let png = match encoded {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                warn!(page, error = %e, "Failed to prepare page region");
                return PageExtraction::failed(page, e.to_string());
            }
            Err(e) => {
                warn!(page, error = %e, "Crop task failed");
                return PageExtraction::failed(page, format!("crop task failed: {e}"));
            }
        };

        match self.extractor.extract(&png).await {
            NameExtraction::Text(text) => {
                let result = self.matcher.match_text(&text, &self.registry);
                match (result.matched, result.name, result.contact) {
                    (true, Some(name), Some(contact)) => {
                        info!(page, recipient = %name, score = result.score, "Page matched");
                        PageExtraction::matched(page, text, name, contact)
                    }
                    _ => {
                        info!(page, extracted = %text, score = result.score, "No registry match");
                        PageExtraction::unmatched(page, Some(text))
                    }
                }
            }
            NameExtraction::Empty => PageExtraction::unmatched(page, None),
            NameExtraction::Failed(reason) => {
                warn!(page, error = %reason, "Name extraction failed");
                PageExtraction::failed(page, reason)
            }
        }
    }
}

impl DebugCrops {
    /// Best effort: failures are logged and otherwise ignored.
    fn save(&self, page: u32, png: &[u8]) {
        let filename = format!(
            "{}_page{}_{}_ai_crop.png",
            safe_file_component(&self.company_id),
            page,
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(filename);
        let written = std::fs::create_dir_all(&self.dir).and_then(|_| std::fs::write(&path, png));
        match written {
            Ok(()) => debug!(page, path = %path.display(), "Saved debug crop"),
            Err(e) => warn!(page, path = %path.display(), error = %e, "Failed to save debug crop"),
        }
    }
}
