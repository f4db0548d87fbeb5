//! Asset download and optimization
//!
//! Every archive path collected by the URL rewriter is processed by a fixed
//! size worker pool. Each path either ends up in the archive exactly once or
//! is accounted for as skipped (known-bad source) or failed. Too many
//! failures abort the run.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use regex::Regex;
use tracing::{debug, info, warn};

use super::images::{is_optimizable, smaller_of, transcode_to_webp, MAX_IMAGE_SIZE, WEBP_CODEC_VERSION};
use super::AssetError;
use crate::archive::{ArchiveItem, ArchiveWriter};
use crate::core::{ConfigError, ScraperOptions};
use crate::network::{AssetFetcher, CacheMeta, FetchError, HeaderData, OptimizationCache, RetryPolicy};
use crate::parsers::url_rewriter::{AssetDetails, CONTENT_DIR};
use crate::progress::Progress;
use crate::utils::url::{HttpUrl, ZimPath};

/// The asset a worker is busy with, carried along for diagnostics.
#[derive(Debug)]
pub struct AssetTask<'a> {
    pub path: &'a ZimPath,
    pub urls: &'a [HttpUrl],
    /// Candidate URLs tried so far
    pub attempt: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum AssetOutcome {
    Fetched(Vec<u8>),
    /// Only known-bad candidates, and none answered
    Skipped,
    Failed(FetchError),
}

pub struct AssetProcessor<'a> {
    fetcher: &'a dyn AssetFetcher,
    cache: Option<&'a dyn OptimizationCache>,
    known_bad: Regex,
    retry: RetryPolicy,
    resize_images: bool,
    workers: usize,
    threshold: usize,
    failures: Mutex<usize>,
}

impl<'a> AssetProcessor<'a> {
    pub fn new(
        options: &ScraperOptions,
        fetcher: &'a dyn AssetFetcher,
    ) -> Result<AssetProcessor<'a>, ConfigError> {
        Ok(AssetProcessor {
            fetcher,
            cache: None,
            known_bad: options.known_bad_assets_regex()?,
            retry: RetryPolicy::default(),
            resize_images: options.resize_images,
            workers: options.assets_workers.max(1),
            threshold: options.bad_assets_threshold,
            failures: Mutex::new(0),
        })
    }

    pub fn with_cache(mut self, cache: &'a dyn OptimizationCache) -> AssetProcessor<'a> {
        self.cache = Some(cache);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> AssetProcessor<'a> {
        self.retry = retry;
        self
    }

    /// Failures counted so far.
    pub fn failures(&self) -> usize {
        *self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Downloads every asset and appends it to `archive` under `content/`.
    ///
    /// Fetching runs on the worker pool; appends are serialized by the
    /// archive lock.
    pub fn process_all<W: ArchiveWriter>(
        &self,
        items: &BTreeMap<ZimPath, AssetDetails>,
        archive: &Mutex<W>,
        progress: &Progress,
    ) -> Result<AssetStats, AssetError> {
        info!("Retrieving {} assets with {} workers", items.len(), self.workers);
        progress.add_total(items.len());

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|err| AssetError::Pool(err.to_string()))?;

        let stored = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);

        pool.install(|| {
            items.par_iter().try_for_each(|(path, details)| -> Result<(), AssetError> {
                let mut task = AssetTask {
                    path,
                    urls: &details.urls,
                    attempt: 0,
                };

                match self.fetch_asset(&mut task, details) {
                    AssetOutcome::Fetched(data) => {
                        debug!(path = %task.path, attempt = task.attempt, "adding asset");
                        let item = ArchiveItem::bytes(format!("{}/{}", CONTENT_DIR, path), data);
                        archive
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .add_item(item)?;
                        stored.fetch_add(1, Ordering::SeqCst);
                    }
                    AssetOutcome::Skipped => {
                        debug!(path = %task.path, "ignoring known bad asset");
                        skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    AssetOutcome::Failed(err) => {
                        failed.fetch_add(1, Ordering::SeqCst);
                        self.record_failure(&task, &err)?;
                    }
                }

                progress.increment();
                Ok(())
            })
        })?;

        let stats = AssetStats {
            stored: stored.into_inner(),
            skipped: skipped.into_inner(),
            failed: failed.into_inner(),
        };
        info!(
            "{} assets stored, {} known bad skipped, {} failed",
            stats.stored, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    /// Counts a failure; the check against the threshold happens under the
    /// same lock as the increment.
    fn record_failure(&self, task: &AssetTask, err: &FetchError) -> Result<(), AssetError> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        *failures += 1;

        warn!(
            path = %task.path,
            candidates = task.urls.len(),
            "failed to retrieve asset: {}",
            err
        );

        if *failures > self.threshold {
            return Err(AssetError::TooManyBadAssets {
                count: *failures,
                threshold: self.threshold,
            });
        }
        Ok(())
    }

    fn fetch_asset(&self, task: &mut AssetTask, details: &AssetDetails) -> AssetOutcome {
        let mut last_error = None;
        let mut only_known_bad = true;

        for url in task.urls {
            task.attempt += 1;
            let known_bad = self.known_bad.is_match(url.as_str());
            let retry = if known_bad {
                RetryPolicy::none()
            } else {
                self.retry.clone()
            };

            match self.get_asset_content(task, url, details.always_fetch_online, &retry) {
                Ok(data) => return AssetOutcome::Fetched(data),
                Err(err) => {
                    debug!(path = %task.path, url = %url, attempt = task.attempt, "candidate failed: {}", err);
                    only_known_bad &= known_bad;
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) if !only_known_bad => AssetOutcome::Failed(err),
            _ => AssetOutcome::Skipped,
        }
    }

    /// Bytes to store for one candidate URL: optimized when it is a
    /// supported image, original otherwise.
    pub fn get_asset_content(
        &self,
        task: &AssetTask,
        url: &HttpUrl,
        always_fetch_online: bool,
        retry: &RetryPolicy,
    ) -> Result<Vec<u8>, FetchError> {
        if !always_fetch_online {
            let header = self.fetcher.probe(url.as_str(), retry)?;
            match header.content_type.as_deref() {
                Some(media_type) if is_optimizable(media_type) => {
                    return self.get_image_content(task, url, &header, retry);
                }
                Some(media_type) => debug!("not optimizing, unsupported mime type: {}", media_type),
                None => debug!("not optimizing, no mime type for {}", url),
            }
        }

        self.fetcher.download(url.as_str(), retry)
    }

    fn get_image_content(
        &self,
        task: &AssetTask,
        url: &HttpUrl,
        header: &HeaderData,
        retry: &RetryPolicy,
    ) -> Result<Vec<u8>, FetchError> {
        let key = format!("medium/{}", task.path);
        let meta = CacheMeta {
            ident: header.ident.clone(),
            version: WEBP_CODEC_VERSION.to_string(),
        };

        if let Some(cache) = self.cache {
            match cache.get(&key, &meta) {
                Ok(Some(data)) => {
                    debug!(path = %task.path, "fetched from optimization cache");
                    return Ok(data);
                }
                Ok(None) => {}
                Err(err) => warn!("optimization cache lookup of {} failed: {}", key, err),
            }
        }

        let original = self.fetcher.download(url.as_str(), retry)?;
        let max_size = self.resize_images.then_some(MAX_IMAGE_SIZE);
        let optimized = match transcode_to_webp(&original, max_size) {
            Ok(optimized) => optimized,
            Err(err) => {
                debug!(path = %task.path, "keeping original bytes, optimization failed: {}", err);
                return Ok(original);
            }
        };
        let original_len = original.len();
        let optimized = smaller_of(original, optimized);
        if optimized.len() == original_len {
            debug!(path = %task.path, "keeping original bytes, WebP is not smaller");
        }

        if let Some(cache) = self.cache {
            if let Err(err) = cache.put(&key, &meta, &optimized) {
                warn!("optimization cache upload of {} failed: {}", key, err);
            }
        }

        Ok(optimized)
    }
}
