//! # Assets
//!
//! - `images` - image codec helpers (WebP transcoding, illustration, favicon)
//! - `processor` - the worker pool downloading and optimizing assets

pub mod images;
pub mod processor;

use thiserror::Error;

use crate::archive::ArchiveError;

pub use processor::{AssetProcessor, AssetStats, AssetTask};

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("too many assets failed to download ({count} failures, threshold is {threshold}), aborting")]
    TooManyBadAssets { count: usize, threshold: usize },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("failed to start asset workers: {0}")]
    Pool(String),
}
