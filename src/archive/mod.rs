//! # Archive
//!
//! The output container. Everything the run produces goes through the
//! [`ArchiveWriter`] trait; [`DirectoryArchive`] is the writer shipped with
//! the binary.

pub mod directory;

use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub use directory::DirectoryArchive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("item {0} was already added")]
    DuplicatePath(String),

    #[error("item path '{0}' is invalid or reserved")]
    InvalidPath(String),

    #[error("main page {0} is missing, refusing to seal the archive")]
    MissingMainPage(String),

    #[error("archive is already sealed")]
    Sealed,

    #[error("failed to serialize archive records: {0}")]
    Records(#[from] serde_json::Error),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> ArchiveError {
        let path = path.into();
        move |source| ArchiveError::Io { path, source }
    }
}

/// Archive-level metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArchiveMetadata {
    pub name: String,
    pub title: String,
    pub publisher: String,
    pub date: String,
    pub creator: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    pub language: String,
    pub tags: Vec<String>,
    pub scraper: String,
    /// 48x48 PNG
    #[serde(skip)]
    pub illustration: Vec<u8>,
}

/// Title and text fed to the full-text index for an item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IndexHint {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemContent {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveItem {
    pub path: String,
    pub content: ItemContent,
    /// Detected from the content when not given
    pub mimetype: Option<String>,
    pub title: Option<String>,
    pub is_front: bool,
    pub index: Option<IndexHint>,
}

impl ArchiveItem {
    pub fn bytes(path: impl Into<String>, data: impl Into<Vec<u8>>) -> ArchiveItem {
        ArchiveItem::new(path.into(), ItemContent::Bytes(data.into()))
    }

    pub fn file(path: impl Into<String>, file: impl Into<PathBuf>) -> ArchiveItem {
        ArchiveItem::new(path.into(), ItemContent::File(file.into()))
    }

    fn new(path: String, content: ItemContent) -> ArchiveItem {
        ArchiveItem {
            path,
            content,
            mimetype: None,
            title: None,
            is_front: false,
            index: None,
        }
    }

    pub fn with_mimetype(mut self, mimetype: &str) -> ArchiveItem {
        self.mimetype = Some(mimetype.to_string());
        self
    }

    pub fn with_title(mut self, title: &str) -> ArchiveItem {
        self.title = Some(title.to_string());
        self
    }

    pub fn front(mut self) -> ArchiveItem {
        self.is_front = true;
        self
    }

    pub fn with_index(mut self, index: IndexHint) -> ArchiveItem {
        self.index = Some(index);
        self
    }
}

pub trait ArchiveWriter: Send {
    fn configure_metadata(&mut self, metadata: ArchiveMetadata) -> Result<(), ArchiveError>;

    fn add_item(&mut self, item: ArchiveItem) -> Result<(), ArchiveError>;

    /// Seals the archive and returns where it was written.
    fn finish(&mut self) -> Result<PathBuf, ArchiveError>;
}
