//! Archive staged as a plain directory tree
//!
//! Items are written under `<output>/<name>.tmp/` as they come; sealing
//! writes the bookkeeping files and renames the staging directory to
//! `<output>/<name>/`. A run that fails before sealing leaves no output.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::{ArchiveError, ArchiveItem, ArchiveMetadata, ArchiveWriter, IndexHint, ItemContent};
use crate::core::detect_media_type;

pub const METADATA_FILE: &str = "metadata.json";
pub const INDEX_FILE: &str = "index.json";
pub const ILLUSTRATION_FILE: &str = "Illustration_48x48@1.png";

const RESERVED_PATHS: [&str; 3] = [METADATA_FILE, INDEX_FILE, ILLUSTRATION_FILE];

#[derive(Debug, Serialize)]
struct ItemRecord {
    mimetype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    is_front: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<IndexHint>,
}

#[derive(Debug)]
pub struct DirectoryArchive {
    staging: PathBuf,
    destination: PathBuf,
    main_path: String,
    metadata: Option<ArchiveMetadata>,
    items: BTreeMap<String, ItemRecord>,
    sealed: bool,
}

impl DirectoryArchive {
    /// Starts a new archive `<output_folder>/<name>` whose main page is
    /// `main_path`. A stale staging directory from an aborted run is wiped.
    pub fn create(
        output_folder: &Path,
        name: &str,
        main_path: &str,
    ) -> Result<DirectoryArchive, ArchiveError> {
        let staging = output_folder.join(format!("{}.tmp", name));
        let destination = output_folder.join(name);

        if staging.exists() {
            debug!("removing stale staging directory {}", staging.display());
            fs::remove_dir_all(&staging).map_err(ArchiveError::io(&staging))?;
        }
        fs::create_dir_all(&staging).map_err(ArchiveError::io(&staging))?;

        Ok(DirectoryArchive {
            staging,
            destination,
            main_path: main_path.to_string(),
            metadata: None,
            items: BTreeMap::new(),
            sealed: false,
        })
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn contains(&self, path: &str) -> bool {
        self.items.contains_key(path)
    }

    fn staged_path(&self, path: &str) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain || RESERVED_PATHS.contains(&path) {
            return Err(ArchiveError::InvalidPath(path.to_string()));
        }

        Ok(self.staging.join(relative))
    }

    fn write_json(&self, file_name: &str, value: &impl Serialize) -> Result<(), ArchiveError> {
        let path = self.staging.join(file_name);
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(&path, data).map_err(ArchiveError::io(path))
    }
}

impl ArchiveWriter for DirectoryArchive {
    fn configure_metadata(&mut self, metadata: ArchiveMetadata) -> Result<(), ArchiveError> {
        if self.sealed {
            return Err(ArchiveError::Sealed);
        }
        self.metadata = Some(metadata);
        Ok(())
    }

    fn add_item(&mut self, item: ArchiveItem) -> Result<(), ArchiveError> {
        if self.sealed {
            return Err(ArchiveError::Sealed);
        }
        if self.items.contains_key(&item.path) {
            return Err(ArchiveError::DuplicatePath(item.path));
        }

        let target = self.staged_path(&item.path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::io(parent))?;
        }

        let data = match item.content {
            ItemContent::Bytes(data) => data,
            ItemContent::File(source) => fs::read(&source).map_err(ArchiveError::io(source))?,
        };
        let mimetype = item
            .mimetype
            .unwrap_or_else(|| detect_media_type(&data, &item.path));

        fs::write(&target, &data).map_err(ArchiveError::io(&target))?;
        debug!(path = %item.path, mimetype = %mimetype, "added item");

        self.items.insert(
            item.path,
            ItemRecord {
                mimetype,
                title: item.title,
                is_front: item.is_front,
                index: item.index,
            },
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<PathBuf, ArchiveError> {
        if self.sealed {
            return Err(ArchiveError::Sealed);
        }
        if !self.items.contains_key(&self.main_path) {
            return Err(ArchiveError::MissingMainPage(self.main_path.clone()));
        }

        if let Some(metadata) = &self.metadata {
            self.write_json(METADATA_FILE, metadata)?;
            if !metadata.illustration.is_empty() {
                let path = self.staging.join(ILLUSTRATION_FILE);
                fs::write(&path, &metadata.illustration).map_err(ArchiveError::io(path))?;
            }
        }
        self.write_json(INDEX_FILE, &self.items)?;

        if self.destination.exists() {
            fs::remove_dir_all(&self.destination).map_err(ArchiveError::io(&self.destination))?;
        }
        fs::rename(&self.staging, &self.destination).map_err(ArchiveError::io(&self.destination))?;
        self.sealed = true;

        info!(
            "sealed archive with {} items at {}",
            self.items.len(),
            self.destination.display()
        );
        Ok(self.destination.clone())
    }
}
