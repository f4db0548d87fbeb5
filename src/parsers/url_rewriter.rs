//! Translation of URLs found in pages and stylesheets
//!
//! Every asset reference resolved through a [`UrlRewriter`] gets a stable
//! archive path and is recorded, with its candidate source URLs, in the
//! rewriter's download list. Hyperlinks to exported pages become in-archive
//! navigation references, other hyperlinks stay absolute.
//!
//! An archive path is never both a file and a directory: `host/img` and
//! `host/img/a.png` cannot coexist, the later one gets a suffix.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::mem;

use tracing::debug;

use crate::utils::url::{
    decoded_path_segments, encode_archive_path, is_http, normalize_url_key, relative_reference,
    resolve_url, split_extension, HttpUrl, Url, ZimPath,
};

/// Directory of the archive holding every produced content item.
pub const CONTENT_DIR: &str = "content";

/// Directory, inside [`CONTENT_DIR`], of assets referenced by stylesheets.
pub const CSS_ASSETS_DIR: &str = "css_assets";

/// How the archive path of an asset is derived from its URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetLayout {
    /// `<host>/<path>`, for assets referenced by pages
    Mirror,
    /// `css_assets/<path>`, for assets referenced by stylesheets
    Stylesheet,
}

impl AssetLayout {
    fn base_path(&self, url: &Url) -> String {
        let mut parts = match self {
            AssetLayout::Mirror => {
                let key = normalize_url_key(url);
                let host = key.split('/').next().unwrap_or_default().to_string();
                vec![host]
            }
            AssetLayout::Stylesheet => vec![CSS_ASSETS_DIR.to_string()],
        };

        let segments = decoded_path_segments(url);
        if segments.is_empty() {
            parts.push("index".to_string());
        } else {
            parts.extend(segments);
        }

        parts.join("/")
    }

    /// Stylesheet assets skip the optimization and cache path.
    pub fn always_fetch_online(&self) -> bool {
        matches!(self, AssetLayout::Stylesheet)
    }
}

/// What is needed to produce one archive entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetDetails {
    /// Candidate source URLs, tried in order
    pub urls: Vec<HttpUrl>,
    pub always_fetch_online: bool,
}

/// The document a reference was found in.
#[derive(Clone, Copy, Debug)]
pub struct DocumentContext<'a> {
    /// Where relative references are resolved from
    pub url: &'a Url,
    /// Archive path the rewritten document is served from
    pub archive_path: &'a str,
    pub base_href: Option<&'a str>,
}

impl<'a> DocumentContext<'a> {
    pub fn new(url: &'a Url, archive_path: &'a str) -> DocumentContext<'a> {
        DocumentContext {
            url,
            archive_path,
            base_href: None,
        }
    }

    pub fn with_base_href(mut self, base_href: Option<&'a str>) -> DocumentContext<'a> {
        self.base_href = base_href;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteResult {
    /// String to put in the rewritten document
    pub rewritten: String,
    /// Archive path of the asset, when it was registered for download
    pub zim_path: Option<ZimPath>,
    /// Resolved absolute URL, when the reference could be resolved
    pub absolute_url: Option<Url>,
}

impl RewriteResult {
    fn unchanged(item_url: &str, absolute_url: Option<Url>) -> RewriteResult {
        RewriteResult {
            rewritten: item_url.to_string(),
            zim_path: None,
            absolute_url,
        }
    }
}

/// What one [`UrlRewriter::register`] call changed.
#[derive(Debug)]
struct Registration {
    path: ZimPath,
    /// Set when the call assigned the path
    new_key: Option<(AssetLayout, String)>,
    /// The URL was added to the candidates of the path
    new_source: bool,
}

#[derive(Debug, Default)]
pub struct UrlRewriter {
    existing_pages: HashMap<String, String>,
    assigned: HashMap<(AssetLayout, String), ZimPath>,
    used_paths: HashSet<String>,
    /// Directory -> number of used paths below it
    used_dirs: HashMap<String, usize>,
    items: BTreeMap<ZimPath, AssetDetails>,
    journal: Option<Vec<Registration>>,
    imports_seen: HashSet<ZimPath>,
    pending_imports: Vec<ZimPath>,
}

impl UrlRewriter {
    /// `page_paths` are the site-relative paths of every exported page.
    pub fn new<'p>(library_url: &Url, page_paths: impl IntoIterator<Item = &'p str>) -> UrlRewriter {
        let mut rewriter = UrlRewriter::default();
        rewriter.add_existing_pages(library_url, page_paths);
        rewriter
    }

    /// Declares more exported pages; links to them are rewritten to the
    /// in-archive page view.
    pub fn add_existing_pages<'p>(
        &mut self,
        library_url: &Url,
        page_paths: impl IntoIterator<Item = &'p str>,
    ) {
        let library = library_url.as_str().trim_end_matches('/');
        self.existing_pages.extend(page_paths.into_iter().filter_map(|path| {
            Url::parse(&format!("{}/{}", library, path))
                .ok()
                .map(|url| (normalize_url_key(&url), path.to_string()))
        }));
    }

    /// Absolute URL of a reference found in `document`, honoring `<base href>`.
    pub fn resolve(&self, item_url: &str, document: &DocumentContext) -> Option<Url> {
        let base = document
            .base_href
            .and_then(|base_href| resolve_url(document.url, base_href).ok())
            .unwrap_or_else(|| document.url.clone());

        resolve_url(&base, item_url).ok()
    }

    fn is_free(&self, path: &str) -> bool {
        !self.used_paths.contains(path) && !self.used_dirs.contains_key(path)
    }

    fn unique_path(&self, base: &str) -> ZimPath {
        let (directories, file_name) = match base.rsplit_once('/') {
            Some((directories, file_name)) => (Some(directories), file_name),
            None => (None, base),
        };

        // A directory may not be named like an existing file.
        let mut prefix = String::new();
        for segment in directories.into_iter().flat_map(|directories| directories.split('/')) {
            let mut directory = format!("{}{}", prefix, segment);
            let mut n = 1;
            while self.used_paths.contains(&directory) {
                directory = format!("{}{}_{}", prefix, segment, n);
                n += 1;
            }
            prefix = directory + "/";
        }

        let candidate = format!("{}{}", prefix, file_name);
        if self.is_free(&candidate) {
            return ZimPath::new(candidate);
        }

        let (stem, extension) = split_extension(file_name);
        let mut n = 1;
        loop {
            let candidate = format!("{}{}_{}{}", prefix, stem, n, extension);
            if self.is_free(&candidate) {
                return ZimPath::new(candidate);
            }
            n += 1;
        }
    }

    fn parent_dirs(path: &str) -> impl Iterator<Item = &str> {
        path.match_indices('/').map(move |(index, _)| &path[..index])
    }

    fn reserve(&mut self, path: &ZimPath) {
        for directory in Self::parent_dirs(path.as_str()) {
            *self.used_dirs.entry(directory.to_string()).or_default() += 1;
        }
        self.used_paths.insert(path.as_str().to_string());
    }

    fn release(&mut self, path: &ZimPath) {
        for directory in Self::parent_dirs(path.as_str()) {
            if let Some(count) = self.used_dirs.get_mut(directory) {
                *count -= 1;
                if *count == 0 {
                    self.used_dirs.remove(directory);
                }
            }
        }
        self.used_paths.remove(path.as_str());
    }

    /// Archive path of an http(s) URL under `layout`, registering the URL as
    /// a candidate source of that path.
    pub fn register(&mut self, url: &Url, layout: AssetLayout) -> Option<ZimPath> {
        let source = HttpUrl::from_url(url)?;
        let key = (layout, normalize_url_key(url));

        let (path, new_key) = match self.assigned.get(&key) {
            Some(path) => (path.clone(), None),
            None => {
                let path = self.unique_path(&layout.base_path(url));
                self.reserve(&path);
                self.assigned.insert(key.clone(), path.clone());
                (path, Some(key))
            }
        };

        let details = self
            .items
            .entry(path.clone())
            .or_insert_with(|| AssetDetails {
                urls: Vec::new(),
                always_fetch_online: layout.always_fetch_online(),
            });
        let new_source = !details.urls.contains(&source);
        if new_source {
            details.urls.push(source);
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.push(Registration {
                path: path.clone(),
                new_key,
                new_source,
            });
        }

        Some(path)
    }

    /// Runs `rewrite` against this rewriter and keeps the paths and
    /// downloads it registered only when it succeeds.
    pub fn transaction<T, E>(
        &mut self,
        rewrite: impl FnOnce(&mut UrlRewriter) -> Result<T, E>,
    ) -> Result<T, E> {
        let outer = self.journal.replace(Vec::new());
        let result = rewrite(self);
        let journal = mem::replace(&mut self.journal, outer).unwrap_or_default();

        match result {
            Ok(value) => {
                if let Some(outer) = self.journal.as_mut() {
                    outer.extend(journal);
                }
                Ok(value)
            }
            Err(err) => {
                self.undo(journal);
                Err(err)
            }
        }
    }

    fn undo(&mut self, journal: Vec<Registration>) {
        for registration in journal.into_iter().rev() {
            if registration.new_source {
                if let Some(details) = self.items.get_mut(&registration.path) {
                    details.urls.pop();
                    if details.urls.is_empty() {
                        self.items.remove(&registration.path);
                    }
                }
            }
            if let Some(key) = registration.new_key {
                self.assigned.remove(&key);
                self.release(&registration.path);
            }
        }
    }

    /// Rewrites an asset reference (image, font, imported stylesheet...).
    ///
    /// Unparsable references and non-http ones (`data:` URIs) are returned
    /// untouched and nothing is registered.
    pub fn rewrite_asset(
        &mut self,
        item_url: &str,
        document: &DocumentContext,
        layout: AssetLayout,
    ) -> RewriteResult {
        if item_url.trim().is_empty() {
            return RewriteResult::unchanged(item_url, None);
        }

        let Some(absolute) = self.resolve(item_url, document) else {
            debug!("unable to resolve {} in {}", item_url, document.url);
            return RewriteResult::unchanged(item_url, None);
        };
        if !is_http(&absolute) {
            return RewriteResult::unchanged(item_url, Some(absolute));
        }

        let Some(zim_path) = self.register(&absolute, layout) else {
            return RewriteResult::unchanged(item_url, Some(absolute));
        };

        let target = format!("{}/{}", CONTENT_DIR, zim_path.as_str());
        let mut rewritten = encode_archive_path(&relative_reference(document.archive_path, &target));
        if let Some(fragment) = absolute.fragment() {
            rewritten.push('#');
            rewritten.push_str(fragment);
        }

        RewriteResult {
            rewritten,
            zim_path: Some(zim_path),
            absolute_url: Some(absolute),
        }
    }

    /// Rewrites the target of an `@import`. The imported stylesheet is
    /// queued, see [`take_pending_imports`](Self::take_pending_imports).
    pub fn rewrite_import(&mut self, item_url: &str, document: &DocumentContext) -> RewriteResult {
        let result = self.rewrite_asset(item_url, document, AssetLayout::Stylesheet);
        if let Some(path) = &result.zim_path {
            if self.imports_seen.insert(path.clone()) {
                self.pending_imports.push(path.clone());
            }
        }
        result
    }

    /// Imported stylesheets queued since the last call, with their
    /// candidate URLs. Each stylesheet is handed out once.
    pub fn take_pending_imports(&mut self) -> Vec<(ZimPath, AssetDetails)> {
        mem::take(&mut self.pending_imports)
            .into_iter()
            .filter_map(|path| {
                let details = self.items.get(&path)?.clone();
                Some((path, details))
            })
            .collect()
    }

    /// Removes `path` from the download list; its content was stored
    /// by the caller.
    pub fn mark_stored(&mut self, path: &ZimPath) {
        self.items.remove(path);
    }

    /// Rewrites a hyperlink: exported pages become `#/<page path>`, anything
    /// else http(s) becomes absolute. Fragments, `mailto:` and friends are
    /// left alone.
    pub fn rewrite_link(&self, item_url: &str, document: &DocumentContext) -> String {
        let trimmed = item_url.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return item_url.to_string();
        }

        let Some(absolute) = self.resolve(trimmed, document) else {
            return item_url.to_string();
        };
        if !is_http(&absolute) {
            return item_url.to_string();
        }

        match self.existing_pages.get(&normalize_url_key(&absolute)) {
            Some(page_path) => format!("#/{}", encode_archive_path(page_path)),
            None => absolute.to_string(),
        }
    }

    pub fn items_to_download(&self) -> &BTreeMap<ZimPath, AssetDetails> {
        &self.items
    }

    pub fn into_items_to_download(self) -> BTreeMap<ZimPath, AssetDetails> {
        self.items
    }
}
