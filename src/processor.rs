//! A complete scraper run
//!
//! ```text
//! home page ──> illustration, metadata, UI bundle, stylesheets
//! page tree ──> filter ──> pages (sequential) ──> assets (worker pool) ──> seal
//! ```
//!
//! Everything discovered while rewriting stylesheets and pages lands in one
//! [`UrlRewriter`], whose asset map is drained by the [`AssetProcessor`] once
//! every page is in the archive. Each page is rewritten inside a
//! [`UrlRewriter::transaction`], so a page that ends up skipped leaves no
//! asset behind.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::archive::{ArchiveItem, ArchiveMetadata, ArchiveWriter, DirectoryArchive, IndexHint};
use crate::assets::images::{favicon_ico, thumbnail_png, FAVICON_SIZE, ILLUSTRATION_SIZE};
use crate::assets::AssetProcessor;
use crate::core::{ConfigError, ScraperError, ScraperOptions, NAME, VERSION};
use crate::library::{ContentFilter, MindtouchClient, MindtouchHome, Page};
use crate::network::{FetchError, RedbCache, Session};
use crate::parsers::css::rewrite_css;
use crate::parsers::html::utils::escape_html;
use crate::parsers::html::{HtmlRewriter, RewriteError, PAGE_DOCUMENT_PATH};
use crate::parsers::url_rewriter::{DocumentContext, UrlRewriter, CONTENT_DIR};
use crate::progress::Progress;
use crate::utils::url::Url;
use crate::zimconfig::ZimConfig;

const LOGO_PATH: &str = "content/logo.png";
const UI_TITLE_PLACEHOLDER: &str = "<title>Vite App</title>";

/// Archive directory of the MathJax distribution, as loaded by the UI.
pub const MATHJAX_DIR: &str = "mathjax";
const MATHJAX_ENTRY_POINT: &str = "es5/tex-svg.js";

/// What happened to one selected page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageOutcome {
    Processed,
    /// The site refused the page content (private page)
    Forbidden,
    /// An ancestor was private, the page was not even fetched
    SkippedPrivateParent,
    Unsupported,
}

impl PageOutcome {
    fn hides_children(self) -> bool {
        matches!(self, PageOutcome::Forbidden | PageOutcome::SkippedPrivateParent)
    }
}

/// Runs `process` on every page in order and classifies the result.
///
/// A private first page (the export root) or a run where no page made it
/// is fatal; so is any error other than a refused page, or an unsupported
/// page when `skip_unsupported` is off.
pub fn process_pages<F>(
    pages: &[Page],
    mut process: F,
    skip_unsupported: bool,
) -> Result<Vec<PageOutcome>, ScraperError>
where
    F: FnMut(&Page) -> Result<(), ScraperError>,
{
    let mut hidden: HashSet<&str> = HashSet::new();
    let mut outcomes = Vec::with_capacity(pages.len());

    for (i, page) in pages.iter().enumerate() {
        let outcome = if page.parent.as_deref().is_some_and(|parent| hidden.contains(parent)) {
            debug!("Ignoring page {} (private page child)", page.id);
            PageOutcome::SkippedPrivateParent
        } else {
            match process(page) {
                Ok(()) => PageOutcome::Processed,
                Err(ScraperError::Fetch(err)) if err.is_forbidden() => {
                    if i == 0 {
                        return Err(ScraperError::RootForbidden(page.id.clone()));
                    }
                    debug!("Ignoring page {} (private page)", page.id);
                    PageOutcome::Forbidden
                }
                Err(ScraperError::Rewrite {
                    page_id,
                    source: source @ (RewriteError::UnsupportedTag { .. } | RewriteError::UnsupportedHrefSrc { .. }),
                }) if skip_unsupported => {
                    warn!("Ignoring page {}: {}", page_id, source);
                    PageOutcome::Unsupported
                }
                Err(err) => return Err(err),
            }
        };

        if outcome.hides_children() {
            hidden.insert(page.id.as_str());
        }
        outcomes.push(outcome);
    }

    let private = outcomes.iter().filter(|outcome| outcome.hides_children()).count();
    info!("{} private pages have been ignored", private);

    if !outcomes.contains(&PageOutcome::Processed) {
        return Err(ScraperError::AllPagesExcluded);
    }
    Ok(outcomes)
}

/// Tiny HTML page carrying the search index data of a page and sending
/// readers to the page view of the UI.
pub fn page_redirect_html(title: &str, page_path: &str) -> String {
    format!(
        "<html><head><title>{}</title><meta http-equiv=\"refresh\" content=\"0;URL='../index.html#/{}'\" /></head><body></body></html>",
        escape_html(title),
        page_path
    )
}

/// Archive path of a file inside the UI bundle, `/` separated.
fn bundle_path(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Every entry below `root`, sorted by name.
fn bundle_entries(root: &Path) -> Result<Vec<DirEntry>, ScraperError> {
    let entries = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(io::Error::from)?;
    Ok(entries)
}

/// Adds the MathJax distribution found in `mathjax_dist` under
/// `mathjax/`, returns how many files were stored.
pub fn add_mathjax<W: ArchiveWriter>(
    archive: &mut W,
    mathjax_dist: &Path,
    progress: &Progress,
) -> Result<usize, ScraperError> {
    let entries = bundle_entries(mathjax_dist)?;
    info!("Adding {} MathJax files in {}", entries.len(), mathjax_dist.display());
    if !mathjax_dist.join(MATHJAX_ENTRY_POINT).is_file() {
        warn!(
            "{} has no {}, formulas will not render",
            mathjax_dist.display(),
            MATHJAX_ENTRY_POINT
        );
    }
    progress.add_total(entries.len());

    let mut added = 0;
    for entry in entries {
        progress.increment();
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(path) = bundle_path(mathjax_dist, entry.path()) else {
            continue;
        };
        archive.add_item(ArchiveItem::file(format!("{}/{}", MATHJAX_DIR, path), entry.path()))?;
        added += 1;
    }
    Ok(added)
}

pub struct Processor<'a> {
    options: &'a ScraperOptions,
    session: &'a Session,
}

impl<'a> Processor<'a> {
    pub fn new(options: &'a ScraperOptions, session: &'a Session) -> Processor<'a> {
        Processor { options, session }
    }

    /// ZimConfig with `{name}` and `{period}` substituted.
    pub fn formatted_zim_config(&self) -> Result<ZimConfig, ConfigError> {
        let placeholders = BTreeMap::from([
            ("name", self.options.zim.name.clone()),
            ("period", Utc::now().format("%Y-%m").to_string()),
        ]);
        self.options.zim.format(&placeholders)
    }

    /// Scrapes the whole library into a [`DirectoryArchive`] and returns
    /// where it was written.
    pub fn run(&self) -> Result<PathBuf, ScraperError> {
        info!("Generating archive");
        self.options.validate()?;
        let zim = self.formatted_zim_config()?;

        let destination = self.options.output_folder.join(&zim.file_name);
        if destination.exists() {
            if !self.options.overwrite_existing_zim {
                return Err(ConfigError::OutputExists(destination).into());
            }
            info!("Removing existing {}", destination.display());
            if destination.is_dir() {
                fs::remove_dir_all(&destination)?;
            } else {
                fs::remove_file(&destination)?;
            }
        }
        fs::create_dir_all(&self.options.output_folder)?;
        fs::create_dir_all(&self.options.tmp_folder)?;

        info!("  Writing to: {}", destination.display());
        let archive = DirectoryArchive::create(&self.options.output_folder, &zim.file_name, PAGE_DOCUMENT_PATH)?;
        self.build(&zim, archive)
    }

    /// Fills `archive` and seals it.
    pub fn build<W: ArchiveWriter>(&self, zim: &ZimConfig, mut archive: W) -> Result<PathBuf, ScraperError> {
        let options = self.options;
        let progress = Progress::new(options.stats_filename.clone(), options.stats_interval);
        progress.report();

        let library_url = Url::parse(&options.library_url)
            .map_err(|err| ConfigError::InvalidValue(format!("invalid library URL: {}", err)))?;
        let client = MindtouchClient::new(library_url.clone(), self.session, options.tmp_folder.join("cache"));

        info!("  Fetching and storing home page...");
        let home = client.get_home()?;

        info!("  Fetching archive illustration...");
        let illustration = self.fetch_illustration(&home)?;

        debug!("Configuring metadata");
        archive.configure_metadata(ArchiveMetadata {
            name: zim.name.clone(),
            title: zim.title.clone(),
            publisher: zim.publisher.clone(),
            date: Utc::now().format("%Y-%m-%d").to_string(),
            creator: zim.creator.clone(),
            description: zim.description.clone(),
            long_description: zim.long_description.clone(),
            language: options.language.clone(),
            tags: zim.tags_list(),
            scraper: format!("{} v{}", NAME, VERSION),
            illustration: illustration.clone(),
        })?;

        archive.add_item(
            ArchiveItem::bytes("favicon.ico", favicon_ico(&illustration, FAVICON_SIZE)?)
                .with_mimetype("image/vnd.microsoft.icon"),
        )?;

        info!("  Storing configuration...");
        let config = json!({ "secondaryColor": zim.secondary_color });
        archive.add_item(
            ArchiveItem::bytes(format!("{}/config.json", CONTENT_DIR), config.to_string())
                .with_mimetype("application/json"),
        )?;

        self.add_ui_bundle(zim, &mut archive, &progress)?;
        add_mathjax(&mut archive, &options.mathjax_dist, &progress)?;

        let logo = self.session.get_bytes(&home.welcome_image_url)?;
        archive.add_item(ArchiveItem::bytes(LOGO_PATH, logo))?;

        let mut url_rewriter = UrlRewriter::new(&library_url, []);
        let stylesheets = [
            ("screen.css", home.screen_css_url.as_str(), None),
            ("print.css", home.print_css_url.as_str(), None),
            ("inline.css", home.home_url.as_str(), Some(home.inline_css.join("\n"))),
        ];
        for (target, location, content) in stylesheets {
            let css = match content {
                Some(css) => css,
                None => self.session.get_text(location)?,
            };
            let rewritten = process_css(&mut url_rewriter, target, location, &css)?;
            archive.add_item(
                ArchiveItem::bytes(format!("{}/{}", CONTENT_DIR, target), rewritten).with_mimetype("text/css"),
            )?;
        }
        let imported = process_imported_stylesheets(&mut url_rewriter, &mut archive, |url| {
            self.session.get_text(url)
        })?;
        debug!("{} imported stylesheets stored", imported);

        info!("Fetching pages tree");
        let tree = client.get_page_tree()?;
        let selected = ContentFilter::new(&options.filter)?.filter(&tree)?;
        let Some(root) = selected.first() else {
            return Err(ScraperError::NoPageSelected);
        };
        info!(
            "{} pages (out of {}) will be fetched and pushed to the archive",
            selected.len(),
            tree.len()
        );

        let shared = json!({
            "logoPath": LOGO_PATH,
            "rootPagePath": root.path,
            "pages": selected,
        });
        archive.add_item(
            ArchiveItem::bytes(format!("{}/shared.json", CONTENT_DIR), shared.to_string())
                .with_mimetype("application/json"),
        )?;

        info!("Fetching pages content");
        progress.add_total(selected.len());
        url_rewriter.add_existing_pages(&library_url, selected.iter().map(|page| page.path.as_str()));

        process_pages(
            &selected,
            |page| {
                progress.increment();
                url_rewriter.transaction(|url_rewriter| self.process_page(&client, url_rewriter, &mut archive, page))
            },
            options.skip_unsupported_pages,
        )?;

        let items = url_rewriter.into_items_to_download();
        let cache = match &options.optimization_cache {
            Some(path) => match RedbCache::open(path) {
                Ok(cache) => Some(cache),
                Err(err) => {
                    warn!("optimization cache {} unavailable, continuing without: {}", path.display(), err);
                    None
                }
            },
            None => None,
        };
        let mut assets = AssetProcessor::new(options, self.session)?;
        if let Some(cache) = &cache {
            assets = assets.with_cache(cache);
        }

        let archive = Mutex::new(archive);
        let stats = assets.process_all(&items, &archive, &progress)?;
        info!(
            "Assets done: {} stored, {} skipped, {} failed",
            stats.stored, stats.skipped, stats.failed
        );

        let mut archive = archive.into_inner().unwrap_or_else(PoisonError::into_inner);
        let destination = archive.finish()?;
        info!("Archive creation completed, archive is at {}", destination.display());

        progress.finish();
        Ok(destination)
    }

    /// 48x48 PNG from the configured illustration, else from the first home
    /// icon that can be decoded.
    fn fetch_illustration(&self, home: &MindtouchHome) -> Result<Vec<u8>, ScraperError> {
        let candidates = match &self.options.illustration_url {
            Some(url) => vec![url.clone()],
            None => home.icons_urls.clone(),
        };

        for url in candidates {
            debug!("Downloading {} illustration", url);
            let illustration = self
                .session
                .get_bytes(&url)
                .map_err(ScraperError::from)
                .and_then(|data| Ok(thumbnail_png(&data, ILLUSTRATION_SIZE)?));
            match illustration {
                Ok(png) => return Ok(png),
                Err(err) => warn!("Failed to retrieve illustration at {}: {}", url, err),
            }
        }

        Err(ScraperError::NoIllustration)
    }

    fn add_ui_bundle<W: ArchiveWriter>(
        &self,
        zim: &ZimConfig,
        archive: &mut W,
        progress: &Progress,
    ) -> Result<(), ScraperError> {
        let dist = &self.options.zimui_dist;
        let entries = bundle_entries(dist)?;

        info!("Adding {} UI files in {}", entries.len(), dist.display());
        progress.add_total(entries.len());

        for entry in entries {
            progress.increment();
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = bundle_path(dist, entry.path()) else {
                continue;
            };
            debug!("Adding {} to archive", path);

            if path == PAGE_DOCUMENT_PATH {
                let index = fs::read_to_string(entry.path())?.replace(
                    UI_TITLE_PLACEHOLDER,
                    &format!("<title>{}</title>", escape_html(&zim.title)),
                );
                archive.add_item(
                    ArchiveItem::bytes(path, index)
                        .with_mimetype("text/html")
                        .with_title(&zim.title)
                        .front(),
                )?;
            } else {
                archive.add_item(ArchiveItem::file(path, entry.path()))?;
            }
        }

        Ok(())
    }

    fn process_page<W: ArchiveWriter>(
        &self,
        client: &MindtouchClient,
        url_rewriter: &mut UrlRewriter,
        archive: &mut W,
        page: &Page,
    ) -> Result<(), ScraperError> {
        debug!("  Fetching {}", page.id);
        let body = client.get_page_content(page)?;
        let page_url = client.page_url(page)?;

        let rewritten = HtmlRewriter::new(url_rewriter, self.session)
            .rewrite(&body, &page_url)
            .map_err(|source| ScraperError::Rewrite {
                page_id: page.id.clone(),
                source,
            })?;

        let content = json!({ "htmlBody": rewritten.html });
        archive.add_item(
            ArchiveItem::bytes(format!("{}/page_content_{}.json", CONTENT_DIR, page.id), content.to_string())
                .with_mimetype("application/json"),
        )?;

        debug!("Adding page_{} to archive index", page.id);
        archive.add_item(
            ArchiveItem::bytes(format!("index/page_{}", page.id), page_redirect_html(&page.title, &page.path))
                .with_mimetype("text/html")
                .with_title(&page.title)
                .with_index(IndexHint {
                    title: page.title.clone(),
                    content: rewritten.text,
                }),
        )?;

        Ok(())
    }
}

/// Rewrites one stylesheet stored at `content/<target>`, registering its
/// assets with `url_rewriter`.
pub fn process_css(
    url_rewriter: &mut UrlRewriter,
    target: &str,
    location: &str,
    css: &str,
) -> Result<String, ScraperError> {
    let css_url = Url::parse(location)
        .map_err(|err| ScraperError::Parsing(format!("invalid stylesheet URL {}: {}", location, err)))?;
    let archive_path = format!("{}/{}", CONTENT_DIR, target);
    let document = DocumentContext::new(&css_url, &archive_path);

    Ok(rewrite_css(url_rewriter, &document, css))
}

/// Stores every stylesheet pulled in by `@import`, rewritten against its
/// own URL, until no import is left. A stylesheet no candidate URL can
/// deliver stays in the download list.
pub fn process_imported_stylesheets<W, F>(
    url_rewriter: &mut UrlRewriter,
    archive: &mut W,
    mut fetch_text: F,
) -> Result<usize, ScraperError>
where
    W: ArchiveWriter,
    F: FnMut(&str) -> Result<String, FetchError>,
{
    let mut stored = 0;
    loop {
        let pending = url_rewriter.take_pending_imports();
        if pending.is_empty() {
            return Ok(stored);
        }

        for (path, details) in pending {
            let fetched = details.urls.iter().find_map(|url| match fetch_text(url.as_str()) {
                Ok(css) => Some((url, css)),
                Err(err) => {
                    debug!("Imported stylesheet {} unavailable: {}", url, err);
                    None
                }
            });
            let Some((url, css)) = fetched else {
                warn!("Failed to fetch imported stylesheet {}", path);
                continue;
            };

            let rewritten = process_css(url_rewriter, path.as_str(), url.as_str(), &css)?;
            archive.add_item(
                ArchiveItem::bytes(format!("{}/{}", CONTENT_DIR, path), rewritten).with_mimetype("text/css"),
            )?;
            url_rewriter.mark_stored(&path);
            stored += 1;
        }
    }
}
