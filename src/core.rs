use std::path::PathBuf;
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::assets::AssetError;
use crate::library::{ContentFilterOptions, TreeError};
use crate::network::FetchError;
use crate::parsers::html::RewriteError;
use crate::zimconfig::ZimConfig;

pub const NAME: &str = "mindtouch2zim";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// All libraries seen so far are in English.
pub const LANGUAGE_ISO_639_3: &str = "eng";

/// Well-known dead asset hosts: local development servers and the MindTouch
/// static CDN paths that are only reachable from a browser session.
pub const STANDARD_KNOWN_BAD_ASSETS_REGEX: &str =
    r"^https?://localhost(?::\d+)?/|^https?://[\w.-]*\.mtstatic\.com/@(?:cache|style)";

const FILE_SIGNATURES: [[&[u8]; 2]; 13] = [
    // Image
    [b"GIF87a", b"image/gif"],
    [b"GIF89a", b"image/gif"],
    [b"\xFF\xD8\xFF", b"image/jpeg"],
    [b"\x89PNG\x0D\x0A\x1A\x0A", b"image/png"],
    [b"<svg ", b"image/svg+xml"],
    [b"RIFF....WEBPVP8", b"image/webp"],
    [b"\x00\x00\x01\x00", b"image/vnd.microsoft.icon"],
    [b"BM", b"image/bmp"],
    // Fonts
    [b"wOFF", b"font/woff"],
    [b"wOF2", b"font/woff2"],
    // Audio and video
    [b"OggS", b"audio/ogg"],
    [b"....ftyp", b"video/mp4"],
    [b"\x1A\x45\xDF\xA3", b"video/webm"],
];

/// Errors raised before any network activity: bad options, bad templates,
/// bad regular expressions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid regular expression for {option}: {source}")]
    InvalidRegex {
        option: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid placeholder {placeholder} in '{template}', valid placeholders are: {valid}")]
    InvalidPlaceholder {
        placeholder: String,
        template: String,
        valid: String,
    },

    #[error("{field} is too long ({length} characters, at most {limit} allowed)")]
    FieldTooLong {
        field: &'static str,
        length: usize,
        limit: usize,
    },

    #[error("long description ({long_description} characters) must be longer than description ({description} characters)")]
    LongDescriptionTooShort {
        description: usize,
        long_description: usize,
    },

    #[error("{0}")]
    InvalidValue(String),

    #[error("output {0} already exists, use --overwrite to replace it")]
    OutputExists(PathBuf),
}

/// Coarse classification of fatal errors, used for exit codes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Content,
    Network,
    Capacity,
    Internal,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error("page {page_id} could not be rewritten: {source}")]
    Rewrite {
        page_id: String,
        #[source]
        source: RewriteError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("unexpected site response: {0}")]
    Parsing(String),

    #[error("root page {0} is private, nothing can be exported")]
    RootForbidden(String),

    #[error("no page matches the content filter")]
    NoPageSelected,

    #[error("every selected page was excluded (private or unsupported)")]
    AllPagesExcluded,

    #[error("no suitable illustration found")]
    NoIllustration,

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScraperError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScraperError::Config(_) => ErrorCategory::Configuration,
            ScraperError::Tree(_)
            | ScraperError::Rewrite { .. }
            | ScraperError::Parsing(_)
            | ScraperError::RootForbidden(_)
            | ScraperError::NoPageSelected
            | ScraperError::AllPagesExcluded
            | ScraperError::NoIllustration => ErrorCategory::Content,
            ScraperError::Fetch(_) => ErrorCategory::Network,
            ScraperError::Asset(AssetError::TooManyBadAssets { .. }) => ErrorCategory::Capacity,
            ScraperError::Asset(_)
            | ScraperError::Archive(_)
            | ScraperError::Image(_)
            | ScraperError::Io(_)
            | ScraperError::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Process exit code for this error, never 0.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Content => 3,
            ErrorCategory::Network => 4,
            ErrorCategory::Capacity => 5,
            ErrorCategory::Internal => 1,
        }
    }
}

/// Configuration of one scraper run
///
/// Built once (from the CLI, environment and defaults) and handed by
/// reference to every component that needs a piece of it.
#[derive(Clone, Debug)]
pub struct ScraperOptions {
    pub library_url: String,
    pub contact_info: String,
    pub output_folder: PathBuf,
    pub tmp_folder: PathBuf,
    pub zimui_dist: PathBuf,
    pub mathjax_dist: PathBuf,
    pub stats_filename: Option<PathBuf>,
    pub overwrite_existing_zim: bool,
    pub illustration_url: Option<String>,
    pub assets_workers: usize,
    pub bad_assets_threshold: usize,
    pub bad_assets_regex: Option<String>,
    pub optimization_cache: Option<PathBuf>,
    pub resize_images: bool,
    pub skip_unsupported_pages: bool,
    pub http_timeout: Duration,
    pub http_timeout_long: Duration,
    pub stats_interval: Duration,
    pub language: String,
    pub zim: ZimConfig,
    pub filter: ContentFilterOptions,
}

impl Default for ScraperOptions {
    fn default() -> Self {
        Self {
            library_url: String::new(),
            contact_info: "https://www.kiwix.org".to_string(),
            output_folder: PathBuf::from("/output"),
            tmp_folder: PathBuf::from("/output/tmp"),
            zimui_dist: PathBuf::from("../zimui/dist"),
            mathjax_dist: PathBuf::from("../mathjax"),
            stats_filename: None,
            overwrite_existing_zim: false,
            illustration_url: None,
            assets_workers: 10,
            bad_assets_threshold: 10,
            bad_assets_regex: None,
            optimization_cache: None,
            resize_images: true,
            skip_unsupported_pages: false,
            http_timeout: Duration::from_secs(15),
            http_timeout_long: Duration::from_secs(30),
            stats_interval: Duration::from_secs(10),
            language: LANGUAGE_ISO_639_3.to_string(),
            zim: ZimConfig::default(),
            filter: ContentFilterOptions::default(),
        }
    }
}

impl ScraperOptions {
    pub fn user_agent(&self) -> String {
        format!("{}/{} ({})", NAME, VERSION, self.contact_info)
    }

    /// Case-insensitive union of the user supplied pattern and the built-in
    /// known-bad asset hosts.
    pub fn known_bad_assets_regex(&self) -> Result<Regex, ConfigError> {
        let pattern = match &self.bad_assets_regex {
            Some(user) if !user.is_empty() => {
                format!("{}|{}", user, STANDARD_KNOWN_BAD_ASSETS_REGEX)
            }
            _ => STANDARD_KNOWN_BAD_ASSETS_REGEX.to_string(),
        };

        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::InvalidRegex {
                option: "bad assets regex",
                source,
            })
    }

    /// Checks everything that can be checked without touching the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.library_url.is_empty() {
            return Err(ConfigError::InvalidValue(
                "library URL is required".to_string(),
            ));
        }
        if url::Url::parse(&self.library_url).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "library URL '{}' is not a valid URL",
                self.library_url
            )));
        }
        if self.assets_workers == 0 {
            return Err(ConfigError::InvalidValue(
                "at least one asset worker is needed".to_string(),
            ));
        }

        self.known_bad_assets_regex()?;
        crate::library::ContentFilter::new(&self.filter)?;
        self.zim.validate()?;

        Ok(())
    }
}

/// Guesses the media type of some content, first by magic bytes, then by
/// file name.
pub fn detect_media_type(data: &[u8], file_name: &str) -> String {
    for signature in &FILE_SIGNATURES {
        if signature_matches(data, signature[0]) {
            return String::from_utf8_lossy(signature[1]).to_string();
        }
    }

    detect_media_type_by_file_name(file_name)
}

// '.' in a signature matches any byte.
fn signature_matches(data: &[u8], signature: &[u8]) -> bool {
    data.len() >= signature.len()
        && signature
            .iter()
            .zip(data.iter())
            .all(|(expected, actual)| *expected == b'.' || expected == actual)
}

pub fn detect_media_type_by_file_name(filename: &str) -> String {
    let filename_lowercased = filename.to_lowercase();
    let extension = filename_lowercased
        .rsplit_once('.')
        .map(|(_, extension)| extension)
        .unwrap_or_default();

    match extension {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/vnd.microsoft.icon",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "txt" => "text/plain",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Splits a `Content-Type` header value into its media type and charset.
pub fn parse_content_type(content_type: &str) -> (String, String) {
    let mut media_type = String::new();
    let mut charset = String::new();

    let parts: Vec<&str> = content_type.split(';').collect();

    if !parts.is_empty() {
        media_type = parts[0].trim().to_lowercase();
    }

    for part in parts.iter().skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("charset=") {
            charset = value.trim_matches('"').to_string();
        }
    }

    (media_type, charset)
}
