use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
pub use url::Url;

/// Characters escaped when an archive path is written back into a document.
const ARCHIVE_PATH_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Absolute http(s) URL of a resource on the live site.
///
/// The fragment is never part of an `HttpUrl`; the query string is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HttpUrl(String);

impl HttpUrl {
    /// Builds an `HttpUrl` from a parsed URL, dropping its fragment.
    /// Returns `None` for anything that is not http or https.
    pub fn from_url(url: &Url) -> Option<HttpUrl> {
        if !is_http(url) {
            return None;
        }

        Some(HttpUrl(clean_url(url.clone()).to_string()))
    }

    pub fn parse(value: &str) -> Option<HttpUrl> {
        Url::parse(value.trim())
            .ok()
            .and_then(|url| HttpUrl::from_url(&url))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.0)
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of an entry inside the produced archive, relative to its root and
/// stored unescaped.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZimPath(String);

impl ZimPath {
    pub fn new(value: impl Into<String>) -> ZimPath {
        ZimPath(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form, suitable for an `src`, `href` or `url(...)`.
    pub fn encoded(&self) -> String {
        encode_archive_path(&self.0)
    }
}

impl fmt::Display for ZimPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Removes the fragment of a URL.
pub fn clean_url(url: Url) -> Url {
    let mut url = url;
    url.set_fragment(None);
    url
}

pub fn is_http(url: &Url) -> bool {
    url.scheme() == "http" || url.scheme() == "https"
}

pub fn is_url_and_has_protocol(input: &str) -> bool {
    match Url::parse(input) {
        Ok(parsed_url) => !parsed_url.scheme().is_empty(),
        Err(_) => false,
    }
}

/// Resolves `to` against `from`, whatever form `to` takes (absolute,
/// protocol-relative, root-relative or relative).
pub fn resolve_url(from: &Url, to: &str) -> Result<Url, url::ParseError> {
    from.join(to.trim())
}

/// Scheme-less identity of a URL used as a map key: lowercased host, port
/// when not the default one, and path. Query and fragment are ignored.
pub fn normalize_url_key(url: &Url) -> String {
    let mut key = url.host_str().unwrap_or_default().to_lowercase();

    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }

    key.push_str(url.path());
    key
}

/// Decoded, non-empty path segments of a URL, without `.` and `..`.
pub fn decoded_path_segments(url: &Url) -> Vec<String> {
    url.path()
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().to_string())
        .collect()
}

pub fn encode_archive_path(path: &str) -> String {
    utf8_percent_encode(path, ARCHIVE_PATH_ENCODE_SET).to_string()
}

/// Splits a file name into stem and extension (extension keeps its dot).
/// Dotfiles have no extension.
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(index) if index > 0 => file_name.split_at(index),
        _ => (file_name, ""),
    }
}

/// Reference to `target` as seen from the document stored at
/// `document_path`, both being archive paths.
pub fn relative_reference(document_path: &str, target: &str) -> String {
    let mut document_dirs: Vec<&str> = document_path.split('/').collect();
    document_dirs.pop();
    let target_parts: Vec<&str> = target.split('/').collect();
    let target_dirs = &target_parts[..target_parts.len() - 1];

    let common = document_dirs
        .iter()
        .zip(target_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut reference = "../".repeat(document_dirs.len() - common);
    reference.push_str(&target_parts[common..].join("/"));
    reference
}
