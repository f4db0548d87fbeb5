//! # Utilities
//!
//! - `url` - URL resolution, normalization and the `HttpUrl` / `ZimPath` newtypes

pub mod url;

// Re-export commonly used items for convenience
pub use self::url::{
    clean_url, decoded_path_segments, encode_archive_path, is_http, is_url_and_has_protocol,
    normalize_url_key, relative_reference, resolve_url, split_extension, HttpUrl, Url, ZimPath,
};
