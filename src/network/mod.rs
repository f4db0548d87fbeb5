//! # Network
//!
//! - `session` - blocking HTTP session, retry policy, header probes
//! - `cache` - persistent cache of optimized assets

pub mod cache;
pub mod session;

// Re-export commonly used items for convenience
pub use cache::{CacheError, CacheMeta, OptimizationCache, RedbCache};
pub use session::{FetchError, HeaderData, RetryPolicy, Session, UNKNOWN_IDENT};

/// Source of asset bytes, as seen by the asset workers.
pub trait AssetFetcher: Send + Sync {
    /// Response headers of a GET, the body is not read.
    fn probe(&self, url: &str, retry: &RetryPolicy) -> Result<HeaderData, FetchError>;

    fn download(&self, url: &str, retry: &RetryPolicy) -> Result<Vec<u8>, FetchError>;
}

impl AssetFetcher for Session {
    fn probe(&self, url: &str, retry: &RetryPolicy) -> Result<HeaderData, FetchError> {
        Session::probe(self, url, retry)
    }

    fn download(&self, url: &str, retry: &RetryPolicy) -> Result<Vec<u8>, FetchError> {
        self.get_bytes_with(url, &[], retry)
    }
}
