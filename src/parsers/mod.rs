//! # Parsers
//!
//! Everything that reads a fetched document and rewrites the references it
//! holds so they resolve inside the archive:
//!
//! - `url_rewriter` - archive path assignment and reference rewriting
//! - `html` - page body parsing and rewriting
//! - `css` - stylesheet rewriting

pub mod css;
pub mod html;
pub mod url_rewriter;

// Re-export commonly used items for convenience
pub use css::rewrite_css;
pub use html::{rewrite_page, HtmlRewriter, RewriteError, RewrittenPage};
pub use url_rewriter::{
    AssetDetails, AssetLayout, DocumentContext, RewriteResult, UrlRewriter, CONTENT_DIR,
    CSS_ASSETS_DIR,
};
