//! HTML parsing and rewriting
//!
//! - `dom`: parsing and basic DOM operations
//! - `parser`: `srcset` parsing
//! - `rewriter`: page body rewriting
//! - `serializer`: fragment serialization
//! - `video`: third-party video embeds
//! - `utils`: shared constants and helpers

pub mod dom;
pub mod parser;
pub mod rewriter;
pub mod serializer;
pub mod utils;
pub mod video;

pub use dom::{
    extract_text, find_nodes, fragment_root, fragment_to_dom, get_child_node_by_name,
    get_node_attr, get_node_name, has_class, html_to_dom, set_node_attr,
};
pub use parser::{best_srcset_candidate, parse_srcset, SrcSetItem};
pub use rewriter::{rewrite_page, HtmlRewriter, RewriteError, RewrittenPage, PAGE_DOCUMENT_PATH};
pub use serializer::serialize_children;
pub use utils::{escape_html, is_favicon, FAVICON_VALUES, WHITESPACES};
pub use video::{ThumbnailResolver, VideoEmbed};
