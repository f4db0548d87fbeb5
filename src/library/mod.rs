//! # Library
//!
//! - `client` - MindTouch home page and `@api/deki` API access
//! - `tree` - the page hierarchy
//! - `filter` - selection of the pages to export

pub mod client;
pub mod filter;
pub mod tree;

pub use client::{parse_home, parse_page_body, parse_page_tree, MindtouchClient, MindtouchHome};
pub use filter::{ContentFilter, ContentFilterOptions};
pub use tree::{Page, PageTree, TreeError};
