//! # mindtouch2zim
//!
//! Turns a MindTouch library into an offline archive: page bodies as JSON
//! for the bundled reader UI, with every stylesheet, image and video poster
//! stored next to them.
//!
//! ## Modules
//!
//! - `core` - options, the crate error type, media type detection
//! - `library` - MindTouch API client, page tree and content filter
//! - `parsers` - URL, HTML and CSS rewriting
//! - `assets` - asset worker pool and image codec
//! - `archive` - the output container
//! - `network` - HTTP session and optimization cache
//! - `processor` - a complete run
//! - `utils` - URL helpers and newtypes

pub mod archive;
pub mod assets;
pub mod core;
pub mod env;
pub mod library;
pub mod network;
pub mod parsers;
pub mod processor;
pub mod progress;
pub mod utils;
pub mod zimconfig;

// Re-export commonly used items for convenience
pub use crate::core::*;
pub use processor::{process_pages, PageOutcome, Processor};
pub use zimconfig::ZimConfig;
