//! `FastSearch` - Concurrent, cancellable file search by name or content.

#![deny(missing_debug_implementations, missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
pub mod crawler;
pub mod error;
pub mod exclude;
pub mod filter;
pub mod query;
pub mod roots;
pub mod search;
pub mod text;
pub mod types;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use filter::SizeDateFilter;
pub use search::{CancelToken, FnSink, ResultSink, SearchEngine, SearchEvent, SearchRequest};
pub use types::{FileRecord, SearchMode, SearchOutcome, SearchSummary};
