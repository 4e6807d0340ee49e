//! Counting HTML tag attributes pulled out of web-crawl archives.
//!
//! The archive parser itself lives outside this crate; what arrives here is a flat
//! table of `(tag, attribute, value, original)` rows. On top of it we run a tiny
//! in-process map/reduce to answer "which script files are used most" and
//! "which meta keywords are used most".

pub mod mr;

pub use mr::error::LoadError;
pub use mr::loader::{Loader, MemoryLoader, RowFileLoader};
pub use mr::pipeline::{
    count, top_js_libraries, top_js_libraries_with, top_keywords, top_keywords_with, Pipeline, Report,
};
pub use mr::table::{AggregatedCount, TagAttributeRow, Table};
pub use mr::worker::ExecConfig;
