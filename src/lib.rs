//! Tabular transform modules for digitised newspaper corpora.
//!
//! - [`modules::MetadataExtractor`]: publication reference and date from file names
//! - [`modules::TextStatsAugmenter`]: character and word counts
//! - [`modules::BigramPhraser`]: corpus-wide phrase detection and merging
//! - [`modules::TimeSeriesAggregator`]: counts per category and period
//!
//! Every module is a pure function of its configuration and input.

pub mod error;
pub mod inference;
pub mod modules;
pub mod output;
pub mod readers;
pub mod table;
pub mod types;

pub use error::Error;
pub use modules::Module;
pub use table::Table;
pub use types::{Result, Value};
