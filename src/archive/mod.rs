//! Archive handling
//!
//! This module contains:
//! - Archive keys used for done-sets and output directories
//! - The line-stepped WARC record parser
//! - The streaming gzip reader that feeds it

mod key;
mod parser;
mod reader;

pub use key::ArchiveKey;
pub use parser::{Record, RecordParser};
pub use reader::{ArchiveError, ArchiveReader, ReaderStats};
