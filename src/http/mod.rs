//! HTTP access for catalog, manifest and archive downloads

mod client;

pub use client::{ChunkSource, HttpClient, HttpError, ResponseBody};
