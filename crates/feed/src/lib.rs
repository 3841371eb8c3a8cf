//! Feed fetcher: shared by every `vinrecon` command that reads a feed.
//!
//! Blocking reqwest client (no Tokio runtime required). One request per
//! feed, no retries, bounded by a timeout and a body-size cap. Local paths
//! are read from disk through the same contract.

mod client;
mod source;

pub use client::{FeedClient, FetchError, FetchFailure, FetchOptions};
pub use source::FeedSource;
