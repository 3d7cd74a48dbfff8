//! Crawl orchestration for sitescribe.
//!
//! This crate ties together the frontier, fetchers, Markdown conversion, and
//! the artifact store into the end-to-end [`crawl`](pipeline::crawl) workflow.

pub mod pipeline;

pub use pipeline::{
    CrawlJob, CrawlSummary, ProgressReporter, SilentProgress, crawl, crawl_with, load_credentials,
};
