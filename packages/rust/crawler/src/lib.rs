//! URL frontier, origin scoping, and page fetchers.
//!
//! This crate provides:
//! - [`scope`] - Same-origin filter and URL canonicalization
//! - [`Frontier`] - Deduplicating breadth-first queue
//! - [`fetcher`] - The page-fetching capability and its two engines
//!   (headless Chromium and static HTTP)

pub mod fetcher;
pub mod frontier;
pub mod scope;

pub use fetcher::{BrowserFetcher, BrowserPage, HttpFetcher, HttpPage, PageFetcher, RenderedPage};
pub use frontier::Frontier;
pub use scope::{classify, normalize};
