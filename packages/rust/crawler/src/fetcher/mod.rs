//! Page fetching capability.
//!
//! A [`PageFetcher`] is a long-lived engine (browser process, HTTP client) that
//! hands out one [`RenderedPage`] per URL. Pages are scoped: the caller must
//! hand every page back through [`PageFetcher::release`] whether or not
//! navigation succeeded, and call [`PageFetcher::shutdown`] exactly once when
//! the crawl ends.

use std::future::Future;

use url::Url;

use sitescribe_shared::{CredentialSet, Result};

pub mod browser;
pub mod http;

pub use browser::{BrowserFetcher, BrowserPage};
pub use http::{HttpFetcher, HttpPage};

/// A single page/context, bound to one URL for its lifetime.
pub trait RenderedPage: Send + Sync {
    /// Load `url`. Fails with [`SiteScribeError::Fetch`](sitescribe_shared::SiteScribeError::Fetch).
    fn navigate(&mut self, url: &Url) -> impl Future<Output = Result<()>> + Send;

    /// Serialized DOM of the loaded page.
    fn html(&self) -> impl Future<Output = Result<String>> + Send;

    /// Absolute `href` of every anchor on the loaded page, in document order.
    fn links(&self) -> impl Future<Output = Result<Vec<String>>> + Send;
}

/// Engine that opens pages with a credential set applied.
pub trait PageFetcher: Send {
    type Page: RenderedPage;

    /// Acquire a fresh page/context with `credentials` installed.
    fn open_page(
        &mut self,
        credentials: &CredentialSet,
    ) -> impl Future<Output = Result<Self::Page>> + Send;

    /// Release a page. Never fails; cleanup problems are only logged.
    fn release(&mut self, page: Self::Page) -> impl Future<Output = ()> + Send;

    /// Tear down the engine.
    fn shutdown(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized;
}
