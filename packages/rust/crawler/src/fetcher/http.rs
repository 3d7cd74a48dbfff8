//! Static HTTP fetcher: the served HTML is used as-is, no JavaScript runs.

use reqwest::Client;
use reqwest::header::COOKIE;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use sitescribe_shared::{CredentialSet, FetchSettings, Result, SiteScribeError};

use super::{PageFetcher, RenderedPage};

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Plain `reqwest` client shared by every page.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build the HTTP client. Failure is a [`SiteScribeError::SessionInit`].
    pub fn new(settings: &FetchSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SiteScribeError::SessionInit(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    type Page = HttpPage;

    async fn open_page(&mut self, credentials: &CredentialSet) -> Result<HttpPage> {
        Ok(HttpPage {
            client: self.client.clone(),
            credentials: credentials.clone(),
            loaded: None,
        })
    }

    async fn release(&mut self, _page: HttpPage) {}

    async fn shutdown(self) {}
}

// ---------------------------------------------------------------------------
// HttpPage
// ---------------------------------------------------------------------------

/// One GET request and its response body.
pub struct HttpPage {
    client: Client,
    credentials: CredentialSet,
    loaded: Option<Loaded>,
}

struct Loaded {
    /// Final URL after redirects; relative links resolve against it.
    url: Url,
    body: String,
}

impl HttpPage {
    fn loaded(&self) -> Result<&Loaded> {
        self.loaded
            .as_ref()
            .ok_or_else(|| SiteScribeError::fetch("about:blank", "page has not been navigated"))
    }
}

impl RenderedPage for HttpPage {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        let mut request = self.client.get(url.as_str());
        if let Some(header) = self.credentials.cookie_header_for(url) {
            request = request.header(COOKIE, header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SiteScribeError::fetch(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SiteScribeError::fetch(url, format!("HTTP {status}")));
        }

        let final_url = response.url().clone();
        if final_url != *url {
            debug!(from = %url, to = %final_url, "followed redirect");
        }

        let body = response
            .text()
            .await
            .map_err(|e| SiteScribeError::fetch(url, format!("body read failed: {e}")))?;

        self.loaded = Some(Loaded {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn html(&self) -> Result<String> {
        Ok(self.loaded()?.body.clone())
    }

    async fn links(&self) -> Result<Vec<String>> {
        let loaded = self.loaded()?;
        Ok(extract_links(&loaded.body, &loaded.url))
    }
}

/// Resolve every `a[href]` against `base`, the way a browser's `a.href` would.
fn extract_links(html: &str, base: &Url) -> Vec<String> {
    let doc = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    doc.select(&anchor)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(String::from)
        .collect()
}
