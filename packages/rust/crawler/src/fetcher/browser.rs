//! Headless Chromium fetcher backed by `chromiumoxide`.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use url::Url;

use sitescribe_shared::{
    Cookie, CredentialSet, FetchSettings, Result, SameSite, SiteScribeError,
};

use super::{PageFetcher, RenderedPage};

/// Collects the resolved `href` property of every anchor.
const LINKS_JS: &str = "Array.from(document.querySelectorAll('a[href]'), a => a.href)";

// ---------------------------------------------------------------------------
// BrowserFetcher
// ---------------------------------------------------------------------------

/// A running Chromium instance. Each page lives in its own browser context so
/// cookies and storage never leak between URLs.
pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    user_data_dir: PathBuf,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launch Chromium. Any failure here is a [`SiteScribeError::SessionInit`].
    #[instrument(skip_all, fields(headless = settings.headless))]
    pub async fn launch(settings: &FetchSettings) -> Result<Self> {
        let user_data_dir =
            std::env::temp_dir().join(format!("sitescribe-chrome-{}", std::process::id()));
        std::fs::create_dir_all(&user_data_dir).map_err(|e| {
            SiteScribeError::SessionInit(format!(
                "failed to create {}: {e}",
                user_data_dir.display()
            ))
        })?;

        let mut builder = BrowserConfig::builder()
            .request_timeout(settings.timeout)
            .window_size(1920, 1080)
            .user_data_dir(user_data_dir.clone())
            .arg(format!("--user-agent={}", settings.user_agent))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-extensions")
            .arg("--mute-audio");

        if !settings.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &settings.executable {
            builder = builder.chrome_executable(exe);
        }

        let launched = match builder.build() {
            Ok(config) => Browser::launch(config).await.map_err(|e| {
                SiteScribeError::SessionInit(format!("failed to launch browser: {e}"))
            }),
            Err(e) => Err(SiteScribeError::SessionInit(e)),
        };
        let (browser, mut handler) = match launched {
            Ok(pair) => pair,
            Err(e) => {
                if let Err(rm) = std::fs::remove_dir_all(&user_data_dir) {
                    debug!(error = %rm, "failed to remove browser profile dir");
                }
                return Err(e);
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler error");
                }
            }
        });

        info!("browser launched");

        Ok(Self {
            browser,
            handler,
            user_data_dir,
            timeout: settings.timeout,
        })
    }
}

impl PageFetcher for BrowserFetcher {
    type Page = BrowserPage;

    async fn open_page(&mut self, credentials: &CredentialSet) -> Result<BrowserPage> {
        let context = self
            .browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| SiteScribeError::fetch("about:blank", format!("new context: {e}")))?;

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(|e| SiteScribeError::fetch("about:blank", e))?;

        let page = match self.browser.new_page(params).await {
            Ok(page) => page,
            Err(e) => {
                let _ = self.browser.dispose_browser_context(context).await;
                return Err(SiteScribeError::fetch("about:blank", format!("new page: {e}")));
            }
        };

        let page = BrowserPage {
            page,
            context: Some(context),
            url: None,
            timeout: self.timeout,
        };

        if !credentials.is_empty() {
            let cookies: Vec<CookieParam> = credentials.iter().map(cookie_param).collect();
            if let Err(e) = page.page.set_cookies(cookies).await {
                warn!(error = %e, "failed to install cookies, continuing without them");
            }
        }

        Ok(page)
    }

    async fn release(&mut self, page: BrowserPage) {
        let BrowserPage { page, context, .. } = page;

        if let Err(e) = page.close().await {
            debug!(error = %e, "page close failed");
        }
        if let Some(id) = context {
            if let Err(e) = self.browser.dispose_browser_context(id).await {
                debug!(error = %e, "context dispose failed");
            }
        }
    }

    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "browser close failed");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!(path = ?self.user_data_dir, error = %e, "user data dir not removed");
        }
        info!("browser closed");
    }
}

// ---------------------------------------------------------------------------
// BrowserPage
// ---------------------------------------------------------------------------

/// A Chromium tab inside its own browser context.
pub struct BrowserPage {
    page: Page,
    context: Option<BrowserContextId>,
    /// Last URL passed to `navigate`, for error context.
    url: Option<Url>,
    timeout: Duration,
}

impl RenderedPage for BrowserPage {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        self.url = Some(url.clone());

        let load = async {
            self.page
                .goto(url.as_str())
                .await
                .map_err(|e| SiteScribeError::fetch(url, e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| SiteScribeError::fetch(url, e.to_string()))?;
            Ok::<_, SiteScribeError>(())
        };

        match tokio::time::timeout(self.timeout, load).await {
            Ok(result) => result,
            Err(_) => Err(SiteScribeError::fetch(
                url,
                format!("navigation timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }

    async fn html(&self) -> Result<String> {
        self.page
            .content()
            .await
            .map_err(|e| self.fetch_error(format!("content: {e}")))
    }

    async fn links(&self) -> Result<Vec<String>> {
        self.page
            .evaluate(LINKS_JS)
            .await
            .map_err(|e| self.fetch_error(format!("link evaluation: {e}")))?
            .into_value::<Vec<String>>()
            .map_err(|e| self.fetch_error(format!("link evaluation: {e}")))
    }
}

impl BrowserPage {
    fn fetch_error(&self, message: String) -> SiteScribeError {
        let url = self.url.as_ref().map_or("about:blank", Url::as_str);
        SiteScribeError::fetch(url, message)
    }
}

// ---------------------------------------------------------------------------
// Cookie conversion
// ---------------------------------------------------------------------------

/// Map a credential record onto the CDP `Network.CookieParam` shape.
fn cookie_param(cookie: &Cookie) -> CookieParam {
    let mut param = CookieParam::new(cookie.name.clone(), cookie.value.clone());
    param.domain = Some(cookie.domain.clone());
    param.path = Some(cookie.path.clone());
    param.secure = Some(cookie.secure);
    param.http_only = Some(cookie.http_only);
    param.same_site = cookie.same_site.map(|s| match s {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    });
    if cookie.expires > 0.0 {
        param.expires = Some(TimeSinceEpoch::new(cookie.expires));
    }
    param
}
