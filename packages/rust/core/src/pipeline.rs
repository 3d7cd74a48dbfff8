//! End-to-end crawl pipeline: start URL → frontier → fetch → convert → artifact.
//!
//! The loop is strictly sequential. One page is open at a time, every opened
//! page is released before the next URL is popped, and the fetch engine is
//! shut down on every exit path once it has been started.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};
use url::Url;

use sitescribe_crawler::{
    BrowserFetcher, Frontier, HttpFetcher, PageFetcher, RenderedPage, scope,
};
use sitescribe_markdown::ConvertOptions;
use sitescribe_shared::{CredentialSet, FetchSettings, FetcherKind, Result, SiteScribeError};
use sitescribe_storage::ArtifactStore;

/// Parameters of one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    /// Seed URL; its origin bounds the crawl.
    pub start_url: Url,
    /// Root of the Markdown mirror (created if absent).
    pub output_dir: PathBuf,
    /// Optional JSON cookie file applied to every page.
    pub credentials_path: Option<PathBuf>,
}

/// Outcome counters of a finished crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    /// Pages converted and written this run.
    pub pages_saved: usize,
    /// Pages whose artifact already existed.
    pub pages_skipped: usize,
    /// Pages that failed to fetch, convert or save.
    pub pages_failed: usize,
    /// Failures as (URL, error message).
    pub errors: Vec<(String, String)>,
    /// Wall-clock time of the crawl loop.
    pub duration: Duration,
}

/// Progress callback for reporting crawl status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a URL is fetched.
    fn page_started(&self, url: &Url);
    /// Called after an artifact was written.
    fn page_saved(&self, url: &Url, path: &Path);
    /// Called when the artifact already existed.
    fn page_skipped(&self, url: &Url);
    /// Called when a URL failed and was skipped.
    fn page_failed(&self, url: &Url, error: &SiteScribeError);
    /// Called when the crawl completes.
    fn done(&self, summary: &CrawlSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_started(&self, _url: &Url) {}
    fn page_saved(&self, _url: &Url, _path: &Path) {}
    fn page_skipped(&self, _url: &Url) {}
    fn page_failed(&self, _url: &Url, _error: &SiteScribeError) {}
    fn done(&self, _summary: &CrawlSummary) {}
}

/// What happened to a single URL.
enum PageOutcome {
    Saved(PathBuf),
    Skipped,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Load the credential set for a run. Never fails: problems are logged and an
/// empty set is used instead.
pub fn load_credentials(path: Option<&Path>) -> CredentialSet {
    let Some(path) = path else {
        return CredentialSet::default();
    };

    match CredentialSet::load(path) {
        Ok(set) => {
            info!(path = %path.display(), cookies = set.len(), "loaded credentials");
            set
        }
        Err(e) => {
            warn!(error = %e, "continuing without credentials");
            CredentialSet::default()
        }
    }
}

/// Run a crawl with the fetch engine selected by `settings`.
///
/// Fails only if the output directory cannot be created or the engine cannot
/// start; per-URL problems are reported in the returned summary.
#[instrument(skip_all, fields(start_url = %job.start_url, fetcher = %settings.kind))]
pub async fn crawl(
    job: &CrawlJob,
    settings: &FetchSettings,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let credentials = load_credentials(job.credentials_path.as_deref());
    let store = ArtifactStore::open(&job.output_dir).await?;

    match settings.kind {
        FetcherKind::Browser => {
            progress.phase("Launching browser");
            let fetcher = BrowserFetcher::launch(settings).await?;
            run(job, &store, &credentials, fetcher, progress).await
        }
        FetcherKind::Http => {
            let fetcher = HttpFetcher::new(settings)?;
            run(job, &store, &credentials, fetcher, progress).await
        }
    }
}

/// Run a crawl with an already-started fetcher. The fetcher is always shut down.
#[instrument(skip_all, fields(start_url = %job.start_url))]
pub async fn crawl_with<F: PageFetcher>(
    job: &CrawlJob,
    fetcher: F,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let credentials = load_credentials(job.credentials_path.as_deref());

    let store = match ArtifactStore::open(&job.output_dir).await {
        Ok(store) => store,
        Err(e) => {
            fetcher.shutdown().await;
            return Err(e);
        }
    };

    run(job, &store, &credentials, fetcher, progress).await
}

// ---------------------------------------------------------------------------
// Crawl loop
// ---------------------------------------------------------------------------

async fn run<F: PageFetcher>(
    job: &CrawlJob,
    store: &ArtifactStore,
    credentials: &CredentialSet,
    mut fetcher: F,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let start = Instant::now();
    let mut summary = CrawlSummary::default();

    let mut frontier = Frontier::new();
    let seed = scope::normalize(&job.start_url, job.start_url.as_str())
        .unwrap_or_else(|| job.start_url.clone());
    frontier.add(seed);

    info!(
        output_dir = %store.root().display(),
        cookies = credentials.len(),
        "starting crawl"
    );
    progress.phase("Crawling");

    while let Some(url) = frontier.next() {
        info!(%url, pending = frontier.len(), "processing page");
        progress.page_started(&url);

        match process_url(&url, store, credentials, &mut fetcher, &mut frontier).await {
            Ok(PageOutcome::Saved(path)) => {
                summary.pages_saved += 1;
                info!(%url, path = %path.display(), "saved");
                progress.page_saved(&url, &path);
            }
            Ok(PageOutcome::Skipped) => {
                summary.pages_skipped += 1;
                info!(%url, "artifact exists, conversion skipped");
                progress.page_skipped(&url);
            }
            Err(e) => {
                warn!(%url, error = %e, "page failed, skipping");
                summary.pages_failed += 1;
                summary.errors.push((url.to_string(), e.to_string()));
                progress.page_failed(&url, &e);
            }
        }
    }

    fetcher.shutdown().await;
    summary.duration = start.elapsed();

    info!(
        pages_saved = summary.pages_saved,
        pages_skipped = summary.pages_skipped,
        pages_failed = summary.pages_failed,
        discovered = frontier.visited_count(),
        duration_ms = summary.duration.as_millis(),
        "crawl completed"
    );
    progress.done(&summary);

    Ok(summary)
}

/// Open a page for `url`, visit it, and release the page whatever happened.
async fn process_url<F: PageFetcher>(
    url: &Url,
    store: &ArtifactStore,
    credentials: &CredentialSet,
    fetcher: &mut F,
    frontier: &mut Frontier,
) -> Result<PageOutcome> {
    let mut page = fetcher.open_page(credentials).await?;
    let result = visit(&mut page, url, store, frontier).await;
    fetcher.release(page).await;
    result
}

/// Navigate, persist if new, then enqueue same-origin links.
///
/// Navigation happens even when the artifact exists: links are only known
/// after the page is loaded.
async fn visit<P: RenderedPage>(
    page: &mut P,
    url: &Url,
    store: &ArtifactStore,
    frontier: &mut Frontier,
) -> Result<PageOutcome> {
    page.navigate(url).await?;

    let outcome = if store.exists(url).await {
        PageOutcome::Skipped
    } else {
        let html = page.html().await?;
        let converted =
            sitescribe_markdown::convert(&html, &ConvertOptions::with_base_url(url.clone()));
        debug!(
            %url,
            title = converted.title.as_deref().unwrap_or(""),
            words = converted.word_count,
            "converted page"
        );
        PageOutcome::Saved(store.save(url, &converted.markdown).await?)
    };

    let links = page.links().await?;
    let mut added = 0usize;
    for link in &links {
        if let Some(next) = scope::normalize(url, link) {
            if frontier.add(next) {
                added += 1;
            }
        }
    }
    debug!(%url, found = links.len(), added, pending = frontier.len(), "links enqueued");

    Ok(outcome)
}
