//! Origin scoping and URL canonicalization.

use url::Url;

use sitescribe_shared::{Result, SiteScribeError};

/// Resolve `candidate` against `base` and keep it only if it stays on the
/// same origin. Returns the canonical form (fragment removed).
pub fn normalize(base: &Url, candidate: &str) -> Option<Url> {
    match classify(base, candidate) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::trace!(error = %e, "link dropped");
            None
        }
    }
}

/// Like [`normalize`], but reports why a candidate was rejected.
pub fn classify(base: &Url, candidate: &str) -> Result<Url> {
    let mut url = base
        .join(candidate.trim())
        .map_err(|e| SiteScribeError::MalformedLink {
            link: candidate.to_string(),
            message: e.to_string(),
        })?;

    // Opaque origins (mailto:, javascript:, data:) never compare equal.
    if url.origin() != base.origin() {
        return Err(SiteScribeError::CrossOrigin {
            link: candidate.to_string(),
            origin: base.origin().ascii_serialization(),
        });
    }

    url.set_fragment(None);
    Ok(url)
}
