//! Filesystem artifact store.
//!
//! The [`ArtifactStore`] owns the mapping from a page URL to the Markdown file
//! that holds it. The output directory mirrors the site's URL path hierarchy:
//!
//! | URL path        | Artifact              |
//! |-----------------|-----------------------|
//! | `/`             | `index.md`            |
//! | `/docs/`        | `docs/index.md`       |
//! | `/docs/page`    | `docs/page.md`        |
//! | `/a/file.html`  | `a/file.html.md`      |
//!
//! Query strings and fragments play no part in the mapping.

use std::path::{Path, PathBuf};

use sitescribe_shared::{Result, SiteScribeError};
use url::Url;

/// File name used for directory-style URLs.
const INDEX_FILE: &str = "index.md";

/// Extension appended to every non-directory URL path.
const ARTIFACT_EXT: &str = ".md";

/// Handle to an output directory of Markdown artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create `root` (and parents) if absent, then wrap it.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| SiteScribeError::storage(&root, e))?;

        tracing::debug!(root = %root.display(), "artifact store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Artifact path for `url`, relative to the store root.
    pub fn relative_path(url: &Url) -> PathBuf {
        let path = url.path();
        let segments: Vec<&str> = path
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .collect();

        let mut rel = PathBuf::new();
        match segments.split_last() {
            Some((last, dirs)) if !path.ends_with('/') => {
                rel.extend(dirs);
                rel.push(format!("{last}{ARTIFACT_EXT}"));
            }
            _ => {
                rel.extend(&segments);
                rel.push(INDEX_FILE);
            }
        }
        rel
    }

    /// Absolute artifact path for `url`.
    pub fn path_for(&self, url: &Url) -> PathBuf {
        self.root.join(Self::relative_path(url))
    }

    /// Whether a regular file already holds the artifact for `url`.
    pub async fn exists(&self, url: &Url) -> bool {
        tokio::fs::metadata(self.path_for(url))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Write `content` as the artifact for `url`, creating parent directories.
    ///
    /// Overwrites unconditionally; callers check [`exists`](Self::exists) first.
    pub async fn save(&self, url: &Url, content: &str) -> Result<PathBuf> {
        let path = self.path_for(url);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SiteScribeError::storage(parent, e))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| SiteScribeError::storage(&path, e))?;

        tracing::debug!(%url, path = %path.display(), bytes = content.len(), "artifact saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn rel(s: &str) -> PathBuf {
        ArtifactStore::relative_path(&url(s))
    }

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("sitescribe_store_{}", Uuid::now_v7()))
    }

    #[test]
    fn path_mapping_is_deterministic() {
        assert_eq!(rel("https://a.com/"), PathBuf::from("index.md"));
        assert_eq!(rel("https://a.com"), PathBuf::from("index.md"));
        assert_eq!(rel("https://a.com/docs/"), PathBuf::from("docs/index.md"));
        assert_eq!(rel("https://a.com/docs/page"), PathBuf::from("docs/page.md"));
    }

    #[test]
    fn path_mapping_keeps_extensions_and_ignores_query() {
        assert_eq!(rel("https://a.com/a/file.html"), PathBuf::from("a/file.html.md"));
        assert_eq!(rel("https://a.com/p?x=1"), rel("https://a.com/p?x=2"));
        assert_eq!(rel("https://a.com/p#top"), PathBuf::from("p.md"));
    }

    #[test]
    fn path_mapping_stays_under_root() {
        assert_eq!(rel("https://a.com//x//y"), PathBuf::from("x/y.md"));
        assert_eq!(rel("https://a.com/../../etc/passwd"), PathBuf::from("etc/passwd.md"));
        assert_eq!(rel("https://a.com/my%20page"), PathBuf::from("my%20page.md"));
    }

    #[tokio::test]
    async fn save_creates_directories_and_exists_sees_it() {
        let root = temp_root();
        let store = ArtifactStore::open(&root).await.unwrap();
        let page = url("https://a.com/guide/deep/page");

        assert!(!store.exists(&page).await);

        let path = store.save(&page, "# Page\n").await.unwrap();
        assert_eq!(path, root.join("guide/deep/page.md"));
        assert!(store.exists(&page).await);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Page\n");

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn directory_at_artifact_path_is_not_an_artifact() {
        let root = temp_root();
        let store = ArtifactStore::open(&root).await.unwrap();
        std::fs::create_dir_all(root.join("odd.md")).unwrap();

        assert!(!store.exists(&url("https://a.com/odd")).await);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn save_reports_storage_errors() {
        let root = temp_root();
        let store = ArtifactStore::open(&root).await.unwrap();
        // A file where a directory is needed.
        std::fs::write(root.join("blocked"), "x").unwrap();

        let err = store
            .save(&url("https://a.com/blocked/page"), "content")
            .await
            .unwrap_err();
        assert!(matches!(err, SiteScribeError::Storage { .. }));
        assert!(!err.is_fatal());

        let _ = std::fs::remove_dir_all(&root);
    }
}
