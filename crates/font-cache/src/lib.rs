//! Process-wide reference catalog, loaded once on first use.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use font_web_db::ReferenceCatalog;

/// Lazily loaded, never refreshed catalog shared by all match requests.
///
/// Concurrent first callers all await the same load; the file is parsed at
/// most once per cache. A missing or unreadable file is cached as an empty
/// catalog.
pub struct CatalogCache {
    path: PathBuf,
    cell: OnceCell<Arc<ReferenceCatalog>>,
    loads: AtomicUsize,
}

impl CatalogCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Cache that already holds `catalog`; nothing is read from disk.
    pub fn preloaded(catalog: ReferenceCatalog) -> Self {
        Self {
            path: PathBuf::new(),
            cell: OnceCell::from(Arc::new(catalog)),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self) -> Arc<ReferenceCatalog> {
        self.cell.get_or_init(|| self.load()).await.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of times the file has been read
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Acquire)
    }

    async fn load(&self) -> Arc<ReferenceCatalog> {
        self.loads.fetch_add(1, Ordering::AcqRel);
        let path = self.path.clone();

        let loaded = tokio::task::spawn_blocking(move || ReferenceCatalog::load(&path)).await;
        let catalog = match loaded {
            Ok(Ok(catalog)) => catalog,
            Ok(Err(e)) => {
                warn!(path = %self.path.display(), error = %e, "reference catalog unavailable");
                ReferenceCatalog::empty()
            }
            Err(e) => {
                warn!(error = %e, "catalog loader task failed");
                ReferenceCatalog::empty()
            }
        };

        info!(records = catalog.len(), "reference catalog cached");
        Arc::new(catalog)
    }
}
