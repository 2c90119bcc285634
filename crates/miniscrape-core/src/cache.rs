//! Day-partitioned page cache.
//!
//! Entries are keyed by `(namespace, date)`. The filesystem backend bakes the
//! date into the path:
//!
//! ```text
//! <root>/<YYYY-MM-DD>/<category>/<codename>/content.txt
//! ```
//!
//! so yesterday's partition is simply never read again and no eviction sweep
//! is needed. The date comes from a [`Clock`], read on every call.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;

use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::error::AppError;
use crate::models::{CachePolicy, PageSpec, RunSelector};

/// Name of the file holding a page's processed content.
pub const DEFAULT_CONTENT_FILE: &str = "content.txt";

/// Checks that `segment` is a single plain directory name.
///
/// Rejects empty values, `.`, `..`, separators and absolute paths, so joining
/// the result onto a date directory never leaves it.
fn checked_segment(segment: &str) -> Result<&str, AppError> {
    let mut components = Path::new(segment).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single && !segment.contains(['/', '\\']) {
        Ok(segment)
    } else {
        Err(AppError::CacheError(format!(
            "'{segment}' is not a valid cache path segment"
        )))
    }
}

/// `(category, page)` pair identifying a page in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheNamespace {
    pub category: String,
    pub page: String,
}

impl CacheNamespace {
    pub fn new(category: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            page: page.into(),
        }
    }

    pub fn for_page(page: &PageSpec) -> Self {
        Self::new(&page.category, &page.codename)
    }

    /// `category/page`.
    pub fn path(&self) -> String {
        format!("{}/{}", self.category, self.page)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A page's cache namespace together with its cache policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    pub namespace: CacheNamespace,
    pub cache_policy: CachePolicy,
}

impl CacheItem {
    pub fn for_page(page: &PageSpec) -> Self {
        Self {
            namespace: CacheNamespace::for_page(page),
            cache_policy: page.cache_policy,
        }
    }
}

/// Key of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub namespace: CacheNamespace,
    pub date: NaiveDate,
}

/// Part of one date partition to drop.
///
/// `None` widens the scope: no page removes the whole category, no category
/// removes the page from every category, neither removes the whole day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheScope {
    pub date: NaiveDate,
    pub category: Option<String>,
    pub page: Option<String>,
}

impl CacheScope {
    /// Scope over `date`; rejects category or page values that are not a
    /// single path segment.
    pub fn new(
        date: NaiveDate,
        category: Option<String>,
        page: Option<String>,
    ) -> Result<Self, AppError> {
        for segment in category.iter().chain(page.iter()) {
            checked_segment(segment)?;
        }
        Ok(Self {
            date,
            category,
            page,
        })
    }

    fn matches(&self, key: &CacheKey) -> bool {
        key.date == self.date
            && self
                .category
                .as_ref()
                .is_none_or(|c| *c == key.namespace.category)
            && self.page.as_ref().is_none_or(|p| *p == key.namespace.page)
    }
}

/// Key-value backend for cached page content.
pub trait CacheStore: Send + Sync + Clone + 'static {
    fn exists(&self, key: &CacheKey) -> impl Future<Output = bool> + Send;

    fn read(&self, key: &CacheKey) -> impl Future<Output = Result<Vec<u8>, AppError>> + Send;

    /// Write `content` unless an entry already exists. Returns whether it wrote.
    fn write_new(
        &self,
        key: &CacheKey,
        content: &[u8],
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    fn remove(&self, scope: &CacheScope) -> impl Future<Output = Result<(), AppError>> + Send;
}

// ---------------------------------------------------------------------------
// Filesystem backend
// ---------------------------------------------------------------------------

/// Stores entries as plain UTF-8 files under a root directory.
#[derive(Debug, Clone)]
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn date_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    fn namespace_dir(&self, key: &CacheKey) -> Result<PathBuf, AppError> {
        Ok(self
            .date_dir(key.date)
            .join(checked_segment(&key.namespace.category)?)
            .join(checked_segment(&key.namespace.page)?))
    }

    /// Path of the content file for `key`.
    pub fn content_path(&self, key: &CacheKey) -> Result<PathBuf, AppError> {
        Ok(self.namespace_dir(key)?.join(DEFAULT_CONTENT_FILE))
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique name for a content file still being written.
fn temp_file_name() -> String {
    format!(
        "{DEFAULT_CONTENT_FILE}.{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), AppError> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| AppError::CacheError(format!("Unable to create {}: {e}", path.display())))?;
    file.write_all(content)
        .await
        .map_err(|e| AppError::CacheError(format!("Unable to write {}: {e}", path.display())))?;
    file.flush()
        .await
        .map_err(|e| AppError::CacheError(format!("Unable to flush {}: {e}", path.display())))
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), AppError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed cache directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AppError::CacheError(format!(
            "Unable to remove {}: {e}",
            path.display()
        ))),
    }
}

impl CacheStore for FsCacheStore {
    async fn exists(&self, key: &CacheKey) -> bool {
        let Ok(path) = self.content_path(key) else {
            return false;
        };
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, AppError> {
        let path = self.content_path(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::CacheError(format!("Unable to read {}: {e}", path.display())))
    }

    /// Writes a temporary file next to the entry and hard-links it into place,
    /// so `content.txt` only ever appears complete and is never replaced.
    async fn write_new(&self, key: &CacheKey, content: &[u8]) -> Result<bool, AppError> {
        let dir = self.namespace_dir(key)?;
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::CacheError(format!("Unable to create {}: {e}", dir.display()))
        })?;

        let path = dir.join(DEFAULT_CONTENT_FILE);
        let temp = dir.join(temp_file_name());
        let written = match write_file(&temp, content).await {
            Ok(()) => match tokio::fs::hard_link(&temp, &path).await {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(AppError::CacheError(format!(
                    "Unable to link {}: {e}",
                    path.display()
                ))),
            },
            Err(e) => Err(e),
        };

        match tokio::fs::remove_file(&temp).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                tracing::warn!(path = %temp.display(), error = %e, "Unable to remove temporary cache file");
            }
            _ => {}
        }
        written
    }

    async fn remove(&self, scope: &CacheScope) -> Result<(), AppError> {
        for segment in scope.category.iter().chain(scope.page.iter()) {
            checked_segment(segment)?;
        }
        let date_dir = self.date_dir(scope.date);
        match (&scope.category, &scope.page) {
            (Some(category), Some(page)) => {
                remove_dir_if_exists(&date_dir.join(category).join(page)).await
            }
            (Some(category), None) => remove_dir_if_exists(&date_dir.join(category)).await,
            (None, None) => remove_dir_if_exists(&date_dir).await,
            (None, Some(page)) => {
                let mut entries = match tokio::fs::read_dir(&date_dir).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                    Err(e) => {
                        return Err(AppError::CacheError(format!(
                            "Unable to list {}: {e}",
                            date_dir.display()
                        )));
                    }
                };
                while let Some(entry) = entries.next_entry().await.map_err(|e| {
                    AppError::CacheError(format!("Unable to list {}: {e}", date_dir.display()))
                })? {
                    remove_dir_if_exists(&entry.path().join(page)).await?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local backend, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<HashMap<CacheKey, Vec<u8>>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCacheStore {
    async fn exists(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    async fn read(&self, key: &CacheKey) -> Result<Vec<u8>, AppError> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| AppError::CacheError(format!("No entry for {}", key.namespace)))
    }

    async fn write_new(&self, key: &CacheKey, content: &[u8]) -> Result<bool, AppError> {
        let mut entries = self.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.clone(), content.to_vec());
        Ok(true)
    }

    async fn remove(&self, scope: &CacheScope) -> Result<(), AppError> {
        self.lock().retain(|key, _| !scope.matches(key));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PageCache
// ---------------------------------------------------------------------------

/// Page-level cache operations over a [`CacheStore`], partitioned by the clock's date.
#[derive(Debug, Clone)]
pub struct PageCache<S, K> {
    store: S,
    clock: K,
    force_update: bool,
}

impl PageCache<FsCacheStore, SystemClock> {
    /// Filesystem cache from configuration; `None` when the cache is disabled.
    ///
    /// Callers treat `None` as "always miss, never store".
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        if !config.enabled {
            tracing::info!("Cache is disabled");
            return None;
        }
        tracing::info!(cache_root = %config.root.display(), "Cache is enabled");
        Some(Self::new(
            FsCacheStore::new(&config.root),
            SystemClock,
            config.update,
        ))
    }
}

impl<S: CacheStore, K: Clock> PageCache<S, K> {
    pub fn new(store: S, clock: K, force_update: bool) -> Self {
        Self {
            store,
            clock,
            force_update,
        }
    }

    /// Same cache, but every lookup misses.
    pub fn bypassed(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: self.clock.clone(),
            force_update: true,
        }
    }

    pub fn store_backend(&self) -> &S {
        &self.store
    }

    fn key(&self, namespace: &CacheNamespace) -> CacheKey {
        CacheKey {
            namespace: namespace.clone(),
            date: self.clock.today(),
        }
    }

    /// True iff today's entry for `namespace` exists and updates are not forced.
    pub async fn is_page_cached(&self, namespace: &CacheNamespace) -> bool {
        !self.force_update && self.store.exists(&self.key(namespace)).await
    }

    /// Persist `content` for today. No-op for `no-cache` pages and for entries
    /// that already exist.
    pub async fn store(&self, item: &CacheItem, content: &[u8]) -> Result<(), AppError> {
        if item.cache_policy == CachePolicy::NoCache {
            tracing::trace!(item = %item.namespace, "Page is not cacheable");
            return Ok(());
        }

        let key = self.key(&item.namespace);
        match self.store.write_new(&key, content).await {
            Ok(true) => {
                tracing::debug!(item = %item.namespace, date = %key.date, "Stored page in cache");
                Ok(())
            }
            Ok(false) => {
                tracing::trace!(item = %item.namespace, "Item already cached");
                Ok(())
            }
            Err(e) => {
                tracing::error!(item = %item.namespace, error = %e, "Unable to store page in cache");
                Err(e)
            }
        }
    }

    /// Today's content for `item`, or empty bytes when it cannot be read.
    pub async fn get_content(&self, item: &CacheItem) -> Vec<u8> {
        match self.store.read(&self.key(&item.namespace)).await {
            Ok(content) => {
                tracing::trace!(item = %item.namespace, "Loading cached content");
                content
            }
            Err(e) => {
                tracing::warn!(item = %item.namespace, error = %e, "Unable to load cached content");
                Vec::new()
            }
        }
    }

    /// Drop today's entry for a single page.
    pub async fn discard(&self, namespace: &CacheNamespace) {
        let scope = match CacheScope::new(
            self.clock.today(),
            Some(namespace.category.clone()),
            Some(namespace.page.clone()),
        ) {
            Ok(scope) => scope,
            Err(e) => {
                tracing::warn!(item = %namespace, error = %e, "Refusing to discard cache entry");
                return;
            }
        };

        match self.store.remove(&scope).await {
            Ok(()) => tracing::debug!(item = %namespace, "Discarded cache entry"),
            Err(e) => tracing::error!(item = %namespace, error = %e, "Unable to discard cache entry"),
        }
    }

    /// Drop today's entries matched by the selector's category and page.
    ///
    /// Values that are not a single path segment are refused with a warning.
    pub async fn invalidate(&self, selector: &RunSelector) {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        let scope = match CacheScope::new(
            self.clock.today(),
            non_empty(&selector.category),
            non_empty(&selector.page),
        ) {
            Ok(scope) => scope,
            Err(e) => {
                tracing::warn!(
                    category = %selector.category,
                    page = %selector.page,
                    error = %e,
                    "Refusing to invalidate cache"
                );
                return;
            }
        };

        if let Err(e) = self.store.remove(&scope).await {
            tracing::error!(?scope, error = %e, "Unable to invalidate cache");
        } else {
            tracing::info!(?scope, "Cache invalidated");
        }
    }
}
