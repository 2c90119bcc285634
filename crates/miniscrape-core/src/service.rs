use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStore, PageCache};
use crate::catalog::CategorySource;
use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{Category, RunResult, RunSelector};
use crate::resolver::Pipeline;
use crate::runner::Runner;
use crate::traits::{Cleaner, Extractor, Fetcher};

/// How long loaded categories are reused before the source is read again.
pub const CATEGORY_TTL: Duration = Duration::from_secs(10 * 60);

/// Entry point used by the CLI and the server.
///
/// Generic over every external dependency via traits, so tests run the whole
/// service without network or disk.
pub struct ScrapeService<Src, F, X, C, K, S>
where
    Src: CategorySource,
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
    S: CacheStore,
{
    source: Arc<Src>,
    pipeline: Pipeline<F, X, C, K>,
    cache: Option<PageCache<S, K>>,
    max_concurrency: usize,
    categories: Cache<(), Arc<Vec<Category>>>,
}

impl<Src, F, X, C, K, S> ScrapeService<Src, F, X, C, K, S>
where
    Src: CategorySource,
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
    S: CacheStore,
{
    pub fn new(
        source: Src,
        pipeline: Pipeline<F, X, C, K>,
        cache: Option<PageCache<S, K>>,
        max_concurrency: usize,
    ) -> Self {
        Self::with_category_ttl(source, pipeline, cache, max_concurrency, CATEGORY_TTL)
    }

    pub fn with_category_ttl(
        source: Src,
        pipeline: Pipeline<F, X, C, K>,
        cache: Option<PageCache<S, K>>,
        max_concurrency: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            source: Arc::new(source),
            pipeline,
            cache,
            max_concurrency,
            categories: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Loaded categories, memoized. Concurrent callers share one load.
    ///
    /// A failed load is not memoized; the source's error is returned as is.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, AppError> {
        let source = Arc::clone(&self.source);
        self.categories
            .try_get_with((), async move { source.load().await.map(Arc::new) })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Resolve every page matched by `selector`.
    ///
    /// Never fails: per-page failures are error results, and a category
    /// source failure yields no results.
    pub async fn scrape(&self, cancel: &CancellationToken, selector: &RunSelector) -> Vec<RunResult> {
        let categories = match self.categories().await {
            Ok(categories) => categories,
            Err(e) => {
                tracing::error!(error = %e, "Unable to load categories");
                return Vec::new();
            }
        };

        let runner = Runner::new(
            categories,
            self.pipeline.clone(),
            self.cache.clone(),
            self.max_concurrency,
        );
        let results = runner.run(cancel, selector).await;
        tracing::info!(
            pages = results.len(),
            ok = results.iter().filter(|r| r.is_ok()).count(),
            "Scrape finished"
        );
        results
    }

    /// Drop today's cached content selected by `selector`.
    pub async fn invalidate_cache(&self, selector: &RunSelector) {
        match &self.cache {
            Some(cache) => cache.invalidate(selector).await,
            None => tracing::debug!("Cache is disabled, nothing to invalidate"),
        }
    }
}
