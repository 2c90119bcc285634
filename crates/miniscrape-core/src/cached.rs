use tokio_util::sync::CancellationToken;

use crate::cache::{CacheItem, CacheNamespace, CacheStore, PageCache};
use crate::clock::Clock;
use crate::models::{PageSpec, RunResult};
use crate::resolver::Resolve;

/// Serves today's cached content when present, otherwise delegates and
/// stores successful results.
pub struct CachedResolver<R, S, K> {
    inner: R,
    cache: PageCache<S, K>,
}

impl<R, S, K> CachedResolver<R, S, K>
where
    R: Resolve,
    S: CacheStore,
    K: Clock,
{
    pub fn new(inner: R, cache: PageCache<S, K>) -> Self {
        Self { inner, cache }
    }
}

impl<R, S, K> Resolve for CachedResolver<R, S, K>
where
    R: Resolve,
    S: CacheStore,
    K: Clock,
{
    fn page(&self) -> &PageSpec {
        self.inner.page()
    }

    async fn resolve(&self, cancel: &CancellationToken) -> RunResult {
        let page = self.inner.page();
        let namespace = CacheNamespace::for_page(page);

        if self.cache.is_page_cached(&namespace).await {
            tracing::debug!(page = %page.namespace(), "Loading content from cache");
            let content = self.cache.get_content(&CacheItem::for_page(page)).await;
            let content = String::from_utf8_lossy(&content);
            if !content.trim().is_empty() {
                return RunResult::ok(page.clone(), content, page.resolver.result_kind());
            }
            // Blank or unreadable entries are misses.
            tracing::warn!(page = %page.namespace(), "Cached content is blank, resolving again");
            self.cache.discard(&namespace).await;
        }

        let result = self.inner.resolve(cancel).await;
        if !result.is_ok() {
            return result;
        }

        match self
            .cache
            .store(&CacheItem::for_page(page), result.content().as_bytes())
            .await
        {
            Ok(()) => result,
            Err(e) => RunResult::error(page.clone(), &e),
        }
    }
}
