//! Concurrent fan-out/fan-in over the selected pages.
//!
//! One task per page sends exactly one result into a channel sized for the
//! whole batch; the runner collects exactly that many. Results arrive in
//! completion order.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheStore, PageCache};
use crate::cached::CachedResolver;
use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{Category, PageSpec, RunResult, RunSelector};
use crate::resolver::{PageResolver, Pipeline, Resolve};
use crate::selection::select_pages;
use crate::traits::{Cleaner, Extractor, Fetcher};

/// Default bound on pages resolved at the same time.
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

pub struct Runner<F, X, C, K, S> {
    categories: Arc<Vec<Category>>,
    pipeline: Pipeline<F, X, C, K>,
    cache: Option<PageCache<S, K>>,
    max_concurrency: usize,
}

impl<F, X, C, K, S> Runner<F, X, C, K, S>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
    S: CacheStore,
{
    /// `max_concurrency == 0` means unbounded. `cache == None` means every
    /// page is resolved and nothing is stored.
    pub fn new(
        categories: Arc<Vec<Category>>,
        pipeline: Pipeline<F, X, C, K>,
        cache: Option<PageCache<S, K>>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            categories,
            pipeline,
            cache,
            max_concurrency,
        }
    }

    /// Resolve every page matched by `selector`.
    pub async fn run(&self, cancel: &CancellationToken, selector: &RunSelector) -> Vec<RunResult> {
        let pages = select_pages(&self.categories, selector);
        let number_of_pages = pages.len();

        if number_of_pages == 0 {
            tracing::warn!(?selector, "No pages available");
            return Vec::new();
        }
        tracing::debug!(number_of_pages, ?selector, "Runner started");

        let cache = self.cache.as_ref().map(|cache| {
            if selector.force {
                cache.bypassed()
            } else {
                cache.clone()
            }
        });
        let semaphore =
            (self.max_concurrency > 0).then(|| Arc::new(Semaphore::new(self.max_concurrency)));
        let (tx, mut rx) = mpsc::channel(number_of_pages);

        for (idx, page) in pages.into_iter().enumerate() {
            let tx = tx.clone();
            let pipeline = self.pipeline.clone();
            let cache = cache.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();

            tokio::spawn(async move {
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                tracing::debug!(idx, page = %page.namespace(), "Starting to resolve");

                let fallback = page.clone();
                let result = match AssertUnwindSafe(resolve_page(page, &pipeline, cache, &cancel))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(page = %fallback.namespace(), %message, "Resolver panicked");
                        RunResult::error(
                            fallback,
                            &AppError::Generic(format!("resolver panicked: {message}")),
                        )
                    }
                };

                if tx.send(result).await.is_err() {
                    tracing::warn!(idx, "Result receiver dropped");
                }
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(number_of_pages);
        while results.len() < number_of_pages {
            match rx.recv().await {
                Some(result) => results.push(result),
                None => break,
            }
        }

        tracing::debug!(collected = results.len(), "Runner ended");
        results
    }
}

async fn resolve_page<F, X, C, K, S>(
    page: PageSpec,
    pipeline: &Pipeline<F, X, C, K>,
    cache: Option<PageCache<S, K>>,
    cancel: &CancellationToken,
) -> RunResult
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
    S: CacheStore,
{
    let resolver = PageResolver::for_page(page, pipeline);
    match cache {
        Some(cache) => CachedResolver::new(resolver, cache).resolve(cancel).await,
        None => resolver.resolve(cancel).await,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
