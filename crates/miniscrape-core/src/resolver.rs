//! Page resolvers: turn one [`PageSpec`] into one [`RunResult`].
//!
//! Resolution never fails. Acquisition and extraction errors are folded into
//! an error result, so the runner always receives exactly one result per page.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::error::AppError;
use crate::filters::FilterChain;
use crate::models::{PageSpec, ResolverKind, RunResult};
use crate::traits::{Cleaner, Extractor, Fetcher, Fragment, QuerySelector, join_fragments};

/// Something that can produce the result for one page.
pub trait Resolve: Send + Sync + 'static {
    fn page(&self) -> &PageSpec;

    fn resolve(&self, cancel: &CancellationToken) -> impl Future<Output = RunResult> + Send;
}

/// The collaborators shared by every network-backed resolver.
#[derive(Debug, Clone)]
pub struct Pipeline<F, X, C, K> {
    fetcher: F,
    extractor: X,
    cleaner: C,
    clock: K,
}

impl<F, X, C, K> Pipeline<F, X, C, K>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
{
    pub fn new(fetcher: F, extractor: X, cleaner: C, clock: K) -> Self {
        Self {
            fetcher,
            extractor,
            cleaner,
            clock,
        }
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    /// Acquire the page, racing the fetch against cancellation.
    async fn acquire(&self, page: &PageSpec, cancel: &CancellationToken) -> Result<String, AppError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(AppError::Cancelled),
            result = self.fetcher.fetch(page) => result,
        }
    }

    /// Acquire and extract. Zero matches yields an empty vector.
    async fn fragments(
        &self,
        page: &PageSpec,
        cancel: &CancellationToken,
    ) -> Result<Vec<Fragment>, AppError> {
        let selector = QuerySelector::for_page(page)?;
        let document = self.acquire(page, cancel).await?;
        tracing::debug!(page = %page.namespace(), bytes = document.len(), "Acquired page");

        let fragments = self.extractor.extract(&document, &selector)?;
        tracing::debug!(page = %page.namespace(), fragments = fragments.len(), "Extracted fragments");
        Ok(fragments)
    }
}

// ---------------------------------------------------------------------------
// Variants
// ---------------------------------------------------------------------------

/// Returns the configured URL without touching the network.
///
/// Shared by the url-only, iframe and pdf kinds; they differ only in the
/// result kind tag.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    page: PageSpec,
}

impl LinkResolver {
    pub fn new(page: PageSpec) -> Self {
        Self { page }
    }
}

impl Resolve for LinkResolver {
    fn page(&self) -> &PageSpec {
        &self.page
    }

    async fn resolve(&self, _cancel: &CancellationToken) -> RunResult {
        RunResult::ok(
            self.page.clone(),
            self.page.url.clone(),
            self.page.resolver.result_kind(),
        )
    }
}

/// Returns the `src` attribute of the first matched element.
#[derive(Debug, Clone)]
pub struct ImageResolver<F, X, C, K> {
    page: PageSpec,
    pipeline: Pipeline<F, X, C, K>,
}

impl<F, X, C, K> Resolve for ImageResolver<F, X, C, K>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
{
    fn page(&self) -> &PageSpec {
        &self.page
    }

    async fn resolve(&self, cancel: &CancellationToken) -> RunResult {
        let kind = ResolverKind::Image.result_kind();
        match self.pipeline.fragments(&self.page, cancel).await {
            Ok(fragments) => match fragments.first().and_then(|f| f.attr("src")) {
                Some(src) if !src.trim().is_empty() => {
                    tracing::info!(page = %self.page.namespace(), "Image resolved");
                    RunResult::ok(self.page.clone(), src.trim(), kind)
                }
                _ => {
                    tracing::info!(page = %self.page.namespace(), "No image found");
                    RunResult::empty(self.page.clone(), kind)
                }
            },
            Err(e) => {
                tracing::warn!(page = %self.page.namespace(), url = %self.page.url, error = %e, "Image resolution failed");
                RunResult::error(self.page.clone(), &e)
            }
        }
    }
}

/// Full pipeline: acquisition, extraction, newline join, filter chain.
#[derive(Debug, Clone)]
pub struct ContentResolver<F, X, C, K> {
    page: PageSpec,
    pipeline: Pipeline<F, X, C, K>,
}

impl<F, X, C, K> Resolve for ContentResolver<F, X, C, K>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
{
    fn page(&self) -> &PageSpec {
        &self.page
    }

    async fn resolve(&self, cancel: &CancellationToken) -> RunResult {
        let kind = ResolverKind::Content.result_kind();
        let fragments = match self.pipeline.fragments(&self.page, cancel).await {
            Ok(fragments) => fragments,
            Err(e) => {
                tracing::warn!(page = %self.page.namespace(), url = %self.page.url, error = %e, "Content resolution failed");
                return RunResult::error(self.page.clone(), &e);
            }
        };

        let chain = FilterChain::for_page(
            &self.page,
            self.pipeline.cleaner.clone(),
            self.pipeline.clock.weekday(),
        );
        let content = chain.apply(&join_fragments(&fragments));

        if content.is_empty() {
            tracing::info!(page = %self.page.namespace(), "Resolved but the content is empty");
            RunResult::empty(self.page.clone(), kind)
        } else {
            tracing::info!(page = %self.page.namespace(), "Resolved");
            RunResult::ok(self.page.clone(), content, kind)
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Closed set of resolvers, chosen from [`PageSpec::resolver`].
#[derive(Debug, Clone)]
pub enum PageResolver<F, X, C, K> {
    Link(LinkResolver),
    Image(ImageResolver<F, X, C, K>),
    Content(ContentResolver<F, X, C, K>),
}

impl<F, X, C, K> PageResolver<F, X, C, K>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
{
    pub fn for_page(page: PageSpec, pipeline: &Pipeline<F, X, C, K>) -> Self {
        match page.resolver {
            ResolverKind::UrlOnly | ResolverKind::Iframe | ResolverKind::Pdf => {
                PageResolver::Link(LinkResolver::new(page))
            }
            ResolverKind::Image => PageResolver::Image(ImageResolver {
                page,
                pipeline: pipeline.clone(),
            }),
            ResolverKind::Content => PageResolver::Content(ContentResolver {
                page,
                pipeline: pipeline.clone(),
            }),
        }
    }
}

impl<F, X, C, K> Resolve for PageResolver<F, X, C, K>
where
    F: Fetcher,
    X: Extractor,
    C: Cleaner,
    K: Clock,
{
    fn page(&self) -> &PageSpec {
        match self {
            PageResolver::Link(r) => r.page(),
            PageResolver::Image(r) => r.page(),
            PageResolver::Content(r) => r.page(),
        }
    }

    async fn resolve(&self, cancel: &CancellationToken) -> RunResult {
        match self {
            PageResolver::Link(r) => r.resolve(cancel).await,
            PageResolver::Image(r) => r.resolve(cancel).await,
            PageResolver::Content(r) => r.resolve(cancel).await,
        }
    }
}
