//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{HtmlFilterConfig, PageSpec, ResolverKind};
use crate::traits::{Cleaner, Extractor, Fetcher, Fragment, QuerySelector};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses and records fetched pages.
#[derive(Clone, Default)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    /// Codenames of the pages fetched so far.
    pub calls: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    panic_on: Option<String>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }

    /// Sleep before answering, so tests can cancel mid-flight.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Panic when asked for the page with this codename.
    pub fn panicking_on(mut self, codename: &str) -> Self {
        self.panic_on = Some(codename.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, page: &PageSpec) -> Result<String, AppError> {
        self.calls.lock().unwrap().push(page.codename.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on.as_deref() == Some(page.codename.as_str()) {
            panic!("fetcher blew up on {}", page.codename);
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns its input unchanged.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    /// Creates a cleaner that returns the input unchanged.
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a cleaner whose first call returns an error.
    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str, _options: &HtmlFilterConfig) -> Result<String, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor returning queued fragment lists and recording selectors.
#[derive(Clone, Default)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<Vec<Fragment>, AppError>>>>,
    pub selectors: Arc<Mutex<Vec<QuerySelector>>>,
}

impl MockExtractor {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self::with_responses(vec![Ok(fragments)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<Vec<Fragment>, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }
}

impl Extractor for MockExtractor {
    fn extract(
        &self,
        document: &str,
        selector: &QuerySelector,
    ) -> Result<Vec<Fragment>, AppError> {
        self.selectors.lock().unwrap().push(selector.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Default: the whole document is the only fragment.
            Ok(vec![Fragment::new(document)])
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A content page in category `food` selecting `div.menu`.
pub fn make_page(codename: &str) -> PageSpec {
    PageSpec {
        codename: codename.to_string(),
        name: codename.to_uppercase(),
        url: format!("https://{codename}.example/menu"),
        query: "div.menu".to_string(),
        category: "food".to_string(),
        ..Default::default()
    }
}

pub fn make_page_with(codename: &str, resolver: ResolverKind) -> PageSpec {
    PageSpec {
        resolver,
        ..make_page(codename)
    }
}
