use std::future::Future;

use crate::error::AppError;
use crate::models::{HtmlFilterConfig, PageSpec};

/// Acquires the raw content of a page and normalizes its text encoding.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, page: &PageSpec) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Converts extracted HTML into Markdown or plain text.
pub trait Cleaner: Send + Sync + Clone + 'static {
    fn clean(&self, html: &str, options: &HtmlFilterConfig) -> Result<String, AppError>;
}

/// The selector a page uses to pick its fragments out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuerySelector {
    Css(String),
    XPath(String),
}

impl QuerySelector {
    /// First non-empty wins: `query` takes precedence over `xpath`.
    pub fn for_page(page: &PageSpec) -> Result<Self, AppError> {
        if !page.query.trim().is_empty() {
            Ok(QuerySelector::Css(page.query.clone()))
        } else if !page.xpath.trim().is_empty() {
            Ok(QuerySelector::XPath(page.xpath.clone()))
        } else {
            Err(AppError::ParseError(format!(
                "page {} has neither a query nor an xpath",
                page.namespace()
            )))
        }
    }
}

/// One matched element: its inner markup and its attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub html: String,
    pub attrs: Vec<(String, String)>,
}

impl Fragment {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            attrs: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Value of the first attribute called `name`.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Join fragments in document order, one per line.
pub fn join_fragments(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.html.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Applies a CSS selector or XPath expression to a parsed document.
///
/// Zero matches is a valid outcome and yields an empty vector.
pub trait Extractor: Send + Sync + Clone + 'static {
    fn extract(&self, document: &str, selector: &QuerySelector)
    -> Result<Vec<Fragment>, AppError>;
}
