//! Ordered, composable text transforms applied to extracted page content.
//!
//! The content resolver runs a fixed chain per page:
//!
//! ```text
//! markup -> newline -> cut -> day -> cut_line
//! ```
//!
//! Format conversion comes first, structural cuts last. A disabled filter is
//! skipped, a failing filter is a no-op, and the chain stops as soon as any
//! stage produces an empty string.

mod cut;
mod day;
mod markup;
mod newline;

pub use cut::{CutFilter, CutLineFilter};
pub use day::{BUILTIN_DAY_LABELS, DayFilter};
pub use markup::MarkupFilter;
pub use newline::NewLineFilter;

use chrono::Weekday;

use crate::error::AppError;
use crate::models::PageSpec;
use crate::traits::Cleaner;

/// A single stage of the filter chain.
pub trait PageFilter: Send + Sync {
    /// Whether the page configuration turns this filter on.
    fn is_enabled(&self) -> bool;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn filter(&self, content: &str) -> Result<String, AppError>;
}

/// Explicit, ordered list of filters for one page.
pub struct FilterChain {
    filters: Vec<Box<dyn PageFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn PageFilter>>) -> Self {
        Self { filters }
    }

    /// The standard chain for a content page.
    pub fn for_page<C: Cleaner>(page: &PageSpec, cleaner: C, weekday: Weekday) -> Self {
        let config = &page.filters;
        Self::new(vec![
            Box::new(MarkupFilter::new(cleaner, config.html.clone())),
            Box::new(NewLineFilter),
            Box::new(CutFilter::new(config.cut.clone())),
            Box::new(DayFilter::new(config.day.clone(), weekday)),
            Box::new(CutLineFilter::new(config.cut_line.clone())),
        ])
    }

    /// Filter names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run the chain. Returns an empty string when any stage empties the content.
    pub fn apply(&self, content: &str) -> String {
        if content.trim().is_empty() {
            return String::new();
        }

        let mut current = content.to_string();
        for filter in &self.filters {
            if !filter.is_enabled() {
                continue;
            }

            tracing::trace!(filter = filter.name(), len = current.len(), "Applying filter");

            match filter.filter(&current) {
                Ok(next) => current = next,
                Err(e) => {
                    tracing::warn!(filter = filter.name(), error = %e, "Unable to apply filter");
                }
            }

            if current.is_empty() {
                tracing::debug!(filter = filter.name(), "Filter emptied the content");
                return String::new();
            }
        }

        current.trim().to_string()
    }
}

/// Locate `[start, end)` between two markers.
///
/// `start` is just past the first `before` (0 when the marker is empty or
/// missing). `end` is the first `after` at or past `start` (the content
/// length when empty or missing).
pub(crate) fn find_boundaries(content: &str, before: &str, after: &str) -> (usize, usize) {
    let start = if before.is_empty() {
        0
    } else {
        content
            .find(before)
            .map(|idx| idx + before.len())
            .unwrap_or(0)
    };

    let end = if after.is_empty() {
        content.len()
    } else {
        content[start..]
            .find(after)
            .map(|idx| start + idx)
            .unwrap_or(content.len())
    };

    tracing::trace!(start, end, before, after, "Found boundaries");
    (start, end)
}
