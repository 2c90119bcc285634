use super::PageFilter;
use crate::error::AppError;
use crate::models::HtmlFilterConfig;
use crate::traits::Cleaner;

/// Converts the extracted HTML to Markdown (or plain text) through a [`Cleaner`].
pub struct MarkupFilter<C> {
    cleaner: C,
    options: HtmlFilterConfig,
}

impl<C: Cleaner> MarkupFilter<C> {
    pub fn new(cleaner: C, options: HtmlFilterConfig) -> Self {
        Self { cleaner, options }
    }
}

impl<C: Cleaner> PageFilter for MarkupFilter<C> {
    fn is_enabled(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "markup"
    }

    fn filter(&self, content: &str) -> Result<String, AppError> {
        self.cleaner.clean(content, &self.options)
    }
}
