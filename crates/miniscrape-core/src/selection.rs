use std::collections::BTreeSet;

use crate::models::{Category, PageSpec, RunSelector};

/// Tag predicate of a [`RunSelector`].
///
/// An empty selector tag set matches every page. Otherwise every selector
/// tag must be present on the page.
#[derive(Debug, Clone)]
pub struct TagMatcher<'a> {
    required: &'a BTreeSet<String>,
}

impl<'a> TagMatcher<'a> {
    pub fn new(required: &'a BTreeSet<String>) -> Self {
        Self { required }
    }

    pub fn is_match(&self, page_tags: &BTreeSet<String>) -> bool {
        self.required.is_subset(page_tags)
    }
}

/// Pages of `categories` matched by `selector`, in category then page order.
pub fn select_pages(categories: &[Category], selector: &RunSelector) -> Vec<PageSpec> {
    let tags = TagMatcher::new(&selector.tags);

    categories
        .iter()
        .filter(|category| selector.category.is_empty() || category.name == selector.category)
        .flat_map(|category| category.pages.iter())
        .filter(|page| !page.disabled || selector.force)
        .filter(|page| selector.page.is_empty() || page.codename.contains(&selector.page))
        .filter(|page| tags.is_match(&page.tags))
        .cloned()
        .collect()
}
