use std::collections::BTreeSet;

use serde::Serialize;

use miniscrape_core::models::{Category, PageSpec, RunResult, RunSelector};

// ---------------------------------------------------------------------------
// Selector query
// ---------------------------------------------------------------------------

/// Build a [`RunSelector`] from a raw query string.
///
/// `c` = category, `n` = page codename substring, `t` = tag (repeatable),
/// `f` = force (`true`/`1`/`yes`, or present without a value).
pub fn selector_from_query(raw: Option<&str>) -> RunSelector {
    let mut selector = RunSelector::new();
    let Some(raw) = raw else {
        return selector;
    };

    for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        let value = value.trim();
        match key.as_ref() {
            "c" => selector.category = value.to_string(),
            "n" => selector.page = value.to_string(),
            "t" if !value.is_empty() => {
                selector.tags.insert(value.to_string());
            }
            "f" => {
                selector.force = value.is_empty()
                    || matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
            }
            _ => {}
        }
    }

    selector
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ContentPageResponse {
    pub name: String,
    pub codename: String,
    pub homepage: String,
    pub tags: BTreeSet<String>,
    pub category: String,
}

impl From<&PageSpec> for ContentPageResponse {
    fn from(page: &PageSpec) -> Self {
        Self {
            name: page.name.clone(),
            codename: page.codename.clone(),
            homepage: page.homepage.clone(),
            tags: page.tags.clone(),
            category: page.category.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub content: String,
    pub status: String,
    pub kind: String,
    pub page: ContentPageResponse,
}

impl From<RunResult> for ContentResponse {
    fn from(result: RunResult) -> Self {
        Self {
            content: result.content().to_string(),
            status: result.status().to_string(),
            kind: result.kind().to_string(),
            page: ContentPageResponse::from(result.page()),
        }
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// Category summary: its name, the union of its pages' tags and the page codenames.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub name: String,
    pub tags: BTreeSet<String>,
    pub pages: Vec<String>,
}

impl From<&Category> for CategoryResponse {
    fn from(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            tags: category
                .pages
                .iter()
                .flat_map(|page| page.tags.iter().cloned())
                .collect(),
            pages: category
                .pages
                .iter()
                .map(|page| page.codename.clone())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
