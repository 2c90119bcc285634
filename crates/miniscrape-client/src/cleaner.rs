use std::sync::{Arc, LazyLock};

use htmd::HtmlToMarkdown;
use miniscrape_core::error::AppError;
use miniscrape_core::models::HtmlFilterConfig;
use miniscrape_core::traits::Cleaner;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

static TABLE_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)(?:table|tr)\b").expect("valid regex"));

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "svg", "template"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "div", "dl", "dt", "figcaption", "footer", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "ol", "p", "pre", "section", "table",
    "tbody", "tfoot", "thead", "tr", "ul",
];

/// HTML-to-Markdown cleaner using htmd.
///
/// Converts an extracted menu fragment into Markdown, or into plain text
/// when the page asks for `textOnly`. Unless tables are marked `pretty`,
/// table rows are flattened into paragraphs first so each row becomes one
/// line.
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
}

impl Clone for HtmdCleaner {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
        }
    }
}

impl HtmdCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(SKIPPED_TAGS.to_vec())
            .build();

        Self {
            converter: Arc::new(converter),
        }
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str, options: &HtmlFilterConfig) -> Result<String, AppError> {
        let html = if options.pretty_tables() {
            html.to_string()
        } else {
            flatten_tables(html)
        };

        if options.text_only {
            return Ok(plain_text(&html));
        }

        self.converter
            .convert(&html)
            .map_err(|e| AppError::CleanerError(e.to_string()))
    }
}

/// Rewrite `<table>` and `<tr>` (and their closing tags) to `<p>`.
pub fn flatten_tables(html: &str) -> String {
    TABLE_TAGS.replace_all(html, "<${1}p").into_owned()
}

/// Visible text, one line per block element.
fn plain_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    collect_text(fragment.root_element(), &mut out);

    out.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if SKIPPED_TAGS.contains(&name) {
                continue;
            }
            if name == "br" {
                out.push('\n');
                continue;
            }

            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            collect_text(child, out);
            if block {
                out.push('\n');
            } else if matches!(name, "td" | "th") {
                out.push(' ');
            }
        } else if let Node::Text(text) = child.value() {
            out.push_str(&text.replace('\n', " "));
        }
    }
}
