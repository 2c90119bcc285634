use miniscrape_core::error::AppError;
use miniscrape_core::traits::{Extractor, Fragment, QuerySelector};
use scraper::{Html, Selector};
use sxd_document::dom::{ChildOfElement, Element};
use sxd_xpath::nodeset::Node;
use sxd_xpath::{Context, Factory, Value};

/// HTML elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Extracts fragments with CSS selectors (scraper) or XPath (sxd).
///
/// Each fragment carries the inner markup of the matched element and its
/// attributes. Parsing is synchronous and never held across an await.
#[derive(Debug, Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    fn css(&self, document: &str, query: &str) -> Result<Vec<Fragment>, AppError> {
        let selector = Selector::parse(query)
            .map_err(|e| AppError::ParseError(format!("Invalid CSS selector '{query}': {e}")))?;
        let html = Html::parse_document(document);

        Ok(html
            .select(&selector)
            .map(|element| Fragment {
                html: element.inner_html(),
                attrs: element
                    .value()
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            })
            .collect())
    }

    fn xpath(&self, document: &str, expression: &str) -> Result<Vec<Fragment>, AppError> {
        let xpath = Factory::new()
            .build(expression)
            .map_err(|e| AppError::ParseError(format!("Invalid XPath '{expression}': {e}")))?
            .ok_or_else(|| AppError::ParseError(format!("Empty XPath '{expression}'")))?;

        let package = sxd_html::parse_html(document);
        let doc = package.as_document();
        let value = xpath
            .evaluate(&Context::new(), doc.root())
            .map_err(|e| AppError::ParseError(format!("XPath '{expression}' failed: {e}")))?;

        Ok(match value {
            Value::Nodeset(nodes) => nodes.document_order().into_iter().map(node_fragment).collect(),
            Value::String(s) => vec![Fragment::new(s)],
            Value::Number(n) => vec![Fragment::new(n.to_string())],
            Value::Boolean(b) => vec![Fragment::new(b.to_string())],
        })
    }
}

impl Extractor for HtmlExtractor {
    fn extract(
        &self,
        document: &str,
        selector: &QuerySelector,
    ) -> Result<Vec<Fragment>, AppError> {
        let fragments = match selector {
            QuerySelector::Css(query) => self.css(document, query)?,
            QuerySelector::XPath(expression) => self.xpath(document, expression)?,
        };
        tracing::trace!(?selector, matches = fragments.len(), "Extracted");
        Ok(fragments)
    }
}

fn node_fragment(node: Node<'_>) -> Fragment {
    match node {
        Node::Element(element) => {
            let mut html = String::new();
            write_children(element, &mut html);
            let attrs = element
                .attributes()
                .into_iter()
                .map(|a| (a.name().local_part().to_string(), a.value().to_string()))
                .collect();
            Fragment { html, attrs }
        }
        Node::Attribute(attr) => Fragment::new(attr.value())
            .with_attr(attr.name().local_part(), attr.value()),
        Node::Text(text) => Fragment::new(escape_text(text.text())),
        other => Fragment::new(other.string_value()),
    }
}

fn write_children(element: Element<'_>, out: &mut String) {
    for child in element.children() {
        match child {
            ChildOfElement::Element(child) => write_element(child, out),
            ChildOfElement::Text(text) => out.push_str(&escape_text(text.text())),
            ChildOfElement::Comment(_) | ChildOfElement::ProcessingInstruction(_) => {}
        }
    }
}

fn write_element(element: Element<'_>, out: &mut String) {
    let name = element.name().local_part();
    out.push('<');
    out.push_str(name);
    for attr in element.attributes() {
        out.push(' ');
        out.push_str(attr.name().local_part());
        out.push_str("=\"");
        out.push_str(&escape_attr(attr.value()));
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }
    write_children(element, out);
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
