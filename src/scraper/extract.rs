//! HTML extraction strategies for scraped card pages.
//!
//! Each field is looked up through an ordered list of CSS selectors first.
//! When none of them match, the page is scanned for a labelled value: a
//! `<dt>`/`<dd>` pair, a table row whose first cell is the label, or a
//! `.label` element followed by its value. Labels compare case-insensitively
//! with any trailing colon stripped.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};

use crate::error::{ImportError, Result};

/// Parse a CSS selector, reporting the offending selector on failure.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ImportError::Selector {
        selector: selector.to_string(),
        message: format!("{e:?}"),
    })
}

/// Resolve a possibly relative `href` against `base_url` the way a browser
/// would. An unparseable base leaves `href` as it is.
pub fn absolute_url(base_url: &str, href: &str) -> String {
    reqwest::Url::parse(base_url)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// The page URL when it is absolute, otherwise the site base URL.
fn resolution_base<'a>(page_url: &'a str, base_url: &'a str) -> &'a str {
    if reqwest::Url::parse(page_url).is_ok() {
        page_url
    } else {
        base_url
    }
}

/// Text content of an element with whitespace collapsed.
pub fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_label(label: &str) -> String {
    label.trim().trim_end_matches(':').trim().to_lowercase()
}

fn next_element(element: ElementRef) -> Option<ElementRef> {
    element.next_siblings().find_map(ElementRef::wrap)
}

/// Card links and pagination on a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub card_links: Vec<String>,
    pub next_page: Option<String>,
}

/// Selectors locating card detail links and the next listing page
#[derive(Debug)]
pub struct ListingSelectors {
    base_url: String,
    card_link: Selector,
    next_page: Option<Selector>,
}

impl ListingSelectors {
    pub fn new(base_url: &str, card_link: &str, next_page: Option<&str>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            card_link: parse_selector(card_link)?,
            next_page: next_page.map(parse_selector).transpose()?,
        })
    }

    /// Links on the listing page fetched from `page_url`, resolved against it.
    pub fn parse(&self, html: &str, page_url: &str) -> ListingPage {
        let document = Html::parse_document(html);
        let base = resolution_base(page_url, &self.base_url);

        let mut seen = HashSet::new();
        let card_links = document
            .select(&self.card_link)
            .filter_map(|link| link.value().attr("href"))
            .map(|href| absolute_url(base, href.trim()))
            .filter(|url| seen.insert(url.clone()))
            .collect();

        let next_page = self.next_page.as_ref().and_then(|selector| {
            document
                .select(selector)
                .find_map(|link| link.value().attr("href"))
                .map(|href| absolute_url(base, href.trim()))
        });

        ListingPage {
            card_links,
            next_page,
        }
    }
}

#[derive(Debug)]
struct FieldRule {
    key: &'static str,
    selectors: Vec<Selector>,
    labels: Vec<String>,
    attributes: Vec<&'static str>,
}

/// Ordered selector-then-label extraction for a card detail page
#[derive(Debug)]
pub struct DetailExtractor {
    base_url: String,
    rules: Vec<FieldRule>,
    term: Selector,
    row: Selector,
    labelled: Selector,
}

impl DetailExtractor {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.to_string(),
            rules: Vec::new(),
            term: parse_selector("dt")?,
            row: parse_selector("tr")?,
            labelled: parse_selector(".label, .field-label")?,
        })
    }

    /// A text field found by `selectors`, falling back to `labels`.
    pub fn field(mut self, key: &'static str, selectors: &[&str], labels: &[&str]) -> Result<Self> {
        self.rules.push(FieldRule {
            key,
            selectors: selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
            labels: labels.iter().map(|l| normalize_label(l)).collect(),
            attributes: Vec::new(),
        });
        Ok(self)
    }

    /// A URL field read from the first of `attributes` present on an element
    /// matched by `selectors`.
    pub fn url_field(
        mut self,
        key: &'static str,
        selectors: &[&str],
        attributes: &[&'static str],
    ) -> Result<Self> {
        self.rules.push(FieldRule {
            key,
            selectors: selectors
                .iter()
                .map(|s| parse_selector(s))
                .collect::<Result<_>>()?,
            labels: Vec::new(),
            attributes: attributes.to_vec(),
        });
        Ok(self)
    }

    /// Extract every configured field present on the page fetched from
    /// `page_url`.
    pub fn extract(&self, html: &str, page_url: &str) -> Map<String, Value> {
        let document = Html::parse_document(html);
        let base = resolution_base(page_url, &self.base_url);
        let mut fields = Map::new();
        for rule in &self.rules {
            if let Some(value) = self.apply(rule, &document, base) {
                fields.insert(rule.key.to_string(), Value::String(value));
            }
        }
        fields
    }

    fn apply(&self, rule: &FieldRule, document: &Html, base: &str) -> Option<String> {
        for selector in &rule.selectors {
            for element in document.select(selector) {
                let value = if rule.attributes.is_empty() {
                    Some(element_text(element))
                } else {
                    rule.attributes
                        .iter()
                        .find_map(|attr| element.value().attr(attr))
                        .map(|src| absolute_url(base, src.trim()))
                };
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    return Some(value);
                }
            }
        }

        rule.labels
            .iter()
            .find_map(|label| self.labelled_value(document, label))
    }

    /// Value adjacent to a node whose text equals `label`.
    pub fn labelled_value(&self, document: &Html, label: &str) -> Option<String> {
        let wanted = normalize_label(label);
        let matches = |element: ElementRef| normalize_label(&element_text(element)) == wanted;
        let non_empty = |text: String| Some(text).filter(|t| !t.is_empty());

        for term in document.select(&self.term) {
            if matches(term) {
                if let Some(value) = next_element(term).map(element_text).and_then(non_empty) {
                    return Some(value);
                }
            }
        }

        for row in document.select(&self.row) {
            let cells: Vec<ElementRef> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                .collect();
            for pair in cells.windows(2) {
                if matches(pair[0]) {
                    if let Some(value) = non_empty(element_text(pair[1])) {
                        return Some(value);
                    }
                }
            }
        }

        for label_element in document.select(&self.labelled) {
            if matches(label_element) {
                if let Some(value) = next_element(label_element)
                    .map(element_text)
                    .and_then(non_empty)
                {
                    return Some(value);
                }
            }
        }

        None
    }
}
