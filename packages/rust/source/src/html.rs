//! Result-page extraction.
//!
//! Parses a saved search result page and turns every result block into a
//! [`MemorySource`] entry. The snippet span inside the block becomes the
//! entry's region, so the association between an item and the place its
//! summary is written is fixed once, at extraction time.

use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use glimpse_shared::{GlimpseError, Result, SourceConfig};

use crate::memory::{MemoryRegion, MemorySource};

/// Compiled selectors for one page layout.
#[derive(Debug, Clone)]
pub struct PageSelectors {
    result: Selector,
    link: Selector,
    title: Selector,
    snippet: Selector,
}

impl PageSelectors {
    /// Compile the selectors from the `[source]` config section.
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            result: compile(&config.result_selector)?,
            link: compile(&config.link_selector)?,
            title: compile(&config.title_selector)?,
            snippet: compile(&config.snippet_selector)?,
        })
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| GlimpseError::parse(format!("invalid selector '{selector}': {e}")))
}

/// Extract result items from `html` into a fresh [`MemorySource`].
///
/// Blocks without a link are ignored. Blocks whose link lacks a title or
/// `href` are still added, but do not resolve. Relative `href` values are
/// joined onto `base` when one is given.
#[instrument(skip_all, fields(bytes = html.len()))]
pub fn extract_page(html: &str, selectors: &PageSelectors, base: Option<&Url>) -> MemorySource {
    let source = MemorySource::new();
    let doc = Html::parse_document(html);

    for block in doc.select(&selectors.result) {
        let Some(link) = block.select(&selectors.link).next() else {
            continue;
        };

        let title = link
            .select(&selectors.title)
            .next()
            .map(collapse_text)
            .filter(|t| !t.is_empty());
        let url = link
            .value()
            .attr("href")
            .and_then(|href| resolve_href(href, base));
        let region = snippet_region(block, selectors);

        debug!(
            title = title.as_deref().unwrap_or(""),
            url = url.as_deref().unwrap_or(""),
            has_region = region.is_some(),
            "extracted result"
        );
        source.push(title, url, region);
    }

    info!(items = source.len(), "extracted result page");
    source
}

/// Second snippet match if present, else the first. Spans wrapping the
/// result link are not snippets.
fn snippet_region(block: ElementRef<'_>, selectors: &PageSelectors) -> Option<Arc<MemoryRegion>> {
    let spans: Vec<ElementRef<'_>> = block
        .select(&selectors.snippet)
        .filter(|span| span.select(&selectors.link).next().is_none())
        .take(2)
        .collect();
    let span = spans.get(1).or_else(|| spans.first())?;
    Some(Arc::new(MemoryRegion::new(collapse_text(*span))))
}

fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match Url::parse(href) {
        Ok(url) => Some(url.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        },
        Err(_) => None,
    }
}

fn collapse_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
