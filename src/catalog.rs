//! Parsing of the eLibrary catalog page.
//!
//! All knowledge about the publisher's markup lives in this module. The
//! selectors below are the contract with the vendor's page layout; when the
//! markup changes, only they need to follow.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::book::{Book, Chapter};
use crate::error::{AccessError, MetaError, Result};
use crate::isbn::isbn_from_url;

const TITLE: &str = "h1.current-issue__title";
const NO_ACCESS: &str = "i.icon-lock";
const AUTHOR: &str = "span.hlFld-ContribAuthor";
const CHAPTER_ENTRY: &str = "div.issue-item__content";
const CHAPTER_TITLE: &str = "div.issue-item__title";
const CHAPTER_PDF: &str = r#"a[title="PDF"]"#;
const COMPLETE_PDF: &str = r#"a[title="Book PDF"]"#;
const COPYRIGHT: &str = r#"[class*="copyright"]"#;

struct Selectors {
    title: Selector,
    no_access: Selector,
    author: Selector,
    chapter_entry: Selector,
    chapter_title: Selector,
    chapter_pdf: Selector,
    complete_pdf: Selector,
    copyright: Selector,
}

#[allow(clippy::expect_used)] // Static selectors that are guaranteed to be valid
static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| {
    let parse = |s: &str| Selector::parse(s).expect("valid selector");
    Selectors {
        title: parse(TITLE),
        no_access: parse(NO_ACCESS),
        author: parse(AUTHOR),
        chapter_entry: parse(CHAPTER_ENTRY),
        chapter_title: parse(CHAPTER_TITLE),
        chapter_pdf: parse(CHAPTER_PDF),
        complete_pdf: parse(COMPLETE_PDF),
        copyright: parse(COPYRIGHT),
    }
});

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));

/// Build a [`Book`] from the HTML of its catalog page.
///
/// The access marker is only checked once the title is known, and it takes
/// precedence over everything parsed after it, including a complete-book link.
pub fn parse_catalog_page(html: &str, source_url: &str) -> Result<Book> {
    let document = Html::parse_document(html);
    let sel = &*SELECTORS;

    let title = document
        .select(&sel.title)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or(MetaError::NoTitle)?;

    if document.select(&sel.no_access).next().is_some() {
        return Err(AccessError { title }.into());
    }

    let authors: Vec<String> = document
        .select(&sel.author)
        .map(element_text)
        .filter(|a| !a.is_empty())
        .collect();
    if authors.is_empty() {
        return Err(MetaError::NoAuthors.into());
    }

    let complete_pdf_href = document
        .select(&sel.complete_pdf)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(canonical_pdf_href);

    let chapters = if complete_pdf_href.is_some() {
        debug!("Complete book PDF offered, skipping chapter list");
        Vec::new()
    } else {
        collect_chapters(&document)?
    };

    let year = document
        .select(&sel.copyright)
        .find_map(|el| {
            let text = element_text(el);
            YEAR_PATTERN
                .captures(&text)
                .and_then(|c| c[1].parse::<i32>().ok())
        })
        .ok_or(MetaError::NoYear)?;

    debug!(
        "Parsed '{}' ({}) with {} authors and {} chapters",
        title,
        year,
        authors.len(),
        chapters.len()
    );

    Ok(Book {
        source_url: source_url.to_string(),
        authors,
        chapters,
        complete_pdf_href,
        isbn: isbn_from_url(source_url),
        title,
        year,
    })
}

fn collect_chapters(document: &Html) -> Result<Vec<Chapter>> {
    let sel = &*SELECTORS;
    let mut chapters = Vec::new();

    for entry in document.select(&sel.chapter_entry) {
        let title = entry.select(&sel.chapter_title).next().map(element_text);
        let href = entry
            .select(&sel.chapter_pdf)
            .next()
            .and_then(|a| a.value().attr("href"));

        let (Some(title), Some(href)) = (title, href) else {
            return Err(MetaError::NoChapters.into());
        };

        let href = canonical_pdf_href(href);
        let title = if title.is_empty() {
            let suffix = href.rsplit('.').next().unwrap_or_default();
            format!("Chapter {}", suffix)
        } else {
            title
        };

        chapters.push(Chapter::new(title, href));
    }

    Ok(chapters)
}

/// Turn the viewer link variant into the downloadable one.
pub fn canonical_pdf_href(href: &str) -> String {
    href.trim().replace("epdf", "pdf")
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
