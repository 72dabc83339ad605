//! Catalog partition parsing.
//!
//! One partition page ("browse by author", letter bucket) holds a
//! `div.pgdbbyauthor` container with one `h2` heading per author, each
//! followed by a `ul` of `li.pgdbetext` entries. This module turns such a page
//! into [`RawAuthorRecord`]s restricted to works in one language where the
//! heading's person is credited "as author".

use crate::error::{OptionExt, Result, ScrapeError};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Heading marker for cross references ("See: Smith, John")
const CROSS_REFERENCE_MARKER: &str = "See:";

/// Headings that group many people and must never count as one author
const COLLECTIVE_MARKERS: &[&str] = &["anonymous", "various", "unknown"];

/// Permalink glyph appended to headings, plus its mis-decoded form
const PERMALINK_GLYPHS: &[&str] = &["Â¶", "¶"];

/// Role tag marking the heading's person as the author of an entry
const AUTHOR_ROLE_TAG: &str = "(as author)";

/// A single work listed under an author heading
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkEntry {
    /// Visible link text
    pub title: String,
    /// Absolute URL of the work's catalog page
    pub location: String,
}

/// One author heading as found on a single partition page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAuthorRecord {
    /// Heading text with the permalink glyph removed
    pub display_name: String,
    /// Qualifying works in page order
    pub works: Vec<WorkEntry>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse(e.to_string()))
}

/// Parse one partition page.
///
/// # Arguments
///
/// * `html` - Raw markup of the partition page
/// * `language` - Target language as written in the catalog (e.g. "english")
/// * `origin` - Catalog origin used to absolutize root-relative links
///
/// # Errors
///
/// Returns a parse error if the author listing container is missing. Anomalies
/// inside the container (headings without a list, items without a link) are
/// skipped.
pub fn parse_partition(html: &str, language: &str, origin: &Url) -> Result<Vec<RawAuthorRecord>> {
    let document = Html::parse_document(html);

    let container_selector = selector("div.pgdbbyauthor")?;
    let heading_selector = selector("h2")?;
    let item_selector = selector("li.pgdbetext")?;
    let link_selector = selector("a")?;

    let container = document
        .select(&container_selector)
        .next()
        .ok_or_parse("author listing container not found")?;

    let language_tag = format!("({})", language.trim().to_lowercase());
    let mut records = Vec::new();

    for heading in container.select(&heading_selector) {
        let heading_text = heading.text().collect::<String>();
        let Some(display_name) = heading_display_name(&heading_text) else {
            continue;
        };

        let Some(list) = following_list(heading) else {
            debug!(author = %display_name, "No work list follows heading");
            continue;
        };

        let works = list
            .select(&item_selector)
            .filter_map(|item| qualifying_work(item, &link_selector, &language_tag, origin))
            .collect();

        records.push(RawAuthorRecord {
            display_name,
            works,
        });
    }

    debug!(headings = records.len(), language = %language, "Parsed partition");
    Ok(records)
}

/// Derive the display name from a heading, or `None` if the heading is a
/// cross reference, a collective bucket, or carries no text.
pub fn heading_display_name(heading_text: &str) -> Option<String> {
    if heading_text.contains(CROSS_REFERENCE_MARKER) {
        return None;
    }

    let lowered = heading_text.to_lowercase();
    if COLLECTIVE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return None;
    }

    let name = PERMALINK_GLYPHS
        .iter()
        .fold(heading_text.to_string(), |text, glyph| text.replace(glyph, ""));
    let name = name.trim();

    if name.is_empty() {
        debug!("Skipping heading without identifying text");
        return None;
    }
    Some(name.to_string())
}

/// First `ul` sibling after the heading, stopping at the next heading.
fn following_list(heading: ElementRef<'_>) -> Option<ElementRef<'_>> {
    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        match sibling.value().name() {
            "ul" => return Some(sibling),
            "h2" => return None,
            _ => {}
        }
    }
    None
}

fn qualifying_work(
    item: ElementRef<'_>,
    link_selector: &Selector,
    language_tag: &str,
    origin: &Url,
) -> Option<WorkEntry> {
    let link = item.select(link_selector).next()?;
    let href = link.value().attr("href")?;

    let item_text = item.text().collect::<String>().to_lowercase();
    if !item_text.contains(language_tag) || !item_text.contains(AUTHOR_ROLE_TAG) {
        return None;
    }

    Some(WorkEntry {
        title: link.text().collect::<String>().trim().to_string(),
        location: resolve_location(href, origin),
    })
}

/// Absolutize a root-relative link against the catalog origin.
pub fn resolve_location(href: &str, origin: &Url) -> String {
    if !href.starts_with('/') {
        return href.to_string();
    }
    origin
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", origin.as_str().trim_end_matches('/'), href))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"
<html><body>
<div class="pgdbbyauthor">
  <h2><a name="a1">Lytton, Edward Bulwer Lytton, Baron, 1803-1873</a> <a href="#a1">¶</a></h2>
  <ul>
    <li class="pgdbetext"><a href="/ebooks/1565">The Last Days of Pompeii</a> (English) (as Author)</li>
    <li class="pgdbetext"><a href="/ebooks/7700">Rienzi</a> (English) (as Author)</li>
    <li class="pgdbetext"><a href="/ebooks/9999">Zanoni</a> (French) (as Author)</li>
    <li class="pgdbetext"><a href="/ebooks/4242">Poems</a> (English) (as Editor)</li>
    <li class="pgdbetext">Decorative entry without link (English) (as Author)</li>
    <li class="pgdbxlink">See also: <a href="/ebooks/author/1">elsewhere</a> (English) (as Author)</li>
  </ul>
  <h2><a name="a2">See: Smith, John</a></h2>
  <ul>
    <li class="pgdbetext"><a href="/ebooks/1">Cross Ref</a> (English) (as Author)</li>
  </ul>
  <h2><a name="a3">Anonymous</a></h2>
  <ul>
    <li class="pgdbetext"><a href="/ebooks/2">Beowulf</a> (English) (as Author)</li>
  </ul>
  <h2><a name="a4">Orphan, Heading</a></h2>
  <h2><a name="a5">Adams, Henry</a></h2>
  <ul>
    <li class="pgdbetext"><a href="https://mirror.example.org/ebooks/3">Democracy</a> (English) (as Author)</li>
  </ul>
  <h2><a name="a6">Zola, Émile</a></h2>
  <ul>
    <li class="pgdbetext"><a href="/ebooks/5">Germinal</a> (French) (as Author)</li>
  </ul>
</div>
</body></html>
"##;

    fn origin() -> Url {
        Url::parse("https://www.gutenberg.org").expect("valid origin")
    }

    #[test]
    fn test_parse_partition_sample() {
        let records = parse_partition(SAMPLE, "english", &origin()).expect("Parse failed");
        let names: Vec<&str> = records.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Lytton, Edward Bulwer Lytton, Baron, 1803-1873",
                "Adams, Henry",
                "Zola, Émile",
            ]
        );

        let lytton = &records[0];
        assert_eq!(
            lytton.works,
            vec![
                WorkEntry {
                    title: "The Last Days of Pompeii".to_string(),
                    location: "https://www.gutenberg.org/ebooks/1565".to_string(),
                },
                WorkEntry {
                    title: "Rienzi".to_string(),
                    location: "https://www.gutenberg.org/ebooks/7700".to_string(),
                },
            ]
        );

        assert_eq!(records[1].works[0].location, "https://mirror.example.org/ebooks/3");
        // zero qualifying works is still a record
        assert!(records[2].works.is_empty());
    }

    #[test]
    fn test_other_language_excludes_english_works() {
        let records = parse_partition(SAMPLE, "French", &origin()).expect("Parse failed");
        assert_eq!(records[0].works.len(), 1);
        assert_eq!(records[0].works[0].title, "Zanoni");
        assert_eq!(records[2].works[0].title, "Germinal");
    }

    #[test]
    fn test_wrong_language_item_not_counted() {
        let html = r#"<div class="pgdbbyauthor"><h2>Dumas, Alexandre</h2>
            <ul><li class="pgdbetext"><a href="/ebooks/8">Some Title</a> (french) (as author)</li></ul></div>"#;
        let records = parse_partition(html, "english", &origin()).expect("Parse failed");
        assert_eq!(records.len(), 1);
        assert!(records[0].works.is_empty());
    }

    #[test]
    fn test_missing_container_is_error() {
        let result = parse_partition("<html><body><h2>X</h2></body></html>", "english", &origin());
        assert!(matches!(result, Err(ScrapeError::Parse(_))));
    }

    #[test]
    fn test_heading_display_name() {
        assert_eq!(heading_display_name("See: Smith, John"), None);
        assert_eq!(heading_display_name("Various"), None);
        assert_eq!(heading_display_name("Unknown Author"), None);
        assert_eq!(heading_display_name("ANONYMOUS"), None);
        assert_eq!(heading_display_name(" ¶ "), None);
        assert_eq!(
            heading_display_name("Austen, Jane, 1775-1817 Â¶"),
            Some("Austen, Jane, 1775-1817".to_string())
        );
    }

    #[test]
    fn test_resolve_location() {
        let origin = origin();
        assert_eq!(
            resolve_location("/ebooks/11", &origin),
            "https://www.gutenberg.org/ebooks/11"
        );
        assert_eq!(
            resolve_location("https://example.org/x", &origin),
            "https://example.org/x"
        );
    }
}
