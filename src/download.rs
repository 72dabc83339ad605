//! Plain-text download of an author's works.
//!
//! Reads nothing from the catalog listing itself: callers hand in the works
//! (usually from the run manifest) and each work page is searched for its
//! "Plain Text UTF-8" file, which is saved as `{title}.txt` in a per-author
//! folder.

use crate::catalog::WorkEntry;
use crate::crawler::{build_http_client, fetch_page, parse_origin, RequestPacer, DEFAULT_ORIGIN};
use crate::error::{OptionExt, Result, ScrapeError};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Characters never allowed in a generated file or folder name
const ILLEGAL_PATH_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Longest title kept in a file name, in characters
const MAX_TITLE_CHARS: usize = 200;

/// Folder used when an author name leaves nothing usable
const FALLBACK_FOLDER: &str = "unknown_author";

/// Download options
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Catalog origin used for relative file links
    pub origin: String,
    /// Directory holding the per-author folders
    pub base_dir: PathBuf,
    /// Minimum spacing between two requests
    pub request_interval: Duration,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            base_dir: PathBuf::from("data/raw"),
            request_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            user_agent: concat!("rustgutenberg/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

fn replace_illegal(s: &str) -> String {
    s.chars()
        .map(|c| {
            if ILLEGAL_PATH_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

/// Empty or dot-only names would resolve to the base directory or its parent.
fn is_unsafe_component(name: &str) -> bool {
    name.trim().chars().all(|c| c == '.')
}

/// Folder name for an author.
///
/// "Last, First" becomes `Last_F`; any other shape becomes a lower-cased slug
/// with spaces turned into underscores and commas dropped. The result is
/// always a single path component below the base directory.
pub fn author_folder_name(author_name: &str) -> String {
    let parts: Vec<&str> = author_name.split(", ").collect();
    let initial = match parts.as_slice() {
        [_, first] => first.chars().next(),
        _ => None,
    };
    let name = match (parts.as_slice(), initial) {
        ([last, _], Some(initial)) => replace_illegal(&format!("{}_{}", last, initial)),
        _ => replace_illegal(&author_name.replace(' ', "_").replace(',', "").to_lowercase()),
    };

    if is_unsafe_component(&name) {
        FALLBACK_FOLDER.to_string()
    } else {
        name
    }
}

/// Create (if needed) the folder for an author under `base_dir`.
pub fn create_author_folder(author_name: &str, base_dir: &Path) -> Result<PathBuf> {
    let folder = base_dir.join(author_folder_name(author_name));
    std::fs::create_dir_all(&folder)?;
    debug!(folder = %folder.display(), "Author folder ready");
    Ok(folder)
}

/// `{title}.txt`, with characters illegal in file names replaced.
pub fn work_filename(title: &str) -> String {
    let cleaned: String = replace_illegal(title.trim())
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    let cleaned = cleaned.trim();
    if is_unsafe_component(cleaned) {
        "untitled.txt".to_string()
    } else {
        format!("{}.txt", cleaned)
    }
}

/// File name for `title` that is not yet in `taken`.
///
/// Repeated titles get a numeric suffix: `Poems.txt`, `Poems_2.txt`, ...
pub fn unique_work_filename(title: &str, taken: &mut HashSet<String>) -> String {
    let base = work_filename(title);
    let stem = base.trim_end_matches(".txt").to_string();

    let mut candidate = base;
    let mut n = 2;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}.txt", stem, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Find the "Plain Text UTF-8" file link on a work page.
///
/// Looks through the rows of `table.files` for a first cell mentioning both
/// "plain text" and "utf-8", and takes the first link of the second cell.
pub fn find_plain_text_link(html: &str, origin: &Url) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let table_selector =
        Selector::parse("table.files").map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let row_selector = Selector::parse("tr").map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let cell_selector = Selector::parse("td").map_err(|e| ScrapeError::Parse(e.to_string()))?;
    let link_selector = Selector::parse("a").map_err(|e| ScrapeError::Parse(e.to_string()))?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_parse("download table not found")?;

    for row in table.select(&row_selector) {
        let cells: Vec<_> = row.select(&cell_selector).collect();
        if cells.len() < 2 {
            continue;
        }

        let file_format = cells[0].text().collect::<String>().trim().to_lowercase();
        if !(file_format.contains("plain text") && file_format.contains("utf-8")) {
            continue;
        }

        let href = cells[1]
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"));
        if let Some(href) = href {
            return Ok(Some(resolve_file_link(href, origin)));
        }
    }

    Ok(None)
}

fn resolve_file_link(href: &str, origin: &Url) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    origin
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", origin.as_str().trim_end_matches('/'), href))
}

/// HTTP downloader for work texts
pub struct Downloader {
    client: reqwest::Client,
    origin: Url,
    pacer: RequestPacer,
}

impl Downloader {
    /// Create a new Downloader
    pub fn new(options: &DownloadOptions) -> Result<Self> {
        Ok(Self {
            client: build_http_client(&options.user_agent, options.timeout)?,
            origin: parse_origin(&options.origin)?,
            pacer: RequestPacer::new(options.request_interval),
        })
    }

    async fn paced_fetch(&self, url: &Url) -> Result<String> {
        self.pacer.wait().await;
        debug!(url = %url, "Fetching");
        fetch_page(&self.client, url).await
    }

    /// Download one work's plain text into `folder` as `{title}.txt`.
    pub async fn download_work(&self, work: &WorkEntry, folder: &Path) -> Result<PathBuf> {
        let path = folder.join(work_filename(&work.title));
        self.download_work_to(work, &path).await?;
        Ok(path)
    }

    /// Download one work's plain text to `path`.
    ///
    /// # Errors
    ///
    /// Fails if either page cannot be fetched, the work page has no plain
    /// text file, or the text cannot be written.
    pub async fn download_work_to(&self, work: &WorkEntry, path: &Path) -> Result<()> {
        let page_url = Url::parse(&work.location)
            .map_err(|e| ScrapeError::Parse(format!("Invalid work URL '{}': {}", work.location, e)))?;
        let page = self.paced_fetch(&page_url).await?;

        let link = find_plain_text_link(&page, &self.origin)?
            .ok_or_parse("no plain text link on work page")?;
        let text_url = Url::parse(&link)
            .map_err(|e| ScrapeError::Parse(format!("Invalid text URL '{}': {}", link, e)))?;
        let text = self.paced_fetch(&text_url).await?;

        std::fs::write(path, text)?;
        info!(title = %work.title, path = %path.display(), "Work saved");
        Ok(())
    }

    /// Download every work of an author and return how many succeeded.
    ///
    /// Repeated titles are saved under suffixed names so no file overwrites
    /// another. Individual work failures are logged and skipped; only failing
    /// to create the author folder is an error.
    pub async fn download_author(
        &self,
        author_name: &str,
        works: &[WorkEntry],
        base_dir: &Path,
    ) -> Result<usize> {
        let folder = create_author_folder(author_name, base_dir)?;
        let mut taken = HashSet::new();
        let mut saved = 0;

        for work in works {
            let path = folder.join(unique_work_filename(&work.title, &mut taken));
            match self.download_work_to(work, &path).await {
                Ok(()) if path.is_file() => saved += 1,
                Ok(()) => warn!(author = author_name, path = %path.display(), "Saved file missing"),
                Err(e) => warn!(
                    author = author_name,
                    title = %work.title,
                    error = %e,
                    "Download failed"
                ),
            }
        }

        info!(author = author_name, saved, total = works.len(), "Author done");
        Ok(saved)
    }
}
