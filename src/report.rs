//! Persistence of the ranked author list.
//!
//! The human-readable list (`{language}_{min_books}books.txt`) is the primary
//! artifact. A JSON manifest with every author's works is written next to it
//! so the downloader has real work locations, and a CSV export is optional.

use crate::aggregate::AggregatedAuthor;
use crate::catalog::WorkEntry;
use crate::error::{Result, ScrapeError};
use chrono::Local;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Delimiter between the author name and the count in a list line
const NAME_DELIMITER: &str = " - ";

/// `{language}_{min_books}books.txt`
pub fn default_list_filename(language: &str, min_books: usize) -> String {
    format!("{}_{}books.txt", language, min_books)
}

/// Manifest path for a list file (same stem, `.json`)
pub fn manifest_path_for(list_path: &Path) -> PathBuf {
    list_path.with_extension("json")
}

/// Render the ranked list as text.
///
/// ```
/// use rustgutenberg::report::render_author_list;
///
/// assert_eq!(render_author_list(&[]), "Found 0 prolific authors:\n\n");
/// ```
pub fn render_author_list(authors: &[AggregatedAuthor]) -> String {
    let mut out = format!("Found {} prolific authors:\n\n", authors.len());
    for (i, author) in authors.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {}{}{} books",
            i + 1,
            author.display_name,
            NAME_DELIMITER,
            author.work_count()
        );
    }
    out
}

/// Write the ranked list to `path`.
///
/// The caller keeps `authors`, so a failed write can be retried elsewhere.
pub fn save_author_list(path: &Path, authors: &[AggregatedAuthor]) -> Result<()> {
    std::fs::write(path, render_author_list(authors))?;
    info!(path = %path.display(), authors = authors.len(), "Author list saved");
    Ok(())
}

/// Read author names back from a saved list.
///
/// Only lines containing "books" are considered; the name is the text before
/// the first " - " with the rank prefix removed.
pub fn read_author_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    parse_author_list(&content)
}

/// Parse the text form produced by [`render_author_list`].
pub fn parse_author_list(content: &str) -> Result<Vec<String>> {
    let rank_prefix = Regex::new(r"^\d+\.\s+").map_err(|e| ScrapeError::Parse(e.to_string()))?;

    let names: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains("books"))
        .filter_map(|line| {
            let head = line.split(NAME_DELIMITER).next()?;
            let name = rank_prefix.replace(head, "").trim().to_string();
            (!name.is_empty()).then_some(name)
        })
        .collect();

    debug!(authors = names.len(), "Parsed author list");
    Ok(names)
}

/// JSON manifest of a ranked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub language: String,
    pub min_books: usize,
    /// RFC 3339 local timestamp
    pub generated_at: String,
    pub authors: Vec<ManifestAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestAuthor {
    pub rank: usize,
    pub display_name: String,
    pub merge_key: String,
    pub work_count: usize,
    pub works: Vec<WorkEntry>,
}

impl Manifest {
    pub fn new(language: &str, min_books: usize, authors: &[AggregatedAuthor]) -> Self {
        Self {
            language: language.to_string(),
            min_books,
            generated_at: Local::now().to_rfc3339(),
            authors: authors
                .iter()
                .enumerate()
                .map(|(i, a)| ManifestAuthor {
                    rank: i + 1,
                    display_name: a.display_name.clone(),
                    merge_key: a.merge_key.clone(),
                    work_count: a.work_count(),
                    works: a.works.clone(),
                })
                .collect(),
        }
    }

    /// Works recorded for an author, looked up by display name
    pub fn works_for(&self, display_name: &str) -> Option<&[WorkEntry]> {
        self.authors
            .iter()
            .find(|a| a.display_name == display_name)
            .map(|a| a.works.as_slice())
    }
}

/// Write the JSON manifest for a run.
pub fn save_manifest(
    path: &Path,
    language: &str,
    min_books: usize,
    authors: &[AggregatedAuthor],
) -> Result<()> {
    let manifest = Manifest::new(language, min_books, authors);
    let content = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Manifest saved");
    Ok(())
}

/// Load a manifest written by [`save_manifest`].
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    display_name: &'a str,
    merge_key: &'a str,
    work_count: usize,
}

/// Export the ranked list as CSV.
pub fn save_csv(path: &Path, authors: &[AggregatedAuthor]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    wtr.write_record(["rank", "display_name", "merge_key", "work_count"])?;
    for (i, author) in authors.iter().enumerate() {
        wtr.serialize(CsvRow {
            rank: i + 1,
            display_name: &author.display_name,
            merge_key: &author.merge_key,
            work_count: author.work_count(),
        })?;
    }

    wtr.flush()?;
    info!(path = %path.display(), "CSV saved");
    Ok(())
}
