//! rustgutenberg - Project Gutenberg prolific-author crawler
//!
//! ## Usage
//!
//! ### Find prolific authors
//! ```bash
//! rustgutenberg scrape --language english --min-books 10 --letters a-c
//! ```
//!
//! ### Download their works
//! ```bash
//! rustgutenberg download --list english_10books.txt
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustgutenberg::crawler::{
    collect_prolific_authors, default_partitions, CatalogClient, CrawlOptions, DEFAULT_ORIGIN,
};
use rustgutenberg::download::{DownloadOptions, Downloader};
use rustgutenberg::report;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Project Gutenberg prolific-author crawler and downloader
#[derive(Parser)]
#[command(name = "rustgutenberg")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the author index and save the prolific author list
    Scrape {
        /// Language of the works to count (e.g., "english")
        #[arg(short, long, default_value = "english")]
        language: String,

        /// Minimum number of works per author
        #[arg(short, long, default_value = "7")]
        min_books: usize,

        /// Letter buckets to crawl (e.g., "a", "a,b,other", "a-e"); default: all
        #[arg(long)]
        letters: Option<String>,

        /// Catalog origin
        #[arg(long, default_value = DEFAULT_ORIGIN)]
        origin: String,

        /// Minimum delay between requests, in milliseconds
        #[arg(long, default_value = "1000")]
        delay_ms: u64,

        /// Per-request timeout, in seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Also export the ranking as CSV
        #[arg(long)]
        csv: bool,
    },

    /// Download plain-text works for the authors of a saved list
    Download {
        /// Author list written by `scrape` (e.g., english_10books.txt)
        #[arg(long)]
        list: PathBuf,

        /// Manifest with the authors' works (default: list path with .json)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Only download this author (display name as in the list)
        #[arg(long)]
        author: Option<String>,

        /// Base directory for per-author folders
        #[arg(short, long, default_value = "data/raw")]
        output_dir: PathBuf,

        /// Catalog origin
        #[arg(long, default_value = DEFAULT_ORIGIN)]
        origin: String,

        /// Minimum delay between requests, in milliseconds
        #[arg(long, default_value = "1000")]
        delay_ms: u64,

        /// Per-request timeout, in seconds
        #[arg(long, default_value = "60")]
        timeout_secs: u64,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Scrape {
            language,
            min_books,
            letters,
            origin,
            delay_ms,
            timeout_secs,
            output_dir,
            csv,
        } => {
            let partitions = match letters {
                Some(selection) => parse_letters(&selection).context("Invalid --letters format")?,
                None => default_partitions(),
            };
            let options = CrawlOptions {
                origin,
                partitions,
                language: language.trim().to_lowercase(),
                min_books,
                request_interval: Duration::from_millis(delay_ms),
                timeout: Duration::from_secs(timeout_secs),
                ..Default::default()
            };
            run_scrape(options, output_dir, csv).await
        }
        Commands::Download {
            list,
            manifest,
            author,
            output_dir,
            origin,
            delay_ms,
            timeout_secs,
        } => {
            let options = DownloadOptions {
                origin,
                base_dir: output_dir,
                request_interval: Duration::from_millis(delay_ms),
                timeout: Duration::from_secs(timeout_secs),
                ..Default::default()
            };
            run_download(list, manifest, author, options).await
        }
    }
}

// ============================================================================
// Scrape
// ============================================================================

async fn run_scrape(options: CrawlOptions, output_dir: PathBuf, csv: bool) -> Result<()> {
    println!(
        "Scraping {} partition(s) for {} authors with at least {} works...",
        options.partitions.len(),
        options.language,
        options.min_books
    );

    let client = CatalogClient::new(&options)?;
    let authors = collect_prolific_authors(&client, &options).await?;

    println!("\nFound {} prolific authors:", authors.len());
    for (i, author) in authors.iter().enumerate() {
        println!("{}. {} - {} books", i + 1, author.display_name, author.work_count());
    }

    std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;
    let list_path = output_dir.join(report::default_list_filename(
        &options.language,
        options.min_books,
    ));
    report::save_author_list(&list_path, &authors)
        .with_context(|| format!("Failed to save author list to {}", list_path.display()))?;
    println!("\nAuthor list saved to {}", list_path.display());

    let manifest_path = report::manifest_path_for(&list_path);
    report::save_manifest(&manifest_path, &options.language, options.min_books, &authors)
        .context("Failed to save manifest")?;
    println!("Manifest saved to {}", manifest_path.display());

    if csv {
        let csv_path = list_path.with_extension("csv");
        report::save_csv(&csv_path, &authors).context("Failed to save CSV")?;
        println!("CSV saved to {}", csv_path.display());
    }

    Ok(())
}

/// Parse a letter selection (e.g., "a", "a,b,other", "a-e")
fn parse_letters(selection: &str) -> Result<Vec<String>> {
    let mut partitions = Vec::new();

    for part in selection.split(',').map(|p| p.trim().to_lowercase()) {
        if part.is_empty() {
            continue;
        }
        if let Some((start, end)) = part.split_once('-') {
            let start = single_letter(start).context("Invalid range start")?;
            let end = single_letter(end).context("Invalid range end")?;
            if start > end {
                anyhow::bail!("Descending letter range: {}", part);
            }
            partitions.extend((start..=end).map(String::from));
        } else {
            partitions.push(part);
        }
    }

    if partitions.is_empty() {
        anyhow::bail!("No letters given");
    }
    Ok(partitions)
}

fn single_letter(s: &str) -> Result<char> {
    let mut chars = s.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_lowercase() => Ok(c),
        _ => anyhow::bail!("Expected a single letter, got '{}'", s),
    }
}

// ============================================================================
// Download
// ============================================================================

async fn run_download(
    list: PathBuf,
    manifest: Option<PathBuf>,
    only_author: Option<String>,
    options: DownloadOptions,
) -> Result<()> {
    let names = report::read_author_list(&list)
        .with_context(|| format!("Failed to read author list {}", list.display()))?;

    let manifest_path = manifest.unwrap_or_else(|| report::manifest_path_for(&list));
    let manifest = report::load_manifest(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    std::fs::create_dir_all(&options.base_dir).context("Failed to create base directory")?;
    let downloader = Downloader::new(&options)?;

    let selected: Vec<&String> = names
        .iter()
        .filter(|n| only_author.as_ref().map_or(true, |a| a == *n))
        .collect();
    if selected.is_empty() {
        println!("No matching authors in {}", list.display());
        return Ok(());
    }

    let mut total = 0;
    for name in selected {
        let Some(works) = manifest.works_for(name) else {
            warn!(author = %name, "Author missing from manifest");
            println!("No works recorded for {}, skipping.", name);
            continue;
        };

        println!("Downloading {} works for {}...", works.len(), name);
        let saved = downloader.download_author(name, works, &options.base_dir).await?;
        println!("  {} / {} saved", saved, works.len());
        total += saved;
    }

    info!(total, "Download complete");
    println!("\nDone. {} works saved under {}", total, options.base_dir.display());
    Ok(())
}
