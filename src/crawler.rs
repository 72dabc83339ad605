//! Partition fetching and the prolific-author pipeline.
//!
//! Partitions are fetched one at a time through a [`PartitionSource`],
//! parsed, and folded into a single [`AuthorTally`]. A failing partition is
//! logged and contributes nothing; it never aborts the run.

use crate::aggregate::{AggregatedAuthor, AuthorTally};
use crate::catalog::{parse_partition, RawAuthorRecord};
use crate::error::{Result, ScrapeError};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Default catalog origin
pub const DEFAULT_ORIGIN: &str = "https://www.gutenberg.org";

/// User agent string for requests
const USER_AGENT: &str = concat!("rustgutenberg/", env!("CARGO_PKG_VERSION"));

/// Letter buckets `a`..`z` plus `other`
pub fn default_partitions() -> Vec<String> {
    ('a'..='z')
        .map(String::from)
        .chain(std::iter::once("other".to_string()))
        .collect()
}

/// Crawl options for the prolific-author pipeline
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Catalog origin, e.g. "https://www.gutenberg.org"
    pub origin: String,
    /// Partition identifiers, processed in order
    pub partitions: Vec<String>,
    /// Target language as tagged in the catalog
    pub language: String,
    /// Minimum qualifying works for an author to be kept
    pub min_books: usize,
    /// Minimum spacing between two requests to the origin
    pub request_interval: Duration,
    /// Per-fetch timeout
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            partitions: default_partitions(),
            language: "english".to_string(),
            min_books: 7,
            request_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl CrawlOptions {
    /// Check the options and return the parsed origin.
    pub fn validate(&self) -> Result<Url> {
        if self.language.trim().is_empty() {
            return Err(ScrapeError::Validation("language must not be empty".to_string()));
        }
        if self.partitions.is_empty() {
            return Err(ScrapeError::Validation("no partitions to crawl".to_string()));
        }
        if let Some(bad) = self
            .partitions
            .iter()
            .find(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_alphanumeric()))
        {
            return Err(ScrapeError::Validation(format!("invalid partition '{}'", bad)));
        }
        parse_origin(&self.origin)
    }
}

/// Parse an http(s) origin URL.
pub fn parse_origin(origin: &str) -> Result<Url> {
    let url = Url::parse(origin)
        .map_err(|e| ScrapeError::Config(format!("Invalid origin '{}': {}", origin, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ScrapeError::Config(format!(
            "Unsupported origin scheme '{}'",
            other
        ))),
    }
}

/// Build an HTTP client with user agent and timeout.
pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| ScrapeError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Fetch a page body, treating any non-success status as an error.
pub async fn fetch_page(client: &reqwest::Client, url: &Url) -> Result<String> {
    let response = client.get(url.as_str()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScrapeError::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response.text().await?)
}

/// Enforces a minimum interval between consecutive requests.
#[derive(Debug)]
pub struct RequestPacer {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until `interval` has passed since the previous call.
    pub async fn wait(&self) {
        let remaining = {
            let last = self.last_request.lock().ok();
            last.and_then(|l| *l)
                .map(|t| self.interval.saturating_sub(t.elapsed()))
        };

        if let Some(remaining) = remaining.filter(|r| !r.is_zero()) {
            debug!(wait_ms = remaining.as_millis() as u64, "Pacing request");
            tokio::time::sleep(remaining).await;
        }

        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(Instant::now());
        }
    }
}

/// Anything that can hand back the raw markup of one catalog partition.
#[allow(async_fn_in_trait)]
pub trait PartitionSource {
    async fn fetch_partition(&self, partition: &str) -> Result<String>;

    /// Origin the markup was fetched from, used to absolutize links.
    /// Sources without one fall back to the configured origin.
    fn origin(&self) -> Option<&Url> {
        None
    }
}

/// HTTP partition source for the catalog's "browse by author" pages
pub struct CatalogClient {
    client: reqwest::Client,
    origin: Url,
    pacer: RequestPacer,
}

impl CatalogClient {
    /// Create a new CatalogClient from crawl options
    pub fn new(options: &CrawlOptions) -> Result<Self> {
        let origin = parse_origin(&options.origin)?;
        let client = build_http_client(&options.user_agent, options.timeout)?;

        Ok(Self {
            client,
            origin,
            pacer: RequestPacer::new(options.request_interval),
        })
    }

    /// Primary URL form: `/browse/authors/{p}.html.utf8`
    pub fn partition_url(&self, partition: &str) -> Result<Url> {
        self.join(&format!("/browse/authors/{}.html.utf8", partition))
    }

    /// Fallback URL form: `/browse/authors/{p}`
    pub fn alternative_partition_url(&self, partition: &str) -> Result<Url> {
        self.join(&format!("/browse/authors/{}", partition))
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| ScrapeError::Config(format!("Invalid partition path '{}': {}", path, e)))
    }

    async fn paced_fetch(&self, url: &Url) -> Result<String> {
        self.pacer.wait().await;
        debug!(url = %url, "Fetching page");
        fetch_page(&self.client, url).await
    }
}

impl PartitionSource for CatalogClient {
    async fn fetch_partition(&self, partition: &str) -> Result<String> {
        let url = self.partition_url(partition)?;
        match self.paced_fetch(&url).await {
            Ok(html) => Ok(html),
            Err(e) => {
                warn!(partition, url = %url, error = %e, "Fetch failed, trying alternative URL");
                let alternative = self.alternative_partition_url(partition)?;
                self.paced_fetch(&alternative).await
            }
        }
    }

    fn origin(&self) -> Option<&Url> {
        Some(&self.origin)
    }
}

/// Fetch and parse one partition.
///
/// Any failure (transport, timeout, status, missing listing) is logged and
/// yields an empty vector.
pub async fn extract_partition<S: PartitionSource>(
    source: &S,
    partition: &str,
    language: &str,
    origin: &Url,
) -> Vec<RawAuthorRecord> {
    let html = match source.fetch_partition(partition).await {
        Ok(html) => html,
        Err(e) => {
            warn!(partition, error = %e, "Skipping partition: fetch failed");
            return Vec::new();
        }
    };

    match parse_partition(&html, language, origin) {
        Ok(records) => records,
        Err(e) => {
            warn!(partition, error = %e, "Skipping partition: listing not found");
            Vec::new()
        }
    }
}

/// Crawl every partition and return the ranked prolific authors.
///
/// # Errors
///
/// Only invalid options fail. A run where every partition fails returns an
/// empty list.
pub async fn collect_prolific_authors<S: PartitionSource>(
    source: &S,
    options: &CrawlOptions,
) -> Result<Vec<AggregatedAuthor>> {
    let configured = options.validate()?;
    let origin = source.origin().cloned().unwrap_or(configured);
    let language = options.language.trim().to_lowercase();

    info!(
        language = %language,
        min_books = options.min_books,
        partitions = options.partitions.len(),
        "Starting prolific author crawl"
    );

    let mut tally = AuthorTally::new();
    for partition in &options.partitions {
        let records = extract_partition(source, partition, &language, &origin).await;
        let headings = records.len();
        let works: usize = records.iter().map(|r| r.works.len()).sum();
        tally.fold(records);
        info!(
            partition = %partition,
            headings,
            works,
            authors = tally.len(),
            "Partition folded"
        );
    }

    let ranked = tally.finalize(options.min_books);
    info!(
        authors = tally.len(),
        prolific = ranked.len(),
        "Crawl complete"
    );
    Ok(ranked)
}
