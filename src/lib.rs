//! # rustgutenberg
//!
//! Project Gutenberg prolific-author crawler and plain-text downloader.
//!
//! ## Modules
//!
//! - [`catalog`] - Partition page parsing into raw author records
//! - [`normalize`] - Name normalization into merge keys
//! - [`aggregate`] - Folding, filtering and ranking authors
//! - [`crawler`] - Partition fetching and the end-to-end pipeline
//! - [`report`] - Author list, manifest and CSV persistence
//! - [`download`] - Per-author plain-text downloads
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustgutenberg::crawler::{collect_prolific_authors, CatalogClient, CrawlOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = CrawlOptions {
//!         partitions: vec!["a".to_string()],
//!         ..Default::default()
//!     };
//!     let client = CatalogClient::new(&options)?;
//!     let authors = collect_prolific_authors(&client, &options).await?;
//!     println!("Found {} prolific authors", authors.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod catalog;
pub mod crawler;
pub mod download;
pub mod error;
pub mod normalize;
pub mod report;

pub use error::{Result, ScrapeError};
