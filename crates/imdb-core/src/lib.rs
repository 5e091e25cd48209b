//! IMDb Series Scraper Core Library
//!
//! This crate scrapes episode data for TV series from IMDb title pages.
//!
//! # Features
//! - Series metadata from the plain title page, no browser involved
//! - Season discovery from the episode index
//! - Headless-browser rendering with automatic "more episodes" expansion
//! - Structural episode parsing that survives class-name churn
//! - Optional concurrent cover image downloads
//! - JSON persistence of everything scraped
//!
//! # Example
//! ```no_run
//! use imdb_core::ImdbScraper;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scraper = ImdbScraper::new()?;
//!     let title = scraper.scrape_title("tt7441658").await?;
//!     title.save("title.json")?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod images;
pub mod parser;
pub mod render;
pub mod scraper;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientConfig, ImdbClient};
pub use error::{ImdbError, Result};
pub use parser::{parse_episodes, parse_season_numbers, parse_series_metadata};
pub use render::{RenderConfig, RenderPool, RenderResult};
pub use scraper::{ImdbScraper, ScrapeConfig};
pub use types::{Episode, SeriesMetadata, TitleAggregate};
