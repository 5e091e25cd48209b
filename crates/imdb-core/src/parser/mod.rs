//! HTML parsers for IMDb pages
//!
//! This module contains parsers for extracting data from IMDb HTML pages:
//! - `metadata`: Parse the title page hero section
//! - `episodes`: Parse episode cards from rendered season pages
//! - `seasons`: Parse available season numbers from the episodes index
//!
//! None of the parsers rely on CSS class names; they key on data-testid
//! markers, href patterns and text shape so they survive site redesigns.

pub mod episodes;
pub mod metadata;
pub mod seasons;

// Re-export main parsing functions
pub use episodes::{parse_episode_code, parse_episodes};
pub use metadata::parse_series_metadata;
pub use seasons::parse_season_numbers;
